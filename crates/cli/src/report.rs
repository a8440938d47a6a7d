use convoq_core::{
    AnalysisViewModel, Disclosure, EventKind, HistoryEntry, OverviewFlags, QuotaPanel, TrendPanel,
};
use convoq_protocol::UsageStats;

const LOCKED: &str = "🔒 locked until a deep scan";

pub fn render_view_report(view: &AnalysisViewModel, state: &Disclosure) -> String {
    let mut md = String::new();
    md.push_str("# Conversation analysis\n\n");
    md.push_str(&format!("- State: `{}`\n", state.name()));
    md.push_str(&format!("- Messages: `{}`\n", view.total_messages));
    md.push_str(&format!("- Health score: `{:.1}`\n", view.health_score));
    md.push_str(&format!(
        "- Persona: `{}`\n",
        view.persona_tag.as_deref().unwrap_or("n/a")
    ));
    let flags = OverviewFlags::from_view(view);
    match flags.toxicity_percent {
        Some(percent) if flags.toxicity_flagged => {
            md.push_str(&format!("- Toxicity: `{percent:.1}%` ⚠️\n"))
        }
        Some(percent) => md.push_str(&format!("- Toxicity: `{percent:.1}%`\n")),
        None => md.push_str(&format!("- Toxicity: {LOCKED}\n")),
    }
    md.push('\n');

    if !view.participants.is_empty() {
        md.push_str("## Participants\n\n");
        md.push_str("| name | initiations | avg reply (min) |\n");
        md.push_str("|---|---:|---:|\n");
        for name in &view.participants {
            md.push_str(&format!(
                "| {} | `{}` | `{}` |\n",
                escape_cell(name),
                view.initiations.get(name).copied().unwrap_or(0),
                view.reply_times
                    .avg_reply_time
                    .get(name)
                    .map_or("n/a".to_string(), |m| format!("{m:.1}")),
            ));
        }
        md.push('\n');
    }

    if !view.reply_times.peak_hours.is_empty() {
        let hours: Vec<String> = view
            .reply_times
            .peak_hours
            .iter()
            .map(|p| format!("{:02}:00 ({})", p.hour, p.count))
            .collect();
        md.push_str(&format!("Peak hours: {}\n\n", hours.join(", ")));
    }

    for (label, gap) in [
        ("Fastest reply", &view.reply_times.fastest_reply),
        ("Longest ghosting", &view.reply_times.longest_ghosting),
    ] {
        if let Some(gap) = gap {
            md.push_str(&format!(
                "{label}: `{}` by {}\n",
                format_minutes(gap.minutes),
                escape_cell(gap.from.as_deref().unwrap_or("?"))
            ));
        }
    }
    let gaps = &view.reply_times;
    if gaps.fastest_reply.is_some() || gaps.longest_ghosting.is_some() {
        md.push('\n');
    }

    if !view.features.is_empty() {
        md.push_str("## Balance\n\n");
        md.push_str("| feature | score |\n");
        md.push_str("|---|---:|\n");
        for (name, score) in &view.features {
            md.push_str(&format!(
                "| {} | `{:.0}%` |\n",
                escape_cell(&name.replace('_', " ")),
                score * 100.0
            ));
        }
        md.push('\n');
    }

    if let (Some(first), Some(last)) = (
        view.sentiment.timeline.first(),
        view.sentiment.timeline.last(),
    ) {
        md.push_str(&format!(
            "Sentiment: `{:+.2}` on {} → `{:+.2}` on {} ({} days)\n\n",
            first.avg_sentiment,
            first.date,
            last.avg_sentiment,
            last.date,
            view.sentiment.timeline.len()
        ));
    }

    md.push_str("## Trend\n\n");
    match TrendPanel::from_view(view) {
        TrendPanel::Locked => md.push_str(&format!("{LOCKED}\n\n")),
        TrendPanel::NotEnoughData => {
            md.push_str("Not enough data yet. Upload more chats over time to track trends.\n\n")
        }
        TrendPanel::Decision(panel) => {
            md.push_str(&format!(
                "**{}** ({})\n\n",
                panel.decision,
                format!("{:?}", panel.color).to_lowercase()
            ));
            push_list(&mut md, None, &panel.reasons);
            push_list(&mut md, Some("Advice"), &panel.advice);
            push_list(&mut md, Some("Reply suggestions"), &panel.reply_suggestions);
        }
    }

    if !view.semantic_analysis.events.is_empty() {
        md.push_str("## Moments\n\n");
        for event in &view.semantic_analysis.events {
            md.push_str(&format!(
                "- {} `{}`: {}\n",
                EventKind::classify(event.kind.as_deref()).label(),
                event.timestamp.as_deref().unwrap_or("?"),
                truncate_one_line(event.summary.as_deref().unwrap_or(""), 160)
            ));
        }
        md.push('\n');
    }

    if !view.coach_summary.trim().is_empty() {
        md.push_str("## Coach\n\n");
        md.push_str(view.coach_summary.trim());
        md.push('\n');
    }

    md
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    let mut md = String::new();
    md.push_str("| # | date | persona | messages | health |\n");
    md.push_str("|---:|---|---|---:|---:|\n");
    for (i, entry) in entries.iter().enumerate() {
        md.push_str(&format!(
            "| {} | {} | {} | `{}` | `{}` |\n",
            i,
            entry.created_date().unwrap_or("?"),
            escape_cell(entry.persona_tag.as_deref().unwrap_or("Unknown")),
            entry
                .total_messages
                .map_or("?".to_string(), |n| n.to_string()),
            entry
                .health_score
                .map_or("?".to_string(), |h| format!("{h:.0}")),
        ));
    }
    md
}

pub fn render_usage(usage: &UsageStats) -> String {
    let levels = QuotaPanel::from_usage(usage);
    let requests = &usage.rate_limiting;
    let tokens = &usage.token_counting;
    format!(
        "Requests: {}/{} this minute, {}/{} today ({:?})\nTokens: {}/{} today, {:.1}% ({:?})",
        requests.requests_this_minute,
        requests.minute_limit,
        requests.requests_today,
        requests.daily_limit,
        levels.requests,
        tokens.tokens_used_today,
        tokens.daily_limit,
        tokens.usage_percentage,
        levels.tokens,
    )
}

fn push_list(md: &mut String, heading: Option<&str>, items: &[String]) {
    if items.is_empty() {
        return;
    }
    if let Some(heading) = heading {
        md.push_str(&format!("{heading}:\n\n"));
    }
    for item in items {
        md.push_str(&format!("- {}\n", truncate_one_line(item, 200)));
    }
    md.push('\n');
}

/// Minutes under an hour stay in minutes; longer gaps read as hours.
fn format_minutes(minutes: f64) -> String {
    if minutes < 60.0 {
        format!("{minutes:.1} min")
    } else {
        format!("{:.1} h", minutes / 60.0)
    }
}

fn truncate_one_line(text: &str, max_chars: usize) -> String {
    let mut s = text.replace(['\n', '\r', '\t'], " ");
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() <= max_chars {
        return s;
    }
    let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoq_protocol::{FastResult, HistoricalRecord};
    use serde_json::json;

    fn fast_view() -> AnalysisViewModel {
        let fast: FastResult = serde_json::from_value(json!({
            "total_messages": 120,
            "health_score": 82.5,
            "persona_tag": "Situationship",
            "toxicity": {"status": "normal", "toxicity_rate": 0.2},
            "participants": ["Alex", "Sam|Sammy"],
            "initiations": {"Alex": 14},
            "features": {"reply_time_balance": 0.8, "initiation_balance": 0.55},
            "reply_times": {
                "avg_reply_time": {"Alex": 3.5},
                "fastest_reply": {"minutes": 0.5, "from": "Sam|Sammy"},
                "longest_ghosting": {"minutes": 640.0, "from": "Alex"},
                "peak_hours": [{"hour": 8, "count": 12}]
            },
            "trend_analysis": {"status": "locked"}
        }))
        .unwrap();
        convoq_core::normalize_fast(&fast).unwrap().view
    }

    #[test]
    fn fast_report_shows_locked_trend_and_flagged_toxicity() {
        let md = render_view_report(&fast_view(), &Disclosure::FastOnly { token: None });
        assert!(md.contains("- State: `fast_only`"));
        assert!(md.contains("- Toxicity: `20.0%` ⚠️"));
        assert!(md.contains("| Alex | `14` | `3.5` |"));
        assert!(md.contains("| Sam\\|Sammy | `0` | `n/a` |"));
        assert!(md.contains("Peak hours: 08:00 (12)"));
        assert!(md.contains("Fastest reply: `0.5 min` by Sam\\|Sammy"));
        assert!(md.contains("Longest ghosting: `10.7 h` by Alex"));
        assert!(md.contains("| initiation balance | `55%` |"));
        assert!(md.contains("| reply time balance | `80%` |"));
        assert!(md.contains(LOCKED));
    }

    #[test]
    fn complete_report_renders_decision_and_moments() {
        let record: HistoricalRecord = serde_json::from_value(json!({
            "total_messages": 40,
            "full_data": {
                "trend_analysis": {"decision": "Stable", "decision_color": "green", "reasons": ["steady"]},
                "decision_advice": {"advice": ["keep it up"], "reply_suggestions": []},
                "semantic_analysis": {"events": [{"type": "banter", "timestamp": "2024-01-02", "summary": "roast\nbattle"}]},
                "coach_summary": "All good."
            }
        }))
        .unwrap();
        let view = convoq_core::normalize_history(&record).unwrap();
        let md = render_view_report(&view, &Disclosure::DeepUnlocked);
        assert!(md.contains("**Stable** (green)"));
        assert!(md.contains("Advice:"));
        assert!(!md.contains("Reply suggestions:"));
        assert!(md.contains("- Playful roasting `2024-01-02`: roast battle"));
        assert!(md.contains("## Coach\n\nAll good."));
    }

    #[test]
    fn history_table_lists_rows_in_order() {
        let entries: Vec<HistoryEntry> = [
            json!({"id": 1, "created_at": "2024-02-11T09:30:00", "persona_tag": "Slow Burn", "total_messages": 250, "health_score": 64.2}),
            json!({"id": 2}),
        ]
        .into_iter()
        .map(|v| HistoryEntry::from_record(&serde_json::from_value(v).unwrap()))
        .collect();
        let md = render_history(&entries);
        assert!(md.contains("| 0 | 2024-02-11 | Slow Burn | `250` | `64` |"));
        assert!(md.contains("| 1 | ? | Unknown | `?` | `?` |"));
    }
}
