use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout hint sent alongside an uploaded chat export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "mm/dd/yyyy")]
    MonthDayLongYear,
    #[serde(rename = "dd/mm/yyyy")]
    DayMonthLongYear,
    #[serde(rename = "mm/dd/yy")]
    MonthDayShortYear,
    #[serde(rename = "dd/mm/yy")]
    DayMonthShortYear,
}

impl DateFormat {
    pub const ALL: [DateFormat; 5] = [
        DateFormat::Auto,
        DateFormat::MonthDayLongYear,
        DateFormat::DayMonthLongYear,
        DateFormat::MonthDayShortYear,
        DateFormat::DayMonthShortYear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::MonthDayLongYear => "mm/dd/yyyy",
            Self::DayMonthLongYear => "dd/mm/yyyy",
            Self::MonthDayShortYear => "mm/dd/yy",
            Self::DayMonthShortYear => "dd/mm/yy",
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == normalized)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(|f| f.as_str()).collect();
                format!(
                    "unknown date format '{raw}' (expected one of: {})",
                    allowed.join(", ")
                )
            })
    }
}
