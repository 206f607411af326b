//! Persisted reminder settings.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Supported reminder lead times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum LeadTime {
    #[default]
    TenMinutes,
    TwentyMinutes,
    ThirtyMinutes,
    SixtyMinutes,
}

impl LeadTime {
    pub const ALL: [LeadTime; 4] = [
        Self::TenMinutes,
        Self::TwentyMinutes,
        Self::ThirtyMinutes,
        Self::SixtyMinutes,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            Self::TenMinutes => 10,
            Self::TwentyMinutes => 20,
            Self::ThirtyMinutes => 30,
            Self::SixtyMinutes => 60,
        }
    }
}

/// Lead time outside the supported set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedLeadTime(pub u32);

impl Display for UnsupportedLeadTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported lead time {} minutes; expected 10|20|30|60",
            self.0
        )
    }
}

impl Error for UnsupportedLeadTime {}

impl TryFrom<u32> for LeadTime {
    type Error = UnsupportedLeadTime;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|lead| lead.minutes() == value)
            .ok_or(UnsupportedLeadTime(value))
    }
}

impl From<LeadTime> for u32 {
    fn from(value: LeadTime) -> Self {
        value.minutes()
    }
}

/// User settings that survive restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub reminders_enabled: bool,
    pub lead_time_minutes: LeadTime,
}

#[cfg(test)]
mod tests {
    use super::{LeadTime, Settings};

    #[test]
    fn lead_time_accepts_only_supported_minutes() {
        assert_eq!(LeadTime::try_from(30), Ok(LeadTime::ThirtyMinutes));
        assert!(LeadTime::try_from(15).is_err());
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"leadTimeMinutes": 60}"#).unwrap();
        assert!(!settings.reminders_enabled);
        assert_eq!(settings.lead_time_minutes, LeadTime::SixtyMinutes);

        assert!(serde_json::from_str::<Settings>(r#"{"leadTimeMinutes": 45}"#).is_err());
    }
}
