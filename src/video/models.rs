//! Per-user watch-time records and the payloads that mutate them.

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

/// Stored state for one user. All durations are milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    /// Daily watch-time limit.
    #[serde(default)]
    pub limit_time: i64,
    /// Watch time accumulated since the start of the day of `last_at`.
    #[serde(default)]
    pub watch_time: i64,
    /// Last access or mutation. `None` only for a user never seen before.
    #[serde(default)]
    pub last_at: Option<DateTime<Local>>,
    /// Shown to the user when the limit is reached. Empty means unset.
    #[serde(default)]
    pub custom_message: String,
}

impl UserState {
    /// State for a user with no stored record.
    pub fn with_limit(limit_time: i64) -> Self {
        Self {
            limit_time,
            ..Self::default()
        }
    }

    /// Zero the watch time if `now` falls on a later local calendar day than
    /// `last_at`. Returns whether a reset happened.
    pub fn reset_if_new_day(&mut self, now: DateTime<Local>) -> bool {
        match self.last_at {
            Some(last) if last.date_naive() != now.date_naive() => {
                self.watch_time = 0;
                self.last_at = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self) -> i64 {
        (self.limit_time - self.watch_time).max(0)
    }
}

/// A watch-time report from the client.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSubmit {
    #[serde(default)]
    pub url: String,
    /// Milliseconds watched since the previous report.
    #[serde(default)]
    pub watch_time: i64,
    /// Client-side timestamp of the report. Informational only.
    #[serde(default)]
    pub at: Option<DateTime<FixedOffset>>,
}

/// Limit and message settings from the client.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSetting {
    #[serde(default)]
    pub limit_time: i64,
    #[serde(default)]
    pub custom_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn serializes_camel_case() {
        let state = UserState {
            limit_time: 60000,
            watch_time: 5000,
            last_at: None,
            custom_message: "go outside".into(),
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "limitTime": 60000,
                "watchTime": 5000,
                "lastAt": null,
                "customMessage": "go outside",
            })
        );
    }

    #[test]
    fn timestamp_round_trips_exactly() {
        let at = noon(2026, 3, 10) + Duration::nanoseconds(123_456_789);
        let state = UserState {
            last_at: Some(at),
            ..UserState::with_limit(1)
        };
        let back: UserState =
            serde_json::from_value(serde_json::to_value(&state).unwrap()).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn missing_fields_default() {
        let state: UserState = serde_json::from_value(json!({"limitTime": 10})).unwrap();
        assert_eq!(state, UserState::with_limit(10));
    }

    #[test]
    fn no_reset_without_last_at() {
        let mut state = UserState::with_limit(100);
        state.watch_time = 50;
        assert!(!state.reset_if_new_day(noon(2026, 3, 10)));
        assert_eq!(state.watch_time, 50);
        assert_eq!(state.last_at, None);
    }

    #[test]
    fn no_reset_same_day() {
        let last = noon(2026, 3, 10);
        let mut state = UserState {
            watch_time: 50,
            last_at: Some(last),
            ..UserState::with_limit(100)
        };
        assert!(!state.reset_if_new_day(last + Duration::hours(3)));
        assert_eq!(state.watch_time, 50);
        assert_eq!(state.last_at, Some(last));
    }

    #[test]
    fn resets_on_next_day() {
        let mut state = UserState {
            watch_time: 50,
            last_at: Some(noon(2026, 3, 9)),
            ..UserState::with_limit(100)
        };
        let now = noon(2026, 3, 10);
        assert!(state.reset_if_new_day(now));
        assert_eq!(state.watch_time, 0);
        assert_eq!(state.last_at, Some(now));
    }

    #[test]
    fn remaining_never_negative() {
        let state = UserState {
            watch_time: 150,
            ..UserState::with_limit(100)
        };
        assert_eq!(state.remaining(), 0);
    }

    #[test]
    fn setting_message_is_optional() {
        let setting: VideoSetting = serde_json::from_value(json!({"limitTime": 5})).unwrap();
        assert_eq!(setting.limit_time, 5);
        assert!(setting.custom_message.is_empty());
    }

    #[test]
    fn omitted_amounts_are_zero() {
        let submit: VideoSubmit = serde_json::from_value(json!({"url": "https://v"})).unwrap();
        assert_eq!(submit.watch_time, 0);

        let setting: VideoSetting =
            serde_json::from_value(json!({"customMessage": "hi"})).unwrap();
        assert_eq!(setting.limit_time, 0);
        assert_eq!(setting.custom_message, "hi");
    }
}
