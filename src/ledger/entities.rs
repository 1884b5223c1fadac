use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// All coins of the ledger, keyed by `YYYY-MM-DD`.
pub type CoinsByDate = BTreeMap<String, Vec<Coin>>;

/// How a coin was spent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CoinType {
    Blue,
    Green,
    Yellow,
    Orange,
    Red,
}

impl CoinType {
    pub const ALL: [CoinType; 5] = [
        CoinType::Blue,
        CoinType::Green,
        CoinType::Yellow,
        CoinType::Orange,
        CoinType::Red,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CoinType::Blue => "blue",
            CoinType::Green => "green",
            CoinType::Yellow => "yellow",
            CoinType::Orange => "orange",
            CoinType::Red => "red",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CoinType::Blue => "Quality leisure",
            CoinType::Green => "Basic needs",
            CoinType::Yellow => "Value creation",
            CoinType::Orange => "Passive consumption",
            CoinType::Red => "Wasted time",
        }
    }

    /// Display color as `#RRGGBB`.
    pub fn color(self) -> &'static str {
        match self {
            CoinType::Blue => "#2196F3",
            CoinType::Green => "#4CAF50",
            CoinType::Yellow => "#FFC107",
            CoinType::Orange => "#FF9800",
            CoinType::Red => "#F44336",
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            CoinType::Blue => (0x21, 0x96, 0xF3),
            CoinType::Green => (0x4C, 0xAF, 0x50),
            CoinType::Yellow => (0xFF, 0xC1, 0x07),
            CoinType::Orange => (0xFF, 0x98, 0x00),
            CoinType::Red => (0xF4, 0x43, 0x36),
        }
    }
}

impl Display for CoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A single time slot of a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub id: String,
    pub index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "type", default)]
    pub kind: Option<CoinType>,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Coin {
    pub fn make_id(date_key: &str, index: usize) -> String {
        format!("{date_key}-{index}")
    }

    pub fn contains(&self, moment: DateTime<Utc>) -> bool {
        self.start_time <= moment && moment < self.end_time
    }
}

/// User settings. Every field falls back to its default when a stored document misses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub start_hour: u32,
    pub end_hour: u32,
    /// Minutes per coin.
    pub coin_duration: u32,
    pub reminder_enabled: bool,
    pub custom_labels: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_hour: 7,
            end_hour: 24,
            coin_duration: 30,
            reminder_enabled: true,
            custom_labels: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Amount of coins a newly initialized day gets. A window that doesn't go forward, a zero
    /// duration, or a window too long to count in minutes produce no coins.
    pub fn total_coins(&self) -> usize {
        if self.coin_duration == 0 {
            return 0;
        }
        self.end_hour
            .checked_sub(self.start_hour)
            .and_then(|hours| hours.checked_mul(60))
            .map_or(0, |minutes| (minutes / self.coin_duration) as usize)
    }

    pub fn merge(&mut self, update: SettingsUpdate) {
        let SettingsUpdate {
            start_hour,
            end_hour,
            coin_duration,
            reminder_enabled,
            custom_labels,
        } = update;
        if let Some(v) = start_hour {
            self.start_hour = v;
        }
        if let Some(v) = end_hour {
            self.end_hour = v;
        }
        if let Some(v) = coin_duration {
            self.coin_duration = v;
        }
        if let Some(v) = reminder_enabled {
            self.reminder_enabled = v;
        }
        if let Some(v) = custom_labels {
            self.custom_labels = v;
        }
    }
}

/// Partial settings. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub start_hour: Option<u32>,
    pub end_hour: Option<u32>,
    pub coin_duration: Option<u32>,
    pub reminder_enabled: Option<bool>,
    pub custom_labels: Option<BTreeMap<String, String>>,
}

impl SettingsUpdate {
    /// Whether the update changes how coins are laid out in a day.
    pub fn touches_timing(&self) -> bool {
        self.start_hour.is_some() || self.end_hour.is_some() || self.coin_duration.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == SettingsUpdate::default()
    }
}

/// Shape of the document written into storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLedger {
    pub all_coins: CoinsByDate,
    pub settings: Settings,
}

/// Same document as [PersistedLedger], but read leniently: missing parts stay `None` so the
/// caller decides what to fall back to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialLedger {
    pub all_coins: Option<CoinsByDate>,
    pub settings: Option<Settings>,
}

#[cfg(test)]
mod tests {
    use super::{CoinType, Settings, SettingsUpdate};

    #[test]
    fn test_total_coins_formula() {
        let settings = Settings::default();
        assert_eq!(settings.total_coins(), 34);

        let settings = Settings {
            start_hour: 9,
            end_hour: 17,
            coin_duration: 45,
            ..Settings::default()
        };
        assert_eq!(settings.total_coins(), 10);

        for duration in 1..=90 {
            let settings = Settings {
                start_hour: 6,
                end_hour: 23,
                coin_duration: duration,
                ..Settings::default()
            };
            assert_eq!(settings.total_coins(), (17 * 60 / duration) as usize);
        }
    }

    #[test]
    fn test_total_coins_degenerate_settings() {
        let backwards = Settings {
            start_hour: 20,
            end_hour: 8,
            ..Settings::default()
        };
        assert_eq!(backwards.total_coins(), 0);

        let zero = Settings {
            coin_duration: 0,
            ..Settings::default()
        };
        assert_eq!(zero.total_coins(), 0);
    }

    #[test]
    fn test_total_coins_window_too_long() {
        let settings = Settings {
            start_hour: 0,
            end_hour: 100_000_000,
            coin_duration: 30,
            ..Settings::default()
        };
        assert_eq!(settings.total_coins(), 0);

        let settings = Settings {
            start_hour: 4_000_000_000,
            end_hour: 4_000_000_001,
            coin_duration: 30,
            ..Settings::default()
        };
        assert_eq!(settings.total_coins(), 2);
    }

    #[test]
    fn test_settings_partial_document() -> anyhow::Result<()> {
        let settings: Settings = serde_json::from_str(r#"{"coinDuration": 15}"#)?;
        assert_eq!(
            settings,
            Settings {
                coin_duration: 15,
                ..Settings::default()
            }
        );
        Ok(())
    }

    #[test]
    fn test_settings_merge() {
        let mut settings = Settings::default();
        let update = SettingsUpdate {
            reminder_enabled: Some(false),
            ..SettingsUpdate::default()
        };
        assert!(!update.touches_timing());
        settings.merge(update);
        assert!(!settings.reminder_enabled);
        assert_eq!(settings.coin_duration, 30);
    }

    #[test]
    fn test_coin_type_serialization() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&CoinType::Yellow)?, r#""yellow""#);
        let parsed: CoinType = serde_json::from_str(r#""orange""#)?;
        assert_eq!(parsed, CoinType::Orange);
        Ok(())
    }
}
