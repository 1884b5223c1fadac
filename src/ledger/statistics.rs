use std::{collections::BTreeMap, fmt::Display};

use serde::Serialize;

use crate::utils::percentage::Percentage;

use super::entities::{Coin, CoinType};

/// Consecutive wasted coins needed to raise [Trap::WastedStreak].
pub const WASTED_STREAK_THRESHOLD: usize = 3;
/// Minimum share of the day's coins that should create value.
pub const VALUE_CREATION_MIN_SHARE: f64 = 0.3;
/// Maximum share of the day's coins that may be passive consumption.
pub const PASSIVE_CONSUMPTION_MAX_SHARE: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: usize,
    pub by_type: BTreeMap<CoinType, usize>,
    /// Empty when there are no coins at all.
    pub percentages: BTreeMap<CoinType, Percentage>,
}

impl Statistics {
    pub fn from_coins(coins: &[Coin]) -> Self {
        let mut by_type = CoinType::ALL
            .into_iter()
            .map(|v| (v, 0usize))
            .collect::<BTreeMap<_, _>>();

        for kind in coins.iter().filter_map(|v| v.kind) {
            *by_type.entry(kind).or_default() += 1;
        }

        let total = coins.len();
        let percentages = by_type
            .iter()
            .filter_map(|(kind, count)| Percentage::of(*count, total).map(|p| (*kind, p)))
            .collect();

        Self {
            total,
            by_type,
            percentages,
        }
    }

    pub fn count(&self, kind: CoinType) -> usize {
        self.by_type.get(&kind).copied().unwrap_or(0)
    }

    pub fn untagged(&self) -> usize {
        self.total - self.by_type.values().sum::<usize>()
    }
}

/// Warning about how the day is going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Trap {
    WastedStreak { length: usize },
    InsufficientValueCreation,
    ExcessivePassiveConsumption,
}

impl Display for Trap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trap::WastedStreak { length } => write!(
                f,
                "Found {length} wasted coins in a row, consider adjusting right away!"
            ),
            Trap::InsufficientValueCreation => write!(
                f,
                "Not enough time creating value, try to earn more yellow coins!"
            ),
            Trap::ExcessivePassiveConsumption => write!(
                f,
                "Too much passive consumption, cut down on needless meetings and social media!"
            ),
        }
    }
}

/// Longest run of consecutive coins tagged as `kind`.
pub fn longest_run(coins: &[Coin], kind: CoinType) -> usize {
    let mut current = 0;
    let mut longest = 0;
    for coin in coins {
        if coin.kind == Some(kind) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Evaluates traps for a day. Shares are measured against `total_coins` of the current settings,
/// not against the amount of coins the day actually has.
pub fn detect_traps(coins: &[Coin], total_coins: usize) -> Vec<Trap> {
    let mut traps = Vec::new();

    let streak = longest_run(coins, CoinType::Red);
    if streak >= WASTED_STREAK_THRESHOLD {
        traps.push(Trap::WastedStreak { length: streak });
    }

    let statistics = Statistics::from_coins(coins);
    let total = total_coins as f64;

    if (statistics.count(CoinType::Yellow) as f64) < total * VALUE_CREATION_MIN_SHARE {
        traps.push(Trap::InsufficientValueCreation);
    }

    if statistics.count(CoinType::Orange) as f64 > total * PASSIVE_CONSUMPTION_MAX_SHARE {
        traps.push(Trap::ExcessivePassiveConsumption);
    }

    traps
}
