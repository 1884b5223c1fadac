use std::{fmt::Display, ops::Deref};

use serde::{Deserialize, Serialize};

/// Share of a whole, rounded to one decimal place.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage((value * 10.).round() / 10.))
        }
    }

    /// `part` out of `whole`. There's no meaningful share of nothing, so a zero whole gives
    /// `None`.
    pub fn of(part: usize, whole: usize) -> Option<Percentage> {
        if whole == 0 {
            return None;
        }
        Percentage::new_opt(part as f64 / whole as f64 * 100.)
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
