//! Splits your day into time coins, lets you tag each with how it was spent and warns you when
//! the day drifts. Everything lives in a single local JSON document that can be exported and
//! imported.
//!

pub mod cli;
pub mod ledger;
pub mod reminder;
pub mod storage;
pub mod utils;
