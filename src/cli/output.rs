use std::fmt::{self, Display};

use ansi_term::Colour;
use anyhow::Result;
use chrono::{DateTime, Local, Utc};

use crate::{
    ledger::{
        entities::{Coin, CoinType, Settings},
        statistics::{Statistics, Trap},
    },
    reminder::Notifier,
};

const UNTAGGED: &str = "-";

fn paint(kind: Option<CoinType>, text: &str, colored: bool) -> String {
    match kind {
        Some(kind) if colored => {
            let (r, g, b) = kind.rgb();
            Colour::RGB(r, g, b).paint(text).to_string()
        }
        _ => text.to_string(),
    }
}

fn format_span(coin: &Coin) -> String {
    format!(
        "{}-{}",
        coin.start_time.with_timezone(&Local).format("%H:%M"),
        coin.end_time.with_timezone(&Local).format("%H:%M")
    )
}

struct CoinsView<'a> {
    coins: &'a [Coin],
    now: DateTime<Utc>,
    colored: bool,
}

impl Display for CoinsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for coin in self.coins {
            let marker = if coin.contains(self.now) { '>' } else { ' ' };
            let kind = coin.kind.map(|v| v.name()).unwrap_or(UNTAGGED);
            writeln!(
                f,
                "{marker}{:>3}  {}  {:<20}  {}",
                coin.index,
                format_span(coin),
                paint(coin.kind, &format!("● {kind}"), self.colored),
                coin.description
            )?;
        }
        Ok(())
    }
}

struct StatisticsView<'a> {
    statistics: &'a Statistics,
    traps: &'a [Trap],
    colored: bool,
}

impl Display for StatisticsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let statistics = self.statistics;
        writeln!(f, "Coins: {}", statistics.total)?;
        for (kind, count) in &statistics.by_type {
            let percentage = statistics
                .percentages
                .get(kind)
                .map(|v| v.to_string())
                .unwrap_or_else(|| UNTAGGED.to_string());
            writeln!(
                f,
                "  {:<28}{count:>4}  {percentage:>6}",
                paint(Some(*kind), &format!("● {} ({kind})", kind.name()), self.colored),
            )?;
        }
        writeln!(f, "  {:<28}{:>4}", "Untagged", statistics.untagged())?;

        if !self.traps.is_empty() {
            writeln!(f)?;
            for trap in self.traps {
                writeln!(f, "! {trap}")?;
            }
        }
        Ok(())
    }
}

struct SettingsView<'a>(&'a Settings);

impl Display for SettingsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.0;
        writeln!(f, "Start hour:      {}", settings.start_hour)?;
        writeln!(f, "End hour:        {}", settings.end_hour)?;
        writeln!(f, "Coin duration:   {} minutes", settings.coin_duration)?;
        writeln!(f, "Coins per day:   {}", settings.total_coins())?;
        writeln!(
            f,
            "Reminders:       {}",
            if settings.reminder_enabled { "on" } else { "off" }
        )?;
        for (key, value) in &settings.custom_labels {
            writeln!(f, "Label {key}: {value}")?;
        }
        Ok(())
    }
}

/// One line per coin. The coin running at `now` is marked with `>`.
pub fn render_coins(coins: &[Coin], now: DateTime<Utc>, colored: bool) -> String {
    CoinsView {
        coins,
        now,
        colored,
    }
    .to_string()
}

pub fn render_statistics(statistics: &Statistics, traps: &[Trap], colored: bool) -> String {
    StatisticsView {
        statistics,
        traps,
        colored,
    }
    .to_string()
}

pub fn render_settings(settings: &Settings) -> String {
    SettingsView(settings).to_string()
}

/// Prints reminders into the terminal.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&mut self, coin: &Coin) -> Result<()> {
        println!(
            "Coin {} ({}) is over, tag it with `goldcoin tag {} <type>`",
            coin.index,
            format_span(coin),
            coin.index
        );
        Ok(())
    }
}
