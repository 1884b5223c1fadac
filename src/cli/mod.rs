pub mod output;

use std::{
    fmt::Display,
    io::{self, IsTerminal, Write},
    path::PathBuf,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use output::{render_coins, render_settings, render_statistics, TerminalNotifier};
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};

use crate::{
    ledger::{
        entities::{Coin, CoinType, SettingsUpdate},
        transfer::ImportError,
        DailyLedger,
    },
    reminder::{shutdown::detect_shutdown, ReminderModule},
    storage::file_storage::FileStorage,
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::enable_logging,
    },
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "Goldcoin", version, long_about = None)]
#[command(about = "Split your day into time coins and see where it goes", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        env = "GOLDCOIN_DIR",
        help = "Application directory. By default uses $XDG_STATE_HOME/goldcoin or $HOME/.local/state/goldcoin"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        short,
        help = "Day to work with. Examples are \"2025-03-15\", \"yesterday\", \"15/03/2025\". Defaults to today"
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Show coins of the day")]
    Show {},
    #[command(about = "Tag a coin with the way its time was spent")]
    Tag {
        #[arg(help = "Position of the coin in the day, starting from 0")]
        index: usize,
        #[arg(value_enum)]
        kind: CoinType,
        #[arg(help = "Optional note about the coin")]
        description: Vec<String>,
    },
    #[command(about = "Remove tag and note from a coin")]
    Reset { index: usize },
    #[command(about = "Show statistics and warnings for the day")]
    Stats {
        #[arg(long, help = "Print as json")]
        json: bool,
    },
    #[command(about = "Show or change settings. Timing changes only apply to days without coins")]
    Settings {
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=24))]
        start_hour: Option<u32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=24))]
        end_hour: Option<u32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..), help = "Minutes per coin")]
        coin_duration: Option<u32>,
        #[arg(long)]
        reminders: Option<bool>,
        #[arg(long = "label", value_parser = parse_label, help = "Custom label as KEY=VALUE")]
        labels: Vec<(String, String)>,
    },
    #[command(about = "Export every recorded day and settings into a json file")]
    Export {
        #[arg(long, help = "Output file. Defaults to gold_coin_export_<date>.json")]
        out: Option<PathBuf>,
    },
    #[command(about = "Replace recorded days and settings with an exported file")]
    Import { path: PathBuf },
    #[command(about = "Delete every recorded day")]
    Clear {
        #[arg(long, help = "Don't ask for confirmation")]
        yes: bool,
    },
    #[command(about = "Notify when each coin of the day ends. Stops with ctrl-c")]
    Remind {},
}

fn parse_label(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("Expected KEY=VALUE, got {value}"))
}

/// Accepts ISO dates as well as natural expressions like "yesterday".
fn parse_day(value: &str, style: DateStyle, now: DateTime<Local>) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(value, now, style.into())
        .map(|v| v.date_naive())
        .map_err(|e| {
            Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate date {value}: {e}"),
                )
                .into()
        })
}

fn ask_confirmation() -> bool {
    print!("Delete all recorded coins? This can't be undone [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    io::stdin().read_line(&mut answer).is_ok()
        && matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn coin_id(ledger: &DailyLedger<FileStorage>, index: usize) -> String {
    Coin::make_id(&ledger.today_string(), index)
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(&app_dir, logging_level, args.log)?;

    let storage = FileStorage::new(app_dir)?;
    let mut ledger = DailyLedger::open(storage, Box::new(DefaultClock))?;
    if let Some(date) = args.date {
        ledger.set_date(parse_day(&date, args.date_style, Local::now())?)?;
    }

    let colored = io::stdout().is_terminal();

    match args.commands {
        Commands::Show {} => {
            let now = DefaultClock.time();
            println!("{}", ledger.today_string());
            print!("{}", render_coins(ledger.today_coins()?, now, colored));
        }
        Commands::Tag {
            index,
            kind,
            description,
        } => {
            let id = coin_id(&ledger, index);
            check_index(&mut ledger, index)?;
            ledger.update_coin_type(&id, Some(kind), description.join(" "))?;
            println!("Tagged coin {index} as {}", kind.name());
        }
        Commands::Reset { index } => {
            let id = coin_id(&ledger, index);
            check_index(&mut ledger, index)?;
            ledger.reset_coin(&id)?;
            println!("Reset coin {index}");
        }
        Commands::Stats { json } => {
            let statistics = ledger.statistics()?;
            let traps = ledger.traps()?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "date": ledger.today_string(),
                        "statistics": statistics,
                        "traps": traps.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    }))?
                );
            } else {
                print!("{}", render_statistics(&statistics, &traps, colored));
            }
        }
        Commands::Settings {
            start_hour,
            end_hour,
            coin_duration,
            reminders,
            labels,
        } => {
            let custom_labels = (!labels.is_empty()).then(|| {
                let mut merged = ledger.settings().custom_labels.clone();
                merged.extend(labels);
                merged
            });
            let update = SettingsUpdate {
                start_hour,
                end_hour,
                coin_duration,
                reminder_enabled: reminders,
                custom_labels,
            };
            if !update.is_empty() {
                ledger.update_settings(update)?;
            }
            print!("{}", render_settings(ledger.settings()));
        }
        Commands::Export { out } => {
            let path = out.unwrap_or_else(|| PathBuf::from(ledger.export_file_name()));
            let file = tokio::fs::File::create(&path).await?;
            ledger.export_data(file).await?;
            println!("Exported into {}", path.display());
        }
        Commands::Import { path } => {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(ImportError::Read)?;
            ledger.import_data(file).await?;
            println!("Imported {}", path.display());
        }
        Commands::Clear { yes } => {
            if ledger.clear_all_data(|| yes || ask_confirmation())? {
                println!("Cleared all data");
            } else {
                println!("Nothing was cleared");
            }
        }
        Commands::Remind {} => run_reminders(&mut ledger).await?,
    }
    Ok(())
}

fn check_index(ledger: &mut DailyLedger<FileStorage>, index: usize) -> Result<()> {
    let count = ledger.today_coins()?.len();
    if index >= count {
        return Err(anyhow!(
            "{} has {count} coins, there's no coin {index}",
            ledger.today_string()
        ));
    }
    Ok(())
}

async fn run_reminders(ledger: &mut DailyLedger<FileStorage>) -> Result<()> {
    if !ledger.settings().reminder_enabled {
        println!("Reminders are off. Turn them on with `goldcoin settings --reminders true`");
        return Ok(());
    }

    let coins = ledger.today_coins()?.to_vec();
    let shutdown_token = CancellationToken::new();
    let module = ReminderModule::new(
        coins,
        TerminalNotifier,
        shutdown_token.clone(),
        Box::new(DefaultClock),
    );

    let (_, sent) = tokio::join!(detect_shutdown(shutdown_token.clone()), async {
        let sent = module.run().await;
        shutdown_token.cancel();
        sent
    });
    info!("Sent {} reminders", sent?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone};
    use clap::Parser;

    use super::{parse_day, parse_label, Args, Commands, DateStyle};

    #[test]
    fn test_parse_day_iso() -> anyhow::Result<()> {
        let now = Local.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap();
        assert_eq!(
            parse_day("2018-03-15", DateStyle::Uk, now)?,
            NaiveDate::from_ymd_opt(2018, 3, 15).unwrap()
        );
        Ok(())
    }

    #[test]
    fn test_parse_day_natural() -> anyhow::Result<()> {
        let now = Local.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap();
        assert_eq!(
            parse_day("yesterday", DateStyle::Uk, now)?,
            NaiveDate::from_ymd_opt(2018, 7, 3).unwrap()
        );
        assert_eq!(
            parse_day("15/03/2018", DateStyle::Uk, now)?,
            NaiveDate::from_ymd_opt(2018, 3, 15).unwrap()
        );
        assert!(parse_day("the day after never", DateStyle::Uk, now).is_err());
        Ok(())
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(
            parse_label("yellow = deep work"),
            Ok(("yellow".to_string(), "deep work".to_string()))
        );
        assert!(parse_label("missing").is_err());
        assert!(parse_label("=value").is_err());
    }

    #[test]
    fn test_parse_tag_command() {
        let args = Args::parse_from(["goldcoin", "tag", "3", "yellow", "writing", "docs"]);
        match args.commands {
            Commands::Tag {
                index,
                kind,
                description,
            } => {
                assert_eq!(index, 3);
                assert_eq!(kind, crate::ledger::entities::CoinType::Yellow);
                assert_eq!(description.join(" "), "writing docs");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_settings_bounds() {
        for rejected in [
            ["goldcoin", "settings", "--start-hour", "25"],
            ["goldcoin", "settings", "--end-hour", "100000000"],
            ["goldcoin", "settings", "--coin-duration", "0"],
        ] {
            assert!(Args::try_parse_from(rejected).is_err(), "{rejected:?}");
        }

        let args = Args::try_parse_from([
            "goldcoin",
            "settings",
            "--start-hour",
            "0",
            "--end-hour",
            "24",
            "--coin-duration",
            "15",
        ]);
        match args.map(|v| v.commands) {
            Ok(Commands::Settings {
                start_hour,
                end_hour,
                coin_duration,
                ..
            }) => {
                assert_eq!(start_hour, Some(0));
                assert_eq!(end_hour, Some(24));
                assert_eq!(coin_duration, Some(15));
            }
            other => panic!("unexpected parse result {other:?}"),
        }
    }
}
