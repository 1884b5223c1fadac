//! The ledger keeps every day's coins plus user settings and is the single owner of that state.
//!  - A day's coins are laid out lazily, the first time the day is looked at.
//!  - Every change writes the whole ledger into [LedgerStorage] under [STORAGE_KEY].
//!  - Statistics and traps are derived from the selected day only.

pub mod entities;
pub mod slots;
pub mod statistics;
pub mod transfer;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use entities::{Coin, CoinType, CoinsByDate, PartialLedger, PersistedLedger, Settings, SettingsUpdate};
use slots::generate_coins;
use statistics::{detect_traps, Statistics, Trap};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};
use transfer::{read_import, ExportData, ExportDocument, ImportError, EXPORT_VERSION};

use crate::{
    storage::LedgerStorage,
    utils::{
        clock::Clock,
        time::{date_key, local_date},
    },
};

/// Key the whole ledger is stored under.
pub const STORAGE_KEY: &str = "gold_coin_time_manager";

pub struct DailyLedger<S: LedgerStorage> {
    storage: S,
    clock: Box<dyn Clock>,
    current_date: NaiveDate,
    all_coins: CoinsByDate,
    settings: Settings,
}

impl<S: LedgerStorage> DailyLedger<S> {
    /// Creates an empty ledger with default settings, selecting the clock's local date. Nothing
    /// is read from storage.
    pub fn new(storage: S, clock: Box<dyn Clock>) -> Self {
        let current_date = local_date(clock.time());
        Self {
            storage,
            clock,
            current_date,
            all_coins: CoinsByDate::new(),
            settings: Settings::default(),
        }
    }

    /// Creates a ledger and loads whatever the storage has.
    pub fn open(storage: S, clock: Box<dyn Clock>) -> Result<Self> {
        let mut ledger = Self::new(storage, clock);
        ledger.load_from_storage()?;
        Ok(ledger)
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn today_string(&self) -> String {
        date_key(self.current_date)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn total_coins(&self) -> usize {
        self.settings.total_coins()
    }

    /// Coins recorded for `date` without creating them.
    pub fn coins_for(&self, date: NaiveDate) -> Option<&[Coin]> {
        self.all_coins.get(&date_key(date)).map(Vec::as_slice)
    }

    pub fn recorded_dates(&self) -> impl Iterator<Item = &str> {
        self.all_coins.keys().map(String::as_str)
    }

    /// Coins of the selected date. Lays them out first if the date was never visited.
    pub fn today_coins(&mut self) -> Result<&[Coin]> {
        let key = self.today_string();
        if !self.all_coins.contains_key(&key) {
            self.initialize_daily_coins()?;
        }
        Ok(self.all_coins.get(&key).map(Vec::as_slice).unwrap_or_default())
    }

    pub fn statistics(&mut self) -> Result<Statistics> {
        Ok(Statistics::from_coins(self.today_coins()?))
    }

    pub fn traps(&mut self) -> Result<Vec<Trap>> {
        let total_coins = self.total_coins();
        Ok(detect_traps(self.today_coins()?, total_coins))
    }

    /// Coin of the selected date running at `moment`.
    pub fn current_coin(&mut self, moment: DateTime<Utc>) -> Result<Option<&Coin>> {
        Ok(self.today_coins()?.iter().find(|v| v.contains(moment)))
    }

    /// Lays out the selected date's coins using current settings. Does nothing when the date
    /// already has coins.
    #[instrument(skip(self), fields(date = %self.current_date))]
    pub fn initialize_daily_coins(&mut self) -> Result<()> {
        let key = self.today_string();
        if self.all_coins.contains_key(&key) {
            return Ok(());
        }

        let coins = generate_coins(self.current_date, &self.settings, self.clock.time());
        info!("Initialized {} coins for {key}", coins.len());
        self.all_coins.insert(key, coins);
        self.save_to_storage()
    }

    /// Tags a coin of the selected date. Unknown ids are ignored.
    pub fn update_coin_type(
        &mut self,
        coin_id: &str,
        kind: Option<CoinType>,
        description: impl Into<String>,
    ) -> Result<()> {
        let now = self.clock.time();
        let Some(coin) = self.today_coin_mut(coin_id)? else {
            debug!("Coin {coin_id} not found, nothing to update");
            return Ok(());
        };

        coin.kind = kind;
        coin.description = description.into();
        coin.updated_at = Some(now);
        debug!("Tagged {coin_id} as {kind:?}");

        self.save_to_storage()
    }

    /// Clears type and description of a coin of the selected date. Unknown ids are ignored.
    pub fn reset_coin(&mut self, coin_id: &str) -> Result<()> {
        let Some(coin) = self.today_coin_mut(coin_id)? else {
            debug!("Coin {coin_id} not found, nothing to reset");
            return Ok(());
        };

        coin.kind = None;
        coin.description.clear();

        self.save_to_storage()
    }

    fn today_coin_mut(&mut self, coin_id: &str) -> Result<Option<&mut Coin>> {
        let key = self.today_string();
        if !self.all_coins.contains_key(&key) {
            self.initialize_daily_coins()?;
        }
        Ok(self
            .all_coins
            .get_mut(&key)
            .and_then(|coins| coins.iter_mut().find(|v| v.id == coin_id)))
    }

    pub fn set_date(&mut self, date: NaiveDate) -> Result<()> {
        debug!("Selecting {date}");
        self.current_date = date;
        self.initialize_daily_coins()
    }

    /// Merges `update` into the settings.
    ///
    /// Timing changes only reach days that were never initialized. The selected date is
    /// re-initialized, which leaves it untouched when it already has coins.
    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<()> {
        let touches_timing = update.touches_timing();
        self.settings.merge(update);
        if touches_timing {
            self.initialize_daily_coins()?;
        }
        self.save_to_storage()
    }

    pub fn save_to_storage(&self) -> Result<()> {
        let document = serde_json::to_string(&PersistedLedger {
            all_coins: self.all_coins.clone(),
            settings: self.settings.clone(),
        })?;
        self.storage.set(STORAGE_KEY, &document)
    }

    /// Replaces the in-memory state with the stored document. Unreadable or malformed documents
    /// are logged and the current state is kept. The selected date is always initialized
    /// afterwards.
    pub fn load_from_storage(&mut self) -> Result<()> {
        match self.storage.get(STORAGE_KEY) {
            Ok(Some(document)) => match serde_json::from_str::<PartialLedger>(&document) {
                Ok(PartialLedger {
                    all_coins,
                    settings,
                }) => {
                    self.all_coins = all_coins.unwrap_or_default();
                    if let Some(settings) = settings {
                        self.settings = settings;
                    }
                    info!("Loaded {} recorded days", self.all_coins.len());
                }
                Err(e) => error!("Failed to parse stored ledger, using defaults: {e}"),
            },
            Ok(None) => debug!("Nothing stored yet"),
            Err(e) => error!("Failed to load stored ledger, using defaults: {e:?}"),
        }
        self.initialize_daily_coins()
    }

    pub fn export_document(&self) -> ExportDocument {
        ExportDocument {
            version: EXPORT_VERSION.into(),
            export_time: self.clock.time(),
            data: ExportData {
                all_coins: self.all_coins.clone(),
                settings: self.settings.clone(),
            },
        }
    }

    pub fn export_file_name(&self) -> String {
        transfer::export_file_name(&self.today_string())
    }

    /// Writes a pretty printed export document into `writer`.
    pub async fn export_data(&self, mut writer: impl AsyncWrite + Unpin) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.export_document())?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        info!("Exported {} recorded days", self.all_coins.len());
        Ok(())
    }

    /// Overwrites coins and settings with an export document read from `reader`. Parts missing in
    /// the document keep their current values.
    pub async fn import_data(&mut self, reader: impl AsyncRead + Unpin) -> Result<(), ImportError> {
        let PartialLedger {
            all_coins,
            settings,
        } = read_import(reader)
            .await
            .inspect_err(|e| warn!("Import rejected: {e}"))?;

        if let Some(all_coins) = all_coins {
            self.all_coins = all_coins;
        }
        if let Some(settings) = settings {
            self.settings = settings;
        }
        self.save_to_storage()?;
        info!("Imported {} recorded days", self.all_coins.len());
        Ok(())
    }

    /// Drops every recorded day once `confirm` agrees. Returns whether anything was cleared.
    pub fn clear_all_data(&mut self, confirm: impl FnOnce() -> bool) -> Result<bool> {
        if !confirm() {
            debug!("Clearing declined");
            return Ok(false);
        }

        warn!("Clearing {} recorded days", self.all_coins.len());
        self.all_coins.clear();
        self.initialize_daily_coins()?;
        self.save_to_storage()?;
        Ok(true)
    }
}
