use chrono::{DateTime, Local, TimeZone, Utc};

use crate::{
    backup::{BackupReminder, ReminderReason},
    buckets::{self, Period},
    config::Settings,
    error::RecordError,
    persist::{KeyValueStorage, RecordGateway},
    record::{DrinkRecord, RecordInput},
    stats::{self, SortKey, StatsReport},
    store::RecordStore,
    transfer::{self, ExportFile},
};

/// All mutable application state. Every mutation is saved through the
/// gateway before the call returns.
pub struct Session<S> {
    store: RecordStore,
    gateway: RecordGateway<S>,
    backup: BackupReminder,
    editing: Option<String>,
    period: Period,
    sort_key: SortKey,
    load_error: Option<String>,
}

impl<S: KeyValueStorage> Session<S> {
    pub fn open(storage: S, settings: Settings) -> Result<Self, RecordError> {
        let mut gateway = RecordGateway::new(storage, settings.storage);
        let (records, load_error) = match gateway.load() {
            Ok(records) => (records.unwrap_or_default(), None),
            Err(RecordError::Format(reason)) => {
                let diagnostic = match gateway.set_aside_records(Utc::now().timestamp_millis())? {
                    Some(key) => format!("{reason}; the unreadable data was kept as {key}"),
                    None => reason,
                };
                log::warn!("starting with no records: {diagnostic}");
                (Vec::new(), Some(diagnostic))
            }
            Err(err) => return Err(err),
        };
        let backup_state = gateway.load_backup_state()?;
        let store = RecordStore::from_records(records);
        let period = buckets::default_selection(store.list(), &Local, &Local::now());

        log::info!(
            "session opened with {} records, showing {}-{:02}",
            store.len(),
            period.year,
            period.month
        );

        Ok(Self {
            store,
            gateway,
            backup: BackupReminder::new(settings.backup, backup_state),
            editing: None,
            period,
            sort_key: settings.default_sort,
            load_error,
        })
    }

    /// Why the stored records could not be read at startup, if they couldn't.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn records(&self) -> &[DrinkRecord] {
        self.store.list()
    }

    pub fn add(&mut self, input: RecordInput) -> Result<DrinkRecord, RecordError> {
        let record = self.store.add(input, Utc::now().timestamp_millis())?;
        self.persist()?;
        Ok(record)
    }

    pub fn update(&mut self, id: &str, input: RecordInput) -> Result<DrinkRecord, RecordError> {
        let record = self.store.update(id, input)?.clone();
        self.persist()?;
        Ok(record)
    }

    pub fn remove(&mut self, id: &str) -> Result<DrinkRecord, RecordError> {
        let removed = self.store.remove(id)?;
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        self.persist()?;
        Ok(removed)
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn begin_edit(&mut self, id: &str) -> Result<&DrinkRecord, RecordError> {
        let Some(record) = self.store.get(id) else {
            return Err(RecordError::NotFound(id.to_string()));
        };
        self.editing = Some(id.to_string());
        Ok(record)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Saves the entry form: updates the record being edited, or adds a new one.
    /// The editing id is kept when the submission fails.
    pub fn submit(&mut self, input: RecordInput) -> Result<DrinkRecord, RecordError> {
        let record = match self.editing.clone() {
            Some(id) => self.update(&id, input)?,
            None => self.add(input)?,
        };
        self.editing = None;
        Ok(record)
    }

    /// Merges an import payload. Returns the number of new records.
    pub fn import_text(&mut self, text: &str) -> Result<usize, RecordError> {
        let incoming = transfer::parse_import(text)?;
        let total = incoming.len();
        let added = self.store.import_merge(incoming);
        log::info!("imported {added} new records ({total} in file)");
        self.persist()?;
        Ok(added)
    }

    pub fn clear(&mut self) -> Result<(), RecordError> {
        self.gateway.clear_records()?;
        self.store.clear();
        self.editing = None;
        self.period = buckets::default_selection(self.store.list(), &Local, &Local::now());
        log::info!("cleared all records");
        Ok(())
    }

    /// Builds the export file. `None` when there is nothing to export.
    /// Nothing is recorded until the caller has written the file and calls
    /// [`Session::record_backup`].
    pub fn export<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Option<ExportFile>, RecordError> {
        let file = transfer::export(self.store.list(), now.with_timezone(&Utc).date_naive())?;
        if let Some(file) = &file {
            log::debug!("built export {} with {} records", file.file_name, self.store.len());
        }
        Ok(file)
    }

    /// Stamps a written export as the last backup. Returns the stored time.
    pub fn record_backup<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Result<String, RecordError>
    where
        Tz::Offset: std::fmt::Display,
    {
        let mut backup = self.backup.clone();
        let stamp = backup.record_backup(now);
        self.gateway.save_backup_state(backup.state())?;
        self.backup = backup;
        log::info!("recorded backup at {stamp}");
        Ok(stamp)
    }

    pub fn last_backup(&self) -> Option<&str> {
        self.backup.state().last_backup.as_deref()
    }

    pub fn backup_due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<ReminderReason> {
        self.backup.due_reason(now)
    }

    pub fn remind_later(&mut self, now_ms: i64) -> Result<i64, RecordError> {
        let until = self.backup.remind_later(now_ms);
        self.gateway.save_backup_state(self.backup.state())?;
        Ok(until)
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn years(&self) -> Vec<i32> {
        buckets::year_options(self.store.list(), &Local, &Local::now())
    }

    pub fn months(&self) -> Vec<u32> {
        buckets::month_options(self.store.list(), self.period.year, &Local, &Local::now())
    }

    pub fn select_year(&mut self, year: i32) -> Period {
        self.period = Period::for_year(self.store.list(), year, &Local, &Local::now());
        self.period
    }

    pub fn select_period(&mut self, period: Period) -> Result<Period, RecordError> {
        if !(1..=12).contains(&period.month) {
            return Err(RecordError::Validation(format!(
                "month must be between 1 and 12, got {}",
                period.month
            )));
        }
        self.period = period;
        Ok(self.period)
    }

    pub fn sort_by(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    pub fn stats(&self) -> StatsReport {
        stats::compute(self.store.list(), self.period, self.sort_key, &Local)
    }

    pub fn storage(&self) -> &S {
        self.gateway.storage()
    }

    fn persist(&mut self) -> Result<(), RecordError> {
        if let Err(err) = self.gateway.save(self.store.list()) {
            log::warn!("failed to save records, will retry on next change: {err}");
            return Err(err);
        }
        Ok(())
    }
}
