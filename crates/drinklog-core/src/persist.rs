use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
};

use crate::{backup::BackupState, config::StorageSettings, error::RecordError, record::DrinkRecord};

/// String key-value storage that mirrors the application's state.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Result<Option<String>, RecordError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), RecordError>;
    fn remove(&mut self, key: &str) -> Result<(), RecordError>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, RecordError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), RecordError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), RecordError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key inside `dir`.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, RecordError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(RecordError::Storage(format!("invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, RecordError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), RecordError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), RecordError> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Loads and saves the record list as a single JSON blob, plus the backup
/// bookkeeping keys.
#[derive(Clone, Debug)]
pub struct RecordGateway<S> {
    storage: S,
    keys: StorageSettings,
}

impl<S: KeyValueStorage> RecordGateway<S> {
    pub fn new(storage: S, keys: StorageSettings) -> Self {
        Self { storage, keys }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// `None` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Vec<DrinkRecord>>, RecordError> {
        let Some(raw) = self.storage.get(&self.keys.records_key)? else {
            log::info!("no stored records under {}", self.keys.records_key);
            return Ok(None);
        };
        let records: Vec<DrinkRecord> = serde_json::from_str(&raw)
            .map_err(|e| RecordError::Format(format!("stored records are malformed: {e}")))?;
        log::debug!("loaded {} records", records.len());
        Ok(Some(records))
    }

    pub fn save(&mut self, records: &[DrinkRecord]) -> Result<(), RecordError> {
        let payload = serde_json::to_string(records)
            .map_err(|e| RecordError::Storage(e.to_string()))?;
        self.storage.set(&self.keys.records_key, &payload)?;
        log::debug!("saved {} records", records.len());
        Ok(())
    }

    pub fn clear_records(&mut self) -> Result<(), RecordError> {
        self.storage.remove(&self.keys.records_key)
    }

    /// Moves the stored records blob to `<records key>.corrupt-<stamp_ms>` and
    /// returns the new key. The blob is copied before the original is removed.
    pub fn set_aside_records(&mut self, stamp_ms: i64) -> Result<Option<String>, RecordError> {
        let Some(raw) = self.storage.get(&self.keys.records_key)? else {
            return Ok(None);
        };
        let key = format!("{}.corrupt-{stamp_ms}", self.keys.records_key);
        self.storage.set(&key, &raw)?;
        self.storage.remove(&self.keys.records_key)?;
        Ok(Some(key))
    }

    pub fn load_backup_state(&self) -> Result<BackupState, RecordError> {
        let last_backup = self.storage.get(&self.keys.last_backup_key)?;
        let next_reminder_ms = match self.storage.get(&self.keys.next_reminder_key)? {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    log::warn!("ignoring unreadable reminder deadline {raw:?}");
                    None
                }
            },
            None => None,
        };
        Ok(BackupState {
            last_backup,
            next_reminder_ms,
        })
    }

    pub fn save_backup_state(&mut self, state: &BackupState) -> Result<(), RecordError> {
        match &state.last_backup {
            Some(value) => self.storage.set(&self.keys.last_backup_key, value)?,
            None => self.storage.remove(&self.keys.last_backup_key)?,
        }
        match state.next_reminder_ms {
            Some(value) => self
                .storage
                .set(&self.keys.next_reminder_key, &value.to_string())?,
            None => self.storage.remove(&self.keys.next_reminder_key)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordInput;

    fn gateway() -> RecordGateway<MemoryStorage> {
        RecordGateway::new(MemoryStorage::default(), StorageSettings::default())
    }

    #[test]
    fn load_without_saved_data_is_none() {
        assert_eq!(gateway().load().expect("load"), None);
    }

    #[test]
    fn save_then_load_returns_records() {
        let mut gateway = gateway();
        let records = vec![DrinkRecord::from_input(
            "a".into(),
            7,
            RecordInput::new("Tea", "A").with_price(4.5),
        )];
        gateway.save(&records).expect("save");

        assert_eq!(gateway.load().expect("load"), Some(records));
        let raw = gateway
            .storage()
            .get("drinkRecords")
            .expect("get")
            .expect("stored");
        assert!(raw.starts_with('['));
    }

    #[test]
    fn malformed_blob_is_a_format_error() {
        let mut storage = MemoryStorage::default();
        storage.set("drinkRecords", "{not json").expect("set");
        let gateway = RecordGateway::new(storage, StorageSettings::default());
        assert!(matches!(gateway.load(), Err(RecordError::Format(_))));
    }

    #[test]
    fn set_aside_keeps_blob_under_new_key() {
        let mut storage = MemoryStorage::default();
        storage.set("drinkRecords", "{not json").expect("set");
        let mut gateway = RecordGateway::new(storage, StorageSettings::default());

        let key = gateway.set_aside_records(42).expect("set aside");
        assert_eq!(key.as_deref(), Some("drinkRecords.corrupt-42"));
        assert_eq!(gateway.load().expect("load"), None);
        assert_eq!(
            gateway.storage().get("drinkRecords.corrupt-42").expect("get"),
            Some("{not json".to_string())
        );
        assert_eq!(gateway.set_aside_records(43).expect("set aside"), None);
    }

    #[test]
    fn backup_state_round_trips_through_keys() {
        let mut gateway = gateway();
        assert_eq!(gateway.load_backup_state().expect("load"), BackupState::default());

        let state = BackupState {
            last_backup: Some("2024-03-01 10:00:00".into()),
            next_reminder_ms: Some(1_700_000_000_000),
        };
        gateway.save_backup_state(&state).expect("save");
        assert_eq!(gateway.load_backup_state().expect("load"), state);
        assert_eq!(
            gateway.storage().get("nextBackupReminder").expect("get"),
            Some("1700000000000".into())
        );
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut storage = FileStorage::open(dir.path()).expect("open");
        assert!(storage.set("../escape", "x").is_err());
        storage.set("drinkRecords", "[]").expect("set");
        assert_eq!(storage.get("drinkRecords").expect("get"), Some("[]".into()));
        storage.remove("drinkRecords").expect("remove");
        assert_eq!(storage.get("drinkRecords").expect("get"), None);
    }
}
