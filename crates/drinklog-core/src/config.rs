use crate::stats::SortKey;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageSettings {
    pub records_key: String,
    pub last_backup_key: String,
    pub next_reminder_key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            records_key: "drinkRecords".to_string(),
            last_backup_key: "lastBackupTime".to_string(),
            next_reminder_key: "nextBackupReminder".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupSettings {
    pub enabled: bool,
    /// Day of month (1-31) on which a reminder is always shown.
    pub reminder_day_of_month: u32,
    pub stale_after_days: i64,
    pub snooze_days: i64,
}

impl BackupSettings {
    pub fn snooze_millis(&self) -> i64 {
        self.snooze_days * 86_400_000
    }
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reminder_day_of_month: 1,
            stale_after_days: 30,
            snooze_days: 7,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    pub storage: StorageSettings,
    pub backup: BackupSettings,
    pub default_sort: SortKey,
}
