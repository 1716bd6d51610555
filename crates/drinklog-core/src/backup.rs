use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone};

use crate::config::BackupSettings;

/// Format of the human-readable last-backup time.
pub const LAST_BACKUP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackupState {
    pub last_backup: Option<String>,
    pub next_reminder_ms: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReminderReason {
    DayOfMonth,
    NeverBackedUp,
    Stale,
    SnoozeElapsed,
}

#[derive(Clone, Debug)]
pub struct BackupReminder {
    settings: BackupSettings,
    state: BackupState,
}

impl BackupReminder {
    pub fn new(settings: BackupSettings, state: BackupState) -> Self {
        Self { settings, state }
    }

    pub fn state(&self) -> &BackupState {
        &self.state
    }

    pub fn due_reason<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<ReminderReason> {
        if !self.settings.enabled {
            return None;
        }

        if now.day() == self.settings.reminder_day_of_month {
            return Some(ReminderReason::DayOfMonth);
        }

        if self.state.last_backup.is_none() && self.state.next_reminder_ms.is_none() {
            return Some(ReminderReason::NeverBackedUp);
        }

        if let Some(last) = self.last_backup_at(&now.timezone()) {
            if now.clone() - last > Duration::days(self.settings.stale_after_days) {
                return Some(ReminderReason::Stale);
            }
        }

        if Self::is_past(self.state.next_reminder_ms, now.timestamp_millis()) {
            return Some(ReminderReason::SnoozeElapsed);
        }

        None
    }

    /// Pushes the next reminder out by the snooze period. Returns the deadline.
    pub fn remind_later(&mut self, now_ms: i64) -> i64 {
        let until = now_ms.saturating_add(self.settings.snooze_millis());
        self.state.next_reminder_ms = Some(until);
        until
    }

    /// Stamps a completed export. Returns the stored human-readable time.
    pub fn record_backup<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let stamp = now.format(LAST_BACKUP_FORMAT).to_string();
        self.state.last_backup = Some(stamp.clone());
        stamp
    }

    fn last_backup_at<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        let raw = self.state.last_backup.as_deref()?;
        let naive = NaiveDateTime::parse_from_str(raw, LAST_BACKUP_FORMAT).ok()?;
        tz.from_local_datetime(&naive).earliest()
    }

    fn is_past(until: Option<i64>, now_ms: i64) -> bool {
        until.is_some_and(|value| now_ms > value)
    }
}
