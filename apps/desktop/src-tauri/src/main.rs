use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{Local, Utc};
use drinklog_core::{
    DrinkRecord, RecordError, RecordInput, Session,
    backup::ReminderReason,
    buckets::Period,
    config::Settings,
    persist::FileStorage,
    stats::{SortKey, StatsReport, format_price},
};
use serde::{Deserialize, Serialize};

const PODIUM_SIZE: usize = 3;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("io error: {0}")]
    Io(String),
    #[error(transparent)]
    Record(#[from] RecordError),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RankingRowDto {
    rank: usize,
    podium: bool,
    brand: String,
    count: usize,
    total_calories: u64,
    total_price: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StatsDto {
    year: i32,
    month: u32,
    sort: SortKey,
    total_count: usize,
    total_calories: u64,
    total_price: String,
    ranking: Vec<RankingRowDto>,
}

impl From<StatsReport> for StatsDto {
    fn from(value: StatsReport) -> Self {
        let ranking = value
            .ranking
            .into_iter()
            .enumerate()
            .map(|(index, brand)| RankingRowDto {
                rank: index + 1,
                podium: index < PODIUM_SIZE,
                brand: brand.brand,
                count: brand.count,
                total_calories: brand.total_calories,
                total_price: format_price(brand.total_price),
            })
            .collect();

        Self {
            year: value.period.year,
            month: value.period.month,
            sort: value.sort_key,
            total_count: value.overview.total_count,
            total_calories: value.overview.total_calories,
            total_price: value.overview.total_price_display(),
            ranking,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FiltersDto {
    years: Vec<i32>,
    months: Vec<u32>,
    year: i32,
    month: u32,
    sort: SortKey,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct BackupStatusDto {
    last_backup: Option<String>,
    due: bool,
    reason: Option<String>,
    load_error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExportDto {
    path: String,
    records: usize,
}

struct AppState {
    export_dir: PathBuf,
    session: Mutex<Session<FileStorage>>,
}

impl AppState {
    fn init() -> Result<Self, AppError> {
        let base = default_data_dir();
        let storage = FileStorage::open(&base)?;
        let session = Session::open(storage, Settings::default())?;
        log::info!("data directory: {}", base.display());

        Ok(Self {
            export_dir: default_export_dir(&base),
            session: Mutex::new(session),
        })
    }

    fn session(&self) -> Result<MutexGuard<'_, Session<FileStorage>>, AppError> {
        self.session
            .lock()
            .map_err(|e| AppError::Io(format!("mutex poisoned: {e}")))
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DRINKLOG_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("drinklog");
    }

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".local/share/drinklog")
}

fn default_export_dir(data_dir: &Path) -> PathBuf {
    let downloads = std::env::var("HOME")
        .map(|home| Path::new(&home).join("Downloads"))
        .ok();
    match downloads {
        Some(dir) if dir.is_dir() => dir,
        _ => data_dir.to_path_buf(),
    }
}

fn reason_label(reason: ReminderReason) -> &'static str {
    match reason {
        ReminderReason::DayOfMonth => "monthly backup day",
        ReminderReason::NeverBackedUp => "no backup yet",
        ReminderReason::Stale => "last backup is over a month old",
        ReminderReason::SnoozeElapsed => "reminder snooze has ended",
    }
}

fn backup_status(session: &Session<FileStorage>) -> BackupStatusDto {
    let reason = session.backup_due(&Local::now());
    BackupStatusDto {
        last_backup: session.last_backup().map(str::to_string),
        due: reason.is_some(),
        reason: reason.map(|r| reason_label(r).to_string()),
        load_error: session.load_error().map(str::to_string),
    }
}

fn filters(session: &Session<FileStorage>) -> FiltersDto {
    let period = session.period();
    FiltersDto {
        years: session.years(),
        months: session.months(),
        year: period.year,
        month: period.month,
        sort: session.sort_key(),
    }
}

fn notify_backup_due(reason: ReminderReason) {
    let body = format!("Time to export your drink records ({}).", reason_label(reason));
    if let Err(e) = notify_rust::Notification::new()
        .summary("Drink Log backup")
        .body(&body)
        .show()
    {
        log::warn!("could not show backup notification: {e}");
    }
}

#[tauri::command]
fn list_records(state: tauri::State<'_, AppState>) -> Result<Vec<DrinkRecord>, AppError> {
    Ok(state.session()?.records().to_vec())
}

#[tauri::command]
fn begin_edit(id: String, state: tauri::State<'_, AppState>) -> Result<DrinkRecord, AppError> {
    let mut session = state.session()?;
    Ok(session.begin_edit(&id)?.clone())
}

#[tauri::command]
fn cancel_edit(state: tauri::State<'_, AppState>) -> Result<(), AppError> {
    state.session()?.cancel_edit();
    Ok(())
}

#[tauri::command]
fn submit_record(
    input: RecordInput,
    state: tauri::State<'_, AppState>,
) -> Result<DrinkRecord, AppError> {
    Ok(state.session()?.submit(input)?)
}

#[tauri::command]
fn delete_record(id: String, state: tauri::State<'_, AppState>) -> Result<(), AppError> {
    state.session()?.remove(&id)?;
    Ok(())
}

#[tauri::command]
fn get_filters(state: tauri::State<'_, AppState>) -> Result<FiltersDto, AppError> {
    Ok(filters(&state.session()?))
}

#[tauri::command]
fn select_year(year: i32, state: tauri::State<'_, AppState>) -> Result<FiltersDto, AppError> {
    let mut session = state.session()?;
    session.select_year(year);
    Ok(filters(&session))
}

#[tauri::command]
fn select_period(
    year: i32,
    month: u32,
    state: tauri::State<'_, AppState>,
) -> Result<FiltersDto, AppError> {
    let mut session = state.session()?;
    session.select_period(Period::new(year, month))?;
    Ok(filters(&session))
}

#[tauri::command]
fn set_sort(sort: SortKey, state: tauri::State<'_, AppState>) -> Result<StatsDto, AppError> {
    let mut session = state.session()?;
    session.sort_by(sort);
    Ok(session.stats().into())
}

#[tauri::command]
fn get_stats(state: tauri::State<'_, AppState>) -> Result<StatsDto, AppError> {
    Ok(state.session()?.stats().into())
}

#[tauri::command]
fn export_records(state: tauri::State<'_, AppState>) -> Result<Option<ExportDto>, AppError> {
    let mut session = state.session()?;
    let now = Local::now();
    let Some(file) = session.export(&now)? else {
        return Ok(None);
    };

    fs::create_dir_all(&state.export_dir)?;
    let path = state.export_dir.join(&file.file_name);
    fs::write(&path, file.contents)?;
    log::info!("wrote export to {}", path.display());
    session.record_backup(&now)?;

    Ok(Some(ExportDto {
        path: path.display().to_string(),
        records: session.records().len(),
    }))
}

#[tauri::command]
fn import_records(contents: String, state: tauri::State<'_, AppState>) -> Result<usize, AppError> {
    Ok(state.session()?.import_text(&contents)?)
}

#[tauri::command]
fn clear_records(state: tauri::State<'_, AppState>) -> Result<(), AppError> {
    state.session()?.clear()?;
    Ok(())
}

#[tauri::command]
fn get_backup_status(state: tauri::State<'_, AppState>) -> Result<BackupStatusDto, AppError> {
    Ok(backup_status(&state.session()?))
}

#[tauri::command]
fn remind_later(state: tauri::State<'_, AppState>) -> Result<BackupStatusDto, AppError> {
    let mut session = state.session()?;
    session.remind_later(Utc::now().timestamp_millis())?;
    Ok(backup_status(&session))
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() {
    init_logging();
    let state = AppState::init().expect("failed to initialize state");

    if let Ok(session) = state.session() {
        if let Some(reason) = session.backup_due(&Local::now()) {
            log::info!("backup reminder due: {}", reason_label(reason));
            notify_backup_due(reason);
        }
    }

    tauri::Builder::default()
        .manage(state)
        .invoke_handler(tauri::generate_handler![
            list_records,
            begin_edit,
            cancel_edit,
            submit_record,
            delete_record,
            get_filters,
            select_year,
            select_period,
            set_sort,
            get_stats,
            export_records,
            import_records,
            clear_records,
            get_backup_status,
            remind_later
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
