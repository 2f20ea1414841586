use crate::date::{start_of_week, to_iso, to_month_iso, WeekStart};
use crate::model::{DailyBoard, MonthlyBoard, WeeklyBoard};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const DAILY_DIR: &str = "daily-board";
const WEEKLY_DIR: &str = "weekly";
const MONTHLY_DIR: &str = "monthly";

/// Board documents stored as one JSON file per day, week or month.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Store { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn daily_key(date: NaiveDate) -> String {
        format!("{}:{}", DAILY_DIR, to_iso(date))
    }

    pub fn weekly_key(week_start: NaiveDate) -> String {
        format!("{}:{}", WEEKLY_DIR, to_iso(week_start))
    }

    pub fn monthly_key(anchor: NaiveDate) -> String {
        format!("{}:{}", MONTHLY_DIR, to_month_iso(anchor))
    }

    pub fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(DAILY_DIR)
            .join(format!("{}.json", to_iso(date)))
    }

    pub fn weekly_path(&self, week_start: NaiveDate) -> PathBuf {
        self.root
            .join(WEEKLY_DIR)
            .join(format!("{}.json", to_iso(week_start)))
    }

    pub fn monthly_path(&self, anchor: NaiveDate) -> PathBuf {
        self.root
            .join(MONTHLY_DIR)
            .join(format!("{}.json", to_month_iso(anchor)))
    }

    pub fn load_daily(&self, date: NaiveDate) -> Result<DailyBoard> {
        load_or_default(&self.daily_path(date))
    }

    pub fn save_daily(&self, date: NaiveDate, board: &DailyBoard) -> Result<()> {
        save_document(&self.daily_path(date), board)
    }

    /// Loads the week containing `anchor`, with every day present.
    pub fn load_weekly(&self, anchor: NaiveDate, week_start: WeekStart) -> Result<WeeklyBoard> {
        let start = start_of_week(anchor, week_start);
        let board: WeeklyBoard = load_or_default(&self.weekly_path(start))?;
        Ok(board.normalized(start))
    }

    pub fn save_weekly(
        &self,
        anchor: NaiveDate,
        week_start: WeekStart,
        board: &WeeklyBoard,
    ) -> Result<()> {
        let start = start_of_week(anchor, week_start);
        save_document(&self.weekly_path(start), board)
    }

    /// Loads the month containing `anchor`, one entry per calendar day.
    pub fn load_monthly(&self, anchor: NaiveDate) -> Result<MonthlyBoard> {
        let board: MonthlyBoard = load_or_default(&self.monthly_path(anchor))?;
        Ok(board.normalized(anchor))
    }

    pub fn save_monthly(&self, anchor: NaiveDate, board: &MonthlyBoard) -> Result<()> {
        save_document(&self.monthly_path(anchor), board)
    }
}

/// Missing or unreadable-as-JSON documents become the empty default.
fn load_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    match serde_json::from_str(&data) {
        Ok(doc) => Ok(doc),
        Err(err) => {
            log::warn!(
                "event=board_load status=corrupt path={} error={}",
                path.display(),
                err
            );
            Ok(T::default())
        }
    }
}

fn save_document<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_json::to_string_pretty(doc).context("serializing board")?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    log::debug!("event=board_save path={}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn keys_use_canonical_dates() {
        assert_eq!(Store::daily_key(ymd(2024, 6, 9)), "daily-board:2024-06-09");
        assert_eq!(Store::weekly_key(ymd(2024, 6, 3)), "weekly:2024-06-03");
        assert_eq!(Store::monthly_key(ymd(2024, 6, 17)), "monthly:2024-06");
    }

    #[test]
    fn daily_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let date = ymd(2024, 2, 29);
        assert_eq!(store.load_daily(date).unwrap(), DailyBoard::default());

        let mut board = DailyBoard::default();
        let list_id = board.add_list(Some("Morning")).id.clone();
        board.add_card(&list_id, "stretch").unwrap();
        store.save_daily(date, &board).unwrap();

        assert!(dir.path().join("daily-board/2024-02-29.json").exists());
        assert_eq!(store.load_daily(date).unwrap(), board);
        assert_eq!(store.load_daily(ymd(2024, 3, 1)).unwrap(), DailyBoard::default());
    }

    #[test]
    fn corrupt_document_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let date = ymd(2024, 6, 9);
        let path = store.daily_path(date);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert_eq!(store.load_daily(date).unwrap(), DailyBoard::default());
    }

    #[test]
    fn any_day_of_week_addresses_same_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let mut board = store.load_weekly(ymd(2024, 6, 5), WeekStart::Monday).unwrap();
        board.add_task("2024-06-09", "review").unwrap();
        store
            .save_weekly(ymd(2024, 6, 5), WeekStart::Monday, &board)
            .unwrap();

        assert!(dir.path().join("weekly/2024-06-03.json").exists());
        let from_sunday = store.load_weekly(ymd(2024, 6, 9), WeekStart::Monday).unwrap();
        assert_eq!(from_sunday, board);
        assert_eq!(from_sunday.days.len(), 7);
    }

    #[test]
    fn monthly_round_trip_by_any_day_of_month() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let mut board = store.load_monthly(ymd(2024, 2, 3)).unwrap();
        assert_eq!(board.days.len(), 29);
        board.set_title("2024-02-29", "leap day").unwrap();
        board.set_tag("2024-02-29", "휴식").unwrap();
        board.toggle_day("2024-02-29").unwrap();
        store.save_monthly(ymd(2024, 2, 3), &board).unwrap();

        assert!(dir.path().join("monthly/2024-02.json").exists());
        let reloaded = store.load_monthly(ymd(2024, 2, 29)).unwrap();
        assert_eq!(reloaded, board);
        assert_eq!(reloaded.progress().done, 1);
        assert_eq!(store.load_monthly(ymd(2024, 3, 1)).unwrap().progress().done, 0);
    }

    #[test]
    fn corrupt_monthly_document_falls_back_to_empty_month() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let anchor = ymd(2024, 6, 9);
        let path = store.monthly_path(anchor);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[1, 2").unwrap();
        let board = store.load_monthly(anchor).unwrap();
        assert_eq!(board.days.len(), 30);
        assert_eq!(board.progress().done, 0);
    }
}
