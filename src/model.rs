use crate::date::{days_in_month, to_iso, to_month_iso, week_dates};
use chrono::{Datelike, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type CardId = String;

pub const DEFAULT_LIST_TITLE: &str = "새 리스트";

/// One day's lists of cards.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DailyBoard {
    #[serde(default)]
    pub lists: Vec<TaskList>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TaskList {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Tasks for each day of one week, keyed by ISO date.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct WeeklyBoard {
    #[serde(default)]
    pub days: BTreeMap<String, DayTasks>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DayTasks {
    #[serde(default)]
    pub tasks: Vec<Card>,
}

/// Title, tag and completion for each day of one month, keyed by ISO date.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct MonthlyBoard {
    #[serde(default)]
    pub days: BTreeMap<String, DayEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DayEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub total: usize,
    pub done: usize,
    pub percent: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum BoardError {
    #[error("list not found: {0}")]
    ListNotFound(String),
    #[error("card not found: {0}")]
    CardNotFound(String),
    #[error("day {0} is not part of this week")]
    DayNotInWeek(String),
    #[error("day {0} is not part of this month")]
    DayNotInMonth(String),
    #[error("text is empty")]
    EmptyText,
}

impl Progress {
    pub fn from_cards<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Self {
        let (total, done) = cards
            .into_iter()
            .fold((0, 0), |(t, d), c| (t + 1, d + usize::from(c.done)));
        Progress::from_counts(total, done)
    }

    /// Percent is rounded to the nearest integer and 0 when `total` is 0.
    pub fn from_counts(total: usize, done: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((done as f64 / total as f64) * 100.0).round() as u32
        };
        Progress {
            total,
            done,
            percent,
        }
    }
}

impl Card {
    pub fn new(text: &str) -> Result<Self, BoardError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BoardError::EmptyText);
        }
        Ok(Card {
            id: generate_id(),
            text: text.to_string(),
            done: false,
            created_at: Utc::now().timestamp_millis(),
        })
    }
}

impl DailyBoard {
    pub fn add_list(&mut self, title: Option<&str>) -> &TaskList {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_LIST_TITLE);
        self.lists.push(TaskList {
            id: generate_id(),
            title: title.to_string(),
            cards: Vec::new(),
        });
        &self.lists[self.lists.len() - 1]
    }

    pub fn rename_list(&mut self, list_id: &str, title: &str) -> Result<(), BoardError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BoardError::EmptyText);
        }
        self.list_mut(list_id)?.title = title.to_string();
        Ok(())
    }

    pub fn remove_list(&mut self, list_id: &str) -> Result<TaskList, BoardError> {
        let idx = self
            .lists
            .iter()
            .position(|l| l.id == list_id)
            .ok_or_else(|| BoardError::ListNotFound(list_id.to_string()))?;
        Ok(self.lists.remove(idx))
    }

    /// Adds a card at the top of the list.
    pub fn add_card(&mut self, list_id: &str, text: &str) -> Result<CardId, BoardError> {
        let list = self.list_mut(list_id)?;
        let card = Card::new(text)?;
        let id = card.id.clone();
        list.cards.insert(0, card);
        Ok(id)
    }

    pub fn toggle_card(&mut self, list_id: &str, card_id: &str) -> Result<bool, BoardError> {
        let card = self
            .list_mut(list_id)?
            .cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or_else(|| BoardError::CardNotFound(card_id.to_string()))?;
        card.done = !card.done;
        Ok(card.done)
    }

    pub fn remove_card(&mut self, list_id: &str, card_id: &str) -> Result<Card, BoardError> {
        let cards = &mut self.list_mut(list_id)?.cards;
        let idx = cards
            .iter()
            .position(|c| c.id == card_id)
            .ok_or_else(|| BoardError::CardNotFound(card_id.to_string()))?;
        Ok(cards.remove(idx))
    }

    pub fn progress(&self) -> Progress {
        Progress::from_cards(self.lists.iter().flat_map(|l| l.cards.iter()))
    }

    fn list_mut(&mut self, list_id: &str) -> Result<&mut TaskList, BoardError> {
        self.lists
            .iter_mut()
            .find(|l| l.id == list_id)
            .ok_or_else(|| BoardError::ListNotFound(list_id.to_string()))
    }
}

impl WeeklyBoard {
    /// Ensures every day of the week starting at `week_start` has an entry.
    pub fn normalized(mut self, week_start: NaiveDate) -> Self {
        for date in week_dates(week_start) {
            self.days.entry(to_iso(date)).or_default();
        }
        self
    }

    pub fn day(&self, iso: &str) -> Option<&DayTasks> {
        self.days.get(iso)
    }

    /// Adds a task at the top of the day's list.
    pub fn add_task(&mut self, iso: &str, text: &str) -> Result<CardId, BoardError> {
        let day = self.day_mut(iso)?;
        let card = Card::new(text)?;
        let id = card.id.clone();
        day.tasks.insert(0, card);
        Ok(id)
    }

    pub fn toggle_task(&mut self, iso: &str, task_id: &str) -> Result<bool, BoardError> {
        let task = self
            .day_mut(iso)?
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| BoardError::CardNotFound(task_id.to_string()))?;
        task.done = !task.done;
        Ok(task.done)
    }

    pub fn remove_task(&mut self, iso: &str, task_id: &str) -> Result<Card, BoardError> {
        let tasks = &mut self.day_mut(iso)?.tasks;
        let idx = tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| BoardError::CardNotFound(task_id.to_string()))?;
        Ok(tasks.remove(idx))
    }

    pub fn progress(&self) -> Progress {
        Progress::from_cards(self.days.values().flat_map(|d| d.tasks.iter()))
    }

    /// Completed tasks per day, Monday-first when `week_start` is a Monday.
    pub fn done_per_day(&self, week_start: NaiveDate) -> [usize; 7] {
        let mut counts = [0; 7];
        for (slot, date) in counts.iter_mut().zip(week_dates(week_start)) {
            *slot = self
                .days
                .get(&to_iso(date))
                .map(|d| d.tasks.iter().filter(|t| t.done).count())
                .unwrap_or(0);
        }
        counts
    }

    fn day_mut(&mut self, iso: &str) -> Result<&mut DayTasks, BoardError> {
        self.days
            .get_mut(iso)
            .ok_or_else(|| BoardError::DayNotInWeek(iso.to_string()))
    }
}

impl MonthlyBoard {
    /// Keeps exactly one entry per day of the month containing `anchor`.
    pub fn normalized(mut self, anchor: NaiveDate) -> Self {
        let prefix = format!("{}-", to_month_iso(anchor));
        self.days.retain(|iso, _| iso.starts_with(&prefix));
        let last = days_in_month(anchor.year(), anchor.month()).unwrap_or(28);
        for day in 1..=last {
            self.days.entry(format!("{}{:02}", prefix, day)).or_default();
        }
        self
    }

    pub fn entry(&self, iso: &str) -> Option<&DayEntry> {
        self.days.get(iso)
    }

    /// A blank title clears the day.
    pub fn set_title(&mut self, iso: &str, title: &str) -> Result<(), BoardError> {
        self.entry_mut(iso)?.title = title.trim().to_string();
        Ok(())
    }

    /// A blank tag removes it.
    pub fn set_tag(&mut self, iso: &str, tag: &str) -> Result<(), BoardError> {
        self.entry_mut(iso)?.tag = tag.trim().to_string();
        Ok(())
    }

    pub fn toggle_day(&mut self, iso: &str) -> Result<bool, BoardError> {
        let entry = self.entry_mut(iso)?;
        entry.completed = !entry.completed;
        Ok(entry.completed)
    }

    /// Completed days out of every day in the month.
    pub fn progress(&self) -> Progress {
        let done = self.days.values().filter(|d| d.completed).count();
        Progress::from_counts(self.days.len(), done)
    }

    fn entry_mut(&mut self, iso: &str) -> Result<&mut DayEntry, BoardError> {
        self.days
            .get_mut(iso)
            .ok_or_else(|| BoardError::DayNotInMonth(iso.to_string()))
    }
}

pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_list_and_card_lifecycle() {
        let mut board = DailyBoard::default();
        let list_id = board.add_list(None).id.clone();
        assert_eq!(board.lists[0].title, DEFAULT_LIST_TITLE);

        board.rename_list(&list_id, "Study").unwrap();
        let first = board.add_card(&list_id, "  read chapter 3 ").unwrap();
        let second = board.add_card(&list_id, "exercises").unwrap();
        let cards = &board.lists[0].cards;
        assert_eq!(cards[0].id, second);
        assert_eq!(cards[1].text, "read chapter 3");

        assert!(board.toggle_card(&list_id, &first).unwrap());
        assert_eq!(
            board.progress(),
            Progress {
                total: 2,
                done: 1,
                percent: 50
            }
        );

        let removed = board.remove_card(&list_id, &first).unwrap();
        assert_eq!(removed.id, first);
        board.remove_list(&list_id).unwrap();
        assert!(board.lists.is_empty());
    }

    #[test]
    fn daily_errors() {
        let mut board = DailyBoard::default();
        assert!(matches!(
            board.add_card("nope", "x"),
            Err(BoardError::ListNotFound(_))
        ));
        let list_id = board.add_list(Some("Today")).id.clone();
        assert!(matches!(
            board.add_card(&list_id, "   "),
            Err(BoardError::EmptyText)
        ));
        assert!(matches!(
            board.toggle_card(&list_id, "missing"),
            Err(BoardError::CardNotFound(_))
        ));
        assert!(board.lists[0].cards.is_empty());
    }

    #[test]
    fn progress_rounds_and_handles_empty() {
        assert_eq!(DailyBoard::default().progress().percent, 0);
        let mut board = DailyBoard::default();
        let list_id = board.add_list(None).id.clone();
        let ids: Vec<_> = (0..3)
            .map(|i| board.add_card(&list_id, &format!("task {i}")).unwrap())
            .collect();
        board.toggle_card(&list_id, &ids[0]).unwrap();
        assert_eq!(board.progress().percent, 33);
        board.toggle_card(&list_id, &ids[1]).unwrap();
        assert_eq!(board.progress().percent, 67);
    }

    #[test]
    fn weekly_normalizes_all_days() {
        let board = WeeklyBoard::default().normalized(ymd(2024, 6, 3));
        assert_eq!(board.days.len(), 7);
        assert!(board.day("2024-06-03").is_some());
        assert!(board.day("2024-06-09").is_some());
        assert!(board.day("2024-06-10").is_none());
    }

    #[test]
    fn weekly_tasks() {
        let start = ymd(2024, 6, 3);
        let mut board = WeeklyBoard::default().normalized(start);
        let a = board.add_task("2024-06-04", "gym").unwrap();
        board.add_task("2024-06-04", "groceries").unwrap();
        let c = board.add_task("2024-06-09", "plan week").unwrap();
        board.toggle_task("2024-06-04", &a).unwrap();
        board.toggle_task("2024-06-09", &c).unwrap();

        assert_eq!(board.day("2024-06-04").unwrap().tasks[0].text, "groceries");
        assert_eq!(board.done_per_day(start), [0, 1, 0, 0, 0, 0, 1]);
        assert_eq!(board.progress().percent, 67);

        assert!(matches!(
            board.add_task("2024-06-10", "x"),
            Err(BoardError::DayNotInWeek(_))
        ));
        board.remove_task("2024-06-04", &a).unwrap();
        assert_eq!(board.progress().total, 2);
    }

    #[test]
    fn rename_rejects_blank_titles() {
        let mut board = DailyBoard::default();
        let list_id = board.add_list(Some("Errands")).id.clone();
        assert!(matches!(
            board.rename_list(&list_id, "   "),
            Err(BoardError::EmptyText)
        ));
        assert_eq!(board.lists[0].title, "Errands");
        board.rename_list(&list_id, "  Shopping ").unwrap();
        assert_eq!(board.lists[0].title, "Shopping");
    }

    #[test]
    fn monthly_normalizes_to_calendar_days() {
        let board = MonthlyBoard::default().normalized(ymd(2024, 2, 17));
        assert_eq!(board.days.len(), 29);
        assert!(board.entry("2024-02-01").is_some());
        assert!(board.entry("2024-02-29").is_some());
        assert!(board.entry("2024-03-01").is_none());

        let mut loaded = MonthlyBoard::default();
        let kept = DayEntry {
            title: "dentist".into(),
            ..DayEntry::default()
        };
        loaded.days.insert("2023-02-10".into(), kept.clone());
        loaded.days.insert("2024-02-10".into(), DayEntry::default());
        let board = loaded.normalized(ymd(2023, 2, 1));
        assert_eq!(board.days.len(), 28);
        assert_eq!(board.entry("2023-02-10"), Some(&kept));
        assert!(board.entry("2024-02-10").is_none());
    }

    #[test]
    fn monthly_entries_and_progress() {
        let mut board = MonthlyBoard::default().normalized(ymd(2024, 6, 1));
        assert_eq!(
            board.progress(),
            Progress {
                total: 30,
                done: 0,
                percent: 0
            }
        );

        board.set_title("2024-06-09", "  hike ").unwrap();
        board.set_tag("2024-06-09", "운동").unwrap();
        assert!(board.toggle_day("2024-06-09").unwrap());
        board.toggle_day("2024-06-10").unwrap();
        let entry = board.entry("2024-06-09").unwrap();
        assert_eq!(entry.title, "hike");
        assert_eq!(entry.tag, "운동");
        assert_eq!(board.progress().done, 2);
        assert_eq!(board.progress().percent, 7);

        assert!(!board.toggle_day("2024-06-10").unwrap());
        board.set_tag("2024-06-09", " ").unwrap();
        assert!(board.entry("2024-06-09").unwrap().tag.is_empty());
        assert!(matches!(
            board.set_title("2024-07-01", "x"),
            Err(BoardError::DayNotInMonth(_))
        ));
    }

    #[test]
    fn json_shape_matches_documents() {
        let raw = r#"{"lists":[{"id":"l1","title":"T","cards":[{"id":"c1","text":"x","done":true,"createdAt":1717400000000}]}]}"#;
        let board: DailyBoard = serde_json::from_str(raw).unwrap();
        assert_eq!(board.lists[0].cards[0].created_at, 1_717_400_000_000);
        let out = serde_json::to_string(&board).unwrap();
        assert!(out.contains("\"createdAt\":1717400000000"));

        let weekly: WeeklyBoard =
            serde_json::from_str(r#"{"days":{"2024-06-03":{"tasks":[]}}}"#).unwrap();
        assert!(weekly.day("2024-06-03").unwrap().tasks.is_empty());

        let monthly: MonthlyBoard =
            serde_json::from_str(r#"{"days":{"2024-06-09":{"title":"hike","completed":true}}}"#)
                .unwrap();
        let entry = monthly.entry("2024-06-09").unwrap();
        assert!(entry.completed && entry.tag.is_empty());
    }

    #[test]
    fn ids_are_short_alphanumeric() {
        let id = generate_id();
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
