use crate::cli::{DailyAction, MonthlyAction, WeeklyAction};
use crate::config::Config;
use crate::date::{
    build_month_grid, month_label, parse_iso, start_of_week, to_iso, today_iso, week_dates,
    week_range_label, weekday_label, Clock, GridCell, SystemClock, WEEKDAY_LABELS,
};
use crate::model::{Card, DailyBoard, MonthlyBoard, WeeklyBoard};
use crate::storage::Store;
use crate::ticker::ThreadScheduler;
use crate::timer::{format_clock, CountdownTimer, TimerState};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::io::{stdout, Write};
use std::time::Duration;

/// Settings plus the board store they point at.
pub struct Session {
    pub config: Config,
    pub store: Store,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        let store = Store::new(config.resolve_data_dir()?);
        Ok(Session { config, store })
    }
}

pub fn today() -> Result<()> {
    let clock = SystemClock;
    let today = clock.today();
    println!("{} ({})", today_iso(&clock), weekday_label(today));
    Ok(())
}

pub fn week(session: &Session, date: Option<String>) -> Result<()> {
    let anchor = resolve_date(date.as_deref(), &SystemClock);
    let start = start_of_week(anchor, session.config.week_start);
    let board = session.store.load_weekly(anchor, session.config.week_start)?;
    println!("{}", week_range_label(start));
    for date in week_dates(start) {
        let iso = to_iso(date);
        let tasks = board.day(&iso).map(|d| d.tasks.as_slice()).unwrap_or(&[]);
        let done = tasks.iter().filter(|t| t.done).count();
        let marker = if date == anchor { "*" } else { " " };
        println!(
            "{} {} ({})  {}/{}",
            marker,
            iso,
            weekday_label(date),
            done,
            tasks.len()
        );
    }
    Ok(())
}

pub fn month(
    session: &Session,
    date: Option<String>,
    action: Option<MonthlyAction>,
) -> Result<()> {
    let anchor = resolve_date(date.as_deref(), &SystemClock);
    let store = &session.store;
    let mut board = store.load_monthly(anchor)?;
    let key = Store::monthly_key(anchor);
    let message = match action {
        None => {
            print!("{}", render_month(anchor));
            println!("{}", achievement_label(&board));
            return Ok(());
        }
        Some(MonthlyAction::List) => {
            print_monthly(anchor, &board);
            return Ok(());
        }
        Some(MonthlyAction::Title { day, title }) => {
            let day = canonical_day(&day)?;
            board
                .set_title(&day, &title)
                .with_context(|| format!("setting title of {} in {}", day, key))?;
            format!("Updated title of {}", day)
        }
        Some(MonthlyAction::Tag { day, tag }) => {
            let day = canonical_day(&day)?;
            board
                .set_tag(&day, &tag)
                .with_context(|| format!("setting tag of {} in {}", day, key))?;
            format!("Updated tag of {}", day)
        }
        Some(MonthlyAction::Toggle { day }) => {
            let day = canonical_day(&day)?;
            let done = board
                .toggle_day(&day)
                .with_context(|| format!("toggling {} in {}", day, key))?;
            format!("{} is now {}", day, done_label(done))
        }
    };
    store.save_monthly(anchor, &board)?;
    log::info!("event=monthly_update key={}", key);
    println!("{}", message);
    println!("{}", achievement_label(&board));
    Ok(())
}

/// Plain-text Sunday-first calendar for the month containing `anchor`.
pub fn render_month(anchor: NaiveDate) -> String {
    let grid = build_month_grid(anchor);
    let mut out = format!("{}\n", month_label(anchor));
    let header: Vec<String> = WEEKDAY_LABELS.iter().map(|w| format!("{:>3}", w)).collect();
    out.push_str(&header.join(""));
    out.push('\n');
    for row in grid.rows() {
        if row.iter().all(|c| !c.in_month()) {
            continue;
        }
        let line: String = row
            .iter()
            .map(|cell| match cell {
                GridCell::Day(d) => format!("{:>4}", d),
                GridCell::Blank => "    ".to_string(),
            })
            .collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn daily(session: &Session, date: Option<String>, action: DailyAction) -> Result<()> {
    let date = resolve_date(date.as_deref(), &SystemClock);
    let store = &session.store;
    let mut board = store.load_daily(date)?;
    let key = Store::daily_key(date);
    let message = match action {
        DailyAction::List => {
            print_daily(date, &board);
            return Ok(());
        }
        DailyAction::AddList { title } => {
            let list = board.add_list(title.as_deref());
            format!("Added list {} ({})", list.id, list.title)
        }
        DailyAction::RenameList { list_id, title } => {
            board
                .rename_list(&list_id, &title)
                .with_context(|| format!("renaming list {} in {}", list_id, key))?;
            format!("Renamed list {}", list_id)
        }
        DailyAction::RemoveList { list_id } => {
            let removed = board
                .remove_list(&list_id)
                .with_context(|| format!("removing list {} from {}", list_id, key))?;
            format!("Removed list {} ({} cards)", removed.id, removed.cards.len())
        }
        DailyAction::Add { list_id, text } => {
            let id = board
                .add_card(&list_id, &text)
                .with_context(|| format!("adding card to list {}", list_id))?;
            format!("Added card {} to {}", id, list_id)
        }
        DailyAction::Toggle { list_id, card_id } => {
            let done = board
                .toggle_card(&list_id, &card_id)
                .with_context(|| format!("toggling card {}", card_id))?;
            format!("Card {} is now {}", card_id, done_label(done))
        }
        DailyAction::Remove { list_id, card_id } => {
            board
                .remove_card(&list_id, &card_id)
                .with_context(|| format!("removing card {}", card_id))?;
            format!("Removed card {}", card_id)
        }
    };
    store.save_daily(date, &board)?;
    log::info!("event=daily_update key={}", key);
    println!("{}", message);
    Ok(())
}

pub fn weekly(session: &Session, date: Option<String>, action: WeeklyAction) -> Result<()> {
    let anchor = resolve_date(date.as_deref(), &SystemClock);
    let week_start = session.config.week_start;
    let store = &session.store;
    let mut board = store.load_weekly(anchor, week_start)?;
    let start = start_of_week(anchor, week_start);
    let message = match action {
        WeeklyAction::List => {
            print_weekly(start, &board);
            return Ok(());
        }
        WeeklyAction::Add { day, text } => {
            let day = canonical_day(&day)?;
            let id = board
                .add_task(&day, &text)
                .with_context(|| format!("adding task to {}", day))?;
            format!("Added task {} on {}", id, day)
        }
        WeeklyAction::Toggle { day, task_id } => {
            let day = canonical_day(&day)?;
            let done = board
                .toggle_task(&day, &task_id)
                .with_context(|| format!("toggling task {}", task_id))?;
            format!("Task {} is now {}", task_id, done_label(done))
        }
        WeeklyAction::Remove { day, task_id } => {
            let day = canonical_day(&day)?;
            board
                .remove_task(&day, &task_id)
                .with_context(|| format!("removing task {}", task_id))?;
            format!("Removed task {}", task_id)
        }
    };
    store.save_weekly(anchor, week_start, &board)?;
    log::info!("event=weekly_update key={}", Store::weekly_key(start));
    println!("{}", message);
    Ok(())
}

/// Counts down in the terminal until the timer reaches zero.
pub fn timer(
    session: &Session,
    hours: u32,
    minutes: u32,
    seconds: u32,
    preset: Option<String>,
) -> Result<()> {
    let (scheduler, ticks) = ThreadScheduler::new();
    let mut timer = CountdownTimer::new(scheduler);
    let started = match preset {
        Some(label) => {
            let preset = session
                .config
                .presets
                .iter()
                .find(|p| p.label == label)
                .ok_or_else(|| anyhow!("unknown preset: {}", label))?;
            timer.select_preset(preset.seconds)
        }
        None => {
            timer.configure(hours, minutes, seconds);
            timer.start()
        }
    };
    if !started {
        println!("Nothing to count down (duration is zero)");
        return Ok(());
    }

    let mut out = stdout();
    while timer.state() == TimerState::Running {
        write!(out, "\r{}", format_clock(timer.remaining()))?;
        out.flush()?;
        let id = ticks
            .recv_timeout(Duration::from_secs(5))
            .context("tick source stopped")?;
        timer.on_tick(id);
    }
    writeln!(out, "\r{}  done", format_clock(0))?;
    Ok(())
}

pub fn tui(session: Session) -> Result<()> {
    ui::run(session)
}

/// Parses `input`, falling back to today when absent or invalid.
pub fn resolve_date(input: Option<&str>, clock: &impl Clock) -> NaiveDate {
    match input.map(str::trim) {
        Some(raw) => match parse_iso(raw) {
            Ok(date) => date,
            Err(err) => {
                log::warn!("event=date_parse status=fallback input={:?} error={}", raw, err);
                eprintln!("{}; using today", err);
                clock.today()
            }
        },
        None => clock.today(),
    }
}

fn canonical_day(raw: &str) -> Result<String> {
    let date = parse_iso(raw.trim())?;
    Ok(to_iso(date))
}

fn done_label(done: bool) -> &'static str {
    if done {
        "done"
    } else {
        "open"
    }
}

fn print_daily(date: NaiveDate, board: &DailyBoard) {
    let progress = board.progress();
    println!(
        "{} ({})  {}/{} done ({}%)",
        to_iso(date),
        weekday_label(date),
        progress.done,
        progress.total,
        progress.percent
    );
    if board.lists.is_empty() {
        println!("  (no lists)");
    }
    for list in &board.lists {
        println!("{} [{}]", list.title, list.id);
        if list.cards.is_empty() {
            println!("  (empty)");
        }
        for card in &list.cards {
            print_card(card);
        }
    }
}

fn print_weekly(start: NaiveDate, board: &WeeklyBoard) {
    let progress = board.progress();
    println!(
        "{}  {}/{} done ({}%)",
        week_range_label(start),
        progress.done,
        progress.total,
        progress.percent
    );
    for date in week_dates(start) {
        let iso = to_iso(date);
        println!("{} ({})", iso, weekday_label(date));
        let tasks = board.day(&iso).map(|d| d.tasks.as_slice()).unwrap_or(&[]);
        if tasks.is_empty() {
            println!("  (empty)");
        }
        for task in tasks {
            print_card(task);
        }
    }
}

/// `"3/30 완료 (10%)"`
pub fn achievement_label(board: &MonthlyBoard) -> String {
    let progress = board.progress();
    format!(
        "{}/{} 완료 ({}%)",
        progress.done, progress.total, progress.percent
    )
}

fn print_monthly(anchor: NaiveDate, board: &MonthlyBoard) {
    println!("{}  {}", month_label(anchor), achievement_label(board));
    for (iso, entry) in &board.days {
        let check = if entry.completed { "x" } else { " " };
        let tag = if entry.tag.is_empty() {
            String::new()
        } else {
            format!(" #{}", entry.tag)
        };
        println!("  [{}] {}{}  {}", check, iso, tag, entry.title);
    }
}

fn print_card(card: &Card) {
    let check = if card.done { "x" } else { " " };
    println!("  [{}] {}: {}", check, card.id, card.text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::FixedClock;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn bad_dates_fall_back_to_today() {
        let clock = FixedClock(ymd(2026, 10, 18));
        assert_eq!(resolve_date(None, &clock), ymd(2026, 10, 18));
        assert_eq!(resolve_date(Some("2024-06-09"), &clock), ymd(2024, 6, 9));
        assert_eq!(resolve_date(Some(" 2024-06-09 "), &clock), ymd(2024, 6, 9));
        assert_eq!(resolve_date(Some("2024-02-30"), &clock), ymd(2026, 10, 18));
        assert_eq!(resolve_date(Some("yesterday"), &clock), ymd(2026, 10, 18));
    }

    #[test]
    fn month_rendering() {
        let text = render_month(ymd(2024, 6, 1));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2024년 6월");
        // June 2024 starts on a Saturday and spans six rows.
        assert_eq!(lines.len(), 2 + 6);
        assert!(lines[2].trim_start().starts_with('1'));
        assert!(lines[7].trim_end().ends_with("30"));
    }

    #[test]
    fn achievement_counts_completed_days() {
        let mut board = MonthlyBoard::default().normalized(ymd(2024, 4, 1));
        assert_eq!(achievement_label(&board), "0/30 완료 (0%)");
        for day in ["2024-04-01", "2024-04-02", "2024-04-03"] {
            board.toggle_day(day).unwrap();
        }
        assert_eq!(achievement_label(&board), "3/30 완료 (10%)");
    }

    #[test]
    fn canonical_day_normalizes() {
        assert_eq!(canonical_day(" 2024-06-09").unwrap(), "2024-06-09");
        assert!(canonical_day("2024-6-9").is_err());
    }
}
