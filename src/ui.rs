use crate::commands::{achievement_label, Session};
use crate::date::{
    add_days, build_month_grid, is_weekend, month_label, shift_months, start_of_week, to_iso,
    to_month_iso, week_dates, week_range_label, weekday_label, Clock, GridCell, SystemClock,
    WEEKDAY_LABELS,
};
use crate::model::{Card, DailyBoard, DayEntry, MonthlyBoard, Progress, WeeklyBoard};
use crate::ticker::ThreadScheduler;
use crate::timer::{format_clock, split_hms, CountdownTimer, TickerId, TimerState};
use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    BarChart, Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap,
};
use ratatui::Terminal;
use std::collections::HashMap;
use std::io::{stdout, Stdout};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

pub fn run(session: Session) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(session);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    session: Session,
    clock: SystemClock,
    today: NaiveDate,
    last_save: Option<Instant>,
    status: String,
    mode: Mode,
    view: ViewMode,
    timer: CountdownTimer<ThreadScheduler>,
    ticks: Receiver<TickerId>,
    timer_form: TimerForm,
    daily: DailyState,
    weekly: WeeklyState,
    monthly: MonthlyState,
}

enum Mode {
    Normal,
    Input {
        prompt: &'static str,
        field: FieldValue,
        action: InputAction,
    },
}

enum InputAction {
    AddList,
    RenameList(String),
    AddCard(String),
    AddTask(String),
    SetDayTitle(String),
    SetDayTag(String),
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ViewMode {
    Timer,
    Daily,
    Weekly,
    Monthly,
}

impl ViewMode {
    const ALL: [ViewMode; 4] = [
        ViewMode::Timer,
        ViewMode::Daily,
        ViewMode::Weekly,
        ViewMode::Monthly,
    ];

    fn label(&self) -> &'static str {
        match self {
            ViewMode::Timer => "Timer",
            ViewMode::Daily => "Daily",
            ViewMode::Weekly => "Weekly",
            ViewMode::Monthly => "Monthly",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum TimerField {
    Hours,
    Minutes,
    Seconds,
    Presets,
}

struct TimerForm {
    field: TimerField,
    hours: u32,
    minutes: u32,
    seconds: u32,
    preset_idx: usize,
}

struct DailyState {
    date: NaiveDate,
    board: DailyBoard,
    list_idx: usize,
    card_idx: usize,
    offsets: Vec<usize>,
}

struct WeeklyState {
    anchor: NaiveDate,
    board: WeeklyBoard,
    day_idx: usize,
    task_idx: usize,
}

struct MonthlyState {
    cursor: NaiveDate,
    board: MonthlyBoard,
    board_for: Option<String>,
    counts: HashMap<NaiveDate, Progress>,
    counts_for: Option<(i32, u32)>,
}

const MONTH_CELL_WIDTH: usize = 10;

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if let Some((idx, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    fn move_right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    fn backspace(&mut self) {
        if let Some((idx, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.value.drain(idx..self.cursor);
            self.cursor = idx;
        }
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl TimerField {
    fn next(self) -> Self {
        match self {
            TimerField::Hours => TimerField::Minutes,
            TimerField::Minutes => TimerField::Seconds,
            TimerField::Seconds => TimerField::Presets,
            TimerField::Presets => TimerField::Hours,
        }
    }

    fn prev(self) -> Self {
        match self {
            TimerField::Hours => TimerField::Presets,
            TimerField::Minutes => TimerField::Hours,
            TimerField::Seconds => TimerField::Minutes,
            TimerField::Presets => TimerField::Seconds,
        }
    }
}

impl TimerForm {
    fn new() -> Self {
        TimerForm {
            field: TimerField::Minutes,
            hours: 0,
            minutes: 0,
            seconds: 0,
            preset_idx: 0,
        }
    }

    /// Steps the focused field, wrapping within 0..=23 or 0..=59.
    fn adjust(&mut self, delta: i32, preset_count: usize) {
        let wrap = |value: u32, max: u32| -> u32 {
            (value as i32 + delta).rem_euclid(max as i32 + 1) as u32
        };
        match self.field {
            TimerField::Hours => self.hours = wrap(self.hours, 23),
            TimerField::Minutes => self.minutes = wrap(self.minutes, 59),
            TimerField::Seconds => self.seconds = wrap(self.seconds, 59),
            TimerField::Presets => {
                if preset_count > 0 {
                    self.preset_idx =
                        (self.preset_idx as i32 + delta).rem_euclid(preset_count as i32) as usize;
                }
            }
        }
    }
}

impl DailyState {
    fn current_list_id(&self) -> Option<String> {
        self.board.lists.get(self.list_idx).map(|l| l.id.clone())
    }

    fn current_card(&self) -> Option<(String, &Card)> {
        let list = self.board.lists.get(self.list_idx)?;
        let card = list.cards.get(self.card_idx)?;
        Some((list.id.clone(), card))
    }

    fn clamp(&mut self) {
        self.list_idx = self.list_idx.min(self.board.lists.len().saturating_sub(1));
        let cards = self
            .board
            .lists
            .get(self.list_idx)
            .map(|l| l.cards.len())
            .unwrap_or(0);
        self.card_idx = self.card_idx.min(cards.saturating_sub(1));
        if self.offsets.len() != self.board.lists.len() {
            self.offsets.resize(self.board.lists.len(), 0);
        }
    }
}

impl WeeklyState {
    fn day_iso(&self, start: NaiveDate) -> String {
        to_iso(week_dates(start)[self.day_idx.min(6)])
    }

    fn clamp(&mut self, start: NaiveDate) {
        self.day_idx = self.day_idx.min(6);
        let count = self
            .board
            .day(&self.day_iso(start))
            .map(|d| d.tasks.len())
            .unwrap_or(0);
        self.task_idx = self.task_idx.min(count.saturating_sub(1));
    }
}

impl App {
    fn new(session: Session) -> Self {
        let clock = SystemClock;
        let today = clock.today();
        let (scheduler, ticks) = ThreadScheduler::new();
        let mut status = format!("Boards in {}", session.store.root().display());

        let daily_board = session.store.load_daily(today).unwrap_or_else(|err| {
            status = format!("Could not load daily board: {}", err);
            DailyBoard::default()
        });
        let week_start = session.config.week_start;
        let weekly_board = session
            .store
            .load_weekly(today, week_start)
            .unwrap_or_else(|err| {
                status = format!("Could not load weekly board: {}", err);
                WeeklyBoard::default().normalized(start_of_week(today, week_start))
            });
        let day_idx = week_dates(start_of_week(today, week_start))
            .iter()
            .position(|d| *d == today)
            .unwrap_or(0);

        App {
            clock,
            today,
            last_save: None,
            status,
            mode: Mode::Normal,
            view: ViewMode::Timer,
            timer: CountdownTimer::new(scheduler),
            ticks,
            timer_form: TimerForm::new(),
            daily: DailyState {
                date: today,
                board: daily_board,
                list_idx: 0,
                card_idx: 0,
                offsets: Vec::new(),
            },
            weekly: WeeklyState {
                anchor: today,
                board: weekly_board,
                day_idx,
                task_idx: 0,
            },
            monthly: MonthlyState {
                cursor: today,
                board: MonthlyBoard::default(),
                board_for: None,
                counts: HashMap::new(),
                counts_for: None,
            },
            session,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.drain_ticks();
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        log::info!(
            "event=app_exit timer_state={} ticking={}",
            self.timer.state().label(),
            self.timer.is_ticking()
        );
        Ok(())
    }

    fn drain_ticks(&mut self) {
        while let Ok(id) = self.ticks.try_recv() {
            let was_running = self.timer.state() == TimerState::Running;
            if self.timer.on_tick(id) && was_running && self.timer.state() == TimerState::Idle {
                self.status = "Time is up".into();
            }
        }
        self.today = self.clock.today();
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Input { .. } => self.handle_input_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(true)
            }
            KeyCode::Char(c @ '1'..='4') => {
                let idx = c as usize - '1' as usize;
                self.set_view(ViewMode::ALL[idx]);
                return Ok(false);
            }
            _ => {}
        }
        match self.view {
            ViewMode::Timer => self.handle_timer_key(key),
            ViewMode::Daily => self.handle_daily_key(key),
            ViewMode::Weekly => self.handle_weekly_key(key),
            ViewMode::Monthly => self.handle_monthly_key(key),
        }
    }

    fn handle_timer_key(&mut self, key: KeyEvent) -> Result<bool> {
        let preset_count = self.session.config.presets.len();
        match key.code {
            KeyCode::Left | KeyCode::Char('h') | KeyCode::BackTab => {
                self.timer_form.field = self.timer_form.field.prev()
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => {
                self.timer_form.field = self.timer_form.field.next()
            }
            KeyCode::Up | KeyCode::Char('k') => self.timer_form.adjust(1, preset_count),
            KeyCode::Down | KeyCode::Char('j') => self.timer_form.adjust(-1, preset_count),
            KeyCode::Enter => {
                if self.timer_form.field == TimerField::Presets {
                    self.start_preset();
                } else {
                    self.start_timer();
                }
            }
            KeyCode::Char('s') => self.start_timer(),
            KeyCode::Char('p') => self.start_preset(),
            KeyCode::Char(' ') => {
                self.timer.toggle();
                self.status = match self.timer.state() {
                    TimerState::Paused => "Paused".into(),
                    TimerState::Running => "Resumed".into(),
                    TimerState::Idle => "Timer is not running".into(),
                };
            }
            KeyCode::Char('r') => {
                self.timer.reset();
                self.status = "Timer reset".into();
            }
            KeyCode::Char('f') => {
                // Copy the current run back into the editor.
                let total = self.timer.run_total();
                match split_hms(total) {
                    Some((h, m, s)) => {
                        self.timer_form.hours = h;
                        self.timer_form.minutes = m;
                        self.timer_form.seconds = s;
                    }
                    None => {
                        self.status = format!(
                            "{} does not fit the editor (max 23:59:59)",
                            format_clock(total)
                        )
                    }
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn start_timer(&mut self) {
        let form = &self.timer_form;
        self.timer.configure(form.hours, form.minutes, form.seconds);
        self.status = if self.timer.start() {
            format!("Started {}", format_clock(self.timer.remaining()))
        } else {
            "Set a duration first".into()
        };
    }

    fn start_preset(&mut self) {
        let Some(preset) = self.session.config.presets.get(self.timer_form.preset_idx) else {
            self.status = "No presets configured".into();
            return;
        };
        let label = preset.label.clone();
        self.status = if self.timer.select_preset(preset.seconds) {
            format!("Started preset {}", label)
        } else {
            format!("Preset {} has no duration", label)
        };
    }

    fn handle_daily_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                self.daily.list_idx = self.daily.list_idx.saturating_sub(1);
                self.daily.card_idx = 0;
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.daily.list_idx + 1 < self.daily.board.lists.len() {
                    self.daily.list_idx += 1;
                    self.daily.card_idx = 0;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.daily.card_idx = self.daily.card_idx.saturating_sub(1)
            }
            KeyCode::Down | KeyCode::Char('j') => self.daily.card_idx += 1,
            KeyCode::Char('[') => self.shift_daily(-1),
            KeyCode::Char(']') => self.shift_daily(1),
            KeyCode::Char('t') => {
                let today = self.today;
                self.open_daily(today);
            }
            KeyCode::Char('L') => self.open_input("New list title", "", InputAction::AddList),
            KeyCode::Char('R') => match self.daily.board.lists.get(self.daily.list_idx) {
                Some(list) => {
                    let (id, title) = (list.id.clone(), list.title.clone());
                    self.open_input("Rename list", &title, InputAction::RenameList(id));
                }
                None => self.status = "No list selected".into(),
            },
            KeyCode::Char('D') => {
                if let Some(list_id) = self.daily.current_list_id() {
                    match self.daily.board.remove_list(&list_id) {
                        Ok(list) => self.persist_daily(format!("Removed list {}", list.title))?,
                        Err(err) => self.status = format!("Remove failed: {}", err),
                    }
                }
            }
            KeyCode::Char('a') | KeyCode::Char('n') => match self.daily.current_list_id() {
                Some(id) => self.open_input("New card", "", InputAction::AddCard(id)),
                None => self.status = "Create a list first (L)".into(),
            },
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some((list_id, card)) = self.daily.current_card() {
                    let card_id = card.id.clone();
                    match self.daily.board.toggle_card(&list_id, &card_id) {
                        Ok(done) => {
                            self.persist_daily(format!("Marked {}", if done { "done" } else { "open" }))?
                        }
                        Err(err) => self.status = format!("Toggle failed: {}", err),
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some((list_id, card)) = self.daily.current_card() {
                    let card_id = card.id.clone();
                    match self.daily.board.remove_card(&list_id, &card_id) {
                        Ok(card) => self.persist_daily(format!("Removed {}", card.text))?,
                        Err(err) => self.status = format!("Remove failed: {}", err),
                    }
                }
            }
            _ => {}
        }
        self.daily.clamp();
        Ok(false)
    }

    fn handle_weekly_key(&mut self, key: KeyEvent) -> Result<bool> {
        let start = self.week_start_date();
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                self.weekly.day_idx = self.weekly.day_idx.saturating_sub(1);
                self.weekly.task_idx = 0;
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.weekly.day_idx = (self.weekly.day_idx + 1).min(6);
                self.weekly.task_idx = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.weekly.task_idx = self.weekly.task_idx.saturating_sub(1)
            }
            KeyCode::Down | KeyCode::Char('j') => self.weekly.task_idx += 1,
            KeyCode::Char('[') => self.shift_week(-7),
            KeyCode::Char(']') => self.shift_week(7),
            KeyCode::Char('t') => {
                let today = self.today;
                self.open_week(today);
            }
            KeyCode::Char('a') | KeyCode::Char('n') => {
                let iso = self.weekly.day_iso(start);
                self.open_input("New task", "", InputAction::AddTask(iso));
            }
            KeyCode::Char(' ') => {
                let iso = self.weekly.day_iso(start);
                if let Some(task_id) = self.current_task_id(&iso) {
                    match self.weekly.board.toggle_task(&iso, &task_id) {
                        Ok(done) => {
                            self.persist_weekly(format!("Marked {}", if done { "done" } else { "open" }))?
                        }
                        Err(err) => self.status = format!("Toggle failed: {}", err),
                    }
                }
            }
            KeyCode::Char('d') => {
                let iso = self.weekly.day_iso(start);
                if let Some(task_id) = self.current_task_id(&iso) {
                    match self.weekly.board.remove_task(&iso, &task_id) {
                        Ok(task) => self.persist_weekly(format!("Removed {}", task.text))?,
                        Err(err) => self.status = format!("Remove failed: {}", err),
                    }
                }
            }
            KeyCode::Enter => {
                let date = week_dates(start)[self.weekly.day_idx.min(6)];
                self.open_daily(date);
                self.set_view(ViewMode::Daily);
            }
            _ => {}
        }
        let start = self.week_start_date();
        self.weekly.clamp(start);
        Ok(false)
    }

    fn handle_monthly_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.shift_month_cursor(-1),
            KeyCode::Right | KeyCode::Char('l') => self.shift_month_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.shift_month_cursor(-7),
            KeyCode::Down | KeyCode::Char('j') => self.shift_month_cursor(7),
            KeyCode::Char('[') => {
                if let Some(date) = shift_months(self.monthly.cursor, -1) {
                    self.monthly.cursor = date;
                }
            }
            KeyCode::Char(']') => {
                if let Some(date) = shift_months(self.monthly.cursor, 1) {
                    self.monthly.cursor = date;
                }
            }
            KeyCode::Char('t') => self.monthly.cursor = self.today,
            KeyCode::Enter => {
                let date = self.monthly.cursor;
                self.open_daily(date);
                self.set_view(ViewMode::Daily);
            }
            KeyCode::Char('w') => {
                let date = self.monthly.cursor;
                self.open_week(date);
                self.set_view(ViewMode::Weekly);
            }
            KeyCode::Char('e') => {
                self.ensure_month_board();
                let iso = to_iso(self.monthly.cursor);
                let title = self.month_entry().title;
                self.open_input("Day title", &title, InputAction::SetDayTitle(iso));
            }
            KeyCode::Char('g') => {
                self.ensure_month_board();
                let iso = to_iso(self.monthly.cursor);
                let tag = self.month_entry().tag;
                self.open_input("Day tag", &tag, InputAction::SetDayTag(iso));
            }
            KeyCode::Char(' ') => {
                self.ensure_month_board();
                let iso = to_iso(self.monthly.cursor);
                match self.monthly.board.toggle_day(&iso) {
                    Ok(done) => self.persist_monthly(format!(
                        "{} {}",
                        iso,
                        if done { "done" } else { "open" }
                    ))?,
                    Err(err) => self.status = format!("Toggle failed: {}", err),
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let Mode::Input {
            prompt,
            mut field,
            action,
        } = mode
        else {
            return Ok(false);
        };
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return Ok(false);
            }
            KeyCode::Enter => {
                if let Err(err) = self.submit_input(action, &field.value) {
                    self.status = format!("Could not save: {}", err);
                }
                return Ok(false);
            }
            KeyCode::Left => field.move_left(),
            KeyCode::Right => field.move_right(),
            KeyCode::Backspace => field.backspace(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    field.insert_char(c);
                }
            }
            _ => {}
        }
        self.mode = Mode::Input {
            prompt,
            field,
            action,
        };
        Ok(false)
    }

    fn submit_input(&mut self, action: InputAction, value: &str) -> Result<()> {
        match action {
            InputAction::AddList => {
                let title = self.daily.board.add_list(Some(value)).title.clone();
                self.daily.list_idx = self.daily.board.lists.len().saturating_sub(1);
                self.daily.card_idx = 0;
                self.persist_daily(format!("Added list {}", title))?;
            }
            InputAction::RenameList(list_id) => {
                self.daily.board.rename_list(&list_id, value)?;
                self.persist_daily("Renamed list")?;
            }
            InputAction::AddCard(list_id) => {
                self.daily.board.add_card(&list_id, value)?;
                self.daily.card_idx = 0;
                self.persist_daily("Added card")?;
            }
            InputAction::AddTask(iso) => {
                self.weekly.board.add_task(&iso, value)?;
                self.weekly.task_idx = 0;
                self.persist_weekly(format!("Added task on {}", iso))?;
            }
            InputAction::SetDayTitle(iso) => {
                self.monthly.board.set_title(&iso, value)?;
                self.persist_monthly(format!("Updated title of {}", iso))?;
            }
            InputAction::SetDayTag(iso) => {
                self.monthly.board.set_tag(&iso, value)?;
                self.persist_monthly(format!("Updated tag of {}", iso))?;
            }
        }
        self.daily.clamp();
        Ok(())
    }

    fn open_input(&mut self, prompt: &'static str, initial: &str, action: InputAction) {
        self.mode = Mode::Input {
            prompt,
            field: FieldValue::new(initial),
            action,
        };
        self.status = format!("{} (Enter save, Esc cancel)", prompt);
    }

    fn set_view(&mut self, view: ViewMode) {
        if self.view != view {
            self.view = view;
            self.status = format!("Switched to {} view", view.label());
        }
    }

    fn week_start_date(&self) -> NaiveDate {
        start_of_week(self.weekly.anchor, self.session.config.week_start)
    }

    fn current_task_id(&self, iso: &str) -> Option<String> {
        self.weekly
            .board
            .day(iso)
            .and_then(|d| d.tasks.get(self.weekly.task_idx))
            .map(|t| t.id.clone())
    }

    fn open_daily(&mut self, date: NaiveDate) {
        match self.session.store.load_daily(date) {
            Ok(board) => {
                self.daily = DailyState {
                    date,
                    board,
                    list_idx: 0,
                    card_idx: 0,
                    offsets: Vec::new(),
                };
                self.daily.clamp();
            }
            Err(err) => self.status = format!("Could not load {}: {}", to_iso(date), err),
        }
    }

    fn shift_daily(&mut self, delta: i64) {
        match add_days(self.daily.date, delta) {
            Ok(date) => self.open_daily(date),
            Err(err) => self.status = err.to_string(),
        }
    }

    fn open_week(&mut self, anchor: NaiveDate) {
        let week_start = self.session.config.week_start;
        match self.session.store.load_weekly(anchor, week_start) {
            Ok(board) => {
                let start = start_of_week(anchor, week_start);
                self.weekly = WeeklyState {
                    anchor,
                    board,
                    day_idx: week_dates(start)
                        .iter()
                        .position(|d| *d == anchor)
                        .unwrap_or(0),
                    task_idx: 0,
                };
            }
            Err(err) => self.status = format!("Could not load week: {}", err),
        }
    }

    fn shift_week(&mut self, days: i64) {
        match add_days(self.weekly.anchor, days) {
            Ok(anchor) => self.open_week(anchor),
            Err(err) => self.status = err.to_string(),
        }
    }

    fn shift_month_cursor(&mut self, days: i64) {
        if let Ok(date) = add_days(self.monthly.cursor, days) {
            self.monthly.cursor = date;
        }
    }

    fn persist_daily(&mut self, message: impl Into<String>) -> Result<()> {
        self.session
            .store
            .save_daily(self.daily.date, &self.daily.board)?;
        // Day counts in the month view are stale now.
        self.monthly.counts_for = None;
        self.last_save = Some(Instant::now());
        self.status = message.into();
        Ok(())
    }

    fn persist_weekly(&mut self, message: impl Into<String>) -> Result<()> {
        self.session.store.save_weekly(
            self.weekly.anchor,
            self.session.config.week_start,
            &self.weekly.board,
        )?;
        self.last_save = Some(Instant::now());
        self.status = message.into();
        Ok(())
    }

    fn persist_monthly(&mut self, message: impl Into<String>) -> Result<()> {
        self.session
            .store
            .save_monthly(self.monthly.cursor, &self.monthly.board)?;
        self.last_save = Some(Instant::now());
        self.status = message.into();
        Ok(())
    }

    /// Loads the day entries of the cursor's month when the month changed.
    fn ensure_month_board(&mut self) {
        let month = to_month_iso(self.monthly.cursor);
        if self.monthly.board_for.as_deref() == Some(month.as_str()) {
            return;
        }
        self.monthly.board = match self.session.store.load_monthly(self.monthly.cursor) {
            Ok(board) => board,
            Err(err) => {
                self.status = format!("Could not load {}: {}", month, err);
                MonthlyBoard::default().normalized(self.monthly.cursor)
            }
        };
        self.monthly.board_for = Some(month);
    }

    fn month_entry(&self) -> DayEntry {
        self.monthly
            .board
            .entry(&to_iso(self.monthly.cursor))
            .cloned()
            .unwrap_or_default()
    }

    fn refresh_month_counts(&mut self) {
        let grid = build_month_grid(self.monthly.cursor);
        if self.monthly.counts_for == Some((grid.year, grid.month)) {
            return;
        }
        self.monthly.counts.clear();
        for idx in 0..grid.cells.len() {
            let Some(date) = grid.date_at(idx) else {
                continue;
            };
            match self.session.store.load_daily(date) {
                Ok(board) => {
                    let progress = board.progress();
                    if progress.total > 0 {
                        self.monthly.counts.insert(date, progress);
                    }
                }
                Err(err) => log::warn!("event=month_counts status=error date={} error={}", date, err),
            }
        }
        self.monthly.counts_for = Some((grid.year, grid.month));
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        match self.view {
            ViewMode::Timer => self.draw_timer(f, layout[1]),
            ViewMode::Daily => self.draw_daily(f, layout[1]),
            ViewMode::Weekly => self.draw_weekly(f, layout[1]),
            ViewMode::Monthly => self.draw_monthly(f, layout[1]),
        }
        self.draw_footer(f, layout[2]);

        if let Mode::Input { prompt, field, .. } = &self.mode {
            draw_input(f, prompt, field);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let mut spans = vec![Span::styled(
            "dayplan ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )];
        for (idx, view) in ViewMode::ALL.iter().enumerate() {
            let style = if *view == self.view {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::raw(" "));
            spans.push(Span::styled(format!(" {} {} ", idx + 1, view.label()), style));
        }
        spans.push(Span::raw("  •  "));
        spans.push(Span::styled(
            format!("{} ({})", to_iso(self.today), weekday_label(self.today)),
            Style::default().fg(Color::Green),
        ));
        if self.timer.state() != TimerState::Idle {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled(
                format!(
                    "⏱ {} {}",
                    format_clock(self.timer.remaining()),
                    self.timer.state().label()
                ),
                Style::default().fg(Color::LightYellow),
            ));
        }
        spans.push(Span::raw("  •  "));
        spans.push(Span::styled(
            match self.last_save {
                Some(at) => format!("saved {}", format_elapsed(at)),
                None => "not saved yet".to_string(),
            },
            Style::default().fg(Color::DarkGray),
        ));

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_timer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(4),
            ])
            .split(area);

        let state = self.timer.state();
        let clock_color = match state {
            TimerState::Running => Color::LightGreen,
            TimerState::Paused => Color::LightYellow,
            TimerState::Idle => Color::Gray,
        };
        let clock = Paragraph::new(vec![
            Line::from(Span::styled(
                format_clock(self.timer.remaining()),
                Style::default()
                    .fg(clock_color)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                state.label(),
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(clock_color))
                .title("Countdown"),
        );
        f.render_widget(clock, rows[0]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(clock_color).bg(Color::Rgb(16, 18, 24)))
            .ratio(self.timer.progress().clamp(0.0, 1.0))
            .label(format!(
                "{} / {}",
                format_clock(self.timer.run_total() - self.timer.remaining().min(self.timer.run_total())),
                format_clock(self.timer.run_total())
            ));
        f.render_widget(gauge, rows[1]);

        let fields = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(34),
                Constraint::Percentage(33),
                Constraint::Percentage(33),
            ])
            .split(rows[2]);
        let form = &self.timer_form;
        for (idx, (label, value, field)) in [
            ("시", form.hours, TimerField::Hours),
            ("분", form.minutes, TimerField::Minutes),
            ("초", form.seconds, TimerField::Seconds),
        ]
        .into_iter()
        .enumerate()
        {
            let focused = form.field == field;
            let widget = Paragraph::new(format!("{:02}", value))
                .alignment(Alignment::Center)
                .block(focus_block(label, focused));
            f.render_widget(widget, fields[idx]);
        }

        let presets = &self.session.config.presets;
        let focused = form.field == TimerField::Presets;
        let mut lines = Vec::new();
        for chunk_start in (0..presets.len()).step_by(4) {
            let spans: Vec<Span<'static>> = presets[chunk_start..(chunk_start + 4).min(presets.len())]
                .iter()
                .enumerate()
                .map(|(offset, preset)| {
                    let idx = chunk_start + offset;
                    let mut style = Style::default().fg(Color::LightBlue);
                    if idx == form.preset_idx {
                        style = if focused {
                            style.bg(Color::LightBlue).fg(Color::Black).add_modifier(Modifier::BOLD)
                        } else {
                            style.add_modifier(Modifier::UNDERLINED)
                        };
                    }
                    Span::styled(format!(" 🔔 {:<8}", preset.label), style)
                })
                .collect();
            lines.push(Line::from(spans));
        }
        if lines.is_empty() {
            lines.push(Line::from("No presets configured"));
        }
        let presets_widget = Paragraph::new(lines).block(focus_block("Presets", focused));
        f.render_widget(presets_widget, rows[3]);
    }

    fn draw_daily(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        self.daily.clamp();
        let progress = self.daily.board.progress();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(4)])
            .split(area);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(format!(
                "{} ({}){}",
                to_iso(self.daily.date),
                weekday_label(self.daily.date),
                if self.daily.date == self.today { " today" } else { "" }
            )))
            .gauge_style(Style::default().fg(Color::LightGreen))
            .percent(progress.percent.min(100) as u16)
            .label(format!(
                "{}/{} done ({}%)",
                progress.done, progress.total, progress.percent
            ));
        f.render_widget(gauge, rows[0]);

        let lists = &self.daily.board.lists;
        if lists.is_empty() {
            let msg = Paragraph::new("No lists for this day. Press L to create one.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(Clear, rows[1]);
            f.render_widget(msg, rows[1]);
            return;
        }

        let constraints = lists
            .iter()
            .map(|_| Constraint::Percentage((100 / lists.len() as u16).max(1)))
            .collect::<Vec<_>>();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(rows[1]);

        for (idx, list) in lists.iter().enumerate() {
            let accent = color_for_index(idx);
            let selected_list = idx == self.daily.list_idx;
            let width = chunks[idx].width.saturating_sub(2);
            let items = list
                .cards
                .iter()
                .enumerate()
                .map(|(c_idx, card)| {
                    card_item(card, width, selected_list && c_idx == self.daily.card_idx)
                })
                .collect::<Vec<_>>();

            let mut state = ListState::default();
            let viewport = chunks[idx].height.saturating_sub(2) as usize;
            let mut offset = self.daily.offsets.get(idx).copied().unwrap_or(0);
            if selected_list {
                offset = adjust_offset(self.daily.card_idx, offset, viewport, 1, items.len());
                if let Some(slot) = self.daily.offsets.get_mut(idx) {
                    *slot = offset;
                }
                state.select(Some(self.daily.card_idx));
            }
            *state.offset_mut() = offset.min(items.len().saturating_sub(1));

            let done = list.cards.iter().filter(|c| c.done).count();
            let title = format!("{} ({}/{})", list.title, done, list.cards.len());
            let block = Block::default()
                .title(Span::styled(
                    title,
                    Style::default().fg(accent).add_modifier(if selected_list {
                        Modifier::BOLD | Modifier::UNDERLINED
                    } else {
                        Modifier::BOLD
                    }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent))
                .style(Style::default().bg(Color::Rgb(16, 18, 24)));
            f.render_stateful_widget(List::new(items).block(block), chunks[idx], &mut state);
        }
    }

    fn draw_weekly(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let start = self.week_start_date();
        self.weekly.clamp(start);
        let progress = self.weekly.board.progress();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(6), Constraint::Length(7)])
            .split(area);

        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(week_range_label(start)),
            )
            .gauge_style(Style::default().fg(Color::LightMagenta))
            .percent(progress.percent.min(100) as u16)
            .label(format!(
                "{}/{} done ({}%)",
                progress.done, progress.total, progress.percent
            ));
        f.render_widget(gauge, rows[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 7); 7])
            .split(rows[1]);
        let dates = week_dates(start);
        for (idx, date) in dates.iter().enumerate() {
            let iso = to_iso(*date);
            let selected_day = idx == self.weekly.day_idx;
            let tasks = self
                .weekly
                .board
                .day(&iso)
                .map(|d| d.tasks.as_slice())
                .unwrap_or(&[]);
            let width = columns[idx].width.saturating_sub(2);
            let items = tasks
                .iter()
                .enumerate()
                .map(|(t_idx, task)| {
                    card_item(task, width, selected_day && t_idx == self.weekly.task_idx)
                })
                .collect::<Vec<_>>();
            let mut state = ListState::default();
            if selected_day {
                state.select(Some(self.weekly.task_idx));
            }
            let accent = if *date == self.today {
                Color::LightGreen
            } else if is_weekend(*date) {
                Color::LightRed
            } else {
                Color::Gray
            };
            let title = format!(
                "{} {}",
                weekday_label(*date),
                date.format("%m.%d")
            );
            let block = Block::default()
                .title(Span::styled(
                    title,
                    Style::default().fg(accent).add_modifier(if selected_day {
                        Modifier::BOLD | Modifier::UNDERLINED
                    } else {
                        Modifier::BOLD
                    }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if selected_day { Color::Cyan } else { accent }));
            f.render_stateful_widget(List::new(items).block(block), columns[idx], &mut state);
        }

        let done = self.weekly.board.done_per_day(start);
        let labels: Vec<&str> = dates.iter().map(|d| weekday_label(*d)).collect();
        let data: Vec<(&str, u64)> = labels
            .iter()
            .zip(done.iter())
            .map(|(label, count)| (*label, *count as u64))
            .collect();
        let chart = BarChart::default()
            .block(Block::default().borders(Borders::ALL).title("Done per day"))
            .data(data.as_slice())
            .bar_width(3)
            .bar_gap(2)
            .bar_style(Style::default().fg(Color::LightMagenta))
            .value_style(Style::default().fg(Color::Black).bg(Color::LightMagenta));
        f.render_widget(chart, rows[2]);
    }

    fn draw_monthly(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        self.ensure_month_board();
        self.refresh_month_counts();
        let cursor = self.monthly.cursor;
        let grid = build_month_grid(cursor);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(9), Constraint::Length(5)])
            .split(area);

        let achievement = self.monthly.board.progress();
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(format!(
                "{} Month-List",
                month_label(cursor)
            )))
            .gauge_style(Style::default().fg(Color::LightBlue))
            .percent(achievement.percent.min(100) as u16)
            .label(achievement_label(&self.monthly.board));
        f.render_widget(gauge, rows[0]);

        let mut lines = Vec::new();
        let header: Vec<Span<'static>> = WEEKDAY_LABELS
            .iter()
            .enumerate()
            .map(|(idx, w)| {
                let color = if idx == 0 || idx == 6 {
                    Color::LightRed
                } else {
                    Color::Gray
                };
                Span::styled(
                    format!("{:^width$}", w, width = MONTH_CELL_WIDTH),
                    Style::default().fg(color),
                )
            })
            .collect();
        lines.push(Line::from(header));

        for (row_idx, row) in grid.rows().enumerate() {
            let mut spans = Vec::new();
            for (col, cell) in row.iter().enumerate() {
                let idx = row_idx * 7 + col;
                match (cell, grid.date_at(idx)) {
                    (GridCell::Day(day), Some(date)) => {
                        let entry = self.monthly.board.entry(&to_iso(date));
                        let completed = entry.map(|e| e.completed).unwrap_or(false);
                        let progress = self.monthly.counts.get(&date);
                        let text = month_cell_text(*day, entry, progress);
                        let mut style = Style::default().fg(if completed {
                            Color::LightBlue
                        } else if progress.is_some() {
                            Color::LightYellow
                        } else if is_weekend(date) {
                            Color::LightRed
                        } else {
                            Color::Gray
                        });
                        if date == self.today {
                            style = style.add_modifier(Modifier::UNDERLINED);
                        }
                        if date == cursor {
                            style = style
                                .bg(Color::Cyan)
                                .fg(Color::Black)
                                .add_modifier(Modifier::BOLD);
                        }
                        spans.push(Span::styled(
                            format!("{:^width$}", text, width = MONTH_CELL_WIDTH),
                            style,
                        ));
                    }
                    _ => spans.push(Span::raw(" ".repeat(MONTH_CELL_WIDTH))),
                }
            }
            lines.push(Line::from(spans));
        }

        let block = Block::default()
            .title(Span::styled(
                "Calendar",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let calendar = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(calendar, rows[1]);

        let entry = self.month_entry();
        let cards = match self.monthly.counts.get(&cursor) {
            Some(p) => format!("cards {}/{} done ({}%)", p.done, p.total, p.percent),
            None => "no cards".to_string(),
        };
        let title = if entry.title.is_empty() {
            Span::styled("(no title)", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(entry.title.clone(), Style::default().fg(Color::White))
        };
        let mut first = vec![
            Span::styled(
                if entry.completed { "[x] " } else { "[ ] " },
                Style::default().fg(if entry.completed {
                    Color::LightBlue
                } else {
                    Color::Gray
                }),
            ),
            title,
        ];
        if !entry.tag.is_empty() {
            first.push(Span::raw("  "));
            first.push(Span::styled(
                format!("#{}", entry.tag),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::LightBlue)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        let details = Paragraph::new(vec![
            Line::from(first),
            Line::from(Span::styled(cards, Style::default().fg(Color::DarkGray))),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ({})", to_iso(cursor), weekday_label(cursor))),
        );
        f.render_widget(details, rows[2]);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        let mut spans = vec![key("1-4", Color::LightCyan), Span::raw(" views  ")];
        match self.view {
            ViewMode::Timer => spans.extend([
                key("←→", Color::LightCyan),
                Span::raw(" field  "),
                key("↑↓", Color::LightCyan),
                Span::raw(" adjust  "),
                key("Enter/s", Color::LightGreen),
                Span::raw(" start  "),
                key("p", Color::LightGreen),
                Span::raw(" preset  "),
                key("Space", Color::LightYellow),
                Span::raw(" pause/resume  "),
                key("r", Color::LightRed),
                Span::raw(" reset  "),
            ]),
            ViewMode::Daily => spans.extend([
                key("←→↑↓", Color::LightCyan),
                Span::raw(" move  "),
                key("[ ]", Color::LightCyan),
                Span::raw(" day  "),
                key("L/R/D", Color::LightMagenta),
                Span::raw(" list new/rename/delete  "),
                key("a", Color::LightMagenta),
                Span::raw(" card  "),
                key("Space", Color::LightYellow),
                Span::raw(" done  "),
                key("d", Color::LightRed),
                Span::raw(" delete  "),
            ]),
            ViewMode::Weekly => spans.extend([
                key("←→↑↓", Color::LightCyan),
                Span::raw(" move  "),
                key("[ ]", Color::LightCyan),
                Span::raw(" week  "),
                key("a", Color::LightMagenta),
                Span::raw(" task  "),
                key("Space", Color::LightYellow),
                Span::raw(" done  "),
                key("d", Color::LightRed),
                Span::raw(" delete  "),
                key("Enter", Color::LightGreen),
                Span::raw(" open day  "),
            ]),
            ViewMode::Monthly => spans.extend([
                key("←→↑↓", Color::LightCyan),
                Span::raw(" move  "),
                key("[ ]", Color::LightCyan),
                Span::raw(" month  "),
                key("t", Color::LightCyan),
                Span::raw(" today  "),
                key("e/g", Color::LightMagenta),
                Span::raw(" title/tag  "),
                key("Space", Color::LightYellow),
                Span::raw(" done  "),
                key("Enter", Color::LightGreen),
                Span::raw(" open day  "),
                key("w", Color::LightGreen),
                Span::raw(" open week  "),
            ]),
        }
        spans.extend([key("q", Color::LightRed), Span::raw(" quit")]);
        Line::from(spans)
    }
}

fn draw_input(f: &mut ratatui::Frame<'_>, prompt: &str, field: &FieldValue) {
    let area = centered_rect(60, 20, f.size());
    let widget = Paragraph::new(field.with_caret())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightMagenta))
                .title(prompt.to_string()),
        );
    f.render_widget(Clear, area);
    f.render_widget(widget, area);
}

fn focus_block(title: &str, focused: bool) -> Block<'static> {
    let color = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
            title.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn color_for_index(idx: usize) -> Color {
    let palette = [
        Color::Cyan,
        Color::LightGreen,
        Color::LightMagenta,
        Color::LightBlue,
        Color::LightYellow,
        Color::LightRed,
    ];
    palette[idx % palette.len()]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&"..."[..max.min(3)]);
    out
}

fn card_item(card: &Card, width: u16, selected: bool) -> ListItem<'static> {
    let check = if card.done { "[x] " } else { "[ ] " };
    let text = truncate_text(&card.text, (width as usize).saturating_sub(check.len()));
    let mut text_style = Style::default().fg(if card.done {
        Color::DarkGray
    } else {
        Color::White
    });
    if card.done {
        text_style = text_style.add_modifier(Modifier::CROSSED_OUT);
    }
    let mut item = ListItem::new(Line::from(vec![
        Span::styled(
            check,
            Style::default().fg(if card.done {
                Color::LightGreen
            } else {
                Color::Gray
            }),
        ),
        Span::styled(text, text_style),
    ]));
    if selected {
        item = item.style(Style::default().bg(Color::Rgb(40, 44, 60)));
    }
    item
}

/// Day number, a check mark for completed days and the day's card counts.
fn month_cell_text(day: u32, entry: Option<&DayEntry>, cards: Option<&Progress>) -> String {
    let mark = match entry {
        Some(e) if e.completed => "✓",
        Some(e) if !e.tag.is_empty() => "#",
        _ => "",
    };
    match cards {
        Some(p) => format!("{:>2}{}({}/{})", day, mark, p.done, p.total),
        None => format!("{:>2}{}", day, mark),
    }
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_editing_respects_char_boundaries() {
        let mut field = FieldValue::new("공부");
        field.insert_char('!');
        assert_eq!(field.value, "공부!");
        field.move_left();
        field.move_left();
        field.backspace();
        assert_eq!(field.value, "부!");
        assert_eq!(field.with_caret(), "▌부!");
        field.move_right();
        assert_eq!(field.with_caret(), "부▌!");
    }

    #[test]
    fn timer_form_wraps_fields() {
        let mut form = TimerForm::new();
        form.field = TimerField::Hours;
        form.adjust(-1, 12);
        assert_eq!(form.hours, 23);
        form.adjust(1, 12);
        assert_eq!(form.hours, 0);
        form.field = TimerField::Seconds;
        form.adjust(-1, 12);
        assert_eq!(form.seconds, 59);
        form.field = TimerField::Presets;
        form.adjust(-1, 12);
        assert_eq!(form.preset_idx, 11);
        form.adjust(1, 0);
        assert_eq!(form.preset_idx, 11);
    }

    #[test]
    fn timer_fields_cycle() {
        let mut field = TimerField::Hours;
        for _ in 0..4 {
            field = field.next();
        }
        assert!(field == TimerField::Hours);
        assert!(field.prev() == TimerField::Presets);
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a longer card", 8), "a lon...");
        assert_eq!(truncate_text("abc", 0), "");
        assert_eq!(truncate_text("abcdef", 2), "..");
    }

    #[test]
    fn month_cells_mark_entries() {
        let done = DayEntry {
            completed: true,
            ..DayEntry::default()
        };
        let tagged = DayEntry {
            tag: "시험".into(),
            ..DayEntry::default()
        };
        let cards = Progress::from_counts(4, 1);
        assert_eq!(month_cell_text(3, None, None), " 3");
        assert_eq!(month_cell_text(3, Some(&done), None), " 3✓");
        assert_eq!(month_cell_text(14, Some(&tagged), Some(&cards)), "14#(1/4)");
        assert_eq!(
            month_cell_text(30, Some(&DayEntry::default()), Some(&cards)),
            "30(1/4)"
        );
    }

    #[test]
    fn offsets_follow_selection() {
        assert_eq!(adjust_offset(0, 0, 5, 1, 20), 0);
        assert_eq!(adjust_offset(10, 0, 5, 1, 20), 7);
        assert_eq!(adjust_offset(3, 7, 5, 1, 20), 2);
        assert_eq!(adjust_offset(3, 0, 0, 1, 20), 0);
    }
}
