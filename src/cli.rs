use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "dayplan", version, about = "Terminal day planner with boards and a countdown timer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print today's date
    Today,
    /// Show the week containing a date
    Week {
        /// Anchor date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Print a month calendar, or manage the month's day entries
    Month {
        /// Any date in the month (YYYY-MM-DD), defaults to today
        #[arg(long, global = true)]
        date: Option<String>,
        #[command(subcommand)]
        action: Option<MonthlyAction>,
    },
    /// Manage a day's lists and cards
    Daily {
        /// Board date (YYYY-MM-DD), defaults to today
        #[arg(long, global = true)]
        date: Option<String>,
        #[command(subcommand)]
        action: DailyAction,
    },
    /// Manage the tasks of a week
    Weekly {
        /// Any date in the week (YYYY-MM-DD), defaults to today
        #[arg(long, global = true)]
        date: Option<String>,
        #[command(subcommand)]
        action: WeeklyAction,
    },
    /// Run a countdown in the terminal
    Timer {
        #[arg(long, default_value_t = 0)]
        hours: u32,
        #[arg(long, default_value_t = 0)]
        minutes: u32,
        #[arg(long, default_value_t = 0)]
        seconds: u32,
        /// Preset label to run instead of the h/m/s fields
        #[arg(long, conflicts_with_all = ["hours", "minutes", "seconds"])]
        preset: Option<String>,
    },
    /// Launch the interactive TUI
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum DailyAction {
    /// Show lists and cards
    List,
    /// Create a list
    AddList {
        /// List title
        title: Option<String>,
    },
    /// Rename a list
    RenameList { list_id: String, title: String },
    /// Delete a list and its cards
    RemoveList { list_id: String },
    /// Add a card to a list
    Add { list_id: String, text: String },
    /// Flip a card between done and open
    Toggle { list_id: String, card_id: String },
    /// Delete a card
    Remove { list_id: String, card_id: String },
}

#[derive(Subcommand, Debug)]
pub enum WeeklyAction {
    /// Show each day's tasks
    List,
    /// Add a task to a day
    Add {
        /// Day (YYYY-MM-DD) inside the week
        day: String,
        text: String,
    },
    /// Flip a task between done and open
    Toggle { day: String, task_id: String },
    /// Delete a task
    Remove { day: String, task_id: String },
}

#[derive(Subcommand, Debug)]
pub enum MonthlyAction {
    /// Show every day's title, tag and completion
    List,
    /// Set a day's title (empty clears it)
    Title {
        /// Day (YYYY-MM-DD) inside the month
        day: String,
        #[arg(default_value = "")]
        title: String,
    },
    /// Set a day's tag (empty removes it)
    Tag {
        day: String,
        #[arg(default_value = "")]
        tag: String,
    },
    /// Flip a day between done and open
    Toggle { day: String },
}
