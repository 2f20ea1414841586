mod cli;
mod commands;
mod config;
mod date;
mod logging;
mod model;
mod storage;
mod ticker;
mod timer;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = config::Config::load()?;
    let session = commands::Session::new(config)?;
    let _logger = logging::init(&session.config.log_level, session.store.root())?;

    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Today => commands::today(),
        cli::Command::Week { date } => commands::week(&session, date),
        cli::Command::Month { date, action } => commands::month(&session, date, action),
        cli::Command::Daily { date, action } => commands::daily(&session, date, action),
        cli::Command::Weekly { date, action } => commands::weekly(&session, date, action),
        cli::Command::Timer {
            hours,
            minutes,
            seconds,
            preset,
        } => commands::timer(&session, hours, minutes, seconds, preset),
        cli::Command::Tui => commands::tui(session),
    }
}
