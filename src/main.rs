use anyhow::Result;
use clap::Parser;
use daygrid::cli;
use daygrid::commands::{self, RepeatArgs};

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Add {
            title,
            date,
            time,
            repeat,
            every,
            unit,
            count,
            until,
            on,
            color,
        } => commands::add(
            title,
            date,
            time,
            RepeatArgs {
                repeat,
                every,
                unit,
                count,
                until,
                on,
            },
            color,
        ),
        cli::Command::List { month } => commands::list(month),
        cli::Command::Edit {
            id,
            title,
            date,
            time,
            repeat,
            every,
            unit,
            count,
            until,
            on,
            color,
            clear_repeat,
        } => commands::edit(
            id,
            title,
            date,
            time,
            RepeatArgs {
                repeat,
                every,
                unit,
                count,
                until,
                on,
            },
            color,
            clear_repeat,
        ),
        cli::Command::Remove { id } => commands::remove(id),
        cli::Command::Show { month } => commands::show(month),
        cli::Command::Config { first_weekday } => commands::config(first_weekday),
        cli::Command::Tui => commands::tui(),
    }
}
