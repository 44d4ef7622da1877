use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "daygrid", version, about = "Terminal calendar and reminder dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a reminder
    Add {
        /// Reminder title
        title: String,
        /// Anchor date in YYYY-MM-DD format
        date: String,
        /// Time of day, HH:MM or HH:MM-HH:MM
        #[arg(long)]
        time: Option<String>,
        /// Repeat kind
        #[arg(long, value_enum)]
        repeat: Option<RepeatArg>,
        /// Step for custom repeats (every N units, defaults to 1)
        #[arg(long)]
        every: Option<u32>,
        /// Unit for custom repeats
        #[arg(long, value_enum)]
        unit: Option<UnitArg>,
        /// Total number of occurrences (0 = repeat forever)
        #[arg(long)]
        count: Option<u32>,
        /// Last date a repeat may land on, YYYY-MM-DD
        #[arg(long)]
        until: Option<String>,
        /// Weekdays for weekday repeats, e.g. mon,wed,fri
        #[arg(long)]
        on: Option<String>,
        /// Reminder color (any CSS color string)
        #[arg(long)]
        color: Option<String>,
    },
    /// List occurrences in a month
    List {
        /// Month to list, YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Edit an existing reminder
    Edit {
        /// Reminder id
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New anchor date, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        /// New time of day, HH:MM or HH:MM-HH:MM
        #[arg(long)]
        time: Option<String>,
        /// New repeat kind
        #[arg(long, value_enum)]
        repeat: Option<RepeatArg>,
        /// Step for custom repeats
        #[arg(long)]
        every: Option<u32>,
        /// Unit for custom repeats
        #[arg(long, value_enum)]
        unit: Option<UnitArg>,
        /// Total number of occurrences (0 = forever)
        #[arg(long)]
        count: Option<u32>,
        /// Last repeat date, YYYY-MM-DD
        #[arg(long)]
        until: Option<String>,
        /// Weekdays for weekday repeats
        #[arg(long)]
        on: Option<String>,
        /// New color
        #[arg(long)]
        color: Option<String>,
        /// Drop the repeat rule entirely
        #[arg(long)]
        clear_repeat: bool,
    },
    /// Remove a reminder
    Remove {
        /// Reminder id
        id: String,
    },
    /// Print a month grid with reminder marks
    Show {
        /// Month to show, YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Change configuration
    Config {
        /// Which weekday starts the week
        #[arg(long, value_enum)]
        first_weekday: Option<FirstWeekdayArg>,
    },
    /// Launch the interactive TUI
    Tui,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepeatArg {
    Day,
    Week,
    Month,
    Weekday,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    Days,
    Weeks,
    Months,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FirstWeekdayArg {
    Monday,
    Sunday,
}
