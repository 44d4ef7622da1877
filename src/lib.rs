pub mod calendar;
pub mod cli;
pub mod commands;
pub mod datemath;
pub mod external;
pub mod locale;
pub mod model;
pub mod recurrence;
pub mod storage;
pub mod store;
pub mod ui;
