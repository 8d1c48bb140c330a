pub mod categories;
pub mod rate;
pub mod setup;
pub mod ui;
