pub mod chart;
pub mod dashboard;
pub mod interactive;
pub mod setup;
pub mod ui;
