pub mod catalog;
pub mod report;
pub mod settings;
pub mod state;
