pub mod health;
pub mod report;
