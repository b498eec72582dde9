pub mod admin;
pub mod cron;
pub mod public;
