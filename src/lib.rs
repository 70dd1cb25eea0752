// Library for tests to access modules

pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod events;
pub mod health;
pub mod models;
pub mod monitor;
pub mod probes;
pub mod scheduler;
pub mod speedtest;
pub mod store;
