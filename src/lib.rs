//! Geopolitical OSINT event scoring: threat, sentiment, regional and trend
//! analysis over an event snapshot, plus rule-driven webhook automation.

pub mod automation;
pub mod config;
pub mod core;
pub mod export;
pub mod notifications;
pub mod signals;
pub mod webhook;
