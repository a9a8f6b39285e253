//! keycadence - privacy-first keystroke dynamics capture
//!
//! Records rounds of a user typing a fixed phrase, measures inter-key
//! intervals and key hold times, and writes local JSON and HTML reports.
//! Key identities are replaced with salted hashes unless the user
//! explicitly consents to storing raw key names.

pub mod anonymize;
pub mod config;
pub mod error;
pub mod keyboard;
pub mod metrics;
pub mod report;
pub mod session;
pub mod utils;
pub mod webhook;

pub use config::Config;
pub use session::Session;
