//! Core infrastructure: terminal output, per-library locks, layered settings.

pub mod lock;
pub mod output;
pub mod settings;
