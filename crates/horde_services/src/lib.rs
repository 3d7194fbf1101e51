//! Horde Services Layer
//!
//! Host-side plumbing around the simulation core: settings loading and
//! conversion into validated core configuration.

pub mod settings;

pub use settings::{Settings, SettingsError};
