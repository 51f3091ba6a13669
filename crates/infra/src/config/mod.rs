//! Configuration loading and management
//!
//! Resolves the active Oracle environment and its endpoint configuration.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_for_env};
