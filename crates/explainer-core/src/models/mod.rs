//! Data models for the application
//!
//! This module contains all data structures used throughout the application,
//! organized by domain. Each sub-module represents a specific feature area.

mod audio;
mod catalog;
mod question;
mod repository;

// Re-export all models for convenient imports
pub use audio::*;
pub use catalog::*;
pub use question::*;
pub use repository::*;
