pub mod adapters;
pub mod application;
pub mod common;
pub mod config;
pub mod domains;

pub use config::SdkConfig;

// Re-export common types
pub use common::*;

// Re-export the session runtime
pub use application::*;

// Re-export domain modules
pub use domains::*;
