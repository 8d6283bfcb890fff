// All review functionality is in redline-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod review;

// Re-export core types for convenience
pub use redline_core::*;

// Re-export CLI utilities
pub use review::{load_config, run, RunOptions, RunSummary};
