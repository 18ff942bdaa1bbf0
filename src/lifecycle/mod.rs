//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop serving
//!     SIGHUP → MappingStore::reload
//! ```

pub mod signals;

pub use signals::{next_signal, Signal};
