//! Observability subsystem.
//!
//! All subsystems emit `tracing` events with structured fields (generation,
//! version, unit, id); `logging.rs` installs the subscriber for the binary.

pub mod logging;
