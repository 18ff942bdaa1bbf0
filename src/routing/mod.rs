//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Reload (store.rs):
//!     DescriptorSource units
//!     → mapping::parser (typed descriptors)
//!     → pattern.rs (one CompiledPattern per endpoint)
//!     → table.rs (VersionTable per version)
//!     → Snapshot published via ArcSwap
//!
//! Incoming Request (version, method, path)
//!     → store.rs (load current snapshot)
//!     → table.rs (first matching pattern)
//!     → Return: ResolvedRoute | UnknownVersion | NotFound
//! ```
//!
//! # Design Decisions
//! - Tables compiled at reload, immutable at runtime
//! - Deterministic: declaration order decides ties between patterns
//! - First match wins

pub mod pattern;
pub mod store;
pub mod table;

pub use pattern::{compile, CompiledPattern, PatternError};
pub use store::{Binding, MappingStore, ResolvedRoute, Snapshot, StoreSettings, StoreStatus};
pub use table::VersionTable;
