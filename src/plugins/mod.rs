//! Action and filter implementations.
//!
//! # Data Flow
//! ```text
//! descriptor className
//!     → resolver.rs (per-generation cache)
//!     → archive.rs (pluggable unit, if configured)
//!     → registry.rs (built-in implementations)
//!     → Arc<dyn Implementation> | ResolveError
//! ```

pub mod archive;
pub mod registry;
pub mod resolver;

pub use archive::PluginArchive;
pub use registry::{
    BuiltinRegistry, DeclaredImplementation, Implementation, ImplementationKind, Origin,
};
pub use resolver::ImplementationResolver;
