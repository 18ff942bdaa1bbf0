//! Mapping descriptors.
//!
//! # Data Flow
//! ```text
//! DescriptorSource (directory of *.xml)
//!     → source.rs (read units, name order)
//!     → parser.rs (XML → MappingDescriptor, defaults applied)
//!     → routing::table (compile patterns, build VersionTable)
//! ```

pub mod descriptor;
pub mod parser;
pub mod source;

pub use descriptor::{Backend, EndpointSpec, MappingDescriptor, PathVariable};
pub use parser::{parse, ParseOptions};
pub use source::{DescriptorSource, DirectorySource, SourceUnit};
