//! Configuration, bootstrap, and generation context assembly for manimate.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod secret;

pub use config::Config;
pub use context::{ContextAssembler, ContextSource, GenerationContext, ReferenceExample};
