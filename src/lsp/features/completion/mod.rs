//! Code completion for Markdoc tags, functions and attributes
//!
//! This module provides:
//! - Context classification of the cursor position (`context`)
//! - Prefix resolution of a context against the symbol registry (`resolver`)

pub mod context;
pub mod resolver;

pub use context::{classify, CompletionContext};
pub use resolver::{resolve, Candidate, ResolutionFailure};
