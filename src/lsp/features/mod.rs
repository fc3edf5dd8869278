//! Markdoc language features
//!
//! The request path runs leaf-first through:
//! - `completion::context`: classify the cursor position
//! - `completion::resolver`: match the partial token against the registry
//! - `diagnostics`: turn a failed match into a warning
//! - `coordinator`: drive the three for a (document, position) pair

pub mod completion;
pub mod coordinator;
pub mod diagnostics;
