//! Terminal viewer, editor, formatter and structural differ for YAML and
//! JSON documents.
//!
//! Documents are parsed into an arena [`tree::Tree`]. Navigation, folding,
//! search and editing operate on that tree; [`diff::compare`] aligns two of
//! them node by node.

pub mod app;
pub mod config;
pub mod diff;
pub mod diff_app;
pub mod diff_render;
pub mod edit;
pub mod format;
pub mod logging;
pub mod nav;
pub mod parse;
pub mod path;
pub mod render;
pub mod tree;
