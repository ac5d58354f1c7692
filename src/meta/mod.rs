//! Declarative option blocks merged across a class hierarchy.
//!
//! This module handles:
//! - Option block declaration and TOML parsing
//! - Most-derived-wins merging at class-definition time
//! - Class descriptors, family roots, and validation hooks

pub mod block;
pub mod hierarchy;
pub mod merge;
pub mod parser;
pub mod validate;

pub use block::{OptionBlock, OptionValue, validate_ident};
pub use hierarchy::{ClassDecl, ClassId, ClassView, Hierarchy, Member, ValidateHook};
pub use merge::{MergedOptions, merge_options};
pub use parser::{parse_block_file, parse_block_str};
pub use validate::{require_callable, require_member, require_option, require_option_class};
