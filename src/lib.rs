//! Strata - declarative option-block merging over class hierarchies.
//!
//! This library provides the core merging mechanism and two pattern
//! families built on it:
//! - Option blocks declared per class, merged most-derived-wins across the
//!   hierarchy at class-definition time
//! - Per-family validation hooks that run once for every concrete class
//! - An Observer/Subject family (identity-keyed, unordered notification)
//! - A Step/Pipeline family (ordered steps, shallow accumulator merge)
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use strata::meta::{Hierarchy, OptionBlock, OptionValue};
//! use strata::pipeline::{PipelineClass, PipelineFamily, Step, StepClass};
//!
//! struct Seed(i64);
//!
//! impl Step<BTreeSet<i64>> for Seed {
//!     fn run(&mut self, _args: &()) -> Option<BTreeSet<i64>> {
//!         Some(BTreeSet::from([self.0]))
//!     }
//! }
//!
//! fn main() -> strata::Result<()> {
//!     let mut hierarchy = Hierarchy::new();
//!     let family = PipelineFamily::install(&mut hierarchy)?;
//!
//!     let seed: StepClass<BTreeSet<i64>> =
//!         StepClass::define(&mut hierarchy, &family, "Seed", &[], None, || Seed(1))?;
//!
//!     let block = OptionBlock::new().set("step", OptionValue::Class(seed.id()));
//!     let pipeline_class: PipelineClass<BTreeSet<i64>> =
//!         PipelineClass::define(&mut hierarchy, &family, "SeedPipeline", &[], Some(block), BTreeSet::new)?;
//!
//!     let mut pipeline = pipeline_class.instantiate();
//!     pipeline.register(&seed)?;
//!     assert_eq!(pipeline.run(&()), BTreeSet::from([1]));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod meta;
pub mod observer;
pub mod pipeline;

pub use error::{Result, StrataError};
