//! Step/Pipeline family built on the option-merging hierarchy.
//!
//! This module handles:
//! - Concrete step classes with a `run` behavior and an `initialize` hook
//! - Pipelines holding registered step instances in registration order
//! - The shallow accumulator merge policy
//!
//! A pipeline's option block declares which step class it accepts via the
//! `step` option; the family validation hook enforces that the option
//! names a subclass of the `Step` root. Registration takes a step class,
//! not an instance: the pipeline constructs the instance itself and calls
//! its `initialize` hook.

use crate::error::{Result, StrataError};
use crate::meta::block::OptionBlock;
use crate::meta::hierarchy::{ClassDecl, ClassId, ClassView, Hierarchy};
use crate::meta::merge::MergedOptions;
use crate::meta::validate::{require_callable, require_option_class};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

/// Behavior contract for step instances.
///
/// `D` is the accumulator type the pipeline merges results into; `A` is
/// the argument value passed unchanged to every step of one run.
pub trait Step<D, A = ()> {
	/// Called once, right after the step is registered with a pipeline.
	fn initialize(&mut self) {}

	/// Produce this step's contribution, or `None` to contribute nothing.
	fn run(&mut self, args: &A) -> Option<D>;
}

/// Shallow merge policy for pipeline accumulators.
///
/// The value merged in later wins on key collision; for sets this is a
/// plain union. The policy is part of the contract, not an accident of
/// the accumulator type.
pub trait Merge {
	fn merge(&mut self, other: Self);
}

impl<K: Ord, V> Merge for BTreeMap<K, V> {
	fn merge(&mut self, other: Self) {
		self.extend(other);
	}
}

impl<K: Eq + std::hash::Hash, V> Merge for HashMap<K, V> {
	fn merge(&mut self, other: Self) {
		self.extend(other);
	}
}

impl<V: Ord> Merge for BTreeSet<V> {
	fn merge(&mut self, other: Self) {
		self.extend(other);
	}
}

impl<V: Eq + std::hash::Hash> Merge for HashSet<V> {
	fn merge(&mut self, other: Self) {
		self.extend(other);
	}
}

/// The two roots of the pipeline family.
#[derive(Debug, Clone, Copy)]
pub struct PipelineFamily {
	pub step: ClassId,
	pub pipeline: ClassId,
}

impl PipelineFamily {
	/// Register the `Step` and `Pipeline` roots and their validation
	/// hooks in the hierarchy.
	pub fn install(hierarchy: &mut Hierarchy) -> Result<Self> {
		let step = hierarchy.root_with_hook(
			"Step",
			Rc::new(|class: ClassView<'_>| require_callable(&class, "run")),
		)?;
		let pipeline = hierarchy.root_with_hook(
			"Pipeline",
			Rc::new(move |class: ClassView<'_>| require_option_class(&class, "step", step)),
		)?;

		Ok(PipelineFamily { step, pipeline })
	}
}

/// A defined concrete step class: descriptor plus behavior factory.
pub struct StepClass<D, A = ()> {
	id: ClassId,
	name: Rc<str>,
	ancestry: Rc<[ClassId]>,
	merged: MergedOptions,
	make: Rc<dyn Fn() -> Box<dyn Step<D, A>>>,
}

impl<D, A> Clone for StepClass<D, A> {
	fn clone(&self) -> Self {
		StepClass {
			id: self.id,
			name: Rc::clone(&self.name),
			ancestry: Rc::clone(&self.ancestry),
			merged: self.merged.clone(),
			make: Rc::clone(&self.make),
		}
	}
}

impl<D: 'static, A: 'static> StepClass<D, A> {
	/// Define a concrete step class.
	///
	/// Declares the `run` method member (the factory supplies the
	/// behavior) and validates through the family hook. With no bases the
	/// class derives directly from the `Step` root.
	pub fn define<F, S>(
		hierarchy: &mut Hierarchy,
		family: &PipelineFamily,
		name: &str,
		bases: &[ClassId],
		block: Option<OptionBlock>,
		make: F,
	) -> Result<Self>
	where
		F: Fn() -> S + 'static,
		S: Step<D, A> + 'static,
	{
		let mut decl = ClassDecl::new(name).method("run");
		if bases.is_empty() {
			decl = decl.base(family.step);
		} else {
			for &base in bases {
				decl = decl.base(base);
			}
		}
		if let Some(block) = block {
			decl = decl.block(block);
		}

		let id = hierarchy.define(decl)?;
		let merged = hierarchy
			.merged(id)
			.cloned()
			.ok_or(StrataError::UnknownClass)?;
		let make: Rc<dyn Fn() -> Box<dyn Step<D, A>>> =
			Rc::new(move || Box::new(make()) as Box<dyn Step<D, A>>);

		Ok(StepClass {
			id,
			name: name.into(),
			ancestry: hierarchy.ancestry(id).into(),
			merged,
			make,
		})
	}
}

impl<D, A> StepClass<D, A> {
	pub fn id(&self) -> ClassId {
		self.id
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The class-level merged options.
	pub fn options(&self) -> &MergedOptions {
		&self.merged
	}
}

/// A step instance held by a pipeline, with its own copy of the merged
/// options.
pub struct RegisteredStep<D, A = ()> {
	class: ClassId,
	name: Rc<str>,
	options: MergedOptions,
	step: Box<dyn Step<D, A>>,
}

impl<D, A> RegisteredStep<D, A> {
	pub fn class(&self) -> ClassId {
		self.class
	}

	pub fn class_name(&self) -> &str {
		&self.name
	}

	pub fn options(&self) -> &MergedOptions {
		&self.options
	}
}

/// A defined pipeline class with its accepted step capability resolved
/// and its initial-accumulator factory bound.
pub struct PipelineClass<D, A = ()> {
	id: ClassId,
	name: Rc<str>,
	merged: MergedOptions,
	required: Option<(ClassId, Rc<str>)>,
	initial: Rc<dyn Fn() -> D>,
	_args: std::marker::PhantomData<fn(&A)>,
}

impl<D, A> std::fmt::Debug for PipelineClass<D, A> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PipelineClass")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("merged", &self.merged)
			.field("required", &self.required)
			.finish_non_exhaustive()
	}
}

impl<D, A> Clone for PipelineClass<D, A> {
	fn clone(&self) -> Self {
		PipelineClass {
			id: self.id,
			name: Rc::clone(&self.name),
			merged: self.merged.clone(),
			required: self.required.clone(),
			initial: Rc::clone(&self.initial),
			_args: std::marker::PhantomData,
		}
	}
}

impl<D: 'static, A> PipelineClass<D, A> {
	/// Define a pipeline class. With no bases the class derives directly
	/// from the `Pipeline` root.
	///
	/// `initial` produces the starting accumulator for each run. Concrete
	/// classes are validated by the family hook (`step` option present
	/// and a subclass of `Step`).
	pub fn define(
		hierarchy: &mut Hierarchy,
		family: &PipelineFamily,
		name: &str,
		bases: &[ClassId],
		block: Option<OptionBlock>,
		initial: impl Fn() -> D + 'static,
	) -> Result<Self> {
		let mut decl = ClassDecl::new(name);
		if bases.is_empty() {
			decl = decl.base(family.pipeline);
		} else {
			for &base in bases {
				decl = decl.base(base);
			}
		}
		if let Some(block) = block {
			decl = decl.block(block);
		}

		let id = hierarchy.define(decl)?;
		let merged = hierarchy
			.merged(id)
			.cloned()
			.ok_or(StrataError::UnknownClass)?;

		let required = merged
			.get("step")
			.and_then(|value| value.as_class())
			.map(|class| {
				let class_name: Rc<str> = hierarchy
					.class_name(class)
					.unwrap_or("<unknown>")
					.into();
				(class, class_name)
			});

		Ok(PipelineClass {
			id,
			name: name.into(),
			merged,
			required,
			initial: Rc::new(initial),
			_args: std::marker::PhantomData,
		})
	}
}

impl<D, A> PipelineClass<D, A> {
	pub fn id(&self) -> ClassId {
		self.id
	}

	pub fn options(&self) -> &MergedOptions {
		&self.merged
	}

	/// Create a pipeline instance with no registered steps and its own
	/// copy of the merged options.
	pub fn instantiate(&self) -> Pipeline<D, A> {
		Pipeline {
			class: self.id,
			name: Rc::clone(&self.name),
			options: self.merged.clone(),
			required: self.required.clone(),
			initial: Rc::clone(&self.initial),
			steps: Vec::new(),
		}
	}
}

/// A pipeline instance: an ordered sequence of step instances.
pub struct Pipeline<D, A = ()> {
	class: ClassId,
	name: Rc<str>,
	options: MergedOptions,
	required: Option<(ClassId, Rc<str>)>,
	initial: Rc<dyn Fn() -> D>,
	steps: Vec<RegisteredStep<D, A>>,
}

impl<D, A> Pipeline<D, A> {
	pub fn class(&self) -> ClassId {
		self.class
	}

	/// This instance's own copy of the merged options.
	pub fn options(&self) -> &MergedOptions {
		&self.options
	}

	/// Register a step class.
	///
	/// The class must be a subclass of the class declared by the `step`
	/// option; on failure the registry is unchanged. Otherwise a fresh
	/// instance is constructed, appended, and its `initialize` hook
	/// invoked.
	pub fn register(&mut self, step: &StepClass<D, A>) -> Result<()> {
		let (required, required_name) =
			self.required
				.as_ref()
				.ok_or_else(|| StrataError::MissingOption {
					class: self.name.to_string(),
					option: "step".to_string(),
				})?;
		if !step.ancestry.contains(required) {
			return Err(StrataError::NotSubclass {
				class: step.name.to_string(),
				base: required_name.to_string(),
			});
		}

		self.steps.push(RegisteredStep {
			class: step.id,
			name: Rc::clone(&step.name),
			options: step.merged.clone(),
			step: (step.make)(),
		});
		if let Some(registered) = self.steps.last_mut() {
			registered.step.initialize();
		}

		Ok(())
	}

	/// Registered steps in registration order.
	pub fn steps(&self) -> impl Iterator<Item = &RegisteredStep<D, A>> {
		self.steps.iter()
	}

	pub fn len(&self) -> usize {
		self.steps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.steps.is_empty()
	}
}

impl<D: Merge, A> Pipeline<D, A> {
	/// Run every step in registration order with the same arguments,
	/// merging each `Some` result into the accumulator (later steps win
	/// on collision). With no steps the initial accumulator is returned
	/// untouched.
	pub fn run(&mut self, args: &A) -> D {
		let mut data = (self.initial)();
		for registered in &mut self.steps {
			if let Some(contribution) = registered.step.run(args) {
				data.merge(contribution);
			}
		}
		data
	}
}

impl<'a, D, A> IntoIterator for &'a Pipeline<D, A> {
	type Item = &'a RegisteredStep<D, A>;
	type IntoIter = std::slice::Iter<'a, RegisteredStep<D, A>>;

	fn into_iter(self) -> Self::IntoIter {
		self.steps.iter()
	}
}
