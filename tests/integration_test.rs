use std::cell::Cell;
use std::collections::BTreeSet;
use std::path::Path;
use std::rc::Rc;

use strata::StrataError;
use strata::meta::{
	ClassDecl, ClassView, Hierarchy, OptionBlock, OptionValue, parse_block_str, require_member,
};
use strata::observer::{Callback, Observer, ObserverClass, ObserverFamily, SubjectClass};
use strata::pipeline::{PipelineClass, PipelineFamily, Step, StepClass};

// ============================================================================
// Option merging across a hooked family
// ============================================================================

fn install_run_family(hierarchy: &mut Hierarchy) -> strata::meta::ClassId {
	hierarchy
		.root_with_hook(
			"Base",
			Rc::new(|class: ClassView<'_>| require_member(&class, "run")),
		)
		.unwrap()
}

#[test]
fn test_inheritance_chain_merges_most_derived_wins() {
	let mut hierarchy = Hierarchy::new();
	let base = install_run_family(&mut hierarchy);

	let child1 = hierarchy
		.define(
			ClassDecl::new("Child1")
				.base(base)
				.attribute("run")
				.block(
					OptionBlock::new()
						.set("option1", OptionValue::Int(1))
						.set("option2", OptionValue::Int(1))
						.set("option3", OptionValue::Int(1)),
				),
		)
		.unwrap();
	let child2 = hierarchy
		.define(
			ClassDecl::new("Child2").base(child1).block(
				OptionBlock::new()
					.set("option2", OptionValue::Int(2))
					.set("option4", OptionValue::Int(2)),
			),
		)
		.unwrap();
	let child3 = hierarchy
		.define(
			ClassDecl::new("Child3").base(child2).block(
				OptionBlock::new()
					.set("option3", OptionValue::Int(3))
					.set("option5", OptionValue::Int(3)),
			),
		)
		.unwrap();

	let merged = hierarchy.merged(child3).unwrap();
	assert_eq!(merged.get("option1"), Some(&OptionValue::Int(1)));
	assert_eq!(merged.get("option2"), Some(&OptionValue::Int(2)));
	assert_eq!(merged.get("option3"), Some(&OptionValue::Int(3)));
	assert_eq!(merged.get("option4"), Some(&OptionValue::Int(2)));
	assert_eq!(merged.get("option5"), Some(&OptionValue::Int(3)));
	assert!(!merged.is_abstract());
}

#[test]
fn test_concrete_class_with_member_passes() {
	let mut hierarchy = Hierarchy::new();
	let base = install_run_family(&mut hierarchy);

	let child = hierarchy
		.define(ClassDecl::new("Child").base(base).attribute("run"))
		.unwrap();
	assert!(!hierarchy.merged(child).unwrap().is_abstract());
}

#[test]
fn test_abstract_class_is_exempt_from_validation() {
	let mut hierarchy = Hierarchy::new();
	let base = install_run_family(&mut hierarchy);

	let child = hierarchy
		.define(
			ClassDecl::new("Child")
				.base(base)
				.block(OptionBlock::new().set_abstract(true)),
		)
		.unwrap();
	assert!(hierarchy.merged(child).unwrap().is_abstract());
}

#[test]
fn test_invalid_class_aborts_with_named_requirement() {
	let mut hierarchy = Hierarchy::new();
	let base = install_run_family(&mut hierarchy);

	let before = hierarchy.len();
	let result = hierarchy.define(ClassDecl::new("Child").base(base));
	assert_eq!(
		result.unwrap_err().to_string(),
		"Child: member `run` is not defined"
	);
	assert_eq!(hierarchy.len(), before);
}

// ============================================================================
// TOML blocks feeding class definitions
// ============================================================================

#[test]
fn test_parsed_block_drives_definition() {
	let mut hierarchy = Hierarchy::new();
	let base = install_run_family(&mut hierarchy);

	let path = Path::new("inline.toml");
	let abstract_block = parse_block_str("abstract = true\nretries = 3\n", path).unwrap();
	let parent = hierarchy
		.define(ClassDecl::new("Parent").base(base).block(abstract_block))
		.unwrap();

	let child_block = parse_block_str("label = \"leaf\"\n", path).unwrap();
	let child = hierarchy
		.define(
			ClassDecl::new("Child")
				.base(parent)
				.attribute("run")
				.block(child_block),
		)
		.unwrap();

	let merged = hierarchy.merged(child).unwrap();
	assert!(!merged.is_abstract());
	assert_eq!(merged.get("retries"), Some(&OptionValue::Int(3)));
	assert_eq!(
		merged.get("label"),
		Some(&OptionValue::Str("leaf".to_string()))
	);
}

// ============================================================================
// Observer/Subject end to end
// ============================================================================

struct Scaled {
	factor: i64,
	total: Rc<Cell<i64>>,
}

impl Observer<i64> for Scaled {
	fn update(&mut self, payload: &i64) {
		self.total.set(self.total.get() + payload * self.factor);
	}
}

#[test]
fn test_counter_subject_scenario() {
	let mut hierarchy = Hierarchy::new();
	let family = ObserverFamily::install(&mut hierarchy).unwrap();

	let counter = hierarchy
		.define(
			ClassDecl::new("CounterObserver")
				.base(family.observer)
				.block(OptionBlock::new().set_abstract(true)),
		)
		.unwrap();

	let double_total = Rc::new(Cell::new(0));
	let double = {
		let total = Rc::clone(&double_total);
		ObserverClass::define(
			&mut hierarchy,
			&family,
			"DoubleObserver",
			&[counter],
			None,
			move || Scaled {
				factor: 2,
				total: Rc::clone(&total),
			},
		)
		.unwrap()
	};
	let triple_total = Rc::new(Cell::new(0));
	let triple = {
		let total = Rc::clone(&triple_total);
		ObserverClass::define(
			&mut hierarchy,
			&family,
			"TripleObserver",
			&[counter],
			None,
			move || Scaled {
				factor: 3,
				total: Rc::clone(&total),
			},
		)
		.unwrap()
	};

	let subject_class = SubjectClass::define(
		&mut hierarchy,
		&family,
		"CounterSubject",
		&[],
		Some(OptionBlock::new().set("observer", OptionValue::Class(counter))),
	)
	.unwrap();
	let mut subject = subject_class.instantiate::<i64>();

	let double_ref = subject.register(double.instantiate()).unwrap();
	subject.register(triple.instantiate()).unwrap();
	subject.notify(&3);

	assert_eq!(double_total.get(), 6);
	assert_eq!(triple_total.get(), 9);

	subject.unregister(double_ref).unwrap();
	subject.notify(&3);

	assert_eq!(double_total.get(), 6);
	assert_eq!(triple_total.get(), 18);
}

#[test]
fn test_callback_captures_side_effect_once_per_notification() {
	let mut hierarchy = Hierarchy::new();
	let family = ObserverFamily::install(&mut hierarchy).unwrap();

	let subject_class = SubjectClass::define(
		&mut hierarchy,
		&family,
		"AnySubject",
		&[],
		Some(OptionBlock::new().set("observer", OptionValue::Class(family.observer))),
	)
	.unwrap();
	let mut subject = subject_class.instantiate::<i64>();

	let calls = Rc::new(Cell::new(0));
	let callback = {
		let calls = Rc::clone(&calls);
		Callback::new(move |payload: &i64| {
			calls.set(calls.get() + payload);
		})
	};

	subject.register(callback.clone()).unwrap();
	// A second registration of the same callback must not double-notify.
	subject.register(callback).unwrap();
	assert_eq!(subject.len(), 1);

	subject.notify(&5);
	assert_eq!(calls.get(), 5);
}

// ============================================================================
// Step/Pipeline end to end
// ============================================================================

struct Contribute {
	value: i64,
}

impl Step<BTreeSet<i64>, i64> for Contribute {
	fn run(&mut self, offset: &i64) -> Option<BTreeSet<i64>> {
		Some(BTreeSet::from([self.value + offset]))
	}
}

#[test]
fn test_set_pipeline_scenario() {
	let mut hierarchy = Hierarchy::new();
	let family = PipelineFamily::install(&mut hierarchy).unwrap();

	let set_step = hierarchy
		.define(
			ClassDecl::new("SetStep")
				.base(family.step)
				.block(OptionBlock::new().set_abstract(true)),
		)
		.unwrap();

	let step1: StepClass<BTreeSet<i64>, i64> = StepClass::define(
		&mut hierarchy,
		&family,
		"Step1",
		&[set_step],
		None,
		|| Contribute { value: 1 },
	)
	.unwrap();
	let step2: StepClass<BTreeSet<i64>, i64> = StepClass::define(
		&mut hierarchy,
		&family,
		"Step2",
		&[set_step],
		None,
		|| Contribute { value: 2 },
	)
	.unwrap();

	let pipeline_class: PipelineClass<BTreeSet<i64>, i64> = PipelineClass::define(
		&mut hierarchy,
		&family,
		"SetPipeline",
		&[],
		Some(OptionBlock::new().set("step", OptionValue::Class(set_step))),
		BTreeSet::new,
	)
	.unwrap();

	// No steps: the initial accumulator comes back untouched.
	let mut empty = pipeline_class.instantiate();
	assert_eq!(empty.run(&0), BTreeSet::new());

	let mut pipeline = pipeline_class.instantiate();
	pipeline.register(&step1).unwrap();
	pipeline.register(&step2).unwrap();

	assert_eq!(pipeline.run(&0), BTreeSet::from([1, 2]));
	assert_eq!(pipeline.run(&10), BTreeSet::from([11, 12]));
}

#[test]
fn test_pipeline_rejects_step_outside_declared_capability() {
	let mut hierarchy = Hierarchy::new();
	let family = PipelineFamily::install(&mut hierarchy).unwrap();

	let set_step = hierarchy
		.define(
			ClassDecl::new("SetStep")
				.base(family.step)
				.block(OptionBlock::new().set_abstract(true)),
		)
		.unwrap();
	let other: StepClass<BTreeSet<i64>, i64> = StepClass::define(
		&mut hierarchy,
		&family,
		"OtherStep",
		&[],
		None,
		|| Contribute { value: 3 },
	)
	.unwrap();

	let pipeline_class: PipelineClass<BTreeSet<i64>, i64> = PipelineClass::define(
		&mut hierarchy,
		&family,
		"SetPipeline",
		&[],
		Some(OptionBlock::new().set("step", OptionValue::Class(set_step))),
		BTreeSet::new,
	)
	.unwrap();
	let mut pipeline = pipeline_class.instantiate();

	let result = pipeline.register(&other);
	assert_eq!(
		result.unwrap_err().to_string(),
		"OtherStep is not a subclass of SetStep"
	);
	assert!(pipeline.is_empty());
}

// ============================================================================
// Shared hierarchy across both families
// ============================================================================

#[test]
fn test_families_share_one_hierarchy() {
	let mut hierarchy = Hierarchy::new();
	let observers = ObserverFamily::install(&mut hierarchy).unwrap();
	let pipelines = PipelineFamily::install(&mut hierarchy).unwrap();

	// A subject option pointing at a step class fails the capability check.
	let result = SubjectClass::define(
		&mut hierarchy,
		&observers,
		"Confused",
		&[],
		Some(OptionBlock::new().set("observer", OptionValue::Class(pipelines.step))),
	);
	assert!(matches!(
		result,
		Err(StrataError::OptionNotSubclass { .. })
	));
}
