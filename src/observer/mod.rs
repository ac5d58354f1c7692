//! Observer/Subject family built on the option-merging hierarchy.
//!
//! This module handles:
//! - Concrete observer classes with an `update` behavior
//! - Plain-callback observers
//! - Subjects with an identity-keyed, unordered listener registry
//!
//! A subject's option block declares which observer class it accepts via
//! the `observer` option; the family validation hook enforces that the
//! option names a subclass of the `Observer` root. Notification order is
//! explicitly unspecified: the registry is a set keyed by handle identity.

use crate::error::{Result, StrataError};
use crate::meta::block::OptionBlock;
use crate::meta::hierarchy::{ClassDecl, ClassId, ClassView, Hierarchy};
use crate::meta::merge::MergedOptions;
use crate::meta::validate::{require_callable, require_option_class};
use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Behavior contract for observer instances.
pub trait Observer<T> {
	fn update(&mut self, payload: &T);
}

/// The two roots of the observer family.
#[derive(Debug, Clone, Copy)]
pub struct ObserverFamily {
	pub observer: ClassId,
	pub subject: ClassId,
}

impl ObserverFamily {
	/// Register the `Observer` and `Subject` roots and their validation
	/// hooks in the hierarchy.
	pub fn install(hierarchy: &mut Hierarchy) -> Result<Self> {
		let observer = hierarchy.root_with_hook(
			"Observer",
			Rc::new(|class: ClassView<'_>| require_callable(&class, "update")),
		)?;
		let subject = hierarchy.root_with_hook(
			"Subject",
			Rc::new(move |class: ClassView<'_>| {
				require_option_class(&class, "observer", observer)
			}),
		)?;

		Ok(ObserverFamily { observer, subject })
	}
}

/// A defined concrete observer class: descriptor plus behavior factory.
pub struct ObserverClass<T> {
	id: ClassId,
	name: Rc<str>,
	ancestry: Rc<[ClassId]>,
	merged: MergedOptions,
	make: Rc<dyn Fn() -> Box<dyn Observer<T>>>,
}

impl<T> Clone for ObserverClass<T> {
	fn clone(&self) -> Self {
		ObserverClass {
			id: self.id,
			name: Rc::clone(&self.name),
			ancestry: Rc::clone(&self.ancestry),
			merged: self.merged.clone(),
			make: Rc::clone(&self.make),
		}
	}
}

impl<T: 'static> ObserverClass<T> {
	/// Define a concrete observer class.
	///
	/// Declares the `update` method member (the factory supplies the
	/// behavior) and validates through the family hook. With no bases the
	/// class derives directly from the `Observer` root.
	pub fn define<F, O>(
		hierarchy: &mut Hierarchy,
		family: &ObserverFamily,
		name: &str,
		bases: &[ClassId],
		block: Option<OptionBlock>,
		make: F,
	) -> Result<Self>
	where
		F: Fn() -> O + 'static,
		O: Observer<T> + 'static,
	{
		let mut decl = ClassDecl::new(name).method("update");
		if bases.is_empty() {
			decl = decl.base(family.observer);
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
		let make: Rc<dyn Fn() -> Box<dyn Observer<T>>> =
			Rc::new(move || Box::new(make()) as Box<dyn Observer<T>>);

		Ok(ObserverClass {
			id,
			name: name.into(),
			ancestry: hierarchy.ancestry(id).into(),
			merged,
			make,
		})
	}
}

impl<T> ObserverClass<T> {
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

	/// Create a new instance with fresh behavior state and its own copy of
	/// the merged options.
	pub fn instantiate(&self) -> ObserverRef<T> {
		ObserverRef(Rc::new(RefCell::new(ObserverState {
			class: self.id,
			name: Rc::clone(&self.name),
			ancestry: Rc::clone(&self.ancestry),
			options: self.merged.clone(),
			behavior: (self.make)(),
		})))
	}
}

struct ObserverState<T> {
	class: ClassId,
	name: Rc<str>,
	ancestry: Rc<[ClassId]>,
	options: MergedOptions,
	behavior: Box<dyn Observer<T>>,
}

/// Shared handle to one observer instance.
///
/// Equality and hashing are by handle identity: two instances of the same
/// class with identical state are distinct registry entries, and clones of
/// the same handle are the same entry.
pub struct ObserverRef<T>(Rc<RefCell<ObserverState<T>>>);

impl<T> Clone for ObserverRef<T> {
	fn clone(&self) -> Self {
		ObserverRef(Rc::clone(&self.0))
	}
}

impl<T> ObserverRef<T> {
	/// Drive the instance's behavior with a payload.
	pub fn update(&self, payload: &T) {
		self.0.borrow_mut().behavior.update(payload);
	}

	pub fn class(&self) -> ClassId {
		self.0.borrow().class
	}

	pub fn class_name(&self) -> Rc<str> {
		Rc::clone(&self.0.borrow().name)
	}

	/// This instance's own copy of the merged options.
	pub fn options(&self) -> Ref<'_, MergedOptions> {
		Ref::map(self.0.borrow(), |state| &state.options)
	}

	/// Whether this instance's class is `base` or a subclass of it.
	pub fn is_instance_of(&self, base: ClassId) -> bool {
		self.0.borrow().ancestry.contains(&base)
	}
}

impl<T> std::fmt::Debug for ObserverRef<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ObserverRef")
			.field("class", &self.0.borrow().name)
			.field("ptr", &Rc::as_ptr(&self.0))
			.finish()
	}
}

impl<T> PartialEq for ObserverRef<T> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl<T> Eq for ObserverRef<T> {}

impl<T> Hash for ObserverRef<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		(Rc::as_ptr(&self.0) as usize).hash(state);
	}
}

/// A plain-callback observer, identity-keyed like [`ObserverRef`].
///
/// Callbacks bypass the subject's capability check; they are the explicit
/// "bare function" variant of the registration sum type.
pub struct Callback<T>(Rc<RefCell<dyn FnMut(&T)>>);

impl<T> Clone for Callback<T> {
	fn clone(&self) -> Self {
		Callback(Rc::clone(&self.0))
	}
}

impl<T: 'static> Callback<T> {
	pub fn new(callback: impl FnMut(&T) + 'static) -> Self {
		Callback(Rc::new(RefCell::new(callback)))
	}
}

impl<T> Callback<T> {
	pub fn call(&self, payload: &T) {
		(self.0.borrow_mut())(payload);
	}
}

impl<T> std::fmt::Debug for Callback<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Callback")
			.field(&(Rc::as_ptr(&self.0) as *const ()))
			.finish()
	}
}

impl<T> PartialEq for Callback<T> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl<T> Eq for Callback<T> {}

impl<T> Hash for Callback<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		(Rc::as_ptr(&self.0) as *const () as usize).hash(state);
	}
}

/// Anything a subject can notify: an observer instance or a bare callback.
pub enum Listener<T> {
	Observer(ObserverRef<T>),
	Callback(Callback<T>),
}

impl<T> Listener<T> {
	pub fn call(&self, payload: &T) {
		match self {
			Listener::Observer(observer) => observer.update(payload),
			Listener::Callback(callback) => callback.call(payload),
		}
	}
}

impl<T> std::fmt::Debug for Listener<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Listener::Observer(observer) => observer.fmt(f),
			Listener::Callback(callback) => callback.fmt(f),
		}
	}
}

impl<T> Clone for Listener<T> {
	fn clone(&self) -> Self {
		match self {
			Listener::Observer(observer) => Listener::Observer(observer.clone()),
			Listener::Callback(callback) => Listener::Callback(callback.clone()),
		}
	}
}

impl<T> PartialEq for Listener<T> {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Listener::Observer(a), Listener::Observer(b)) => a == b,
			(Listener::Callback(a), Listener::Callback(b)) => a == b,
			_ => false,
		}
	}
}

impl<T> Eq for Listener<T> {}

impl<T> Hash for Listener<T> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::mem::discriminant(self).hash(state);
		match self {
			Listener::Observer(observer) => observer.hash(state),
			Listener::Callback(callback) => callback.hash(state),
		}
	}
}

impl<T> From<ObserverRef<T>> for Listener<T> {
	fn from(observer: ObserverRef<T>) -> Self {
		Listener::Observer(observer)
	}
}

impl<T> From<Callback<T>> for Listener<T> {
	fn from(callback: Callback<T>) -> Self {
		Listener::Callback(callback)
	}
}

/// A defined subject class with its accepted observer capability resolved.
#[derive(Clone, Debug)]
pub struct SubjectClass {
	id: ClassId,
	name: Rc<str>,
	merged: MergedOptions,
	required: Option<(ClassId, Rc<str>)>,
}

impl SubjectClass {
	/// Define a subject class. With no bases the class derives directly
	/// from the `Subject` root.
	///
	/// Concrete classes are validated by the family hook (`observer`
	/// option present and a subclass of `Observer`); abstract classes may
	/// leave the option unset, in which case registration of observer
	/// instances fails until a subclass declares it.
	pub fn define(
		hierarchy: &mut Hierarchy,
		family: &ObserverFamily,
		name: &str,
		bases: &[ClassId],
		block: Option<OptionBlock>,
	) -> Result<Self> {
		let mut decl = ClassDecl::new(name);
		if bases.is_empty() {
			decl = decl.base(family.subject);
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
			.get("observer")
			.and_then(|value| value.as_class())
			.map(|class| {
				let class_name: Rc<str> = hierarchy
					.class_name(class)
					.unwrap_or("<unknown>")
					.into();
				(class, class_name)
			});

		Ok(SubjectClass {
			id,
			name: name.into(),
			merged,
			required,
		})
	}

	pub fn id(&self) -> ClassId {
		self.id
	}

	pub fn options(&self) -> &MergedOptions {
		&self.merged
	}

	/// Create a subject instance with an empty registry and its own copy
	/// of the merged options.
	pub fn instantiate<T>(&self) -> Subject<T> {
		Subject {
			class: self.id,
			name: Rc::clone(&self.name),
			options: self.merged.clone(),
			required: self.required.clone(),
			observers: HashSet::new(),
		}
	}
}

/// A subject instance: an unordered, duplicate-free listener registry.
pub struct Subject<T> {
	class: ClassId,
	name: Rc<str>,
	options: MergedOptions,
	required: Option<(ClassId, Rc<str>)>,
	observers: HashSet<Listener<T>>,
}

impl<T> Subject<T> {
	pub fn class(&self) -> ClassId {
		self.class
	}

	/// This instance's own copy of the merged options.
	pub fn options(&self) -> &MergedOptions {
		&self.options
	}

	/// Register a listener, returning it for later unregistration.
	///
	/// Observer instances must be instances of the class declared by the
	/// `observer` option (subclasses included); on failure the registry is
	/// unchanged. Callbacks bypass the check. Registering a listener that
	/// is already present is a no-op.
	pub fn register(&mut self, listener: impl Into<Listener<T>>) -> Result<Listener<T>> {
		let listener = listener.into();

		if let Listener::Observer(observer) = &listener {
			let (required, required_name) =
				self.required
					.as_ref()
					.ok_or_else(|| StrataError::MissingOption {
						class: self.name.to_string(),
						option: "observer".to_string(),
					})?;
			if !observer.is_instance_of(*required) {
				return Err(StrataError::NotInstance {
					class: observer.class_name().to_string(),
					base: required_name.to_string(),
				});
			}
		}

		self.observers.insert(listener.clone());
		Ok(listener)
	}

	/// Remove a listener by identity. Fails if it was never registered.
	pub fn unregister(&mut self, listener: impl Into<Listener<T>>) -> Result<()> {
		if self.observers.remove(&listener.into()) {
			Ok(())
		} else {
			Err(StrataError::NotRegistered {
				class: self.name.to_string(),
			})
		}
	}

	/// Invoke every registered listener with the same payload.
	///
	/// Iteration order is unspecified.
	pub fn notify(&self, payload: &T) {
		for listener in &self.observers {
			listener.call(payload);
		}
	}

	pub fn contains(&self, listener: &Listener<T>) -> bool {
		self.observers.contains(listener)
	}

	pub fn len(&self) -> usize {
		self.observers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.observers.is_empty()
	}
}
