use crate::error::{Result, StrataError};
use crate::meta::block::{OptionBlock, validate_ident};
use crate::meta::merge::{MergedOptions, merge_options};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Handle to a class descriptor inside a [`Hierarchy`].
///
/// Handles are only meaningful for the hierarchy that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub(crate) usize);

/// Kind of a declared member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
	/// A callable member.
	Method,
	/// A plain value member.
	Attribute,
}

/// Validation hook attached to a family root.
///
/// Invoked with a read-only view of each newly defined concrete class in
/// the family. Returning an error aborts the definition. A closure rather
/// than a fn pointer because capability hooks capture the class they check
/// against.
pub type ValidateHook = Rc<dyn Fn(ClassView<'_>) -> Result<()>>;

/// Declaration of a new class: name, bases in declared order, optional
/// option block, and declared members.
#[derive(Debug, Clone, Default)]
pub struct ClassDecl {
	name: String,
	bases: Vec<ClassId>,
	block: Option<OptionBlock>,
	members: BTreeMap<String, Member>,
}

impl ClassDecl {
	pub fn new(name: impl Into<String>) -> Self {
		ClassDecl {
			name: name.into(),
			..ClassDecl::default()
		}
	}

	/// Append a base. Base order is significant: earlier bases win on
	/// option conflicts, and the first base decides family membership.
	pub fn base(mut self, base: ClassId) -> Self {
		self.bases.push(base);
		self
	}

	pub fn block(mut self, block: OptionBlock) -> Self {
		self.block = Some(block);
		self
	}

	/// Declare a callable member.
	pub fn method(mut self, name: impl Into<String>) -> Self {
		self.members.insert(name.into(), Member::Method);
		self
	}

	/// Declare a plain value member.
	pub fn attribute(mut self, name: impl Into<String>) -> Self {
		self.members.insert(name.into(), Member::Attribute);
		self
	}
}

struct ClassDef {
	name: String,
	bases: Vec<ClassId>,
	root: ClassId,
	members: BTreeMap<String, Member>,
	merged: MergedOptions,
	hook: Option<ValidateHook>,
}

/// Append-only arena of class descriptors.
///
/// A root (a class defined with no bases) anchors a family and may carry a
/// validation hook. Defining a class merges its option block with its
/// bases' merged options and, for concrete classes, runs the family hook;
/// a hook failure removes the descriptor again and leaves the hierarchy as
/// it was.
#[derive(Default)]
pub struct Hierarchy {
	classes: Vec<ClassDef>,
}

impl Hierarchy {
	pub fn new() -> Self {
		Hierarchy::default()
	}

	/// Number of defined classes.
	pub fn len(&self) -> usize {
		self.classes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.classes.is_empty()
	}

	/// Define a family root without a validation hook.
	pub fn root(&mut self, name: &str) -> Result<ClassId> {
		self.define(ClassDecl::new(name))
	}

	/// Define a family root carrying the family's validation hook.
	///
	/// The root itself is never validated; the hook fires for every
	/// concrete class defined below it.
	pub fn root_with_hook(&mut self, name: &str, hook: ValidateHook) -> Result<ClassId> {
		let id = self.define(ClassDecl::new(name))?;
		if let Some(def) = self.classes.get_mut(id.0) {
			def.hook = Some(hook);
		}
		Ok(id)
	}

	/// Define a class.
	///
	/// Performs the merge, attaches the merged options to the descriptor,
	/// and runs the family validation hook unless the class is abstract or
	/// is itself a root. On hook failure the class is not defined.
	pub fn define(&mut self, decl: ClassDecl) -> Result<ClassId> {
		validate_ident(&decl.name)?;
		if let Some(ref block) = decl.block {
			block.validate()?;
		}
		for member in decl.members.keys() {
			validate_ident(member)?;
		}

		let id = ClassId(self.classes.len());

		let mut root = id;
		let merged = {
			let mut bases = Vec::with_capacity(decl.bases.len());
			for (index, base) in decl.bases.iter().enumerate() {
				let def = self.classes.get(base.0).ok_or(StrataError::UnknownClass)?;
				if index == 0 {
					root = def.root;
				}
				bases.push(&def.merged);
			}
			merge_options(decl.block.as_ref(), &bases)
		};

		let concrete = !merged.is_abstract();
		self.classes.push(ClassDef {
			name: decl.name,
			bases: decl.bases,
			root,
			members: decl.members,
			merged,
			hook: None,
		});

		if concrete && root != id {
			let hook = self.classes.get(root.0).and_then(|def| def.hook.clone());
			if let Some(hook) = hook {
				if let Err(err) = hook(ClassView {
					hierarchy: self,
					id,
				}) {
					self.classes.pop();
					return Err(err);
				}
			}
		}

		Ok(id)
	}

	/// Read-only view of a defined class.
	pub fn view(&self, id: ClassId) -> Option<ClassView<'_>> {
		self.classes.get(id.0).map(|_| ClassView {
			hierarchy: self,
			id,
		})
	}

	pub fn class_name(&self, id: ClassId) -> Option<&str> {
		self.classes.get(id.0).map(|def| def.name.as_str())
	}

	/// The class-level merged options attached at definition time.
	pub fn merged(&self, id: ClassId) -> Option<&MergedOptions> {
		self.classes.get(id.0).map(|def| &def.merged)
	}

	/// Reflexive, transitive subclass test.
	pub fn is_subclass(&self, class: ClassId, base: ClassId) -> bool {
		if class == base {
			return true;
		}
		match self.classes.get(class.0) {
			Some(def) => def.bases.iter().any(|&b| self.is_subclass(b, base)),
			None => false,
		}
	}

	/// The class itself plus all transitive bases, preorder, deduplicated.
	pub fn ancestry(&self, id: ClassId) -> Vec<ClassId> {
		let mut out = Vec::new();
		self.collect_ancestry(id, &mut out);
		out
	}

	fn collect_ancestry(&self, id: ClassId, out: &mut Vec<ClassId>) {
		if out.contains(&id) {
			return;
		}
		out.push(id);
		if let Some(def) = self.classes.get(id.0) {
			for &base in &def.bases {
				self.collect_ancestry(base, out);
			}
		}
	}

	fn lookup_member(&self, id: ClassId, name: &str) -> Option<Member> {
		let def = self.classes.get(id.0)?;
		if let Some(&member) = def.members.get(name) {
			return Some(member);
		}
		def.bases
			.iter()
			.find_map(|&base| self.lookup_member(base, name))
	}
}

/// Read-only view of a class handed to validation hooks.
#[derive(Clone, Copy)]
pub struct ClassView<'h> {
	hierarchy: &'h Hierarchy,
	id: ClassId,
}

impl<'h> ClassView<'h> {
	pub fn id(&self) -> ClassId {
		self.id
	}

	pub fn name(&self) -> &'h str {
		self.hierarchy.class_name(self.id).unwrap_or("<unknown>")
	}

	pub fn merged(&self) -> &'h MergedOptions {
		// The view was created for a defined class, but fall back to a
		// shared empty value rather than indexing.
		static EMPTY: std::sync::OnceLock<MergedOptions> = std::sync::OnceLock::new();
		self.hierarchy
			.merged(self.id)
			.unwrap_or_else(|| EMPTY.get_or_init(MergedOptions::default))
	}

	/// Look up a declared member on the class or any of its bases,
	/// depth-first in declared base order.
	pub fn member(&self, name: &str) -> Option<Member> {
		self.hierarchy.lookup_member(self.id, name)
	}

	pub fn hierarchy(&self) -> &'h Hierarchy {
		self.hierarchy
	}
}
