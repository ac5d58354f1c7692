use crate::error::{Result, StrataError};
use crate::meta::hierarchy::ClassId;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A value carried by a single option.
///
/// Class-valued options reference another descriptor in the same hierarchy,
/// typically a capability target (e.g. the observer class a subject accepts).
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(String),
	Class(ClassId),
}

impl OptionValue {
	/// Short name of the value's kind, for error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			OptionValue::Bool(_) => "bool",
			OptionValue::Int(_) => "integer",
			OptionValue::Float(_) => "float",
			OptionValue::Str(_) => "string",
			OptionValue::Class(_) => "class",
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			OptionValue::Bool(flag) => Some(*flag),
			_ => None,
		}
	}

	pub fn as_class(&self) -> Option<ClassId> {
		match self {
			OptionValue::Class(id) => Some(*id),
			_ => None,
		}
	}
}

/// A configuration block declared on a single class.
///
/// Blocks are unordered option maps plus an optional explicit `abstract`
/// flag. The flag is kept out of the option map because it never inherits:
/// a class is abstract only if its own block says so.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionBlock {
	/// Explicit abstract flag, if the block declares one.
	pub abstract_flag: Option<bool>,

	/// Declared options by name.
	pub options: BTreeMap<String, OptionValue>,
}

impl OptionBlock {
	pub fn new() -> Self {
		OptionBlock::default()
	}

	/// Set an option, replacing any previous value for the name.
	pub fn set(mut self, name: impl Into<String>, value: OptionValue) -> Self {
		self.options.insert(name.into(), value);
		self
	}

	/// Mark the block abstract (or explicitly concrete).
	pub fn set_abstract(mut self, flag: bool) -> Self {
		self.abstract_flag = Some(flag);
		self
	}

	pub fn get(&self, name: &str) -> Option<&OptionValue> {
		self.options.get(name)
	}

	pub fn len(&self) -> usize {
		self.options.len()
	}

	pub fn is_empty(&self) -> bool {
		self.options.is_empty()
	}

	/// Validate all option names in this block.
	pub fn validate(&self) -> Result<()> {
		for name in self.options.keys() {
			validate_ident(name)?;
		}
		Ok(())
	}
}

fn ident_regex() -> &'static Regex {
	static IDENT: OnceLock<Regex> = OnceLock::new();
	IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"))
}

/// Check that a name is a plain identifier.
///
/// Option names and class names become member-like lookups and error
/// message fragments, so anything fancier than an identifier is rejected.
pub fn validate_ident(name: &str) -> Result<()> {
	if ident_regex().is_match(name) {
		Ok(())
	} else {
		Err(StrataError::InvalidIdentifier {
			name: name.to_string(),
		})
	}
}
