use crate::meta::block::{OptionBlock, OptionValue};
use std::collections::BTreeMap;

/// The resolved configuration of a class after layering its own block over
/// its ancestors' merged options.
///
/// Computed once at class-definition time and immutable afterwards. Fields
/// are private so the only way to obtain one is through a merge, and every
/// instance of the class clones its own copy from the class-level value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedOptions {
	abstract_flag: bool,
	options: BTreeMap<String, OptionValue>,
}

impl MergedOptions {
	pub fn is_abstract(&self) -> bool {
		self.abstract_flag
	}

	pub fn get(&self, name: &str) -> Option<&OptionValue> {
		self.options.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.options.contains_key(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
		self.options.iter().map(|(name, value)| (name.as_str(), value))
	}

	pub fn len(&self) -> usize {
		self.options.len()
	}

	pub fn is_empty(&self) -> bool {
		self.options.is_empty()
	}
}

/// Merge a class's own block with its immediate bases' merged options.
///
/// Layer order is [own block] then each base left-to-right in declared
/// order; the first layer to define a key wins, so the most derived value
/// shadows everything above it. Bases contribute their *merged* options, so
/// transitive ancestors are already folded in.
///
/// The `abstract` flag is excluded from layering: it comes from the own
/// block if explicitly set there and defaults to `false` otherwise. An
/// abstract base therefore does not make its subclasses abstract.
pub fn merge_options(own: Option<&OptionBlock>, bases: &[&MergedOptions]) -> MergedOptions {
	let mut options = match own {
		Some(block) => block.options.clone(),
		None => BTreeMap::new(),
	};

	for base in bases {
		for (name, value) in &base.options {
			options.entry(name.clone()).or_insert_with(|| value.clone());
		}
	}

	MergedOptions {
		abstract_flag: own.and_then(|block| block.abstract_flag).unwrap_or(false),
		options,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn merged(pairs: &[(&str, i64)]) -> MergedOptions {
		let mut block = OptionBlock::new();
		for (name, value) in pairs {
			block = block.set(*name, OptionValue::Int(*value));
		}
		merge_options(Some(&block), &[])
	}

	#[test]
	fn test_no_block_no_bases() {
		let result = merge_options(None, &[]);
		assert!(!result.is_abstract());
		assert!(result.is_empty());
	}

	#[test]
	fn test_own_block_wins_over_base() {
		let base = merged(&[("a", 1), ("b", 1)]);
		let own = OptionBlock::new().set("a", OptionValue::Int(2));

		let result = merge_options(Some(&own), &[&base]);
		assert_eq!(result.get("a"), Some(&OptionValue::Int(2)));
		assert_eq!(result.get("b"), Some(&OptionValue::Int(1)));
	}

	#[test]
	fn test_earlier_base_wins_over_later() {
		let first = merged(&[("a", 1)]);
		let second = merged(&[("a", 2), ("b", 2)]);

		let result = merge_options(None, &[&first, &second]);
		assert_eq!(result.get("a"), Some(&OptionValue::Int(1)));
		assert_eq!(result.get("b"), Some(&OptionValue::Int(2)));
	}

	#[test]
	fn test_union_of_all_keys() {
		let first = merged(&[("a", 1)]);
		let second = merged(&[("b", 2)]);
		let own = OptionBlock::new().set("c", OptionValue::Int(3));

		let result = merge_options(Some(&own), &[&first, &second]);
		assert_eq!(result.len(), 3);
		assert!(result.contains("a"));
		assert!(result.contains("b"));
		assert!(result.contains("c"));
	}

	#[test]
	fn test_abstract_from_own_block_only() {
		let abstract_base = merge_options(Some(&OptionBlock::new().set_abstract(true)), &[]);
		assert!(abstract_base.is_abstract());

		// A subclass with no block of its own is concrete again.
		let child = merge_options(None, &[&abstract_base]);
		assert!(!child.is_abstract());

		// Same with a block that doesn't mention the flag.
		let block = OptionBlock::new().set("a", OptionValue::Int(1));
		let child = merge_options(Some(&block), &[&abstract_base]);
		assert!(!child.is_abstract());
	}

	#[test]
	fn test_explicit_concrete_flag() {
		let block = OptionBlock::new().set_abstract(false);
		let result = merge_options(Some(&block), &[]);
		assert!(!result.is_abstract());
	}
}
