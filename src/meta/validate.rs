use crate::error::{Result, StrataError};
use crate::meta::block::OptionValue;
use crate::meta::hierarchy::{ClassId, ClassView, Member};

/// Presence check: the class (or an ancestor) declares the named member.
pub fn require_member(class: &ClassView<'_>, name: &str) -> Result<()> {
	match class.member(name) {
		Some(_) => Ok(()),
		None => Err(StrataError::MissingMember {
			class: class.name().to_string(),
			member: name.to_string(),
		}),
	}
}

/// Callable-member check: the named member exists and is a method.
pub fn require_callable(class: &ClassView<'_>, name: &str) -> Result<()> {
	match class.member(name) {
		Some(Member::Method) => Ok(()),
		Some(Member::Attribute) => Err(StrataError::MemberNotCallable {
			class: class.name().to_string(),
			member: name.to_string(),
		}),
		None => Err(StrataError::MissingMember {
			class: class.name().to_string(),
			member: name.to_string(),
		}),
	}
}

/// Presence check: the merged configuration declares the named option.
pub fn require_option(class: &ClassView<'_>, option: &str) -> Result<()> {
	if class.merged().contains(option) {
		Ok(())
	} else {
		Err(StrataError::MissingOption {
			class: class.name().to_string(),
			option: option.to_string(),
		})
	}
}

/// Capability check: the named option must be class-valued and that class
/// must be a subclass of (or equal to) `base`.
pub fn require_option_class(class: &ClassView<'_>, option: &str, base: ClassId) -> Result<()> {
	let value = class
		.merged()
		.get(option)
		.ok_or_else(|| StrataError::MissingOption {
			class: class.name().to_string(),
			option: option.to_string(),
		})?;

	let base_name = class
		.hierarchy()
		.class_name(base)
		.unwrap_or("<unknown>")
		.to_string();

	let target = match value {
		OptionValue::Class(id) => *id,
		_ => {
			return Err(StrataError::OptionNotSubclass {
				class: class.name().to_string(),
				option: option.to_string(),
				base: base_name,
			});
		}
	};

	if class.hierarchy().is_subclass(target, base) {
		Ok(())
	} else {
		Err(StrataError::OptionNotSubclass {
			class: class.name().to_string(),
			option: option.to_string(),
			base: base_name,
		})
	}
}
