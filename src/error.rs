use std::path::PathBuf;

/// Library-level structured errors for strata.
///
/// Every contract violation is synchronous and carries the offending class,
/// member, or option name so the message identifies exactly which
/// requirement was broken.
#[derive(Debug, thiserror::Error)]
pub enum StrataError {
	#[error("Failed to read option block: {path}")]
	BlockReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse option block: {path}")]
	BlockParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Unsupported value for option `{name}`: {kind} is not a scalar")]
	UnsupportedOptionValue { name: String, kind: &'static str },

	#[error("Invalid identifier: `{name}`")]
	InvalidIdentifier { name: String },

	#[error("Unknown class handle")]
	UnknownClass,

	#[error("{class}: member `{member}` is not defined")]
	MissingMember { class: String, member: String },

	#[error("{class}: member `{member}` is not callable")]
	MemberNotCallable { class: String, member: String },

	#[error("{class}: required option `{option}` is not declared")]
	MissingOption { class: String, option: String },

	#[error("{class}: option `{option}` is not a subclass of {base}")]
	OptionNotSubclass {
		class: String,
		option: String,
		base: String,
	},

	#[error("{class} is not a subclass of {base}")]
	NotSubclass { class: String, base: String },

	#[error("{class} is not an instance of {base}")]
	NotInstance { class: String, base: String },

	#[error("Listener is not registered with {class}")]
	NotRegistered { class: String },
}

/// Result type alias using StrataError.
pub type Result<T> = std::result::Result<T, StrataError>;
