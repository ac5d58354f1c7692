use crate::error::{Result, StrataError};
use crate::meta::block::{OptionBlock, OptionValue};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Raw TOML form of an option block.
#[derive(Debug, Deserialize)]
struct RawBlock {
	#[serde(default, rename = "abstract")]
	abstract_flag: Option<bool>,

	#[serde(flatten)]
	options: BTreeMap<String, toml::Value>,
}

/// Parse an option block from a file.
pub fn parse_block_file(path: &Path) -> Result<OptionBlock> {
	let content = std::fs::read_to_string(path).map_err(|source| StrataError::BlockReadError {
		path: path.to_path_buf(),
		source,
	})?;

	parse_block_str(&content, path)
}

/// Parse an option block from a TOML string (useful for testing).
///
/// Scalar values map onto [`OptionValue`]; arrays, tables, and datetimes
/// are rejected. The `abstract` key maps onto the block's explicit flag
/// and must be a boolean. Class-valued options cannot be expressed in
/// TOML; set those programmatically after parsing.
pub fn parse_block_str(content: &str, path: &Path) -> Result<OptionBlock> {
	let raw: RawBlock = toml::from_str(content).map_err(|source| StrataError::BlockParseError {
		path: path.to_path_buf(),
		source,
	})?;

	let mut block = OptionBlock {
		abstract_flag: raw.abstract_flag,
		options: BTreeMap::new(),
	};
	for (name, value) in raw.options {
		let converted = convert_value(&name, value)?;
		block.options.insert(name, converted);
	}

	// Validate the parsed option names
	block.validate()?;

	Ok(block)
}

fn convert_value(name: &str, value: toml::Value) -> Result<OptionValue> {
	match value {
		toml::Value::Boolean(flag) => Ok(OptionValue::Bool(flag)),
		toml::Value::Integer(value) => Ok(OptionValue::Int(value)),
		toml::Value::Float(value) => Ok(OptionValue::Float(value)),
		toml::Value::String(value) => Ok(OptionValue::Str(value)),
		other => Err(StrataError::UnsupportedOptionValue {
			name: name.to_string(),
			kind: value_kind(&other),
		}),
	}
}

fn value_kind(value: &toml::Value) -> &'static str {
	match value {
		toml::Value::Boolean(_) => "boolean",
		toml::Value::Integer(_) => "integer",
		toml::Value::Float(_) => "float",
		toml::Value::String(_) => "string",
		toml::Value::Datetime(_) => "datetime",
		toml::Value::Array(_) => "array",
		toml::Value::Table(_) => "table",
	}
}
