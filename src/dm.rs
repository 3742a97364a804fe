//! Data management: hubs, projects, folders, items, and versions.
//!
//! Responses follow JSON:API, so they decode into the generic [`JsonApiObject`] and
//! [`JsonApiArray`] envelopes rather than per-endpoint types.

pub mod folders;
pub mod hubs;

pub use folders::*;
pub use hubs::*;

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// One JSON:API resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonApiResource {
	/// Resource type, e.g. `hubs` or `folders`.
	#[serde(rename = "type")]
	pub kind: String,
	/// Resource id.
	pub id: String,
	/// Attribute object; its shape depends on the resource type.
	pub attributes: Value,
	/// Relationship object.
	#[serde(skip_serializing_if = "Value::is_null")]
	pub relationships: Value,
	/// Resource links.
	#[serde(skip_serializing_if = "Value::is_null")]
	pub links: Value,
}
impl JsonApiResource {
	/// Reads a string attribute such as `name` or `displayName`.
	pub fn attribute_str(&self, name: &str) -> Option<&str> {
		self.attributes.get(name).and_then(Value::as_str)
	}

	/// Reads `attributes.extension.type`.
	pub fn extension_type(&self) -> Option<&str> {
		self.attributes.pointer("/extension/type").and_then(Value::as_str)
	}
}

/// JSON:API document whose `data` is a single resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonApiObject {
	/// JSON:API version block.
	#[serde(skip_serializing_if = "Value::is_null")]
	pub jsonapi: Value,
	/// Document links.
	#[serde(skip_serializing_if = "Value::is_null")]
	pub links: Value,
	/// Primary resource.
	pub data: JsonApiResource,
	/// Side-loaded resources.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub included: Vec<JsonApiResource>,
	/// Non-fatal warnings reported by the service.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<Value>,
}

/// JSON:API document whose `data` is a list of resources.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonApiArray {
	/// JSON:API version block.
	#[serde(skip_serializing_if = "Value::is_null")]
	pub jsonapi: Value,
	/// Document links, including `next` when more pages exist.
	#[serde(skip_serializing_if = "Value::is_null")]
	pub links: Value,
	/// Primary resources.
	pub data: Vec<JsonApiResource>,
	/// Side-loaded resources.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub included: Vec<JsonApiResource>,
	/// Non-fatal warnings reported by the service.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<Value>,
}
impl JsonApiArray {
	/// `links.next.href`, when another page exists.
	pub fn next_page(&self) -> Option<&str> {
		self.links.pointer("/next/href").and_then(Value::as_str)
	}
}
