//! Schema types for describing provider, resource and data source structure.
//!
//! Schemas describe the attribute names and types the host sees. Nested
//! attributes (a single object or a list of objects) carry their own
//! attribute maps, which is how `items[].coffee` and `coffees[]` are shaped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The type of a primitive or collection attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// An arbitrary-precision number.
    Number,
    /// A list of values of a single type.
    List(Box<AttributeType>),
    /// An object with a fixed set of attributes.
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create an object type from `(name, type)` pairs.
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeType)>,
        K: Into<String>,
    {
        Self::Object(
            attributes
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        )
    }
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider (read-only).
    pub computed: bool,
    /// The attribute is sensitive and should be hidden in logs/UI.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Create flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Create flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Create flags for a computed attribute (read-only, set by provider).
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Whether the provider alone sets this attribute.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// How a group of nested attributes repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NestingMode {
    /// Exactly one nested object.
    #[default]
    Single,
    /// An ordered list of nested objects.
    List,
}

/// A group of attributes nested under a parent attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedAttributes {
    /// Whether the parent holds one object or a list of them.
    pub nesting_mode: NestingMode,
    /// The attributes of each nested object.
    pub attributes: HashMap<String, Attribute>,
}

/// What an attribute holds: a typed value or nested attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// A value of the given type.
    Typed(AttributeType),
    /// Nested attributes with their own flags.
    Nested(NestedAttributes),
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The value shape of the attribute.
    pub kind: AttributeKind,
    /// Flags describing how the attribute can be used.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description of the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Attribute {
    /// Create a new typed attribute with the given flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            kind: AttributeKind::Typed(attr_type),
            flags,
            description: None,
        }
    }

    /// Create an optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Create a computed string attribute.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Create a required number attribute.
    pub fn required_number() -> Self {
        Self::new(AttributeType::Number, AttributeFlags::required())
    }

    /// Create a computed number attribute.
    pub fn computed_number() -> Self {
        Self::new(AttributeType::Number, AttributeFlags::computed())
    }

    /// Create a single nested attribute.
    pub fn single_nested<I, K>(flags: AttributeFlags, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        Self::nested(NestingMode::Single, flags, attributes)
    }

    /// Create a list nested attribute.
    pub fn list_nested<I, K>(flags: AttributeFlags, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        Self::nested(NestingMode::List, flags, attributes)
    }

    fn nested<I, K>(nesting_mode: NestingMode, flags: AttributeFlags, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        Self {
            kind: AttributeKind::Nested(NestedAttributes {
                nesting_mode,
                attributes: attributes
                    .into_iter()
                    .map(|(name, attr)| (name.into(), attr))
                    .collect(),
            }),
            flags,
            description: None,
        }
    }

    /// Set the description for this attribute.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

/// Schema for a resource, a data source or the provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The version of this schema, reported to the host with the schema.
    #[serde(default)]
    pub version: u64,
    /// Top-level attributes.
    #[serde(default)]
    pub attributes: HashMap<String, Attribute>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Schema {
    /// Create a new schema with the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            attributes: HashMap::new(),
            description: None,
        }
    }

    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Set the description for this schema.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Schemas for the provider configuration, resources and data sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Schema for provider configuration.
    #[serde(default)]
    pub provider: Schema,
    /// Schemas for each resource type.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
    /// Schemas for each data source type.
    #[serde(default)]
    pub data_sources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// Create a new empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Add a data source schema.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation but should be addressed.
    Warning,
}

/// A diagnostic message from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this is an error diagnostic.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Whether any diagnostic in the slice is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_type_constructors() {
        let list = AttributeType::list(AttributeType::String);
        assert!(matches!(list, AttributeType::List(_)));

        let object = AttributeType::object([("ingredient_id", AttributeType::Number)]);
        match object {
            AttributeType::Object(attrs) => {
                assert_eq!(attrs.get("ingredient_id"), Some(&AttributeType::Number))
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_flags() {
        let required = AttributeFlags::required();
        assert!(required.required);
        assert!(!required.is_computed_only());

        let computed = AttributeFlags::computed();
        assert!(computed.is_computed_only());

        let optional = AttributeFlags::optional();
        assert!(optional.optional);
        assert!(!optional.is_computed_only());
    }

    #[test]
    fn test_attribute_builders() {
        let attr = Attribute::optional_string()
            .sensitive()
            .with_description("API password");

        assert_eq!(attr.kind, AttributeKind::Typed(AttributeType::String));
        assert!(attr.flags.optional);
        assert!(attr.flags.sensitive);
        assert_eq!(attr.description, Some("API password".to_string()));
    }

    #[test]
    fn test_nested_attribute_builders() {
        let coffee = Attribute::single_nested(
            AttributeFlags::required(),
            [
                ("id", Attribute::required_number()),
                ("name", Attribute::computed_string()),
            ],
        );
        let items = Attribute::list_nested(
            AttributeFlags::required(),
            [
                ("quantity", Attribute::required_number()),
                ("coffee", coffee),
            ],
        );

        match &items.kind {
            AttributeKind::Nested(nested) => {
                assert_eq!(nested.nesting_mode, NestingMode::List);
                assert!(nested.attributes.contains_key("quantity"));
                match &nested.attributes["coffee"].kind {
                    AttributeKind::Nested(inner) => {
                        assert_eq!(inner.nesting_mode, NestingMode::Single);
                        assert!(inner.attributes["id"].flags.required);
                    }
                    other => panic!("expected nested coffee, got {:?}", other),
                }
            }
            other => panic!("expected nested items, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_schema() {
        let provider_schema = ProviderSchema::new()
            .with_provider_config(
                Schema::v0().with_attribute("password", Attribute::optional_string().sensitive()),
            )
            .with_resource(
                "hashicups_order",
                Schema::v0().with_attribute("id", Attribute::computed_string()),
            )
            .with_data_source(
                "hashicups_coffees",
                Schema::v0().with_attribute("coffees", Attribute::computed_string()),
            );

        assert!(provider_schema.provider.attributes.contains_key("password"));
        assert!(provider_schema.resources.contains_key("hashicups_order"));
        assert!(provider_schema.data_sources.contains_key("hashicups_coffees"));
    }

    #[test]
    fn test_diagnostic() {
        let err = Diagnostic::error("Unable to find host")
            .with_detail("Host cannot be an empty string")
            .with_attribute("host");

        assert_eq!(err.severity, DiagnosticSeverity::Error);
        assert_eq!(err.summary, "Unable to find host");
        assert_eq!(err.detail, Some("Host cannot be an empty string".to_string()));
        assert_eq!(err.attribute, Some("host".to_string()));
        assert!(err.is_error());
    }

    #[test]
    fn test_has_errors() {
        assert!(!has_errors(&[Diagnostic::warning("careful")]));
        assert!(has_errors(&[
            Diagnostic::warning("careful"),
            Diagnostic::error("broken")
        ]));
        assert!(!has_errors(&[]));
    }
}
