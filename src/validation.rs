//! Schema validation helpers.
//!
//! Checks a `serde_json::Value` against a [`Schema`] before the provider acts
//! on it, producing one diagnostic per problem with the attribute path
//! (`items.0.coffee.id`) attached.
//!
//! # Example
//!
//! ```
//! use hashicups_provider::schema::{Attribute, AttributeFlags, Schema};
//! use hashicups_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0().with_attribute(
//!     "items",
//!     Attribute::list_nested(
//!         AttributeFlags::required(),
//!         [("quantity", Attribute::required_number())],
//!     ),
//! );
//!
//! assert!(validate(&schema, &json!({"items": [{"quantity": 2}]})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"items": [{"quantity": "two"}]}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("items.0.quantity".to_string()));
//! ```

use std::collections::HashMap;

use serde_json::Value;

use crate::schema::{
    Attribute, AttributeKind, AttributeType, Diagnostic, NestedAttributes, NestingMode, Schema,
};

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Nested attributes are validated recursively
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_object(&schema.attributes, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_object(
    attributes: &HashMap<String, Attribute>,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let obj = match value {
        Value::Object(map) => map,
        // Nothing to check; absence of required attributes is the parent's call.
        Value::Null => return,
        _ => {
            diagnostics.push(with_path(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
                path,
            ));
            return;
        }
    };

    // Sorted so diagnostics come out in a stable order.
    let mut names: Vec<&String> = attributes.keys().collect();
    names.sort();

    for name in names {
        let attr_path = join_path(path, name);
        validate_attribute(&attributes[name], obj.get(name), &attr_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => match &attr.kind {
            AttributeKind::Typed(attr_type) => validate_type(attr_type, v, path, diagnostics),
            AttributeKind::Nested(nested) => validate_nested(nested, v, path, diagnostics),
        },
    }
}

fn validate_nested(
    nested: &NestedAttributes,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match nested.nesting_mode {
        NestingMode::Single => validate_object(&nested.attributes, value, path, diagnostics),
        NestingMode::List => match value.as_array() {
            Some(elements) => {
                for (i, element) in elements.iter().enumerate() {
                    let element_path = format!("{}.{}", path, i);
                    validate_object(&nested.attributes, element, &element_path, diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "list", value)),
        },
    }
}

fn validate_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Number => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "number", value));
            }
        }
        AttributeType::List(element_type) => match value.as_array() {
            Some(elements) => {
                for (i, element) in elements.iter().enumerate() {
                    let element_path = format!("{}.{}", path, i);
                    validate_type(element_type, element, &element_path, diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(obj) => {
                // Object members carry no flags, so only present members are checked.
                for (name, member_type) in attrs {
                    if let Some(member) = obj.get(name) {
                        validate_type(member_type, member, &join_path(path, name), diagnostics);
                    }
                }
            }
            None => diagnostics.push(type_error(path, "object", value)),
        },
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn with_path(diagnostic: Diagnostic, path: &str) -> Diagnostic {
    if path.is_empty() {
        diagnostic
    } else {
        diagnostic.with_attribute(path)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, value: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(value)
        ))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeFlags;
    use serde_json::json;

    fn order_schema() -> Schema {
        let coffee = Attribute::single_nested(
            AttributeFlags::required(),
            [
                ("id", Attribute::required_number()),
                ("name", Attribute::computed_string()),
                (
                    "ingredients",
                    Attribute::new(
                        AttributeType::list(AttributeType::object([(
                            "ingredient_id",
                            AttributeType::Number,
                        )])),
                        AttributeFlags::computed(),
                    ),
                ),
            ],
        );
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "items",
                Attribute::list_nested(
                    AttributeFlags::required(),
                    [
                        ("quantity", Attribute::required_number()),
                        ("coffee", coffee),
                    ],
                ),
            )
            .with_attribute("note", Attribute::optional_string())
    }

    #[test]
    fn test_valid_order_plan() {
        let plan = json!({
            "id": null,
            "items": [
                {"quantity": 2, "coffee": {"id": 3}},
                {"quantity": 1, "coffee": {"id": 1, "name": null}}
            ]
        });
        assert!(validate(&order_schema(), &plan).is_empty());
        assert!(is_valid(&order_schema(), &plan));
    }

    #[test]
    fn test_missing_required_top_level() {
        let diagnostics = validate(&order_schema(), &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("items".to_string()));
        assert!(diagnostics[0].summary.contains("Missing required"));
    }

    #[test]
    fn test_missing_required_nested() {
        let diagnostics = validate(
            &order_schema(),
            &json!({"items": [{"quantity": 2, "coffee": {}}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("items.0.coffee.id".to_string())
        );
    }

    #[test]
    fn test_wrong_types() {
        let diagnostics = validate(
            &order_schema(),
            &json!({"items": [{"quantity": "two", "coffee": {"id": 3}}], "note": 5}),
        );
        let paths: Vec<String> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.clone())
            .collect();
        assert_eq!(paths, vec!["items.0.quantity", "note"]);
    }

    #[test]
    fn test_list_nested_requires_array() {
        let diagnostics = validate(&order_schema(), &json!({"items": {"quantity": 1}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].detail, Some("Expected list, got object".to_string()));
    }

    #[test]
    fn test_single_nested_requires_object() {
        let diagnostics = validate(
            &order_schema(),
            &json!({"items": [{"quantity": 1, "coffee": 3}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected object");
        assert_eq!(diagnostics[0].attribute, Some("items.0.coffee".to_string()));
    }

    #[test]
    fn test_computed_attributes_are_not_checked() {
        let plan = json!({
            "id": 42,
            "items": [{"quantity": 1, "coffee": {"id": 3, "name": 7, "ingredients": "x"}}]
        });
        assert!(validate(&order_schema(), &plan).is_empty());
    }

    #[test]
    fn test_object_type_members() {
        let schema = Schema::v0().with_attribute(
            "ingredients",
            Attribute::new(
                AttributeType::list(AttributeType::object([(
                    "ingredient_id",
                    AttributeType::Number,
                )])),
                AttributeFlags::optional(),
            ),
        );
        let diagnostics = validate(
            &schema,
            &json!({"ingredients": [{"ingredient_id": 1}, {"ingredient_id": "two"}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("ingredients.1.ingredient_id".to_string())
        );
    }

    #[test]
    fn test_root_not_object() {
        let diagnostics = validate(&order_schema(), &json!([1, 2]));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected object");
        assert!(diagnostics[0].attribute.is_none());
    }

    #[test]
    fn test_validate_result_helper() {
        assert!(validate_result(&order_schema(), &json!({"items": []})).is_ok());
        let err = validate_result(&order_schema(), &json!({"items": null})).unwrap_err();
        assert_eq!(err.len(), 1);
    }
}
