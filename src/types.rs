//! Convenience types shared by the provider and its drivers.
//!
//! These types provide a more ergonomic API over the raw protobuf types.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::schema::Diagnostic;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<serde_json::Value>,
    /// The value after the change (None if deleting).
    pub after: Option<serde_json::Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(
        path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: change.before.map(|v| json_bytes(&v)).unwrap_or_default(),
            after: change.after.map(|v| json_bytes(&v)).unwrap_or_default(),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: serde_json::Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result that updates in place.
    pub fn in_place(planned_state: serde_json::Value, changes: Vec<AttributeChange>) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace: false,
        }
    }
}

/// The transport-independent result of one callback: new state plus diagnostics.
///
/// A failed callback carries no state and exactly one error diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResponse<T> {
    /// The state to record, if the callback succeeded.
    pub state: Option<T>,
    /// Warnings and errors to show the user.
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> OperationResponse<T> {
    /// Whether the response carries an error diagnostic.
    pub fn has_errors(&self) -> bool {
        crate::schema::has_errors(&self.diagnostics)
    }
}

impl<T> From<Result<T, ProviderError>> for OperationResponse<T> {
    fn from(result: Result<T, ProviderError>) -> Self {
        match result {
            Ok(state) => Self {
                state: Some(state),
                diagnostics: Vec::new(),
            },
            Err(err) => Self {
                state: None,
                diagnostics: vec![err.to_diagnostic()],
            },
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider supports planning destroy operations.
    pub plan_destroy: bool,
}

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix printed on stdout when the server is ready.
pub const HANDSHAKE_PREFIX: &str = "PROVIDER_PLUGIN";

/// Encode a JSON value for the wire; `Null` becomes empty bytes.
pub(crate) fn json_bytes(value: &serde_json::Value) -> Vec<u8> {
    if value.is_null() {
        return Vec::new();
    }
    serde_json::to_vec(value).unwrap_or_default()
}

/// Decode JSON bytes from the wire; empty or malformed bytes become `Null`.
pub(crate) fn json_value(bytes: &[u8]) -> serde_json::Value {
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or(serde_json::Value::Null)
}
