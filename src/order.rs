//! The `hashicups_order` resource.
//!
//! Orders can be created and read. The API has no way to change or cancel an
//! order, so update and delete only touch local state.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::client::NewOrderItem;
use crate::coffees::coffee_attributes;
use crate::error::ProviderError;
use crate::models::{order_items, Order};
use crate::provider::ProviderData;
use crate::resource::Resource;
use crate::schema::{Attribute, AttributeFlags, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Type name of the order resource.
pub const TYPE_NAME: &str = "hashicups_order";

/// Summary of the diagnostic raised when the API rejects a new order.
pub const CREATE_ERROR_SUMMARY: &str = "Error creating order";

/// Summary of the diagnostic raised when an order cannot be fetched.
pub const READ_ERROR_SUMMARY: &str = "Error reading order";

/// Format of `last_updated`, e.g. `Monday, 02-Jan-06 15:04:05 UTC`.
pub const LAST_UPDATED_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S %Z";

/// Render a timestamp in the `last_updated` format.
pub fn rfc850_timestamp(at: DateTime<Utc>) -> String {
    at.format(LAST_UPDATED_FORMAT).to_string()
}

// The user-settable part of an order item; computed coffee fields in the
// plan are ignored.
#[derive(Debug, Deserialize)]
struct PlannedItem {
    coffee: PlannedCoffee,
    #[serde(deserialize_with = "whole_number")]
    quantity: i64,
}

#[derive(Debug, Deserialize)]
struct PlannedCoffee {
    #[serde(deserialize_with = "whole_number")]
    id: i64,
}

#[derive(Debug, Deserialize)]
struct PlannedOrder {
    #[serde(default)]
    items: Vec<PlannedItem>,
}

// Hosts may send schema numbers as `3.0`.
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    number
        .as_i64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
        .ok_or_else(|| de::Error::custom(format!("expected a whole number, got {}", number)))
}

// (coffee id, quantity) of every item; the only values a user can change.
fn configured_items(state: &Value) -> Vec<(Option<f64>, Option<f64>)> {
    state
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    (
                        item.pointer("/coffee/id").and_then(Value::as_f64),
                        item.get("quantity").and_then(Value::as_f64),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn items_of(state: &Value) -> Value {
    state.get("items").cloned().unwrap_or(Value::Null)
}

// Copy the attributes only the provider sets from `prior` into `planned`.
fn carry_forward(planned: &mut Value, prior: &Value) {
    if let Some(obj) = planned.as_object_mut() {
        for key in ["id", "last_updated"] {
            if let Some(value) = prior.get(key) {
                obj.insert(key.to_string(), value.clone());
            }
        }
    }
}

/// Places and tracks a coffee order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderResource;

#[async_trait::async_trait]
impl Resource for OrderResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let coffee = Attribute::single_nested(
            AttributeFlags::required(),
            coffee_attributes(Attribute::required_number()),
        );

        Schema::v0()
            .with_description("A coffee order.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("Order ID assigned by the API."),
            )
            .with_attribute(
                "last_updated",
                Attribute::computed_string()
                    .with_description("When the order was last created by the provider."),
            )
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
    }

    async fn plan(
        &self,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        let prior = match prior_state {
            None => {
                let items = items_of(&proposed_state);
                return Ok(PlanResult::in_place(
                    proposed_state,
                    vec![AttributeChange::added("items", items)],
                ));
            }
            Some(prior) => prior,
        };

        if proposed_state.is_null() {
            return Ok(PlanResult::in_place(
                Value::Null,
                vec![AttributeChange::removed("items", items_of(&prior))],
            ));
        }

        if configured_items(&prior) == configured_items(&proposed_state) {
            return Ok(PlanResult::no_change(prior));
        }

        let change = AttributeChange::modified("items", items_of(&prior), items_of(&proposed_state));
        let mut planned = proposed_state;
        carry_forward(&mut planned, &prior);
        Ok(PlanResult::in_place(planned, vec![change]))
    }

    #[instrument(skip_all, name = "order.create")]
    async fn create(
        &self,
        data: &ProviderData,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let client = data.client()?;

        let plan: PlannedOrder = serde_json::from_value(planned_state)?;
        let items: Vec<NewOrderItem> = plan
            .items
            .iter()
            .map(|item| NewOrderItem::new(item.coffee.id, item.quantity))
            .collect();

        let order = client.create_order(&items).await.map_err(|e| {
            ProviderError::api(
                CREATE_ERROR_SUMMARY,
                format!("Could not create order, unexpected error: {}", e),
            )
        })?;

        let state = Order {
            id: order.id.to_string(),
            items: order_items(&order),
            last_updated: rfc850_timestamp(Utc::now()),
        };
        info!(order_id = %state.id, items = state.items.len(), "Created order");
        Ok(serde_json::to_value(&state)?)
    }

    #[instrument(skip_all, name = "order.read")]
    async fn read(
        &self,
        data: &ProviderData,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let client = data.client()?;

        let order_id = current_state
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::InvalidState("order state has no id".to_string()))?
            .to_string();

        let order = client.get_order(&order_id).await.map_err(|e| {
            ProviderError::api(
                READ_ERROR_SUMMARY,
                format!("Could not read orderID {}: {}", order_id, e),
            )
        })?;

        let items = serde_json::to_value(order_items(&order))?;
        let mut state = current_state;
        if let Some(obj) = state.as_object_mut() {
            obj.insert("items".to_string(), items);
        }
        debug!(order_id = %order_id, "Refreshed order");
        Ok(state)
    }

    async fn update(
        &self,
        _data: &ProviderData,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let mut state = planned_state;
        carry_forward(&mut state, &prior_state);
        warn!(
            order_id = ?prior_state.get("id"),
            "Orders cannot be changed through the API; only local state was updated"
        );
        Ok(state)
    }

    async fn delete(
        &self,
        _data: &ProviderData,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        warn!(
            order_id = ?current_state.get("id"),
            "Orders cannot be cancelled through the API; removing from state only"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client;
    use crate::price::Price;
    use crate::testing::{api_coffee, MockApi, MockCall};
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    fn packer_order() -> client::Order {
        client::Order {
            id: 42,
            items: vec![client::OrderItem {
                coffee: client::Coffee {
                    price: Price::from(350),
                    ..api_coffee(3, "Packer Spiced Latte", &[1])
                },
                quantity: 2,
            }],
        }
    }

    fn plan() -> Value {
        json!({
            "id": null,
            "last_updated": null,
            "items": [{"quantity": 2, "coffee": {"id": 3, "name": null}}]
        })
    }

    #[test]
    fn test_rfc850_timestamp() {
        let at = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(rfc850_timestamp(at), "Monday, 02-Jan-06 15:04:05 UTC");
    }

    #[test]
    fn test_schema_requires_items_and_coffee_id() {
        let schema = OrderResource.schema();
        assert!(schema.attributes["items"].flags.required);
        assert!(schema.attributes["id"].flags.is_computed_only());
        assert!(schema.attributes["last_updated"].flags.is_computed_only());
        assert!(crate::validation::validate(&schema, &plan()).is_empty());

        let missing_id = json!({"items": [{"quantity": 2, "coffee": {}}]});
        let diagnostics = crate::validation::validate(&schema, &missing_id);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("items.0.coffee.id")
        );
    }

    #[tokio::test]
    async fn test_create_order() {
        let api = Arc::new(MockApi::new().with_created_order(packer_order()));
        let data = ProviderData::new(api.clone());

        let state = OrderResource.create(&data, plan()).await.unwrap();

        assert_eq!(state["id"], json!("42"));
        assert_eq!(state["items"][0]["quantity"], json!(2));
        assert_eq!(state["items"][0]["coffee"]["id"], json!(3));
        assert_eq!(state["items"][0]["coffee"]["name"], json!("Packer Spiced Latte"));
        assert_eq!(state["items"][0]["coffee"]["price"], json!(350));
        assert_eq!(
            state["items"][0]["coffee"]["ingredients"],
            json!([{"ingredient_id": 1}])
        );
        assert!(!state["last_updated"].as_str().unwrap().is_empty());
        assert_eq!(api.calls(MockCall::CreateOrder), 1);
        assert_eq!(api.last_order_request(), Some(vec![NewOrderItem::new(3, 2)]));
    }

    #[tokio::test]
    async fn test_create_accepts_float_numbers() {
        let api = Arc::new(MockApi::new().with_created_order(packer_order()));
        let data = ProviderData::new(api.clone());

        let plan = json!({"items": [{"quantity": 2.0, "coffee": {"id": 3.0}}]});
        OrderResource.create(&data, plan).await.unwrap();
        assert_eq!(api.last_order_request(), Some(vec![NewOrderItem::new(3, 2)]));
    }

    #[tokio::test]
    async fn test_create_rejects_fractional_quantity() {
        let api = Arc::new(MockApi::new());
        let data = ProviderData::new(api.clone());

        let plan = json!({"items": [{"quantity": 1.5, "coffee": {"id": 3}}]});
        let err = OrderResource.create(&data, plan).await.unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_unconfigured() {
        let err = OrderResource
            .create(&ProviderData::unconfigured(), plan())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
    }

    #[tokio::test]
    async fn test_create_api_error() {
        let api = Arc::new(MockApi::new().failing(MockCall::CreateOrder, 400, "unknown coffee"));
        let data = ProviderData::new(api);

        let diagnostic = OrderResource
            .create(&data, plan())
            .await
            .unwrap_err()
            .to_diagnostic();
        assert_eq!(diagnostic.summary, CREATE_ERROR_SUMMARY);
        assert_eq!(
            diagnostic.detail.as_deref(),
            Some("Could not create order, unexpected error: status: 400, body: unknown coffee")
        );
    }

    #[tokio::test]
    async fn test_create_then_read_items_match() {
        let api = Arc::new(MockApi::new().with_created_order(packer_order()));
        let data = ProviderData::new(api.clone());

        let created = OrderResource.create(&data, plan()).await.unwrap();
        let read = OrderResource.read(&data, created.clone()).await.unwrap();

        assert_eq!(read["items"], created["items"]);
        assert_eq!(read["last_updated"], created["last_updated"]);
        assert_eq!(api.calls(MockCall::GetOrder), 1);
    }

    #[tokio::test]
    async fn test_read_overwrites_only_items() {
        let api = Arc::new(MockApi::new().with_order(packer_order()));
        let data = ProviderData::new(api);

        let state = json!({
            "id": "42",
            "last_updated": "Monday, 02-Jan-06 15:04:05 UTC",
            "items": [{"quantity": 9, "coffee": {"id": 1}}]
        });
        let read = OrderResource.read(&data, state).await.unwrap();

        assert_eq!(read["id"], json!("42"));
        assert_eq!(read["last_updated"], json!("Monday, 02-Jan-06 15:04:05 UTC"));
        assert_eq!(read["items"][0]["quantity"], json!(2));
        assert_eq!(read["items"][0]["coffee"]["id"], json!(3));
    }

    #[tokio::test]
    async fn test_read_missing_order() {
        let data = ProviderData::new(Arc::new(MockApi::new()));
        let diagnostic = OrderResource
            .read(&data, json!({"id": "7"}))
            .await
            .unwrap_err()
            .to_diagnostic();
        assert_eq!(diagnostic.summary, READ_ERROR_SUMMARY);
        assert!(diagnostic
            .detail
            .unwrap()
            .starts_with("Could not read orderID 7: status: 404"));
    }

    #[tokio::test]
    async fn test_read_without_id() {
        let api = Arc::new(MockApi::new());
        let data = ProviderData::new(api.clone());
        let err = OrderResource
            .read(&data, json!({"items": []}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidState(_)));
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_computed_attributes() {
        let api = Arc::new(MockApi::new());
        let data = ProviderData::new(api.clone());

        let prior = json!({"id": "42", "last_updated": "then", "items": []});
        let planned = json!({"id": null, "last_updated": null,
                             "items": [{"quantity": 1, "coffee": {"id": 2}}]});
        let state = OrderResource.update(&data, prior, planned).await.unwrap();

        assert_eq!(state["id"], json!("42"));
        assert_eq!(state["last_updated"], json!("then"));
        assert_eq!(state["items"][0]["coffee"]["id"], json!(2));
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_local() {
        let api = Arc::new(MockApi::new());
        let data = ProviderData::new(api.clone());
        OrderResource
            .delete(&data, json!({"id": "42"}))
            .await
            .unwrap();
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_plan_create() {
        let result = OrderResource.plan(None, plan()).await.unwrap();
        assert_eq!(result.planned_state, plan());
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].path, "items");
        assert!(result.changes[0].before.is_none());
        assert!(!result.requires_replace);
    }

    #[tokio::test]
    async fn test_plan_ignores_computed_coffee_fields() {
        let prior = json!({
            "id": "42",
            "last_updated": "then",
            "items": [{"quantity": 2, "coffee": {"id": 3, "name": "Packer Spiced Latte"}}]
        });
        let result = OrderResource
            .plan(Some(prior.clone()), plan())
            .await
            .unwrap();
        assert!(result.changes.is_empty());
        assert_eq!(result.planned_state, prior);
    }

    #[tokio::test]
    async fn test_plan_quantity_change() {
        let prior = json!({
            "id": "42",
            "last_updated": "then",
            "items": [{"quantity": 2, "coffee": {"id": 3}}]
        });
        let proposed = json!({
            "id": null,
            "last_updated": null,
            "items": [{"quantity": 5, "coffee": {"id": 3}}]
        });
        let result = OrderResource.plan(Some(prior), proposed).await.unwrap();

        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].path, "items");
        assert_eq!(result.planned_state["id"], json!("42"));
        assert_eq!(result.planned_state["last_updated"], json!("then"));
        assert_eq!(result.planned_state["items"][0]["quantity"], json!(5));
        assert!(!result.requires_replace);
    }

    #[tokio::test]
    async fn test_plan_destroy() {
        let prior = json!({"id": "42", "items": [{"quantity": 2, "coffee": {"id": 3}}]});
        let result = OrderResource.plan(Some(prior), Value::Null).await.unwrap();
        assert!(result.planned_state.is_null());
        assert_eq!(result.changes.len(), 1);
        assert!(result.changes[0].after.is_none());
    }
}
