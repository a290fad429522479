//! Wire types of the HashiCups API.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::price::Price;

/// A coffee as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coffee {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub teaser: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ingredients: Vec<Ingredient>,
}

/// An ingredient of a coffee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(rename = "ingredient_id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub unit: String,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub coffee: Coffee,
    pub quantity: i64,
}

/// An order as stored by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<OrderItem>,
}

/// Reference to a coffee by ID, the only part of a coffee an order request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoffeeRef {
    pub id: i64,
}

/// One line of a new order request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub coffee: CoffeeRef,
    pub quantity: i64,
}

impl NewOrderItem {
    pub fn new(coffee_id: i64, quantity: i64) -> Self {
        Self {
            coffee: CoffeeRef { id: coffee_id },
            quantity,
        }
    }
}

// The API encodes empty lists as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_coffee() {
        let coffee: Coffee = serde_json::from_value(json!({
            "id": 1,
            "name": "HCP Aeropress",
            "teaser": "Automation in a cup",
            "description": "",
            "price": 200,
            "image": "/hashicorp.png",
            "ingredients": [{"ingredient_id": 6}, {"ingredient_id": 2}]
        }))
        .unwrap();

        assert_eq!(coffee.id, 1);
        assert_eq!(coffee.name, "HCP Aeropress");
        assert_eq!(coffee.price, Price::from(200));
        let ids: Vec<i64> = coffee.ingredients.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![6, 2]);
    }

    #[test]
    fn test_decode_null_lists() {
        let order: Order = serde_json::from_value(json!({"id": 7, "items": null})).unwrap();
        assert!(order.items.is_empty());

        let coffee: Coffee =
            serde_json::from_value(json!({"id": 3, "ingredients": null})).unwrap();
        assert!(coffee.ingredients.is_empty());
    }

    #[test]
    fn test_encode_new_order_item() {
        let body = serde_json::to_value([NewOrderItem::new(3, 2)]).unwrap();
        assert_eq!(body, json!([{"coffee": {"id": 3}, "quantity": 2}]));
    }
}
