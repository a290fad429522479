//! State records in the shape of the provider schema.
//!
//! These are what the host stores. They are rebuilt from API responses on
//! every read or create; nothing here is persisted by the provider.

use serde::{Deserialize, Serialize};

use crate::client::models as api;
use crate::price::Price;

/// A coffee as recorded in state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coffee {
    /// API-assigned coffee ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// One-line teaser.
    pub teaser: String,
    /// Long description.
    pub description: String,
    /// Exact price.
    pub price: Price,
    /// Image path.
    pub image: String,
    /// Ingredients in API order.
    pub ingredients: Vec<Ingredient>,
}

/// An ingredient reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// API-assigned ingredient ID.
    #[serde(rename = "ingredient_id")]
    pub id: i64,
}

/// One line of an order in state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Snapshot of the ordered coffee.
    pub coffee: Coffee,
    /// Number of cups.
    pub quantity: i64,
}

/// An order as recorded in state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// API-assigned order ID, stringified.
    pub id: String,
    /// Ordered lines.
    pub items: Vec<OrderItem>,
    /// When the provider last created the order, RFC 850 style.
    pub last_updated: String,
}

/// State of the coffees data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoffeesState {
    /// Every coffee on the menu, in API order.
    pub coffees: Vec<Coffee>,
}

impl From<&api::Ingredient> for Ingredient {
    fn from(ingredient: &api::Ingredient) -> Self {
        Self { id: ingredient.id }
    }
}

// The one mapping from API coffee to state coffee; the data source and
// both order callbacks go through it.
impl From<&api::Coffee> for Coffee {
    fn from(coffee: &api::Coffee) -> Self {
        Self {
            id: coffee.id,
            name: coffee.name.clone(),
            teaser: coffee.teaser.clone(),
            description: coffee.description.clone(),
            price: coffee.price.clone(),
            image: coffee.image.clone(),
            ingredients: coffee.ingredients.iter().map(Ingredient::from).collect(),
        }
    }
}

impl From<&api::OrderItem> for OrderItem {
    fn from(item: &api::OrderItem) -> Self {
        Self {
            coffee: Coffee::from(&item.coffee),
            quantity: item.quantity,
        }
    }
}

/// Map every line of an API order into state shape, keeping order.
pub fn order_items(order: &api::Order) -> Vec<OrderItem> {
    order.items.iter().map(OrderItem::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api_coffee() -> api::Coffee {
        serde_json::from_value(json!({
            "id": 3,
            "name": "Packer Spiced Latte",
            "teaser": "Packed with goodness to spice up your images",
            "description": "",
            "price": 350,
            "image": "/packer.png",
            "ingredients": [
                {"ingredient_id": 1, "name": "Espresso", "quantity": 40, "unit": "ml"},
                {"ingredient_id": 2},
                {"ingredient_id": 4}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_coffee_mapping_copies_every_field() {
        let source = api_coffee();
        let coffee = Coffee::from(&source);

        assert_eq!(coffee.id, 3);
        assert_eq!(coffee.name, "Packer Spiced Latte");
        assert_eq!(coffee.teaser, source.teaser);
        assert_eq!(coffee.description, "");
        assert_eq!(coffee.price, Price::from(350));
        assert_eq!(coffee.image, "/packer.png");
        let ids: Vec<i64> = coffee.ingredients.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn test_coffee_state_shape() {
        let state = serde_json::to_value(Coffee::from(&api_coffee())).unwrap();
        assert_eq!(state["price"], json!(350));
        assert_eq!(
            state["ingredients"],
            json!([{"ingredient_id": 1}, {"ingredient_id": 2}, {"ingredient_id": 4}])
        );
        assert!(state.get("ingredient").is_none());
    }

    #[test]
    fn test_order_items_mapping_is_deterministic() {
        let order = api::Order {
            id: 42,
            items: vec![
                api::OrderItem {
                    coffee: api_coffee(),
                    quantity: 2,
                },
                api::OrderItem {
                    coffee: api::Coffee {
                        id: 1,
                        ingredients: vec![],
                        ..api_coffee()
                    },
                    quantity: 1,
                },
            ],
        };

        let first = order_items(&order);
        let second = order_items(&order.clone());
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].quantity, 2);
        assert_eq!(first[1].coffee.id, 1);
        assert!(first[1].coffee.ingredients.is_empty());
    }
}
