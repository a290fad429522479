//! The `hashicups_coffees` data source.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::models::{CoffeesState, Coffee};
use crate::provider::ProviderData;
use crate::resource::DataSource;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};

/// Type name of the coffees data source.
pub const TYPE_NAME: &str = "hashicups_coffees";

/// Summary of the diagnostic raised when the menu cannot be fetched.
pub const READ_ERROR_SUMMARY: &str = "Error retrieving coffee";

/// Attributes of a coffee record with the given `id` attribute; everything
/// else is computed.
pub(crate) fn coffee_attributes(id: Attribute) -> Vec<(&'static str, Attribute)> {
    vec![
        ("id", id),
        ("name", Attribute::computed_string()),
        ("teaser", Attribute::computed_string()),
        ("description", Attribute::computed_string()),
        ("price", Attribute::computed_number()),
        ("image", Attribute::computed_string()),
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
    ]
}

/// Lists every coffee on the menu.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoffeesDataSource;

#[async_trait::async_trait]
impl DataSource for CoffeesDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("The full HashiCups menu.")
            .with_attribute(
                "coffees",
                Attribute::list_nested(
                    AttributeFlags::computed(),
                    coffee_attributes(Attribute::computed_number()),
                ),
            )
    }

    #[instrument(skip_all, name = "coffees.read")]
    async fn read(&self, data: &ProviderData, _config: Value) -> Result<Value, ProviderError> {
        let client = data.client()?;
        let coffees = client
            .get_coffees()
            .await
            .map_err(|e| ProviderError::api(READ_ERROR_SUMMARY, e.to_string()))?;

        let state = CoffeesState {
            coffees: coffees.iter().map(Coffee::from).collect(),
        };
        let value = serde_json::to_value(&state)?;
        debug!(coffees = state.coffees.len(), state = %value, "Read coffees");
        Ok(value)
    }
}
