//! Exact decimal prices.
//!
//! The API encodes prices as JSON numbers. serde_json is built with
//! `arbitrary_precision`, so a number is read and written as its decimal
//! text and `2.15` stays `2.15` instead of the nearest binary float.

use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, ParseBigDecimalError};
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

/// A coffee price carried as an arbitrary-precision decimal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Price(BigDecimal);

impl Price {
    /// Wrap an existing decimal.
    pub fn new(value: BigDecimal) -> Self {
        Self(value)
    }

    /// The underlying decimal.
    pub fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }
}

impl From<BigDecimal> for Price {
    fn from(value: BigDecimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Price {
    fn from(value: i64) -> Self {
        Self(BigDecimal::from(value))
    }
}

impl FromStr for Price {
    type Err = ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigDecimal::from_str(s.trim()).map(Self)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Whole prices go out without a fraction so `200.00` reads back as `200`.
        let text = if self.0.is_integer() {
            self.0.with_scale(0).to_string()
        } else {
            self.0.to_string()
        };
        Number::from_str(&text)
            .map_err(<S::Error as ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // With `arbitrary_precision` a number keeps its source text.
        match Value::deserialize(deserializer)? {
            Value::Number(number) => Price::from_str(&number.to_string()).map_err(de::Error::custom),
            Value::String(text) => Price::from_str(&text).map_err(de::Error::custom),
            other => Err(de::Error::invalid_type(
                unexpected(&other),
                &"a number or a decimal string",
            )),
        }
    }
}

fn unexpected(value: &Value) -> de::Unexpected<'_> {
    match value {
        Value::Null => de::Unexpected::Unit,
        Value::Bool(b) => de::Unexpected::Bool(*b),
        Value::Array(_) => de::Unexpected::Seq,
        Value::Object(_) => de::Unexpected::Map,
        Value::Number(_) | Value::String(_) => de::Unexpected::Other("decimal"),
    }
}
