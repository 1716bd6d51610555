use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RecordError;

/// One logged drink, as persisted and exported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrinkRecord {
    pub id: String,
    /// Creation time in epoch milliseconds. Never changes after creation.
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub brand: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub temperature: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sweetness: String,
    #[serde(default)]
    pub calories: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// The user-editable part of a record, submitted by the entry form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub brand: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub temperature: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sweetness: String,
    #[serde(default)]
    pub calories: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl RecordInput {
    pub fn new(kind: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            brand: brand.into(),
            ..Self::default()
        }
    }

    pub fn with_calories(mut self, calories: u32) -> Self {
        self.calories = Some(calories);
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.kind.trim().is_empty() {
            return Err(RecordError::Validation("drink type is required".into()));
        }
        if self.brand.trim().is_empty() {
            return Err(RecordError::Validation("brand is required".into()));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(RecordError::Validation(format!(
                    "price must be a non-negative number, got {price}"
                )));
            }
        }
        Ok(())
    }
}

impl DrinkRecord {
    pub fn from_input(id: String, timestamp: i64, input: RecordInput) -> Self {
        let mut record = Self {
            id,
            timestamp,
            kind: String::new(),
            brand: String::new(),
            name: String::new(),
            temperature: String::new(),
            sweetness: String::new(),
            calories: None,
            price: None,
        };
        record.apply(input);
        record
    }

    /// Replaces every editable field; `id` and `timestamp` are left alone.
    pub fn apply(&mut self, input: RecordInput) {
        let RecordInput {
            kind,
            brand,
            name,
            temperature,
            sweetness,
            calories,
            price,
        } = input;
        self.kind = kind;
        self.brand = brand;
        self.name = name;
        self.temperature = temperature;
        self.sweetness = sweetness;
        self.calories = calories;
        self.price = price;
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
