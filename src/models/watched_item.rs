use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;

use crate::error::ValidationError;

/// One entry of the watchlist, as persisted in the data file.
///
/// Decoding is as lenient as admission: older data files hold numeric ids and
/// string prices straight from form posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedItem {
    #[serde(deserialize_with = "loose_id")]
    pub id: String,

    #[serde(default, deserialize_with = "loose_name")]
    pub name: String,

    #[serde(rename = "maxPrice", deserialize_with = "loose_max_price")]
    pub max_price: f64,

    // dedup bookkeeping, only written when dedup is enabled
    #[serde(rename = "lastAlertedPrice", default, skip_serializing_if = "Option::is_none")]
    pub last_alerted_price: Option<f64>,
    #[serde(rename = "lastAlertedAt", default, skip_serializing_if = "Option::is_none")]
    pub last_alerted_at: Option<i64>,
}

impl WatchedItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, max_price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_price,
            last_alerted_price: None,
            last_alerted_at: None,
        }
    }

    /// Label used in alert text. Falls back to the id when no name was given.
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            format!("Item {}", self.id)
        } else {
            name.to_string()
        }
    }

    pub fn is_triggered_by(&self, price: f64) -> bool {
        price.is_finite() && price <= self.max_price
    }
}

fn id_from(value: Option<&Value>) -> Result<String, ValidationError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
        _ => Err(ValidationError::MissingId),
    }
}

fn name_from(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn max_price_from(value: Option<&Value>) -> Result<f64, ValidationError> {
    let max_price = match value {
        None | Some(Value::Null) => return Err(ValidationError::MissingMaxPrice),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(ValidationError::MissingMaxPrice);
        }
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ValidationError::InvalidMaxPrice(n.to_string()))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidMaxPrice(s.clone()))?,
        Some(other) => return Err(ValidationError::InvalidMaxPrice(other.to_string())),
    };

    if !max_price.is_finite() || max_price < 0.0 {
        return Err(ValidationError::InvalidMaxPrice(max_price.to_string()));
    }
    Ok(max_price)
}

fn loose_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    id_from(Some(&value)).map_err(D::Error::custom)
}

fn loose_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(name_from(Some(&value)))
}

fn loose_max_price<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    max_price_from(Some(&value)).map_err(D::Error::custom)
}

/// Body of an add request. Fields stay loosely typed so that validation,
/// not deserialization, decides what is acceptable.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NewItem {
    #[serde(default)]
    pub id: Option<Value>,

    #[serde(default)]
    pub name: Option<Value>,

    #[serde(rename = "maxPrice", default)]
    pub max_price: Option<Value>,
}

impl NewItem {
    pub fn validate(self) -> Result<WatchedItem, ValidationError> {
        let id = id_from(self.id.as_ref())?;
        let max_price = max_price_from(self.max_price.as_ref())?;
        Ok(WatchedItem::new(id, name_from(self.name.as_ref()), max_price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_item(v: Value) -> NewItem {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn accepts_numeric_goods_id_and_string_price() {
        let item = new_item(json!({ "id": 33975, "name": "AK", "maxPrice": "12.5" }))
            .validate()
            .unwrap();
        assert_eq!(item.id, "33975");
        assert_eq!(item.max_price, 12.5);
    }

    #[test]
    fn rejects_missing_fields() {
        assert_eq!(
            new_item(json!({ "maxPrice": 10 })).validate(),
            Err(ValidationError::MissingId)
        );
        assert_eq!(
            new_item(json!({ "id": "A" })).validate(),
            Err(ValidationError::MissingMaxPrice)
        );
        assert_eq!(
            new_item(json!({ "id": "", "maxPrice": 1 })).validate(),
            Err(ValidationError::MissingId)
        );
    }

    #[test]
    fn rejects_non_numeric_and_negative_prices() {
        assert!(matches!(
            new_item(json!({ "id": "A", "maxPrice": "cheap" })).validate(),
            Err(ValidationError::InvalidMaxPrice(_))
        ));
        assert!(matches!(
            new_item(json!({ "id": "A", "maxPrice": -1 })).validate(),
            Err(ValidationError::InvalidMaxPrice(_))
        ));
        assert!(matches!(
            new_item(json!({ "id": "A", "maxPrice": [1] })).validate(),
            Err(ValidationError::InvalidMaxPrice(_))
        ));
    }

    #[test]
    fn missing_name_gets_placeholder() {
        let item = new_item(json!({ "id": "B", "maxPrice": 50 })).validate().unwrap();
        assert_eq!(item.name, "");
        assert_eq!(item.display_name(), "Item B");
    }

    #[test]
    fn non_string_name_is_stringified() {
        let item = new_item(json!({ "id": "C", "name": 7, "maxPrice": 1 })).validate().unwrap();
        assert_eq!(item.name, "7");
    }

    #[test]
    fn stored_record_accepts_form_shaped_fields() {
        let item: WatchedItem =
            serde_json::from_value(json!({ "id": 33975, "name": "AK", "maxPrice": "80" })).unwrap();
        assert_eq!(item, WatchedItem::new("33975", "AK", 80.0));

        let bad = serde_json::from_value::<WatchedItem>(json!({ "id": "A", "maxPrice": "cheap" }));
        assert!(bad.is_err());
    }

    #[test]
    fn trigger_is_inclusive() {
        let item = WatchedItem::new("A", "Knife", 100.0);
        assert!(item.is_triggered_by(100.0));
        assert!(item.is_triggered_by(95.0));
        assert!(!item.is_triggered_by(100.01));
        assert!(!item.is_triggered_by(f64::NAN));
    }
}
