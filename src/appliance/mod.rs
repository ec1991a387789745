use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::store::Metadata;

/// Identity of an appliance below a meter, e.g. `('fridge', 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplianceId {
    pub appliance_type: String,
    pub instance: u32,
}

impl fmt::Display for ApplianceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "('{}', {})", self.appliance_type, self.instance)
    }
}

fn appliance_instance_default() -> u32 { return 1 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceMetadata {
    #[serde(rename = "type")]
    pub appliance_type: String,
    #[serde(default="appliance_instance_default")]
    pub instance: u32,
    /// Everything else, e.g. `room`, `on_power_threshold`, `dominant_appliance`
    #[serde(flatten)]
    pub extra: Metadata,
}

/// An appliance connected directly downstream of a meter.
#[derive(Debug, Clone, PartialEq)]
pub struct Appliance {
    pub metadata: ApplianceMetadata,
}

impl Appliance {
    pub fn new(metadata: ApplianceMetadata) -> Self {
        Appliance { metadata }
    }

    pub fn identifier(&self) -> ApplianceId {
        ApplianceId {
            appliance_type: self.metadata.appliance_type.clone(),
            instance: self.metadata.instance,
        }
    }

    pub fn is_flagged_dominant(&self) -> bool {
        self.metadata.extra.get("dominant_appliance").and_then(Value::as_bool) == Some(true)
    }

    /// True if every key/value pair of `query` matches this appliance.
    ///
    /// `type` and `instance` are compared against the identifier, any other
    /// key has to be present in the metadata with an equal value.
    pub fn matches(&self, query: &Metadata) -> bool {
        for (k, v) in query {
            let ok = match k.as_str() {
                "type" => v.as_str() == Some(self.metadata.appliance_type.as_str()),
                "instance" => v.as_u64() == Some(self.metadata.instance as u64),
                _ => self.metadata.extra.get(k) == Some(v),
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Appliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Appliance(type='{}', instance={})", self.metadata.appliance_type, self.metadata.instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fridge() -> Appliance {
        let md: ApplianceMetadata = serde_json::from_value(json!({
            "type": "fridge", "instance": 2, "room": "kitchen", "dominant_appliance": true
        })).unwrap();
        Appliance::new(md)
    }

    fn query(v: Value) -> Metadata {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_identifier() {
        let a = fridge();
        assert_eq!(a.identifier(), ApplianceId { appliance_type: "fridge".to_string(), instance: 2 });
        assert_eq!(a.identifier().to_string(), "('fridge', 2)");
        assert!(a.is_flagged_dominant());
    }

    #[test]
    fn test_instance_defaults_to_one() {
        let md: ApplianceMetadata = serde_json::from_value(json!({"type": "kettle"})).unwrap();
        assert_eq!(md.instance, 1);
        assert!(!Appliance::new(md).is_flagged_dominant());
    }

    #[test]
    fn test_matches_all_fields() {
        let a = fridge();
        assert!(a.matches(&query(json!({}))));
        assert!(a.matches(&query(json!({"type": "fridge"}))));
        assert!(a.matches(&query(json!({"type": "fridge", "instance": 2, "room": "kitchen"}))));
        assert!(!a.matches(&query(json!({"type": "fridge", "instance": 1}))));
        assert!(!a.matches(&query(json!({"type": "kettle"}))));
        assert!(!a.matches(&query(json!({"room": "bathroom"}))));
        assert!(!a.matches(&query(json!({"floor": 1}))));
    }
}
