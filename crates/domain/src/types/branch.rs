//! Restaurant branches

use serde::{Deserialize, Serialize};

/// A restaurant branch selectable on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub territory: Option<String>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_location_fields_default_to_none() {
        let branch: Branch =
            serde_json::from_str(r#"{"id": 2, "name": "Voronezh", "is_active": true}"#).unwrap();
        assert_eq!(branch.id, 2);
        assert!(branch.city.is_none());
        assert!(branch.territory.is_none());
    }
}
