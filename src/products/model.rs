use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Fixed catalog taxonomy. Stored as a Postgres enum; filter parameters are
/// validated against it before any query is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_category")]
pub enum Category {
    Mobile,
    Laptop,
    Tablet,
    Accessories,
    Audio,
    Camera,
    Gaming,
    #[sqlx(rename = "Smart Home")]
    #[serde(rename = "Smart Home")]
    SmartHome,
    Wearables,
    Other,
}

impl Category {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Mobile" => Some(Self::Mobile),
            "Laptop" => Some(Self::Laptop),
            "Tablet" => Some(Self::Tablet),
            "Accessories" => Some(Self::Accessories),
            "Audio" => Some(Self::Audio),
            "Camera" => Some(Self::Camera),
            "Gaming" => Some(Self::Gaming),
            "Smart Home" => Some(Self::SmartHome),
            "Wearables" => Some(Self::Wearables),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// One catalog image. `is_primary` is explicit rather than positional; the
/// upload path sets it on the first file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub url: String,
    pub alt: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warranty {
    pub duration: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub category: Category,
    pub subcategory: Option<String>,
    pub brand: String,
    pub model: Option<String>,
    pub sku: String,
    pub images: Json<Vec<ProductImage>>,
    pub specifications: Json<BTreeMap<String, String>>,
    pub stock: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub rating_average: f64,
    pub rating_count: i32,
    pub tags: Vec<String>,
    pub weight: Option<f64>,
    pub dimensions: Option<Json<Dimensions>>,
    pub warranty: Option<Json<Warranty>>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_accepts_known_values() {
        assert_eq!(Category::parse("Laptop"), Some(Category::Laptop));
        assert_eq!(Category::parse("Smart Home"), Some(Category::SmartHome));
        assert_eq!(Category::parse("laptop"), None);
        assert_eq!(Category::parse("Fridge"), None);
    }

    #[test]
    fn warranty_serializes_its_original_field_name() {
        let w = Warranty {
            duration: Some(24),
            kind: Some("manufacturer".into()),
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["type"], "manufacturer");
        assert_eq!(json["duration"], 24);
    }
}
