use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

use super::model::{Category, Dimensions, ProductImage, Warranty};

/// Canonical create payload. Multipart form fields arrive as loose strings;
/// everything is parsed or rejected here so the store only ever sees one
/// shape.
#[derive(Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub category: Category,
    pub subcategory: Option<String>,
    pub brand: String,
    pub model: Option<String>,
    pub sku: String,
    pub stock: i32,
    pub is_featured: bool,
    pub tags: Vec<String>,
    pub specifications: BTreeMap<String, String>,
    pub weight: Option<f64>,
    pub dimensions: Option<Dimensions>,
    pub warranty: Option<Warranty>,
    pub images: Vec<ProductImage>,
}

/// Partial update payload. Absent fields keep their stored value; a supplied
/// image list replaces the old one wholesale.
#[derive(Debug, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub sku: Option<String>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub weight: Option<f64>,
    pub dimensions: Option<Dimensions>,
    pub warranty: Option<Warranty>,
    pub images: Option<Vec<ProductImage>>,
}

fn field<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields.get(name).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn required<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ApiError> {
    field(fields, name).ok_or_else(|| ApiError::InvalidParameter(format!("{name} is required")))
}

fn non_negative(name: &str, raw: &str) -> Result<f64, ApiError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| ApiError::InvalidParameter(format!("{name} must be a non-negative number")))
}

fn non_negative_int(name: &str, raw: &str) -> Result<i32, ApiError> {
    raw.parse::<i32>()
        .ok()
        .filter(|v| *v >= 0)
        .ok_or_else(|| {
            ApiError::InvalidParameter(format!("{name} must be a non-negative integer"))
        })
}

fn parse_flag_field(name: &str, raw: &str) -> Result<bool, ApiError> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ApiError::InvalidParameter(format!(
            "{name} must be true or false"
        ))),
    }
}

fn parse_category(raw: &str) -> Result<Category, ApiError> {
    Category::parse(raw).ok_or_else(|| ApiError::InvalidParameter("Unknown category".into()))
}

/// Tags arrive as one comma-delimited string; split, trim, drop empties.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_specifications(raw: &str) -> Result<BTreeMap<String, String>, ApiError> {
    serde_json::from_str(raw)
        .map_err(|_| ApiError::InvalidParameter("Invalid specifications format".into()))
}

pub fn parse_warranty(raw: &str) -> Result<Warranty, ApiError> {
    serde_json::from_str(raw)
        .map_err(|_| ApiError::InvalidParameter("Invalid warranty format".into()))
}

pub fn parse_dimensions(raw: &str) -> Result<Dimensions, ApiError> {
    serde_json::from_str(raw)
        .map_err(|_| ApiError::InvalidParameter("Invalid dimensions format".into()))
}

impl NewProduct {
    pub fn from_form(
        fields: &HashMap<String, String>,
        images: Vec<ProductImage>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            name: required(fields, "name")?.to_string(),
            description: required(fields, "description")?.to_string(),
            price: non_negative("price", required(fields, "price")?)?,
            original_price: field(fields, "originalPrice")
                .map(|v| non_negative("originalPrice", v))
                .transpose()?,
            category: parse_category(required(fields, "category")?)?,
            subcategory: field(fields, "subcategory").map(str::to_string),
            brand: required(fields, "brand")?.to_string(),
            model: field(fields, "model").map(str::to_string),
            sku: required(fields, "sku")?.to_string(),
            stock: non_negative_int("stock", required(fields, "stock")?)?,
            is_featured: field(fields, "isFeatured")
                .map(|v| parse_flag_field("isFeatured", v))
                .transpose()?
                .unwrap_or(false),
            tags: field(fields, "tags").map(parse_tags).unwrap_or_default(),
            specifications: field(fields, "specifications")
                .map(parse_specifications)
                .transpose()?
                .unwrap_or_default(),
            weight: field(fields, "weight")
                .map(|v| non_negative("weight", v))
                .transpose()?,
            dimensions: field(fields, "dimensions")
                .map(parse_dimensions)
                .transpose()?,
            warranty: field(fields, "warranty").map(parse_warranty).transpose()?,
            images,
        })
    }
}

impl ProductUpdate {
    pub fn from_form(
        fields: &HashMap<String, String>,
        images: Option<Vec<ProductImage>>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            name: field(fields, "name").map(str::to_string),
            description: field(fields, "description").map(str::to_string),
            price: field(fields, "price")
                .map(|v| non_negative("price", v))
                .transpose()?,
            original_price: field(fields, "originalPrice")
                .map(|v| non_negative("originalPrice", v))
                .transpose()?,
            category: field(fields, "category").map(parse_category).transpose()?,
            subcategory: field(fields, "subcategory").map(str::to_string),
            brand: field(fields, "brand").map(str::to_string),
            model: field(fields, "model").map(str::to_string),
            sku: field(fields, "sku").map(str::to_string),
            stock: field(fields, "stock")
                .map(|v| non_negative_int("stock", v))
                .transpose()?,
            is_active: field(fields, "isActive")
                .map(|v| parse_flag_field("isActive", v))
                .transpose()?,
            is_featured: field(fields, "isFeatured")
                .map(|v| parse_flag_field("isFeatured", v))
                .transpose()?,
            tags: field(fields, "tags").map(parse_tags),
            specifications: field(fields, "specifications")
                .map(parse_specifications)
                .transpose()?,
            weight: field(fields, "weight")
                .map(|v| non_negative("weight", v))
                .transpose()?,
            dimensions: field(fields, "dimensions")
                .map(parse_dimensions)
                .transpose()?,
            warranty: field(fields, "warranty").map(parse_warranty).transpose()?,
            images,
        })
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: Category,
    pub count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentProduct {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub category: Category,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total_products: i64,
    pub active_products: i64,
    pub featured_products: i64,
    pub out_of_stock: i64,
    pub low_stock: i64,
    pub category_stats: Vec<CategoryCount>,
    pub recent_products: Vec<RecentProduct>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_fields() -> HashMap<String, String> {
        [
            ("name", "Smartphone X"),
            ("description", "A phone"),
            ("price", "699.99"),
            ("category", "Mobile"),
            ("brand", "Acme"),
            ("sku", "ABC-1"),
            ("stock", "25"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn create_parses_the_minimal_form() {
        let p = NewProduct::from_form(&base_fields(), vec![]).unwrap();
        assert_eq!(p.name, "Smartphone X");
        assert_eq!(p.price, 699.99);
        assert_eq!(p.category, Category::Mobile);
        assert_eq!(p.stock, 25);
        assert!(!p.is_featured);
        assert!(p.tags.is_empty());
        assert!(p.specifications.is_empty());
    }

    #[test]
    fn create_requires_core_fields() {
        let mut fields = base_fields();
        fields.remove("sku");
        assert!(NewProduct::from_form(&fields, vec![]).is_err());

        let mut fields = base_fields();
        fields.insert("price".into(), "-5".into());
        assert!(NewProduct::from_form(&fields, vec![]).is_err());

        let mut fields = base_fields();
        fields.insert("stock".into(), "many".into());
        assert!(NewProduct::from_form(&fields, vec![]).is_err());
    }

    #[test]
    fn tags_split_on_comma_and_trim() {
        assert_eq!(
            parse_tags("phone, flagship ,5g,,  "),
            vec!["phone", "flagship", "5g"]
        );
    }

    #[test]
    fn specifications_parse_from_json_string() {
        let specs = parse_specifications(r#"{"cpu":"M3","ram":"16GB"}"#).unwrap();
        assert_eq!(specs.get("cpu").map(String::as_str), Some("M3"));
        assert!(parse_specifications("cpu=M3").is_err());
        assert!(parse_specifications(r#"{"cores": 8}"#).is_err());
    }

    #[test]
    fn warranty_parses_from_json_string() {
        let w = parse_warranty(r#"{"duration":24,"type":"manufacturer"}"#).unwrap();
        assert_eq!(w.duration, Some(24));
        assert_eq!(w.kind.as_deref(), Some("manufacturer"));
        assert!(parse_warranty("2 years").is_err());
    }

    #[test]
    fn update_accepts_a_sparse_form() {
        let fields: HashMap<String, String> = [("price", "549.0"), ("isActive", "false")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let u = ProductUpdate::from_form(&fields, None).unwrap();
        assert_eq!(u.price, Some(549.0));
        assert_eq!(u.is_active, Some(false));
        assert!(u.name.is_none());
        assert!(u.images.is_none());
    }

    #[test]
    fn update_rejects_bad_flags_and_categories() {
        let fields: HashMap<String, String> = [("isFeatured", "maybe")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(ProductUpdate::from_form(&fields, None).is_err());

        let fields: HashMap<String, String> = [("category", "Fridge")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(ProductUpdate::from_form(&fields, None).is_err());
    }
}
