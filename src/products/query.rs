use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::ApiError;

use super::model::{Category, Product};
use super::repo::PRODUCT_COLUMNS;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// Raw listing parameters as they arrive on the query string. Everything is
/// a string until `ListQuery::from_params` has parsed or rejected it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<String>,
    pub is_featured: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    UpdatedAt,
    Price,
    Name,
    Stock,
    Rating,
}

impl SortKey {
    /// Unknown keys deliberately fall back to the default sort instead of
    /// reaching the store as arbitrary column names.
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("price") => Self::Price,
            Some("name") => Self::Name,
            Some("stock") => Self::Stock,
            Some("rating") => Self::Rating,
            Some("updatedAt") => Self::UpdatedAt,
            _ => Self::CreatedAt,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Price => "price",
            Self::Name => "name",
            Self::Stock => "stock",
            Self::Rating => "rating_average",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Validated listing query. All predicates are AND-combined; `search` is an
/// OR across name, description, brand and tags.
#[derive(Debug)]
pub struct ListQuery {
    pub page: i64,
    pub limit: i64,
    pub category: Option<Category>,
    pub brand: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub sort: SortKey,
    pub order: SortOrder,
}

fn present(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_page_value(name: &str, raw: Option<String>, default: i64) -> Result<i64, ApiError> {
    match present(raw) {
        None => Ok(default),
        Some(s) => s
            .parse::<i64>()
            .ok()
            .filter(|v| *v >= 1)
            .ok_or_else(|| ApiError::InvalidParameter(format!("{name} must be a positive integer"))),
    }
}

fn parse_price(name: &str, raw: Option<String>) -> Result<Option<f64>, ApiError> {
    match present(raw) {
        None => Ok(None),
        Some(s) => s
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| ApiError::InvalidParameter(format!("{name} must be a number"))),
    }
}

fn parse_flag(name: &str, raw: Option<String>) -> Result<Option<bool>, ApiError> {
    match present(raw).as_deref() {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(_) => Err(ApiError::InvalidParameter(format!(
            "{name} must be true or false"
        ))),
    }
}

impl ListQuery {
    pub fn from_params(params: ListParams) -> Result<Self, ApiError> {
        let page = parse_page_value("page", params.page, DEFAULT_PAGE)?;
        let limit = parse_page_value("limit", params.limit, DEFAULT_LIMIT)?;

        let category = match present(params.category) {
            None => None,
            Some(raw) => Some(
                Category::parse(&raw)
                    .ok_or_else(|| ApiError::InvalidParameter("Unknown category".into()))?,
            ),
        };

        let order = match present(params.sort_order).as_deref() {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(_) => {
                return Err(ApiError::InvalidParameter(
                    "sortOrder must be asc or desc".into(),
                ))
            }
        };

        // Both values are caller-controlled; the skip they imply must fit.
        if (page - 1).checked_mul(limit).is_none() {
            return Err(ApiError::InvalidParameter("page is out of range".into()));
        }

        Ok(Self {
            page,
            limit,
            category,
            brand: present(params.brand),
            min_price: parse_price("minPrice", params.min_price)?,
            max_price: parse_price("maxPrice", params.max_price)?,
            search: present(params.search),
            is_active: parse_flag("isActive", params.is_active)?,
            is_featured: parse_flag("isFeatured", params.is_featured)?,
            sort: SortKey::parse(present(params.sort_by).as_deref()),
            order,
        })
    }

    pub fn offset(&self) -> i64 {
        // from_params rejects combinations that would overflow; saturate
        // anyway so a hand-built query cannot panic.
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// `%` and `_` are ILIKE wildcards; user input must match literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Appends the WHERE clause for `q`. The page query and the count query both
/// go through here so their predicates cannot drift apart.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, q: &ListQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(category) = q.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some(brand) = &q.brand {
        builder
            .push(" AND brand ILIKE ")
            .push_bind(like_pattern(brand));
    }
    if let Some(active) = q.is_active {
        builder.push(" AND is_active = ").push_bind(active);
    }
    if let Some(featured) = q.is_featured {
        builder.push(" AND is_featured = ").push_bind(featured);
    }
    if let Some(min) = q.min_price {
        builder.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = q.max_price {
        builder.push(" AND price <= ").push_bind(max);
    }
    if let Some(search) = &q.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR brand ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

/// The id tiebreaker keeps pagination stable when the sort key has ties;
/// without it, adjacent pages could duplicate or drop tied rows.
fn order_clause(q: &ListQuery) -> String {
    let direction = match q.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!(" ORDER BY {} {direction}, id", q.sort.column())
}

/// Runs the filtered, sorted page plus a count over the same predicate.
/// The two reads are not transactional; under concurrent writes the total
/// may momentarily disagree with the page, which is accepted here.
pub async fn run(db: &PgPool, q: &ListQuery) -> Result<(Vec<Product>, i64), ApiError> {
    let mut page_query =
        QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
    push_filters(&mut page_query, q);
    page_query.push(order_clause(q));
    page_query.push(" LIMIT ").push_bind(q.limit);
    page_query.push(" OFFSET ").push_bind(q.offset());

    let records = page_query
        .build_query_as::<Product>()
        .fetch_all(db)
        .await?;

    let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
    push_filters(&mut count_query, q);
    let total: i64 = count_query.build_query_scalar().fetch_one(db).await?;

    Ok((records, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut p = ListParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "page" => p.page = v,
                "limit" => p.limit = v,
                "category" => p.category = v,
                "brand" => p.brand = v,
                "minPrice" => p.min_price = v,
                "maxPrice" => p.max_price = v,
                "search" => p.search = v,
                "isActive" => p.is_active = v,
                "isFeatured" => p.is_featured = v,
                "sortBy" => p.sort_by = v,
                "sortOrder" => p.sort_order = v,
                other => panic!("unknown param {other}"),
            }
        }
        p
    }

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let q = ListQuery::from_params(ListParams::default()).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 10);
        assert_eq!(q.sort, SortKey::CreatedAt);
        assert_eq!(q.order, SortOrder::Desc);
        assert!(q.category.is_none());
        assert!(q.is_active.is_none());
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn zero_or_negative_page_and_limit_are_rejected() {
        assert!(ListQuery::from_params(params(&[("page", "0")])).is_err());
        assert!(ListQuery::from_params(params(&[("page", "-3")])).is_err());
        assert!(ListQuery::from_params(params(&[("limit", "0")])).is_err());
        assert!(ListQuery::from_params(params(&[("page", "two")])).is_err());
    }

    #[test]
    fn offset_is_page_minus_one_times_limit() {
        let q = ListQuery::from_params(params(&[("page", "3"), ("limit", "7")])).unwrap();
        assert_eq!(q.offset(), 14);
    }

    #[test]
    fn page_and_limit_whose_skip_overflows_are_rejected() {
        let huge = i64::MAX / 2 + 1;
        let err = ListQuery::from_params(params(&[
            ("page", &huge.to_string()),
            ("limit", &huge.to_string()),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("out of range"));

        // Large but representable skips still pass.
        let q = ListQuery::from_params(params(&[("page", "1000000"), ("limit", "1000")]))
            .unwrap();
        assert_eq!(q.offset(), 999_999_000);
    }

    #[test]
    fn non_numeric_prices_are_rejected_not_ignored() {
        assert!(ListQuery::from_params(params(&[("minPrice", "cheap")])).is_err());
        assert!(ListQuery::from_params(params(&[("maxPrice", "1e999")])).is_err());
        let q = ListQuery::from_params(params(&[("minPrice", "500"), ("maxPrice", "1000")]))
            .unwrap();
        assert_eq!(q.min_price, Some(500.0));
        assert_eq!(q.max_price, Some(1000.0));
    }

    #[test]
    fn either_price_bound_may_stand_alone() {
        let q = ListQuery::from_params(params(&[("minPrice", "250")])).unwrap();
        assert_eq!(q.min_price, Some(250.0));
        assert!(q.max_price.is_none());
    }

    #[test]
    fn unknown_sort_key_falls_back_to_created_at() {
        let q = ListQuery::from_params(params(&[("sortBy", "popularity")])).unwrap();
        assert_eq!(q.sort, SortKey::CreatedAt);
        let q = ListQuery::from_params(params(&[("sortBy", "price")])).unwrap();
        assert_eq!(q.sort, SortKey::Price);
        assert_eq!(q.sort.column(), "price");
    }

    #[test]
    fn sort_order_only_accepts_asc_or_desc() {
        assert!(ListQuery::from_params(params(&[("sortOrder", "sideways")])).is_err());
        let q = ListQuery::from_params(params(&[("sortOrder", "asc")])).unwrap();
        assert_eq!(q.order, SortOrder::Asc);
    }

    #[test]
    fn flags_parse_strictly_and_absent_means_unconstrained() {
        let q = ListQuery::from_params(params(&[("isActive", "true")])).unwrap();
        assert_eq!(q.is_active, Some(true));
        let q = ListQuery::from_params(params(&[("isFeatured", "false")])).unwrap();
        assert_eq!(q.is_featured, Some(false));
        assert!(ListQuery::from_params(params(&[("isActive", "yes")])).is_err());
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(ListQuery::from_params(params(&[("category", "Fridge")])).is_err());
        let q = ListQuery::from_params(params(&[("category", "Smart Home")])).unwrap();
        assert_eq!(q.category, Some(Category::SmartHome));
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let q = ListQuery::from_params(params(&[
            ("category", ""),
            ("brand", "  "),
            ("minPrice", ""),
        ]))
        .unwrap();
        assert!(q.category.is_none());
        assert!(q.brand.is_none());
        assert!(q.min_price.is_none());
    }

    #[test]
    fn filters_land_in_the_sql_predicate() {
        let q = ListQuery::from_params(params(&[
            ("category", "Laptop"),
            ("brand", "dell"),
            ("minPrice", "500"),
            ("maxPrice", "1000"),
            ("search", "phone"),
            ("isActive", "true"),
        ]))
        .unwrap();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut builder, &q);
        let sql = builder.sql().to_string();
        assert!(sql.contains("category ="));
        assert!(sql.contains("brand ILIKE"));
        assert!(sql.contains("price >="));
        assert!(sql.contains("price <="));
        assert!(sql.contains("is_active ="));
        assert!(sql.contains("name ILIKE"));
        assert!(sql.contains("unnest(tags)"));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(like_pattern("phone"), "%phone%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
    }

    #[test]
    fn sort_always_breaks_ties_on_id() {
        let q = ListQuery::from_params(params(&[("sortBy", "price"), ("sortOrder", "asc")]))
            .unwrap();
        assert_eq!(order_clause(&q), " ORDER BY price ASC, id");

        let q = ListQuery::from_params(ListParams::default()).unwrap();
        assert_eq!(order_clause(&q), " ORDER BY created_at DESC, id");
    }

    #[test]
    fn no_filters_means_bare_predicate() {
        let q = ListQuery::from_params(ListParams::default()).unwrap();
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut builder, &q);
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM products WHERE 1 = 1");
    }
}
