use axum::Json;
use serde::Serialize;

/// Page math and metadata attached to list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total_items: i64) -> Self {
        let total_pages = if limit > 0 {
            (total_items + limit - 1) / limit
        } else {
            0
        };
        Self {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: limit,
        }
    }
}

/// Uniform wrapper every endpoint returns.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
    pub success: bool,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: &str) -> Json<Self> {
        Json(Self {
            data: Some(data),
            message: message.to_string(),
            success: true,
            error: false,
            pagination: None,
        })
    }

    pub fn paginated(data: T, message: &str, pagination: Pagination) -> Json<Self> {
        Json(Self {
            data: Some(data),
            message: message.to_string(),
            success: true,
            error: false,
            pagination: Some(pagination),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Json<Self> {
        Json(Self {
            data: None,
            message: message.to_string(),
            success: true,
            error: false,
            pagination: None,
        })
    }

    pub fn failure(message: String) -> Self {
        Self {
            data: None,
            message,
            success: false,
            error: true,
            pagination: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 1).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).total_pages, 2);
        assert_eq!(Pagination::new(3, 7, 20).total_pages, 3);
    }

    #[test]
    fn envelope_shape_for_success() {
        let Json(resp) = ApiResponse::ok(vec![1, 2, 3], "Fetched");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["error"], false);
        assert_eq!(json["message"], "Fetched");
        assert!(json.get("pagination").is_none());
    }

    #[test]
    fn envelope_carries_pagination_in_camel_case() {
        let Json(resp) =
            ApiResponse::paginated(vec![1], "Fetched", Pagination::new(2, 10, 35));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["pagination"]["currentPage"], 2);
        assert_eq!(json["pagination"]["totalPages"], 4);
        assert_eq!(json["pagination"]["totalItems"], 35);
        assert_eq!(json["pagination"]["itemsPerPage"], 10);
    }

    #[test]
    fn envelope_shape_for_failure() {
        let resp = ApiResponse::failure("Product not found".into());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], true);
        assert!(json.get("data").is_none());
    }
}
