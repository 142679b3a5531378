use std::str::FromStr;

use axum::Json;
use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use shopdesk_store::{Notification, Product, Sale, Shop, Supplier};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// `Json<T>` whose rejections use the `{ error, message }` body as `400 invalid_body`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_body",
                rejection.body_text(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListSalesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub permission: String,
}

pub const DEFAULT_SALES_LIMIT: usize = 50;
pub const MAX_SALES_LIMIT: usize = 500;

// -------------------------
// Path helpers
// -------------------------

/// Parse a path id, rendering failures as `400 invalid_id`.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

// -------------------------
// Response mapping
// -------------------------

pub fn shop_to_json(s: Shop) -> serde_json::Value {
    json!({
        "id": s.id.to_string(),
        "name": s.name,
        "currency": s.currency,
        "created_at": s.created_at,
    })
}

pub fn product_to_json(p: Product) -> serde_json::Value {
    let low_stock = p.is_low_on_stock();
    json!({
        "id": p.id.to_string(),
        "shop_id": p.shop_id.to_string(),
        "sku": p.sku,
        "name": p.name,
        "unit_price": p.unit_price,
        "stock": p.stock,
        "reorder_level": p.reorder_level,
        "low_stock": low_stock,
        "supplier_id": p.supplier_id.map(|s| s.to_string()),
        "created_at": p.created_at,
    })
}

pub fn sale_to_json(s: Sale) -> serde_json::Value {
    json!({
        "id": s.id.to_string(),
        "shop_id": s.shop_id.to_string(),
        "product_id": s.product_id.to_string(),
        "quantity": s.quantity,
        "unit_price": s.unit_price,
        "total": s.unit_price.saturating_mul(u64::from(s.quantity)),
        "sold_at": s.sold_at,
    })
}

pub fn supplier_to_json(s: Supplier) -> serde_json::Value {
    json!({
        "id": s.id.to_string(),
        "name": s.name,
        "email": s.email,
        "phone": s.phone,
        "created_at": s.created_at,
    })
}

pub fn notification_to_json(n: Notification) -> serde_json::Value {
    json!({
        "id": n.id.to_string(),
        "shop_id": n.shop_id.map(|s| s.to_string()),
        "kind": n.kind,
        "message": n.message,
        "read": n.read,
        "created_at": n.created_at,
    })
}
