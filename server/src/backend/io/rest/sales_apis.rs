//! # REST API for Sales
//!
//! `POST /sell` records one sale (`{details, records}`) or an array of them in a single
//! COMMERCE transaction.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde_json::Value;
use tracing::{error, info};

use super::json_body;
use super::mappers::error_mapper::INVALID_JSON;
use super::mappers::ErrorMapper;
use crate::backend::domain::sales_service::SALE_DETAIL_MODEL;
use crate::backend::AppState;
use shared::{ErrorResponse, SalePayload};

/// Create a router for the sales APIs
pub fn router() -> Router<AppState> {
    Router::new().route("/sell", post(create_sale))
}

/// Record one or many sales
pub async fn create_sale(State(state): State<AppState>, body: Bytes) -> Response {
    info!("POST /api/v1/sell");

    let Some(payload) = json_body(&body) else {
        return ErrorMapper::bad_request(INVALID_JSON);
    };
    let sales = match serde_json::from_value::<SalePayload>(payload) {
        Ok(sales) => sales.into_sales(),
        Err(e) => {
            let error = ErrorResponse::with_detail(
                format!(
                    "Error(s) found in data for Model `{}`, see details",
                    SALE_DETAIL_MODEL
                ),
                Value::String(e.to_string()),
            );
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };

    match state.sales_service.sell(sales).await {
        Ok(count) => {
            info!("Recorded {} sale(s)", count);
            StatusCode::CREATED.into_response()
        }
        Err(e) => {
            error!("Failed to record sale: {}", e);
            ErrorMapper::to_response(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::test_support::setup_test_app;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use shared::{CountResponse, ErrorResponse};
    use tower::util::ServiceExt; // for `oneshot`

    async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn count(app: &Router, model: &str) -> usize {
        let request = Request::builder()
            .uri(format!("/api/v1/count/{}", model))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice::<CountResponse>(&body).unwrap().count
    }

    async fn seed(app: &Router) {
        for (model, body) in [
            ("item_cat", json!({"cat_name": "General"})),
            ("family", json!({"fam_name": "General"})),
            ("sector", json!({"sec_name": "General"})),
            ("operation", json!({"op_name": "Sale", "op_sign": "-", "op_desc": "Counter sale"})),
            ("client_account", json!({"acc_name": "Walk-in", "acc_type": "Consumer"})),
            ("user_account", json!({"id": 1, "acc_type": 3, "is_active": true})),
            (
                "depot_detail",
                json!([
                    {"depot_name": "Store", "depot_desc": "Back store", "depot_type": "Source"},
                    {"depot_name": "Counter", "depot_desc": "Front counter", "depot_type": "Destination"}
                ]),
            ),
            (
                "item",
                json!({
                    "item_name": "Widget", "item_cat": 1, "cost_price": 100,
                    "selling_price": 150, "min_sell_price": 120, "min_order_qty": 5,
                    "family": 1, "sector": 1
                }),
            ),
        ] {
            let (status, _) = post(app, &format!("/api/v1/create/{}", model), body).await;
            assert_eq!(status, StatusCode::CREATED, "seeding {}", model);
        }
    }

    fn sale(batch: &str, item: i64) -> Value {
        json!({
            "details": {
                "batch": batch,
                "operation": 1,
                "receiver": 1,
                "source_depot": 1,
                "dest_depot": 2,
                "rec_date": "2024-03-01",
                "ref": "TILL-1",
                "app_user": 1
            },
            "records": [{
                "item": item,
                "quantity": 1,
                "source_stock": 9,
                "dest_stock": 1,
                "amount": 150,
                "batch": batch
            }]
        })
    }

    #[tokio::test]
    async fn test_single_and_batch_sales() {
        let app = setup_test_app().await;
        seed(&app).await;

        let (status, _) = post(&app, "/api/v1/sell", sale("S-1", 1)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = post(&app, "/api/v1/sell", json!([sale("S-2", 1), sale("S-3", 1)])).await;
        assert_eq!(status, StatusCode::CREATED);

        assert_eq!(count(&app, "record_detail").await, 3);
        assert_eq!(count(&app, "record").await, 3);
    }

    #[tokio::test]
    async fn test_sale_with_missing_item_leaves_no_header() {
        let app = setup_test_app().await;
        seed(&app).await;

        let (status, body) = post(&app, "/api/v1/sell", sale("S-1", 999)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error.message.contains("record_detail"));

        assert_eq!(count(&app, "record_detail").await, 0);
    }

    #[tokio::test]
    async fn test_malformed_sale_is_400() {
        let app = setup_test_app().await;
        let (status, _) = post(&app, "/api/v1/sell", json!({"details": {"batch": "S-1"}})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post(&app, "/api/v1/sell", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
