//! # REST API for Generic Model Operations
//!
//! Create, delete, list and count endpoints addressed by model identifier
//! (`/create/item`, `/delete/supplier`, ...).

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tracing::{error, info};

use super::json_body;
use super::mappers::error_mapper::{INVALID_JSON, MODEL_REQUIRED};
use super::mappers::{ErrorMapper, RecordMapper};
use crate::backend::domain::ModelError;
use crate::backend::storage::PhysicalDatabase;
use crate::backend::AppState;
use shared::{CountQuery, CountResponse, DeleteRequest};

/// Create a router for the generic model APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create/:model", post(create_model))
        .route("/delete", post(delete_without_model))
        .route("/delete/:model", post(delete_model))
        .route("/all/:model", get(list_model))
        .route("/count", get(count_all))
        .route("/count/:model", get(count_model))
}

/// Create one or many instances of a model
pub async fn create_model(
    State(state): State<AppState>,
    Path(model): Path<String>,
    body: Bytes,
) -> Response {
    info!("POST /api/v1/create/{}", model);

    let Some(payload) = json_body(&body) else {
        return ErrorMapper::bad_request(INVALID_JSON);
    };

    match state.model_service.create(&model, &payload).await {
        Ok(records) => {
            let body = RecordMapper::to_created_dto(&records, payload.is_array());
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => {
            error!("Failed to create `{}`: {}", model, e);
            ErrorMapper::to_response(e)
        }
    }
}

pub async fn delete_without_model() -> Response {
    info!("POST /api/v1/delete");
    ErrorMapper::bad_request(MODEL_REQUIRED)
}

/// Delete instances of a model by primary key
pub async fn delete_model(
    State(state): State<AppState>,
    Path(model): Path<String>,
    body: Bytes,
) -> Response {
    info!("POST /api/v1/delete/{}", model);

    let Some(payload) = json_body(&body) else {
        return ErrorMapper::bad_request(INVALID_JSON);
    };
    let request: DeleteRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(e) => {
            return ErrorMapper::to_response(ModelError::MissingField(format!(
                "A list of `ids` is required: {}",
                e
            )))
        }
    };

    match state.model_service.delete_by_ids(&model, &request.ids).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => {
            error!("Failed to delete `{}`: {}", model, e);
            ErrorMapper::to_response(e)
        }
    }
}

/// Every instance of a model, keyed by record key
pub async fn list_model(State(state): State<AppState>, Path(model): Path<String>) -> Response {
    info!("GET /api/v1/all/{}", model);

    match state.model_service.list(&model).await {
        Ok(rows) => (StatusCode::OK, Json(RecordMapper::to_list_dto(&rows))).into_response(),
        Err(e) => ErrorMapper::to_response(e),
    }
}

/// Row count over every model of the requested database
pub async fn count_all(State(state): State<AppState>, Query(query): Query<CountQuery>) -> Response {
    info!("GET /api/v1/count - db: {:?}", query.db);
    count(state, None, query).await
}

/// Row count of one model under the requested database
pub async fn count_model(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Query(query): Query<CountQuery>,
) -> Response {
    info!("GET /api/v1/count/{} - db: {:?}", model, query.db);
    count(state, Some(model), query).await
}

async fn count(state: AppState, model: Option<String>, query: CountQuery) -> Response {
    let database = match query.db.as_deref() {
        None => PhysicalDatabase::Commerce,
        Some(db) => match db.parse::<PhysicalDatabase>() {
            Ok(database) => database,
            Err(e) => return ErrorMapper::bad_request(&e),
        },
    };

    match state.model_service.count(model.as_deref(), database).await {
        Ok(count) => Json(CountResponse {
            database: database.to_string(),
            model,
            count,
        })
        .into_response(),
        Err(e) => ErrorMapper::to_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::setup_test_app;
    use axum::{
        body::Body,
        http::{Method, Request},
    };
    use serde_json::{json, Value};
    use shared::ErrorResponse;
    use tower::util::ServiceExt; // for `oneshot`

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn seed_catalogue(app: &Router) {
        for (model, body) in [
            ("item_cat", json!({"cat_name": "General"})),
            ("family", json!({"fam_name": "General"})),
            ("sector", json!({"sec_name": "General"})),
        ] {
            let (status, _) = send(app, Method::POST, &format!("/api/v1/create/{}", model), Some(body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }
    }

    fn item(name: &str) -> Value {
        json!({
            "item_name": name,
            "item_cat": 1,
            "cost_price": 100,
            "selling_price": 150,
            "min_sell_price": 120,
            "min_order_qty": 5,
            "family": 1,
            "sector": 1
        })
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let app = setup_test_app().await;
        seed_catalogue(&app).await;

        let (status, body) = send(&app, Method::POST, "/api/v1/create/item", Some(item("Widget"))).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(created["id"], json!(1));
        assert_eq!(created["item_name"], json!("Widget"));

        let (status, body) = send(&app, Method::GET, "/api/v1/all/item", None).await;
        assert_eq!(status, StatusCode::OK);
        let rows: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(rows["Item.1"]["item_name"], json!("Widget"));
        assert_eq!(rows["Item.1"]["is_active"], json!(true));
    }

    #[tokio::test]
    async fn test_create_validation_error_detail() {
        let app = setup_test_app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/create/item",
            Some(json!({"item_name": "Widget", "colour": "red"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.message, "Error(s) found in data for Model `item`, see details");
        let detail = error.detail.unwrap();
        assert_eq!(detail["colour"], json!(["Unknown field."]));
        assert_eq!(detail["family"], json!(["Missing data for required field."]));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_or_invalid_json() {
        let app = setup_test_app().await;
        for body in [Body::from("not json"), Body::from("{}"), Body::empty()] {
            let request = Request::builder()
                .method(Method::POST)
                .uri("/api/v1/create/item")
                .header("content-type", "application/json")
                .body(body)
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_unknown_model_is_404() {
        let app = setup_test_app().await;
        let (status, body) = send(&app, Method::POST, "/api/v1/create/frobnicate", Some(json!({"a": 1}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.message, "Model `frobnicate`");

        let (status, _) = send(&app, Method::POST, "/api/v1/delete/frobnicate", Some(json!({"ids": [1]}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_409() {
        let app = setup_test_app().await;
        seed_catalogue(&app).await;
        send(&app, Method::POST, "/api/v1/create/item", Some(item("Widget"))).await;

        let (status, body) = send(&app, Method::POST, "/api/v1/create/item", Some(item("Widget"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            error.message,
            "Resource(s) already exists in Model `item`, check value(s) `item_name=Widget`"
        );
    }

    #[tokio::test]
    async fn test_delete_flow() {
        let app = setup_test_app().await;
        seed_catalogue(&app).await;
        send(&app, Method::POST, "/api/v1/create/item", Some(json!([item("Widget"), item("Gadget")]))).await;

        let (status, body) = send(&app, Method::POST, "/api/v1/delete/item", Some(json!({"ids": [1]}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        // Repeating the request is a no-op
        let (status, _) = send(&app, Method::POST, "/api/v1/delete/item", Some(json!({"ids": [1]}))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, Method::GET, "/api/v1/count/item", None).await;
        let count: CountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(count.count, 1);
    }

    #[tokio::test]
    async fn test_delete_request_errors() {
        let app = setup_test_app().await;

        let (status, body) = send(&app, Method::POST, "/api/v1/delete", Some(json!({"ids": [1]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.message, "Model is required");

        let (status, body) = send(&app, Method::POST, "/api/v1/delete/item", Some(json!({"keys": [1]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error.message.starts_with("A list of `ids` is required"));

        let (status, _) = send(&app, Method::POST, "/api/v1/delete/depot", Some(json!({"ids": [1]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_reference_is_409() {
        let app = setup_test_app().await;
        seed_catalogue(&app).await;
        send(&app, Method::POST, "/api/v1/create/item", Some(json!([item("Widget"), item("Gadget")]))).await;
        send(&app, Method::POST, "/api/v1/create/barcode", Some(json!({"barcode": "0001", "item": 1}))).await;

        let (status, _) = send(&app, Method::POST, "/api/v1/delete/item", Some(json!({"ids": [1, 2]}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = send(&app, Method::GET, "/api/v1/count/item", None).await;
        let count: CountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(count.count, 2);
    }

    #[tokio::test]
    async fn test_count_by_database() {
        let app = setup_test_app().await;
        seed_catalogue(&app).await;
        send(&app, Method::POST, "/api/v1/create/account_type", Some(json!({"type_name": "Admin"}))).await;

        let (status, body) = send(&app, Method::GET, "/api/v1/count", None).await;
        assert_eq!(status, StatusCode::OK);
        let count: CountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!((count.database.as_str(), count.count), ("commerce", 3));

        let (_, body) = send(&app, Method::GET, "/api/v1/count?db=account", None).await;
        let count: CountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!((count.database.as_str(), count.count), ("account", 1));

        let (_, body) = send(&app, Method::GET, "/api/v1/count/family?db=account", None).await;
        let count: CountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(count.model.as_deref(), Some("family"));
        assert_eq!(count.count, 0);

        let (status, _) = send(&app, Method::GET, "/api/v1/count?db=ledger", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
