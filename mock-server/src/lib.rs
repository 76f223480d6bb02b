//! In-memory stand-in for the product review REST API.
//!
//! Serves the handful of `/rest/product/...` routes the contract suites
//! exercise, including the filter-object mass edit (`{"id": {"$ne": -1}}`)
//! that the real service is vulnerable to.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, patch},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_TOKEN: &str = "test-token";

/// Identity behind the accepted bearer token; recorded when liking.
pub const TOKEN_USER: &str = "tester@juice-sh.op";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    pub product: u32,
    pub message: String,
    pub author: String,
    pub likes_count: u32,
    pub liked_by: Vec<String>,
}

impl Review {
    fn new(product: u32, message: &str, author: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            product,
            message: message.to_string(),
            author: author.to_string(),
            likes_count: 0,
            liked_by: Vec::new(),
        }
    }
}

/// Reviews every fresh server starts with.
pub fn seed_reviews() -> Vec<Review> {
    vec![
        Review::new(1, "One of my favorites!", "admin@juice-sh.op"),
        Review::new(1, "Tastes a bit sour.", "bender@juice-sh.op"),
        Review::new(3, "y0ur f1r3wall needs m0r3 musc13", "uvogin@juice-sh.op"),
        Review::new(7, "Fresh out of the press.", "jim@juice-sh.op"),
        Review::new(7, "Would drink again.", "mc.safesearch@juice-sh.op"),
    ]
}

#[derive(Deserialize)]
pub struct NewReview {
    pub message: String,
    pub author: String,
}

/// `id` is either a review id or a filter object such as `{"$ne": -1}`.
#[derive(Deserialize)]
pub struct ReviewUpdate {
    pub id: Value,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct LikeRequest {
    pub id: String,
}

#[derive(Clone)]
pub struct AppState {
    reviews: Arc<RwLock<Vec<Review>>>,
    token: Arc<str>,
}

pub fn app(token: &str) -> Router {
    let state = AppState {
        reviews: Arc::new(RwLock::new(seed_reviews())),
        token: Arc::from(token),
    };
    Router::new()
        .route(
            "/rest/product/{id}/reviews",
            get(list_reviews).put(create_review),
        )
        .route("/rest/product/reviews", patch(update_reviews).post(like_review))
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

fn authorized(headers: &HeaderMap, state: &AppState) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*state.token)
}

/// Parse a JSON body after the auth check, so unauthenticated calls get
/// 401 whatever their payload.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, StatusCode> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "rejected request body");
        match e.classify() {
            serde_json::error::Category::Data => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::BAD_REQUEST,
        }
    })
}

/// Mongo-style id selector: a plain id, or `{"$eq": x}` / `{"$ne": x}`.
fn selects(filter: &Value, review: &Review) -> bool {
    let same = |v: &Value| v.as_str() == Some(review.id.as_str());
    match filter {
        Value::String(id) => *id == review.id,
        Value::Object(ops) => !ops.is_empty() && ops.iter().all(|(op, operand)| match op.as_str() {
            "$eq" => same(operand),
            "$ne" => !same(operand),
            _ => false,
        }),
        _ => false,
    }
}

async fn list_reviews(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    // Non-numeric ids (e.g. injected expressions) match nothing.
    let product = id.parse::<u32>().ok();
    if product.is_none() {
        debug!(%id, "non-numeric product id");
    }
    let reviews = state.reviews.read().await;
    let data: Vec<&Review> = reviews
        .iter()
        .filter(|r| Some(r.product) == product)
        .collect();
    Json(json!({"status": "success", "data": data}))
}

async fn create_review(
    State(state): State<AppState>,
    Path(product): Path<u32>,
    Json(input): Json<NewReview>,
) -> (StatusCode, Json<Value>) {
    let review = Review::new(product, &input.message, &input.author);
    state.reviews.write().await.push(review);
    (StatusCode::CREATED, Json(json!({"status": "success"})))
}

async fn update_reviews(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers, &state) {
        warn!("rejected review update without valid bearer token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    let input: ReviewUpdate = parse_body(&body)?;

    let mut reviews = state.reviews.write().await;
    let mut original = Vec::new();
    let mut updated = Vec::new();
    for review in reviews.iter_mut().filter(|r| selects(&input.id, r)) {
        original.push(review.clone());
        if let Some(message) = &input.message {
            review.message = message.clone();
        }
        updated.push(review.clone());
    }

    Ok(Json(json!({
        "modified": updated.len(),
        "original": original,
        "updated": updated,
    })))
}

async fn like_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers, &state) {
        warn!("rejected like without valid bearer token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    let input: LikeRequest = parse_body(&body)?;

    let mut reviews = state.reviews.write().await;
    let review = reviews
        .iter_mut()
        .find(|r| r.id == input.id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if review.liked_by.iter().any(|u| u == TOKEN_USER) {
        return Err(StatusCode::FORBIDDEN);
    }
    review.likes_count += 1;
    review.liked_by.push(TOKEN_USER.to_string());
    Ok(Json(json!({"status": "success", "data": review})))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str) -> Review {
        Review {
            id: id.to_string(),
            ..Review::new(1, "m", "a")
        }
    }

    #[test]
    fn review_serializes_with_mongo_field_names() {
        let json = serde_json::to_value(review("abc")).unwrap();
        assert_eq!(json["_id"], "abc");
        assert_eq!(json["likesCount"], 0);
        assert!(json["likedBy"].as_array().unwrap().is_empty());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn plain_id_selects_one_review() {
        assert!(selects(&json!("abc"), &review("abc")));
        assert!(!selects(&json!("abc"), &review("def")));
    }

    #[test]
    fn ne_filter_selects_everything_else() {
        let filter = json!({"$ne": -1});
        assert!(seed_reviews().iter().all(|r| selects(&filter, r)));
        assert!(!selects(&json!({"$ne": "abc"}), &review("abc")));
    }

    #[test]
    fn unknown_operators_and_types_select_nothing() {
        assert!(!selects(&json!({"$where": "sleep(1)"}), &review("abc")));
        assert!(!selects(&json!(42), &review("abc")));
    }

    #[test]
    fn update_payload_accepts_filter_objects() {
        let input: ReviewUpdate =
            serde_json::from_str(r#"{"id":{"$ne":-1},"message":"trolololo"}"#).unwrap();
        assert!(input.id.is_object());
        assert_eq!(input.message.as_deref(), Some("trolololo"));
    }

    #[test]
    fn body_errors_split_into_syntax_and_data() {
        let broken = parse_body::<LikeRequest>(&Bytes::from_static(b"{not json"));
        assert_eq!(broken.err(), Some(StatusCode::BAD_REQUEST));
        let wrong_type = parse_body::<LikeRequest>(&Bytes::from_static(br#"{"id":7}"#));
        assert_eq!(wrong_type.err(), Some(StatusCode::UNPROCESSABLE_ENTITY));
    }

    #[test]
    fn update_payload_message_is_optional() {
        let input: ReviewUpdate = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert!(input.message.is_none());
    }
}
