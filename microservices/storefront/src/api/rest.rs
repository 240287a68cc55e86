//! Storefront REST API
//!
//! Identity arrives in the `x-user-id` header, placed by the upstream
//! gateway after authentication; this service never issues tokens.
//! Admin routes require the configured `x-admin-token`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shop_core::{Money, ShopError};
use std::sync::Arc;
use uuid::Uuid;

use crate::addresses::{AddressBook, NewAddress};
use crate::catalog::ProductCatalog;
use crate::checkout::{CheckoutService, SubmitOrder};
use crate::credit::{CreditLifecycle, NewCreditRequest};
use crate::gateway::{verify_callback_signature, PaymentGateway, PaymentRequest};
use crate::types::{CreditStatus, Product};
use crate::wallet::WalletLedger;

#[derive(Clone)]
pub struct AppState {
    pub catalog: ProductCatalog,
    pub ledger: WalletLedger,
    pub checkout: CheckoutService,
    pub credit: CreditLifecycle,
    pub addresses: AddressBook,
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub callback_secret: String,
    pub callback_url: String,
    pub admin_token: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Profile / wallet
        .route("/v1/profile", get(get_profile))
        .route("/v1/wallet", get(get_wallet))
        // Orders
        .route("/v1/orders", post(submit_order).get(list_orders))
        .route("/v1/orders/{id}", get(get_order))
        // Addresses
        .route("/v1/addresses", get(list_addresses).post(create_address))
        .route(
            "/v1/addresses/{id}",
            get(get_address).put(update_address).delete(delete_address),
        )
        // Credit requests
        .route(
            "/v1/credit-requests",
            post(create_credit_request).get(list_credit_requests),
        )
        .route("/v1/credit-requests/{id}", get(get_credit_request))
        .route(
            "/v1/credit-requests/{id}/installments",
            get(list_installments),
        )
        .route("/v1/credit-requests/{id}/pay", post(pay_credit_request))
        // Payment gateway callback (HMAC-verified)
        .route("/v1/payments/callback", post(payment_callback))
        // Admin
        .route(
            "/v1/admin/credit-requests/{id}/status",
            post(admin_apply_status),
        )
        .route("/v1/admin/products", post(admin_upsert_product))
        // Catalog
        .route("/v1/products", get(list_products))
        .route("/v1/products/{id}", get(get_product))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
async fn ready() -> &'static str {
    "OK"
}

// ============== Error mapping ==============

pub struct ApiError(ShopError);

impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut body = serde_json::json!({
            "error": self.0.error_code(),
            "message": self.0.to_string(),
        });
        match &self.0 {
            ShopError::InsufficientFunds { balance, shortfall } => {
                body["balance"] = (*balance).into();
                body["shortfall"] = (*shortfall).into();
            }
            ShopError::ProductNotFound(product_id) => {
                body["product_id"] = product_id.to_string().into();
            }
            ShopError::InvalidQuantity {
                product_id,
                quantity,
            } => {
                body["product_id"] = product_id.to_string().into();
                body["quantity"] = (*quantity).into();
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

fn require_user(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| ApiError(ShopError::Auth("missing or invalid x-user-id".to_string())))
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if state.admin_token.is_empty() || presented != state.admin_token {
        return Err(ApiError(ShopError::Forbidden(
            "admin token required".to_string(),
        )));
    }
    Ok(())
}

// ============== Profile / wallet ==============

#[derive(Serialize)]
struct ProfileResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
    wallet_balance: Money,
}

async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let full_name = state
        .addresses
        .list(user_id)
        .into_iter()
        .next()
        .map(|a| a.full_name);
    Ok(Json(ProfileResponse {
        full_name,
        wallet_balance: state.ledger.balance(user_id),
    }))
}

async fn get_wallet(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = require_user(&headers)?;
    Ok(Json(serde_json::json!({
        "balance": state.ledger.balance(user_id)
    })))
}

// ============== Orders ==============

async fn submit_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitOrder>,
) -> Result<Response, ApiError> {
    let user_id = require_user(&headers)?;
    let order = state.checkout.submit_order(user_id, req)?;
    Ok((StatusCode::CREATED, Json(order)).into_response())
}

async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = require_user(&headers)?;
    let orders = state.checkout.list_orders(user_id);
    Ok(Json(serde_json::json!({ "orders": orders })))
}

async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<crate::types::Order>, ApiError> {
    let user_id = require_user(&headers)?;
    state
        .checkout
        .get_order(user_id, id)
        .map(Json)
        .ok_or_else(|| ApiError(ShopError::NotFound(format!("order {}", id))))
}

// ============== Addresses ==============

async fn list_addresses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = require_user(&headers)?;
    Ok(Json(
        serde_json::json!({ "addresses": state.addresses.list(user_id) }),
    ))
}

async fn create_address(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewAddress>,
) -> Result<Response, ApiError> {
    let user_id = require_user(&headers)?;
    let address = state.addresses.create(user_id, req)?;
    Ok((StatusCode::CREATED, Json(address)).into_response())
}

async fn get_address(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<crate::types::UserAddress>, ApiError> {
    let user_id = require_user(&headers)?;
    state
        .addresses
        .get(user_id, id)
        .map(Json)
        .ok_or_else(|| ApiError(ShopError::NotFound(format!("address {}", id))))
}

async fn update_address(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<NewAddress>,
) -> Result<Json<crate::types::UserAddress>, ApiError> {
    let user_id = require_user(&headers)?;
    let address = state.addresses.update(user_id, id, req)?;
    Ok(Json(address))
}

async fn delete_address(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = require_user(&headers)?;
    state.addresses.delete(user_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============== Credit requests ==============

async fn create_credit_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewCreditRequest>,
) -> Result<Response, ApiError> {
    let user_id = require_user(&headers)?;
    let request = state.credit.create(user_id, req)?;
    Ok((StatusCode::CREATED, Json(request)).into_response())
}

async fn list_credit_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = require_user(&headers)?;
    Ok(Json(
        serde_json::json!({ "requests": state.credit.list(user_id) }),
    ))
}

async fn get_credit_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<crate::types::CreditRequest>, ApiError> {
    let user_id = require_user(&headers)?;
    state
        .credit
        .get(user_id, id)
        .map(Json)
        .ok_or_else(|| ApiError(ShopError::NotFound(format!("credit request {}", id))))
}

async fn list_installments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = require_user(&headers)?;
    let installments = state.credit.list_installments(user_id, id)?;
    Ok(Json(serde_json::json!({ "installments": installments })))
}

async fn pay_credit_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = require_user(&headers)?;
    let request = state
        .credit
        .get(user_id, id)
        .ok_or_else(|| ApiError(ShopError::NotFound(format!("credit request {}", id))))?;
    if request.status != CreditStatus::Pending {
        return Err(ApiError(ShopError::Validation(
            "credit request is not awaiting payment".to_string(),
        )));
    }

    let gateway = state
        .gateway
        .as_ref()
        .ok_or_else(|| ApiError(ShopError::Unavailable("no payment gateway".to_string())))?;

    let response = gateway
        .request_payment(&PaymentRequest {
            amount: request.amount,
            description: format!("Credit application {}", request.tracking_code),
            callback_url: state.callback_url.clone(),
        })
        .await
        .map_err(|e| ApiError(ShopError::Network(e.to_string())))?;

    Ok(Json(serde_json::json!({
        "authority": response.authority,
        "redirect_url": response.redirect_url,
    })))
}

// ============== Payment callback ==============

#[derive(Debug, Deserialize)]
struct CallbackPayload {
    tracking_code: String,
    /// "paid" or "failed"
    status: String,
    #[serde(default)]
    external_track_id: Option<String>,
}

async fn payment_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = headers
        .get("x-gateway-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_callback_signature(&state.callback_secret, &body, signature) {
        tracing::warn!("Payment callback with missing or invalid signature");
        return Err(ApiError(ShopError::Auth(
            "invalid callback signature".to_string(),
        )));
    }

    let payload: CallbackPayload = serde_json::from_slice(&body)
        .map_err(|e| ApiError(ShopError::Validation(format!("malformed callback: {}", e))))?;

    let paid = payload.status.eq_ignore_ascii_case("paid");
    let request =
        state
            .credit
            .confirm_payment(&payload.tracking_code, paid, payload.external_track_id)?;

    Ok(Json(serde_json::json!({
        "tracking_code": request.tracking_code,
        "status": request.status,
    })))
}

// ============== Admin ==============

#[derive(Debug, Deserialize)]
struct ApplyStatusRequest {
    status: CreditStatus,
    #[serde(default)]
    external_track_id: Option<String>,
}

async fn admin_apply_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyStatusRequest>,
) -> Result<Json<crate::types::CreditRequest>, ApiError> {
    require_admin(&state, &headers)?;
    let request = state
        .credit
        .apply_status(id, req.status, req.external_track_id)?;
    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
struct UpsertProductRequest {
    #[serde(default)]
    id: Option<Uuid>,
    title: String,
    price: Money,
    #[serde(default)]
    shipping_fee: Money,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    stock: u32,
}

async fn admin_upsert_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpsertProductRequest>,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let product = state.catalog.upsert(Product {
        id: req.id.unwrap_or_else(Uuid::new_v4),
        title: req.title,
        price: req.price,
        shipping_fee: req.shipping_fee,
        image_url: req.image_url,
        stock: req.stock,
        updated_at: chrono::Utc::now(),
    })?;
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

async fn list_products(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "products": state.catalog.list() }))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    state
        .catalog
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError(ShopError::ProductNotFound(id)))
}
