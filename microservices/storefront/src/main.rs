//! Storefront Service
//!
//! E-commerce backend for the installment shop:
//! - Product catalog store backing checkout
//! - Wallet ledger (per-user balance, locked mutations)
//! - Checkout transaction with line-item snapshots
//! - Credit-request lifecycle with installment generation
//! - Address book with digit normalization
//! - Payment-gateway client and HMAC-verified callback

#![allow(dead_code)]

use shop_core::{HealthStatus, ReadinessStatus, Result, ServiceRuntime, ShopService};
use std::sync::Arc;
use tracing::info;

mod addresses;
mod api;
mod catalog;
mod checkout;
mod credit;
mod gateway;
mod types;
mod wallet;

#[cfg(test)]
mod tests;

pub use addresses::AddressBook;
pub use catalog::ProductCatalog;
pub use checkout::CheckoutService;
pub use credit::CreditLifecycle;
pub use types::*;
pub use wallet::WalletLedger;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storefront=debug".parse().expect("valid tracing directive")),
        )
        .json()
        .init();

    info!("Starting Storefront Service");

    let service = Arc::new(StorefrontService::new()?);
    ServiceRuntime::run(service).await
}

pub struct StorefrontService {
    config: StorefrontConfig,
    state: api::rest::AppState,
    start_time: std::time::Instant,
    stop: Arc<tokio::sync::Notify>,
}

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub http_bind: String,
    pub gateway_merchant_id: Option<String>,
    pub gateway_callback_secret: String,
    pub gateway_callback_url: String,
    pub admin_token: String,
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_bind: std::env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            gateway_merchant_id: std::env::var("GATEWAY_MERCHANT_ID").ok(),
            gateway_callback_secret: std::env::var("GATEWAY_CALLBACK_SECRET")
                .unwrap_or_default(),
            gateway_callback_url: std::env::var("GATEWAY_CALLBACK_URL")
                .unwrap_or_else(|_| "http://localhost:8080/v1/payments/callback".to_string()),
            admin_token: std::env::var("ADMIN_TOKEN").unwrap_or_default(),
        })
    }
}

impl StorefrontService {
    pub fn new() -> Result<Self> {
        let config = StorefrontConfig::from_env()?;

        let catalog = ProductCatalog::new();
        let ledger = WalletLedger::new();
        let addresses = AddressBook::new();
        let checkout = CheckoutService::new(catalog.clone(), ledger.clone(), addresses.clone());
        let credit = CreditLifecycle::new(ledger.clone());

        let gateway_client: Option<Arc<dyn gateway::PaymentGateway>> =
            config.gateway_merchant_id.clone().map(|merchant_id| {
                info!("Zarinpal gateway initialized");
                Arc::new(gateway::ZarinpalGateway::new(merchant_id))
                    as Arc<dyn gateway::PaymentGateway>
            });

        if config.gateway_callback_secret.is_empty() {
            tracing::warn!("GATEWAY_CALLBACK_SECRET is empty; payment callbacks will be rejected");
        }

        let state = api::rest::AppState {
            catalog,
            ledger,
            checkout,
            credit,
            addresses,
            gateway: gateway_client,
            callback_secret: config.gateway_callback_secret.clone(),
            callback_url: config.gateway_callback_url.clone(),
            admin_token: config.admin_token.clone(),
        };

        Ok(Self {
            config,
            state,
            start_time: std::time::Instant::now(),
            stop: Arc::new(tokio::sync::Notify::new()),
        })
    }
}

#[async_trait::async_trait]
impl ShopService for StorefrontService {
    fn service_id(&self) -> &'static str {
        "storefront"
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: self.service_id().to_string(),
            version: self.version().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn ready(&self) -> ReadinessStatus {
        ReadinessStatus {
            ready: true,
            dependencies: vec![shop_core::DependencyStatus {
                name: "payment-gateway".to_string(),
                available: self.state.gateway.is_some(),
                latency_ms: None,
            }],
        }
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Storefront Service");
        self.stop.notify_waiters();
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        info!(http = %self.config.http_bind, "Starting Storefront HTTP server");

        let router = api::rest::create_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&self.config.http_bind).await?;
        let stop = Arc::clone(&self.stop);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { stop.notified().await })
            .await?;

        Ok(())
    }
}
