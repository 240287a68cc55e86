//! Error types for shop services

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShopError>;

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Authorization error: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Empty cart")]
    EmptyCart,

    #[error("Insufficient funds: balance {balance}, short {shortfall}")]
    InsufficientFunds { balance: i64, shortfall: i64 },

    #[error("Product not found: {0}")]
    ProductNotFound(uuid::Uuid),

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity {
        product_id: uuid::Uuid,
        quantity: i64,
    },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::EmptyCart
            | Self::InvalidQuantity { .. } => 400,
            Self::InsufficientFunds { .. } => 402,
            Self::Auth(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) | Self::ProductNotFound(_) => 404,
            Self::Unavailable(_) => 503,
            _ => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Auth(_) => "AUTH_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::EmptyCart => "EMPTY_CART",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<std::io::Error> for ShopError {
    fn from(err: std::io::Error) -> Self {
        ShopError::Network(err.to_string())
    }
}
