//! Storefront Types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shop_core::Money;
use uuid::Uuid;

/// Catalog product
///
/// One authoritative `price` field. Checkout always re-reads it at submit
/// time; client-supplied prices are never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub price: Money,
    pub shipping_fee: Money,
    pub image_url: Option<String>,
    pub stock: u32,
    pub updated_at: DateTime<Utc>,
}

/// Per-user wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance: Money,
    pub updated_at: DateTime<Utc>,
}

/// Order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tracking_number: String,
    pub total_price: Money,
    pub shipping_fee: Money,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    /// Denormalized at creation time; later address edits never change
    /// past orders.
    pub address: AddressSnapshot,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Wallet,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Canceled,
}

/// Immutable line-item snapshot taken at purchase time.
///
/// Decoupled from the live product record, which may change price or be
/// removed later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub title_snapshot: String,
    pub image_snapshot: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Address captured on the order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_id: Option<Uuid>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub precise_address: String,
}

/// Stored user address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAddress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub national_code: String,
    pub postal_code: String,
    pub city: String,
    pub precise_address: String,
    pub created_at: DateTime<Utc>,
}

/// Credit financing application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditRequest {
    pub id: Uuid,
    pub tracking_code: String,
    pub user_id: Uuid,
    pub amount: Money,
    pub installments: u32,
    pub status: CreditStatus,
    /// Goes false -> true at most once, when the request completes.
    pub credited_to_wallet: bool,
    pub full_name: String,
    pub national_id: String,
    pub birth_date: Option<NaiveDate>,
    pub documents: Vec<DocumentRef>,
    pub external_track_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    Pending,
    Approved,
    Verifying,
    Completed,
    Rejected,
}

impl CreditStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

/// Supporting document reference (stored externally, only linked here)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    NationalCardFront,
    NationalCardBack,
    SalarySlip,
    BankStatement,
    BirthCertificate,
}

/// One scheduled repayment of a completed credit request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    pub credit_request_id: Uuid,
    pub number: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}
