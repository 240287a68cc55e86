//! Checkout Transaction
//!
//! Converts a cart into a persisted Order plus immutable line-item
//! snapshots. Prices are re-read from the catalog at submit time; for
//! wallet payments the debit and the order creation happen under the same
//! wallet lock, so either both are persisted or neither is.

use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use shop_core::{generate_order_number, Money, Result, ShopError};
use std::sync::Arc;
use uuid::Uuid;

use crate::addresses::AddressBook;
use crate::catalog::ProductCatalog;
use crate::types::{AddressSnapshot, Order, OrderItem, OrderStatus, PaymentMethod};
use crate::wallet::WalletLedger;

/// Order submission payload
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitOrder {
    /// "wallet", "installment" and "credit" all select the wallet path;
    /// anything else is a direct (online) payment.
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub shipping_fee: Money,
    #[serde(default)]
    pub address: Option<AddressSnapshot>,
    #[serde(default)]
    pub address_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<SubmitItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitItem {
    pub product: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Clone)]
pub struct CheckoutService {
    catalog: ProductCatalog,
    ledger: WalletLedger,
    addresses: AddressBook,
    orders: Arc<DashMap<Uuid, Order>>,
}

impl CheckoutService {
    pub fn new(catalog: ProductCatalog, ledger: WalletLedger, addresses: AddressBook) -> Self {
        Self {
            catalog,
            ledger,
            addresses,
            orders: Arc::new(DashMap::new()),
        }
    }

    /// Submit an order for the authenticated user.
    pub fn submit_order(&self, user_id: Uuid, submit: SubmitOrder) -> Result<Order> {
        if submit.items.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let is_wallet = matches!(
            submit.payment_method.trim().to_lowercase().as_str(),
            "wallet" | "installment" | "credit"
        );
        let shipping_fee = submit.shipping_fee.max(0);

        let address = self.resolve_address(user_id, &submit)?;

        // Price every line from the catalog before touching the wallet.
        let mut lines = Vec::with_capacity(submit.items.len());
        let mut subtotal: Money = 0;
        for item in &submit.items {
            if !self.catalog.exists(item.product) {
                return Err(ShopError::ProductNotFound(item.product));
            }
            if item.quantity == 0 {
                return Err(ShopError::InvalidQuantity {
                    product_id: item.product,
                    quantity: item.quantity as i64,
                });
            }
            // Authoritative price at submit time, never the client's number.
            let unit_price = self.catalog.get_price(item.product)?;
            let product = self
                .catalog
                .get(item.product)
                .ok_or(ShopError::ProductNotFound(item.product))?;

            subtotal += unit_price * item.quantity as Money;
            lines.push(OrderItem {
                product_id: product.id,
                title_snapshot: product.title,
                image_snapshot: product.image_url.unwrap_or_default(),
                quantity: item.quantity,
                unit_price,
            });
        }

        let total_payable = subtotal + shipping_fee;

        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            tracking_number: generate_order_number(),
            total_price: total_payable,
            shipping_fee,
            payment_method: if is_wallet {
                PaymentMethod::Wallet
            } else {
                PaymentMethod::Direct
            },
            status: if is_wallet {
                OrderStatus::Paid
            } else {
                OrderStatus::Pending
            },
            address,
            items: lines,
            created_at: Utc::now(),
        };

        if is_wallet {
            // Debit and order insert under the wallet lock: a failed funds
            // check leaves no order behind, and a concurrent debit cannot
            // race past the check.
            let orders = Arc::clone(&self.orders);
            let stored = order.clone();
            self.ledger.debit_with(user_id, total_payable, move |_| {
                orders.insert(stored.id, stored);
                Ok(())
            })?;
        } else {
            self.orders.insert(order.id, order.clone());
        }

        tracing::info!(
            user_id = %user_id,
            order_id = %order.id,
            tracking_number = %order.tracking_number,
            total_price = order.total_price,
            payment_method = ?order.payment_method,
            "Order created"
        );

        Ok(order)
    }

    fn resolve_address(&self, user_id: Uuid, submit: &SubmitOrder) -> Result<AddressSnapshot> {
        if let Some(mut address) = submit.address.clone() {
            if address.address_id.is_none() {
                address.address_id = submit.address_id;
            }
            return Ok(address);
        }

        if let Some(address_id) = submit.address_id {
            let stored = self
                .addresses
                .get(user_id, address_id)
                .ok_or_else(|| ShopError::NotFound(format!("address {}", address_id)))?;
            return Ok(AddressSnapshot {
                address_id: Some(stored.id),
                full_name: stored.full_name,
                phone_number: stored.phone_number,
                postal_code: stored.postal_code,
                city: stored.city,
                precise_address: stored.precise_address,
            });
        }

        Ok(AddressSnapshot::default())
    }

    /// The user's orders, newest first.
    pub fn list_orders(&self, user_id: Uuid) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .map(|o| o.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// A single order, ownership-checked.
    pub fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Option<Order> {
        self.orders
            .get(&order_id)
            .filter(|o| o.user_id == user_id)
            .map(|o| o.value().clone())
    }

    #[cfg(test)]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}
