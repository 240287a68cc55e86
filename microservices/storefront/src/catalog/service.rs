//! Product Catalog
//!
//! Minimal catalog store backing checkout. Browsing, search and media are
//! handled elsewhere; checkout only needs existence checks and the
//! authoritative price.

use chrono::Utc;
use dashmap::DashMap;
use shop_core::{Money, Result, ShopError};
use std::sync::Arc;
use uuid::Uuid;

use crate::types::Product;

#[derive(Clone)]
pub struct ProductCatalog {
    products: Arc<DashMap<Uuid, Product>>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self {
            products: Arc::new(DashMap::new()),
        }
    }

    /// Insert or replace a product. The price must be positive; a product
    /// without a sellable price never enters the catalog.
    pub fn upsert(&self, mut product: Product) -> Result<Product> {
        if product.price <= 0 {
            return Err(ShopError::Validation(format!(
                "product {} must have a positive price",
                product.id
            )));
        }
        product.updated_at = Utc::now();
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    pub fn get(&self, product_id: Uuid) -> Option<Product> {
        self.products.get(&product_id).map(|p| p.value().clone())
    }

    pub fn exists(&self, product_id: Uuid) -> bool {
        self.products.contains_key(&product_id)
    }

    /// Authoritative unit price, read live at checkout time.
    pub fn get_price(&self, product_id: Uuid) -> Result<Money> {
        self.products
            .get(&product_id)
            .map(|p| p.price)
            .ok_or(ShopError::ProductNotFound(product_id))
    }

    /// All products, most recently updated first.
    pub fn list(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .map(|p| p.value().clone())
            .collect();
        products.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        products
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new()
    }
}
