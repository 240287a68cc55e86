//! Address Book
//!
//! Stored delivery addresses, capped at five per user. Digit fields are
//! normalized from Persian/Arabic-Indic keyboards before validation.

use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use shop_core::{digits_only, Result, ShopError};
use std::sync::Arc;
use uuid::Uuid;

use crate::types::UserAddress;

pub const MAX_ADDRESSES_PER_USER: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
    pub full_name: String,
    pub phone_number: String,
    pub national_code: String,
    pub postal_code: String,
    #[serde(default = "default_city")]
    pub city: String,
    pub precise_address: String,
}

fn default_city() -> String {
    "تهران".to_string()
}

/// Normalized `(phone_number, national_code, postal_code)` or the first
/// validation failure. Every write path goes through this.
fn validate_digit_fields(new: &NewAddress) -> Result<(String, String, String)> {
    let phone_number = digits_only(&new.phone_number);
    if phone_number.len() != 11 {
        return Err(ShopError::Validation(
            "phone_number must be exactly 11 digits".to_string(),
        ));
    }
    let national_code = digits_only(&new.national_code);
    if national_code.len() != 10 {
        return Err(ShopError::Validation(
            "national_code must be exactly 10 digits".to_string(),
        ));
    }
    let postal_code = digits_only(&new.postal_code);
    if postal_code.len() != 10 {
        return Err(ShopError::Validation(
            "postal_code must be exactly 10 digits".to_string(),
        ));
    }
    Ok((phone_number, national_code, postal_code))
}

#[derive(Clone)]
pub struct AddressBook {
    addresses: Arc<DashMap<Uuid, UserAddress>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self {
            addresses: Arc::new(DashMap::new()),
        }
    }

    pub fn create(&self, user_id: Uuid, new: NewAddress) -> Result<UserAddress> {
        let (phone_number, national_code, postal_code) = validate_digit_fields(&new)?;

        if self.list(user_id).len() >= MAX_ADDRESSES_PER_USER {
            return Err(ShopError::Validation("max_addresses_reached".to_string()));
        }

        let address = UserAddress {
            id: Uuid::new_v4(),
            user_id,
            full_name: new.full_name.trim().to_string(),
            phone_number,
            national_code,
            postal_code,
            city: new.city.trim().to_string(),
            precise_address: new.precise_address.trim().to_string(),
            created_at: Utc::now(),
        };

        self.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    /// The user's addresses, newest first.
    pub fn list(&self, user_id: Uuid) -> Vec<UserAddress> {
        let mut addresses: Vec<UserAddress> = self
            .addresses
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.value().clone())
            .collect();
        addresses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        addresses
    }

    /// Ownership-checked lookup.
    pub fn get(&self, user_id: Uuid, address_id: Uuid) -> Option<UserAddress> {
        self.addresses
            .get(&address_id)
            .filter(|a| a.user_id == user_id)
            .map(|a| a.value().clone())
    }

    /// Replace every field of a stored address, ownership-checked. The
    /// same normalization and length checks as `create` apply; the id
    /// and creation time are kept.
    pub fn update(&self, user_id: Uuid, address_id: Uuid, new: NewAddress) -> Result<UserAddress> {
        let (phone_number, national_code, postal_code) = validate_digit_fields(&new)?;

        let mut address = self
            .addresses
            .get_mut(&address_id)
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| ShopError::NotFound(format!("address {}", address_id)))?;

        address.full_name = new.full_name.trim().to_string();
        address.phone_number = phone_number;
        address.national_code = national_code;
        address.postal_code = postal_code;
        address.city = new.city.trim().to_string();
        address.precise_address = new.precise_address.trim().to_string();

        Ok(address.value().clone())
    }

    pub fn delete(&self, user_id: Uuid, address_id: Uuid) -> Result<()> {
        match self.get(user_id, address_id) {
            Some(_) => {
                self.addresses.remove(&address_id);
                Ok(())
            }
            None => Err(ShopError::NotFound(format!("address {}", address_id))),
        }
    }
}

impl Default for AddressBook {
    fn default() -> Self {
        Self::new()
    }
}
