//! Wallet Ledger
//!
//! Per-user stored balance used as an internal payment instrument.
//! Every mutation runs under the wallet's exclusive entry lock so the
//! read-check-write sequence can never interleave with a concurrent
//! debit: the balance is never persisted negative.

use chrono::Utc;
use dashmap::DashMap;
use shop_core::{Money, Result, ShopError};
use std::sync::Arc;
use uuid::Uuid;

use crate::types::Wallet;

#[derive(Clone)]
pub struct WalletLedger {
    wallets: Arc<DashMap<Uuid, Wallet>>,
}

impl WalletLedger {
    pub fn new() -> Self {
        Self {
            wallets: Arc::new(DashMap::new()),
        }
    }

    /// Current balance. Wallets are created lazily at zero on first access.
    pub fn balance(&self, user_id: Uuid) -> Money {
        self.wallets
            .entry(user_id)
            .or_insert_with(|| Wallet {
                user_id,
                balance: 0,
                updated_at: Utc::now(),
            })
            .balance
    }

    /// Debit `amount` from the user's wallet.
    ///
    /// Fails with `InsufficientFunds` (carrying the current balance and the
    /// shortfall) without touching the balance. The entry lock is held for
    /// the whole check-then-write, so two concurrent debits against the
    /// same wallet serialize.
    pub fn debit(&self, user_id: Uuid, amount: Money) -> Result<Money> {
        self.debit_with(user_id, amount, |_| Ok(()))
            .map(|(balance, ())| balance)
    }

    /// Debit `amount` and run `f` under the same wallet lock.
    ///
    /// The balance is only persisted after `f` succeeds, and `f` only runs
    /// after the funds check passes: either both effects happen or neither
    /// does. `f` must not re-enter the ledger for the same user.
    pub fn debit_with<T>(
        &self,
        user_id: Uuid,
        amount: Money,
        f: impl FnOnce(Money) -> Result<T>,
    ) -> Result<(Money, T)> {
        if amount <= 0 {
            return Err(ShopError::Validation(format!(
                "debit amount must be positive, got {}",
                amount
            )));
        }

        let mut wallet = self.wallets.entry(user_id).or_insert_with(|| Wallet {
            user_id,
            balance: 0,
            updated_at: Utc::now(),
        });

        if wallet.balance < amount {
            return Err(ShopError::InsufficientFunds {
                balance: wallet.balance,
                shortfall: amount - wallet.balance,
            });
        }

        let value = f(wallet.balance)?;

        wallet.balance -= amount;
        wallet.updated_at = Utc::now();
        let balance_after = wallet.balance;
        drop(wallet);

        tracing::info!(
            user_id = %user_id,
            amount = amount,
            balance = balance_after,
            "Wallet debited"
        );

        Ok((balance_after, value))
    }

    /// Credit `amount` to the user's wallet. Always succeeds for a
    /// positive amount, under the same lock discipline as `debit`.
    pub fn credit(&self, user_id: Uuid, amount: Money) -> Result<Money> {
        if amount <= 0 {
            return Err(ShopError::Validation(format!(
                "credit amount must be positive, got {}",
                amount
            )));
        }

        let mut wallet = self.wallets.entry(user_id).or_insert_with(|| Wallet {
            user_id,
            balance: 0,
            updated_at: Utc::now(),
        });

        wallet.balance += amount;
        wallet.updated_at = Utc::now();
        let balance_after = wallet.balance;
        drop(wallet);

        tracing::info!(
            user_id = %user_id,
            amount = amount,
            balance = balance_after,
            "Wallet credited"
        );

        Ok(balance_after)
    }
}

impl Default for WalletLedger {
    fn default() -> Self {
        Self::new()
    }
}
