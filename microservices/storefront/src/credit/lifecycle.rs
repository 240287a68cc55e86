//! Credit-Request Lifecycle
//!
//! Financing applications move through an explicit state machine:
//!
//! ```text
//! pending -> approved -> verifying -> completed
//! pending -> rejected
//! approved -> rejected
//! ```
//!
//! Status changes go through `apply_status`; there is no implicit
//! on-save hook. Entering `completed` runs the completion effects:
//! a one-time wallet credit and a one-time installment schedule. Both
//! are guarded so re-running the effects is harmless.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use shop_core::{generate_tracking_code, Money, Result, ShopError};
use std::sync::Arc;
use uuid::Uuid;

use crate::types::{CreditRequest, CreditStatus, DocumentRef, Installment};
use crate::wallet::WalletLedger;

pub const DEFAULT_INSTALLMENTS: u32 = 12;

/// Flat interest in percent: 8% on the standard 12-month plan, 12% on
/// everything else.
fn interest_rate_pct(installments: u32) -> i64 {
    if installments == 12 {
        8
    } else {
        12
    }
}

/// Total payable and monthly amount for a plan.
///
/// Integer arithmetic throughout; the monthly amount is floor-divided, so
/// the schedule can sum to slightly less than the total. That rounding
/// drift is accepted, not redistributed across installments. A zero
/// installment count is treated as a single payment rather than dividing
/// by zero; `create` still rejects it at the boundary.
pub fn installment_plan(amount: Money, installments: u32) -> (Money, Money) {
    let installments = installments.max(1);
    let rate_pct = interest_rate_pct(installments);
    let total_payable = amount + amount * rate_pct / 100;
    let monthly_amount = total_payable / installments as Money;
    (total_payable, monthly_amount)
}

fn can_transition(from: CreditStatus, to: CreditStatus) -> bool {
    use CreditStatus::*;
    matches!(
        (from, to),
        (Pending, Approved)
            | (Approved, Verifying)
            | (Verifying, Completed)
            | (Pending, Rejected)
            | (Approved, Rejected)
    )
}

/// Credit application payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewCreditRequest {
    pub amount: Money,
    #[serde(default)]
    pub installments: Option<u32>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub birth_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

#[derive(Clone)]
pub struct CreditLifecycle {
    ledger: WalletLedger,
    requests: Arc<DashMap<Uuid, CreditRequest>>,
    by_tracking_code: Arc<DashMap<String, Uuid>>,
    installments: Arc<DashMap<Uuid, Vec<Installment>>>,
}

impl CreditLifecycle {
    pub fn new(ledger: WalletLedger) -> Self {
        Self {
            ledger,
            requests: Arc::new(DashMap::new()),
            by_tracking_code: Arc::new(DashMap::new()),
            installments: Arc::new(DashMap::new()),
        }
    }

    pub fn create(&self, user_id: Uuid, new: NewCreditRequest) -> Result<CreditRequest> {
        if new.amount <= 0 {
            return Err(ShopError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        let installments = new.installments.unwrap_or(DEFAULT_INSTALLMENTS);
        if installments == 0 {
            return Err(ShopError::Validation(
                "installments must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let request = CreditRequest {
            id: Uuid::new_v4(),
            tracking_code: generate_tracking_code(),
            user_id,
            amount: new.amount,
            installments,
            status: CreditStatus::Pending,
            credited_to_wallet: false,
            full_name: new.full_name.trim().to_string(),
            national_id: new.national_id.trim().to_string(),
            birth_date: new.birth_date,
            documents: new.documents,
            external_track_id: None,
            payment_date: None,
            created_at: now,
            updated_at: now,
        };

        self.by_tracking_code
            .insert(request.tracking_code.clone(), request.id);
        self.requests.insert(request.id, request.clone());

        tracing::info!(
            user_id = %user_id,
            request_id = %request.id,
            tracking_code = %request.tracking_code,
            amount = request.amount,
            installments = request.installments,
            "Credit request created"
        );

        Ok(request)
    }

    /// Apply a status transition.
    ///
    /// Rejects anything outside the transition matrix. Entering
    /// `completed` runs the completion effects before returning.
    pub fn apply_status(
        &self,
        request_id: Uuid,
        new_status: CreditStatus,
        external_track_id: Option<String>,
    ) -> Result<CreditRequest> {
        {
            let mut request = self
                .requests
                .get_mut(&request_id)
                .ok_or_else(|| ShopError::NotFound(format!("credit request {}", request_id)))?;

            if !can_transition(request.status, new_status) {
                return Err(ShopError::Validation(format!(
                    "invalid credit status transition {:?} -> {:?}",
                    request.status, new_status
                )));
            }

            request.status = new_status;
            request.updated_at = Utc::now();
            if let Some(track_id) = external_track_id {
                request.external_track_id = Some(track_id);
                request.payment_date = Some(Utc::now());
            }

            tracing::info!(
                request_id = %request_id,
                tracking_code = %request.tracking_code,
                status = ?new_status,
                "Credit request status changed"
            );
        }

        if new_status == CreditStatus::Completed {
            self.run_completion_effects(request_id)?;
        }

        self.get_by_id(request_id)
            .ok_or_else(|| ShopError::NotFound(format!("credit request {}", request_id)))
    }

    /// Payment-gateway confirmation for a pending application.
    ///
    /// `paid` approves the request; anything else rejects it. The caller
    /// is the signed gateway callback, never an end user.
    pub fn confirm_payment(
        &self,
        tracking_code: &str,
        paid: bool,
        external_track_id: Option<String>,
    ) -> Result<CreditRequest> {
        let request_id = self
            .by_tracking_code
            .get(tracking_code)
            .map(|id| *id)
            .ok_or_else(|| ShopError::NotFound(format!("credit request {}", tracking_code)))?;

        let new_status = if paid {
            CreditStatus::Approved
        } else {
            CreditStatus::Rejected
        };
        self.apply_status(request_id, new_status, external_track_id)
    }

    /// Completion effects: wallet credit and installment generation.
    ///
    /// The two effects are independent; a failure in one does not block
    /// the other. `credited_to_wallet` and the presence of installment
    /// rows are the guards that make re-running this safe.
    pub fn run_completion_effects(&self, request_id: Uuid) -> Result<()> {
        let (user_id, amount, installments, tracking_code, already_credited) = {
            let request = self
                .requests
                .get(&request_id)
                .ok_or_else(|| ShopError::NotFound(format!("credit request {}", request_id)))?;
            if request.status != CreditStatus::Completed {
                return Ok(());
            }
            (
                request.user_id,
                request.amount,
                request.installments,
                request.tracking_code.clone(),
                request.credited_to_wallet,
            )
        };

        let mut credit_err = None;
        if !already_credited {
            match self.ledger.credit(user_id, amount) {
                Ok(balance) => {
                    if let Some(mut request) = self.requests.get_mut(&request_id) {
                        request.credited_to_wallet = true;
                        request.updated_at = Utc::now();
                    }
                    tracing::info!(
                        request_id = %request_id,
                        tracking_code = %tracking_code,
                        amount = amount,
                        balance = balance,
                        "Credit request amount credited to wallet"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %request_id,
                        error = %e,
                        "Wallet credit failed; installment generation continues"
                    );
                    credit_err = Some(e);
                }
            }
        }

        let already_generated = self
            .installments
            .get(&request_id)
            .map(|rows| !rows.is_empty())
            .unwrap_or(false);
        if !already_generated {
            let (total_payable, monthly_amount) = installment_plan(amount, installments);
            let start_date = Utc::now().date_naive();

            let rows: Vec<Installment> = (1..=installments)
                .map(|number| Installment {
                    credit_request_id: request_id,
                    number,
                    amount: monthly_amount,
                    due_date: start_date + Duration::days(30 * number as i64),
                    paid: false,
                    paid_at: None,
                })
                .collect();

            tracing::info!(
                request_id = %request_id,
                installments = installments,
                total_payable = total_payable,
                monthly_amount = monthly_amount,
                "Installment schedule generated"
            );
            self.installments.insert(request_id, rows);
        }

        match credit_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn get_by_id(&self, request_id: Uuid) -> Option<CreditRequest> {
        self.requests.get(&request_id).map(|r| r.value().clone())
    }

    /// Ownership-checked lookup.
    pub fn get(&self, user_id: Uuid, request_id: Uuid) -> Option<CreditRequest> {
        self.requests
            .get(&request_id)
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone())
    }

    /// The user's requests, newest first.
    pub fn list(&self, user_id: Uuid) -> Vec<CreditRequest> {
        let mut requests: Vec<CreditRequest> = self
            .requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone())
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }

    /// Installments for a request, ownership-checked, ordered by number.
    pub fn list_installments(&self, user_id: Uuid, request_id: Uuid) -> Result<Vec<Installment>> {
        self.get(user_id, request_id)
            .ok_or_else(|| ShopError::NotFound(format!("credit request {}", request_id)))?;
        Ok(self
            .installments
            .get(&request_id)
            .map(|rows| rows.value().clone())
            .unwrap_or_default())
    }
}
