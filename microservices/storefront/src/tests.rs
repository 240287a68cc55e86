//! Unit tests for Storefront Service

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::addresses::{AddressBook, NewAddress};
    use crate::catalog::ProductCatalog;
    use crate::checkout::{CheckoutService, SubmitItem, SubmitOrder};
    use crate::credit::{installment_plan, CreditLifecycle, NewCreditRequest};
    use crate::types::{CreditStatus, OrderStatus, PaymentMethod, Product};
    use crate::wallet::WalletLedger;
    use shop_core::ShopError;

    fn setup() -> (ProductCatalog, WalletLedger, AddressBook, CheckoutService, CreditLifecycle) {
        let catalog = ProductCatalog::new();
        let ledger = WalletLedger::new();
        let addresses = AddressBook::new();
        let checkout = CheckoutService::new(catalog.clone(), ledger.clone(), addresses.clone());
        let credit = CreditLifecycle::new(ledger.clone());
        (catalog, ledger, addresses, checkout, credit)
    }

    fn seed_product(catalog: &ProductCatalog, price: i64) -> Uuid {
        let id = Uuid::new_v4();
        catalog
            .upsert(Product {
                id,
                title: "گوشی موبایل".to_string(),
                price,
                shipping_fee: 0,
                image_url: Some("https://cdn.example/phone.jpg".to_string()),
                stock: 10,
                updated_at: Utc::now(),
            })
            .expect("valid product");
        id
    }

    fn wallet_order(product: Uuid, quantity: u32, shipping_fee: i64) -> SubmitOrder {
        SubmitOrder {
            payment_method: "wallet".to_string(),
            shipping_fee,
            address: None,
            address_id: None,
            items: vec![SubmitItem { product, quantity }],
        }
    }

    // ============== Wallet ledger ==============

    #[test]
    fn debit_insufficient_carries_balance_and_shortfall() {
        let ledger = WalletLedger::new();
        let user = Uuid::new_v4();
        ledger.credit(user, 100).unwrap();

        let err = ledger.debit(user, 250).unwrap_err();
        match err {
            ShopError::InsufficientFunds { balance, shortfall } => {
                assert_eq!(balance, 100);
                assert_eq!(shortfall, 150);
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(ledger.balance(user), 100);
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let ledger = WalletLedger::new();
        let user = Uuid::new_v4();
        assert!(ledger.debit(user, 0).is_err());
        assert!(ledger.debit(user, -5).is_err());
        assert!(ledger.credit(user, 0).is_err());
        assert!(ledger.credit(user, -5).is_err());
    }

    #[test]
    fn concurrent_debits_never_go_negative() {
        let ledger = WalletLedger::new();
        let user = Uuid::new_v4();
        ledger.credit(user, 100).unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.debit(user, 30).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().expect("debit thread panicked"))
            .filter(|ok| *ok)
            .count();

        // 100 / 30 = at most 3 debits can fit.
        assert_eq!(successes, 3);
        assert_eq!(ledger.balance(user), 100 - 30 * successes as i64);
    }

    // ============== Checkout ==============

    #[test]
    fn empty_cart_rejected_and_nothing_persisted() {
        let (_, _, _, checkout, _) = setup();
        let user = Uuid::new_v4();

        let err = checkout
            .submit_order(
                user,
                SubmitOrder {
                    payment_method: "wallet".to_string(),
                    shipping_fee: 0,
                    address: None,
                    address_id: None,
                    items: vec![],
                },
            )
            .unwrap_err();

        assert!(matches!(err, ShopError::EmptyCart));
        assert_eq!(checkout.order_count(), 0);
    }

    #[test]
    fn wallet_checkout_insufficient_leaves_no_partial_state() {
        let (catalog, ledger, _, checkout, _) = setup();
        let user = Uuid::new_v4();
        let product = seed_product(&catalog, 500_000);
        ledger.credit(user, 400_000).unwrap();

        let err = checkout
            .submit_order(user, wallet_order(product, 1, 30_000))
            .unwrap_err();

        match err {
            ShopError::InsufficientFunds { balance, shortfall } => {
                assert_eq!(balance, 400_000);
                assert_eq!(shortfall, 130_000);
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(checkout.order_count(), 0);
        assert_eq!(ledger.balance(user), 400_000);
    }

    #[test]
    fn wallet_checkout_debits_exactly_and_creates_paid_order() {
        let (catalog, ledger, _, checkout, _) = setup();
        let user = Uuid::new_v4();
        let product = seed_product(&catalog, 150_000);
        ledger.credit(user, 1_000_000).unwrap();

        let order = checkout
            .submit_order(user, wallet_order(product, 2, 30_000))
            .unwrap();

        assert_eq!(order.total_price, 330_000);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_method, PaymentMethod::Wallet);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].unit_price, 150_000);
        assert!(order.tracking_number.starts_with("TRK-"));
        assert_eq!(ledger.balance(user), 1_000_000 - 330_000);
        assert_eq!(checkout.order_count(), 1);
    }

    #[test]
    fn installment_alias_selects_wallet_path() {
        let (catalog, ledger, _, checkout, _) = setup();
        let user = Uuid::new_v4();
        let product = seed_product(&catalog, 100_000);
        ledger.credit(user, 200_000).unwrap();

        let mut submit = wallet_order(product, 1, 0);
        submit.payment_method = "installment".to_string();
        let order = checkout.submit_order(user, submit).unwrap();

        assert_eq!(order.payment_method, PaymentMethod::Wallet);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(ledger.balance(user), 100_000);
    }

    #[test]
    fn direct_checkout_is_pending_and_leaves_wallet_alone() {
        let (catalog, ledger, _, checkout, _) = setup();
        let user = Uuid::new_v4();
        let product = seed_product(&catalog, 100_000);
        ledger.credit(user, 50_000).unwrap();

        let mut submit = wallet_order(product, 1, 0);
        submit.payment_method = "direct".to_string();
        let order = checkout.submit_order(user, submit).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_method, PaymentMethod::Direct);
        assert_eq!(ledger.balance(user), 50_000);
    }

    #[test]
    fn checkout_uses_live_catalog_price() {
        let (catalog, ledger, _, checkout, _) = setup();
        let user = Uuid::new_v4();
        let product = seed_product(&catalog, 100_000);
        ledger.credit(user, 1_000_000).unwrap();

        // Price changes between browsing and checkout; the order charges
        // the price at submit time.
        let mut updated = catalog.get(product).unwrap();
        updated.price = 120_000;
        catalog.upsert(updated).unwrap();

        let order = checkout.submit_order(user, wallet_order(product, 1, 0)).unwrap();
        assert_eq!(order.items[0].unit_price, 120_000);
        assert_eq!(ledger.balance(user), 880_000);
    }

    #[test]
    fn unknown_product_and_zero_quantity_rejected() {
        let (catalog, ledger, _, checkout, _) = setup();
        let user = Uuid::new_v4();
        ledger.credit(user, 1_000_000).unwrap();

        let missing = Uuid::new_v4();
        let err = checkout
            .submit_order(user, wallet_order(missing, 1, 0))
            .unwrap_err();
        assert!(matches!(err, ShopError::ProductNotFound(id) if id == missing));

        let product = seed_product(&catalog, 100_000);
        let err = checkout
            .submit_order(user, wallet_order(product, 0, 0))
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidQuantity { .. }));
        assert_eq!(checkout.order_count(), 0);
        assert_eq!(ledger.balance(user), 1_000_000);
    }

    #[test]
    fn item_snapshot_survives_product_change() {
        let (catalog, ledger, _, checkout, _) = setup();
        let user = Uuid::new_v4();
        let product = seed_product(&catalog, 100_000);
        ledger.credit(user, 200_000).unwrap();

        let order = checkout.submit_order(user, wallet_order(product, 1, 0)).unwrap();

        let mut updated = catalog.get(product).unwrap();
        updated.title = "عنوان جدید".to_string();
        updated.price = 999_999;
        catalog.upsert(updated).unwrap();

        let stored = checkout.get_order(user, order.id).unwrap();
        assert_eq!(stored.items[0].title_snapshot, "گوشی موبایل");
        assert_eq!(stored.items[0].unit_price, 100_000);
    }

    // ============== Catalog ==============

    #[test]
    fn catalog_lists_all_products() {
        let (catalog, _, _, _, _) = setup();
        assert!(catalog.list().is_empty());

        let first = seed_product(&catalog, 100_000);
        let second = seed_product(&catalog, 250_000);

        let products = catalog.list();
        assert_eq!(products.len(), 2);
        assert!(products.iter().any(|p| p.id == first));
        assert!(products.iter().any(|p| p.id == second));
        assert!(catalog.exists(first));
        assert_eq!(catalog.get_price(second).unwrap(), 250_000);
    }

    // ============== Credit lifecycle ==============

    fn new_request(amount: i64, installments: u32) -> NewCreditRequest {
        NewCreditRequest {
            amount,
            installments: Some(installments),
            full_name: "علی رضایی".to_string(),
            national_id: "0012345678".to_string(),
            birth_date: None,
            documents: vec![],
        }
    }

    fn complete_request(credit: &CreditLifecycle, request_id: Uuid) {
        credit
            .apply_status(request_id, CreditStatus::Approved, None)
            .unwrap();
        credit
            .apply_status(request_id, CreditStatus::Verifying, None)
            .unwrap();
        credit
            .apply_status(request_id, CreditStatus::Completed, None)
            .unwrap();
    }

    #[test]
    fn completion_credits_wallet_and_generates_schedule() {
        let (_, ledger, _, _, credit) = setup();
        let user = Uuid::new_v4();
        let request = credit.create(user, new_request(1_000_000, 12)).unwrap();
        assert_eq!(request.status, CreditStatus::Pending);
        assert!(!request.credited_to_wallet);

        complete_request(&credit, request.id);

        let completed = credit.get(user, request.id).unwrap();
        assert_eq!(completed.status, CreditStatus::Completed);
        assert!(completed.credited_to_wallet);
        assert_eq!(ledger.balance(user), 1_000_000);

        let rows = credit.list_installments(user, request.id).unwrap();
        assert_eq!(rows.len(), 12);
        // 8% on the 12-month plan: 1_080_000 / 12 = 90_000
        assert!(rows.iter().all(|i| i.amount == 90_000));
        assert!(rows.iter().all(|i| !i.paid));

        let today = Utc::now().date_naive();
        for row in &rows {
            assert_eq!(
                row.due_date,
                today + Duration::days(30 * row.number as i64)
            );
        }
    }

    #[test]
    fn completion_effects_are_idempotent() {
        let (_, ledger, _, _, credit) = setup();
        let user = Uuid::new_v4();
        let request = credit.create(user, new_request(1_000_000, 12)).unwrap();

        complete_request(&credit, request.id);
        // Re-running the effects (a retried save in the original design)
        // must not double-credit or regenerate the schedule.
        credit.run_completion_effects(request.id).unwrap();
        credit.run_completion_effects(request.id).unwrap();

        assert_eq!(ledger.balance(user), 1_000_000);
        assert_eq!(credit.list_installments(user, request.id).unwrap().len(), 12);
    }

    #[test]
    fn six_month_plan_uses_higher_rate_with_accepted_drift() {
        let (_, _, _, _, credit) = setup();
        let user = Uuid::new_v4();
        let request = credit.create(user, new_request(1_000_000, 6)).unwrap();
        complete_request(&credit, request.id);

        let rows = credit.list_installments(user, request.id).unwrap();
        assert_eq!(rows.len(), 6);
        // 12% on non-standard plans: floor(1_120_000 / 6) = 186_666.
        assert!(rows.iter().all(|i| i.amount == 186_666));
        // The schedule sums 4 units short of the total payable; the
        // rounding remainder is absorbed, not redistributed.
        let sum: i64 = rows.iter().map(|i| i.amount).sum();
        assert_eq!(sum, 1_119_996);
        assert_eq!(installment_plan(1_000_000, 6).0 - sum, 4);
    }

    #[test]
    fn installment_plan_math() {
        assert_eq!(installment_plan(1_000_000, 12), (1_080_000, 90_000));
        assert_eq!(installment_plan(1_000_000, 6), (1_120_000, 186_666));
    }

    #[test]
    fn zero_installment_count_collapses_to_single_payment() {
        // Never divides by zero, even for callers that skip `create`.
        assert_eq!(installment_plan(1_000_000, 0), (1_120_000, 1_120_000));
        assert_eq!(installment_plan(1_000_000, 0), installment_plan(1_000_000, 1));
    }

    #[test]
    fn transition_matrix_enforced() {
        let (_, _, _, _, credit) = setup();
        let user = Uuid::new_v4();
        let request = credit.create(user, new_request(500_000, 12)).unwrap();

        // Straight to completed is not allowed from pending.
        assert!(credit
            .apply_status(request.id, CreditStatus::Completed, None)
            .is_err());

        credit
            .apply_status(request.id, CreditStatus::Approved, None)
            .unwrap();
        // Approved can still be rejected.
        credit
            .apply_status(request.id, CreditStatus::Rejected, None)
            .unwrap();
        // Rejected is terminal.
        assert!(credit
            .apply_status(request.id, CreditStatus::Approved, None)
            .is_err());
    }

    #[test]
    fn gateway_confirmation_approves_or_rejects() {
        let (_, _, _, _, credit) = setup();
        let user = Uuid::new_v4();

        let paid = credit.create(user, new_request(500_000, 12)).unwrap();
        let confirmed = credit
            .confirm_payment(&paid.tracking_code, true, Some("A0001234".to_string()))
            .unwrap();
        assert_eq!(confirmed.status, CreditStatus::Approved);
        assert_eq!(confirmed.external_track_id.as_deref(), Some("A0001234"));
        assert!(confirmed.payment_date.is_some());

        let failed = credit.create(user, new_request(500_000, 12)).unwrap();
        let rejected = credit
            .confirm_payment(&failed.tracking_code, false, None)
            .unwrap();
        assert_eq!(rejected.status, CreditStatus::Rejected);

        assert!(credit.confirm_payment("NO5UCHC0DE00", true, None).is_err());
    }

    #[test]
    fn rejected_request_credits_nothing() {
        let (_, ledger, _, _, credit) = setup();
        let user = Uuid::new_v4();
        let request = credit.create(user, new_request(500_000, 12)).unwrap();

        credit
            .apply_status(request.id, CreditStatus::Rejected, None)
            .unwrap();

        assert_eq!(ledger.balance(user), 0);
        assert!(credit
            .list_installments(user, request.id)
            .unwrap()
            .is_empty());
    }

    // ============== Address book ==============

    fn valid_address() -> NewAddress {
        NewAddress {
            full_name: "علی رضایی".to_string(),
            phone_number: "۰۹۱۲۳۴۵۶۷۸۹".to_string(),
            national_code: "0012345678".to_string(),
            postal_code: "1234567890".to_string(),
            city: "تهران".to_string(),
            precise_address: "خیابان ولیعصر".to_string(),
        }
    }

    #[test]
    fn address_digits_normalized_before_validation() {
        let (_, _, addresses, _, _) = setup();
        let user = Uuid::new_v4();

        let created = addresses.create(user, valid_address()).unwrap();
        assert_eq!(created.phone_number, "09123456789");

        let mut short_phone = valid_address();
        short_phone.phone_number = "0912".to_string();
        assert!(addresses.create(user, short_phone).is_err());
    }

    #[test]
    fn address_cap_is_five() {
        let (_, _, addresses, _, _) = setup();
        let user = Uuid::new_v4();

        for _ in 0..5 {
            addresses.create(user, valid_address()).unwrap();
        }
        let err = addresses.create(user, valid_address()).unwrap_err();
        assert!(matches!(err, ShopError::Validation(msg) if msg == "max_addresses_reached"));
    }

    #[test]
    fn address_update_revalidates_and_keeps_identity() {
        let (_, _, addresses, _, _) = setup();
        let user = Uuid::new_v4();
        let created = addresses.create(user, valid_address()).unwrap();

        let mut changed = valid_address();
        changed.full_name = "مریم احمدی".to_string();
        changed.phone_number = "۰۹۳۵۱۱۱۲۲۳۳".to_string();
        let updated = addresses.update(user, created.id, changed).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.full_name, "مریم احمدی");
        // Persian digits normalized on update, same as on create.
        assert_eq!(updated.phone_number, "09351112233");

        let mut bad = valid_address();
        bad.postal_code = "123".to_string();
        assert!(addresses.update(user, created.id, bad).is_err());
        // A failed update leaves the stored row untouched.
        assert_eq!(
            addresses.get(user, created.id).unwrap().phone_number,
            "09351112233"
        );
    }

    #[test]
    fn address_update_and_get_are_ownership_checked() {
        let (_, _, addresses, _, _) = setup();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let address = addresses.create(owner, valid_address()).unwrap();

        assert!(addresses.get(stranger, address.id).is_none());
        assert!(addresses
            .update(stranger, address.id, valid_address())
            .is_err());
        assert_eq!(
            addresses.get(owner, address.id).unwrap().full_name,
            "علی رضایی"
        );
    }

    #[test]
    fn address_delete_is_ownership_checked() {
        let (_, _, addresses, _, _) = setup();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let address = addresses.create(owner, valid_address()).unwrap();
        assert!(addresses.delete(stranger, address.id).is_err());
        addresses.delete(owner, address.id).unwrap();
        assert!(addresses.list(owner).is_empty());
    }

    #[test]
    fn checkout_resolves_stored_address_into_snapshot() {
        let (catalog, ledger, addresses, checkout, _) = setup();
        let user = Uuid::new_v4();
        let product = seed_product(&catalog, 100_000);
        ledger.credit(user, 200_000).unwrap();

        let stored = addresses.create(user, valid_address()).unwrap();
        let mut submit = wallet_order(product, 1, 0);
        submit.address_id = Some(stored.id);

        let order = checkout.submit_order(user, submit).unwrap();
        assert_eq!(order.address.address_id, Some(stored.id));
        assert_eq!(order.address.phone_number, "09123456789");
        assert_eq!(order.address.full_name, "علی رضایی");
    }
}
