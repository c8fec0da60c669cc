//! Workflow tests against the in-memory store.
//!
//! Verifies:
//! - Order creation and cancellation are exact inverses
//! - Failed workflows leave no partial writes
//! - Concurrent orders cannot oversell stock
//! - Capability checks and the authentication gate

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use bazaar_auth::{Actor, Hs256TokenService, Role};
    use bazaar_core::{Category, DomainError, MAX_PRICE, Money, UserId};
    use bazaar_parties::{AccountStatus, NewUser, User, Vendor, VendorStatus};
    use bazaar_products::{NewProduct, Product, ProductStatus};
    use bazaar_sales::{
        Amounts, CustomerInfo, Order, OrderRequest, OrderStatus, PaymentMethod, PaymentStatus,
        RequestedItem,
    };

    use crate::marketplace::{
        LoginInput, Marketplace, RegisterVendorInput, ServiceError, SignupInput, StatusUpdateInput,
    };
    use crate::store::{InMemoryStore, Store};

    const SECRET: &[u8] = b"integration-test-secret";

    fn setup() -> (Marketplace, Arc<Hs256TokenService>) {
        let tokens = Arc::new(Hs256TokenService::new(SECRET, Duration::hours(1)));
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        (Marketplace::new(store, tokens.clone()), tokens)
    }

    fn domain(err: ServiceError) -> DomainError {
        match err {
            ServiceError::Domain(e) => e,
            other => panic!("expected a domain error, got {other:?}"),
        }
    }

    async fn signup(market: &Marketplace, email: &str) -> User {
        market
            .signup(SignupInput {
                name: "Test User".to_string(),
                email: email.to_string(),
                password: "secret123".to_string(),
                ..SignupInput::default()
            })
            .await
            .unwrap()
            .user
    }

    async fn admin(market: &Marketplace) -> Actor {
        let user = User::register(
            NewUser {
                name: "Admin".to_string(),
                email: "admin@bazaar.test".to_string(),
                password_hash: "unused".to_string(),
                phone: None,
                address: None,
                role: Role::Admin,
            },
            Utc::now(),
        )
        .unwrap();
        let mut uow = market.store().begin().await.unwrap();
        uow.save_user(&user).await.unwrap();
        uow.commit().await.unwrap();
        user.actor()
    }

    async fn reload_user(market: &Marketplace, id: UserId) -> User {
        market.store().user(id).await.unwrap().unwrap()
    }

    /// Registers and approves a vendor, returning the promoted actor.
    async fn approved_vendor(market: &Marketplace, admin: &Actor, email: &str) -> (Actor, Vendor) {
        let user = signup(market, email).await;
        let vendor = market
            .register_vendor(
                &user.actor(),
                RegisterVendorInput {
                    store_name: format!("Store of {email}"),
                    category: Some(Category::Electronics),
                    ..RegisterVendorInput::default()
                },
            )
            .await
            .unwrap();
        let vendor = market
            .approve_vendor(admin, vendor.id, VendorStatus::Active)
            .await
            .unwrap();
        (reload_user(market, user.id).await.actor(), vendor)
    }

    async fn product(market: &Marketplace, vendor: &Actor, price: Money, stock: u32) -> Product {
        market
            .create_product(
                vendor,
                NewProduct {
                    name: "Headphones".to_string(),
                    description: None,
                    price,
                    original_price: None,
                    discount: None,
                    category: Some(Category::Electronics),
                    images: vec!["/img/headphones.png".to_string()],
                    stock,
                    specifications: BTreeMap::new(),
                },
            )
            .await
            .unwrap()
    }

    fn request(lines: &[(&Product, u32)], method: PaymentMethod) -> OrderRequest {
        let subtotal: Money = lines.iter().map(|(p, q)| p.price * Money::from(*q)).sum();
        OrderRequest {
            items: lines
                .iter()
                .map(|(p, q)| RequestedItem {
                    product_id: p.id,
                    quantity: *q,
                    price: Some(p.price),
                })
                .collect(),
            customer_info: Some(CustomerInfo {
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                ..CustomerInfo::default()
            }),
            amounts: Amounts {
                subtotal,
                service_fee: 500,
                gst: 0,
                total: subtotal + 500,
            },
            payment_method: Some(method),
        }
    }

    struct Snapshot {
        products: Vec<Product>,
        vendors: Vec<Vendor>,
        user: User,
    }

    async fn snapshot(market: &Marketplace, products: &[&Product], user: UserId) -> Snapshot {
        let mut ps = Vec::new();
        let mut vs = Vec::new();
        for p in products {
            let p = market.store().product(p.id).await.unwrap().unwrap();
            vs.push(market.store().vendor(p.vendor_id).await.unwrap().unwrap());
            ps.push(p);
        }
        Snapshot {
            products: ps,
            vendors: vs,
            user: reload_user(market, user).await,
        }
    }

    fn assert_counters_equal(before: &Snapshot, after: &Snapshot) {
        for (b, a) in before.products.iter().zip(&after.products) {
            assert_eq!((b.stock, b.sold, b.status), (a.stock, a.sold, a.status));
        }
        for (b, a) in before.vendors.iter().zip(&after.vendors) {
            assert_eq!(b.total_revenue, a.total_revenue);
        }
        assert_eq!(before.user.order_count, after.user.order_count);
        assert_eq!(before.user.total_spent, after.user.total_spent);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Order lifecycle
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn order_creation_updates_every_counter() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, vendor) = approved_vendor(&market, &admin, "seller@example.com").await;
        let item = product(&market, &seller, 10_000, 5).await;
        let buyer = signup(&market, "buyer@example.com").await;

        let order = market
            .create_order(&buyer.actor(), request(&[(&item, 2)], PaymentMethod::Upi))
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.items[0].vendor_name, vendor.store_name);
        assert_eq!(order.items[0].image.as_deref(), Some("/img/headphones.png"));

        let stored = market.store().product(item.id).await.unwrap().unwrap();
        assert_eq!((stored.stock, stored.sold), (3, 2));
        let vendor = market.store().vendor(vendor.id).await.unwrap().unwrap();
        assert_eq!(vendor.total_revenue, 20_000);
        let buyer = reload_user(&market, buyer.id).await;
        assert_eq!((buyer.order_count, buyer.total_spent), (1, 20_500));
    }

    #[tokio::test]
    async fn cancel_exactly_reverses_creation() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let (other_seller, _) = approved_vendor(&market, &admin, "other@example.com").await;
        let a = product(&market, &seller, 2_500, 2).await;
        let b = product(&market, &other_seller, 999, 10).await;
        let buyer = signup(&market, "buyer@example.com").await;

        let before = snapshot(&market, &[&a, &b], buyer.id).await;
        let order = market
            .create_order(&buyer.actor(), request(&[(&a, 2), (&b, 3)], PaymentMethod::Cod))
            .await
            .unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        let sold_out = market.store().product(a.id).await.unwrap().unwrap();
        assert_eq!(sold_out.status, ProductStatus::OutOfStock);

        let cancelled = market.cancel_order(&buyer.actor(), order.id).await.unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        let last = cancelled.tracking().updates().last().unwrap();
        assert_eq!(last.message, "Order cancelled by customer");

        let after = snapshot(&market, &[&a, &b], buyer.id).await;
        assert_counters_equal(&before, &after);
        assert_eq!(after.products[0].status, ProductStatus::Active);
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_no_trace() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let plenty = product(&market, &seller, 100, 10).await;
        let scarce = product(&market, &seller, 100, 1).await;
        let buyer = signup(&market, "buyer@example.com").await;

        let before = snapshot(&market, &[&plenty, &scarce], buyer.id).await;
        let err = market
            .create_order(&buyer.actor(), request(&[(&plenty, 3), (&scarce, 2)], PaymentMethod::Upi))
            .await
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidState(_)));

        let after = snapshot(&market, &[&plenty, &scarce], buyer.id).await;
        assert_counters_equal(&before, &after);
        assert!(market.user_orders(buyer.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn money_overflow_leaves_no_trace() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let pricey = product(&market, &seller, MAX_PRICE, u32::MAX).await;
        let buyer = signup(&market, "buyer@example.com").await;
        let before = snapshot(&market, &[&pricey], buyer.id).await;

        let mut huge_amounts = request(&[(&pricey, 1)], PaymentMethod::Upi);
        huge_amounts.amounts = Amounts {
            subtotal: i64::MAX,
            service_fee: 1,
            gst: 0,
            total: 0,
        };
        let err = market.create_order(&buyer.actor(), huge_amounts).await.unwrap_err();
        assert_eq!(domain(err), DomainError::validation("Order amount is too large"));

        // stock covers it, so the overflow surfaces only after reservation
        let mut huge_quantity = request(&[(&pricey, 1)], PaymentMethod::Upi);
        huge_quantity.items[0].quantity = u32::MAX;
        let err = market.create_order(&buyer.actor(), huge_quantity).await.unwrap_err();
        assert_eq!(domain(err), DomainError::validation("Order amount is too large"));

        let mut understated = request(&[(&pricey, 2)], PaymentMethod::Upi);
        understated.amounts = Amounts {
            subtotal: 1,
            service_fee: 0,
            gst: 0,
            total: 1,
        };
        let err = market.create_order(&buyer.actor(), understated).await.unwrap_err();
        assert_eq!(domain(err), DomainError::validation("Order subtotal does not match items"));

        let after = snapshot(&market, &[&pricey], buyer.id).await;
        assert_counters_equal(&before, &after);
        assert!(market.user_orders(buyer.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn price_ceiling_applies_to_listings() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let err = market
            .create_product(
                &seller,
                NewProduct {
                    name: "Island".to_string(),
                    price: MAX_PRICE + 1,
                    category: Some(Category::Other),
                    ..NewProduct::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(domain(err), DomainError::validation("Price is too large"));
    }

    #[tokio::test]
    async fn stale_price_and_missing_product_are_rejected() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let item = product(&market, &seller, 100, 10).await;
        let buyer = signup(&market, "buyer@example.com").await;

        let mut stale = request(&[(&item, 1)], PaymentMethod::Upi);
        stale.items[0].price = Some(90);
        let err = market.create_order(&buyer.actor(), stale).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));

        let mut missing = request(&[(&item, 1)], PaymentMethod::Upi);
        missing.items[0].product_id = bazaar_core::ProductId::new();
        let err = market.create_order(&buyer.actor(), missing).await.unwrap_err();
        assert_eq!(domain(err), DomainError::not_found("Product not found"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_cannot_oversell() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let last_unit = product(&market, &seller, 4_999, 1).await;

        let mut handles = Vec::new();
        for i in 0..4 {
            let buyer = signup(&market, &format!("buyer{i}@example.com")).await;
            let market = market.clone();
            let req = request(&[(&last_unit, 1)], PaymentMethod::Upi);
            handles.push(tokio::spawn(async move {
                market.create_order(&buyer.actor(), req).await
            }));
        }

        let mut placed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                placed += 1;
            }
        }
        assert_eq!(placed, 1);
        let stored = market.store().product(last_unit.id).await.unwrap().unwrap();
        assert_eq!((stored.stock, stored.sold), (0, 1));
    }

    #[tokio::test]
    async fn vendor_rejection_reverses_like_a_cancel() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let item = product(&market, &seller, 1_000, 4).await;
        let buyer = signup(&market, "buyer@example.com").await;

        let before = snapshot(&market, &[&item], buyer.id).await;
        let order = market
            .create_order(&buyer.actor(), request(&[(&item, 3)], PaymentMethod::Upi))
            .await
            .unwrap();
        let rejected = market
            .update_order_status(
                &seller,
                order.id,
                StatusUpdateInput {
                    status: OrderStatus::Cancelled,
                    message: Some("Out of stock at warehouse".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.tracking().status(), OrderStatus::Cancelled);

        let after = snapshot(&market, &[&item], buyer.id).await;
        assert_counters_equal(&before, &after);
    }

    #[tokio::test]
    async fn cancelled_order_is_terminal() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let item = product(&market, &seller, 1_000, 4).await;
        let buyer = signup(&market, "buyer@example.com").await;
        let order = market
            .create_order(&buyer.actor(), request(&[(&item, 1)], PaymentMethod::Upi))
            .await
            .unwrap();
        market.cancel_order(&buyer.actor(), order.id).await.unwrap();

        let err = market
            .update_order_status(
                &seller,
                order.id,
                StatusUpdateInput {
                    status: OrderStatus::Confirmed,
                    message: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidState(_)));

        let err = market.cancel_order(&buyer.actor(), order.id).await.unwrap_err();
        assert_eq!(
            domain(err),
            DomainError::invalid_state("Order cannot be cancelled at this stage")
        );
        let stored = market.store().product(item.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 4);
    }

    #[tokio::test]
    async fn shipped_order_cannot_be_cancelled() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let item = product(&market, &seller, 1_000, 4).await;
        let buyer = signup(&market, "buyer@example.com").await;
        let order = market
            .create_order(&buyer.actor(), request(&[(&item, 1)], PaymentMethod::Upi))
            .await
            .unwrap();

        let shipped = market
            .update_order_status(
                &admin,
                order.id,
                StatusUpdateInput {
                    status: OrderStatus::Shipped,
                    message: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(shipped.tracking().updates().last().unwrap().message, "Order shipped");

        let err = market.cancel_order(&buyer.actor(), order.id).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidState(_)));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Capabilities
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn only_the_owner_may_cancel() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let item = product(&market, &seller, 1_000, 4).await;
        let buyer = signup(&market, "buyer@example.com").await;
        let stranger = signup(&market, "stranger@example.com").await;
        let order = market
            .create_order(&buyer.actor(), request(&[(&item, 1)], PaymentMethod::Upi))
            .await
            .unwrap();

        for actor in [stranger.actor(), admin, seller] {
            let err = market.cancel_order(&actor, order.id).await.unwrap_err();
            assert!(matches!(domain(err), DomainError::Forbidden(_)));
        }
    }

    #[tokio::test]
    async fn order_visibility_and_status_rights() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let (outsider, _) = approved_vendor(&market, &admin, "outsider@example.com").await;
        let item = product(&market, &seller, 1_000, 4).await;
        let buyer = signup(&market, "buyer@example.com").await;
        let stranger = signup(&market, "stranger@example.com").await;
        let order = market
            .create_order(&buyer.actor(), request(&[(&item, 1)], PaymentMethod::Upi))
            .await
            .unwrap();

        for allowed in [buyer.actor(), seller, admin] {
            assert!(market.order_detail(&allowed, order.id).await.is_ok());
        }
        for denied in [stranger.actor(), outsider] {
            let err = market.order_detail(&denied, order.id).await.unwrap_err();
            assert!(matches!(domain(err), DomainError::Forbidden(_)));
        }

        let confirm = || StatusUpdateInput {
            status: OrderStatus::Confirmed,
            message: None,
        };
        let err = market.update_order_status(&outsider, order.id, confirm()).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::Forbidden(_)));
        let err = market.update_order_status(&buyer.actor(), order.id, confirm()).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::Forbidden(_)));
        assert!(market.update_order_status(&seller, order.id, confirm()).await.is_ok());
    }

    #[tokio::test]
    async fn vendor_order_desk_shows_only_own_lines() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, vendor) = approved_vendor(&market, &admin, "seller@example.com").await;
        let (other, _) = approved_vendor(&market, &admin, "other@example.com").await;
        let mine = product(&market, &seller, 1_000, 4).await;
        let theirs = product(&market, &other, 700, 4).await;
        let buyer = signup(&market, "buyer@example.com").await;
        market
            .create_order(&buyer.actor(), request(&[(&mine, 2), (&theirs, 1)], PaymentMethod::Upi))
            .await
            .unwrap();

        let desk = market.vendor_orders(&seller, None).await.unwrap();
        assert_eq!(desk.stats.total, 1);
        assert_eq!(desk.stats.pending, 1);
        let view = &desk.orders[0];
        assert_eq!(view.vendor_amount, 2_000);
        assert!(view.order.items.iter().all(|i| i.vendor_id == vendor.id));

        assert_eq!(market.vendor_pending_orders(&seller).await.unwrap().len(), 1);
        let err = market.vendor_orders(&buyer.actor(), None).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn product_edits_require_ownership() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, vendor) = approved_vendor(&market, &admin, "seller@example.com").await;
        let (other, _) = approved_vendor(&market, &admin, "other@example.com").await;
        let item = product(&market, &seller, 1_000, 4).await;
        let second = product(&market, &seller, 1_000, 4).await;

        let err = market.delete_product(&other, item.id).await.unwrap_err();
        assert_eq!(domain(err), DomainError::forbidden("Not authorized to delete this product"));

        let updated = market
            .update_product(
                &seller,
                item.id,
                bazaar_products::ProductUpdate {
                    stock: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ProductStatus::OutOfStock);

        market.delete_product(&seller, item.id).await.unwrap();
        market.delete_product(&admin, second.id).await.unwrap();
        let vendor = market.store().vendor(vendor.id).await.unwrap().unwrap();
        assert_eq!(vendor.total_products, 0);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Vendors and accounts
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn approval_promotes_and_rejection_does_not() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let hopeful = signup(&market, "hopeful@example.com").await;
        let input = || RegisterVendorInput {
            store_name: "Hopeful Goods".to_string(),
            category: Some(Category::Books),
            ..RegisterVendorInput::default()
        };
        let vendor = market.register_vendor(&hopeful.actor(), input()).await.unwrap();
        assert_eq!(vendor.status, VendorStatus::Pending);

        let err = market.register_vendor(&hopeful.actor(), input()).await.unwrap_err();
        assert_eq!(domain(err), DomainError::validation("You already have a vendor account"));

        let err = market.create_product(&hopeful.actor(), NewProduct::default()).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::Forbidden(_)));

        let rejected = market
            .approve_vendor(&admin, vendor.id, VendorStatus::Inactive)
            .await
            .unwrap();
        assert!(rejected.approved_at.is_none());
        assert_eq!(reload_user(&market, hopeful.id).await.role, Role::User);

        let err = market
            .approve_vendor(&admin, vendor.id, VendorStatus::Suspended)
            .await
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));

        let approved = market
            .approve_vendor(&admin, vendor.id, VendorStatus::Active)
            .await
            .unwrap();
        assert_eq!(approved.approved_by, Some(admin.user_id));
        assert_eq!(reload_user(&market, hopeful.id).await.role, Role::Vendor);
    }

    #[tokio::test]
    async fn inactive_vendor_cannot_list_products() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, vendor) = approved_vendor(&market, &admin, "seller@example.com").await;
        market
            .approve_vendor(&admin, vendor.id, VendorStatus::Inactive)
            .await
            .unwrap();

        let err = market
            .create_product(
                &seller,
                NewProduct {
                    name: "Lamp".to_string(),
                    price: 100,
                    category: Some(Category::Home),
                    ..NewProduct::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(domain(err), DomainError::forbidden("Your vendor account is not active"));
    }

    #[tokio::test]
    async fn signup_and_login_rules() {
        let (market, _) = setup();
        signup(&market, "Someone@Example.com").await;

        let err = market
            .signup(SignupInput {
                name: "Again".to_string(),
                email: "someone@example.com".to_string(),
                password: "x".to_string(),
                ..SignupInput::default()
            })
            .await
            .unwrap_err();
        assert_eq!(domain(err), DomainError::validation("User already exists with this email"));

        let err = market
            .signup(SignupInput {
                name: "Root".to_string(),
                email: "root@example.com".to_string(),
                password: "x".to_string(),
                role: Some(Role::Admin),
                ..SignupInput::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::Forbidden(_)));

        let login = |password: &str, role| LoginInput {
            email: "SOMEONE@example.com".to_string(),
            password: password.to_string(),
            role,
        };
        assert!(market.login(login("secret123", None)).await.is_ok());
        let err = market.login(login("wrong", None)).await.unwrap_err();
        assert_eq!(domain(err), DomainError::unauthenticated("Invalid credentials"));
        let err = market.login(login("secret123", Some(Role::Vendor))).await.unwrap_err();
        assert_eq!(
            domain(err),
            DomainError::forbidden("This account is not registered as vendor")
        );
    }

    #[tokio::test]
    async fn password_change_requires_current_password() {
        let (market, _) = setup();
        let user = signup(&market, "pw@example.com").await;

        let err = market.change_password(user.id, "nope", "fresh").await.unwrap_err();
        assert!(matches!(domain(err), DomainError::Unauthenticated(_)));

        market.change_password(user.id, "secret123", "fresh").await.unwrap();
        let session = market
            .login(LoginInput {
                email: "pw@example.com".to_string(),
                password: "fresh".to_string(),
                role: None,
            })
            .await
            .unwrap();
        assert_eq!(session.user.id, user.id);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Authentication gate
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn gate_resolves_active_accounts_only() {
        let (market, tokens) = setup();
        let admin = admin(&market).await;
        let user = signup(&market, "gate@example.com").await;

        let token = tokens.issue(user.id).unwrap();
        assert_eq!(market.authenticate(&token).await.unwrap().id, user.id);

        let expired = tokens.issue_at(user.id, Utc::now() - Duration::hours(2)).unwrap();
        assert_eq!(
            domain(market.authenticate(&expired).await.unwrap_err()),
            DomainError::unauthenticated("Not authorized, token expired")
        );
        assert!(matches!(
            domain(market.authenticate("garbage").await.unwrap_err()),
            DomainError::Unauthenticated(_)
        ));

        market
            .set_user_status(&admin, user.id, AccountStatus::Suspended)
            .await
            .unwrap();
        assert!(matches!(
            domain(market.authenticate(&token).await.unwrap_err()),
            DomainError::Forbidden(_)
        ));

        market.delete_user(&admin, user.id).await.unwrap();
        assert!(matches!(
            domain(market.authenticate(&token).await.unwrap_err()),
            DomainError::NotFound(_)
        ));

        let err = market.delete_user(&admin, admin.user_id).await.unwrap_err();
        assert_eq!(domain(err), DomainError::forbidden("Cannot delete admin accounts"));
    }

    #[tokio::test]
    async fn admin_bootstrap_is_idempotent() {
        let (market, _) = setup();
        assert!(market.ensure_admin("Ops", "ops@bazaar.test", "hunter22").await.unwrap());
        assert!(!market.ensure_admin("Ops", "OPS@bazaar.test", "other").await.unwrap());

        let session = market
            .login(LoginInput {
                email: "ops@bazaar.test".to_string(),
                password: "hunter22".to_string(),
                role: Some(Role::Admin),
            })
            .await
            .unwrap();
        assert!(session.user.actor().is_admin());
    }

    #[tokio::test]
    async fn dashboard_counts_paid_revenue_only() {
        let (market, _) = setup();
        let admin = admin(&market).await;
        let (seller, _) = approved_vendor(&market, &admin, "seller@example.com").await;
        let item = product(&market, &seller, 1_000, 10).await;
        let buyer = signup(&market, "buyer@example.com").await;
        signup(&market, "pending@example.com").await;

        let paid: Order = market
            .create_order(&buyer.actor(), request(&[(&item, 1)], PaymentMethod::Upi))
            .await
            .unwrap();
        market
            .create_order(&buyer.actor(), request(&[(&item, 2)], PaymentMethod::Cod))
            .await
            .unwrap();

        let dashboard = market.dashboard(&admin).await.unwrap();
        assert_eq!(dashboard.stats.total_orders, 2);
        assert_eq!(dashboard.stats.total_revenue, paid.amounts.total);
        assert_eq!(dashboard.stats.active_vendors, 1);
        // buyer and pending@ keep the plain user role; the seller was promoted
        assert_eq!(dashboard.stats.total_users, 2);
        assert_eq!(dashboard.recent_orders.len(), 2);

        let stats = market.user_stats(buyer.id).await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.pending_orders, 2);

        let err = market.dashboard(&buyer.actor()).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::Forbidden(_)));
    }
}
