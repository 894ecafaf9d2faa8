//! Integration tests for the ledger services.
//!
//! These tests drive the customer, product and order services against one
//! shared in-memory store and check the observable contract: validation,
//! full-replace updates, referential integrity and order totals.

use domain::{
    CustomerId, CustomerInput, CustomerService, EntityKind, LedgerError, OrderId, OrderInput,
    OrderService, ProductId, ProductInput, ProductService, StockInput,
};
use ledger_store::{InMemoryLedgerStore, LedgerStore};

struct Ledger {
    store: InMemoryLedgerStore,
    customers: CustomerService<InMemoryLedgerStore>,
    products: ProductService<InMemoryLedgerStore>,
    orders: OrderService<InMemoryLedgerStore>,
}

/// Helper to create services sharing one store
fn create_ledger() -> Ledger {
    let store = InMemoryLedgerStore::new();
    Ledger {
        customers: CustomerService::new(store.clone()),
        products: ProductService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        store,
    }
}

async fn seed_customer(ledger: &Ledger) -> CustomerId {
    ledger
        .customers
        .create(CustomerInput::named("Ada Lovelace").with_email("ada@example.com"))
        .await
        .unwrap()
        .id
}

async fn seed_product(ledger: &Ledger, name: &str, price: f64) -> ProductId {
    ledger
        .products
        .create(ProductInput::new(name, price, 10))
        .await
        .unwrap()
        .id
}

mod customers {
    use super::*;

    #[tokio::test]
    async fn create_then_get_returns_every_field() {
        let ledger = create_ledger();

        let created = ledger
            .customers
            .create(
                CustomerInput::named("Grace Hopper")
                    .with_email("grace@example.com")
                    .with_phone("+1-555-0100"),
            )
            .await
            .unwrap();

        let fetched = ledger.customers.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.customer_name, "Grace Hopper");
        assert_eq!(fetched.email.as_deref(), Some("grace@example.com"));
        assert_eq!(fetched.phone.as_deref(), Some("+1-555-0100"));
    }

    #[tokio::test]
    async fn invalid_email_persists_nothing() {
        let ledger = create_ledger();

        let err = ledger
            .customers
            .create(CustomerInput::named("Ada").with_email("not-an-email"))
            .await
            .unwrap_err();

        match err {
            LedgerError::Validation(errors) => {
                assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(ledger.customers.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_every_field() {
        let ledger = create_ledger();
        let id = seed_customer(&ledger).await;

        let updated = ledger
            .customers
            .update(id, CustomerInput::named("Ada King"))
            .await
            .unwrap();

        assert_eq!(updated.customer_name, "Ada King");
        assert_eq!(updated.email, None, "omitted fields are cleared");
        assert_eq!(ledger.customers.get(id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_of_missing_customer_is_not_found() {
        let ledger = create_ledger();

        let err = ledger
            .customers
            .update(CustomerId::new(42), CustomerInput::named("Nobody"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::NotFound {
                entity: EntityKind::Customer,
                id: 42
            }
        ));
        assert!(ledger.customers.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_customer_wins_over_bad_input() {
        let ledger = create_ledger();

        let err = ledger
            .customers
            .update(CustomerId::new(1), CustomerInput::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let ledger = create_ledger();
        let id = seed_customer(&ledger).await;

        ledger.customers.delete(id).await.unwrap();
        let err = ledger.customers.delete(id).await.unwrap_err();

        assert_eq!(err.kind(), "not_found");
        assert_eq!(err.kind(), ledger.customers.get(id).await.unwrap_err().kind());
    }

    #[tokio::test]
    async fn delete_with_orders_is_blocked() {
        let ledger = create_ledger();
        let id = seed_customer(&ledger).await;
        ledger
            .orders
            .create(OrderInput::new(id, "2024-05-01"))
            .await
            .unwrap();

        let err = ledger.customers.delete(id).await.unwrap_err();

        assert_eq!(err.kind(), "reference_error");
        assert!(ledger.customers.get(id).await.is_ok());
        assert_eq!(ledger.orders.list().await.unwrap().len(), 1);
    }
}

mod products {
    use super::*;

    #[tokio::test]
    async fn create_reports_every_missing_field() {
        let ledger = create_ledger();

        let err = ledger
            .products
            .create(ProductInput::default())
            .await
            .unwrap_err();

        let LedgerError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["price", "product_name", "stock"]
        );
    }

    #[tokio::test]
    async fn stock_update_sets_exact_value() {
        let ledger = create_ledger();
        let id = ledger
            .products
            .create(ProductInput::new("Lamp", 10.0, 50))
            .await
            .unwrap()
            .id;

        let product = ledger
            .products
            .update_stock(id, StockInput::new(5))
            .await
            .unwrap();

        assert_eq!(product.stock, 5);
        assert_eq!(ledger.products.get(id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn negative_stock_update_leaves_stock_unchanged() {
        let ledger = create_ledger();
        let id = ledger
            .products
            .create(ProductInput::new("Lamp", 10.0, 50))
            .await
            .unwrap()
            .id;

        let err = ledger
            .products
            .update_stock(id, StockInput::new(-1))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "validation_error");
        assert_eq!(ledger.products.get(id).await.unwrap().stock, 50);
    }

    #[tokio::test]
    async fn stock_update_of_missing_product_is_not_found() {
        let ledger = create_ledger();

        let err = ledger
            .products
            .update_stock(ProductId::new(3), StockInput::new(1))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn delete_of_ordered_product_is_blocked() {
        let ledger = create_ledger();
        let customer = seed_customer(&ledger).await;
        let product = seed_product(&ledger, "Lamp", 10.0).await;
        ledger
            .orders
            .create(OrderInput::new(customer, "2024-05-01").with_products([product]))
            .await
            .unwrap();

        let err = ledger.products.delete(product).await.unwrap_err();

        assert_eq!(err.kind(), "reference_error");
        assert!(ledger.products.get(product).await.is_ok());
        assert_eq!(ledger.store.association_count().await, 1);
    }

    #[tokio::test]
    async fn update_replaces_price_used_by_totals() {
        let ledger = create_ledger();
        let customer = seed_customer(&ledger).await;
        let product = seed_product(&ledger, "Lamp", 10.0).await;
        let order = ledger
            .orders
            .create(OrderInput::new(customer, "2024-05-01").with_products([product]))
            .await
            .unwrap();

        ledger
            .products
            .update(product, ProductInput::new("Lamp", 12.5, 10))
            .await
            .unwrap();

        assert_eq!(ledger.orders.total(order.id).await.unwrap(), 12.5);
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn total_sums_current_prices() {
        let ledger = create_ledger();
        let customer = seed_customer(&ledger).await;
        let p1 = seed_product(&ledger, "Lamp", 10.0).await;
        let p2 = seed_product(&ledger, "Bulb", 5.5).await;

        let order = ledger
            .orders
            .create(OrderInput::new(customer, "2024-05-01").with_products([p1, p2]))
            .await
            .unwrap();

        assert_eq!(order.product_ids, vec![p1, p2]);
        assert_eq!(ledger.orders.total(order.id).await.unwrap(), 15.5);
    }

    #[tokio::test]
    async fn total_of_empty_order_is_zero() {
        let ledger = create_ledger();
        let customer = seed_customer(&ledger).await;

        let order = ledger
            .orders
            .create(OrderInput::new(customer, "2024-05-01"))
            .await
            .unwrap();

        assert_eq!(ledger.orders.total(order.id).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn total_of_missing_order_is_not_found() {
        let ledger = create_ledger();

        let err = ledger.orders.total(OrderId::new(7)).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn unknown_customer_is_a_reference_error() {
        let ledger = create_ledger();

        let err = ledger
            .orders
            .create(OrderInput::new(CustomerId::new(99), "2024-05-01"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Reference {
                entity: EntityKind::Customer,
                id: 99,
                ..
            }
        ));
        assert!(ledger.orders.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_product_writes_nothing() {
        let ledger = create_ledger();
        let customer = seed_customer(&ledger).await;
        let known = seed_product(&ledger, "Lamp", 10.0).await;

        let err = ledger
            .orders
            .create(
                OrderInput::new(customer, "2024-05-01")
                    .with_products([known, ProductId::new(404)]),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "reference_error");
        assert!(ledger.orders.list().await.unwrap().is_empty());
        assert_eq!(ledger.store.association_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_products_collapse() {
        let ledger = create_ledger();
        let customer = seed_customer(&ledger).await;
        let product = seed_product(&ledger, "Lamp", 10.0).await;

        let order = ledger
            .orders
            .create(
                OrderInput::new(customer, "2024-05-01").with_products([product, product]),
            )
            .await
            .unwrap();

        assert_eq!(order.product_ids, vec![product]);
        assert_eq!(ledger.orders.total(order.id).await.unwrap(), 10.0);
    }

    #[tokio::test]
    async fn update_replaces_association_set() {
        let ledger = create_ledger();
        let customer = seed_customer(&ledger).await;
        let p1 = seed_product(&ledger, "Lamp", 10.0).await;
        let p2 = seed_product(&ledger, "Bulb", 5.5).await;
        let order = ledger
            .orders
            .create(OrderInput::new(customer, "2024-05-01").with_products([p1]))
            .await
            .unwrap();

        let updated = ledger
            .orders
            .update(
                order.id,
                OrderInput::new(customer, "2024-05-02")
                    .with_delivery_date("2024-05-09")
                    .with_products([p2]),
            )
            .await
            .unwrap();

        assert_eq!(updated.product_ids, vec![p2]);
        assert_eq!(ledger.orders.get(order.id).await.unwrap(), updated);
        assert_eq!(ledger.orders.total(order.id).await.unwrap(), 5.5);
    }

    #[tokio::test]
    async fn update_of_missing_order_is_not_found() {
        let ledger = create_ledger();
        let customer = seed_customer(&ledger).await;

        let err = ledger
            .orders
            .update(OrderId::new(5), OrderInput::new(customer, "2024-05-01"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "not_found");
        assert!(ledger.orders.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_removes_order_and_associations() {
        let ledger = create_ledger();
        let customer = seed_customer(&ledger).await;
        let product = seed_product(&ledger, "Lamp", 10.0).await;
        let order = ledger
            .orders
            .create(OrderInput::new(customer, "2024-05-01").with_products([product]))
            .await
            .unwrap();

        ledger.orders.cancel(order.id).await.unwrap();

        assert_eq!(ledger.orders.get(order.id).await.unwrap_err().kind(), "not_found");
        assert_eq!(ledger.store.association_count().await, 0);
        assert_eq!(
            ledger.products.get(product).await.unwrap().stock,
            10,
            "stock is not restored"
        );
        // Once the order is gone the product may be removed.
        ledger.products.delete(product).await.unwrap();
    }

    #[tokio::test]
    async fn cancel_of_missing_order_is_not_found() {
        let ledger = create_ledger();

        let err = ledger.orders.cancel(OrderId::new(1)).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn orders_are_listed_in_id_order() {
        let ledger = create_ledger();
        let customer = seed_customer(&ledger).await;

        for day in ["2024-05-03", "2024-05-01", "2024-05-02"] {
            ledger
                .orders
                .create(OrderInput::new(customer, day))
                .await
                .unwrap();
        }

        let ids: Vec<i64> = ledger
            .orders
            .list()
            .await
            .unwrap()
            .iter()
            .map(|order| order.id.as_i64())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(ledger.store.list_orders().await.unwrap().len(), 3);
    }
}
