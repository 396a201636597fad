//! End-to-end order flows against a seeded in-memory database.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use pantry_core::domain::article::{Article, ArticleId, ArticleSupplierLink};
use pantry_core::domain::department::DepartmentId;
use pantry_core::domain::order::OrderStatus;
use pantry_core::domain::shipment::ShipmentStatus;
use pantry_core::domain::supplier::{SupplierId, Weekday};
use pantry_core::domain::user::{Role, User, UserId};
use pantry_core::errors::DomainError;
use pantry_core::scheduling::NoHolidays;
use pantry_db::repositories::{
    ActivityRepository, ArticleRepository, ShipmentRepository, SqlActivityRepository,
    SqlArticleRepository, SqlShipmentRepository,
};
use pantry_db::{connect_with_settings, migrations, DbPool, SeedDataset};
use pantry_orders::{
    CreateOrderRequest, LineChanges, NewLineRequest, OrderService, UNRESOLVED_SUPPLIER_NOTE,
};

async fn seeded_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    SeedDataset::load(&pool).await.expect("seed");
    pool
}

fn service(pool: &DbPool) -> OrderService {
    OrderService::new(pool.clone(), Arc::new(NoHolidays))
}

fn user(id: &str, department: &str, role: Role) -> User {
    User {
        id: UserId(id.to_string()),
        name: id.to_string(),
        role,
        department_id: DepartmentId(department.to_string()),
        active: true,
    }
}

fn admin() -> User {
    user("usr-admin", "dep-restaurant", Role::Admin)
}

fn approver() -> User {
    user("usr-approver", "dep-restaurant", Role::Approver)
}

fn kitchen_requester() -> User {
    user("usr-kitchen", "dep-kitchen", Role::Requester)
}

fn line(article: &str, quantity: i64) -> NewLineRequest {
    NewLineRequest {
        article_id: ArticleId(article.to_string()),
        quantity: Decimal::from(quantity),
        note: None,
    }
}

fn order_with_lines(lines: Vec<NewLineRequest>) -> CreateOrderRequest {
    CreateOrderRequest { lines, ..CreateOrderRequest::default() }
}

fn future_date() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(7)
}

/// Extra single-supplier article for the fixed-delivery-day supplier.
async fn link_butter_to_greens(pool: &DbPool) {
    let articles = SqlArticleRepository::new(pool.clone());
    articles
        .save(Article {
            id: ArticleId("art-butter".to_string()),
            name: "Butter".to_string(),
            unit: "kg".to_string(),
            notes: None,
            active: true,
        })
        .await
        .expect("save butter");
    articles
        .save_link(ArticleSupplierLink {
            id: "asl-butter-greens".to_string(),
            article_id: ArticleId("art-butter".to_string()),
            supplier_id: SupplierId("sup-greens".to_string()),
            supplier_article_number: None,
            price: None,
            unit: "kg".to_string(),
        })
        .await
        .expect("link butter");
}

#[tokio::test]
async fn single_supplier_article_routes_into_an_open_batch() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-flour", 5)]))
        .await
        .expect("create order");

    let routed = &detail.lines[0];
    assert_eq!(routed.supplier_id, Some(SupplierId("sup-dry".to_string())));
    let batch_id = routed.shipment_batch_id.clone().expect("batch assigned");

    let batch = SqlShipmentRepository::new(pool.clone())
        .find_by_id(&batch_id)
        .await
        .expect("load batch")
        .expect("batch exists");
    assert_eq!(batch.status, ShipmentStatus::Open);
    // Flexible supplier and no order date: the batch keys on a null date.
    assert_eq!(batch.delivery_date, None);
}

#[tokio::test]
async fn zero_supplier_article_is_left_for_manual_routing() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-chanterelle", 2)]))
        .await
        .expect("create order");

    let unrouted = &detail.lines[0];
    assert_eq!(unrouted.supplier_id, None);
    assert_eq!(unrouted.shipment_batch_id, None);
    let note = unrouted.note.as_deref().expect("marker note");
    assert!(note.contains("manual"), "note should flag manual assignment: {note}");
}

#[tokio::test]
async fn ambiguous_article_stays_unresolved_without_a_marker() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-oil", 3)]))
        .await
        .expect("create order");

    let unrouted = &detail.lines[0];
    assert_eq!(unrouted.supplier_id, None);
    assert_eq!(unrouted.shipment_batch_id, None);
    assert_eq!(unrouted.note, None);
}

#[tokio::test]
async fn lines_sharing_supplier_and_date_share_one_batch_across_orders() {
    let pool = seeded_pool().await;
    let orders = service(&pool);
    let date = future_date();

    let first = orders
        .create(
            &admin(),
            CreateOrderRequest {
                delivery_date: Some(date),
                lines: vec![line("art-flour", 5), line("art-flour", 10)],
                ..CreateOrderRequest::default()
            },
        )
        .await
        .expect("first order");
    let second = orders
        .create(
            &admin(),
            CreateOrderRequest {
                delivery_date: Some(date),
                lines: vec![line("art-flour", 1)],
                ..CreateOrderRequest::default()
            },
        )
        .await
        .expect("second order");

    let batch_a = first.lines[0].shipment_batch_id.clone().expect("batch");
    let batch_b = first.lines[1].shipment_batch_id.clone().expect("batch");
    let batch_c = second.lines[0].shipment_batch_id.clone().expect("batch");
    assert_eq!(batch_a, batch_b, "lines of one order share the batch");
    assert_eq!(batch_a, batch_c, "orders with the same key share the batch");

    let batch = SqlShipmentRepository::new(pool.clone())
        .find_by_id(&batch_a)
        .await
        .expect("load")
        .expect("exists");
    assert_eq!(batch.delivery_date, Some(date));
}

#[tokio::test]
async fn different_suppliers_never_share_a_batch() {
    let pool = seeded_pool().await;
    link_butter_to_greens(&pool).await;
    let orders = service(&pool);
    let date = future_date();

    let detail = orders
        .create(
            &admin(),
            CreateOrderRequest {
                delivery_date: Some(date),
                lines: vec![line("art-flour", 5), line("art-butter", 2)],
                ..CreateOrderRequest::default()
            },
        )
        .await
        .expect("create order");

    let flour_batch = detail.lines[0].shipment_batch_id.clone().expect("flour batch");
    let butter_batch = detail.lines[1].shipment_batch_id.clone().expect("butter batch");
    assert_ne!(flour_batch, butter_batch);
}

#[tokio::test]
async fn fixed_delivery_day_supplier_gets_the_next_eligible_date() {
    let pool = seeded_pool().await;
    link_butter_to_greens(&pool).await;
    let orders = service(&pool);

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-butter", 2)]))
        .await
        .expect("create order");

    let batch_id = detail.lines[0].shipment_batch_id.clone().expect("batch");
    let batch = SqlShipmentRepository::new(pool.clone())
        .find_by_id(&batch_id)
        .await
        .expect("load")
        .expect("exists");

    let today = Utc::now().date_naive();
    let date = batch.delivery_date.expect("computed delivery date");
    assert!(date > today);
    assert!(date <= today + Duration::days(14));
    let weekday = Weekday::from_chrono(date.weekday());
    assert!(
        matches!(weekday, Weekday::Tuesday | Weekday::Friday),
        "delivery on {weekday:?} violates the supplier's rules"
    );
}

#[tokio::test]
async fn requester_reaches_only_into_their_subtree() {
    let pool = seeded_pool().await;
    let orders = service(&pool);
    let requester = kitchen_requester();

    let sideways = orders
        .create(
            &requester,
            CreateOrderRequest {
                department_id: Some(DepartmentId("dep-service".to_string())),
                lines: vec![line("art-flour", 1)],
                ..CreateOrderRequest::default()
            },
        )
        .await;
    assert!(matches!(
        sideways.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Forbidden(_))
    ));

    let downward = orders
        .create(
            &requester,
            CreateOrderRequest {
                department_id: Some(DepartmentId("dep-pastry".to_string())),
                lines: vec![line("art-flour", 1)],
                ..CreateOrderRequest::default()
            },
        )
        .await
        .expect("descendant department is reachable");
    assert_eq!(downward.order.department_id, DepartmentId("dep-pastry".to_string()));
}

#[tokio::test]
async fn unknown_or_inactive_article_fails_the_whole_creation() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let missing = orders
        .create(&admin(), order_with_lines(vec![line("art-saffron", 1)]))
        .await;
    assert!(matches!(
        missing.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::NotFound { .. })
    ));

    // The failed creation must leave nothing behind.
    let listed = orders.list(&admin()).await.expect("list");
    assert!(listed.is_empty());
}

#[tokio::test]
async fn non_positive_quantity_is_a_validation_error() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let result = orders
        .create(&admin(), order_with_lines(vec![line("art-flour", 0)]))
        .await;
    assert!(matches!(
        result.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn closing_requires_at_least_one_line() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let empty = orders
        .create(&admin(), order_with_lines(Vec::new()))
        .await
        .expect("empty draft is allowed");
    let closed = orders.close(&admin(), &empty.order.id).await;
    assert!(matches!(
        closed.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Conflict(_))
    ));
}

#[tokio::test]
async fn closed_orders_lock_out_line_edits() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-flour", 5)]))
        .await
        .expect("create");
    let closed = orders.close(&admin(), &detail.order.id).await.expect("close");
    assert_eq!(closed.status, OrderStatus::Complete);

    let added = orders.add_line(&admin(), &detail.order.id, line("art-flour", 1)).await;
    assert!(matches!(
        added.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Conflict(_))
    ));

    let updated = orders
        .update_line(
            &admin(),
            &detail.lines[0].id,
            LineChanges { quantity: Some(Decimal::from(9)), ..LineChanges::default() },
        )
        .await;
    assert!(matches!(
        updated.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Conflict(_))
    ));
}

#[tokio::test]
async fn sibling_requester_is_forbidden_from_editing() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    // Order owned by Service; a requester sitting in Pastry has no reach.
    let detail = orders
        .create(
            &admin(),
            CreateOrderRequest {
                department_id: Some(DepartmentId("dep-service".to_string())),
                lines: vec![line("art-flour", 5)],
                ..CreateOrderRequest::default()
            },
        )
        .await
        .expect("create");

    let pastry = user("usr-pastry", "dep-pastry", Role::Requester);
    let result = orders
        .update_line(
            &pastry,
            &detail.lines[0].id,
            LineChanges { quantity: Some(Decimal::from(2)), ..LineChanges::default() },
        )
        .await;
    assert!(matches!(
        result.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Forbidden(_))
    ));
}

#[tokio::test]
async fn quantity_changes_are_audited_with_old_and_new_values() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-flour", 5)]))
        .await
        .expect("create");
    let line_id = detail.lines[0].id.clone();

    orders
        .update_line(
            &admin(),
            &line_id,
            LineChanges {
                quantity: Some(Decimal::new(75, 1)),
                note: Some("for the weekend menu".to_string()),
            },
        )
        .await
        .expect("update line");

    let activity = SqlActivityRepository::new(pool.clone())
        .list_for_entity("order_line", &line_id.0)
        .await
        .expect("activity");
    assert_eq!(activity.len(), 2);
    let quantity_change = activity
        .iter()
        .find(|record| record.description.contains("quantity"))
        .expect("quantity change record");
    assert_eq!(quantity_change.old_value.as_deref(), Some("5"));
    assert_eq!(quantity_change.new_value.as_deref(), Some("7.5"));
    let note_change = activity
        .iter()
        .find(|record| record.description.contains("note"))
        .expect("note change record");
    assert_eq!(note_change.new_value.as_deref(), Some("for the weekend menu"));
}

#[tokio::test]
async fn removing_the_last_line_keeps_the_batch() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-flour", 5)]))
        .await
        .expect("create");
    orders.remove_line(&admin(), &detail.lines[0].id).await.expect("remove line");

    let remaining = orders.get(&admin(), &detail.order.id).await.expect("get");
    assert!(remaining.lines.is_empty());

    // Batches persist as historical groupings even when emptied.
    let batches = SqlShipmentRepository::new(pool.clone()).list_all().await.expect("batches");
    assert_eq!(batches.len(), 1);
}

#[tokio::test]
async fn patch_updates_draft_fields_only() {
    let pool = seeded_pool().await;
    let orders = service(&pool);
    let date = future_date();

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-flour", 5)]))
        .await
        .expect("create");

    let patched = orders
        .patch(
            &admin(),
            &detail.order.id,
            pantry_orders::OrderChanges {
                delivery_date: Some(date),
                delivery_notes: Some("deliver to the back entrance".to_string()),
                ..pantry_orders::OrderChanges::default()
            },
        )
        .await
        .expect("patch");
    assert_eq!(patched.delivery_date, Some(date));
    assert_eq!(patched.delivery_notes.as_deref(), Some("deliver to the back entrance"));

    orders.close(&admin(), &detail.order.id).await.expect("close");
    let after_close = orders
        .patch(
            &admin(),
            &detail.order.id,
            pantry_orders::OrderChanges {
                delivery_notes: Some("too late".to_string()),
                ..pantry_orders::OrderChanges::default()
            },
        )
        .await;
    assert!(matches!(
        after_close.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Conflict(_))
    ));
}

#[tokio::test]
async fn cancelled_orders_are_terminal() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-flour", 5)]))
        .await
        .expect("create");
    let cancelled = orders.cancel(&admin(), &detail.order.id).await.expect("cancel");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let again = orders.cancel(&admin(), &detail.order.id).await;
    assert!(matches!(
        again.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Forbidden(_))
    ));
}

#[tokio::test]
async fn supplier_assignment_requires_a_grant_and_reroutes() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-oil", 3)]))
        .await
        .expect("create");
    let line_id = detail.lines[0].id.clone();

    // No grant, no assignment.
    let denied = orders
        .assign_supplier(&kitchen_requester(), &line_id, &SupplierId("sup-greens".to_string()))
        .await;
    assert!(matches!(
        denied.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Forbidden(_))
    ));

    // The approver holds a grant for the supplier and may resolve the line.
    let assigned = orders
        .assign_supplier(&approver(), &line_id, &SupplierId("sup-greens".to_string()))
        .await
        .expect("assign supplier");
    assert_eq!(assigned.supplier_id, Some(SupplierId("sup-greens".to_string())));
    let batch_id = assigned.shipment_batch_id.clone().expect("batch");

    // sup-greens has fixed delivery days, so the batch got a computed date.
    let batch = SqlShipmentRepository::new(pool.clone())
        .find_by_id(&batch_id)
        .await
        .expect("load")
        .expect("exists");
    let date = batch.delivery_date.expect("computed date");
    assert!(matches!(
        Weekday::from_chrono(date.weekday()),
        Weekday::Tuesday | Weekday::Friday
    ));

    let activity = SqlActivityRepository::new(pool.clone())
        .list_for_entity("order_line", &line_id.0)
        .await
        .expect("activity");
    let assignment = activity.last().expect("assignment record");
    assert_eq!(assignment.old_value.as_deref(), Some("none"));
    assert_eq!(assignment.new_value.as_deref(), Some("sup-greens"));
}

#[tokio::test]
async fn visibility_radius_scopes_reads() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let service_order = orders
        .create(
            &admin(),
            CreateOrderRequest {
                department_id: Some(DepartmentId("dep-service".to_string())),
                lines: vec![line("art-flour", 1)],
                ..CreateOrderRequest::default()
            },
        )
        .await
        .expect("service order");
    let pastry_order = orders
        .create(
            &admin(),
            CreateOrderRequest {
                department_id: Some(DepartmentId("dep-pastry".to_string())),
                lines: vec![line("art-flour", 1)],
                ..CreateOrderRequest::default()
            },
        )
        .await
        .expect("pastry order");

    // Pastry sees itself and its parent Kitchen, not the Service sibling of
    // Kitchen's parent level.
    let pastry = user("usr-pastry", "dep-pastry", Role::Requester);
    let listed = orders.list(&pastry).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, pastry_order.order.id);

    let denied = orders.get(&pastry, &service_order.order.id).await;
    assert!(matches!(
        denied.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Forbidden(_))
    ));

    let all = orders.list(&admin()).await.expect("admin list");
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn soft_delete_is_admin_only_and_hides_the_order() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let detail = orders
        .create(&admin(), order_with_lines(vec![line("art-flour", 1)]))
        .await
        .expect("create");

    let denied = orders.delete(&kitchen_requester(), &detail.order.id).await;
    assert!(matches!(
        denied.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::Forbidden(_))
    ));

    orders.delete(&admin(), &detail.order.id).await.expect("delete");
    let gone = orders.get(&admin(), &detail.order.id).await;
    assert!(matches!(
        gone.map(|_| ()).unwrap_err().as_domain(),
        Some(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn unresolved_marker_is_the_shared_constant() {
    let pool = seeded_pool().await;
    let orders = service(&pool);

    let detail = orders
        .create(
            &admin(),
            order_with_lines(vec![NewLineRequest {
                article_id: ArticleId("art-chanterelle".to_string()),
                quantity: Decimal::from(1),
                note: Some("only fresh".to_string()),
            }]),
        )
        .await
        .expect("create");
    assert_eq!(
        detail.lines[0].note.as_deref(),
        Some(format!("only fresh | {UNRESOLVED_SUPPLIER_NOTE}").as_str())
    );
}
