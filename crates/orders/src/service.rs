//! Order lifecycle: creation, line edits, closing, patching, cancellation.
//! Every mutation runs inside one transaction together with its activity
//! record; a failure partway through leaves nothing behind.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Sqlite, Transaction};
use tracing::info;
use uuid::Uuid;

use pantry_core::audit::{ActivityKind, ActivityRecord};
use pantry_core::authz::authorize_order_edit;
use pantry_core::domain::article::ArticleId;
use pantry_core::domain::department::{DepartmentId, DepartmentTree};
use pantry_core::domain::order::{
    ensure_positive_quantity, Order, OrderId, OrderLine, OrderLineId, OrderStatus,
};
use pantry_core::domain::supplier::SupplierId;
use pantry_core::domain::user::{Role, User};
use pantry_core::errors::DomainError;
use pantry_core::scheduling::HolidayCalendar;
use pantry_db::repositories::{
    DepartmentRepository, OrderRepository, SqlDepartmentRepository, SqlOrderRepository,
};
use pantry_db::DbPool;

use crate::error::{from_domain, ServiceError};
use crate::router::{self, Resolution, UNRESOLVED_SUPPLIER_NOTE};
use crate::store;

#[derive(Clone, Debug, Default)]
pub struct CreateOrderRequest {
    /// Target department; defaults to the requester's home department.
    pub department_id: Option<DepartmentId>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_notes: Option<String>,
    pub additional_articles: Option<String>,
    pub lines: Vec<NewLineRequest>,
}

#[derive(Clone, Debug)]
pub struct NewLineRequest {
    pub article_id: ArticleId,
    pub quantity: Decimal,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LineChanges {
    pub quantity: Option<Decimal>,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct OrderChanges {
    pub delivery_date: Option<NaiveDate>,
    pub delivery_notes: Option<String>,
    pub additional_articles: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

pub struct OrderService {
    pool: DbPool,
    calendar: Arc<dyn HolidayCalendar + Send + Sync>,
}

impl OrderService {
    pub fn new(pool: DbPool, calendar: Arc<dyn HolidayCalendar + Send + Sync>) -> Self {
        Self { pool, calendar }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Create an order in Draft for the resolved department and route every
    /// requested line. Order, lines, batches and the activity record commit
    /// atomically.
    pub async fn create(
        &self,
        requester: &User,
        request: CreateOrderRequest,
    ) -> Result<OrderDetail, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let tree = store::load_department_tree(&mut tx).await?;
        let department_id =
            resolve_target_department(&tree, requester, request.department_id)?;
        if let Some(date) = request.delivery_date {
            ensure_not_past(self.today(), date)?;
        }

        let order = Order {
            id: OrderId(Uuid::new_v4().to_string()),
            department_id,
            creator_id: requester.id.clone(),
            approver_id: None,
            status: OrderStatus::Draft,
            delivery_date: request.delivery_date,
            delivery_notes: request.delivery_notes,
            additional_articles: request.additional_articles,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        store::insert_order(&mut tx, &order).await?;

        let mut lines = Vec::with_capacity(request.lines.len());
        for line_request in request.lines {
            lines.push(self.insert_routed_line(&mut tx, &order, line_request).await?);
        }

        store::insert_activity(
            &mut tx,
            &ActivityRecord::new(
                "order",
                order.id.0.clone(),
                requester.id.clone(),
                ActivityKind::OrderCreated,
                format!("order created with {} lines", lines.len()),
            ),
        )
        .await?;
        tx.commit().await?;

        info!(
            event_name = "orders.order.created",
            order_id = %order.id.0,
            department_id = %order.department_id.0,
            lines = lines.len(),
            "order created"
        );
        Ok(OrderDetail { order, lines })
    }

    /// Add one line to an existing draft order.
    pub async fn add_line(
        &self,
        requester: &User,
        order_id: &OrderId,
        request: NewLineRequest,
    ) -> Result<OrderLine, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let order = self.fetch_draft_order_for_edit(&mut tx, requester, order_id).await?;
        let line = self.insert_routed_line(&mut tx, &order, request).await?;

        store::insert_activity(
            &mut tx,
            &ActivityRecord::new(
                "order",
                order.id.0.clone(),
                requester.id.clone(),
                ActivityKind::LineAdded,
                format!("line added for article `{}`", line.article_id.0),
            )
            .with_details(serde_json::json!({ "line_id": line.id.0 })),
        )
        .await?;
        tx.commit().await?;

        info!(
            event_name = "orders.line.added",
            order_id = %order.id.0,
            line_id = %line.id.0,
            "order line added"
        );
        Ok(line)
    }

    /// Change quantity and/or note of a line; each applied change records an
    /// activity entry with the old and new value.
    pub async fn update_line(
        &self,
        requester: &User,
        line_id: &OrderLineId,
        changes: LineChanges,
    ) -> Result<OrderLine, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let mut line = store::fetch_line(&mut tx, line_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order line", line_id.0.clone()))?;
        self.fetch_draft_order_for_edit(&mut tx, requester, &line.order_id).await?;

        if let Some(quantity) = changes.quantity {
            from_domain(ensure_positive_quantity(quantity))?;
            if quantity != line.quantity {
                store::insert_activity(
                    &mut tx,
                    &ActivityRecord::new(
                        "order_line",
                        line.id.0.clone(),
                        requester.id.clone(),
                        ActivityKind::LineUpdated,
                        "quantity changed",
                    )
                    .with_change(line.quantity.to_string(), quantity.to_string()),
                )
                .await?;
                line.quantity = quantity;
            }
        }

        if let Some(note) = changes.note {
            if Some(note.as_str()) != line.note.as_deref() {
                store::insert_activity(
                    &mut tx,
                    &ActivityRecord::new(
                        "order_line",
                        line.id.0.clone(),
                        requester.id.clone(),
                        ActivityKind::LineUpdated,
                        "note changed",
                    )
                    .with_change(line.note.clone().unwrap_or_default(), note.clone()),
                )
                .await?;
                line.note = Some(note);
            }
        }

        store::update_line(&mut tx, &line).await?;
        tx.commit().await?;
        Ok(line)
    }

    /// Delete a line from a draft order. The shipment batch the line sat in
    /// stays behind as a historical grouping even when it becomes empty.
    pub async fn remove_line(
        &self,
        requester: &User,
        line_id: &OrderLineId,
    ) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        let line = store::fetch_line(&mut tx, line_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order line", line_id.0.clone()))?;
        let order = self.fetch_draft_order_for_edit(&mut tx, requester, &line.order_id).await?;

        store::delete_line(&mut tx, &line.id).await?;
        store::insert_activity(
            &mut tx,
            &ActivityRecord::new(
                "order",
                order.id.0.clone(),
                requester.id.clone(),
                ActivityKind::LineRemoved,
                format!("line for article `{}` removed", line.article_id.0),
            )
            .with_details(serde_json::json!({ "line_id": line.id.0 })),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Close a draft order: Draft -> Complete. Requires at least one line.
    pub async fn close(&self, requester: &User, order_id: &OrderId) -> Result<Order, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let mut order = self.fetch_draft_order_for_edit(&mut tx, requester, order_id).await?;
        if store::count_lines(&mut tx, &order.id).await? == 0 {
            return Err(DomainError::conflict("order has no lines and cannot be closed").into());
        }

        from_domain(order.transition_to(OrderStatus::Complete))?;
        order.updated_at = Some(Utc::now());
        store::update_order(&mut tx, &order).await?;
        store::insert_activity(
            &mut tx,
            &ActivityRecord::new(
                "order",
                order.id.0.clone(),
                requester.id.clone(),
                ActivityKind::OrderCompleted,
                "order closed and marked complete",
            ),
        )
        .await?;
        tx.commit().await?;

        info!(event_name = "orders.order.completed", order_id = %order.id.0, "order completed");
        Ok(order)
    }

    /// Update delivery date, delivery notes or additional articles. Draft
    /// orders only.
    pub async fn patch(
        &self,
        requester: &User,
        order_id: &OrderId,
        changes: OrderChanges,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let mut order = self.fetch_draft_order_for_edit(&mut tx, requester, order_id).await?;
        if let Some(date) = changes.delivery_date {
            ensure_not_past(self.today(), date)?;
            order.delivery_date = Some(date);
        }
        if let Some(notes) = changes.delivery_notes {
            order.delivery_notes = Some(notes);
        }
        if let Some(additional) = changes.additional_articles {
            order.additional_articles = Some(additional);
        }
        order.updated_at = Some(Utc::now());
        store::update_order(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Cancel an order from Draft or Complete. Terminal.
    pub async fn cancel(
        &self,
        requester: &User,
        order_id: &OrderId,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let mut order = store::fetch_order(&mut tx, order_id)
            .await?
            .filter(|order| order.active)
            .ok_or_else(|| DomainError::not_found("order", order_id.0.clone()))?;
        let tree = store::load_department_tree(&mut tx).await?;
        from_domain(authorize_order_edit(&tree, requester, &order))?.into_result()?;

        from_domain(order.transition_to(OrderStatus::Cancelled))?;
        order.updated_at = Some(Utc::now());
        store::update_order(&mut tx, &order).await?;
        store::insert_activity(
            &mut tx,
            &ActivityRecord::new(
                "order",
                order.id.0.clone(),
                requester.id.clone(),
                ActivityKind::OrderCancelled,
                "order cancelled",
            ),
        )
        .await?;
        tx.commit().await?;

        info!(event_name = "orders.order.cancelled", order_id = %order.id.0, "order cancelled");
        Ok(order)
    }

    /// Soft-delete an order. Admin only; the row stays for history.
    pub async fn delete(&self, requester: &User, order_id: &OrderId) -> Result<(), ServiceError> {
        if requester.role != Role::Admin {
            return Err(DomainError::forbidden("only admins may delete orders").into());
        }
        let mut tx = self.pool.begin().await?;
        let mut order = store::fetch_order(&mut tx, order_id)
            .await?
            .filter(|order| order.active)
            .ok_or_else(|| DomainError::not_found("order", order_id.0.clone()))?;
        order.active = false;
        order.updated_at = Some(Utc::now());
        store::update_order(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Assign or reassign a line's supplier by hand. Allowed for admins and
    /// for holders of a grant on the target supplier while the parent order
    /// is Draft or Complete. Re-runs date resolution and batching for the
    /// chosen supplier and records the old and new supplier for audit.
    pub async fn assign_supplier(
        &self,
        caller: &User,
        line_id: &OrderLineId,
        supplier_id: &SupplierId,
    ) -> Result<OrderLine, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let mut line = store::fetch_line(&mut tx, line_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order line", line_id.0.clone()))?;
        let order = store::fetch_order(&mut tx, &line.order_id)
            .await?
            .filter(|order| order.active)
            .ok_or_else(|| DomainError::not_found("order", line.order_id.0.clone()))?;
        if !matches!(order.status, OrderStatus::Draft | OrderStatus::Complete) {
            return Err(DomainError::conflict(format!(
                "suppliers cannot be assigned once the order is {}",
                order.status.as_str()
            ))
            .into());
        }
        if caller.role != Role::Admin
            && !store::has_supplier_grant(&mut tx, &caller.id, supplier_id).await?
        {
            return Err(DomainError::forbidden(format!(
                "no supplier grant for `{}`",
                supplier_id.0
            ))
            .into());
        }

        let supplier = store::fetch_supplier(&mut tx, supplier_id)
            .await?
            .filter(|supplier| supplier.active)
            .ok_or_else(|| DomainError::not_found("supplier", supplier_id.0.clone()))?;

        let routed =
            router::route_to_supplier(&mut tx, self.calendar.as_ref(), self.today(), &order, &supplier)
                .await?;
        let previous = line.supplier_id.clone();
        line.supplier_id = Some(routed.supplier_id);
        line.shipment_batch_id = Some(routed.batch_id);
        store::update_line(&mut tx, &line).await?;

        store::insert_activity(
            &mut tx,
            &ActivityRecord::new(
                "order_line",
                line.id.0.clone(),
                caller.id.clone(),
                ActivityKind::SupplierAssigned,
                "supplier assigned",
            )
            .with_change(
                previous.map(|id| id.0).unwrap_or_else(|| "none".to_string()),
                supplier_id.0.clone(),
            ),
        )
        .await?;
        tx.commit().await?;

        info!(
            event_name = "orders.line.supplier_assigned",
            line_id = %line.id.0,
            supplier_id = %supplier_id.0,
            "supplier assigned to order line"
        );
        Ok(line)
    }

    /// One order with its lines. Non-admins only see orders of departments
    /// within their visible radius.
    pub async fn get(&self, user: &User, order_id: &OrderId) -> Result<OrderDetail, ServiceError> {
        let orders = SqlOrderRepository::new(self.pool.clone());
        let order = orders
            .find_by_id(order_id)
            .await?
            .filter(|order| order.active)
            .ok_or_else(|| DomainError::not_found("order", order_id.0.clone()))?;

        if user.role != Role::Admin {
            let visible = self.visible_departments(user).await?;
            if !visible.contains(&order.department_id) {
                return Err(DomainError::forbidden(
                    "order belongs to a department outside the caller's visible radius",
                )
                .into());
            }
        }

        let lines = orders.lines_for_order(order_id).await?;
        Ok(OrderDetail { order, lines })
    }

    /// All active orders the caller may see.
    pub async fn list(&self, user: &User) -> Result<Vec<Order>, ServiceError> {
        let orders = SqlOrderRepository::new(self.pool.clone());
        if user.role == Role::Admin {
            return Ok(orders.list_active().await?);
        }
        let visible = self.visible_departments(user).await?;
        Ok(orders.list_for_departments(&visible).await?)
    }

    async fn visible_departments(
        &self,
        user: &User,
    ) -> Result<Vec<DepartmentId>, ServiceError> {
        let departments = SqlDepartmentRepository::new(self.pool.clone()).list_all().await?;
        let tree = DepartmentTree::from_departments(departments);
        from_domain(tree.visible_departments(&user.department_id))
    }

    /// Common preamble for line and order mutations: the order must exist,
    /// be active and still a draft, and the requester must pass the edit
    /// gate.
    async fn fetch_draft_order_for_edit(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        requester: &User,
        order_id: &OrderId,
    ) -> Result<Order, ServiceError> {
        let order = store::fetch_order(tx, order_id)
            .await?
            .filter(|order| order.active)
            .ok_or_else(|| DomainError::not_found("order", order_id.0.clone()))?;
        if order.status != OrderStatus::Draft {
            return Err(DomainError::conflict(format!(
                "order is {} and can only be edited as a draft",
                order.status.as_str()
            ))
            .into());
        }
        let tree = store::load_department_tree(tx).await?;
        from_domain(authorize_order_edit(&tree, requester, &order))?.into_result()?;
        Ok(order)
    }

    /// Validate the article, route the line and persist it.
    async fn insert_routed_line(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        order: &Order,
        request: NewLineRequest,
    ) -> Result<OrderLine, ServiceError> {
        from_domain(ensure_positive_quantity(request.quantity))?;
        let article = store::fetch_article(tx, &request.article_id)
            .await?
            .filter(|article| article.active)
            .ok_or_else(|| DomainError::not_found("article", request.article_id.0.clone()))?;

        let resolution =
            router::resolve_line(tx, self.calendar.as_ref(), self.today(), order, &article.id)
                .await?;
        let line = match resolution {
            Resolution::Routed(routed) => OrderLine {
                id: OrderLineId(Uuid::new_v4().to_string()),
                order_id: order.id.clone(),
                article_id: article.id,
                supplier_id: Some(routed.supplier_id),
                shipment_batch_id: Some(routed.batch_id),
                quantity: request.quantity,
                note: request.note,
            },
            Resolution::Unresolved { marker_note } => OrderLine {
                id: OrderLineId(Uuid::new_v4().to_string()),
                order_id: order.id.clone(),
                article_id: article.id,
                supplier_id: None,
                shipment_batch_id: None,
                quantity: request.quantity,
                note: if marker_note { Some(append_marker(request.note)) } else { request.note },
            },
        };
        store::insert_line(tx, &line).await?;
        Ok(line)
    }
}

/// Default to the requester's home department; an explicit target needs
/// Admin or a walk proving the target lies in the requester's subtree.
fn resolve_target_department(
    tree: &DepartmentTree,
    requester: &User,
    requested: Option<DepartmentId>,
) -> Result<DepartmentId, ServiceError> {
    let Some(requested) = requested else {
        return Ok(requester.department_id.clone());
    };
    if requester.role == Role::Admin {
        from_domain(tree.get(&requested).map(|_| ()))?;
        return Ok(requested);
    }
    if !from_domain(tree.is_descendant_of(&requested, &requester.department_id))? {
        return Err(DomainError::forbidden(format!(
            "no reach into department `{}`",
            requested.0
        ))
        .into());
    }
    Ok(requested)
}

fn ensure_not_past(today: NaiveDate, date: NaiveDate) -> Result<(), ServiceError> {
    if date < today {
        return Err(DomainError::conflict(format!("delivery date {date} is in the past")).into());
    }
    Ok(())
}

fn append_marker(note: Option<String>) -> String {
    match note {
        Some(existing) => format!("{existing} | {UNRESOLVED_SUPPLIER_NOTE}"),
        None => UNRESOLVED_SUPPLIER_NOTE.to_string(),
    }
}
