//! Transaction-scoped queries for the service layer. Every function takes a
//! plain connection so the caller decides the transaction boundary; one
//! logical operation commits exactly once.

use std::collections::HashSet;

use sqlx::SqliteConnection;

use pantry_core::audit::ActivityRecord;
use pantry_core::domain::article::{Article, ArticleId, ArticleSupplierLink};
use pantry_core::domain::department::DepartmentTree;
use pantry_core::domain::order::{Order, OrderId, OrderLine, OrderLineId};
use pantry_core::domain::shipment::{ShipmentBatch, ShipmentBatchId};
use pantry_core::domain::supplier::{Supplier, SupplierId, Weekday};
use pantry_core::domain::user::UserId;
use pantry_db::rows;

use crate::error::ServiceError;

const ORDER_COLUMNS: &str = "id, department_id, creator_id, approver_id, status, delivery_date,
    delivery_notes, additional_articles, active, created_at, updated_at";

const LINE_COLUMNS: &str =
    "id, order_id, article_id, supplier_id, shipment_batch_id, quantity, note";

const BATCH_COLUMNS: &str = "id, supplier_id, delivery_date, status, sender_id, sent_at";

pub(crate) async fn load_department_tree(
    conn: &mut SqliteConnection,
) -> Result<DepartmentTree, ServiceError> {
    let rows = sqlx::query("SELECT id, name, parent_id, active FROM department")
        .fetch_all(&mut *conn)
        .await?;
    let departments = rows
        .iter()
        .map(rows::department_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DepartmentTree::from_departments(departments))
}

pub(crate) async fn fetch_order(
    conn: &mut SqliteConnection,
    id: &OrderId,
) -> Result<Option<Order>, ServiceError> {
    let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(rows::order_from_row).transpose()?)
}

pub(crate) async fn insert_order(
    conn: &mut SqliteConnection,
    order: &Order,
) -> Result<(), ServiceError> {
    sqlx::query(
        "INSERT INTO orders
             (id, department_id, creator_id, approver_id, status, delivery_date,
              delivery_notes, additional_articles, active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&order.id.0)
    .bind(&order.department_id.0)
    .bind(&order.creator_id.0)
    .bind(order.approver_id.as_ref().map(|id| id.0.clone()))
    .bind(order.status.as_str())
    .bind(order.delivery_date.map(|date| date.format("%Y-%m-%d").to_string()))
    .bind(&order.delivery_notes)
    .bind(&order.additional_articles)
    .bind(i64::from(order.active))
    .bind(order.created_at.to_rfc3339())
    .bind(order.updated_at.map(|at| at.to_rfc3339()))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn update_order(
    conn: &mut SqliteConnection,
    order: &Order,
) -> Result<(), ServiceError> {
    sqlx::query(
        "UPDATE orders SET
             approver_id = ?, status = ?, delivery_date = ?, delivery_notes = ?,
             additional_articles = ?, active = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(order.approver_id.as_ref().map(|id| id.0.clone()))
    .bind(order.status.as_str())
    .bind(order.delivery_date.map(|date| date.format("%Y-%m-%d").to_string()))
    .bind(&order.delivery_notes)
    .bind(&order.additional_articles)
    .bind(i64::from(order.active))
    .bind(order.updated_at.map(|at| at.to_rfc3339()))
    .bind(&order.id.0)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn fetch_line(
    conn: &mut SqliteConnection,
    id: &OrderLineId,
) -> Result<Option<OrderLine>, ServiceError> {
    let row = sqlx::query(&format!("SELECT {LINE_COLUMNS} FROM order_line WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(rows::line_from_row).transpose()?)
}

pub(crate) async fn insert_line(
    conn: &mut SqliteConnection,
    line: &OrderLine,
) -> Result<(), ServiceError> {
    sqlx::query(
        "INSERT INTO order_line
             (id, order_id, article_id, supplier_id, shipment_batch_id, quantity, note)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&line.id.0)
    .bind(&line.order_id.0)
    .bind(&line.article_id.0)
    .bind(line.supplier_id.as_ref().map(|id| id.0.clone()))
    .bind(line.shipment_batch_id.as_ref().map(|id| id.0.clone()))
    .bind(line.quantity.to_string())
    .bind(&line.note)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn update_line(
    conn: &mut SqliteConnection,
    line: &OrderLine,
) -> Result<(), ServiceError> {
    sqlx::query(
        "UPDATE order_line SET
             supplier_id = ?, shipment_batch_id = ?, quantity = ?, note = ?
         WHERE id = ?",
    )
    .bind(line.supplier_id.as_ref().map(|id| id.0.clone()))
    .bind(line.shipment_batch_id.as_ref().map(|id| id.0.clone()))
    .bind(line.quantity.to_string())
    .bind(&line.note)
    .bind(&line.id.0)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn delete_line(
    conn: &mut SqliteConnection,
    id: &OrderLineId,
) -> Result<(), ServiceError> {
    sqlx::query("DELETE FROM order_line WHERE id = ?")
        .bind(&id.0)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn lines_for_order(
    conn: &mut SqliteConnection,
    order_id: &OrderId,
) -> Result<Vec<OrderLine>, ServiceError> {
    let rows = sqlx::query(&format!(
        "SELECT {LINE_COLUMNS} FROM order_line WHERE order_id = ?"
    ))
    .bind(&order_id.0)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(rows::line_from_row).collect::<Result<Vec<_>, _>>()?)
}

pub(crate) async fn count_lines(
    conn: &mut SqliteConnection,
    order_id: &OrderId,
) -> Result<i64, ServiceError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_line WHERE order_id = ?")
        .bind(&order_id.0)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub(crate) async fn fetch_article(
    conn: &mut SqliteConnection,
    id: &ArticleId,
) -> Result<Option<Article>, ServiceError> {
    let row = sqlx::query("SELECT id, name, unit, notes, active FROM article WHERE id = ?")
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(rows::article_from_row).transpose()?)
}

pub(crate) async fn fetch_links(
    conn: &mut SqliteConnection,
    article_id: &ArticleId,
) -> Result<Vec<ArticleSupplierLink>, ServiceError> {
    let rows = sqlx::query(
        "SELECT id, article_id, supplier_id, supplier_article_number, price, unit
         FROM article_supplier_link WHERE article_id = ?",
    )
    .bind(&article_id.0)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(rows::link_from_row).collect::<Result<Vec<_>, _>>()?)
}

pub(crate) async fn fetch_supplier(
    conn: &mut SqliteConnection,
    id: &SupplierId,
) -> Result<Option<Supplier>, ServiceError> {
    let row = sqlx::query(
        "SELECT id, name, email, phone, fixed_delivery_days, active FROM supplier WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.as_ref().map(rows::supplier_from_row).transpose()?)
}

pub(crate) async fn fetch_delivery_weekdays(
    conn: &mut SqliteConnection,
    supplier_id: &SupplierId,
) -> Result<HashSet<Weekday>, ServiceError> {
    let values: Vec<String> =
        sqlx::query_scalar("SELECT weekday FROM delivery_day_rule WHERE supplier_id = ?")
            .bind(&supplier_id.0)
            .fetch_all(&mut *conn)
            .await?;
    Ok(values
        .iter()
        .map(|value| rows::weekday_from_str(value))
        .collect::<Result<HashSet<_>, _>>()?)
}

pub(crate) async fn has_supplier_grant(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    supplier_id: &SupplierId,
) -> Result<bool, ServiceError> {
    let exists: i64 = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM supplier_grant WHERE user_id = ? AND supplier_id = ?)",
    )
    .bind(&user_id.0)
    .bind(&supplier_id.0)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists == 1)
}

pub(crate) async fn fetch_batch(
    conn: &mut SqliteConnection,
    id: &ShipmentBatchId,
) -> Result<Option<ShipmentBatch>, ServiceError> {
    let row = sqlx::query(&format!(
        "SELECT {BATCH_COLUMNS} FROM shipment_batch WHERE id = ?"
    ))
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.as_ref().map(rows::batch_from_row).transpose()?)
}

pub(crate) async fn update_batch(
    conn: &mut SqliteConnection,
    batch: &ShipmentBatch,
) -> Result<(), ServiceError> {
    sqlx::query(
        "UPDATE shipment_batch SET
             delivery_date = ?, status = ?, sender_id = ?, sent_at = ?
         WHERE id = ?",
    )
    .bind(batch.delivery_date.map(|date| date.format("%Y-%m-%d").to_string()))
    .bind(batch.status.as_str())
    .bind(batch.sender_id.as_ref().map(|id| id.0.clone()))
    .bind(batch.sent_at.map(|at| at.to_rfc3339()))
    .bind(&batch.id.0)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Completed orders touched by the given batch whose lines now all sit in
/// Sent batches. Unrouted lines keep an order back by definition.
pub(crate) async fn complete_orders_fully_sent(
    conn: &mut SqliteConnection,
    batch_id: &ShipmentBatchId,
) -> Result<Vec<Order>, ServiceError> {
    let rows = sqlx::query(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE active = 1 AND status = 'COMPLETE'
           AND EXISTS (
               SELECT 1 FROM order_line
               WHERE order_line.order_id = orders.id
                 AND order_line.shipment_batch_id = ?
           )
           AND NOT EXISTS (
               SELECT 1 FROM order_line
               LEFT JOIN shipment_batch ON shipment_batch.id = order_line.shipment_batch_id
               WHERE order_line.order_id = orders.id
                 AND (order_line.shipment_batch_id IS NULL OR shipment_batch.status != 'SENT')
           )"
    ))
    .bind(&batch_id.0)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(rows::order_from_row).collect::<Result<Vec<_>, _>>()?)
}

pub(crate) async fn insert_activity(
    conn: &mut SqliteConnection,
    record: &ActivityRecord,
) -> Result<(), ServiceError> {
    let details = record.details.as_ref().map(serde_json::Value::to_string);
    sqlx::query(
        "INSERT INTO activity_log
             (id, entity_type, entity_id, user_id, kind, description,
              old_value, new_value, details, major_event, recorded_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.entity_type)
    .bind(&record.entity_id)
    .bind(&record.user_id.0)
    .bind(record.kind.as_str())
    .bind(&record.description)
    .bind(&record.old_value)
    .bind(&record.new_value)
    .bind(details)
    .bind(i64::from(record.kind.is_major_event()))
    .bind(record.recorded_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
