//! Supplier resolution and shipment batching for a single order line.

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use uuid::Uuid;

use pantry_core::domain::article::ArticleId;
use pantry_core::domain::order::Order;
use pantry_core::domain::shipment::ShipmentBatchId;
use pantry_core::domain::supplier::{Supplier, SupplierId};
use pantry_core::errors::DomainError;
use pantry_core::scheduling::{next_delivery_date, HolidayCalendar};

use crate::error::{from_domain, ServiceError};
use crate::store;

/// Marker appended to a line's note when no supplier is linked to the
/// article. The line stays unrouted until someone assigns a supplier.
pub const UNRESOLVED_SUPPLIER_NOTE: &str = "no supplier found - requires manual assignment";

#[derive(Clone, Debug)]
pub(crate) struct RoutedSupplier {
    pub supplier_id: SupplierId,
    pub batch_id: ShipmentBatchId,
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Clone, Debug)]
pub(crate) enum Resolution {
    Routed(RoutedSupplier),
    /// No automatic choice. `marker_note` is set only for the zero-supplier
    /// case; an ambiguous article is left alone for a human to decide.
    Unresolved { marker_note: bool },
}

/// Resolve the supplier for one line of `order`. Exactly one linked, active
/// supplier routes automatically; zero or several leave the line unresolved.
pub(crate) async fn resolve_line(
    conn: &mut SqliteConnection,
    calendar: &dyn HolidayCalendar,
    today: NaiveDate,
    order: &Order,
    article_id: &ArticleId,
) -> Result<Resolution, ServiceError> {
    let links = store::fetch_links(conn, article_id).await?;
    match links.as_slice() {
        [] => Ok(Resolution::Unresolved { marker_note: true }),
        [link] => {
            let supplier = store::fetch_supplier(conn, &link.supplier_id).await?.ok_or_else(
                || DomainError::not_found("supplier", link.supplier_id.0.clone()),
            )?;
            if !supplier.active {
                return Ok(Resolution::Unresolved { marker_note: false });
            }
            let routed = route_to_supplier(conn, calendar, today, order, &supplier).await?;
            Ok(Resolution::Routed(routed))
        }
        _ => Ok(Resolution::Unresolved { marker_note: false }),
    }
}

/// Determine the effective delivery date for `supplier` and attach to the
/// matching Open batch, creating it when absent. The order's own date wins;
/// otherwise fixed-delivery-day suppliers get the next eligible date and
/// everyone else a null date to be resolved downstream.
pub(crate) async fn route_to_supplier(
    conn: &mut SqliteConnection,
    calendar: &dyn HolidayCalendar,
    today: NaiveDate,
    order: &Order,
    supplier: &Supplier,
) -> Result<RoutedSupplier, ServiceError> {
    let delivery_date = match order.delivery_date {
        Some(date) => Some(date),
        None if supplier.fixed_delivery_days => {
            let weekdays = store::fetch_delivery_weekdays(conn, &supplier.id).await?;
            next_delivery_date(today, &weekdays, calendar)
        }
        None => None,
    };
    let batch_id = find_or_create_open_batch(conn, &supplier.id, delivery_date).await?;
    Ok(RoutedSupplier { supplier_id: supplier.id.clone(), batch_id, delivery_date })
}

/// Find the Open batch for `(supplier, delivery date)` or create it. A null
/// date matches only null. The insert is conflict-tolerant: under
/// concurrency the partial unique index makes the losing insert a no-op and
/// the re-select adopts the winner's batch.
pub(crate) async fn find_or_create_open_batch(
    conn: &mut SqliteConnection,
    supplier_id: &SupplierId,
    delivery_date: Option<NaiveDate>,
) -> Result<ShipmentBatchId, ServiceError> {
    let date_text = delivery_date.map(|date| date.format("%Y-%m-%d").to_string());

    if let Some(existing) = select_open_batch(conn, supplier_id, date_text.as_deref()).await? {
        return Ok(existing);
    }

    sqlx::query(
        "INSERT INTO shipment_batch (id, supplier_id, delivery_date, status)
         VALUES (?, ?, ?, 'OPEN')
         ON CONFLICT DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&supplier_id.0)
    .bind(&date_text)
    .execute(&mut *conn)
    .await?;

    match select_open_batch(conn, supplier_id, date_text.as_deref()).await? {
        Some(batch_id) => Ok(batch_id),
        None => from_domain(Err(DomainError::internal(format!(
            "open shipment batch for supplier `{}` disappeared during find-or-create",
            supplier_id.0
        )))),
    }
}

async fn select_open_batch(
    conn: &mut SqliteConnection,
    supplier_id: &SupplierId,
    date_text: Option<&str>,
) -> Result<Option<ShipmentBatchId>, ServiceError> {
    let id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM shipment_batch
         WHERE supplier_id = ? AND status = 'OPEN'
           AND COALESCE(delivery_date, '') = COALESCE(?, '')",
    )
    .bind(&supplier_id.0)
    .bind(date_text)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id.map(ShipmentBatchId))
}
