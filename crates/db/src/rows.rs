//! Row decoding shared by the repositories and the service layer.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use pantry_core::audit::{ActivityKind, ActivityRecord};
use pantry_core::domain::article::{Article, ArticleId, ArticleSupplierLink};
use pantry_core::domain::department::{Department, DepartmentId};
use pantry_core::domain::order::{Order, OrderId, OrderLine, OrderLineId, OrderStatus};
use pantry_core::domain::shipment::{ShipmentBatch, ShipmentBatchId, ShipmentStatus};
use pantry_core::domain::supplier::{Supplier, SupplierId, Weekday};
use pantry_core::domain::user::{Role, User, UserId};

use crate::repositories::RepositoryError;

pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

pub fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    value
        .parse::<Decimal>()
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

pub fn department_from_row(row: &SqliteRow) -> Result<Department, RepositoryError> {
    let parent_id: Option<String> = row.try_get("parent_id")?;
    let active: i64 = row.try_get("active")?;
    Ok(Department {
        id: DepartmentId(row.try_get("id")?),
        name: row.try_get("name")?,
        parent_id: parent_id.map(DepartmentId),
        active: active != 0,
    })
}

pub fn user_from_row(row: &SqliteRow) -> Result<User, RepositoryError> {
    let role: String = row.try_get("role")?;
    let active: i64 = row.try_get("active")?;
    Ok(User {
        id: UserId(row.try_get("id")?),
        name: row.try_get("name")?,
        role: Role::parse(&role)
            .ok_or_else(|| RepositoryError::Decode(format!("role: unknown value `{role}`")))?,
        department_id: DepartmentId(row.try_get("department_id")?),
        active: active != 0,
    })
}

pub fn supplier_from_row(row: &SqliteRow) -> Result<Supplier, RepositoryError> {
    let fixed: i64 = row.try_get("fixed_delivery_days")?;
    let active: i64 = row.try_get("active")?;
    Ok(Supplier {
        id: SupplierId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        fixed_delivery_days: fixed != 0,
        active: active != 0,
    })
}

pub fn weekday_from_str(value: &str) -> Result<Weekday, RepositoryError> {
    Weekday::parse(value)
        .ok_or_else(|| RepositoryError::Decode(format!("weekday: unknown value `{value}`")))
}

pub fn article_from_row(row: &SqliteRow) -> Result<Article, RepositoryError> {
    let active: i64 = row.try_get("active")?;
    Ok(Article {
        id: ArticleId(row.try_get("id")?),
        name: row.try_get("name")?,
        unit: row.try_get("unit")?,
        notes: row.try_get("notes")?,
        active: active != 0,
    })
}

pub fn link_from_row(row: &SqliteRow) -> Result<ArticleSupplierLink, RepositoryError> {
    let price: Option<String> = row.try_get("price")?;
    Ok(ArticleSupplierLink {
        id: row.try_get("id")?,
        article_id: ArticleId(row.try_get("article_id")?),
        supplier_id: SupplierId(row.try_get("supplier_id")?),
        supplier_article_number: row.try_get("supplier_article_number")?,
        price: price.map(|value| parse_decimal("price", &value)).transpose()?,
        unit: row.try_get("unit")?,
    })
}

pub fn order_from_row(row: &SqliteRow) -> Result<Order, RepositoryError> {
    let status: String = row.try_get("status")?;
    let delivery_date: Option<String> = row.try_get("delivery_date")?;
    let approver_id: Option<String> = row.try_get("approver_id")?;
    let active: i64 = row.try_get("active")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: Option<String> = row.try_get("updated_at")?;
    Ok(Order {
        id: OrderId(row.try_get("id")?),
        department_id: DepartmentId(row.try_get("department_id")?),
        creator_id: UserId(row.try_get("creator_id")?),
        approver_id: approver_id.map(UserId),
        status: OrderStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("status: unknown value `{status}`")))?,
        delivery_date: delivery_date
            .map(|value| parse_date("delivery_date", &value))
            .transpose()?,
        delivery_notes: row.try_get("delivery_notes")?,
        additional_articles: row.try_get("additional_articles")?,
        active: active != 0,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: updated_at.map(|value| parse_timestamp("updated_at", &value)).transpose()?,
    })
}

pub fn line_from_row(row: &SqliteRow) -> Result<OrderLine, RepositoryError> {
    let supplier_id: Option<String> = row.try_get("supplier_id")?;
    let shipment_batch_id: Option<String> = row.try_get("shipment_batch_id")?;
    let quantity: String = row.try_get("quantity")?;
    Ok(OrderLine {
        id: OrderLineId(row.try_get("id")?),
        order_id: OrderId(row.try_get("order_id")?),
        article_id: ArticleId(row.try_get("article_id")?),
        supplier_id: supplier_id.map(SupplierId),
        shipment_batch_id: shipment_batch_id.map(ShipmentBatchId),
        quantity: parse_decimal("quantity", &quantity)?,
        note: row.try_get("note")?,
    })
}

pub fn batch_from_row(row: &SqliteRow) -> Result<ShipmentBatch, RepositoryError> {
    let status: String = row.try_get("status")?;
    let delivery_date: Option<String> = row.try_get("delivery_date")?;
    let sender_id: Option<String> = row.try_get("sender_id")?;
    let sent_at: Option<String> = row.try_get("sent_at")?;
    Ok(ShipmentBatch {
        id: ShipmentBatchId(row.try_get("id")?),
        supplier_id: SupplierId(row.try_get("supplier_id")?),
        delivery_date: delivery_date
            .map(|value| parse_date("delivery_date", &value))
            .transpose()?,
        status: ShipmentStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("status: unknown value `{status}`")))?,
        sender_id: sender_id.map(UserId),
        sent_at: sent_at.map(|value| parse_timestamp("sent_at", &value)).transpose()?,
    })
}

pub fn activity_from_row(row: &SqliteRow) -> Result<ActivityRecord, RepositoryError> {
    let kind: String = row.try_get("kind")?;
    let details: Option<String> = row.try_get("details")?;
    let recorded_at: String = row.try_get("recorded_at")?;
    Ok(ActivityRecord {
        id: row.try_get("id")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        user_id: UserId(row.try_get("user_id")?),
        kind: ActivityKind::parse(&kind)
            .ok_or_else(|| RepositoryError::Decode(format!("kind: unknown value `{kind}`")))?,
        description: row.try_get("description")?,
        old_value: row.try_get("old_value")?,
        new_value: row.try_get("new_value")?,
        details: details
            .map(|value| {
                serde_json::from_str(&value)
                    .map_err(|error| RepositoryError::Decode(format!("details: {error}")))
            })
            .transpose()?,
        recorded_at: parse_timestamp("recorded_at", &recorded_at)?,
    })
}
