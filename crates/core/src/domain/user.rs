use serde::{Deserialize, Serialize};

use crate::domain::department::DepartmentId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Closed role set. Admin bypasses department scoping entirely; Approver may
/// edit completed orders and release shipment batches for granted suppliers;
/// Requester creates and edits draft orders within their subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Approver,
    Requester,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Approver => "APPROVER",
            Self::Requester => "REQUESTER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Self::Admin),
            "APPROVER" => Some(Self::Approver),
            "REQUESTER" => Some(Self::Requester),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub department_id: DepartmentId,
    pub active: bool,
}
