use serde::{Deserialize, Serialize};

use crate::domain::department::DepartmentTree;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::user::{Role, User};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditDenial {
    OrderNotEditable { status: OrderStatus },
    OutsideEditableScope { department_id: String },
    ApproverRoleRequired { role: Role },
}

impl EditDenial {
    fn reason(&self) -> String {
        match self {
            Self::OrderNotEditable { status } => {
                format!("order in status `{}` can no longer be edited", status.as_str())
            }
            Self::OutsideEditableScope { department_id } => {
                format!("department `{department_id}` is outside the caller's editable subtree")
            }
            Self::ApproverRoleRequired { role } => {
                format!(
                    "completed orders require the approver role, caller is `{}`",
                    role.as_str()
                )
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDecision {
    pub allowed: bool,
    pub reason: String,
    pub denial: Option<EditDenial>,
}

impl EditDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self { allowed: true, reason: reason.into(), denial: None }
    }

    fn deny(denial: EditDenial) -> Self {
        Self { allowed: false, reason: denial.reason(), denial: Some(denial) }
    }

    pub fn into_result(self) -> Result<(), DomainError> {
        if self.allowed {
            Ok(())
        } else {
            Err(DomainError::forbidden(self.reason))
        }
    }
}

/// The canonical mutation gate: every order edit path asks this one
/// function. Terminal orders are editable by nobody. Admin edits any open
/// order. Everyone else needs the order's department inside their editable
/// subtree, and editing a completed order additionally needs the Approver
/// role (Complete marks an order as ready for approval; only approvers may
/// still adjust it before it is placed).
pub fn authorize_order_edit(
    tree: &DepartmentTree,
    user: &User,
    order: &Order,
) -> Result<EditDecision, DomainError> {
    if order.status.is_terminal() {
        return Ok(EditDecision::deny(EditDenial::OrderNotEditable { status: order.status }));
    }

    if user.role == Role::Admin {
        return Ok(EditDecision::allow("admin may edit any open order"));
    }

    let editable = tree.editable_departments(&user.department_id)?;
    if !editable.contains(&order.department_id) {
        return Ok(EditDecision::deny(EditDenial::OutsideEditableScope {
            department_id: order.department_id.0.clone(),
        }));
    }

    if order.status == OrderStatus::Complete && user.role != Role::Approver {
        return Ok(EditDecision::deny(EditDenial::ApproverRoleRequired { role: user.role }));
    }

    Ok(EditDecision::allow(format!(
        "department `{}` lies within the caller's editable subtree",
        order.department_id.0
    )))
}
