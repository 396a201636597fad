use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub parent_id: Option<DepartmentId>,
    pub active: bool,
}

/// Upper bound on the parent-chain length. A walk that goes deeper than this
/// means the stored forest has a cycle.
pub const MAX_TREE_DEPTH: usize = 64;

/// Arena of departments indexed by id with explicit parent links. Tree walks
/// are index-based iteration; a malformed cyclic tree surfaces as
/// `InternalConsistency` instead of infinite recursion.
#[derive(Clone, Debug, Default)]
pub struct DepartmentTree {
    departments: HashMap<String, Department>,
    children: HashMap<String, Vec<DepartmentId>>,
}

impl DepartmentTree {
    pub fn from_departments(departments: impl IntoIterator<Item = Department>) -> Self {
        let mut tree = Self::default();
        for department in departments {
            if let Some(parent_id) = &department.parent_id {
                tree.children
                    .entry(parent_id.0.clone())
                    .or_default()
                    .push(department.id.clone());
            }
            tree.departments.insert(department.id.0.clone(), department);
        }
        tree
    }

    pub fn get(&self, id: &DepartmentId) -> Result<&Department, DomainError> {
        self.departments
            .get(&id.0)
            .ok_or_else(|| DomainError::not_found("department", id.0.clone()))
    }

    pub fn contains(&self, id: &DepartmentId) -> bool {
        self.departments.contains_key(&id.0)
    }

    pub fn len(&self) -> usize {
        self.departments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }

    fn children_of(&self, id: &DepartmentId) -> &[DepartmentId] {
        self.children.get(&id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Walks parent pointers from `candidate` toward the root. Reflexive:
    /// every department is a descendant of itself. A walk that tops out
    /// without meeting `ancestor` is a plain `false`, never an error.
    pub fn is_descendant_of(
        &self,
        candidate: &DepartmentId,
        ancestor: &DepartmentId,
    ) -> Result<bool, DomainError> {
        self.get(ancestor)?;
        if candidate == ancestor {
            self.get(candidate)?;
            return Ok(true);
        }

        let mut current = self.get(candidate)?;
        let mut depth = 0usize;
        while let Some(parent_id) = &current.parent_id {
            depth += 1;
            if depth > MAX_TREE_DEPTH {
                return Err(DomainError::internal(format!(
                    "department parent chain starting at `{}` exceeds {MAX_TREE_DEPTH} levels",
                    candidate.0
                )));
            }
            if parent_id == ancestor {
                return Ok(true);
            }
            current = self.get(parent_id)?;
        }
        Ok(false)
    }

    /// The read-only viewing radius: the home department, its parent (if
    /// any), all active siblings under that parent, and all active direct
    /// children. Deliberately narrower up/down than [`editable_departments`]
    /// reaches down.
    ///
    /// [`editable_departments`]: Self::editable_departments
    pub fn visible_departments(
        &self,
        home: &DepartmentId,
    ) -> Result<Vec<DepartmentId>, DomainError> {
        let department = self.get(home)?;
        let mut visible = vec![department.id.clone()];

        if let Some(parent_id) = &department.parent_id {
            self.get(parent_id)?;
            visible.push(parent_id.clone());
            for sibling_id in self.children_of(parent_id) {
                if visible.contains(sibling_id) {
                    continue;
                }
                if self.get(sibling_id)?.active {
                    visible.push(sibling_id.clone());
                }
            }
        }

        for child_id in self.children_of(home) {
            if visible.contains(child_id) {
                continue;
            }
            if self.get(child_id)?.active {
                visible.push(child_id.clone());
            }
        }

        Ok(visible)
    }

    /// The edit scope: the home department plus every descendant,
    /// recursively. Editing rights flow downward only; no sibling or
    /// ancestor ever appears in the result.
    pub fn editable_departments(
        &self,
        home: &DepartmentId,
    ) -> Result<Vec<DepartmentId>, DomainError> {
        self.get(home)?;

        let mut editable = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([home.clone()]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.0.clone()) {
                return Err(DomainError::internal(format!(
                    "department `{}` reached twice while walking the subtree of `{}`",
                    id.0, home.0
                )));
            }
            for child_id in self.children_of(&id) {
                queue.push_back(child_id.clone());
            }
            editable.push(id);
        }
        Ok(editable)
    }
}
