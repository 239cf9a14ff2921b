use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::entity::{Permission, Role, User};

/// Page request taken from `?page=&per_page=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, per_page: 10 }
    }
}

impl Page {
    pub const MAX_PER_PAGE: u64 = 100;

    /// Clamp to page >= 1 and 1..=MAX_PER_PAGE items
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    /// Saturates, so an absurd `page` yields an empty page instead of overflowing
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

/// Pagination block returned next to list data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_page: u64,
}

impl PageMeta {
    pub fn new(page: Page, total: u64) -> Self {
        let total_page = if page.per_page == 0 {
            0
        } else {
            total.div_ceil(page.per_page)
        };
        Self {
            page: page.page,
            per_page: page.per_page,
            total,
            total_page,
        }
    }
}

/// Drop repeated ids, keeping the first occurrence of each in order
pub fn dedup_uuids(uuids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    uuids.iter().copied().filter(|uuid| seen.insert(*uuid)).collect()
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a prepared user; the uuid must already be assigned
    async fn create_user(&self, user: &User) -> Result<User, DatabaseError>;

    /// Update the public attributes of a live user
    async fn update_user(&self, uuid: Uuid, user: &User) -> Result<User, DatabaseError>;

    async fn update_user_password(&self, uuid: Uuid, password_hash: &str) -> Result<(), DatabaseError>;

    /// Soft delete
    async fn delete_user(&self, uuid: Uuid) -> Result<(), DatabaseError>;

    /// Fetch a live user with its roles resolved
    async fn get_user(&self, uuid: Uuid) -> Result<User, DatabaseError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Newest first, without relations
    async fn list_users(&self, page: Page) -> Result<(Vec<User>, u64), DatabaseError>;

    /// Replace the user's roles; repeated ids are assigned once
    async fn set_user_roles(&self, user_uuid: Uuid, role_uuids: &[Uuid]) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create_role(&self, role: &Role) -> Result<Role, DatabaseError>;

    async fn update_role(&self, uuid: Uuid, role: &Role) -> Result<Role, DatabaseError>;

    async fn delete_role(&self, uuid: Uuid) -> Result<(), DatabaseError>;

    /// Fetch a live role with its permissions resolved
    async fn get_role(&self, uuid: Uuid) -> Result<Role, DatabaseError>;

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>, DatabaseError>;

    async fn list_roles(&self, page: Page) -> Result<(Vec<Role>, u64), DatabaseError>;

    /// Replace the role's permissions; repeated ids are assigned once
    async fn set_role_permissions(&self, role_uuid: Uuid, permission_uuids: &[Uuid]) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn create_permission(&self, permission: &Permission) -> Result<Permission, DatabaseError>;

    async fn get_permission(&self, uuid: Uuid) -> Result<Permission, DatabaseError>;

    async fn get_permission_by_key(
        &self,
        module_key: &str,
        permission_key: &str,
    ) -> Result<Option<Permission>, DatabaseError>;

    async fn list_permissions(&self, page: Page) -> Result<(Vec<Permission>, u64), DatabaseError>;
}

/// Every repository behind one backend
#[async_trait]
pub trait Store: UserRepository + RoleRepository + PermissionRepository {
    async fn health_check(&self) -> Result<(), DatabaseError>;
}

pub type SharedStore = Arc<dyn Store>;

/// Entities reach storage only after `before_save` assigned their uuid
pub(crate) fn require_uuid(uuid: Option<Uuid>, entity: &str) -> Result<Uuid, DatabaseError> {
    uuid.ok_or_else(|| DatabaseError::QueryError(format!("{} has no uuid; run before_save first", entity)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_normalization_and_offset() {
        let page = Page { page: 0, per_page: 500 }.normalized();
        assert_eq!(page, Page { page: 1, per_page: Page::MAX_PER_PAGE });
        assert_eq!(page.offset(), 0);
        assert_eq!(Page { page: 3, per_page: 10 }.offset(), 20);
    }

    #[test]
    fn test_huge_page_offset_saturates() {
        let page = Page { page: u64::MAX, per_page: 10 }.normalized();
        assert_eq!(page.offset(), u64::MAX);
    }

    #[test]
    fn test_dedup_uuids_keeps_first_occurrence() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup_uuids(&[b, a, b, a]), vec![b, a]);
        assert!(dedup_uuids(&[]).is_empty());
    }

    #[test]
    fn test_page_meta_rounds_up() {
        let meta = PageMeta::new(Page { page: 1, per_page: 10 }, 21);
        assert_eq!(meta.total_page, 3);
        assert_eq!(PageMeta::new(Page::default(), 0).total_page, 0);
    }
}
