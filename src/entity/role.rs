use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::lifecycle::{resolve_uuid, sanitize, BeforeSave, Prepare, PrepareError, SecretHasher};
use crate::entity::permission::{Permission, PermissionDetail};
use crate::entity::projection::Projectable;
use crate::entity::validation::{Operation, Rules, Validate, ValidationResult};

pub const MSG_NAME_REQUIRED: &str = "api.msg.error.role.field_name_is_required";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Role {
    #[serde(skip_deserializing)]
    pub uuid: Option<Uuid>,
    pub name: String,
    #[serde(skip_deserializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_deserializing)]
    pub updated_at: DateTime<Utc>,
    #[serde(skip_deserializing)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_deserializing)]
    pub role_permissions: Vec<RolePermission>,
}

#[derive(Debug, Clone, Default)]
pub struct RolePermission {
    pub uuid: Option<Uuid>,
    pub role_uuid: Uuid,
    pub permission_uuid: Uuid,
    pub permission: Option<Permission>,
}

impl Validate for Role {
    fn validate(&self, operation: Operation) -> ValidationResult {
        match operation {
            Operation::Create | Operation::Update => Rules::new()
                .required("name", &self.name, MSG_NAME_REQUIRED)
                .finish(),
            _ => Vec::new(),
        }
    }
}

impl Prepare for Role {
    fn prepare(&mut self) {
        self.name = sanitize(&self.name);
        let now = Utc::now();
        self.created_at = now;
        self.updated_at = now;
    }
}

impl BeforeSave for Role {
    fn before_save(&mut self, _hasher: &dyn SecretHasher) -> Result<(), PrepareError> {
        self.uuid = Some(resolve_uuid(self.uuid));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleDetail {
    #[serde(flatten)]
    pub fields: RoleFields,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<PermissionDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleListItem {
    #[serde(flatten)]
    pub fields: RoleFields,
    pub created_at: DateTime<Utc>,
}

impl Role {
    fn fields(&self) -> RoleFields {
        RoleFields {
            uuid: self.uuid,
            name: self.name.clone(),
        }
    }
}

impl Projectable for Role {
    type Detail = RoleDetail;
    type ListItem = RoleListItem;

    fn detail_view(&self) -> RoleDetail {
        RoleDetail {
            fields: self.fields(),
            permissions: self
                .role_permissions
                .iter()
                .filter_map(|rp| rp.permission.as_ref())
                .map(|permission| permission.detail_view())
                .collect(),
        }
    }

    fn list_item_view(&self) -> RoleListItem {
        RoleListItem {
            fields: self.fields(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::lifecycle::tests::FailingHasher;
    use crate::entity::projection::Projection;

    #[test]
    fn test_role_requires_name_on_create_and_update() {
        let role = Role::default();
        assert_eq!(role.validate(Operation::Create)[0].message, MSG_NAME_REQUIRED);
        assert_eq!(role.validate(Operation::Update).len(), 1);
        assert!(role.validate(Operation::Login).is_empty());
    }

    #[test]
    fn test_role_before_save_never_touches_hasher() {
        let mut role = Role {
            name: "Admin".to_string(),
            ..Default::default()
        };
        role.before_save(&FailingHasher).unwrap();
        assert!(role.uuid.is_some());
    }

    #[test]
    fn test_role_detail_lists_resolved_permissions() {
        let permission = Permission {
            uuid: Some(Uuid::new_v4()),
            module_key: "users".to_string(),
            permission_key: "read".to_string(),
            ..Default::default()
        };
        let role = Role {
            uuid: Some(Uuid::new_v4()),
            name: "Admin".to_string(),
            role_permissions: vec![RolePermission {
                permission_uuid: permission.uuid.unwrap(),
                permission: Some(permission),
                ..Default::default()
            }],
            ..Default::default()
        };

        let detail = role.project(Projection::Detail).unwrap();
        assert_eq!(detail["permissions"][0]["module_key"], "users");

        let item = role.project(Projection::ListItem).unwrap();
        assert!(item.get("permissions").is_none());
        assert_eq!(item["name"], "Admin");
    }
}
