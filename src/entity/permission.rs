use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::lifecycle::{resolve_uuid, sanitize, BeforeSave, Prepare, PrepareError, SecretHasher};
use crate::entity::projection::{non_empty, Projectable};
use crate::entity::validation::{Operation, Rules, Validate, ValidationResult};

pub const MSG_MODULE_KEY_REQUIRED: &str = "api.msg.error.permission.field_module_key_is_required";
pub const MSG_PERMISSION_KEY_REQUIRED: &str = "api.msg.error.permission.field_permission_key_is_required";

/// A grant such as `users.read`, addressed by module and permission key
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Permission {
    #[serde(skip_deserializing)]
    pub uuid: Option<Uuid>,
    pub module_key: String,
    pub permission_key: String,
    pub description: Option<String>,
    #[serde(skip_deserializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_deserializing)]
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(module_key: &str, permission_key: &str, description: &str) -> Self {
        Self {
            module_key: module_key.to_string(),
            permission_key: permission_key.to_string(),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    /// `module.permission`, e.g. `users.read`
    pub fn key(&self) -> String {
        format!("{}.{}", self.module_key, self.permission_key)
    }
}

impl Validate for Permission {
    fn validate(&self, operation: Operation) -> ValidationResult {
        match operation {
            Operation::Create | Operation::Update => Rules::new()
                .required("module_key", &self.module_key, MSG_MODULE_KEY_REQUIRED)
                .required("permission_key", &self.permission_key, MSG_PERMISSION_KEY_REQUIRED)
                .finish(),
            _ => Vec::new(),
        }
    }
}

impl Prepare for Permission {
    fn prepare(&mut self) {
        self.module_key = sanitize(&self.module_key);
        self.permission_key = sanitize(&self.permission_key);
        self.description = self.description.as_deref().map(sanitize);
        let now = Utc::now();
        self.created_at = now;
        self.updated_at = now;
    }
}

impl BeforeSave for Permission {
    fn before_save(&mut self, _hasher: &dyn SecretHasher) -> Result<(), PrepareError> {
        self.uuid = Some(resolve_uuid(self.uuid));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    pub module_key: String,
    pub permission_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionListItem {
    #[serde(flatten)]
    pub detail: PermissionDetail,
    pub created_at: DateTime<Utc>,
}

impl Projectable for Permission {
    type Detail = PermissionDetail;
    type ListItem = PermissionListItem;

    fn detail_view(&self) -> PermissionDetail {
        PermissionDetail {
            uuid: self.uuid,
            module_key: self.module_key.clone(),
            permission_key: self.permission_key.clone(),
            description: non_empty(&self.description),
        }
    }

    fn list_item_view(&self) -> PermissionListItem {
        PermissionListItem {
            detail: self.detail_view(),
            created_at: self.created_at,
        }
    }
}
