use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::lifecycle::{resolve_uuid, sanitize, BeforeSave, Prepare, PrepareError, SecretHasher};
use crate::entity::projection::{non_empty, Projectable};
use crate::entity::role::Role;
use crate::entity::validation::{Operation, Rules, Validate, ValidationResult, MIN_PASSWORD_LENGTH};

pub const MSG_FIRST_NAME_REQUIRED: &str = "api.msg.error.user.field_first_name_is_required";
pub const MSG_LAST_NAME_REQUIRED: &str = "api.msg.error.user.field_last_name_is_required";
pub const MSG_PASSWORD_REQUIRED: &str = "api.msg.error.user.field_password_is_required";
pub const MSG_PASSWORD_LENGTH: &str = "api.msg.error.invalid_password_length";
pub const MSG_EMAIL_REQUIRED: &str = "api.msg.error.user.field_email_is_required";
pub const MSG_EMAIL_INVALID: &str = "api.msg.error.invalid_email";
pub const MSG_NEW_PASSWORD_REQUIRED: &str = "api.msg.error.user.field_new_password_is_required";
pub const MSG_CONFIRM_PASSWORD_REQUIRED: &str = "api.msg.error.user.field_confirm_password_is_required";
pub const MSG_PASSWORD_MISMATCH: &str = "api.msg.error.user.field_new_and_confirm_password_does_not_match";
pub const MSG_REFRESH_TOKEN_REQUIRED: &str = "api.msg.error.user.field_refresh_token_is_required";
pub const MSG_LANGUAGE_REQUIRED: &str = "api.msg.error.user.field_language_is_required";
pub const MSG_LANGUAGE_UNSUPPORTED: &str = "api.msg.error.unsupported_language";

/// Language codes a session can switch to
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["en", "id"];

/// A user account. `password` holds plaintext until `before_save` replaces
/// it with its hash.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(skip_deserializing)]
    pub uuid: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    #[serde(skip_deserializing)]
    pub avatar_uuid: Option<Uuid>,
    #[serde(skip_deserializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_deserializing)]
    pub updated_at: DateTime<Utc>,
    #[serde(skip_deserializing)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_deserializing)]
    pub user_roles: Vec<UserRole>,
}

/// Join record between a user and a role; `role` is filled when resolved
#[derive(Debug, Clone, Default)]
pub struct UserRole {
    pub uuid: Option<Uuid>,
    pub user_uuid: Uuid,
    pub role_uuid: Uuid,
    pub role: Option<Role>,
}

/// Payload of the password reset form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserResetPassword {
    pub new_password: String,
    pub confirm_password: String,
}

/// Payload of `POST /refresh`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserRefreshToken {
    pub refresh_token: String,
}

/// Payload of `POST /language`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserLanguage {
    pub language: String,
}

impl Validate for User {
    fn validate(&self, operation: Operation) -> ValidationResult {
        let rules = Rules::new();
        let rules = match operation {
            Operation::Create => rules
                .required("first_name", &self.first_name, MSG_FIRST_NAME_REQUIRED)
                .required("last_name", &self.last_name, MSG_LAST_NAME_REQUIRED)
                .required("password", &self.password, MSG_PASSWORD_REQUIRED)
                .min_length("password", &self.password, MIN_PASSWORD_LENGTH, MSG_PASSWORD_LENGTH)
                .required("email", &self.email, MSG_EMAIL_REQUIRED)
                .email("email", &self.email, MSG_EMAIL_INVALID),
            Operation::Update => rules
                .required("first_name", &self.first_name, MSG_FIRST_NAME_REQUIRED)
                .required("last_name", &self.last_name, MSG_LAST_NAME_REQUIRED)
                .required("email", &self.email, MSG_EMAIL_REQUIRED)
                .email("email", &self.email, MSG_EMAIL_INVALID),
            Operation::Login => rules
                .required("password", &self.password, MSG_PASSWORD_REQUIRED)
                .required("email", &self.email, MSG_EMAIL_REQUIRED)
                .email("email", &self.email, MSG_EMAIL_INVALID),
            Operation::ForgotPassword => rules
                .required("email", &self.email, MSG_EMAIL_REQUIRED)
                .email("email", &self.email, MSG_EMAIL_INVALID),
            Operation::ResetPassword | Operation::Refresh | Operation::SwitchLanguage => rules,
        };
        rules.finish()
    }
}

impl Validate for UserResetPassword {
    fn validate(&self, operation: Operation) -> ValidationResult {
        if operation != Operation::ResetPassword {
            return Vec::new();
        }
        Rules::new()
            .required("new_password", &self.new_password, MSG_NEW_PASSWORD_REQUIRED)
            .required("confirm_password", &self.confirm_password, MSG_CONFIRM_PASSWORD_REQUIRED)
            .matches(
                "new_password",
                &self.new_password,
                "confirm_password",
                &self.confirm_password,
                MSG_PASSWORD_MISMATCH,
            )
            .finish()
    }
}

impl Validate for UserRefreshToken {
    fn validate(&self, operation: Operation) -> ValidationResult {
        if operation != Operation::Refresh {
            return Vec::new();
        }
        Rules::new()
            .required("refresh_token", &self.refresh_token, MSG_REFRESH_TOKEN_REQUIRED)
            .finish()
    }
}

impl Validate for UserLanguage {
    fn validate(&self, operation: Operation) -> ValidationResult {
        if operation != Operation::SwitchLanguage {
            return Vec::new();
        }
        Rules::new()
            .required("language", &self.language, MSG_LANGUAGE_REQUIRED)
            .one_of("language", &self.language, &SUPPORTED_LANGUAGES, MSG_LANGUAGE_UNSUPPORTED)
            .finish()
    }
}

impl Prepare for User {
    fn prepare(&mut self) {
        self.first_name = sanitize(&self.first_name);
        self.last_name = sanitize(&self.last_name);
        self.email = sanitize(&self.email);
        self.phone = self.phone.as_deref().map(sanitize);
        let now = Utc::now();
        self.created_at = now;
        self.updated_at = now;
    }
}

impl BeforeSave for User {
    fn before_save(&mut self, hasher: &dyn SecretHasher) -> Result<(), PrepareError> {
        let hashed = hasher.hash(&self.password)?;
        self.uuid = Some(resolve_uuid(self.uuid));
        self.password = hashed;
        Ok(())
    }
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    fn fields(&self) -> UserFields {
        UserFields {
            uuid: self.uuid,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: non_empty(&self.phone),
        }
    }

    /// Role summaries for every join record whose role has been resolved
    pub fn role_summaries(&self) -> Vec<RoleSummary> {
        self.user_roles
            .iter()
            .filter_map(|user_role| user_role.role.as_ref())
            .map(|role| RoleSummary {
                uuid: role.uuid,
                name: role.name.clone(),
            })
            .collect()
    }
}

/// Public attributes shared by every user view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub fields: UserFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RoleSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserListItem {
    #[serde(flatten)]
    pub fields: UserFields,
    pub created_at: DateTime<Utc>,
}

impl Projectable for User {
    type Detail = UserDetail;
    type ListItem = UserListItem;

    fn detail_view(&self) -> UserDetail {
        self.detail_with_asset(None)
    }

    fn list_item_view(&self) -> UserListItem {
        UserListItem {
            fields: self.fields(),
            created_at: self.created_at,
        }
    }

    fn detail_with_asset(&self, asset: Option<String>) -> UserDetail {
        UserDetail {
            fields: self.fields(),
            avatar: non_empty(&asset),
            roles: self.role_summaries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::lifecycle::tests::{fast_hasher, FailingHasher};
    use crate::entity::lifecycle::Validated;
    use crate::entity::projection::{list_item_views, Projection};

    fn user(first: &str, last: &str, password: &str, email: &str) -> User {
        User {
            first_name: first.to_string(),
            last_name: last.to_string(),
            password: password.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    fn pairs(errors: &ValidationResult) -> Vec<(&str, &str)> {
        errors
            .iter()
            .map(|e| (e.field.as_str(), e.message.as_str()))
            .collect()
    }

    #[test]
    fn test_create_reports_errors_in_declaration_order() {
        let errors = user("", "Doe", "ab", "not-an-email").validate(Operation::Create);
        assert_eq!(
            pairs(&errors),
            vec![
                ("first_name", MSG_FIRST_NAME_REQUIRED),
                ("password", MSG_PASSWORD_LENGTH),
                ("email", MSG_EMAIL_INVALID),
            ]
        );
    }

    #[test]
    fn test_create_empty_user_reports_each_missing_field() {
        let errors = User::default().validate(Operation::Create);
        assert_eq!(
            pairs(&errors),
            vec![
                ("first_name", MSG_FIRST_NAME_REQUIRED),
                ("last_name", MSG_LAST_NAME_REQUIRED),
                ("password", MSG_PASSWORD_REQUIRED),
                ("email", MSG_EMAIL_REQUIRED),
            ]
        );
    }

    #[test]
    fn test_well_formed_user_passes_every_operation() {
        let valid = user("Jane", "Doe", "secret1", "jane@example.com");
        for op in [
            Operation::Create,
            Operation::Update,
            Operation::Login,
            Operation::ForgotPassword,
            Operation::ResetPassword,
            Operation::Refresh,
            Operation::SwitchLanguage,
        ] {
            assert!(valid.validate(op).is_empty(), "{:?} should pass", op);
        }
    }

    #[test]
    fn test_update_does_not_require_password() {
        let errors = user("Jane", "Doe", "", "jane@example.com").validate(Operation::Update);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_language_switch_accepts_only_supported_codes() {
        let switch = |language: &str| UserLanguage {
            language: language.to_string(),
        };
        assert!(switch("id").validate(Operation::SwitchLanguage).is_empty());
        assert_eq!(
            pairs(&switch("").validate(Operation::SwitchLanguage)),
            vec![("language", MSG_LANGUAGE_REQUIRED)]
        );
        assert_eq!(
            pairs(&switch("fr").validate(Operation::SwitchLanguage)),
            vec![("language", MSG_LANGUAGE_UNSUPPORTED)]
        );
        assert!(switch("").validate(Operation::Create).is_empty());
    }

    #[test]
    fn test_login_binds_required_errors_to_their_own_fields() {
        let errors = User::default().validate(Operation::Login);
        assert_eq!(
            pairs(&errors),
            vec![("password", MSG_PASSWORD_REQUIRED), ("email", MSG_EMAIL_REQUIRED)]
        );
        assert_eq!(errors[0].context["Field"], "password");
        assert_eq!(errors[1].context["Field"], "email");
    }

    #[test]
    fn test_forgot_password_only_checks_email() {
        let errors = user("", "", "", "nope").validate(Operation::ForgotPassword);
        assert_eq!(pairs(&errors), vec![("email", MSG_EMAIL_INVALID)]);
    }

    #[test]
    fn test_reset_password_mismatch_yields_two_errors() {
        let reset = UserResetPassword {
            new_password: "abc123".to_string(),
            confirm_password: "abc124".to_string(),
        };
        let errors = reset.validate(Operation::ResetPassword);
        assert_eq!(
            pairs(&errors),
            vec![
                ("new_password", MSG_PASSWORD_MISMATCH),
                ("confirm_password", MSG_PASSWORD_MISMATCH),
            ]
        );
    }

    #[test]
    fn test_reset_password_missing_confirmation() {
        let reset = UserResetPassword {
            new_password: "abc123".to_string(),
            confirm_password: String::new(),
        };
        let errors = reset.validate(Operation::ResetPassword);
        assert_eq!(
            pairs(&errors),
            vec![
                ("confirm_password", MSG_CONFIRM_PASSWORD_REQUIRED),
                ("new_password", MSG_PASSWORD_MISMATCH),
                ("confirm_password", MSG_PASSWORD_MISMATCH),
            ]
        );
    }

    #[test]
    fn test_prepare_trims_escapes_and_stamps() {
        let mut u = user("  <b>Jane</b> ", " Doe ", "secret1", " jane@example.com ");
        u.prepare();
        assert_eq!(u.first_name, "&lt;b&gt;Jane&lt;/b&gt;");
        assert_eq!(u.last_name, "Doe");
        assert_eq!(u.email, "jane@example.com");
        assert_eq!(u.created_at, u.updated_at);
        assert!(u.created_at > DateTime::<Utc>::default());
    }

    #[test]
    fn test_prepare_is_idempotent_on_text_fields() {
        let mut once = user(" Jane ", "Doe", "secret1", "jane@example.com");
        once.prepare();
        let mut twice = once.clone();
        twice.prepare();
        assert_eq!(once.first_name, twice.first_name);
        assert_eq!(once.last_name, twice.last_name);
        assert_eq!(once.email, twice.email);
    }

    #[test]
    fn test_before_save_assigns_uuid_once_and_hashes_password() {
        let hasher = fast_hasher();
        let mut u = user("Jane", "Doe", "secret1", "jane@example.com");
        u.before_save(&hasher).unwrap();

        let assigned = u.uuid.expect("uuid assigned");
        assert_eq!(assigned.to_string().len(), 36);
        assert_ne!(u.password, "secret1");
        assert!(!u.password.contains("secret1"));
        assert!(hasher.verify("secret1", &u.password).unwrap());

        u.before_save(&hasher).unwrap();
        assert_eq!(u.uuid, Some(assigned));
    }

    #[test]
    fn test_before_save_keeps_existing_uuid() {
        let existing = Uuid::new_v4();
        let mut u = user("Jane", "Doe", "secret1", "jane@example.com");
        u.uuid = Some(existing);
        u.before_save(&fast_hasher()).unwrap();
        assert_eq!(u.uuid, Some(existing));
    }

    #[test]
    fn test_before_save_failure_leaves_user_untouched() {
        let mut u = user("Jane", "Doe", "secret1", "jane@example.com");
        let err = u.before_save(&FailingHasher).unwrap_err();
        assert!(matches!(err, PrepareError::HashingError(_)));
        assert!(u.uuid.is_none());
        assert_eq!(u.password, "secret1");
    }

    #[test]
    fn test_invalid_user_never_reaches_prepared() {
        let result = Validated::check(user("", "Doe", "secret1", "jane@example.com"), Operation::Create);
        assert_eq!(result.unwrap_err().len(), 1);

        let prepared = Validated::check(user(" Jane ", "Doe", "secret1", "jane@example.com"), Operation::Create)
            .unwrap()
            .prepare()
            .before_save(&fast_hasher())
            .unwrap();
        assert_eq!(prepared.entity().first_name, "Jane");
        assert!(prepared.entity().uuid.is_some());
    }

    #[test]
    fn test_detail_view_hides_password_and_blank_phone() {
        let mut u = user("Jane", "Doe", "secret1", "jane@example.com");
        u.uuid = Some(Uuid::new_v4());
        u.phone = Some("   ".to_string());

        let value = u.project(Projection::Detail).unwrap();
        assert!(value.get("password").is_none());
        assert!(value.get("phone").is_none());
        assert!(value.get("avatar").is_none());
        assert!(value.get("roles").is_none());
        assert_eq!(value["first_name"], "Jane");
    }

    #[test]
    fn test_detail_view_resolves_role_names() {
        let role = Role {
            uuid: Some(Uuid::new_v4()),
            name: "Admin".to_string(),
            ..Default::default()
        };
        let mut u = user("Jane", "Doe", "secret1", "jane@example.com");
        u.user_roles = vec![
            UserRole {
                role_uuid: role.uuid.unwrap(),
                role: Some(role.clone()),
                ..Default::default()
            },
            UserRole {
                role_uuid: Uuid::new_v4(),
                role: None,
                ..Default::default()
            },
        ];

        let detail = u.detail_view();
        assert_eq!(detail.roles.len(), 1);
        assert_eq!(detail.roles[0].name, "Admin");
    }

    #[test]
    fn test_detail_with_asset_carries_avatar() {
        let u = user("Jane", "Doe", "secret1", "jane@example.com");
        let value = u
            .project(Projection::DetailWithAsset(Some("https://cdn.example.com/a.png".to_string())))
            .unwrap();
        assert_eq!(value["avatar"], "https://cdn.example.com/a.png");
    }

    #[test]
    fn test_list_items_preserve_order_without_relations() {
        let users: Vec<User> = (0..5)
            .map(|i| {
                let mut u = user(&format!("User{}", i), "Doe", "secret1", "u@example.com");
                u.user_roles.push(UserRole {
                    role: Some(Role {
                        name: "Admin".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                });
                u
            })
            .collect();

        let items = list_item_views(&users);
        assert_eq!(items.len(), 5);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.fields.first_name, format!("User{}", i));
            let value = serde_json::to_value(item).unwrap();
            assert!(value.get("roles").is_none());
            assert!(value.get("created_at").is_some());
        }
    }
}
