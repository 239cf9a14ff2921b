// Domain entities and the validate -> prepare -> before_save -> project pipeline
pub mod lifecycle;
pub mod permission;
pub mod projection;
pub mod role;
pub mod user;
pub mod validation;

pub use lifecycle::{BcryptHasher, BeforeSave, Prepare, PrepareError, Prepared, SecretHasher, Validated};
pub use permission::Permission;
pub use projection::{list_item_views, Projectable, Projection};
pub use role::{Role, RolePermission};
pub use user::{User, UserLanguage, UserRefreshToken, UserResetPassword, UserRole};
pub use validation::{ErrorCollector, FieldError, Operation, Rules, Validate, ValidationResult};
