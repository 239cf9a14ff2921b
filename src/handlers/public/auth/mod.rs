// handlers/public/auth/mod.rs - Login, session refresh and password recovery
pub mod login;
pub mod password;
pub mod refresh;

pub use login::login;
pub use password::{forgot_password, reset_password};
pub use refresh::refresh;
