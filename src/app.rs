use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{AuthError, JwtKeys};
use crate::config::AppConfig;
use crate::database::SharedStore;
use crate::entity::{BcryptHasher, SecretHasher};
use crate::handlers::{self, protected, public};
use crate::i18n::{Language, Translator};
use crate::middleware::{
    cors_layer, jwt_auth_middleware, localize_middleware, request_id_middleware, request_logger_middleware,
};

pub const API_PREFIX: &str = "/api/v1/external";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid security configuration: {0}")]
    Auth(#[from] AuthError),

    #[error("Failed to load message catalogues: {0}")]
    Catalogue(#[from] serde_yaml::Error),
}

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: SharedStore,
    pub jwt: Arc<JwtKeys>,
    pub hasher: Arc<dyn SecretHasher>,
    pub translator: Arc<Translator>,
}

impl AppState {
    pub fn new(config: AppConfig, store: SharedStore) -> Result<Self, StartupError> {
        let jwt = JwtKeys::from_config(&config.security)?;
        let language = Language::from_tag(&config.app.language).unwrap_or(Language::En);
        let translator = Translator::load(language)?;
        let hasher = BcryptHasher::new(config.security.bcrypt_cost);

        Ok(Self {
            config: Arc::new(config),
            store,
            jwt: Arc::new(jwt),
            hasher: Arc::new(hasher),
            translator: Arc::new(translator),
        })
    }

    /// Public URL of a stored asset
    pub fn asset_url(&self, asset_uuid: Option<Uuid>) -> Option<String> {
        let base = self.config.storage.asset_base_url.trim_end_matches('/');
        asset_uuid.map(|uuid| format!("{}/{}", base, uuid))
    }
}

/// Build the application router with the middleware enabled in config
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()));

    let mut router = Router::new()
        .nest(API_PREFIX, api)
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.translator.clone(), localize_middleware));

    if config.app.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    if config.app.enable_logger {
        router = router
            .layer(from_fn(request_logger_middleware))
            .layer(TraceLayer::new_for_http());
    }
    if config.app.enable_request_id {
        router = router.layer(from_fn(request_id_middleware));
    }

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(public::ping))
        .route("/health", get(public::health))
        .route("/login", post(public::auth::login))
        .route("/refresh", post(public::auth::refresh))
        .route("/password/forgot", post(public::auth::forgot_password))
        .route("/password/reset/:token", post(public::auth::reset_password))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{language, permissions, profile, roles, users};

    Router::new()
        .route("/profile", get(profile::get_profile))
        .route("/language", post(language::switch_language))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:uuid",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route(
            "/roles/:uuid",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
        .route("/permissions", get(permissions::list_permissions))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}
