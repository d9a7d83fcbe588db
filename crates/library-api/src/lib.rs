//! HTTP API for the library catalog

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use library_auth::{AccountError, AccountService, TokenService, TokenSettings};
use library_db::DbCredentialStore;
use sea_orm::DatabaseConnection;
use std::{future::Future, net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

pub use error::ApiError;

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub accounts: AccountService,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Catalog API",
        version = "0.1.0",
        description = "REST API for the library catalog with bearer token authentication",
        contact(
            name = "Library Team",
            email = "team@library.dev"
        )
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_current_user,
        handlers::books::list_books,
        handlers::books::get_book,
        handlers::books::create_book,
        handlers::books::update_book,
        handlers::books::delete_book,
        handlers::system::health_check,
    ),
    components(
        schemas(
            models::HealthResponse,
            models::ErrorResponse,
            models::RegisterRequest,
            models::RegisterResponse,
            models::LoginRequest,
            models::LoginResponse,
            models::Book,
            models::CreateBookRequest,
            models::UpdateBookRequest,
            models::BookQuery,
            middleware::AuthUser,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and current user"),
        (name = "books", description = "Book catalog endpoints"),
        (name = "system", description = "System health and info endpoints")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected operations
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS for browser clients
    pub enable_cors: bool,
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
    /// Signing key, issuer, audience and lifetime for session tokens
    pub token_settings: TokenSettings,
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
    tokens: Arc<TokenService>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, db: DatabaseConnection) -> Result<Self, AccountError> {
        let tokens = Arc::new(TokenService::new(config.token_settings.clone()));
        let store = Arc::new(DbCredentialStore::new(db.clone()));
        let accounts = AccountService::new(store, tokens.clone())?;

        let state = Arc::new(AppState { db, accounts });

        Ok(Self {
            config,
            state,
            tokens,
        })
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let jwt_state = Arc::new(middleware::JwtState::new(self.tokens.clone()));

        // Build PUBLIC routes (no authentication required)
        let public_router = Router::new()
            .route("/api/health", get(handlers::system::health_check))
            .route("/api/openapi.json", get(handlers::system::openapi_json))
            .route("/api/auth/register", post(handlers::auth::register))
            .route("/api/auth/login", post(handlers::auth::login))
            .route("/api/books", get(handlers::books::list_books))
            .route("/api/books/{id}", get(handlers::books::get_book))
            .with_state(self.state.clone());

        // Build PROTECTED routes (require a bearer token)
        let protected_router = Router::new()
            .route("/api/auth/me", get(handlers::auth::get_current_user))
            .route("/api/books", post(handlers::books::create_book))
            .route(
                "/api/books/{id}",
                put(handlers::books::update_book)
                    .delete(handlers::books::delete_book),
            )
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                jwt_state,
                middleware::require_auth,
            ));

        let mut router = public_router
            .merge(protected_router)
            .layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(self.cors_layer());
        }

        router
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_origin(AllowOrigin::list(origins))
    }

    /// Start the API server, stopping gracefully when `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<(), anyhow::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI document: http://{}/api/openapi.json",
            self.config.bind_addr
        );

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        info!("API server stopped");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/books/{id}"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
