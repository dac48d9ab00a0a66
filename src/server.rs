use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{ApiConfig, AppConfig, SecurityConfig};
use crate::database::{DatabaseError, DatabaseManager};
use crate::handlers::{pages, protected, public};
use crate::identity::{AccountStore, Identity, IdentityGateway, MemoryAccountStore, PasswordIdentityService, PgAccountStore};
use crate::journal::EntryRepository;
use crate::middleware::{jwt_auth_middleware, navigation_guard_middleware};
use crate::navigation::{NavigationGuard, LOGIN_ROUTE};
use crate::store::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use crate::time_format::Locale;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub entries: EntryRepository,
    pub guard: Arc<NavigationGuard>,
    pub security: SecurityConfig,
    pub api: ApiConfig,
    pub locale: Locale,
}

impl AppState {
    pub fn new(config: &AppConfig, accounts: Arc<dyn AccountStore>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            accounts,
            entries: EntryRepository::new(documents, config.journal.collection.clone()),
            guard: Arc::new(NavigationGuard::default()),
            security: config.security.clone(),
            api: config.api.clone(),
            locale: config.journal.locale,
        }
    }

    /// State over fresh in-memory stores
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryAccountStore::new()),
            Arc::new(MemoryDocumentStore::new()),
        )
    }

    /// Postgres-backed state when DATABASE_URL is configured, in-memory otherwise
    pub async fn connect(config: &AppConfig) -> Result<Self, DatabaseError> {
        if config.database.url.is_none() {
            tracing::warn!("DATABASE_URL not set; accounts and entries are kept in memory");
            return Ok(Self::in_memory(config));
        }

        let db = DatabaseManager::connect(&config.database).await?;
        db.migrate().await?;

        Ok(Self::new(
            config,
            Arc::new(PgAccountStore::new(&db)),
            Arc::new(PgDocumentStore::new(&db)),
        ))
    }

    /// Signed-out session for one request
    pub fn gateway(&self) -> IdentityGateway {
        let service = PasswordIdentityService::new(self.accounts.clone(), self.security.min_password_length);
        IdentityGateway::new(Arc::new(service))
    }

    /// Session resumed for an identity recovered from a verified token
    pub fn gateway_for(&self, identity: Identity) -> IdentityGateway {
        let service =
            PasswordIdentityService::resumed(self.accounts.clone(), self.security.min_password_length, identity);
        IdentityGateway::new(Arc::new(service))
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/api", get(root))
        .route("/health", get(health))
        // Public auth routes
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes(&state))
        // Guarded pages
        .merge(page_routes(&state))
        .layer(DefaultBodyLimit::max(state.api.max_request_size_bytes));

    if state.security.enable_cors {
        router = router.layer(cors_layer(&state.security.cors_origins));
    }
    if state.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(public::register_post))
        .route("/auth/login", post(public::login_post))
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Session management for authenticated users
        .route("/api/auth/whoami", get(protected::session_whoami))
        .route("/api/auth/session", delete(protected::session_logout))
        // Journal entries
        .route(
            "/api/entries",
            get(protected::collection_get).post(protected::collection_post),
        )
        .route(
            "/api/entries/:id",
            get(protected::record_get)
                .patch(protected::record_patch)
                .delete(protected::record_delete),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

/// Page routes are mounted from the guard's route table
fn page_routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();
    for route in state.guard.routes().routes() {
        let handler = match route.name {
            "home" => get(pages::home),
            LOGIN_ROUTE => get(pages::login),
            "signup" => get(pages::signup),
            "entry" => get(pages::entry),
            "new" => get(pages::new_entry),
            other => {
                tracing::warn!("No page handler for route '{}'", other);
                continue;
            }
        };
        router = router.route(route.path, handler);
    }
    router.route_layer(from_fn_with_state(state.clone(), navigation_guard_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|origin| origin.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Journal API (Rust)",
            "version": version,
            "description": "Personal journal service built with Rust (Axum)",
            "endpoints": {
                "public_auth": "/auth/register, /auth/login (public - token acquisition)",
                "auth": "/api/auth/whoami, /api/auth/session (protected)",
                "entries": "/api/entries[/:id] (protected)",
                "pages": "/, /entry/:id, /new (guarded), /login, /signup (public)",
                "health": "/health (public)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.entries.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "store unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
