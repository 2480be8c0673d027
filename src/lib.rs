pub mod admission;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod settings;
pub mod store;
pub mod validation;

use std::net::SocketAddr;

use axum::{Router, routing::get};
use handlers::{
    bookings, classes, employees, healthz_live, healthz_ready, members, memberships, products,
    root,
};
use tower_http::LatencyUnit;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::openapi::ApiDoc;
use crate::settings::Settings;
use crate::store::{Backend, SqlStore, StoreResult};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    /// Relational store; always present since employees, classes and bookings live there.
    pub sql: SqlStore,
    /// Selected strategy for members, memberships and products.
    pub backend: Backend,
}

impl AppState {
    pub async fn connect(settings: Settings) -> StoreResult<Self> {
        let sql =
            SqlStore::connect(&settings.database_url, settings.database_max_connections).await?;
        let backend = Backend::connect(settings.storage_backend, &sql, &settings).await?;
        if !settings.storage_backend.members_bookable() {
            warn!(
                "Members are served by the {} backend; bookings only accept relational members and will be refused",
                settings.storage_backend
            );
        }
        Ok(Self {
            settings,
            sql,
            backend,
        })
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let state = AppState::connect(settings).await?;
    let port = state.settings.port;
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting Fitness Center API on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route(
            "/members",
            get(members::list_members).post(members::create_member),
        )
        .route(
            "/members/{id}",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        .route(
            "/employees",
            get(employees::list_employees).post(employees::create_employee),
        )
        .route(
            "/employees/{id}",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::delete_employee),
        )
        .route(
            "/memberships",
            get(memberships::list_memberships).post(memberships::create_membership),
        )
        .route(
            "/memberships/{id}",
            get(memberships::get_membership)
                .put(memberships::update_membership)
                .delete(memberships::delete_membership),
        )
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/classes",
            get(classes::list_classes).post(classes::create_class),
        )
        .route(
            "/classes/{id}",
            get(classes::get_class)
                .put(classes::update_class)
                .delete(classes::delete_class),
        )
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route(
            "/bookings/{id}",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(CorsLayer::permissive()).layer(trace_layer)
}
