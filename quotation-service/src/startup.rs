use crate::config::ServiceConfig;
use crate::handlers;
use crate::services::pdf::PdfRenderer;
use crate::services::{Database, QuotationService};
use axum::middleware::from_fn;
use axum::{
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub db: Arc<Database>,
    pub quotations: Arc<QuotationService>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: ServiceConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;
        db.run_migrations().await?;
        let db = Arc::new(db);

        let renderer = PdfRenderer::new(
            &config.documents.font_dir,
            &config.documents.font_family,
            &config.documents.image_base_url,
        );
        let quotations = Arc::new(QuotationService::new(
            db.clone(),
            renderer,
            &config.documents.storage_path,
        ));

        let state = AppState {
            config: config.clone(),
            db,
            quotations,
        };

        let app = router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

/// Full route table. The business paths are Spanish because that is the
/// contract the existing frontend consumes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_handler))
        .route(
            "/clientes",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/clientes/:id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/clientes/:id/proyectos",
            get(handlers::clients::list_client_projects),
        )
        .route(
            "/clientes/:id/cotizaciones",
            get(handlers::clients::list_client_quotations),
        )
        .route(
            "/proyectos",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/proyectos/:id",
            get(handlers::projects::get_project)
                .put(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        .route(
            "/proyectos/:id/reasignar",
            put(handlers::projects::reassign_project),
        )
        .route(
            "/productos",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/productos/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/proveedores",
            get(handlers::suppliers::list_suppliers).post(handlers::suppliers::create_supplier),
        )
        .route(
            "/proveedores/:id",
            get(handlers::suppliers::get_supplier)
                .put(handlers::suppliers::update_supplier)
                .delete(handlers::suppliers::delete_supplier),
        )
        .route(
            "/inventario",
            get(handlers::inventory::list_inventory)
                .post(handlers::inventory::create_inventory_item),
        )
        .route(
            "/inventario/:id",
            get(handlers::inventory::get_inventory_item)
                .put(handlers::inventory::update_inventory_item)
                .delete(handlers::inventory::delete_inventory_item),
        )
        .route(
            "/sucursales",
            get(handlers::branches::list_branches).post(handlers::branches::create_branch),
        )
        .route(
            "/sucursales/:id",
            get(handlers::branches::get_branch)
                .put(handlers::branches::update_branch)
                .delete(handlers::branches::delete_branch),
        )
        .route(
            "/cotizaciones",
            get(handlers::quotations::list_quotations)
                .post(handlers::quotations::create_quotation),
        )
        .route(
            "/cotizaciones/:id",
            get(handlers::quotations::get_quotation)
                .put(handlers::quotations::update_quotation)
                .patch(handlers::quotations::update_quotation)
                .delete(handlers::quotations::delete_quotation),
        )
        .route(
            "/cotizaciones/:id/cancel",
            put(handlers::quotations::cancel_quotation),
        )
        .route(
            "/cotizaciones/:id/convertir",
            post(handlers::quotations::convert_quotation),
        )
        .route(
            "/cotizaciones/:id/pdf",
            get(handlers::quotations::quotation_pdf),
        )
        .route(
            "/cotizaciones/:id/nota-remision",
            get(handlers::quotations::delivery_note_pdf),
        )
        .route(
            "/ordenes-venta",
            get(handlers::sales_orders::list_sales_orders),
        )
        .route(
            "/ordenes-venta/:id",
            get(handlers::sales_orders::get_sales_order),
        )
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
