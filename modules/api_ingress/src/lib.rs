use async_trait::async_trait;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use anyhow::Result;
use axum::http::{header, Method};
use axum::response::IntoResponse;
use axum::{middleware::from_fn, routing::get, Router};
use modkit::api::{OpenApiRegistry, OperationSpec};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use utoipa::openapi::{schema::Schema, RefOr};

mod config;
mod model;
pub mod openapi;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;
pub use model::Registration;

use model::ComponentsRegistry;

/// How long `stop` waits for in-flight requests to drain.
const STOP_TIMEOUT: Duration = Duration::from_secs(30);

struct RunningServer {
    cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

/// Main API Ingress module: owns the HTTP server (rest host) and collects
/// typed operation specs to emit a single OpenAPI document.
pub struct ApiIngress {
    config: ArcSwap<ApiIngressConfig>,
    components_registry: ArcSwap<ComponentsRegistry>,
    // Finalized router from the REST phase, taken by `start`
    final_router: Mutex<Option<Router>>,
    server: Mutex<Option<RunningServer>>,
    local_addr: Mutex<Option<SocketAddr>>,

    // Duplicate detection (per (method, path) and per handler id)
    registered_routes: DashMap<(Method, String), ()>,
    registered_handlers: DashMap<String, ()>,

    operation_specs: DashMap<String, OperationSpec>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            components_registry: ArcSwap::from_pointee(ComponentsRegistry::default()),
            final_router: Mutex::new(None),
            server: Mutex::new(None),
            local_addr: Mutex::new(None),
            registered_routes: DashMap::new(),
            registered_handlers: DashMap::new(),
            operation_specs: DashMap::new(),
        }
    }

    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    /// Address the server is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    pub fn operation_count(&self) -> usize {
        self.operation_specs.len()
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.components_registry.load().has_schema(name)
    }

    /// Wrap every route registered so far in the ingress middleware stack.
    ///
    /// Layers are applied innermost first, so the effective order (outermost to innermost) is:
    /// SetRequestId -> PropagateRequestId -> Trace -> push_req_id_to_extensions -> Timeout -> CORS -> BodyLimit
    pub fn apply_middleware(&self, router: Router) -> Router {
        let config = self.get_config();
        let x_request_id = request_id::header();

        let mut router = router.layer(RequestBodyLimitLayer::new(config.body_limit_bytes));

        if config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.request_timeout_secs,
            )))
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    /// Build the OpenAPI document from registered operations and components.
    pub fn build_openapi(&self) -> Result<openapi::OpenApi> {
        let components = self.components_registry.load();
        let specs: Vec<OperationSpec> = self
            .operation_specs
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tracing::info!(
            operations = specs.len(),
            schemas = components.len(),
            "Building OpenAPI document"
        );
        Ok(openapi::OpenApi::assemble(&specs, &components)?)
    }

    /// Router used when the REST phase never ran: health routes only.
    fn fallback_router(&self) -> Router {
        self.apply_middleware(
            Router::new()
                .route("/health", get(web::health_check))
                .route("/healthz", get(web::healthz)),
        )
    }

    async fn serve(
        listener: tokio::net::TcpListener,
        router: Router,
        cancel: CancellationToken,
    ) -> Result<()> {
        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &modkit::ModuleCtx) -> Result<()> {
        let cfg = ctx.module_config::<ApiIngressConfig>();
        tracing::debug!(
            module = "api_ingress",
            bind_addr = %cfg.bind_addr,
            enable_docs = cfg.enable_docs,
            "Module initialized with context"
        );
        self.config.store(Arc::new(cfg));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// REST host role: prepare/finalize the router, but do not start the server here.
impl modkit::contracts::RestHostModule for ApiIngress {
    fn rest_prepare(&self, _ctx: &modkit::ModuleCtx, router: Router) -> Result<Router> {
        let router = router
            .route("/health", get(web::health_check))
            .route("/healthz", get(web::healthz));
        tracing::debug!("REST host prepared base router with health checks");
        Ok(router)
    }

    fn rest_finalize(&self, _ctx: &modkit::ModuleCtx, mut router: Router) -> Result<Router> {
        let config = self.get_config();

        if config.enable_docs {
            // Built once, served as static JSON
            let openapi_value = Arc::new(serde_json::to_value(self.build_openapi()?)?);

            router = router
                .route(
                    "/openapi.json",
                    get(move || {
                        let v = openapi_value.clone();
                        async move {
                            (
                                [(header::CACHE_CONTROL, "no-store")],
                                axum::Json((*v).clone()),
                            )
                                .into_response()
                        }
                    }),
                )
                .route("/docs", get(web::serve_docs));
        }

        let router = self.apply_middleware(router);
        *self.final_router.lock() = Some(router.clone());

        tracing::debug!(docs = config.enable_docs, "REST host finalized router");
        Ok(router)
    }

    fn as_registry(&self) -> &dyn OpenApiRegistry {
        self
    }
}

#[async_trait]
impl modkit::contracts::StatefulModule for ApiIngress {
    /// Bind the listener and spawn the server. Returns once the socket is bound.
    async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let cfg = self.get_config();
        let addr: SocketAddr = cfg
            .bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", cfg.bind_addr, e))?;

        let stored = { self.final_router.lock().take() };
        let router = match stored {
            Some(r) => r,
            None => {
                tracing::debug!("No router from REST phase, serving health routes only");
                self.fallback_router()
            }
        };

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let bound = listener.local_addr()?;
        *self.local_addr.lock() = Some(bound);
        tracing::info!("HTTP server bound on {}", bound);

        let server_cancel = cancel.child_token();
        let task = tokio::spawn(Self::serve(listener, router, server_cancel.clone()));
        *self.server.lock() = Some(RunningServer {
            cancel: server_cancel,
            task,
        });
        Ok(())
    }

    async fn stop(&self, _cancel: CancellationToken) -> Result<()> {
        let running = self.server.lock().take();
        let Some(server) = running else {
            return Ok(());
        };
        server.cancel.cancel();

        match tokio::time::timeout(STOP_TIMEOUT, server.task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(anyhow::anyhow!("HTTP server task failed: {join_err}")),
            Err(_) => {
                tracing::warn!(timeout = ?STOP_TIMEOUT, "HTTP server did not drain in time");
                Ok(())
            }
        }
    }
}

impl OpenApiRegistry for ApiIngress {
    fn register_operation(&self, spec: &OperationSpec) {
        // "First wins": a second registration is a programming error
        if self
            .registered_handlers
            .insert(spec.handler_id.clone(), ())
            .is_some()
        {
            tracing::error!(
                handler_id = %spec.handler_id,
                method = %spec.method.as_str(),
                path = %spec.path,
                "Duplicate handler_id detected; ignoring subsequent registration"
            );
            return;
        }

        let route_key = (spec.method.clone(), spec.path.clone());
        if self.registered_routes.insert(route_key, ()).is_some() {
            tracing::error!(
                method = %spec.method.as_str(),
                path = %spec.path,
                "Duplicate (method, path) detected; ignoring subsequent registration"
            );
            return;
        }

        let operation_key = format!("{}:{}", spec.method.as_str(), spec.path);
        self.operation_specs.insert(operation_key.clone(), spec.clone());

        tracing::debug!(
            handler_id = %spec.handler_id,
            operation_key = %operation_key,
            total_operations = self.operation_specs.len(),
            "Registered API operation"
        );
    }

    fn ensure_schema_raw(&self, root_name: &str, schemas: Vec<(String, RefOr<Schema>)>) -> String {
        // Copy-on-write snapshot
        let current = self.components_registry.load();
        let mut reg = (**current).clone();

        for (name, schema) in schemas {
            match reg.register_schema(name.clone(), schema) {
                Registration::Inserted => {
                    tracing::debug!(%name, root = %root_name, "Registered schema");
                }
                Registration::Identical => {}
                Registration::Conflict => {
                    tracing::error!(
                        %name,
                        root = %root_name,
                        "Conflicting schema content under the same component key; keeping the first"
                    );
                }
            }
        }

        self.components_registry.store(Arc::new(reg));
        root_name.to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit::contracts::RestHostModule;
    use modkit::{ModuleEntry, ModuleRegistry, OperationBuilder};

    async fn ok() -> &'static str {
        "ok"
    }

    fn ctx() -> modkit::ModuleCtx {
        modkit::ModuleCtxBuilder::new(CancellationToken::new())
            .for_module("api_ingress")
            .build()
    }

    #[test]
    fn ingress_registers_as_host_and_stateful() {
        let ingress = Arc::new(ApiIngress::default());
        let registry = ModuleRegistry::builder()
            .register(
                ModuleEntry::new("api_ingress", ingress.clone())
                    .with_rest_host(ingress.clone())
                    .with_stateful(ingress),
            )
            .build()
            .unwrap();
        let entry = registry
            .modules()
            .iter()
            .find(|m| m.name == "api_ingress")
            .unwrap();
        assert!(entry.core.as_any().downcast_ref::<ApiIngress>().is_some());
        assert!(entry.rest_host.is_some());
        assert!(entry.stateful.is_some());
    }

    #[test]
    fn duplicate_operations_keep_the_first() {
        let ingress = ApiIngress::default();
        let _first = OperationBuilder::get("/a")
            .operation_id("first")
            .json_response(200, "OK")
            .handler(ok)
            .register(Router::<()>::new(), &ingress);
        let _second = OperationBuilder::get("/a")
            .operation_id("second")
            .json_response(200, "OK")
            .handler(ok)
            .register(Router::<()>::new(), &ingress);

        assert_eq!(ingress.operation_count(), 1);
        let spec = ingress.operation_specs.get("GET:/a").unwrap();
        assert_eq!(spec.operation_id.as_deref(), Some("first"));
    }

    #[test]
    fn docs_routes_follow_config() {
        let ingress = ApiIngress::new(ApiIngressConfig {
            enable_docs: false,
            ..Default::default()
        });
        ingress.rest_finalize(&ctx(), Router::new()).unwrap();
        assert!(ingress.final_router.lock().is_some());
    }
}
