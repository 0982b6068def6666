use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use axum::Router;
use modkit::api::OpenApiRegistry;
use modkit::{Module, ModuleCtx, RestfulModule};

use crate::api::rest::routes;
use crate::config::PeopleConfig;
use crate::domain::service::Service;

/// People module: builds the [`Service`] from `modules.people` config and
/// registers its REST operations with the ingress.
#[derive(Default)]
pub struct People {
    service: ArcSwapOption<Service>,
}

impl People {
    pub fn service(&self) -> Option<Arc<Service>> {
        self.service.load_full()
    }
}

#[async_trait]
impl Module for People {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let cfg = ctx.module_config::<PeopleConfig>();
        tracing::debug!(
            module = "people",
            greeting_key = %cfg.greeting_key,
            "Module initialized with context"
        );
        self.service.store(Some(Arc::new(Service::new(cfg))));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl RestfulModule for People {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<Router> {
        let service = self
            .service()
            .ok_or_else(|| anyhow::anyhow!("people service is not initialized"))?;
        routes::register_routes(router, openapi, service)
    }
}
