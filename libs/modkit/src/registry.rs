use axum::Router;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use thiserror::Error;

use crate::context;
use crate::contracts;

/// One module and the capabilities it exposes.
///
/// ```ignore
/// let m = Arc::new(People::default());
/// ModuleEntry::new("people", m.clone()).with_rest(m);
/// ```
pub struct ModuleEntry {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub core: Arc<dyn contracts::Module>,
    pub rest: Option<Arc<dyn contracts::RestfulModule>>,
    pub rest_host: Option<Arc<dyn contracts::RestHostModule>>,
    pub stateful: Option<Arc<dyn contracts::StatefulModule>>,
}

impl ModuleEntry {
    pub fn new(name: &'static str, core: Arc<dyn contracts::Module>) -> Self {
        Self {
            name,
            deps: &[],
            core,
            rest: None,
            rest_host: None,
            stateful: None,
        }
    }

    /// Modules that must run their phases before this one.
    pub fn depends_on(mut self, deps: &'static [&'static str]) -> Self {
        self.deps = deps;
        self
    }

    pub fn with_rest(mut self, m: Arc<dyn contracts::RestfulModule>) -> Self {
        self.rest = Some(m);
        self
    }

    pub fn with_rest_host(mut self, m: Arc<dyn contracts::RestHostModule>) -> Self {
        self.rest_host = Some(m);
        self
    }

    pub fn with_stateful(mut self, m: Arc<dyn contracts::StatefulModule>) -> Self {
        self.stateful = Some(m);
        self
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("has_rest", &self.rest.is_some())
            .field("is_rest_host", &self.rest_host.is_some())
            .field("has_stateful", &self.stateful.is_some())
            .finish()
    }
}

/// Explicitly registered modules in dependency order.
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.modules.iter().map(|m| m.name).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}

impl ModuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    pub fn get_module(&self, name: &str) -> Option<Arc<dyn contracts::Module>> {
        self.modules
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.core.clone())
    }

    // ---- Ordered phases: init → REST (sync) → start → stop ----

    pub async fn run_init_phase(&self, base_ctx: &context::ModuleCtx) -> Result<(), RegistryError> {
        for e in &self.modules {
            let ctx = base_ctx.clone().for_module(e.name);
            tracing::debug!(module = e.name, "init");
            e.core
                .init(&ctx)
                .await
                .map_err(|source| RegistryError::Init {
                    module: e.name,
                    source,
                })?;
        }
        Ok(())
    }

    pub fn run_rest_phase(
        &self,
        base_ctx: &context::ModuleCtx,
        mut router: Router,
    ) -> Result<Router, RegistryError> {
        let Some(host_entry) = self.modules.iter().find(|e| e.rest_host.is_some()) else {
            return if self.modules.iter().any(|e| e.rest.is_some()) {
                Err(RegistryError::RestRequiresHost)
            } else {
                Ok(router)
            };
        };
        let Some(host) = host_entry.rest_host.as_ref() else {
            return Err(RegistryError::RestRequiresHost);
        };
        let host_ctx = base_ctx.clone().for_module(host_entry.name);
        let registry: &dyn contracts::OpenApiRegistry = host.as_registry();

        // 1) Host prepare: base Router and global middleware
        router = host
            .rest_prepare(&host_ctx, router)
            .map_err(|source| RegistryError::RestPrepare {
                module: host_entry.name,
                source,
            })?;

        // 2) Every REST provider, in dependency order
        for e in &self.modules {
            if let Some(rest) = &e.rest {
                let ctx = base_ctx.clone().for_module(e.name);
                router = rest
                    .register_rest(&ctx, router, registry)
                    .map_err(|source| RegistryError::RestRegister {
                        module: e.name,
                        source,
                    })?;
            }
        }

        // 3) Host finalize: /openapi.json, /docs; the server is not started here
        router = host
            .rest_finalize(&host_ctx, router)
            .map_err(|source| RegistryError::RestFinalize {
                module: host_entry.name,
                source,
            })?;

        Ok(router)
    }

    pub async fn run_start_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(s) = &e.stateful {
                s.start(cancel.clone())
                    .await
                    .map_err(|source| RegistryError::Start {
                        module: e.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Stops in reverse order. Failures are logged, never fatal.
    pub async fn run_stop_phase(&self, cancel: CancellationToken) {
        for e in self.modules.iter().rev() {
            if let Some(s) = &e.stateful {
                if let Err(err) = s.stop(cancel.clone()).await {
                    tracing::warn!(module = e.name, error = %err, "Failed to stop module");
                }
            }
        }
    }
}

/// Collects entries, then validates and orders them in [`RegistryBuilder::build`].
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<ModuleEntry>,
    errors: Vec<String>,
}

impl RegistryBuilder {
    pub fn register(mut self, entry: ModuleEntry) -> Self {
        if self.entries.iter().any(|e| e.name == entry.name) {
            self.errors
                .push(format!("Module '{}' is already registered", entry.name));
            return self;
        }
        if entry.rest_host.is_some() {
            if let Some(existing) = self.entries.iter().find(|e| e.rest_host.is_some()) {
                self.errors.push(format!(
                    "Multiple REST host modules detected: '{}' and '{}'. Only one REST host is allowed.",
                    existing.name, entry.name
                ));
                return self;
            }
        }
        self.entries.push(entry);
        self
    }

    /// Kahn's algorithm; ties keep registration order.
    pub fn build(self) -> Result<ModuleRegistry, RegistryError> {
        if !self.errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration {
                errors: self.errors,
            });
        }

        let idx: HashMap<&'static str, usize> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name, i))
            .collect();

        let mut dependents = vec![Vec::<usize>::new(); self.entries.len()];
        let mut indeg = vec![0usize; self.entries.len()];
        for (i, e) in self.entries.iter().enumerate() {
            for &d in e.deps {
                let v = *idx.get(d).ok_or_else(|| RegistryError::UnknownDependency {
                    module: e.name.to_string(),
                    depends_on: d.to_string(),
                })?;
                dependents[v].push(i);
                indeg[i] += 1;
            }
        }

        let mut q: VecDeque<usize> = (0..self.entries.len()).filter(|&i| indeg[i] == 0).collect();
        let mut order = Vec::with_capacity(self.entries.len());
        while let Some(u) = q.pop_front() {
            order.push(u);
            for &w in &dependents[u] {
                indeg[w] -= 1;
                if indeg[w] == 0 {
                    q.push_back(w);
                }
            }
        }

        if order.len() != self.entries.len() {
            let placed: HashSet<usize> = order.iter().copied().collect();
            let path = self
                .entries
                .iter()
                .enumerate()
                .filter(|(i, _)| !placed.contains(i))
                .map(|(_, e)| e.name)
                .collect();
            return Err(RegistryError::CycleDetected { path });
        }

        let mut slots: Vec<Option<ModuleEntry>> = self.entries.into_iter().map(Some).collect();
        let modules: Vec<ModuleEntry> = order.into_iter().filter_map(|i| slots[i].take()).collect();

        tracing::info!(
            modules = ?modules.iter().map(|e| e.name).collect::<Vec<_>>(),
            "Module order resolved"
        );

        Ok(ModuleRegistry { modules })
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("initialization failed for module '{module}'")]
    Init {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("start failed for '{module}'")]
    Start {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST prepare failed for host module '{module}'")]
    RestPrepare {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST registration failed for module '{module}'")]
    RestRegister {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST finalize failed for host module '{module}'")]
    RestFinalize {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST phase requires an ingress host: modules with capability 'rest' found, but no module with capability 'rest_host'")]
    RestRequiresHost,
    #[error("module '{module}' depends on unknown '{depends_on}'")]
    UnknownDependency { module: String, depends_on: String },
    #[error("cyclic dependency between: {}", path.join(", "))]
    CycleDetected { path: Vec<&'static str> },
    #[error("invalid registry configuration:\n{errors:#?}")]
    InvalidRegistryConfiguration { errors: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{OpenApiRegistry, OperationSpec};
    use crate::context::{ModuleCtx, ModuleCtxBuilder};
    use parking_lot::Mutex;

    struct Core {
        log: Arc<Mutex<Vec<String>>>,
        name: &'static str,
    }

    #[async_trait::async_trait]
    impl contracts::Module for Core {
        async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
            assert_eq!(ctx.current_module(), Some(self.name));
            self.log.lock().push(format!("init:{}", self.name));
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[async_trait::async_trait]
    impl contracts::StatefulModule for Core {
        async fn start(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
            self.log.lock().push(format!("start:{}", self.name));
            Ok(())
        }
        async fn stop(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
            self.log.lock().push(format!("stop:{}", self.name));
            anyhow::bail!("stop errors are only logged")
        }
    }

    #[derive(Default)]
    struct NullRegistry;
    impl OpenApiRegistry for NullRegistry {
        fn register_operation(&self, _spec: &OperationSpec) {}
        fn ensure_schema_raw(
            &self,
            name: &str,
            _schemas: Vec<(
                String,
                utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
            )>,
        ) -> String {
            name.to_string()
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[derive(Default)]
    struct Host {
        reg: NullRegistry,
    }
    impl contracts::RestHostModule for Host {
        fn rest_prepare(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            Ok(router.route("/healthz", axum::routing::get(|| async { "ok" })))
        }
        fn rest_finalize(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            Ok(router)
        }
        fn as_registry(&self) -> &dyn OpenApiRegistry {
            &self.reg
        }
    }

    struct Rest;
    impl contracts::RestfulModule for Rest {
        fn register_rest(
            &self,
            _ctx: &ModuleCtx,
            router: Router,
            _registry: &dyn OpenApiRegistry,
        ) -> anyhow::Result<Router> {
            Ok(router.route("/", axum::routing::get(|| async { "hi" })))
        }
    }

    fn core(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Core> {
        Arc::new(Core {
            log: log.clone(),
            name,
        })
    }

    fn base_ctx() -> ModuleCtx {
        ModuleCtxBuilder::new(CancellationToken::new()).build()
    }

    #[test]
    fn dependencies_come_first_and_ties_keep_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = ModuleRegistry::builder()
            .register(ModuleEntry::new("people", core("people", &log)).depends_on(&["api_ingress"]))
            .register(ModuleEntry::new("api_ingress", core("api_ingress", &log)))
            .register(ModuleEntry::new("audit", core("audit", &log)))
            .build()
            .unwrap();
        let order: Vec<_> = reg.modules().iter().map(|m| m.name).collect();
        assert_eq!(order, vec!["api_ingress", "audit", "people"]);
        assert!(reg.get_module("audit").is_some());
        assert!(reg.get_module("nope").is_none());
    }

    #[test]
    fn unknown_dependency_and_cycles_are_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let err = ModuleRegistry::builder()
            .register(ModuleEntry::new("a", core("a", &log)).depends_on(&["missing"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDependency { ref depends_on, .. } if depends_on == "missing"));

        let err = ModuleRegistry::builder()
            .register(ModuleEntry::new("a", core("a", &log)).depends_on(&["b"]))
            .register(ModuleEntry::new("b", core("b", &log)).depends_on(&["a"]))
            .build()
            .unwrap_err();
        match err {
            RegistryError::CycleDetected { path } => assert_eq!(path, vec!["a", "b"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicates_and_second_host_are_configuration_errors() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let err = ModuleRegistry::builder()
            .register(ModuleEntry::new("a", core("a", &log)).with_rest_host(Arc::new(Host::default())))
            .register(ModuleEntry::new("a", core("a", &log)))
            .register(ModuleEntry::new("b", core("b", &log)).with_rest_host(Arc::new(Host::default())))
            .build()
            .unwrap_err();
        match err {
            RegistryError::InvalidRegistryConfiguration { errors } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rest_without_host_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = ModuleRegistry::builder()
            .register(ModuleEntry::new("people", core("people", &log)).with_rest(Arc::new(Rest)))
            .build()
            .unwrap();
        let err = reg.run_rest_phase(&base_ctx(), Router::new()).unwrap_err();
        assert!(matches!(err, RegistryError::RestRequiresHost));
    }

    #[test]
    fn rest_phase_runs_prepare_register_finalize() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = ModuleRegistry::builder()
            .register(
                ModuleEntry::new("api_ingress", core("api_ingress", &log))
                    .with_rest_host(Arc::new(Host::default())),
            )
            .register(ModuleEntry::new("people", core("people", &log)).with_rest(Arc::new(Rest)))
            .build()
            .unwrap();
        assert!(reg.run_rest_phase(&base_ctx(), Router::new()).is_ok());
    }

    #[tokio::test]
    async fn lifecycle_phases_run_in_order_and_stop_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = core("a", &log);
        let b = core("b", &log);
        let reg = ModuleRegistry::builder()
            .register(ModuleEntry::new("a", a.clone()).with_stateful(a))
            .register(ModuleEntry::new("b", b.clone()).with_stateful(b).depends_on(&["a"]))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        reg.run_init_phase(&base_ctx()).await.unwrap();
        reg.run_start_phase(cancel.clone()).await.unwrap();
        reg.run_stop_phase(cancel).await;

        assert_eq!(
            *log.lock(),
            vec!["init:a", "init:b", "start:a", "start:b", "stop:b", "stop:a"]
        );
    }
}
