use anyhow::Context;
use std::sync::Arc;

use crate::module::{InitCtx, Module};

/// Module registry that drives module lifecycle in registration order
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        tracing::debug!(module = module.name(), "registering module");
        self.modules.push(module);
    }

    /// Get all registered modules in registration order
    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.modules.iter()
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    /// Get the number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Initialize modules in registration order
    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Start modules in registration order
    pub async fn start_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop modules in reverse registration order
    pub async fn stop_modules(&self) -> anyhow::Result<()> {
        tracing::info!("stopping {} modules in reverse order", self.modules.len());

        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::sync::Mutex;

    struct TestModule {
        name: &'static str,
        journal: Arc<Mutex<Vec<String>>>,
        fail_init: bool,
    }

    impl TestModule {
        fn record(&self, event: &str) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:{}", event, self.name));
        }
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.record("init");
            if self.fail_init {
                anyhow::bail!("boom");
            }
            Ok(())
        }

        async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.record("start");
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.record("stop");
            Ok(())
        }
    }

    fn module(
        name: &'static str,
        journal: &Arc<Mutex<Vec<String>>>,
        fail_init: bool,
    ) -> Arc<dyn Module> {
        Arc::new(TestModule {
            name,
            journal: journal.clone(),
            fail_init,
        })
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get_module("books").is_none());
    }

    #[test]
    fn default_mount_path_is_namespaced() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let module = module("reports", &journal, false);
        assert_eq!(module.mount_path(), "/api/reports");
    }

    #[tokio::test]
    async fn test_module_lifecycle_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(module("first", &journal, false));
        registry.register(module("second", &journal, false));

        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };

        registry.init_modules(&ctx).await.unwrap();
        registry.start_modules(&ctx).await.unwrap();
        registry.stop_modules().await.unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get_module("second").is_some());
        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "init:first",
                "init:second",
                "start:first",
                "start:second",
                "stop:second",
                "stop:first",
            ]
        );
    }

    #[tokio::test]
    async fn init_failure_names_the_module() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(module("broken", &journal, true));
        registry.register(module("never", &journal, false));

        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };

        let err = registry.init_modules(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to initialize module 'broken'");
        assert_eq!(*journal.lock().unwrap(), vec!["init:broken"]);
    }
}
