//! Request processing pipeline implementation

use crate::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    PreOperation,
    PostOperation,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::PreOperation => write!(f, "pre-operation"),
            PipelineStage::PostOperation => write!(f, "post-operation"),
        }
    }
}

/// The pipeline runner that executes plugins around each analysis operation
pub struct PipelineRunner {
    plugins: HashMap<PipelineStage, Vec<Arc<dyn PipelinePlugin>>>,
}

impl PipelineRunner {
    /// Create a new pipeline runner
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Runner with the built-in logging, routing and audit plugins
    pub fn with_default_plugins() -> Self {
        let mut runner = Self::new();
        runner.register_plugin(PipelineStage::PreOperation, Arc::new(RequestLoggingPlugin::new()));
        runner.register_plugin(PipelineStage::PreOperation, Arc::new(ModeResolutionPlugin::new()));
        runner.register_plugin(PipelineStage::PostOperation, Arc::new(AuditTrailPlugin::new()));
        runner
    }

    /// Register a plugin for a specific stage
    pub fn register_plugin(&mut self, stage: PipelineStage, plugin: Arc<dyn PipelinePlugin>) {
        self.plugins.entry(stage).or_default().push(plugin);
    }

    /// Run the pre-operation stage. A plugin halting with an error rejects
    /// the request with [`PipelineError::PipelineHalted`].
    pub async fn before_operation(&self, ctx: RequestContext) -> Result<RequestContext, CoreError> {
        debug!("Starting pipeline execution for request {}", ctx.request_id);
        let ctx = self.execute_stage(PipelineStage::PreOperation, ctx).await;

        if let Some(message) = ctx.error.clone() {
            return Err(PipelineError::PipelineHalted(message).into());
        }
        Ok(ctx)
    }

    /// Run the post-operation stage
    pub async fn after_operation(&self, ctx: RequestContext) -> RequestContext {
        let ctx = self.execute_stage(PipelineStage::PostOperation, ctx).await;

        info!(
            "Pipeline execution completed for request {} in {:?}",
            ctx.request_id,
            ctx.elapsed()
        );

        ctx
    }

    /// Execute plugins for a specific stage
    async fn execute_stage(&self, stage: PipelineStage, mut ctx: RequestContext) -> RequestContext {
        if let Some(plugins) = self.plugins.get(&stage) {
            debug!("Executing {} plugins for stage {}", plugins.len(), stage);

            for (index, plugin) in plugins.iter().enumerate() {
                debug!("Executing plugin {} ({}) for stage {}", plugin.name(), index + 1, stage);

                match plugin.call(&mut ctx).await {
                    PluginOutcome::Continue => {
                        continue;
                    }
                    PluginOutcome::HaltWithError(e) => {
                        warn!("Plugin {} halted with error: {}", plugin.name(), e);
                        ctx.error = Some(e.to_string());
                        break;
                    }
                }
            }
        }

        ctx
    }

    /// Get the number of plugins registered for a stage
    pub fn plugin_count(&self, stage: &PipelineStage) -> usize {
        self.plugins.get(stage).map_or(0, |plugins| plugins.len())
    }
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-in audit trail plugin
pub struct AuditTrailPlugin {
    name: &'static str,
}

impl AuditTrailPlugin {
    pub fn new() -> Self {
        Self {
            name: "AuditTrail",
        }
    }
}

impl Default for AuditTrailPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelinePlugin for AuditTrailPlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn call(&self, ctx: &mut RequestContext) -> PluginOutcome {
        info!(
            "Audit: {} {} mode={:?} input={} (request_id: {})",
            ctx.method,
            ctx.path,
            ctx.mode,
            ctx.operation_input.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            ctx.request_id
        );

        ctx.set_attribute("audit_timestamp", serde_json::json!(chrono::Utc::now().to_rfc3339()));
        if let Some(agent) = ctx.header("user-agent").map(str::to_string) {
            ctx.set_attribute("audit_user_agent", serde_json::json!(agent));
        }
        ctx.set_attribute("audit_logged", serde_json::json!(true));

        PluginOutcome::Continue
    }
}

/// Built-in request logging plugin
pub struct RequestLoggingPlugin {
    name: &'static str,
}

impl RequestLoggingPlugin {
    pub fn new() -> Self {
        Self {
            name: "RequestLogging",
        }
    }
}

impl Default for RequestLoggingPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelinePlugin for RequestLoggingPlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn call(&self, ctx: &mut RequestContext) -> PluginOutcome {
        debug!(
            "Request: {} {} (ID: {}, Agent: {}, Elapsed: {:?})",
            ctx.method,
            ctx.path,
            ctx.request_id,
            ctx.header("user-agent").unwrap_or("-"),
            ctx.elapsed()
        );

        PluginOutcome::Continue
    }
}

/// Routes a request to its analysis mode based on the path
pub struct ModeResolutionPlugin {
    name: &'static str,
}

impl ModeResolutionPlugin {
    pub fn new() -> Self {
        Self {
            name: "ModeResolution",
        }
    }
}

impl Default for ModeResolutionPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelinePlugin for ModeResolutionPlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn call(&self, ctx: &mut RequestContext) -> PluginOutcome {
        match (ctx.mode, AnalysisMode::from_path(&ctx.path)) {
            (Some(declared), Some(resolved)) if declared != resolved => {
                warn!(
                    "Request to {} declared mode {} but routes to {}",
                    ctx.path, declared, resolved
                );
                let message = format!("Mode {} does not serve {}", declared, ctx.path);
                PluginOutcome::HaltWithError(message.into())
            }
            (_, Some(resolved)) => {
                ctx.mode = Some(resolved);
                PluginOutcome::Continue
            }
            // Mounted under a prefix; the handler's mode stands
            (Some(_), None) => PluginOutcome::Continue,
            (None, None) => {
                warn!("No analysis mode serves {}", ctx.path);
                let message = format!("No analysis mode serves {}", ctx.path);
                PluginOutcome::HaltWithError(message.into())
            }
        }
    }
}
