//! Query pipeline: classify, route, synthesize
//!
//! The orchestrator owns no request state. It holds a shared handle to the
//! registry and applies a failure policy when a handler errors.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::bundle::ResponseBundle;
use crate::error::ConciergeError;
use crate::intent::classify;
use crate::registry::AgentRegistry;
use crate::router::{Router, RouterConfig};
use crate::synthesizer::{DEFAULT_FALLBACK_MESSAGE, ResponseSynthesizer};
use crate::types::ClassificationResult;

/// What to do when a dispatched handler fails
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return the failure to the caller
    #[default]
    Abort,
    /// Answer with whatever the other handlers produced
    Degrade,
}

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub router: RouterConfig,
    pub fallback_message: String,
    pub on_handler_failure: FailurePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            router: RouterConfig::default(),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            on_handler_failure: FailurePolicy::Abort,
        }
    }
}

/// Everything produced while answering one query
#[derive(Debug, Clone)]
pub struct Turn {
    pub classification: ClassificationResult,
    pub bundle: ResponseBundle,
    pub response: String,
    /// Set when a handler failed and the turn was degraded
    pub failed_handler: Option<String>,
}

pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    router: Router,
    synthesizer: ResponseSynthesizer,
    failure_policy: FailurePolicy,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>, config: OrchestratorConfig) -> Self {
        info!(
            "Orchestrator ready with {} handler(s), failure policy {:?}",
            registry.len(),
            config.on_handler_failure
        );
        Self {
            registry,
            router: Router::new(config.router),
            synthesizer: ResponseSynthesizer::new(config.fallback_message),
            failure_policy: config.on_handler_failure,
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Answer a query, returning the final text only
    pub async fn process(&self, query: &str) -> Result<String, ConciergeError> {
        self.handle(query).await.map(|turn| turn.response)
    }

    /// Answer a query, keeping the intermediate classification and bundle
    pub async fn handle(&self, query: &str) -> Result<Turn, ConciergeError> {
        let classification = classify(query);

        let (bundle, failed_handler) =
            match self.router.route(&classification, &self.registry).await {
                Ok(bundle) => (bundle, None),
                Err(err) => match self.failure_policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::Degrade => {
                        warn!("Degrading response: {}", err);
                        let handler = err.handler().to_string();
                        (err.into_partial(), Some(handler))
                    }
                },
            };

        let response = self.synthesizer.synthesize(&bundle, query);
        Ok(Turn {
            classification,
            bundle,
            response,
            failed_handler,
        })
    }
}
