//! Dispatch of classified queries to registered handlers
//!
//! Single-intent results go to their one routing target. Multi-intent
//! results are re-scanned against each fan-out vocabulary and every matching
//! domain's handler is invoked. The bundle always follows the fixed fan-out
//! order (document, course, library, event), whether handlers run one after
//! another or concurrently.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::bundle::{BundleEntry, ResponseBundle};
use crate::error::ConciergeError;
use crate::intent::domain_score;
use crate::registry::{AgentHandler, AgentRegistry};
use crate::types::{ClassificationResult, Domain, RoutingTarget};

/// How multiple handlers for one query are invoked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One at a time, stopping at the first failure
    #[default]
    Sequential,
    /// Concurrently on tokio tasks, joined in fan-out order
    Parallel,
}

/// Configuration for the router
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub dispatch: DispatchMode,
    /// Per-handler time limit; `None` waits indefinitely
    pub handler_timeout: Option<Duration>,
    /// Upper bound on concurrently running handlers in parallel mode
    pub max_concurrent_handlers: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Sequential,
            handler_timeout: None,
            max_concurrent_handlers: 4,
        }
    }
}

pub struct Router {
    config: RouterConfig,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Resolve the handlers a classification should be dispatched to, in
    /// dispatch order. Names without a registered handler are skipped.
    pub fn targets(
        result: &ClassificationResult,
        registry: &AgentRegistry,
    ) -> Vec<(String, Arc<dyn AgentHandler>)> {
        let names: Vec<&str> = match &result.routing_target {
            RoutingTarget::Handler(name) => vec![name.as_str()],
            RoutingTarget::Deferred => {
                let lower = result.query.to_lowercase();
                Domain::FAN_OUT
                    .iter()
                    .filter(|domain| domain_score(**domain, &lower) > 0)
                    .map(|domain| domain.handler_name())
                    .collect()
            }
        };

        names
            .into_iter()
            .filter_map(|name| match registry.resolve(name) {
                Some(handler) => Some((name.to_string(), handler)),
                None => {
                    warn!("No handler registered for '{}', skipping", name);
                    None
                }
            })
            .collect()
    }

    /// Dispatch a classified query and collect handler outputs.
    ///
    /// A handler error ends routing with [`ConciergeError::HandlerFailure`];
    /// the error carries whatever entries were gathered.
    pub async fn route(
        &self,
        result: &ClassificationResult,
        registry: &AgentRegistry,
    ) -> Result<ResponseBundle, ConciergeError> {
        let targets = Self::targets(result, registry);
        debug!(
            "Routing {} query to {} handler(s) ({:?})",
            result.intent,
            targets.len(),
            self.config.dispatch
        );

        match self.config.dispatch {
            DispatchMode::Sequential => self.route_sequential(targets, &result.query).await,
            DispatchMode::Parallel => self.route_parallel(targets, &result.query).await,
        }
    }

    async fn route_sequential(
        &self,
        targets: Vec<(String, Arc<dyn AgentHandler>)>,
        query: &str,
    ) -> Result<ResponseBundle, ConciergeError> {
        let mut bundle = ResponseBundle::new();
        for (name, handler) in targets {
            match invoke(&name, handler, query, self.config.handler_timeout).await {
                Ok(entry) => bundle.insert(name, entry),
                Err(source) => {
                    warn!("Handler {} failed: {}", name, source);
                    return Err(ConciergeError::HandlerFailure {
                        handler: name,
                        source,
                        partial: bundle,
                    });
                }
            }
        }
        Ok(bundle)
    }

    async fn route_parallel(
        &self,
        targets: Vec<(String, Arc<dyn AgentHandler>)>,
        query: &str,
    ) -> Result<ResponseBundle, ConciergeError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_handlers.max(1)));
        let mut handles = Vec::new();
        for (name, handler) in targets {
            let sem = semaphore.clone();
            let query = query.to_string();
            let timeout = self.config.handler_timeout;
            let task_name = name.clone();
            handles.push((
                name,
                tokio::spawn(async move {
                    match sem.acquire_owned().await {
                        Ok(_permit) => invoke(&task_name, handler, &query, timeout).await,
                        Err(e) => Err(anyhow!("Dispatch semaphore closed: {}", e)),
                    }
                }),
            ));
        }

        // Join in dispatch order, not completion order
        let mut bundle = ResponseBundle::new();
        let mut first_failure: Option<(String, anyhow::Error)> = None;
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(anyhow!("Handler task panicked: {}", e)),
            };
            match outcome {
                Ok(entry) => bundle.insert(name, entry),
                Err(source) => {
                    warn!("Handler {} failed: {}", name, source);
                    if first_failure.is_none() {
                        first_failure = Some((name, source));
                    }
                }
            }
        }

        match first_failure {
            Some((handler, source)) => Err(ConciergeError::HandlerFailure {
                handler,
                source,
                partial: bundle,
            }),
            None => Ok(bundle),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

/// Run one handler, mapping an elapsed timeout to [`BundleEntry::TimedOut`]
async fn invoke(
    name: &str,
    handler: Arc<dyn AgentHandler>,
    query: &str,
    timeout: Option<Duration>,
) -> Result<BundleEntry> {
    debug!("Dispatching to handler: {}", name);
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, handler.handle(query)).await {
            Ok(result) => result.map(BundleEntry::Completed),
            Err(_) => {
                warn!("Handler {} timed out after {:?}", name, limit);
                Ok(BundleEntry::TimedOut)
            }
        },
        None => handler.handle(query).await.map(BundleEntry::Completed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::classify;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        reply: String,
        calls: AtomicUsize,
    }

    impl CountingHandler {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AgentHandler for CountingHandler {
        fn description(&self) -> &str {
            "counts calls"
        }

        async fn handle(&self, _query: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl AgentHandler for FailingHandler {
        fn description(&self) -> &str {
            "always fails"
        }

        async fn handle(&self, _query: &str) -> Result<String> {
            Err(anyhow!("catalog offline"))
        }
    }

    struct SlowHandler {
        delay: Duration,
        reply: String,
    }

    #[async_trait]
    impl AgentHandler for SlowHandler {
        fn description(&self) -> &str {
            "sleeps before answering"
        }

        async fn handle(&self, _query: &str) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok(self.reply.clone())
        }
    }

    fn slow(delay_ms: u64, reply: &str) -> Arc<SlowHandler> {
        Arc::new(SlowHandler {
            delay: Duration::from_millis(delay_ms),
            reply: reply.to_string(),
        })
    }

    fn parallel() -> Router {
        Router::new(RouterConfig {
            dispatch: DispatchMode::Parallel,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_single_intent_calls_only_target() {
        let course = CountingHandler::new("courses");
        let library = CountingHandler::new("books");
        let events = CountingHandler::new("events");
        let mut registry = AgentRegistry::new();
        registry.register("course_advisor", course.clone());
        registry.register("library_agent", library.clone());
        registry.register("events_agent", events.clone());

        let result = classify("Find courses about data science");
        let bundle = Router::default().route(&result, &registry).await.unwrap();

        assert_eq!(bundle.handler_names(), vec!["course_advisor"]);
        assert_eq!(course.calls(), 1);
        assert_eq!(library.calls(), 0);
        assert_eq!(events.calls(), 0);
    }

    #[tokio::test]
    async fn test_unresolved_target_yields_empty_bundle() {
        let registry = AgentRegistry::new();
        let result = classify("hello there");
        let bundle = Router::default().route(&result, &registry).await.unwrap();
        assert!(bundle.is_empty());
    }

    #[tokio::test]
    async fn test_multi_intent_follows_fan_out_order() {
        let mut registry = AgentRegistry::new();
        // Registration order must not matter
        registry.register("events_agent", CountingHandler::new("E"));
        registry.register("library_agent", CountingHandler::new("L"));
        registry.register("document_analyzer", CountingHandler::new("D"));
        registry.register("course_advisor", CountingHandler::new("C"));

        let result = classify("upload the syllabus, borrow a book, join the club");
        assert_eq!(result.routing_target, RoutingTarget::Deferred);

        let bundle = Router::default().route(&result, &registry).await.unwrap();
        assert_eq!(
            bundle.handler_names(),
            vec!["document_analyzer", "library_agent", "events_agent"]
        );
        assert_eq!(bundle.get("library_agent"), Some(&BundleEntry::Completed("L".into())));
    }

    #[tokio::test]
    async fn test_multi_intent_skips_unregistered_domain() {
        let mut registry = AgentRegistry::new();
        registry.register("course_advisor", CountingHandler::new("C"));

        let result = classify("I need a book for my course");
        let bundle = Router::default().route(&result, &registry).await.unwrap();
        assert_eq!(bundle.handler_names(), vec!["course_advisor"]);
    }

    #[tokio::test]
    async fn test_sequential_failure_carries_partial() {
        let library = CountingHandler::new("L");
        let mut registry = AgentRegistry::new();
        registry.register("document_analyzer", CountingHandler::new("D"));
        registry.register("course_advisor", Arc::new(FailingHandler));
        registry.register("library_agent", library.clone());

        let result = classify("syllabus for my course book");
        let err = Router::default().route(&result, &registry).await.unwrap_err();

        assert_eq!(err.handler(), "course_advisor");
        assert!(err.to_string().contains("catalog offline"));
        assert_eq!(library.calls(), 0);
        assert_eq!(err.into_partial().handler_names(), vec!["document_analyzer"]);
    }

    #[tokio::test]
    async fn test_parallel_failure_keeps_other_results() {
        let mut registry = AgentRegistry::new();
        registry.register("document_analyzer", CountingHandler::new("D"));
        registry.register("course_advisor", Arc::new(FailingHandler));
        registry.register("library_agent", CountingHandler::new("L"));

        let result = classify("syllabus for my course book");
        let err = parallel().route(&result, &registry).await.unwrap_err();

        assert_eq!(err.handler(), "course_advisor");
        assert_eq!(
            err.into_partial().handler_names(),
            vec!["document_analyzer", "library_agent"]
        );
    }

    #[tokio::test]
    async fn test_parallel_preserves_order_over_completion() {
        let mut registry = AgentRegistry::new();
        registry.register("document_analyzer", slow(80, "D"));
        registry.register("library_agent", slow(0, "L"));
        registry.register("events_agent", slow(10, "E"));

        let result = classify("upload the syllabus, borrow a book, join the club");
        let bundle = parallel().route(&result, &registry).await.unwrap();
        assert_eq!(
            bundle.handler_names(),
            vec!["document_analyzer", "library_agent", "events_agent"]
        );
    }

    #[tokio::test]
    async fn test_timeout_is_distinguishable() {
        let mut registry = AgentRegistry::new();
        registry.register("document_analyzer", slow(10_000, "too late"));
        registry.register("library_agent", CountingHandler::new("L"));

        let router = Router::new(RouterConfig {
            handler_timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let result = classify("scan this and find the book");
        let bundle = router.route(&result, &registry).await.unwrap();

        assert_eq!(bundle.get("document_analyzer"), Some(&BundleEntry::TimedOut));
        assert_eq!(bundle.get("library_agent"), Some(&BundleEntry::Completed("L".into())));
    }

    #[tokio::test]
    async fn test_parallel_with_zero_concurrency_still_runs() {
        let mut registry = AgentRegistry::new();
        registry.register("course_advisor", CountingHandler::new("C"));
        let router = Router::new(RouterConfig {
            dispatch: DispatchMode::Parallel,
            max_concurrent_handlers: 0,
            ..Default::default()
        });
        let bundle = router
            .route(&classify("course list"), &registry)
            .await
            .unwrap();
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn test_dispatch_mode_serde() {
        let json = serde_json::to_string(&DispatchMode::Parallel).unwrap();
        assert_eq!(json, "\"parallel\"");
        let mode: DispatchMode = serde_json::from_str("\"sequential\"").unwrap();
        assert_eq!(mode, DispatchMode::Sequential);
    }

    #[test]
    fn test_router_config_default() {
        let config = RouterConfig::default();
        assert_eq!(config.dispatch, DispatchMode::Sequential);
        assert!(config.handler_timeout.is_none());
        assert_eq!(config.max_concurrent_handlers, 4);
    }
}
