//! Shared state for the HTTP layer.

use std::sync::Arc;

use crate::pipeline::rag::SessionRegistry;
use crate::pipeline::AssistantPipeline;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<AssistantPipeline>,
    pub sessions: Arc<SessionRegistry>,
}

impl ApiContext {
    pub fn new(pipeline: AssistantPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            sessions: Arc::new(SessionRegistry::new()),
        }
    }
}
