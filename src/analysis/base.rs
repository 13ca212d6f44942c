//! Base implementation for the generative stages.

use crate::analysis::{AnalysisStage, PromptOperations};
use crate::service::TextGenerator;
use std::sync::Arc;

/// Holds the generative service and stage name for a stage client
pub struct BaseStage {
    generator: Arc<dyn TextGenerator>,
    stage_name: String,
}

impl BaseStage {
    pub fn new(generator: Arc<dyn TextGenerator>, stage_name: impl Into<String>) -> Self {
        Self {
            generator,
            stage_name: stage_name.into(),
        }
    }
}

impl AnalysisStage for BaseStage {
    fn stage_name(&self) -> &str {
        &self.stage_name
    }
}

impl PromptOperations for BaseStage {
    fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }
}
