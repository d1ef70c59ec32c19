//! Generation client with primary → secondary fallback.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::errors::RagError;

use super::provider::ChatBackend;

/// Sends prompts to the primary (local) backend, retrying exactly once
/// against the secondary (cloud) backend when the primary is
/// unreachable, times out, or errors. Surfaces `GenerationFailed` only
/// after both have failed.
pub struct GenerationClient {
    primary: Arc<dyn ChatBackend>,
    secondary: Option<Arc<dyn ChatBackend>>,
}

impl GenerationClient {
    pub fn new(primary: Arc<dyn ChatBackend>, secondary: Option<Arc<dyn ChatBackend>>) -> Self {
        Self { primary, secondary }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        match self.primary.complete(prompt).await {
            Ok(text) => {
                debug!("generation served by primary ({})", self.primary.name());
                Ok(text)
            }
            Err(primary_err) => {
                warn!(
                    "primary backend ({}) failed: {primary_err}",
                    self.primary.name()
                );
                let Some(secondary) = &self.secondary else {
                    return Err(RagError::GenerationFailed(format!(
                        "primary ({}): {primary_err}; no fallback configured",
                        self.primary.name()
                    )));
                };

                match secondary.complete(prompt).await {
                    Ok(text) => {
                        debug!("generation served by fallback ({})", secondary.name());
                        Ok(text)
                    }
                    Err(secondary_err) => Err(RagError::GenerationFailed(format!(
                        "primary ({}): {primary_err}; fallback ({}): {secondary_err}",
                        self.primary.name(),
                        secondary.name()
                    ))),
                }
            }
        }
    }
}
