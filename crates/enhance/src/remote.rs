//! [`Enhancer`] implementation backed by the remote service API.
//!
//! Builds per-method prompts, runs the submit/poll/result cycle, and
//! maps service failures into per-attempt [`EnhancementError`]s carrying
//! the underlying service message.

use async_trait::async_trait;
use stillframe_core::adapter::Enhancer;
use stillframe_core::error::EnhancementError;
use stillframe_core::types::RemoteMethod;

use crate::api::EnhanceApi;

/// Base prompt for context-aware enhancement.
const SMART_PROMPT: &str =
    "Enhance this video still: sharpen detail, recover texture, preserve the scene exactly.";
/// Prompt for standard enhancement.
const NORMAL_PROMPT: &str = "Enhance this video still: sharpen detail and reduce noise.";
/// Prompt for the content-preserving last-resort upscale.
const DIRECT_PROMPT: &str = "Upscale only. Do not alter content.";

/// Remote enhancement engine speaking to one service endpoint.
pub struct RemoteEnhancer {
    api: EnhanceApi,
}

impl RemoteEnhancer {
    pub fn new(api: EnhanceApi) -> Self {
        Self { api }
    }

    /// Convenience constructor from a base URL.
    pub fn connect(api_url: impl Into<String>) -> Self {
        Self::new(EnhanceApi::new(api_url.into()))
    }
}

/// Build the prompt for one enhancement attempt.
///
/// Smart attempts embed the context description when one is available;
/// with no context the base smart prompt is used as-is.
pub fn build_prompt(method: RemoteMethod, context: Option<&str>) -> String {
    match method {
        RemoteMethod::Smart => match context {
            Some(ctx) if !ctx.is_empty() => format!("{SMART_PROMPT} Scene: {ctx}"),
            _ => SMART_PROMPT.to_string(),
        },
        RemoteMethod::Normal => NORMAL_PROMPT.to_string(),
        RemoteMethod::Direct => DIRECT_PROMPT.to_string(),
    }
}

#[async_trait]
impl Enhancer for RemoteEnhancer {
    async fn enhance(
        &self,
        image: &[u8],
        method: RemoteMethod,
        context: Option<&str>,
    ) -> Result<Vec<u8>, EnhancementError> {
        let prompt = build_prompt(method, context);

        let job_id = self
            .api
            .submit(image, method.as_str(), &prompt)
            .await
            .map_err(|e| EnhancementError::Remote(e.to_string()))?;

        tracing::debug!(job_id = %job_id, method = method.as_str(), "Enhancement job submitted");

        self.api
            .await_result(&job_id)
            .await
            .map_err(|e| EnhancementError::Remote(e.to_string()))
    }

    async fn describe_image(&self, image: &[u8]) -> String {
        // Context analysis is best-effort: a failure here must never fail
        // the enhancement attempt it feeds into.
        match self.api.describe(image).await {
            Ok(description) => description,
            Err(e) => {
                tracing::warn!(error = %e, "Image description failed, proceeding without context");
                String::new()
            }
        }
    }
}
