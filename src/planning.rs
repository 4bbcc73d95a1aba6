// ABOUTME: Hosted structured-generation client for drafting plans from free text
// ABOUTME: Authenticates via the service assertion signer, enforces a JSON response schema
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Planning Service Client
//!
//! Turns a free-text goal description into a structured `{goal, tasks[]}`
//! plan by calling the hosted generation endpoint with a JSON response
//! schema, so the model's output is schema-conformant and parses directly
//! into `PlanInput`.
//!
//! Each call obtains a fresh service-principal bearer token through
//! `ServiceAssertionSigner`; nothing is cached.

use crate::errors::{EngineError, EngineResult};
use crate::models::PlanInput;
use crate::service_auth::ServiceAssertionSigner;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

/// Scope requested on the service bearer token
const PLANNING_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Outbound HTTP timeout; generation calls are slow
const HTTP_TIMEOUT_SECS: u64 = 60;

/// Planning model configuration
#[derive(Debug, Clone)]
pub struct PlanningConfig {
    pub region: String,
    pub model: String,
}

impl PlanningConfig {
    /// Build from environment with production defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            region: std::env::var("PLANNING_REGION").unwrap_or_else(|_| "us-central1".to_owned()),
            model: std::env::var("PLANNING_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_owned()),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// JSON schema the generation endpoint must conform to
fn plan_schema() -> Value {
    json!({
        "type": "object",
        "required": ["goal", "tasks"],
        "properties": {
            "goal": {
                "type": "object",
                "required": ["title"],
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "target_date": {"type": "string", "format": "date-time"}
                }
            },
            "tasks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["title", "duration_minutes"],
                    "properties": {
                        "title": {"type": "string"},
                        "notes": {"type": "string"},
                        "duration_minutes": {"type": "integer"},
                        "session_min_minutes": {"type": "integer"},
                        "session_max_minutes": {"type": "integer"},
                        "priority": {"type": "integer"}
                    }
                }
            }
        }
    })
}

/// Client for the hosted structured-generation endpoint
pub struct PlanningClient {
    config: PlanningConfig,
    signer: ServiceAssertionSigner,
    client: reqwest::Client,
}

impl PlanningClient {
    /// Create a client over a signer bound to the target project.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: PlanningConfig, signer: ServiceAssertionSigner) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            config,
            signer,
            client,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/publishers/google/models/{model}:generateContent",
            region = self.config.region,
            project = self.signer.project_id(),
            model = self.config.model,
        )
    }

    /// Draft a structured plan from a free-text goal description.
    ///
    /// # Errors
    ///
    /// Propagates signer failures (`CredentialMalformed`,
    /// `AssertionExchangeFailed`) and returns `ProviderUnavailable` when
    /// the generation endpoint fails or returns non-conformant output.
    pub async fn draft_plan(&self, prompt: &str) -> EngineResult<PlanInput> {
        let token = self.signer.bearer_token(PLANNING_SCOPE).await?;

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_owned()),
                parts: vec![Part {
                    text: format!(
                        "Break the following goal into schedulable tasks with realistic \
                         duration estimates in minutes.\n\nGoal: {prompt}"
                    ),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: "application/json",
                response_schema: plan_schema(),
            },
        };

        debug!(model = %self.config.model, "requesting plan draft");

        let response = self
            .client
            .post(self.generate_url())
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::ProviderUnavailable(format!("planning service: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::ProviderUnavailable(format!("planning service: {e}")))?;

        if !status.is_success() {
            error!(status = %status, "planning service error");
            return Err(EngineError::ProviderUnavailable(format!(
                "planning service returned {status}: {body}"
            )));
        }

        let generated: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| EngineError::ProviderUnavailable(format!("planning response parse: {e}")))?;

        let text = generated
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| {
                EngineError::ProviderUnavailable("planning response had no content".to_owned())
            })?;

        let plan: PlanInput = serde_json::from_str(text).map_err(|e| {
            EngineError::ProviderUnavailable(format!("plan draft not schema-conformant: {e}"))
        })?;

        if plan.tasks.is_empty() {
            return Err(EngineError::ProviderUnavailable(
                "plan draft contained no tasks".to_owned(),
            ));
        }

        Ok(plan)
    }
}
