use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::VisionConfig,
    error::{AppError, Result},
    gateways::{FaceComparator, FaceVerdict},
};

// Uncertain means no match. The reveal gate fails closed, so the
// prompt must never let the model guess its way to MATCH.
const COMPARE_PROMPT: &str = "You are a strict face verification system. \
Compare the person in the first image with the person in the second image. \
Reply with exactly one word: MATCH if you are confident they are the same person, \
otherwise NO_MATCH. If the images are unclear, obstructed, or you are uncertain \
for any reason, reply NO_MATCH.";

/// Face comparison via a hosted generative vision model. One call per
/// unlock attempt; a response that is not a clear verdict is an error,
/// which callers surface as inconclusive rather than a mismatch.
pub struct GenerativeVisionComparator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerativeVisionComparator {
    pub fn new(config: &VisionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn fetch_reference_image(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::ExternalTimeout("reference image fetch timed out".to_string())
            } else {
                AppError::External("reference image fetch failed".to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(AppError::External(format!(
                "reference image fetch returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|_| AppError::External("reference image read failed".to_string()))?;

        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

#[async_trait]
impl FaceComparator for GenerativeVisionComparator {
    async fn compare(&self, reference_image_url: &str, snapshot_b64: &str) -> Result<FaceVerdict> {
        let reference_b64 = self.fetch_reference_image(reference_image_url).await?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": COMPARE_PROMPT },
                    { "inline_data": { "mime_type": "image/jpeg", "data": reference_b64 } },
                    { "inline_data": { "mime_type": "image/jpeg", "data": snapshot_b64 } },
                ]
            }],
            "generationConfig": { "temperature": 0.0, "maxOutputTokens": 10 }
        });

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::ExternalTimeout("vision comparator timed out".to_string())
            } else {
                AppError::External("vision comparator request failed".to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(AppError::External(format!(
                "vision comparator returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("invalid comparator response: {}", e)))?;

        let text = body
            .candidates
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|mut p| p.drain(..).next())
            .and_then(|p| p.text)
            .ok_or_else(|| AppError::External("comparator returned no verdict".to_string()))?;

        let verdict = text.trim().to_uppercase();
        // NO_MATCH contains MATCH, so check it first.
        if verdict.contains("NO_MATCH") || verdict.contains("NO MATCH") {
            Ok(FaceVerdict::NoMatch)
        } else if verdict.contains("MATCH") {
            Ok(FaceVerdict::Match)
        } else {
            Err(AppError::External("comparator returned no verdict".to_string()))
        }
    }
}
