//! HTTP-backed classifiers for hosted inference endpoints.
//!
//! Text is posted as `{"inputs": "..."}`, images as raw PNG bytes. Both
//! accept a response of `[{label, score}, ...]` or the nested
//! `[[{label, score}, ...]]` form.

use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageFormat};
use serde::Deserialize;

use super::scorer::{top_k, ImageNsfwScorer, ImageViolenceScorer, LabelScore, TextToxicityScorer};
use crate::error::{Error, Result};

/// Labels kept from each classifier response.
pub const TOP_K: usize = 5;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Flat(Vec<LabelScore>),
    Nested(Vec<Vec<LabelScore>>),
}

/// Parse an inference response body into the top labels.
pub fn parse_response(body: &str) -> Result<Vec<LabelScore>> {
    let response: InferenceResponse = serde_json::from_str(body)
        .map_err(|e| Error::Classifier(format!("unexpected response: {}", e)))?;

    let scores = match response {
        InferenceResponse::Flat(scores) => scores,
        InferenceResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
    };
    Ok(top_k(scores, TOP_K))
}

/// Classifier served over HTTP.
pub struct HttpScorer {
    client: reqwest::blocking::Client,
    url: String,
    token: Option<String>,
}

impl HttpScorer {
    /// Create a scorer for an endpoint URL.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a scorer with a custom request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(format!("docfilter/{}", crate::VERSION))
            .build()
            .map_err(|e| Error::Classifier(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            token: None,
        })
    }

    /// Send a bearer token with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Vec<LabelScore>> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .map_err(|e| Error::Classifier(format!("{}: {}", self.url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::Classifier(format!("{}: {}", self.url, e)))?;

        if !status.is_success() {
            return Err(Error::Classifier(format!(
                "{}: HTTP {}: {}",
                self.url,
                status,
                body.trim()
            )));
        }

        parse_response(&body)
    }

    fn score_image(&self, image: &DynamicImage) -> Result<Vec<LabelScore>> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let request = self
            .client
            .post(&self.url)
            .header("content-type", "image/png")
            .body(png);
        self.send(request)
    }
}

impl TextToxicityScorer for HttpScorer {
    fn score(&self, text: &str) -> Result<Vec<LabelScore>> {
        let body = serde_json::json!({ "inputs": text });
        let request = self.client.post(&self.url).json(&body);
        self.send(request)
    }
}

impl ImageNsfwScorer for HttpScorer {
    fn score(&self, image: &DynamicImage) -> Result<Vec<LabelScore>> {
        self.score_image(image)
    }
}

impl ImageViolenceScorer for HttpScorer {
    fn score(&self, image: &DynamicImage) -> Result<Vec<LabelScore>> {
        self.score_image(image)
    }
}

impl std::fmt::Debug for HttpScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpScorer")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}
