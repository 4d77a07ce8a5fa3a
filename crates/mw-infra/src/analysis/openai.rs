use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use mw_core::config::AppConfig;
use mw_core::entry::AiAnalysis;
use mw_core::ports::{AnalysisError, ImageAnalyzerPort};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.7;
const REQUIRED_FIELDS: [&str; 6] = [
    "description",
    "imageType",
    "style",
    "technical",
    "colors",
    "tags",
];

const ANALYSIS_PROMPT: &str = r##"Analyze this image comprehensively and return a JSON response with the following structure:
{
  "description": "A detailed 2-3 line description of the image and its style",
  "imageType": "The type of image (e.g., Photograph, Illustration, Digital Art, 3D Render, Anime, etc.)",
  "style": {
    "primary": "main style description",
    "secondary": ["list", "of", "secondary", "styles"],
    "influences": ["artistic", "influences"]
  },
  "technical": {
    "quality": "description of image quality",
    "renderStyle": "rendering technique used",
    "detailLevel": "detail assessment",
    "lighting": "lighting description"
  },
  "colors": {
    "palette": ["#HEX1", "#HEX2", "#HEX3"],
    "mood": "color mood description",
    "contrast": "contrast assessment"
  },
  "tags": {
    "style": ["style", "related", "tags"],
    "technical": ["technical", "aspect", "tags"],
    "mood": ["mood", "related", "tags"]
  }
}"##;

#[derive(Debug, Clone)]
pub struct OpenAiAnalyzerConfig {
    /// Full chat-completions URL.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl OpenAiAnalyzerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.analysis.endpoint.clone(),
            api_key: config.analysis.api_key.clone(),
            model: config.analysis.model.clone(),
            request_timeout: Duration::from_secs(config.sync.request_timeout_secs),
        }
    }
}

/// Captioning through an OpenAI-compatible chat completion with image input.
pub struct OpenAiImageAnalyzer {
    http: reqwest::Client,
    config: OpenAiAnalyzerConfig,
    json_object: Regex,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn failed(reason: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Failed(reason.to_string())
}

impl OpenAiImageAnalyzer {
    pub fn new(config: OpenAiAnalyzerConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            json_object: Regex::new(r"\{[\s\S]*\}")?,
        })
    }

    fn data_url(image: &[u8]) -> String {
        let mime = match image::guess_format(image) {
            Ok(ImageFormat::Png) => "image/png",
            Ok(ImageFormat::WebP) => "image/webp",
            _ => "image/jpeg",
        };
        format!("data:{mime};base64,{}", STANDARD.encode(image))
    }

    /// Pull the analysis object out of a free-form model reply.
    fn parse_reply(&self, reply: &str) -> Result<AiAnalysis, AnalysisError> {
        let raw = self
            .json_object
            .find(reply)
            .ok_or_else(|| failed("no JSON object in the reply"))?;
        let value: Value = serde_json::from_str(raw.as_str()).map_err(failed)?;

        for field in REQUIRED_FIELDS {
            let present = match value.get(field) {
                Some(Value::String(s)) => !s.is_empty(),
                Some(Value::Object(_)) => true,
                _ => false,
            };
            if !present {
                return Err(failed(format!("reply is missing {field}")));
            }
        }

        serde_json::from_value(value).map_err(failed)
    }
}

#[async_trait]
impl ImageAnalyzerPort for OpenAiImageAnalyzer {
    #[tracing::instrument(name = "analysis.analyze", skip(self, image), fields(bytes = image.len()))]
    async fn analyze(&self, image: &[u8]) -> Result<AiAnalysis, AnalysisError> {
        if self.config.api_key.is_empty() {
            return Err(failed("no API key configured"));
        }

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![json!({
                "role": "user",
                "content": [
                    { "type": "text", "text": ANALYSIS_PROMPT },
                    { "type": "image_url", "image_url": { "url": Self::data_url(image) } }
                ]
            })],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("captioning request failed: {}", e);
                failed(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("captioning service answered {}", status);
            return Err(failed(format!("service answered {status}")));
        }

        let reply: ChatResponse = response.json().await.map_err(failed)?;
        let text = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| failed("no analysis received"))?;

        debug!(chars = text.len(), "received analysis reply");
        self.parse_reply(&text)
    }
}
