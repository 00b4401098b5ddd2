//! Gemini `generateContent` adapter for road-closure briefings.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::BriefingError;
use crate::traits::{BriefingProvider, Report, Source};

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    /// Defaults with the API key taken from `GEMINI_API_KEY`.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, BriefingError> {
        if config.api_key.is_empty() {
            return Err(BriefingError::MissingApiKey);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn generate(&self, body: &Value) -> Result<GenerateResponse, BriefingError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        debug!(model = %self.config.model, "requesting generateContent");
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<GenerateResponse>())?;
        Ok(response)
    }
}

impl BriefingProvider for GeminiClient {
    fn search_report(&self, prompt: &str) -> Result<Report, BriefingError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "tools": [{ "google_search": {} }],
        });
        let response = self.generate(&body)?;
        Ok(Report {
            text: response.text(),
            sources: response.sources(),
        })
    }

    fn extract_json(&self, prompt: &str) -> Result<String, BriefingError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "lat": { "type": "NUMBER" },
                            "lng": { "type": "NUMBER" },
                            "note": { "type": "STRING" },
                        },
                        "required": ["lat", "lng", "note"],
                    },
                },
            },
        });
        let text = self.generate(&body)?.text();
        if text.trim().is_empty() {
            return Err(BriefingError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    title: Option<String>,
    uri: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn sources(&self) -> Vec<Source> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.grounding_metadata.as_ref())
            .map(|metadata| {
                metadata
                    .grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .filter_map(|web| {
                        Some(Source {
                            title: web.title.clone().unwrap_or_default(),
                            uri: web.uri.clone()?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_rejected() {
        let err = GeminiClient::new(GeminiConfig::default()).unwrap_err();
        assert!(matches!(err, BriefingError::MissingApiKey));
    }

    #[test]
    fn test_response_text_and_sources() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Mill Road closed "}, {"text": "until 6am."}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"title": "Roadworks", "uri": "https://example.org/roadworks"}},
                    {"web": {"title": "No link"}},
                    {"retrievedContext": {}}
                ]}
            }]
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), "Mill Road closed until 6am.");
        assert_eq!(
            response.sources(),
            vec![Source {
                title: "Roadworks".to_string(),
                uri: "https://example.org/roadworks".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_response_has_no_text() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_empty());
        assert!(response.sources().is_empty());
    }
}
