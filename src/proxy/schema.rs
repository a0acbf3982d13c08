// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Wire schema of the inference proxy (generateContent, v1beta shape)
//!
//! Response fields are all optional with empty defaults; absence or a
//! mistyped value is a valid response, not a decode error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::request::{AnalysisRequest, Part};

/// Version of the wire shape described here
pub const SCHEMA_VERSION: &str = "generateContent/v1beta";

// === Request ===

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: SystemInstruction,
    pub tools: Vec<Tool>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: &'static str,
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WirePart {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
}

impl From<&AnalysisRequest> for GenerateContentRequest {
    fn from(request: &AnalysisRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Image { encoded_content, mime_type } => WirePart::Inline {
                    inline_data: InlineData {
                        data: encoded_content.clone(),
                        mime_type: mime_type.clone(),
                    },
                },
                Part::Text(text) => WirePart::Text { text: text.clone() },
            })
            .collect();

        let tools = if request.tools.web_search_grounding {
            vec![Tool { google_search: GoogleSearch {} }]
        } else {
            Vec::new()
        };

        Self {
            contents: vec![Content { role: "user", parts }],
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: request.system_instruction.to_string(),
                }],
            },
            tools,
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        }
    }
}

// === Response ===
//
// Every field decodes on its own: a value of the wrong type becomes the
// field's default instead of failing the whole response. A malformed list
// element becomes a default element so positions are preserved.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateContentResponse {
    #[serde(deserialize_with = "lenient_vec")]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    #[serde(deserialize_with = "lenient")]
    pub content: Option<CandidateContent>,
    #[serde(deserialize_with = "lenient")]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CandidateContent {
    #[serde(deserialize_with = "lenient_vec")]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResponsePart {
    #[serde(deserialize_with = "lenient")]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundingMetadata {
    #[serde(deserialize_with = "lenient_vec")]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GroundingChunk {
    #[serde(deserialize_with = "lenient")]
    pub web: Option<WebReference>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebReference {
    #[serde(deserialize_with = "lenient")]
    pub uri: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .map(|item| T::deserialize(item).unwrap_or_default())
        .collect())
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`
    pub fn narrative(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }

    /// `candidates[0].groundingMetadata.groundingChunks`, empty when absent
    pub fn grounding_chunks(&self) -> &[GroundingChunk] {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| m.grounding_chunks.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Tools, SYSTEM_INSTRUCTION};
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = AnalysisRequest {
            parts: vec![
                Part::Image {
                    encoded_content: "QUJD".to_string(),
                    mime_type: "image/png".to_string(),
                },
                Part::Text("Analyse".to_string()),
            ],
            system_instruction: SYSTEM_INSTRUCTION,
            tools: Tools { web_search_grounding: true },
            temperature: 0.4,
        };

        let wire = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();

        assert_eq!(
            wire["contents"],
            json!([{
                "role": "user",
                "parts": [
                    { "inlineData": { "data": "QUJD", "mimeType": "image/png" } },
                    { "text": "Analyse" }
                ]
            }])
        );
        assert_eq!(wire["systemInstruction"]["parts"][0]["text"], SYSTEM_INSTRUCTION);
        assert_eq!(wire["tools"], json!([{ "googleSearch": {} }]));
        assert_eq!(wire["generationConfig"]["temperature"].as_f64().unwrap() as f32, 0.4);
    }

    #[test]
    fn test_response_paths() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Bericht" }], "role": "model" },
                "groundingMetadata": {
                    "groundingChunks": [{ "web": { "uri": "https://a", "title": "A" } }],
                    "webSearchQueries": ["axt"]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(response.narrative(), Some("Bericht"));
        assert_eq!(response.grounding_chunks().len(), 1);
    }

    #[test]
    fn test_empty_object_decodes_to_defaults() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.narrative(), None);
        assert!(response.grounding_chunks().is_empty());
    }

    #[test]
    fn test_mistyped_fields_fall_back_per_field() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Bericht" }, { "text": 7 }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": "unexpected" },
                        { "web": { "uri": "https://a", "title": ["A"] } },
                        42
                    ]
                }
            }]
        }))
        .unwrap();

        assert_eq!(response.narrative(), Some("Bericht"));
        let chunks = response.grounding_chunks();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].web.is_none());
        let web = chunks[1].web.as_ref().unwrap();
        assert_eq!(web.uri.as_deref(), Some("https://a"));
        assert!(web.title.is_none());
        assert!(chunks[2].web.is_none());
    }
}
