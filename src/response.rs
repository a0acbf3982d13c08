// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Normalisation of proxy responses into analysis results

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::proxy::schema::GenerateContentResponse;

/// Narrative used when the response carries no text
pub const NO_ANALYSIS_PLACEHOLDER: &str = "Keine Analyse generiert.";

/// A web citation backing part of the narrative. `title` is empty when the
/// source gave none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingReference {
    pub uri: String,
    pub title: String,
}

/// Narrative analysis plus its citations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub text: String,
    pub references: Vec<GroundingReference>,
}

/// Turns raw proxy responses into [`AnalysisResult`]s. Never fails.
pub struct ResponseParser;

impl ResponseParser {
    /// Parse a raw response body
    pub fn parse(raw: &str) -> AnalysisResult {
        let response = serde_json::from_str::<GenerateContentResponse>(raw).unwrap_or_else(|e| {
            warn!("Unexpected response shape, using defaults: {}", e);
            GenerateContentResponse::default()
        });
        Self::from_response(&response)
    }

    /// Parse an already decoded JSON value
    pub fn parse_value(raw: serde_json::Value) -> AnalysisResult {
        let response = serde_json::from_value::<GenerateContentResponse>(raw).unwrap_or_else(|e| {
            warn!("Unexpected response shape, using defaults: {}", e);
            GenerateContentResponse::default()
        });
        Self::from_response(&response)
    }

    pub fn from_response(response: &GenerateContentResponse) -> AnalysisResult {
        let text = match response.narrative() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => {
                debug!("Response carried no narrative text");
                NO_ANALYSIS_PLACEHOLDER.to_string()
            }
        };

        let references = response
            .grounding_chunks()
            .iter()
            .filter_map(|chunk| {
                let web = chunk.web.as_ref()?;
                Some(GroundingReference {
                    uri: web.uri.clone().filter(|uri| !uri.is_empty())?,
                    title: web.title.clone().unwrap_or_default(),
                })
            })
            .collect();

        AnalysisResult { text, references }
    }
}
