// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Construction of the multimodal analysis request
//!
//! Image parts come first, in collection order, followed by exactly one text
//! part. The remote model attributes per-image notes by position, so this
//! ordering must never depend on how encoding jobs complete.

use base64::{engine::general_purpose, Engine as _};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::debug;

use crate::collection::ImageCollection;
use crate::{LensError, Result};

/// Version tag of the embedded system instruction
pub const SYSTEM_INSTRUCTION_VERSION: &str = "curator-v2";

/// Curator persona and German report structure
pub const SYSTEM_INSTRUCTION: &str = include_str!("prompts/curator_v2.txt");

/// Task prompt used when no override is given
pub const DEFAULT_PROMPT: &str = "Analysieren Sie diese Bilder ausführlich für unser Museumsarchiv.";

/// Heading of the per-image annotation section
pub const ANNOTATION_HEADER: &str = "Zusätzliche Informationen vom Nutzer zu den Bildern:";

pub const TEMPERATURE: f32 = 0.4;
pub const WEB_SEARCH_GROUNDING: bool = true;

/// One part of the request content
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Image {
        encoded_content: String,
        mime_type: String,
    },
    Text(String),
}

impl Part {
    pub fn is_text(&self) -> bool {
        matches!(self, Part::Text(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tools {
    pub web_search_grounding: bool,
}

/// A fully built request, ready to hand to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub parts: Vec<Part>,
    pub system_instruction: &'static str,
    pub tools: Tools,
    pub temperature: f32,
}

impl AnalysisRequest {
    pub fn image_count(&self) -> usize {
        self.parts.iter().filter(|p| !p.is_text()).count()
    }

    /// The task prompt carried by the trailing text part
    pub fn prompt(&self) -> &str {
        match self.parts.last() {
            Some(Part::Text(text)) => text,
            _ => "",
        }
    }
}

/// Builds [`AnalysisRequest`]s from an image collection
pub struct RequestBuilder;

impl RequestBuilder {
    /// Build the request for `collection`.
    ///
    /// Images are base64-encoded concurrently on the blocking pool and
    /// reassembled in collection order.
    pub async fn build(
        collection: &ImageCollection,
        prompt_override: Option<&str>,
    ) -> Result<AnalysisRequest> {
        if collection.is_empty() {
            return Err(LensError::EmptyCollection);
        }

        let jobs = collection.iter().map(|img| {
            let content = img.content();
            let mime_type = img.mime_type().to_string();
            tokio::task::spawn_blocking(move || encode_image(content, mime_type))
        });

        let mut parts = join_all(jobs)
            .await
            .into_iter()
            .map(|joined| joined.map_err(|e| LensError::Encoding(e.to_string())))
            .collect::<Result<Vec<_>>>()?;

        parts.push(Part::Text(Self::task_prompt(collection, prompt_override)));

        debug!(
            "Built analysis request: {} image part(s), instruction {}",
            parts.len() - 1,
            SYSTEM_INSTRUCTION_VERSION
        );

        Ok(AnalysisRequest {
            parts,
            system_instruction: SYSTEM_INSTRUCTION,
            tools: Tools {
                web_search_grounding: WEB_SEARCH_GROUNDING,
            },
            temperature: TEMPERATURE,
        })
    }

    /// Task prompt plus the optional annotation appendix
    pub fn task_prompt(collection: &ImageCollection, prompt_override: Option<&str>) -> String {
        let mut prompt = match prompt_override {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => DEFAULT_PROMPT.to_string(),
        };

        let notes: Vec<String> = collection
            .iter()
            .enumerate()
            .filter_map(|(index, img)| {
                let note = img.annotation().trim();
                (!note.is_empty()).then(|| format!("Image {}: {}", index + 1, note))
            })
            .collect();

        if !notes.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(ANNOTATION_HEADER);
            prompt.push('\n');
            for line in notes {
                prompt.push_str(&line);
                prompt.push('\n');
            }
        }

        prompt
    }
}

fn encode_image(content: Arc<[u8]>, mime_type: String) -> Part {
    Part::Image {
        encoded_content: general_purpose::STANDARD.encode(&content),
        mime_type,
    }
}
