// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Markdown export of a finished analysis

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::collection::ImageCollection;
use crate::response::AnalysisResult;
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct ImageSummary {
    pub position: usize,
    pub name: String,
    pub mime_type: String,
    pub annotation: String,
}

/// A curator report: the analysed views plus the narrative and sources
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub images: Vec<ImageSummary>,
    pub result: AnalysisResult,
}

impl Report {
    pub fn new(images: &ImageCollection, result: &AnalysisResult) -> Self {
        Self::with_timestamp(images, result, Local::now())
    }

    pub fn with_timestamp(
        images: &ImageCollection,
        result: &AnalysisResult,
        generated_at: DateTime<Local>,
    ) -> Self {
        let images = images
            .iter()
            .enumerate()
            .map(|(index, img)| ImageSummary {
                position: index + 1,
                name: img.name().to_string(),
                mime_type: img.mime_type().to_string(),
                annotation: img.annotation().trim().to_string(),
            })
            .collect();

        Self {
            generated_at,
            images,
            result: result.clone(),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(out, "# Kuratoren-Analyse");
        let _ = writeln!(out);
        let _ = writeln!(out, "Erstellt am {}", self.generated_at.format("%d.%m.%Y %H:%M"));
        let _ = writeln!(out);

        let _ = writeln!(out, "| # | Datei | Typ | Zusatzinformation |");
        let _ = writeln!(out, "|---|---|---|---|");
        for img in &self.images {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                img.position,
                escape_cell(&img.name),
                img.mime_type,
                escape_cell(&img.annotation)
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "{}", self.result.text.trim_end());

        if !self.result.references.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Quellen & Referenzen");
            let _ = writeln!(out);
            for reference in &self.result.references {
                let label = if reference.title.is_empty() {
                    &reference.uri
                } else {
                    &reference.title
                };
                let _ = writeln!(out, "- [{}]({})", label, reference.uri);
            }
        }

        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_markdown())?;
        Ok(())
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}
