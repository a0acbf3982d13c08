// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Upload → annotate → submit → result state machine
//!
//! The controller owns the session's [`ImageCollection`] and is the only
//! entry point a front-end may call. Operations that are not a defined
//! transition from the current state are rejected with
//! [`LensError::InvalidTransition`] and change nothing.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::classify::{ClassifiedFailure, ErrorClassifier, TransportFailure};
use crate::collection::{ImageCollection, ImageFile, ImageId, PreviewRegistry};
use crate::proxy::Transport;
use crate::request::{AnalysisRequest, RequestBuilder};
use crate::response::{AnalysisResult, ResponseParser};
use crate::{LensError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "outcome", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    Preview,
    Analyzing,
    Results(AnalysisResult),
    Error(ClassifiedFailure),
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Preview => "preview",
            WorkflowState::Analyzing => "analyzing",
            WorkflowState::Results(_) => "results",
            WorkflowState::Error(_) => "error",
        }
    }
}

pub struct WorkflowController {
    state: WorkflowState,
    images: ImageCollection,
    transport: Arc<dyn Transport>,
    prompt_override: Option<String>,
}

impl WorkflowController {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            state: WorkflowState::Idle,
            images: ImageCollection::new(),
            transport,
            prompt_override: None,
        }
    }

    /// Use `prompt` instead of the default task prompt
    pub fn with_prompt_override(mut self, prompt: Option<String>) -> Self {
        self.prompt_override = prompt;
        self
    }

    /// Report preview handles to `previews`
    pub fn with_previews(mut self, previews: PreviewRegistry) -> Self {
        self.images = ImageCollection::with_registry(previews);
        self
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn images(&self) -> &ImageCollection {
        &self.images
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            WorkflowState::Results(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ClassifiedFailure> {
        match &self.state {
            WorkflowState::Error(failure) => Some(failure),
            _ => None,
        }
    }

    fn reject(&self, operation: &'static str) -> LensError {
        warn!("Rejected '{}' while {}", operation, self.state.name());
        LensError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }

    fn transition(&mut self, next: WorkflowState) {
        info!("Workflow: {} -> {}", self.state.name(), next.name());
        self.state = next;
    }

    /// Add images. Files beyond the collection cap are discarded.
    pub fn add(&mut self, files: Vec<ImageFile>) -> Result<Vec<ImageId>> {
        if !matches!(self.state, WorkflowState::Idle | WorkflowState::Preview) {
            return Err(self.reject("add"));
        }

        let offered = files.len();
        let added = self.images.add(files);
        if added.len() < offered {
            warn!(
                "Collection full: discarded {} of {} offered image(s)",
                offered - added.len(),
                offered
            );
        }

        if self.state == WorkflowState::Idle && !self.images.is_empty() {
            self.transition(WorkflowState::Preview);
        }

        Ok(added)
    }

    /// Remove one image; removing the last one returns to `Idle`
    pub fn remove(&mut self, id: ImageId) -> Result<bool> {
        if self.state != WorkflowState::Preview {
            return Err(self.reject("remove"));
        }

        let removed = self.images.remove(id);
        if self.images.is_empty() {
            self.images.clear();
            self.transition(WorkflowState::Idle);
        }
        Ok(removed)
    }

    pub fn set_annotation(&mut self, id: ImageId, text: impl Into<String>) -> Result<bool> {
        if self.state != WorkflowState::Preview {
            return Err(self.reject("set_annotation"));
        }
        Ok(self.images.set_annotation(id, text))
    }

    /// Build the request and enter `Analyzing`.
    ///
    /// The caller dispatches the returned request and reports the outcome
    /// through [`finish_submit`](Self::finish_submit). Used directly by
    /// front-ends that must not hold the controller across the network call.
    pub async fn begin_submit(&mut self) -> Result<AnalysisRequest> {
        if self.state != WorkflowState::Preview {
            return Err(self.reject("submit"));
        }
        if self.images.is_empty() {
            return Err(LensError::EmptyCollection);
        }

        let request = RequestBuilder::build(&self.images, self.prompt_override.as_deref()).await?;
        self.transition(WorkflowState::Analyzing);
        Ok(request)
    }

    /// Record the transport outcome of the in-flight request
    pub fn finish_submit(
        &mut self,
        outcome: std::result::Result<String, TransportFailure>,
    ) -> Result<&WorkflowState> {
        if self.state != WorkflowState::Analyzing {
            return Err(self.reject("finish_submit"));
        }

        let next = match outcome {
            Ok(raw) => {
                let result = ResponseParser::parse(&raw);
                info!("Analysis complete: {} reference(s)", result.references.len());
                WorkflowState::Results(result)
            }
            Err(failure) => {
                let classified = ErrorClassifier::classify(&failure);
                warn!("Analysis failed ({}): {}", classified.category, failure);
                WorkflowState::Error(classified)
            }
        };
        self.transition(next);
        Ok(&self.state)
    }

    /// Build, dispatch and settle one analysis request
    pub async fn submit(&mut self) -> Result<&WorkflowState> {
        let request = self.begin_submit().await?;
        let outcome = self.transport.send(&request).await;
        self.finish_submit(outcome)
    }

    /// Go back from `Error` to editing the same images
    pub fn retry_edit(&mut self) -> Result<()> {
        if !matches!(self.state, WorkflowState::Error(_)) {
            return Err(self.reject("retry_edit"));
        }
        self.transition(WorkflowState::Preview);
        Ok(())
    }

    /// Discard the session. Not allowed while a request is in flight.
    pub fn reset(&mut self) -> Result<()> {
        if self.state == WorkflowState::Analyzing {
            return Err(self.reject("reset"));
        }
        self.images.clear();
        if self.state != WorkflowState::Idle {
            self.transition(WorkflowState::Idle);
        }
        Ok(())
    }
}
