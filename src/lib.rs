// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Museum Lens: curator analysis of artefact photographs
//!
//! One to four photographs of an object are collected and annotated, sent as
//! a single multimodal request to an inference proxy, and turned into a
//! narrative report with web citations. Failures are classified into a fixed
//! set of operator-facing categories.

pub mod classify;
pub mod collection;
pub mod config;
pub mod error;
pub mod proxy;
pub mod report;
pub mod request;
pub mod response;
pub mod web;
pub mod workflow;

pub use config::AppConfig;
pub use error::{LensError, Result};
pub use workflow::{WorkflowController, WorkflowState};
