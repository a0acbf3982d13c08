// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Classification of transport failures into operator-facing categories

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Raw outcome of a failed proxy call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The proxy answered with a non-2xx status
    Status { code: u16, body: String },
    /// No response reached us (connect, DNS, timeout)
    Network(String),
    /// Anything else, e.g. the response body could not be read
    Other(String),
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::Status { code, body } => {
                write!(f, "Proxy request failed: {} - {}", code, body)
            }
            TransportFailure::Network(msg) | TransportFailure::Other(msg) => f.write_str(msg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    AccessDenied,
    ConnectivityError,
    InvalidRequest,
    Throttled,
    UpstreamFailure,
    UpstreamUnavailable,
    Unclassified,
}

impl FailureCategory {
    /// Fixed explanation shown to the operator. `Unclassified` has none;
    /// the original message is shown instead.
    pub fn explanation(&self) -> Option<&'static str> {
        match self {
            FailureCategory::AccessDenied => Some(
                "API-Zugriff verweigert (403). Bitte prüfen Sie die Einschränkungen \
                 des API-Schlüssels (Referrer).",
            ),
            FailureCategory::ConnectivityError => {
                Some("Netzwerkfehler. Bitte prüfen Sie Ihre Internetverbindung.")
            }
            FailureCategory::InvalidRequest => Some(
                "Ungültige Anfrage (400). Bitte prüfen Sie die ausgewählten Bilder.",
            ),
            FailureCategory::Throttled => Some(
                "Ratenlimit überschritten (429). Bitte versuchen Sie es später erneut.",
            ),
            FailureCategory::UpstreamFailure => Some(
                "Interner Serverfehler (500). Der Analysedienst hat ein Problem.",
            ),
            FailureCategory::UpstreamUnavailable => Some(
                "Dienst nicht verfügbar (503). Der Analysedienst ist derzeit nicht erreichbar.",
            ),
            FailureCategory::Unclassified => None,
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureCategory::AccessDenied => "access_denied",
            FailureCategory::ConnectivityError => "connectivity_error",
            FailureCategory::InvalidRequest => "invalid_request",
            FailureCategory::Throttled => "throttled",
            FailureCategory::UpstreamFailure => "upstream_failure",
            FailureCategory::UpstreamUnavailable => "upstream_unavailable",
            FailureCategory::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

/// A failure normalised into exactly one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedFailure {
    pub category: FailureCategory,
    /// Operator-facing explanation
    pub message: String,
    /// HTTP status, when the proxy answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Raw response body or transport message, kept for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Pure, total mapping from [`TransportFailure`] to [`ClassifiedFailure`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(failure: &TransportFailure) -> ClassifiedFailure {
        let (category, status, detail) = match failure {
            TransportFailure::Status { code, body } => {
                let category = match code {
                    400 => FailureCategory::InvalidRequest,
                    403 => FailureCategory::AccessDenied,
                    429 => FailureCategory::Throttled,
                    500 => FailureCategory::UpstreamFailure,
                    503 => FailureCategory::UpstreamUnavailable,
                    _ => FailureCategory::Unclassified,
                };
                let detail = (!body.is_empty()).then(|| body.clone());
                (category, Some(*code), detail)
            }
            TransportFailure::Network(msg) => {
                (FailureCategory::ConnectivityError, None, Some(msg.clone()))
            }
            TransportFailure::Other(msg) => (FailureCategory::Unclassified, None, Some(msg.clone())),
        };

        let message = category
            .explanation()
            .map(str::to_string)
            .unwrap_or_else(|| failure.to_string());

        debug!("Classified transport failure as {}", category);

        ClassifiedFailure {
            category,
            message,
            status,
            detail,
        }
    }
}
