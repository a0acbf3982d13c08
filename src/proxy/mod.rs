// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! HTTP boundary to the inference proxy

pub mod schema;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::classify::TransportFailure;
use crate::config::ProxyConfig;
use crate::request::AnalysisRequest;
use crate::Result;
use schema::GenerateContentRequest;

/// Header carrying the API key, when one is configured
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Something that can deliver an [`AnalysisRequest`] and return the raw
/// response body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &AnalysisRequest) -> std::result::Result<String, TransportFailure>;
}

/// reqwest-backed client for the inference proxy
pub struct ProxyClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl ProxyClient {
    /// Create a client from explicit proxy configuration
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key()?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for ProxyClient {
    async fn send(&self, request: &AnalysisRequest) -> std::result::Result<String, TransportFailure> {
        let body = GenerateContentRequest::from(request);

        debug!(
            "Sending analysis request to proxy: images={}, schema={}",
            request.image_count(),
            schema::SCHEMA_VERSION
        );

        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Proxy request did not complete: {}", e);
            if e.is_builder() {
                TransportFailure::Other(e.to_string())
            } else {
                TransportFailure::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            TransportFailure::Other(format!("Failed to read proxy response: {}", e))
        })?;

        if !status.is_success() {
            warn!("Proxy returned status {}", status);
            return Err(TransportFailure::Status {
                code: status.as_u16(),
                body: text,
            });
        }

        debug!("Proxy response received: {} bytes", text.len());
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Transport replaying canned outcomes, optionally waiting on a gate
    /// before answering
    pub struct ScriptedTransport {
        outcomes: Mutex<VecDeque<std::result::Result<String, TransportFailure>>>,
        sent: Mutex<Vec<AnalysisRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedTransport {
        pub fn new(outcomes: Vec<std::result::Result<String, TransportFailure>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                sent: Mutex::new(Vec::new()),
                gate: None,
            })
        }

        pub fn gated(
            outcomes: Vec<std::result::Result<String, TransportFailure>>,
        ) -> (Arc<Self>, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            let transport = Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                sent: Mutex::new(Vec::new()),
                gate: Some(Arc::clone(&gate)),
            });
            (transport, gate)
        }

        pub fn sent(&self) -> Vec<AnalysisRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            request: &AnalysisRequest,
        ) -> std::result::Result<String, TransportFailure> {
            self.sent.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportFailure::Other("no scripted outcome".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Part, Tools, SYSTEM_INSTRUCTION};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    fn sample_request() -> AnalysisRequest {
        AnalysisRequest {
            parts: vec![
                Part::Image {
                    encoded_content: "AAEC".to_string(),
                    mime_type: "image/jpeg".to_string(),
                },
                Part::Text("Analyse".to_string()),
            ],
            system_instruction: SYSTEM_INSTRUCTION,
            tools: Tools { web_search_grounding: true },
            temperature: 0.4,
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn client_for(url: String) -> ProxyClient {
        ProxyClient::new(&ProxyConfig {
            url,
            timeout_secs: 5,
            api_key_env: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_success_returns_body_and_posts_wire_shape() {
        let received = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&received);
        let router = Router::new().route(
            "/",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock().unwrap() = Some(body);
                    r#"{"candidates":[{"content":{"parts":[{"text":"Bericht"}]}}]}"#
                }
            }),
        );
        let client = client_for(serve(router).await);

        let body = client.send(&sample_request()).await.unwrap();
        assert!(body.contains("Bericht"));

        let posted = received.lock().unwrap().take().unwrap();
        assert_eq!(posted["contents"][0]["role"], "user");
        assert_eq!(posted["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(posted["contents"][0]["parts"][1]["text"], "Analyse");
        assert!(posted["tools"][0]["googleSearch"].is_object());
    }

    #[tokio::test]
    async fn test_error_status_keeps_code_and_body() {
        let router = Router::new().route(
            "/",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exhausted") }),
        );
        let client = client_for(serve(router).await);

        let failure = client.send(&sample_request()).await.unwrap_err();
        assert_eq!(
            failure,
            TransportFailure::Status {
                code: 429,
                body: "quota exhausted".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_network_failure() {
        // Reserve a port, then free it so nothing listens there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}/", addr));
        let failure = client.send(&sample_request()).await.unwrap_err();
        assert!(matches!(failure, TransportFailure::Network(_)));
    }
}
