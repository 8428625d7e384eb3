//! Request dispatch with auth rotation
//!
//! Executes exactly one logical HTTP request against a resolved
//! context, tolerating a stale primary auth scheme: a 401 whose body
//! matches the invalid-token phrase set rejects the current candidate
//! and the next one is tried. Any other response is final, and if a
//! non-primary candidate produced it, that candidate is promoted in
//! the shared context so future operations start from it.

use leadbridge_domain::{LeadBridgeError, Result};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::http::HttpClient;

use super::auth::AuthCandidate;
use super::context::SharedContext;
use super::phrases::ResponseClassifier;

/// Provider API version header value attached to every request.
pub const API_VERSION: &str = "2021-07-28";

/// Outcome of one dispatched request. Ordinary HTTP failures are data,
/// not errors; the caller decides what a given status means.
#[derive(Debug)]
pub struct DispatchResult {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: String,
    /// The auth candidate that produced this response.
    pub candidate: AuthCandidate,
}

impl DispatchResult {
    /// Parse the body as JSON, if it is JSON.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Dispatches requests for a resolved context, rotating auth schemes.
pub struct RequestDispatcher {
    http: HttpClient,
    classifier: ResponseClassifier,
}

impl RequestDispatcher {
    pub fn new(http: HttpClient, classifier: ResponseClassifier) -> Self {
        Self { http, classifier }
    }

    /// Execute one logical request.
    ///
    /// Tries the context's primary candidate, then the alternates in
    /// stored order. Returns the first response not classified as an
    /// invalid-token rejection; if every candidate is rejected, returns
    /// the last rejection (the caller sees an ordinary 401).
    ///
    /// # Errors
    /// - `LeadBridgeError::Config` when the candidate list is empty — a
    ///   programmer/configuration error, not a runtime condition.
    /// - `LeadBridgeError::Network` when the transport itself fails.
    pub async fn dispatch(
        &self,
        context: &SharedContext,
        method: Method,
        url: &str,
        body: Option<&Value>,
        extra_headers: &[(&str, &str)],
    ) -> Result<DispatchResult> {
        let candidates = {
            let ctx = context.read().unwrap_or_else(|e| e.into_inner());
            ctx.attempt_order()
        };

        if candidates.is_empty() {
            return Err(LeadBridgeError::Config(
                "no authentication candidates configured for dispatch".into(),
            ));
        }

        let mut last: Option<DispatchResult> = None;

        for candidate in candidates {
            let mut request = self
                .http
                .request(method.clone(), url)
                .header("Accept", "application/json")
                .header("Version", API_VERSION)
                .header(candidate.header, candidate.value.as_str());

            for (name, value) in extra_headers {
                request = request.header(*name, *value);
            }
            if let Some(json) = body {
                request = request.header("Content-Type", "application/json").json(json);
            }

            let response = self.http.send(request).await?;
            let status = response.status();
            let status_text = status.canonical_reason().unwrap_or("").to_string();
            let headers = response.headers().clone();
            let body_text = response.text().await.unwrap_or_default();

            debug!(%method, url, status = status.as_u16(), auth = candidate.label, "dispatched");

            if self.classifier.is_invalid_token(status, &body_text) {
                warn!(auth = candidate.label, "auth candidate rejected as invalid token");
                {
                    let mut ctx = context.write().unwrap_or_else(|e| e.into_inner());
                    ctx.note(format!(
                        "dispatch {method} {url}: {status} invalid-token under {}; rotating",
                        candidate.label
                    ));
                }
                last = Some(DispatchResult {
                    status,
                    status_text,
                    headers,
                    body: body_text,
                    candidate,
                });
                continue;
            }

            // Final answer for this call. Self-heal the context if a
            // non-primary candidate produced it.
            let mut ctx = context.write().unwrap_or_else(|e| e.into_inner());
            if !ctx.primary().wire_eq(&candidate) {
                info!(auth = candidate.label, "promoting auth candidate to primary");
                ctx.promote(&candidate);
            }
            drop(ctx);

            return Ok(DispatchResult { status, status_text, headers, body: body_text, candidate });
        }

        // Every candidate was rejected; surface the last rejection as
        // the result rather than an error.
        last.ok_or_else(|| {
            LeadBridgeError::Internal("dispatch loop ended without a result".into())
        })
    }
}
