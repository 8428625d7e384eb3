//! Operation fallback chains
//!
//! The set of endpoints and payload shapes a provider account actually
//! accepts varies by entitlement (older API shapes vs newer ones,
//! different custom-field encodings). Each logical operation is an
//! ordered list of [`EndpointCandidate`]s driven through the
//! dispatcher: first 2xx whose body parses as JSON wins; everything
//! else accumulates into one aggregate error.

use leadbridge_domain::{LeadBridgeError, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use super::context::SharedContext;
use super::dispatcher::{DispatchResult, RequestDispatcher};

/// Longest slice of a response body carried into an aggregate error.
const BODY_SNIPPET_LEN: usize = 200;

/// One endpoint + payload shape for a logical action.
#[derive(Debug, Clone)]
pub struct EndpointCandidate {
    /// Short name for traces and aggregate errors.
    pub label: &'static str,
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl EndpointCandidate {
    pub fn post(label: &'static str, url: impl Into<String>, body: Value) -> Self {
        Self { label, method: Method::POST, url: url.into(), body: Some(body) }
    }

    pub fn put(label: &'static str, url: impl Into<String>, body: Value) -> Self {
        Self { label, method: Method::PUT, url: url.into(), body: Some(body) }
    }

    pub fn get(label: &'static str, url: impl Into<String>) -> Self {
        Self { label, method: Method::GET, url: url.into(), body: None }
    }
}

/// A successful chain step: the parsed JSON plus the raw dispatch data.
#[derive(Debug)]
pub struct ChainOutcome {
    pub value: Value,
    pub result: DispatchResult,
    pub label: &'static str,
}

/// Drive candidates in declaration order until one succeeds.
///
/// A success is a 2xx response whose body parses as JSON — downstream
/// code needs structured data (ids, statuses), so a 2xx with an
/// unparseable body is a candidate failure like any other.
///
/// # Errors
/// `LeadBridgeError::Provider` naming every attempted endpoint with its
/// status and a body snippet when the whole chain is exhausted, plus
/// whatever the dispatcher itself surfaces (transport failures, the
/// empty-candidate configuration error).
pub async fn run_chain(
    dispatcher: &RequestDispatcher,
    context: &SharedContext,
    operation: &str,
    candidates: Vec<EndpointCandidate>,
) -> Result<ChainOutcome> {
    let mut attempts: Vec<String> = Vec::new();

    for candidate in candidates {
        let result = dispatcher
            .dispatch(context, candidate.method.clone(), &candidate.url, candidate.body.as_ref(), &[])
            .await?;

        if result.status.is_success() {
            match result.json() {
                Some(value) => {
                    debug!(operation, endpoint = candidate.label, "fallback chain succeeded");
                    return Ok(ChainOutcome { value, result, label: candidate.label });
                }
                None => {
                    attempts.push(format!(
                        "{} {} -> {} (unparseable body: {})",
                        candidate.label,
                        candidate.url,
                        result.status,
                        snippet(&result.body)
                    ));
                }
            }
        } else {
            attempts.push(format!(
                "{} {} -> {}: {}",
                candidate.label,
                candidate.url,
                result.status,
                snippet(&result.body)
            ));
        }
    }

    Err(LeadBridgeError::Provider(format!(
        "all endpoints failed for {operation}: {}",
        attempts.join("; ")
    )))
}

fn snippet(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method as wm_method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::auth::candidates_for;
    use super::super::context::ResolvedContext;
    use super::super::credentials::TokenKind;
    use super::super::phrases::ResponseClassifier;
    use super::*;
    use crate::http::HttpClient;

    fn setup(server_uri: &str) -> (RequestDispatcher, SharedContext) {
        let candidates = candidates_for("pit-abc", TokenKind::Pit);
        let context = ResolvedContext::new(
            server_uri.to_string(),
            server_uri.to_string(),
            candidates[0].clone(),
            candidates,
            TokenKind::Pit,
            "***",
        )
        .into_shared();
        let http = HttpClient::builder().max_attempts(1).build().expect("http client");
        (RequestDispatcher::new(http, ResponseClassifier::default()), context)
    }

    #[tokio::test]
    async fn later_candidate_wins_after_404() {
        let server = MockServer::start().await;
        Mock::given(wm_method("POST"))
            .and(path("/v2/send"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such route"))
            .mount(&server)
            .await;
        Mock::given(wm_method("POST"))
            .and(path("/v1/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
            .mount(&server)
            .await;

        let (dispatcher, context) = setup(&server.uri());
        let outcome = run_chain(
            &dispatcher,
            &context,
            "send-message",
            vec![
                EndpointCandidate::post("v2", format!("{}/v2/send", server.uri()), json!({})),
                EndpointCandidate::post("v1", format!("{}/v1/send", server.uri()), json!({})),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcome.label, "v1");
        assert_eq!(outcome.value["id"], "msg_1");
    }

    #[tokio::test]
    async fn twox_with_non_json_body_is_a_candidate_failure() {
        let server = MockServer::start().await;
        Mock::given(wm_method("POST"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;
        Mock::given(wm_method("POST"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
            .mount(&server)
            .await;

        let (dispatcher, context) = setup(&server.uri());
        let outcome = run_chain(
            &dispatcher,
            &context,
            "send-message",
            vec![
                EndpointCandidate::post("html", format!("{}/a", server.uri()), json!({})),
                EndpointCandidate::post("json", format!("{}/b", server.uri()), json!({})),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcome.label, "json");
    }

    #[tokio::test]
    async fn exhaustion_aggregates_every_attempt() {
        let server = MockServer::start().await;
        Mock::given(wm_method("POST"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;
        Mock::given(wm_method("POST"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad shape"))
            .mount(&server)
            .await;

        let (dispatcher, context) = setup(&server.uri());
        let err = run_chain(
            &dispatcher,
            &context,
            "sync-invoice",
            vec![
                EndpointCandidate::post("alpha", format!("{}/a", server.uri()), json!({})),
                EndpointCandidate::post("beta", format!("{}/b", server.uri()), json!({})),
            ],
        )
        .await
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("sync-invoice"));
        assert!(message.contains("alpha"));
        assert!(message.contains("404"));
        assert!(message.contains("beta"));
        assert!(message.contains("bad shape"));
    }

    #[test]
    fn snippets_are_bounded() {
        let long = "x".repeat(500);
        assert_eq!(snippet(&long).len(), BODY_SNIPPET_LEN);
        assert_eq!(snippet("short"), "short");
    }
}
