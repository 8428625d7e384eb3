//! Context resolution
//!
//! Produces a usable [`ResolvedContext`] for the configured credential,
//! discovering unknowns by actively probing the provider when the
//! credential is a private integration token and no tenant id is
//! otherwise available.
//!
//! Tenant id priority (first match wins): explicit caller parameter,
//! configured environment value, JWT claim, probe discovery (PIT only),
//! configured last-resort fallback. The fallback branch is disabled
//! entirely unless a fallback id is configured.
//!
//! Whatever resolution produces — full success or partial — is cached
//! under the credential for a fixed TTL, bounding the probe sweep to
//! once per window per credential.

use leadbridge_common::testing::{Clock, SystemClock};
use leadbridge_domain::{CrmConfig, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::http::HttpClient;

use super::auth::{candidates_for, AuthCandidate};
use super::cache::ContextCache;
use super::context::{normalize_api_base, ResolvedContext, SharedContext, TenantSource};
use super::credentials::{classify, CredentialProfile, TokenKind};
use super::dispatcher::API_VERSION;
use super::phrases::ResponseClassifier;

/// Production provider hosts, probed in order.
const PRODUCTION_BASE_URLS: &[&str] =
    &["https://services.leadconnectorhq.com", "https://rest.gohighlevel.com"];

/// Staging hosts used when the sandbox flag is set.
const SANDBOX_BASE_URLS: &[&str] = &[
    "https://services.staging.leadconnectorhq.com",
    "https://rest.staging.gohighlevel.com",
];

/// Identity endpoints that can reveal the tenant id, probed in order.
const WHO_AM_I_PATHS: &[&str] = &["/users/me", "/locations/", "/me"];

/// Resolves and caches dispatch contexts for the configured credential.
pub struct ContextResolver<C: Clock = SystemClock> {
    config: CrmConfig,
    profile: CredentialProfile,
    cache: ContextCache<C>,
    classifier: ResponseClassifier,
    http: HttpClient,
}

impl ContextResolver<SystemClock> {
    /// Resolver with its own cache and the default phrase sets.
    pub fn new(config: CrmConfig) -> Result<Self> {
        Self::with_components(config, ContextCache::new(), ResponseClassifier::default())
    }
}

impl<C: Clock> ContextResolver<C> {
    /// Resolver over an injected cache and classifier (tests swap in a
    /// mock-clock cache and fixture phrases here).
    pub fn with_components(
        config: CrmConfig,
        cache: ContextCache<C>,
        classifier: ResponseClassifier,
    ) -> Result<Self> {
        // Single attempt per probe: the sweep is combinatorial, so
        // retries multiply; the per-request timeout bounds each leg.
        let http =
            HttpClient::builder().timeout(config.timeout()).max_attempts(1).build()?;
        let profile = classify(&config.api_key);

        Ok(Self { config, profile, cache, classifier, http })
    }

    /// The live cached context, if any, without triggering resolution.
    #[must_use]
    pub fn cached(&self) -> Option<SharedContext> {
        self.cache.get(&self.config.api_key)
    }

    /// Resolve a context for the configured credential, consulting the
    /// cache first. Always yields a context; a missing tenant id is a
    /// valid (partial) outcome the operations must handle.
    pub async fn resolve(&self, explicit_tenant: Option<&str>) -> SharedContext {
        if let Some(cached) = self.cache.get(&self.config.api_key) {
            debug!(token = %self.profile.preview, "context cache hit");
            return cached;
        }

        let context = self.resolve_uncached(explicit_tenant).await;
        let shared = context.into_shared();
        self.cache.insert(&self.config.api_key, shared.clone());
        shared
    }

    async fn resolve_uncached(&self, explicit_tenant: Option<&str>) -> ResolvedContext {
        let candidates = candidates_for(&self.config.api_key, self.profile.kind);
        let bases = self.base_candidates();

        // Static sources first; probing is the expensive last resort.
        let static_tenant = self.static_tenant(explicit_tenant);

        let mut context = if static_tenant.is_none() && self.profile.kind == TokenKind::Pit {
            self.probe(&bases, &candidates).await
        } else {
            self.default_context(&bases, &candidates)
        };

        if let Some((tenant, source)) = static_tenant {
            context.set_tenant(tenant, source);
        }

        if context.tenant_id.is_none() {
            if let Some(fallback) = &self.config.fallback_location_id {
                warn!(token = %self.profile.preview, "using configured fallback location id");
                context.note(
                    "warning: fallback location id in use; configure the real tenant id",
                );
                context.set_tenant(fallback.clone(), TenantSource::Fallback);
            }
        }

        info!(
            token = %self.profile.preview,
            base = %context.api_base,
            tenant = context.tenant_id.as_deref().unwrap_or("<none>"),
            "context resolved"
        );
        context
    }

    /// Tenant from the non-probing priority sources.
    fn static_tenant(&self, explicit: Option<&str>) -> Option<(String, TenantSource)> {
        if let Some(tenant) = explicit {
            return Some((tenant.to_string(), TenantSource::Explicit));
        }
        if let Some(tenant) = &self.config.location_id {
            return Some((tenant.clone(), TenantSource::Environment));
        }
        self.profile
            .tenant_hint
            .clone()
            .map(|tenant| (tenant, TenantSource::TokenClaim))
    }

    /// Candidate base URLs in probe order. A configured override
    /// replaces the defaults: a deployment that pins its base URL does
    /// not want traffic against other hosts.
    fn base_candidates(&self) -> Vec<String> {
        if let Some(base) = &self.config.base_url {
            return vec![base.clone()];
        }
        let defaults =
            if self.config.sandbox { SANDBOX_BASE_URLS } else { PRODUCTION_BASE_URLS };
        defaults.iter().map(|b| (*b).to_string()).collect()
    }

    /// Context for the first base/auth pairing, used when no probing
    /// happened or nothing matched at all.
    fn default_context(&self, bases: &[String], candidates: &[AuthCandidate]) -> ResolvedContext {
        let base = bases.first().cloned().unwrap_or_else(|| PRODUCTION_BASE_URLS[0].to_string());
        let api_base = normalize_api_base(&base);
        let primary = candidates[0].clone();
        ResolvedContext::new(
            base,
            api_base,
            primary,
            candidates.to_vec(),
            self.profile.kind,
            self.profile.preview.clone(),
        )
    }

    /// Walk the base × auth × path product until a combination yields a
    /// tenant id. Scope-limited rejections are retained as the best
    /// partial answer; everything else just adds a trace line.
    async fn probe(&self, bases: &[String], candidates: &[AuthCandidate]) -> ResolvedContext {
        let mut trace: Vec<String> = Vec::new();
        let mut partial: Option<(String, AuthCandidate)> = None;

        for base in bases {
            let api_base = normalize_api_base(base);

            for candidate in candidates {
                for path in WHO_AM_I_PATHS {
                    let url = format!("{api_base}{path}");

                    let outcome = self.probe_once(&url, candidate).await;
                    let (status, body) = match outcome {
                        Ok(pair) => pair,
                        Err(err) => {
                            trace.push(format!("probe GET {url} [{}]: {err}", candidate.label));
                            continue;
                        }
                    };

                    if status.is_success() {
                        match serde_json::from_str::<Value>(&body)
                            .ok()
                            .as_ref()
                            .and_then(extract_location_id)
                        {
                            Some(tenant) => {
                                trace.push(format!(
                                    "probe GET {url} [{}]: {status} with location id",
                                    candidate.label
                                ));
                                let mut context = ResolvedContext::new(
                                    base.clone(),
                                    api_base.clone(),
                                    candidate.clone(),
                                    candidates.to_vec(),
                                    self.profile.kind,
                                    self.profile.preview.clone(),
                                );
                                context.trace = trace;
                                context.set_tenant(tenant, TenantSource::Discovered);
                                return context;
                            }
                            None => {
                                trace.push(format!(
                                    "probe GET {url} [{}]: {status} but no location id in body",
                                    candidate.label
                                ));
                            }
                        }
                    } else if self.classifier.is_scope_limited(status, &body) {
                        trace.push(format!(
                            "probe GET {url} [{}]: {status} scope-limited; auth accepted",
                            candidate.label
                        ));
                        if partial.is_none() {
                            partial = Some((base.clone(), candidate.clone()));
                        }
                    } else {
                        trace.push(format!(
                            "probe GET {url} [{}]: {status}",
                            candidate.label
                        ));
                    }
                }
            }
        }

        // No combination produced a tenant id. Prefer the pairing whose
        // auth was at least accepted; otherwise fall back to the first.
        let mut context = match partial {
            Some((base, candidate)) => {
                let api_base = normalize_api_base(&base);
                ResolvedContext::new(
                    base,
                    api_base,
                    candidate,
                    candidates.to_vec(),
                    self.profile.kind,
                    self.profile.preview.clone(),
                )
            }
            None => self.default_context(bases, candidates),
        };
        context.trace = trace;
        context.note("probe sweep exhausted without discovering a location id");
        context
    }

    async fn probe_once(
        &self,
        url: &str,
        candidate: &AuthCandidate,
    ) -> Result<(reqwest::StatusCode, String)> {
        let request = self
            .http
            .request(Method::GET, url)
            .header("Accept", "application/json")
            .header("Version", API_VERSION)
            .header(candidate.header, candidate.value.as_str());

        let response = self.http.send(request).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

/// Pull a tenant (location) id out of a who-am-I response body. The
/// provider's identity endpoints differ in nesting, so several known
/// spellings are tried, including one level under wrapper keys.
fn extract_location_id(value: &Value) -> Option<String> {
    let map = value.as_object()?;

    for key in ["locationId", "location_id"] {
        if let Some(id) = map.get(key).and_then(Value::as_str) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }

    if let Some(location) = map.get("location") {
        if let Some(id) = location.as_str() {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
        if let Some(id) = location.get("id").and_then(Value::as_str) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }

    if let Some(first) = map.get("locations").and_then(Value::as_array).and_then(|a| a.first()) {
        if let Some(id) = first.as_str() {
            return Some(id.to_string());
        }
        if let Some(id) = first.get("id").and_then(Value::as_str) {
            return Some(id.to_string());
        }
    }

    // Identity payloads are often wrapped one level deep.
    for key in ["data", "user", "me"] {
        if let Some(inner) = map.get(key) {
            if let Some(id) = extract_location_id(inner) {
                return Some(id);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use leadbridge_common::testing::MockClock;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::cache::DEFAULT_CONTEXT_TTL;
    use super::*;

    fn config_for(server: &MockServer, api_key: &str) -> CrmConfig {
        let mut config = CrmConfig::new(api_key);
        config.base_url = Some(server.uri());
        config.timeout_secs = 5;
        config
    }

    fn resolver_for(server: &MockServer, api_key: &str) -> ContextResolver<MockClock> {
        ContextResolver::with_components(
            config_for(server, api_key),
            ContextCache::with_clock(DEFAULT_CONTEXT_TTL, MockClock::new()),
            ResponseClassifier::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn probe_discovers_location_id_and_stops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .and(header("Authorization", "Bearer pit-abc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"location": {"id": "loc_1"}})),
            )
            .mount(&server)
            .await;

        let resolver = resolver_for(&server, "pit-abc");
        let context = resolver.resolve(None).await;
        let ctx = context.read().unwrap();

        assert_eq!(ctx.tenant_id.as_deref(), Some("loc_1"));
        assert_eq!(ctx.tenant_source, Some(TenantSource::Discovered));
        // First combination matched, so exactly one probe went out.
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_resolve_within_ttl_issues_no_network_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"locationId": "loc_1"})),
            )
            .mount(&server)
            .await;

        let resolver = resolver_for(&server, "pit-abc");
        resolver.resolve(None).await;
        let count_after_first = server.received_requests().await.unwrap().len();

        resolver.resolve(None).await;
        assert_eq!(server.received_requests().await.unwrap().len(), count_after_first);
    }

    #[tokio::test]
    async fn cache_expiry_forces_a_fresh_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"locationId": "loc_1"})),
            )
            .mount(&server)
            .await;

        let clock = MockClock::new();
        let resolver = ContextResolver::with_components(
            config_for(&server, "pit-abc"),
            ContextCache::with_clock(DEFAULT_CONTEXT_TTL, clock.clone()),
            ResponseClassifier::default(),
        )
        .unwrap();

        resolver.resolve(None).await;
        let count_after_first = server.received_requests().await.unwrap().len();

        clock.advance(DEFAULT_CONTEXT_TTL + Duration::from_secs(1));
        resolver.resolve(None).await;

        assert!(server.received_requests().await.unwrap().len() > count_after_first);
    }

    #[tokio::test]
    async fn scope_limited_rejection_is_kept_as_partial() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                r#"{"message":"This token does not have access to this scope"}"#,
            ))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server, "pit-abc");
        let context = resolver.resolve(None).await;
        let ctx = context.read().unwrap();

        assert!(ctx.tenant_id.is_none());
        assert!(ctx.trace.iter().any(|line| line.contains("scope-limited")));
        // Whole product swept: 3 auth schemes x 3 paths on the one base.
        assert_eq!(server.received_requests().await.unwrap().len(), 9);
    }

    #[tokio::test]
    async fn twox_without_location_id_is_not_a_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "user_1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/locations/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"locations": [{"id": "loc_2"}]})),
            )
            .mount(&server)
            .await;

        let resolver = resolver_for(&server, "pit-abc");
        let context = resolver.resolve(None).await;

        // /users/me had no tenant id, so the sweep had to continue to
        // the next path before succeeding.
        assert_eq!(context.read().unwrap().tenant_id.as_deref(), Some("loc_2"));
    }

    #[tokio::test]
    async fn explicit_tenant_skips_probing_entirely() {
        let server = MockServer::start().await;
        let resolver = resolver_for(&server, "pit-abc");

        let context = resolver.resolve(Some("loc_explicit")).await;
        let ctx = context.read().unwrap();

        assert_eq!(ctx.tenant_id.as_deref(), Some("loc_explicit"));
        assert_eq!(ctx.tenant_source, Some(TenantSource::Explicit));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn configured_location_outranks_jwt_claim() {
        let server = MockServer::start().await;
        let mut config = config_for(&server, "pit-abc");
        config.location_id = Some("loc_env".to_string());

        let resolver = ContextResolver::with_components(
            config,
            ContextCache::with_clock(DEFAULT_CONTEXT_TTL, MockClock::new()),
            ResponseClassifier::default(),
        )
        .unwrap();

        let context = resolver.resolve(None).await;
        assert_eq!(context.read().unwrap().tenant_source, Some(TenantSource::Environment));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fallback_location_is_off_unless_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server, "pit-abc");
        let context = resolver.resolve(None).await;

        assert!(context.read().unwrap().tenant_id.is_none());
    }

    #[tokio::test]
    async fn fallback_location_applies_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let mut config = config_for(&server, "pit-abc");
        config.fallback_location_id = Some("loc_last_resort".to_string());
        let resolver = ContextResolver::with_components(
            config,
            ContextCache::with_clock(DEFAULT_CONTEXT_TTL, MockClock::new()),
            ResponseClassifier::default(),
        )
        .unwrap();

        let context = resolver.resolve(None).await;
        let ctx = context.read().unwrap();

        assert_eq!(ctx.tenant_id.as_deref(), Some("loc_last_resort"));
        assert_eq!(ctx.tenant_source, Some(TenantSource::Fallback));
        assert!(ctx.trace.iter().any(|line| line.contains("warning")));
    }

    #[test]
    fn location_id_extraction_handles_known_nestings() {
        let cases = [
            (json!({"locationId": "a"}), Some("a")),
            (json!({"location_id": "b"}), Some("b")),
            (json!({"location": "c"}), Some("c")),
            (json!({"location": {"id": "d"}}), Some("d")),
            (json!({"locations": ["e"]}), Some("e")),
            (json!({"locations": [{"id": "f"}]}), Some("f")),
            (json!({"data": {"location": {"id": "g"}}}), Some("g")),
            (json!({"user": {"locationId": "h"}}), Some("h")),
            (json!({"id": "user_1"}), None),
            (json!("loc_raw"), None),
        ];

        for (body, expected) in cases {
            assert_eq!(extract_location_id(&body).as_deref(), expected, "body: {body}");
        }
    }
}
