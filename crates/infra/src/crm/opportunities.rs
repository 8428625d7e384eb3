//! Invoice → opportunity sync and payment updates
//!
//! Invoices are mirrored into the provider's pipeline as opportunities.
//! As with messaging, the accepted endpoint/payload shape varies by
//! account age, so creation runs through a fallback chain.

use leadbridge_domain::{InvoiceRecord, Result};
use serde_json::{json, Value};

use super::context::SharedContext;
use super::dispatcher::RequestDispatcher;
use super::fallback::{run_chain, ChainOutcome, EndpointCandidate};

/// Tag applied to a contact when a payment lands.
pub const PAYMENT_TAG: &str = "payment-received";

/// Build the opportunity-creation candidate chain.
#[must_use]
pub fn invoice_candidates(
    api_base: &str,
    tenant: &str,
    invoice: &InvoiceRecord,
    contact_id: &str,
) -> Vec<EndpointCandidate> {
    let name = opportunity_name(invoice);

    vec![
        EndpointCandidate::post(
            "opportunities",
            format!("{api_base}/opportunities/"),
            json!({
                "name": name,
                "monetaryValue": invoice.amount(),
                "status": "open",
                "contactId": contact_id,
                "locationId": tenant,
            }),
        ),
        EndpointCandidate::post(
            "opportunities-wrapped",
            format!("{api_base}/opportunities/"),
            json!({
                "opportunity": {
                    "name": name,
                    "monetary_value": invoice.amount(),
                    "status": "open",
                    "contact_id": contact_id,
                    "location_id": tenant,
                }
            }),
        ),
        EndpointCandidate::post(
            "invoices",
            format!("{api_base}/invoices/"),
            json!({
                "invoiceNumber": invoice.id,
                "amount": invoice.amount(),
                "currency": invoice.currency,
                "contactId": contact_id,
                "locationId": tenant,
            }),
        ),
    ]
}

/// Create the opportunity and surface its id, when the provider
/// reported one.
pub async fn create(
    dispatcher: &RequestDispatcher,
    context: &SharedContext,
    tenant: &str,
    invoice: &InvoiceRecord,
    contact_id: &str,
) -> Result<Option<String>> {
    let api_base = context.read().unwrap_or_else(|e| e.into_inner()).api_base.clone();
    let candidates = invoice_candidates(&api_base, tenant, invoice, contact_id);
    let outcome: ChainOutcome = run_chain(dispatcher, context, "sync-invoice", candidates).await?;
    Ok(extract_opportunity_id(&outcome.value))
}

/// Custom fields recorded on a contact when its invoice is paid.
#[must_use]
pub fn payment_fields(invoice: &InvoiceRecord) -> Vec<(String, String)> {
    let mut fields = vec![
        ("invoiceId".to_string(), invoice.id.clone()),
        ("paymentStatus".to_string(), "paid".to_string()),
        ("paymentAmount".to_string(), format!("{:.2}", invoice.amount())),
        ("paymentCurrency".to_string(), invoice.currency.clone()),
    ];
    if let Some(issued_at) = invoice.issued_at {
        fields.push(("invoiceDate".to_string(), issued_at.to_rfc3339()));
    }
    fields
}

fn opportunity_name(invoice: &InvoiceRecord) -> String {
    invoice
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("Invoice {}", invoice.id))
}

fn extract_opportunity_id(value: &Value) -> Option<String> {
    for candidate in [
        value.get("opportunity").and_then(|o| o.get("id")),
        value.get("opportunityId"),
        value.get("id"),
        value.get("data").and_then(|d| d.get("id")),
    ] {
        if let Some(id) = candidate.and_then(Value::as_str) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
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

    fn invoice() -> InvoiceRecord {
        InvoiceRecord {
            id: "inv_42".to_string(),
            customer_email: "a@b.com".to_string(),
            customer_name: None,
            amount_cents: 250_00,
            currency: "USD".to_string(),
            description: None,
            issued_at: None,
        }
    }

    #[test]
    fn candidate_order_is_modern_then_wrapped_then_legacy() {
        let candidates = invoice_candidates("https://api", "loc_1", &invoice(), "c_1");

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].label, "opportunities");
        assert_eq!(candidates[0].body.as_ref().unwrap()["monetaryValue"], 250.0);
        assert_eq!(
            candidates[1].body.as_ref().unwrap()["opportunity"]["contact_id"],
            "c_1"
        );
        assert_eq!(candidates[2].body.as_ref().unwrap()["invoiceNumber"], "inv_42");
    }

    #[test]
    fn opportunity_name_prefers_the_description() {
        let mut inv = invoice();
        assert_eq!(opportunity_name(&inv), "Invoice inv_42");

        inv.description = Some("Annual retainer".to_string());
        assert_eq!(opportunity_name(&inv), "Annual retainer");
    }

    #[tokio::test]
    async fn create_falls_back_across_shapes() {
        let server = MockServer::start().await;
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls_clone = calls.clone();
        Mock::given(wm_method("POST"))
            .and(path("/opportunities/"))
            .respond_with(move |req: &wiremock::Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap();
                calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                // This account only accepts the wrapped legacy shape.
                if body.get("opportunity").is_some() {
                    ResponseTemplate::new(201)
                        .set_body_json(json!({"opportunity": {"id": "opp_7"}}))
                } else {
                    ResponseTemplate::new(422).set_body_string("pipeline required")
                }
            })
            .mount(&server)
            .await;

        let (dispatcher, context) = setup(&server.uri());
        let id = create(&dispatcher, &context, "loc_1", &invoice(), "c_1").await.unwrap();

        assert_eq!(id.as_deref(), Some("opp_7"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn payment_fields_capture_invoice_identity_and_amount() {
        let fields = payment_fields(&invoice());
        let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();

        assert!(keys.contains(&"invoiceId"));
        assert!(keys.contains(&"paymentStatus"));
        assert!(fields.iter().any(|(k, v)| k == "paymentAmount" && v == "250.00"));
    }
}
