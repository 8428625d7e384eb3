//! Contact find-or-create and custom-field updates
//!
//! Every contact-scoped action starts by locating the contact by email
//! and creating it when absent. The search-then-create pair is a
//! sequence, not a fallback chain: a failed or empty search simply
//! falls through to create. There is no transactional guarantee
//! against concurrent duplicate creation.
//!
//! Custom-field updates are the provider's least documented surface;
//! four payload encodings are tried in fixed order, with a tag-only
//! minimal update as the final safety net.

use leadbridge_domain::{ContactReceipt, LeadBridgeError, Result};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::context::SharedContext;
use super::dispatcher::RequestDispatcher;
use super::fallback::{run_chain, EndpointCandidate};

/// How custom fields are keyed in an update payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// `{"customFields": [{"name": ..., "value": ...}, ...]}`
    NamedPairs,
    /// `{"customField": {"name": "value", ...}}`
    KeyedObject,
    /// Fields spread directly over the top-level object.
    Flattened,
    /// Top-level spread with lowercased snake_case keys.
    SnakeCase,
}

/// Encodings in the order they are attempted.
pub const FIELD_ENCODINGS: &[FieldEncoding] = &[
    FieldEncoding::NamedPairs,
    FieldEncoding::KeyedObject,
    FieldEncoding::Flattened,
    FieldEncoding::SnakeCase,
];

/// Search for a contact by email, creating it when none exists.
///
/// # Errors
/// `LeadBridgeError::Provider` when the create call fails; search
/// failures are logged and treated as "not found".
pub async fn find_or_create(
    dispatcher: &RequestDispatcher,
    context: &SharedContext,
    tenant: &str,
    email: &str,
    display_name: Option<&str>,
) -> Result<ContactReceipt> {
    if let Some(contact_id) = search(dispatcher, context, tenant, email).await {
        debug!(contact_id, "contact found by email");
        return Ok(ContactReceipt { contact_id, created: false });
    }

    create(dispatcher, context, tenant, email, display_name).await
}

async fn search(
    dispatcher: &RequestDispatcher,
    context: &SharedContext,
    tenant: &str,
    email: &str,
) -> Option<String> {
    let api_base = read_api_base(context);
    let url = format!(
        "{api_base}/contacts/?locationId={}&query={}",
        encode(tenant),
        encode(email)
    );

    let result = match dispatcher
        .dispatch(context, reqwest::Method::GET, &url, None, &[])
        .await
    {
        Ok(result) => result,
        Err(err) => {
            warn!(error = %err, "contact search failed; treating as not found");
            return None;
        }
    };

    if !result.status.is_success() {
        warn!(status = result.status.as_u16(), "contact search rejected; treating as not found");
        return None;
    }

    let body = result.json()?;
    let contacts = body.get("contacts").and_then(Value::as_array)?;
    contacts
        .iter()
        .find(|c| {
            c.get("email")
                .and_then(Value::as_str)
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
        .or_else(|| contacts.first())
        .and_then(|c| c.get("id").and_then(Value::as_str))
        .map(|id| id.to_string())
}

async fn create(
    dispatcher: &RequestDispatcher,
    context: &SharedContext,
    tenant: &str,
    email: &str,
    display_name: Option<&str>,
) -> Result<ContactReceipt> {
    let api_base = read_api_base(context);
    let (first_name, last_name) = split_name(email, display_name);

    let mut body = json!({
        "email": email,
        "firstName": first_name,
        "locationId": tenant,
    });
    if let Some(last) = last_name {
        body["lastName"] = Value::String(last);
    }

    let outcome = run_chain(
        dispatcher,
        context,
        "create-contact",
        vec![EndpointCandidate::post("contacts", format!("{api_base}/contacts/"), body)],
    )
    .await?;

    extract_contact_id(&outcome.value)
        .map(|contact_id| {
            debug!(contact_id, "contact created");
            ContactReceipt { contact_id, created: true }
        })
        .ok_or_else(|| {
            LeadBridgeError::Provider(
                "contact create succeeded but the response carried no contact id".into(),
            )
        })
}

/// Update a contact's custom fields, walking the encoding variants and
/// finally falling back to a tag-only update.
///
/// # Errors
/// `LeadBridgeError::Provider` when every variant, including the
/// tag-only net, was rejected.
pub async fn update_with_custom_fields(
    dispatcher: &RequestDispatcher,
    context: &SharedContext,
    contact_id: &str,
    fields: &[(String, String)],
    tags: &[String],
) -> Result<()> {
    let api_base = read_api_base(context);
    let url = format!("{api_base}/contacts/{contact_id}");

    let mut candidates: Vec<EndpointCandidate> = FIELD_ENCODINGS
        .iter()
        .map(|encoding| {
            EndpointCandidate::put(
                encoding_label(*encoding),
                url.clone(),
                encode_fields(*encoding, fields, tags),
            )
        })
        .collect();
    candidates.push(EndpointCandidate::put("tags-only", url, json!({ "tags": tags })));

    run_chain(dispatcher, context, "update-contact", candidates).await.map(|_| ())
}

fn encoding_label(encoding: FieldEncoding) -> &'static str {
    match encoding {
        FieldEncoding::NamedPairs => "custom-fields-named-pairs",
        FieldEncoding::KeyedObject => "custom-fields-keyed-object",
        FieldEncoding::Flattened => "custom-fields-flattened",
        FieldEncoding::SnakeCase => "custom-fields-snake-case",
    }
}

/// Build one update payload in the requested encoding.
fn encode_fields(encoding: FieldEncoding, fields: &[(String, String)], tags: &[String]) -> Value {
    let mut body = Map::new();

    match encoding {
        FieldEncoding::NamedPairs => {
            let pairs: Vec<Value> =
                fields.iter().map(|(k, v)| json!({"name": k, "value": v})).collect();
            body.insert("customFields".to_string(), Value::Array(pairs));
        }
        FieldEncoding::KeyedObject => {
            let mut object = Map::new();
            for (k, v) in fields {
                object.insert(k.clone(), Value::String(v.clone()));
            }
            body.insert("customField".to_string(), Value::Object(object));
        }
        FieldEncoding::Flattened => {
            for (k, v) in fields {
                body.insert(k.clone(), Value::String(v.clone()));
            }
        }
        FieldEncoding::SnakeCase => {
            for (k, v) in fields {
                body.insert(to_snake_case(k), Value::String(v.clone()));
            }
        }
    }

    if !tags.is_empty() {
        body.insert("tags".to_string(), json!(tags));
    }
    Value::Object(body)
}

/// First/last name split: an explicit display name wins; otherwise the
/// first name is derived from the email's local part.
fn split_name(email: &str, display_name: Option<&str>) -> (String, Option<String>) {
    if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
        let mut words = name.split_whitespace();
        let first = words.next().unwrap_or(name).to_string();
        let rest: Vec<&str> = words.collect();
        let last = if rest.is_empty() { None } else { Some(rest.join(" ")) };
        return (first, last);
    }

    (first_name_from_email(email), None)
}

fn first_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let stem = local.split(['.', '_', '+', '-']).next().unwrap_or(local);
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Customer".to_string(),
    }
}

fn extract_contact_id(value: &Value) -> Option<String> {
    for candidate in [
        value.get("contact").and_then(|c| c.get("id")),
        value.get("id"),
        value.get("contactId"),
    ] {
        if let Some(id) = candidate.and_then(Value::as_str) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
}

fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            prev_lower = false;
        } else if ch == ' ' || ch == '-' {
            out.push('_');
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

fn encode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

fn read_api_base(context: &SharedContext) -> String {
    context.read().unwrap_or_else(|e| e.into_inner()).api_base.clone()
}
