//! Transactional message delivery
//!
//! Five endpoint/payload shapes are known to accept an outbound email,
//! depending on the provider account's entitlements. The contact-tied
//! conversation shape leads when a contact id is already known, since
//! it threads the message into an existing conversation instead of a
//! cold-send.

use leadbridge_domain::{MessageReceipt, MessageStatus, OutboundEmail, Result};
use serde_json::{json, Value};

use super::context::SharedContext;
use super::dispatcher::RequestDispatcher;
use super::fallback::{run_chain, EndpointCandidate};

/// Build the send-message candidate chain.
#[must_use]
pub fn send_candidates(
    api_base: &str,
    tenant: &str,
    email: &OutboundEmail,
    contact_id: Option<&str>,
) -> Vec<EndpointCandidate> {
    let html = email.html_body.as_deref().unwrap_or_default();
    let text = email.text_body.as_deref().unwrap_or_default();
    let mut candidates = Vec::with_capacity(5);

    if let Some(contact_id) = contact_id {
        let mut body = json!({
            "type": "Email",
            "contactId": contact_id,
            "subject": email.subject,
            "html": html,
            "message": text,
            "locationId": tenant,
        });
        attach_sender(&mut body, email);
        candidates.push(EndpointCandidate::post(
            "conversation-contact",
            format!("{api_base}/conversations/messages"),
            body,
        ));
    }

    let mut cold = json!({
        "type": "Email",
        "emailTo": email.to,
        "subject": email.subject,
        "html": html,
        "message": text,
        "locationId": tenant,
    });
    attach_sender(&mut cold, email);
    candidates.push(EndpointCandidate::post(
        "conversation-cold",
        format!("{api_base}/conversations/messages"),
        cold,
    ));

    let mut flat = json!({
        "to": email.to,
        "subject": email.subject,
        "html": html,
        "text": text,
        "locationId": tenant,
    });
    attach_sender(&mut flat, email);
    candidates.push(EndpointCandidate::post("emails-flat", format!("{api_base}/emails/"), flat));

    candidates.push(EndpointCandidate::post(
        "emails-wrapped",
        format!("{api_base}/emails/send"),
        json!({
            "email": {
                "to": email.to,
                "subject": email.subject,
                "html": html,
                "text": text,
            },
            "locationId": tenant,
        }),
    ));

    candidates.push(EndpointCandidate::post(
        "messages-generic",
        format!("{api_base}/messages"),
        json!({
            "channel": "email",
            "to": email.to,
            "subject": email.subject,
            "body": if html.is_empty() { text } else { html },
            "locationId": tenant,
        }),
    ));

    candidates
}

fn attach_sender(body: &mut Value, email: &OutboundEmail) {
    if let Some(from) = &email.from_address {
        body["emailFrom"] = Value::String(from.clone());
    }
    if let Some(name) = &email.from_name {
        body["fromName"] = Value::String(name.clone());
    }
    if let Some(reply_to) = &email.reply_to {
        body["replyTo"] = Value::String(reply_to.clone());
    }
}

/// Drive the send chain and shape the receipt.
pub async fn send(
    dispatcher: &RequestDispatcher,
    context: &SharedContext,
    tenant: &str,
    email: &OutboundEmail,
    contact_id: Option<&str>,
) -> Result<MessageReceipt> {
    let api_base = context.read().unwrap_or_else(|e| e.into_inner()).api_base.clone();
    let candidates = send_candidates(&api_base, tenant, email, contact_id);
    let outcome = run_chain(dispatcher, context, "send-message", candidates).await?;

    Ok(MessageReceipt {
        message_id: extract_message_id(&outcome.value),
        endpoint: outcome.label.to_string(),
    })
}

/// Look up delivery status: the conversation resource first, then the
/// legacy email resource.
pub async fn status(
    dispatcher: &RequestDispatcher,
    context: &SharedContext,
    message_id: &str,
) -> Result<MessageStatus> {
    let api_base = context.read().unwrap_or_else(|e| e.into_inner()).api_base.clone();
    let outcome = run_chain(
        dispatcher,
        context,
        "message-status",
        vec![
            EndpointCandidate::get(
                "conversation-message",
                format!("{api_base}/conversations/messages/{message_id}"),
            ),
            EndpointCandidate::get("legacy-email", format!("{api_base}/emails/{message_id}")),
        ],
    )
    .await?;

    Ok(MessageStatus {
        message_id: message_id.to_string(),
        status: extract_status(&outcome.value).unwrap_or_else(|| "unknown".to_string()),
    })
}

/// Provider responses spell the message id several ways.
#[must_use]
pub fn extract_message_id(value: &Value) -> Option<String> {
    for candidate in [
        value.get("messageId"),
        value.get("emailMessageId"),
        value.get("message").and_then(|m| m.get("id")),
        value.get("id"),
        value.get("data").and_then(|d| d.get("messageId")),
        value.get("data").and_then(|d| d.get("id")),
        value.get("conversationId"),
    ] {
        if let Some(id) = candidate.and_then(Value::as_str) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
}

fn extract_status(value: &Value) -> Option<String> {
    for candidate in [
        value.get("status"),
        value.get("deliveryStatus"),
        value.get("state"),
        value.get("message").and_then(|m| m.get("status")),
        value.get("email").and_then(|e| e.get("status")),
        value.get("data").and_then(|d| d.get("status")),
    ] {
        if let Some(status) = candidate.and_then(Value::as_str) {
            if !status.is_empty() {
                return Some(status.to_string());
            }
        }
    }
    None
}
