//! Operation input and output types
//!
//! These are the shapes the UI/business layers exchange with the CRM
//! adapter. Everything is plain serde data; provider wire formats live
//! in `leadbridge-infra`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A transactional email handed to the adapter for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
}

impl OutboundEmail {
    /// Minimal message: recipient and subject only.
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: None,
            text_body: None,
            from_address: None,
            from_name: None,
            reply_to: None,
        }
    }
}

/// A customer record to mirror into the provider as a contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An invoice to mirror into the provider as an opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    /// Total in minor currency units (cents).
    pub amount_cents: i64,
    /// ISO 4217 code, e.g. "USD".
    pub currency: String,
    pub description: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
}

impl InvoiceRecord {
    /// Amount in major units for provider APIs that take decimal values.
    #[must_use]
    pub fn amount(&self) -> f64 {
        self.amount_cents as f64 / 100.0
    }
}

/// Outcome of a successful message send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// Provider-assigned message id, when one could be read off the
    /// response. Downstream status lookups need this.
    pub message_id: Option<String>,
    /// Which endpoint shape ultimately accepted the message.
    pub endpoint: String,
}

/// Outcome of a contact find-or-create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactReceipt {
    pub contact_id: String,
    /// `true` when the contact was created by this call rather than found.
    pub created: bool,
}

/// Outcome of an invoice sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityReceipt {
    pub opportunity_id: Option<String>,
    pub contact_id: String,
}

/// Delivery state of a previously sent message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageStatus {
    pub message_id: String,
    /// Provider-reported state, passed through verbatim ("delivered",
    /// "failed", "pending", ...).
    pub status: String,
}
