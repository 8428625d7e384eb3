//! CRM integration port interfaces

use async_trait::async_trait;
use leadbridge_domain::{
    ContactReceipt, CustomerRecord, InvoiceRecord, MessageReceipt, MessageStatus,
    OpportunityReceipt, OutboundEmail, Result,
};

/// Trait for the CRM provider gateway.
///
/// Every method takes an optional per-call tenant (location) id which
/// outranks any configured or discovered value. Failures come back as
/// `LeadBridgeError` values; callers never need to catch panics for
/// ordinary provider flakiness.
#[async_trait]
pub trait CrmGateway: Send + Sync {
    /// Deliver a transactional email through the provider.
    async fn send_message(
        &self,
        message: &OutboundEmail,
        tenant: Option<&str>,
    ) -> Result<MessageReceipt>;

    /// Mirror a customer into the provider, creating the contact if it
    /// does not exist yet.
    async fn sync_customer(
        &self,
        customer: &CustomerRecord,
        tenant: Option<&str>,
    ) -> Result<ContactReceipt>;

    /// Mirror an invoice into the provider as an opportunity.
    async fn sync_invoice(
        &self,
        invoice: &InvoiceRecord,
        tenant: Option<&str>,
    ) -> Result<OpportunityReceipt>;

    /// Record a successful payment against the invoice's contact.
    async fn notify_payment_success(
        &self,
        invoice: &InvoiceRecord,
        tenant: Option<&str>,
    ) -> Result<()>;

    /// Look up the delivery state of a previously sent message.
    async fn message_status(
        &self,
        message_id: &str,
        tenant: Option<&str>,
    ) -> Result<MessageStatus>;
}
