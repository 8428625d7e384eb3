//! The CRM gateway implementation
//!
//! `CrmClient` wires the resolver, dispatcher and fallback chains into
//! the `CrmGateway` port. These methods are the only pieces with
//! business meaning; everything below them is plumbing for a provider
//! whose auth scheme, base URL and tenant scope have to be discovered.

use async_trait::async_trait;
use leadbridge_common::testing::{Clock, SystemClock};
use leadbridge_core::CrmGateway;
use leadbridge_domain::{
    ContactReceipt, CrmConfig, CustomerRecord, InvoiceRecord, LeadBridgeError, MessageReceipt,
    MessageStatus, OpportunityReceipt, OutboundEmail, Result,
};
use tracing::{instrument, warn};

use crate::config;
use crate::http::HttpClient;

use super::contacts;
use super::context::SharedContext;
use super::dispatcher::RequestDispatcher;
use super::messages;
use super::opportunities;
use super::phrases::ResponseClassifier;
use super::resolver::ContextResolver;

/// CRM provider client implementing the [`CrmGateway`] port.
pub struct CrmClient<C: Clock = SystemClock> {
    resolver: ContextResolver<C>,
    dispatcher: RequestDispatcher,
}

impl CrmClient<SystemClock> {
    /// Build a client from explicit configuration.
    ///
    /// # Errors
    /// `LeadBridgeError::Config` when the credential is empty; this is
    /// the fail-fast check that runs before any network call.
    pub fn new(config: CrmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LeadBridgeError::Config(
                "CRM credential is empty; set LEADBRIDGE_CRM_API_KEY".into(),
            ));
        }

        let http = HttpClient::builder().timeout(config.timeout()).build()?;
        let dispatcher = RequestDispatcher::new(http, ResponseClassifier::default());
        let resolver = ContextResolver::new(config)?;

        Ok(Self { resolver, dispatcher })
    }

    /// Build a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(config::from_env()?)
    }
}

impl<C: Clock> CrmClient<C> {
    /// Assemble a client from pre-built components (tests inject a
    /// mock-clock resolver here).
    pub fn with_components(resolver: ContextResolver<C>, dispatcher: RequestDispatcher) -> Self {
        Self { resolver, dispatcher }
    }

    /// Diagnostic trail of the currently cached context, if any.
    /// Supportability only; never part of control flow.
    #[must_use]
    pub fn context_snapshot(&self) -> Option<Vec<String>> {
        self.resolver.cached().map(|context| {
            context.read().unwrap_or_else(|e| e.into_inner()).trace.clone()
        })
    }

    /// Resolve the context and compute the tenant the operation should
    /// use: an explicit per-call value outranks whatever resolution
    /// produced.
    async fn scoped_context(&self, explicit: Option<&str>) -> (SharedContext, Option<String>) {
        let context = self.resolver.resolve(explicit).await;
        let tenant = explicit.map(str::to_string).or_else(|| {
            context.read().unwrap_or_else(|e| e.into_inner()).tenant_id.clone()
        });
        (context, tenant)
    }
}

fn require_tenant(tenant: Option<String>) -> Result<String> {
    tenant.ok_or_else(|| {
        LeadBridgeError::TenantResolution(
            "Location ID is required for CRM operations; pass one explicitly, set \
             LEADBRIDGE_CRM_LOCATION_ID, or use a location-scoped credential"
                .into(),
        )
    })
}

fn display_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let joined = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Contact-level fields mirrored from a customer record.
fn customer_fields(customer: &CustomerRecord) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    if let Some(company) = customer.company.as_deref().filter(|c| !c.trim().is_empty()) {
        fields.push(("companyName".to_string(), company.to_string()));
    }
    if let Some(phone) = customer.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        fields.push(("phone".to_string(), phone.to_string()));
    }
    fields
}

#[async_trait]
impl<C: Clock + 'static> CrmGateway for CrmClient<C> {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send_message(
        &self,
        message: &OutboundEmail,
        tenant: Option<&str>,
    ) -> Result<MessageReceipt> {
        let (context, tenant) = self.scoped_context(tenant).await;
        let tenant = require_tenant(tenant)?;

        // Best-effort: a known contact id lets the conversation-tied
        // endpoint thread the message instead of cold-sending.
        let contact_id = match contacts::find_or_create(
            &self.dispatcher,
            &context,
            &tenant,
            &message.to,
            None,
        )
        .await
        {
            Ok(receipt) => Some(receipt.contact_id),
            Err(err) => {
                warn!(error = %err, "find-or-create failed; falling back to cold send");
                None
            }
        };

        messages::send(&self.dispatcher, &context, &tenant, message, contact_id.as_deref()).await
    }

    #[instrument(skip(self, customer), fields(email = %customer.email))]
    async fn sync_customer(
        &self,
        customer: &CustomerRecord,
        tenant: Option<&str>,
    ) -> Result<ContactReceipt> {
        let (context, tenant) = self.scoped_context(tenant).await;
        let tenant = require_tenant(tenant)?;

        let name = display_name(customer.first_name.as_deref(), customer.last_name.as_deref());
        let receipt = contacts::find_or_create(
            &self.dispatcher,
            &context,
            &tenant,
            &customer.email,
            name.as_deref(),
        )
        .await?;

        let fields = customer_fields(customer);
        if !fields.is_empty() || !customer.tags.is_empty() {
            contacts::update_with_custom_fields(
                &self.dispatcher,
                &context,
                &receipt.contact_id,
                &fields,
                &customer.tags,
            )
            .await?;
        }

        Ok(receipt)
    }

    #[instrument(skip(self, invoice), fields(invoice = %invoice.id))]
    async fn sync_invoice(
        &self,
        invoice: &InvoiceRecord,
        tenant: Option<&str>,
    ) -> Result<OpportunityReceipt> {
        let (context, tenant) = self.scoped_context(tenant).await;
        let tenant = require_tenant(tenant)?;

        let contact = contacts::find_or_create(
            &self.dispatcher,
            &context,
            &tenant,
            &invoice.customer_email,
            invoice.customer_name.as_deref(),
        )
        .await?;

        let opportunity_id = opportunities::create(
            &self.dispatcher,
            &context,
            &tenant,
            invoice,
            &contact.contact_id,
        )
        .await?;

        Ok(OpportunityReceipt { opportunity_id, contact_id: contact.contact_id })
    }

    #[instrument(skip(self, invoice), fields(invoice = %invoice.id))]
    async fn notify_payment_success(
        &self,
        invoice: &InvoiceRecord,
        tenant: Option<&str>,
    ) -> Result<()> {
        let (context, tenant) = self.scoped_context(tenant).await;
        let tenant = require_tenant(tenant)?;

        let contact = contacts::find_or_create(
            &self.dispatcher,
            &context,
            &tenant,
            &invoice.customer_email,
            invoice.customer_name.as_deref(),
        )
        .await?;

        contacts::update_with_custom_fields(
            &self.dispatcher,
            &context,
            &contact.contact_id,
            &opportunities::payment_fields(invoice),
            &[opportunities::PAYMENT_TAG.to_string()],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn message_status(
        &self,
        message_id: &str,
        tenant: Option<&str>,
    ) -> Result<MessageStatus> {
        // Status lookups are keyed by message id alone; the tenant, when
        // provided, only influences context resolution.
        let (context, _tenant) = self.scoped_context(tenant).await;
        messages::status(&self.dispatcher, &context, message_id).await
    }
}
