//! Conversions from external infrastructure errors into domain errors.

use leadbridge_domain::LeadBridgeError;
use reqwest::Error as HttpError;
use url::ParseError as UrlError;

/// Error newtype that keeps conversions on the infrastructure side and
/// can be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub LeadBridgeError);

impl From<InfraError> for LeadBridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<LeadBridgeError> for InfraError {
    fn from(value: LeadBridgeError) -> Self {
        InfraError(value)
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        let message = value.to_string();
        if value.is_timeout() {
            InfraError(LeadBridgeError::Network(format!("http timeout: {message}")))
        } else if value.is_connect() {
            InfraError(LeadBridgeError::Network(format!("http connect failure: {message}")))
        } else if value.is_builder() || value.is_request() {
            InfraError(LeadBridgeError::InvalidInput(format!("http request invalid: {message}")))
        } else if value.is_decode() {
            InfraError(LeadBridgeError::Provider(format!("http body decode failure: {message}")))
        } else {
            InfraError(LeadBridgeError::Network(format!("http failure: {message}")))
        }
    }
}

impl From<UrlError> for InfraError {
    fn from(value: UrlError) -> Self {
        InfraError(LeadBridgeError::InvalidInput(format!("invalid url: {value}")))
    }
}
