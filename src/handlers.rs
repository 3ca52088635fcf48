//! # Endpoint Handlers
//!
//! Entry points for the issuance flow: offer creation, offer retrieval, and
//! credential issuance. Each handler takes the issuer identifier, a
//! [`Provider`] supplying the host collaborators, and the request body. The
//! HTTP layer wrapping these handlers is the host's concern.

mod create_offer;
mod credential;
mod credential_offer;

use std::fmt::Debug;

use crate::error::Error;
use crate::provider::Provider;

pub use self::create_offer::{CreateOfferResponse, create_offer};
pub use self::credential::credential;
pub use self::credential_offer::{
    CredentialOfferRequest, CredentialOfferResponse, credential_offer,
};

/// Handle an incoming request by routing it to its handler.
///
/// # Errors
///
/// This method can fail for a number of reasons related to the incoming
/// request's viability. Expected failures include invalid session state,
/// invalid proofs, and unmatchable credential requests.
pub async fn handle<T>(
    issuer: &str, request: impl Handler<Response = T>, provider: &impl Provider,
) -> crate::Result<T> {
    request.validate(issuer)?;
    request.handle(issuer, provider).await
}

/// Methods common to all request types.
///
/// The primary role of this trait is to provide a common interface for
/// requests so they can be routed by the [`handle`] method.
pub trait Handler: Clone + Debug + Send + Sync {
    /// The response type for the request.
    type Response;

    /// Routes the request to the concrete handler used to process it.
    fn handle(
        self, issuer: &str, provider: &impl Provider,
    ) -> impl Future<Output = crate::Result<Self::Response>> + Send;

    /// Perform initial validation common to all requests.
    ///
    /// # Errors
    ///
    /// Returns an error when no issuer is specified.
    fn validate(&self, issuer: &str) -> crate::Result<()> {
        if issuer.is_empty() {
            return Err(Error::ServerError("no issuer specified".into()));
        }
        Ok(())
    }
}
