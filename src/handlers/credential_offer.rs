//! # Credential Offer Handler
//!
//! Returns a previously generated Credential Offer to the wallet
//! dereferencing its offer URI, and records the retrieval on the session.
//! The payload is returned in the draft shape the offer was created for.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Error;
use crate::handlers::Handler;
use crate::provider::{Provider, SessionFilter, SessionStore};
use crate::types::OfferPayload;

/// The Credential Offer Request is used by the Wallet to retrieve a
/// previously generated Credential Offer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialOfferRequest {
    /// The offer URI the wallet was handed in the deep link.
    pub credential_offer_uri: String,
}

/// The Credential Offer Response returns a previously generated Credential
/// Offer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CredentialOfferResponse(pub OfferPayload);

/// Credential Offer request handler.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when no session owns the offer URI.
#[instrument(level = "debug", skip(provider))]
pub async fn credential_offer(
    issuer: &str, provider: &impl Provider, request: CredentialOfferRequest,
) -> crate::Result<CredentialOfferResponse> {
    let filter = SessionFilter::by_offer_uri(request.credential_offer_uri.as_str()).issuer(issuer);
    let mut sessions = provider
        .find(&filter)
        .await
        .map_err(|e| Error::ServerError(format!("issue querying sessions: {e}")))?;

    let mut session = match sessions.len() {
        0 => return Err(Error::NotFound("no offer at the requested URI".into())),
        1 => sessions.remove(0),
        n => {
            return Err(Error::AmbiguousSession(format!("{n} sessions share the offer URI")));
        }
    };

    session.offer_retrieved();
    SessionStore::update(provider, &session)
        .await
        .map_err(|e| Error::ServerError(format!("issue saving session: {e}")))?;

    Ok(CredentialOfferResponse(session.offer_payload()))
}

impl Handler for CredentialOfferRequest {
    type Response = CredentialOfferResponse;

    fn handle(
        self, issuer: &str, provider: &impl Provider,
    ) -> impl Future<Output = crate::Result<Self::Response>> + Send {
        credential_offer(issuer, provider, self)
    }
}
