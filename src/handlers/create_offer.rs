//! # Create Offer Handler
//!
//! Builds a Credential Offer for use in invoking a credential issuance flow
//! with a wallet: validates the offered configurations, normalizes the
//! pre-authorized grant, mints the offer URI and pre-authorized code,
//! persists a new issuance session, and returns a deep link.
//!
//! See <https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html#name-credential-offer-endpoint>

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::compat;
use crate::error::Error;
use crate::generate;
use crate::handlers::Handler;
use crate::provider::{Metadata, Provider, SessionStore};
use crate::session::{IssuanceSession, SessionState};
use crate::types::{
    CreateOfferRequest, CredentialOffer, Grants, Issuer, OfferVersion, PreAuthorizedCodeGrant,
    TxCode, DEFAULT_OFFER_PATH, deep_link,
};

/// The created session and the deep link pointing the wallet at its offer.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateOfferResponse {
    /// The persisted issuance session.
    pub session: IssuanceSession,

    /// An `openid-credential-offer://` deep link carrying the offer URI.
    pub uri: String,
}

/// Create Offer request handler.
///
/// # Errors
///
/// Returns [`Error::InvalidOffer`] when the offer constraints are violated,
/// and a server error when the issuer record cannot be loaded or the session
/// cannot be persisted.
#[instrument(level = "debug", skip(provider))]
pub async fn create_offer(
    issuer: &str, provider: &impl Provider, request: CreateOfferRequest,
) -> crate::Result<CreateOfferResponse> {
    let record = Metadata::issuer(provider, issuer)
        .await
        .map_err(|e| Error::ServerError(format!("issue getting issuer record: {e}")))?;

    let ctx = Context { record };
    ctx.verify(&request)?;
    ctx.process(provider, request).await
}

impl Handler for CreateOfferRequest {
    type Response = CreateOfferResponse;

    fn handle(
        self, issuer: &str, provider: &impl Provider,
    ) -> impl Future<Output = crate::Result<Self::Response>> + Send {
        create_offer(issuer, provider, self)
    }
}

#[derive(Debug)]
struct Context {
    record: Issuer,
}

impl Context {
    fn verify(&self, request: &CreateOfferRequest) -> crate::Result<()> {
        tracing::debug!("create_offer::verify");

        // credentials required
        if request.credential_configuration_ids.is_empty() {
            return Err(Error::InvalidOffer("no credentials offered".into()));
        }

        // offered ids must be pairwise unique
        let mut seen = HashSet::new();
        for configuration_id in &request.credential_configuration_ids {
            if !seen.insert(configuration_id) {
                return Err(Error::InvalidOffer(format!(
                    "{configuration_id} offered more than once"
                )));
            }

            // and supported by the issuer
            if !self.record.configurations.contains(configuration_id) {
                return Err(Error::InvalidOffer(format!(
                    "{configuration_id} is not supported by the issuer"
                )));
            }
        }

        // a tx_code descriptor with an explicitly unset PIN is contradictory
        if request.pre_authorized.tx_code.is_some()
            && request.pre_authorized.user_pin_required == Some(false)
        {
            return Err(Error::InvalidOffer(
                "tx_code set while user_pin_required is false".into(),
            ));
        }

        Ok(())
    }

    // Process the request.
    async fn process(
        &self, provider: &impl Provider, request: CreateOfferRequest,
    ) -> crate::Result<CreateOfferResponse> {
        tracing::debug!("create_offer::process");

        let tx_code = normalize_tx_code(&request);
        let pre_authorized_code = request
            .pre_authorized
            .pre_authorized_code
            .clone()
            .unwrap_or_else(generate::pre_authorized_code);

        // mint the offer URI under the issuer's base
        let base_uri = request.base_uri.as_deref().unwrap_or(&self.record.credential_issuer);
        let credential_offer_uri = format!(
            "{}/{DEFAULT_OFFER_PATH}/{}",
            base_uri.trim_end_matches('/'),
            Uuid::new_v4()
        );

        // the canonical draft 13 payload, plus the draft 11 projection when
        // the offer was requested for draft 11
        let offer = CredentialOffer {
            credential_issuer: self.record.credential_issuer.clone(),
            credential_configuration_ids: request.credential_configuration_ids.clone(),
            grants: Some(Grants {
                pre_authorized_code: Some(PreAuthorizedCodeGrant {
                    pre_authorized_code: pre_authorized_code.clone(),
                    tx_code: tx_code.clone(),
                }),
            }),
        };
        let offer_draft11 = match request.version {
            OfferVersion::Draft11 => Some(compat::offer_to_draft11(&offer)),
            OfferVersion::Draft13 => None,
        };

        let session = IssuanceSession {
            id: Uuid::new_v4().to_string(),
            issuer_id: self.record.credential_issuer.clone(),
            credential_offer_uri: credential_offer_uri.clone(),
            offer,
            offer_draft11,
            pre_authorized_code,
            tx_code,
            issuance_metadata: request.issuance_metadata,
            state: SessionState::OfferCreated,
            ..IssuanceSession::default()
        };

        SessionStore::create(provider, &session)
            .await
            .map_err(|e| Error::ServerError(format!("issue saving session: {e}")))?;

        Ok(CreateOfferResponse {
            uri: deep_link(&credential_offer_uri),
            session,
        })
    }
}

// Normalize the PIN/transaction-code combination: a tx_code descriptor
// forces a required PIN, and a required PIN without a descriptor gets an
// empty one.
fn normalize_tx_code(request: &CreateOfferRequest) -> Option<TxCode> {
    match (&request.pre_authorized.tx_code, request.pre_authorized.user_pin_required) {
        (Some(tx_code), _) => Some(tx_code.clone()),
        (None, Some(true)) => Some(TxCode::default()),
        (None, _) => None,
    }
}
