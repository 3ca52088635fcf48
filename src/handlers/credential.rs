//! # Credential Handler
//!
//! Issues a credential against a validated session: locates the session by
//! the request's `c_nonce`, matches the request against the offered
//! configurations, extracts and verifies the holder binding, invokes the
//! host-supplied mapper, consumes the configuration slot, and routes the
//! payload to the signer for its format.
//!
//! The `issued_credentials` append is persisted before signing: once the
//! signer emits a credential the slot is considered consumed even if the
//! wallet never sees the response. The post-read guard on the re-loaded
//! session catches duplicate-issuance races on the same
//! `(session, configuration)` pair.

use chrono::Utc;
use tracing::instrument;

use crate::binding;
use crate::compat;
use crate::error::Error;
use crate::generate;
use crate::handlers::Handler;
use crate::matcher;
use crate::provider::{MapRequest, Metadata, Provider, SessionStore};
use crate::resolver;
use crate::session::{Expire, IssuanceSession, SessionState};
use crate::signer;
use crate::types::{
    CredentialFormat, CredentialRequest, CredentialResponse, FormatRequest, RequestBy,
    SignCredential, SignOptions,
};

/// Credential request handler.
///
/// # Errors
///
/// Returns an error when the session cannot be located or validated, the
/// request matches no offered configuration, the proof is invalid, or the
/// signer fails.
#[instrument(level = "debug", skip(provider))]
pub async fn credential(
    issuer: &str, provider: &impl Provider, request: CredentialRequest,
) -> crate::Result<CredentialResponse> {
    let (mut session, c_nonce) =
        resolver::find_session_for_request(provider, &request, Some(issuer)).await?;
    resolver::validate_for_credential(&session, &request, &c_nonce)?;

    session.state = SessionState::CredentialRequestReceived;
    SessionStore::update(provider, &session)
        .await
        .map_err(|e| Error::ServerError(format!("issue saving session: {e}")))?;

    let record = Metadata::issuer(provider, &session.issuer_id)
        .await
        .map_err(|e| Error::ServerError(format!("issue getting issuer record: {e}")))?;

    let ctx = Context { session, record };
    ctx.process(provider, request).await
}

impl Handler for CredentialRequest {
    type Response = CredentialResponse;

    fn handle(
        self, issuer: &str, provider: &impl Provider,
    ) -> impl Future<Output = crate::Result<Self::Response>> + Send {
        credential(issuer, provider, self)
    }
}

#[derive(Debug)]
struct Context {
    session: IssuanceSession,
    record: crate::types::Issuer,
}

impl Context {
    // Process the credential request.
    async fn process(
        self, provider: &impl Provider, request: CredentialRequest,
    ) -> crate::Result<CredentialResponse> {
        tracing::debug!("credential::process");

        let matched = matcher::matched_configurations(&self.session, &request, &self.record)?;

        // holder binding, then proof signature
        let holder = binding::extract_binding(provider, &request).await?;
        binding::verify_proof(provider, &request).await?;

        // hand the request to the host-supplied mapper
        let matched_draft11 = match &self.session.offer_draft11 {
            Some(_) => {
                Some(compat::configs_v13_to_v11(matched.iter().map(|(id, config)| (id, config))))
            }
            None => None,
        };
        let options = provider
            .sign_options(MapRequest {
                session: self.session.clone(),
                holder: holder.clone(),
                offer: self.session.offer_payload(),
                request: request.clone(),
                matched: matched.clone(),
                matched_draft11,
            })
            .await
            .map_err(Error::from)?;

        // re-read the session and consume the configuration slot ahead of
        // signing
        let mut session = SessionStore::session(provider, &self.session.id)
            .await
            .map_err(|e| Error::ServerError(format!("issue reloading session: {e}")))?
            .ok_or_else(|| Error::NotFound("session disappeared mid-flight".into()))?;
        session.record_issued(&options.credential_configuration_id)?;
        SessionStore::update(provider, &session)
            .await
            .map_err(|e| Error::ServerError(format!("issue saving session: {e}")))?;

        // the mapper's output must agree with the request's format
        let issued_format = issued_format(&request, &matched, &options)?;

        // sign, then screen the signer's envelope
        let response = signer::issue(provider, &options, &holder, issued_format).await?;

        if response.acceptance_token.is_some() || response.transaction_id.is_some() {
            let message = "signer attempted to defer issuance";
            session.fail(message);
            SessionStore::update(provider, &session)
                .await
                .map_err(|e| Error::ServerError(format!("issue saving session: {e}")))?;
            return Err(Error::DeferredUnsupported(message.into()));
        }
        let Some(credential) = response.credential else {
            let message = "signer returned no credential";
            session.fail(message);
            SessionStore::update(provider, &session)
                .await
                .map_err(|e| Error::ServerError(format!("issue saving session: {e}")))?;
            return Err(Error::SignerProducedNothing(message.into()));
        };

        // advance the session and rotate the challenge
        session.advance();
        let c_nonce = generate::nonce();
        session.rotate_nonce(c_nonce.as_str(), Utc::now() + Expire::Nonce.duration());
        SessionStore::update(provider, &session)
            .await
            .map_err(|e| Error::ServerError(format!("issue saving session: {e}")))?;

        Ok(CredentialResponse {
            format: compat::response_format(issued_format),
            credential: Some(credential),
            c_nonce: Some(c_nonce),
            c_nonce_expires_in: Some(Expire::Nonce.duration().num_seconds()),
        })
    }
}

// Enforce agreement between the mapper's sign options and the request's
// format, returning the wire format of the credential being issued. Requests
// by identifier are checked against the matched configuration's format.
fn issued_format(
    request: &CredentialRequest, matched: &[(String, crate::types::CredentialConfiguration)],
    options: &SignOptions,
) -> crate::Result<CredentialFormat> {
    let requested = match &request.credential {
        RequestBy::Format(format_request) => format_request.format(),
        RequestBy::Identifier { .. } => matched
            .first()
            .map(|(_, config)| config.format.format())
            .ok_or_else(|| Error::ServerError("no matched configuration".into()))?,
    };

    match &options.credential {
        SignCredential::JwtVc(_) | SignCredential::LdpVc(_) => {
            if !requested.is_w3c() {
                return Err(Error::FormatMismatch(format!(
                    "W3C sign options for a {requested} request"
                )));
            }
        }
        SignCredential::SdJwtVc { .. } => {
            if requested != CredentialFormat::VcSdJwt {
                return Err(Error::FormatMismatch(format!(
                    "SD-JWT sign options for a {requested} request"
                )));
            }
            if let RequestBy::Format(FormatRequest::VcSdJwt { vct }) = &request.credential {
                if options.credential.vct() != Some(vct.as_str()) {
                    return Err(Error::FormatMismatch(
                        "sign options vct differs from the requested vct".into(),
                    ));
                }
            }
        }
        SignCredential::MsoMdoc { doctype, .. } => {
            if requested != CredentialFormat::MsoMdoc {
                return Err(Error::FormatMismatch(format!(
                    "mdoc sign options for a {requested} request"
                )));
            }
            if let RequestBy::Format(FormatRequest::MsoMdoc {
                doctype: requested_doctype,
            }) = &request.credential
            {
                if doctype != requested_doctype {
                    return Err(Error::FormatMismatch(
                        "sign options doctype differs from the requested doctype".into(),
                    ));
                }
            }
        }
    }

    Ok(requested)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{CredentialConfiguration, W3cCredential};

    fn matched() -> Vec<(String, CredentialConfiguration)> {
        vec![(
            "UniversityDegree_SD".into(),
            serde_json::from_value(json!({
                "format": "vc+sd-jwt",
                "vct": "UniversityDegree_SD"
            }))
            .expect("should deserialize"),
        )]
    }

    fn sd_jwt_options(vct: &str) -> SignOptions {
        SignOptions {
            credential_configuration_id: "UniversityDegree_SD".into(),
            verification_method: "did:example:issuer#key-1".into(),
            credential: SignCredential::SdJwtVc {
                payload: json!({ "vct": vct })
                    .as_object()
                    .expect("should be an object")
                    .clone(),
            },
        }
    }

    #[test]
    fn sd_jwt_vct_must_agree() {
        let request: CredentialRequest = serde_json::from_value(json!({
            "format": "vc+sd-jwt",
            "vct": "UniversityDegree_SD"
        }))
        .expect("should deserialize");

        let format = issued_format(&request, &matched(), &sd_jwt_options("UniversityDegree_SD"))
            .expect("should agree");
        assert_eq!(format, CredentialFormat::VcSdJwt);

        let err = issued_format(&request, &matched(), &sd_jwt_options("OtherType"))
            .expect_err("should disagree");
        assert!(matches!(err, Error::FormatMismatch(_)));
    }

    #[test]
    fn w3c_options_reject_non_w3c_requests() {
        let request: CredentialRequest = serde_json::from_value(json!({
            "format": "vc+sd-jwt",
            "vct": "UniversityDegree_SD"
        }))
        .expect("should deserialize");

        let options = SignOptions {
            credential_configuration_id: "UniversityDegree_SD".into(),
            verification_method: "did:example:issuer#key-1".into(),
            credential: SignCredential::JwtVc(W3cCredential::default()),
        };
        let err = issued_format(&request, &matched(), &options).expect_err("should disagree");
        assert!(matches!(err, Error::FormatMismatch(_)));
    }

    #[test]
    fn identifier_requests_check_the_matched_format() {
        let request: CredentialRequest = serde_json::from_value(json!({
            "credential_identifier": "UniversityDegree_SD"
        }))
        .expect("should deserialize");

        let format = issued_format(&request, &matched(), &sd_jwt_options("UniversityDegree_SD"))
            .expect("should agree");
        assert_eq!(format, CredentialFormat::VcSdJwt);
    }
}
