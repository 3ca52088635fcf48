//! # Request Resolution
//!
//! Locates the issuance session a credential request belongs to, and checks
//! the preconditions a session must satisfy before a credential may be
//! issued against it.

use chrono::Utc;

use crate::error::Error;
use crate::proof;
use crate::provider::{SessionFilter, SessionStore};
use crate::session::IssuanceSession;
use crate::types::CredentialRequest;

/// Locate the session a credential request belongs to by its `c_nonce`.
///
/// The nonce is probed in order: (a) the request's top-level `c_nonce`, (b)
/// the proof object's `c_nonce`, (c) the `nonce` claim of the decoded proof
/// JWT. Returns the session together with the nonce that located it.
///
/// # Errors
///
/// Returns [`Error::MissingNonce`] when no nonce is present anywhere,
/// [`Error::NotFound`] when no session matches, and
/// [`Error::AmbiguousSession`] when more than one does.
pub async fn find_session_for_request(
    store: &impl SessionStore, request: &CredentialRequest, issuer_id: Option<&str>,
) -> crate::Result<(IssuanceSession, String)> {
    let c_nonce = request_nonce(request)?;

    let mut filter = SessionFilter::by_c_nonce(c_nonce.as_str());
    if let Some(issuer_id) = issuer_id {
        filter = filter.issuer(issuer_id);
    }

    let mut sessions = store
        .find(&filter)
        .await
        .map_err(|e| Error::ServerError(format!("issue querying sessions: {e}")))?;

    match sessions.len() {
        0 => Err(Error::NotFound("no session for the presented c_nonce".into())),
        1 => {
            let session = sessions.remove(0);
            Ok((session, c_nonce))
        }
        n => Err(Error::AmbiguousSession(format!("{n} sessions share the presented c_nonce"))),
    }
}

/// Check that a session can accept the credential request that located it.
///
/// # Errors
///
/// Returns [`Error::InvalidState`] when the session is not awaiting
/// credential requests, [`Error::MissingProof`] when the request carries no
/// proof, [`Error::NonceMismatch`] when the session's nonce differs from the
/// presented one, and [`Error::NonceExpired`] when the nonce is past its
/// expiry.
pub fn validate_for_credential(
    session: &IssuanceSession, request: &CredentialRequest, c_nonce: &str,
) -> crate::Result<()> {
    if !session.accepts_credential_requests() {
        return Err(Error::InvalidState(format!(
            "session does not accept credential requests in state {:?}",
            session.state
        )));
    }

    if request.proof.is_none() {
        return Err(Error::MissingProof("credential request has no proof".into()));
    }

    // defence in depth against store query collisions
    if session.c_nonce.as_deref() != Some(c_nonce) {
        return Err(Error::NonceMismatch("presented c_nonce is not the session's".into()));
    }

    let expires_at = session
        .c_nonce_expires_at
        .ok_or_else(|| Error::NonceExpired("session c_nonce has no expiry".into()))?;
    if expires_at <= Utc::now() {
        return Err(Error::NonceExpired("session c_nonce has expired".into()));
    }

    Ok(())
}

// Extract the `c_nonce` from a credential request, probing the request, the
// proof object, then the proof JWT claims.
fn request_nonce(request: &CredentialRequest) -> crate::Result<String> {
    if let Some(c_nonce) = &request.c_nonce {
        return Ok(c_nonce.clone());
    }
    if let Some(proof) = &request.proof {
        if let Some(c_nonce) = proof.c_nonce() {
            return Ok(c_nonce.to_string());
        }
        if let Ok(claims) = proof::decode_claims(proof.jwt()) {
            if let Some(nonce) = claims.nonce {
                return Ok(nonce);
            }
        }
    }
    Err(Error::MissingNonce("credential request carries no c_nonce".into()))
}

#[cfg(test)]
mod tests {
    use base64ct::{Base64UrlUnpadded, Encoding};
    use chrono::TimeDelta;
    use serde_json::json;

    use super::*;
    use crate::session::SessionState;
    use crate::types::CredentialOffer;

    fn proof_jwt(nonce: &str) -> String {
        let header = Base64UrlUnpadded::encode_string(b"{\"alg\":\"EdDSA\"}");
        let claims = Base64UrlUnpadded::encode_string(
            &serde_json::to_vec(&json!({ "aud": "iss", "iat": 0, "nonce": nonce }))
                .expect("should serialize"),
        );
        format!("{header}.{claims}.c2ln")
    }

    fn session(state: SessionState) -> IssuanceSession {
        IssuanceSession {
            id: "session-1".into(),
            issuer_id: "https://issuer.example.com".into(),
            offer: CredentialOffer {
                credential_configuration_ids: vec!["A".into()],
                ..CredentialOffer::default()
            },
            state,
            c_nonce: Some("nonce".into()),
            c_nonce_expires_at: Some(Utc::now() + TimeDelta::try_minutes(10).unwrap_or_default()),
            ..IssuanceSession::default()
        }
    }

    #[test]
    fn nonce_probe_order() {
        // top-level c_nonce wins
        let request: CredentialRequest = serde_json::from_value(json!({
            "credential_identifier": "A",
            "c_nonce": "top-level",
            "proof": { "proof_type": "jwt", "jwt": proof_jwt("in-jwt"), "c_nonce": "in-proof" }
        }))
        .expect("should deserialize");
        assert_eq!(request_nonce(&request).expect("should probe"), "top-level");

        // then the proof object
        let request: CredentialRequest = serde_json::from_value(json!({
            "credential_identifier": "A",
            "proof": { "proof_type": "jwt", "jwt": proof_jwt("in-jwt"), "c_nonce": "in-proof" }
        }))
        .expect("should deserialize");
        assert_eq!(request_nonce(&request).expect("should probe"), "in-proof");

        // then the decoded JWT claims
        let request: CredentialRequest = serde_json::from_value(json!({
            "credential_identifier": "A",
            "proof": { "proof_type": "jwt", "jwt": proof_jwt("in-jwt") }
        }))
        .expect("should deserialize");
        assert_eq!(request_nonce(&request).expect("should probe"), "in-jwt");
    }

    #[test]
    fn missing_nonce() {
        let request: CredentialRequest = serde_json::from_value(json!({
            "credential_identifier": "A"
        }))
        .expect("should deserialize");
        let err = request_nonce(&request).expect_err("should reject");
        assert!(matches!(err, Error::MissingNonce(_)));
    }

    #[test]
    fn preconditions() {
        let request: CredentialRequest = serde_json::from_value(json!({
            "credential_identifier": "A",
            "proof": { "proof_type": "jwt", "jwt": proof_jwt("nonce") }
        }))
        .expect("should deserialize");

        // acceptable states
        for state in [
            SessionState::AccessTokenCreated,
            SessionState::CredentialRequestReceived,
            SessionState::CredentialsPartiallyIssued,
        ] {
            validate_for_credential(&session(state), &request, "nonce").expect("should accept");
        }

        // wrong state
        let err = validate_for_credential(&session(SessionState::OfferCreated), &request, "nonce")
            .expect_err("should reject");
        assert!(matches!(err, Error::InvalidState(_)));

        // nonce mismatch
        let err = validate_for_credential(
            &session(SessionState::AccessTokenCreated),
            &request,
            "other-nonce",
        )
        .expect_err("should reject");
        assert!(matches!(err, Error::NonceMismatch(_)));

        // expired nonce
        let mut expired = session(SessionState::AccessTokenCreated);
        expired.c_nonce_expires_at =
            Some(Utc::now() - TimeDelta::try_seconds(1).unwrap_or_default());
        let err =
            validate_for_credential(&expired, &request, "nonce").expect_err("should reject");
        assert!(matches!(err, Error::NonceExpired(_)));

        // missing proof
        let no_proof: CredentialRequest = serde_json::from_value(json!({
            "credential_identifier": "A",
            "c_nonce": "nonce"
        }))
        .expect("should deserialize");
        let err =
            validate_for_credential(&session(SessionState::AccessTokenCreated), &no_proof, "nonce")
                .expect_err("should reject");
        assert!(matches!(err, Error::MissingProof(_)));
    }
}
