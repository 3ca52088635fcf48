//! # Issuance Sessions
//!
//! A session persists the state of one issuance flow from offer creation
//! through credential delivery. The store (see
//! [`crate::provider::SessionStore`]) is the only source of truth; handlers
//! re-read a session before every transition.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::types::{
    CredentialOffer, CredentialOfferDraft11, OfferPayload, OfferVersion, TxCode,
};

/// Protocol state of an issuance session.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// The offer has been created and persisted.
    #[default]
    OfferCreated,

    /// The wallet has dereferenced the offer URI.
    OfferUriRetrieved,

    /// The wallet has presented the pre-authorized code at the token
    /// endpoint.
    AccessTokenRequested,

    /// The token endpoint has issued an access token and a `c_nonce`.
    AccessTokenCreated,

    /// A credential request has been received and validated.
    CredentialRequestReceived,

    /// Some, but not all, offered configurations have been issued.
    CredentialsPartiallyIssued,

    /// Every offered configuration has been issued.
    Completed,

    /// The flow failed server-side; `error_message` carries the cause.
    Error,
}

/// Per-flow issuance state, persisted across requests.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct IssuanceSession {
    /// Opaque session identifier.
    pub id: String,

    /// The issuer this session belongs to.
    pub issuer_id: String,

    /// The URL the wallet dereferences to obtain the offer payload. Unique
    /// per issuer.
    pub credential_offer_uri: String,

    /// The offer payload in its canonical draft 13 shape.
    pub offer: CredentialOffer,

    /// The draft 11 projection, persisted when the offer was created for
    /// draft 11.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_draft11: Option<CredentialOfferDraft11>,

    /// The pre-authorized code the wallet exchanges for an access token.
    pub pre_authorized_code: String,

    /// Transaction code descriptor. Present iff the End-User must present a
    /// PIN at the token endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_code: Option<TxCode>,

    /// Opaque metadata attached at offer creation and carried through to the
    /// credential mapper.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub issuance_metadata: Map<String, Value>,

    /// Protocol state.
    pub state: SessionState,

    /// The challenge the wallet must echo inside its proof JWT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,

    /// Expiry of `c_nonce`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_at: Option<DateTime<Utc>>,

    /// Configuration ids already delivered in this session, in issuance
    /// order.
    #[serde(default)]
    pub issued_credentials: Vec<String>,

    /// Cause of failure. Set iff `state` is [`SessionState::Error`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl IssuanceSession {
    /// The configuration ids offered by this session.
    #[must_use]
    pub fn offered_ids(&self) -> &[String] {
        &self.offer.credential_configuration_ids
    }

    /// The protocol draft the offer was created for.
    #[must_use]
    pub const fn version(&self) -> OfferVersion {
        if self.offer_draft11.is_some() {
            OfferVersion::Draft11
        } else {
            OfferVersion::Draft13
        }
    }

    /// The offer payload in the shape it was created for.
    #[must_use]
    pub fn offer_payload(&self) -> OfferPayload {
        match &self.offer_draft11 {
            Some(offer) => OfferPayload::Draft11(offer.clone()),
            None => OfferPayload::Draft13(self.offer.clone()),
        }
    }

    /// Whether the End-User must present a PIN at the token endpoint.
    #[must_use]
    pub const fn user_pin_required(&self) -> bool {
        self.tx_code.is_some()
    }

    /// Whether the session is in a state that accepts credential requests.
    #[must_use]
    pub const fn accepts_credential_requests(&self) -> bool {
        matches!(
            self.state,
            SessionState::AccessTokenCreated
                | SessionState::CredentialRequestReceived
                | SessionState::CredentialsPartiallyIssued
        )
    }

    /// Whether the session's `c_nonce` is set and not yet expired.
    #[must_use]
    pub fn nonce_is_live(&self, now: DateTime<Utc>) -> bool {
        self.c_nonce.is_some() && self.c_nonce_expires_at.is_some_and(|expires| expires > now)
    }

    /// Offered configuration ids not yet issued in this session.
    #[must_use]
    pub fn remaining_offered(&self) -> Vec<&String> {
        self.offered_ids().iter().filter(|id| !self.issued_credentials.contains(id)).collect()
    }

    /// Record the wallet's first retrieval of the offer URI. Later
    /// retrievals leave the state untouched.
    pub fn offer_retrieved(&mut self) {
        if matches!(self.state, SessionState::OfferCreated) {
            self.state = SessionState::OfferUriRetrieved;
        }
    }

    /// Record the wallet presenting the pre-authorized code at the token
    /// endpoint.
    pub fn token_requested(&mut self) {
        self.state = SessionState::AccessTokenRequested;
    }

    /// Record the token endpoint issuing an access token along with a fresh
    /// `c_nonce`.
    pub fn token_issued(&mut self, c_nonce: impl Into<String>, expires_at: DateTime<Utc>) {
        self.state = SessionState::AccessTokenCreated;
        self.c_nonce = Some(c_nonce.into());
        self.c_nonce_expires_at = Some(expires_at);
    }

    /// Replace the session's `c_nonce` with a fresh value.
    pub fn rotate_nonce(&mut self, c_nonce: impl Into<String>, expires_at: DateTime<Utc>) {
        self.c_nonce = Some(c_nonce.into());
        self.c_nonce_expires_at = Some(expires_at);
    }

    /// Consume an offered configuration ahead of signing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOffered`] when the configuration is not part of
    /// the offer and [`Error::AlreadyIssued`] when it was already consumed in
    /// this session.
    pub fn record_issued(&mut self, configuration_id: &str) -> crate::Result<()> {
        if !self.offered_ids().iter().any(|id| id == configuration_id) {
            return Err(Error::NotOffered(format!(
                "configuration {configuration_id} is not part of the offer"
            )));
        }
        if self.issued_credentials.iter().any(|id| id == configuration_id) {
            return Err(Error::AlreadyIssued(format!(
                "configuration {configuration_id} already issued in this session"
            )));
        }
        self.issued_credentials.push(configuration_id.to_string());
        Ok(())
    }

    /// Advance the state after a successful issuance: partially issued while
    /// offered configurations remain, completed otherwise.
    pub fn advance(&mut self) {
        self.state = if self.remaining_offered().is_empty() {
            SessionState::Completed
        } else {
            SessionState::CredentialsPartiallyIssued
        };
    }

    /// Move the session to its error state.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = SessionState::Error;
        self.error_message = Some(message.into());
    }
}

/// Expiry durations used across the issuance flow.
pub enum Expire {
    /// `c_nonce` lifetime.
    Nonce,
}

impl Expire {
    /// Duration before expiry.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        match self {
            Self::Nonce => TimeDelta::try_minutes(10).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> IssuanceSession {
        IssuanceSession {
            id: "session-1".into(),
            issuer_id: "https://issuer.example.com".into(),
            credential_offer_uri: "https://issuer.example.com/credential_offer/1".into(),
            offer: CredentialOffer {
                credential_issuer: "https://issuer.example.com".into(),
                credential_configuration_ids: vec!["A".into(), "B".into()],
                grants: None,
            },
            pre_authorized_code: "code".into(),
            ..IssuanceSession::default()
        }
    }

    #[test]
    fn issuance_progress() {
        let mut session = session();
        session.token_issued("nonce", Utc::now() + Expire::Nonce.duration());
        assert!(session.accepts_credential_requests());
        assert!(session.nonce_is_live(Utc::now()));

        session.record_issued("A").expect("should record");
        session.advance();
        assert_eq!(session.state, SessionState::CredentialsPartiallyIssued);
        assert_eq!(session.remaining_offered(), vec!["B"]);

        session.record_issued("B").expect("should record");
        session.advance();
        assert_eq!(session.state, SessionState::Completed);
    }

    #[test]
    fn issued_must_be_offered() {
        let mut session = session();
        let err = session.record_issued("C").expect_err("should reject");
        assert!(matches!(err, Error::NotOffered(_)));
        assert!(session.issued_credentials.is_empty());
    }

    #[test]
    fn issued_once_per_session() {
        let mut session = session();
        session.record_issued("A").expect("should record");
        let err = session.record_issued("A").expect_err("should reject");
        assert!(matches!(err, Error::AlreadyIssued(_)));
        assert_eq!(session.issued_credentials, vec!["A"]);
    }

    #[test]
    fn offer_retrieval_is_idempotent() {
        let mut session = session();
        session.offer_retrieved();
        assert_eq!(session.state, SessionState::OfferUriRetrieved);

        session.token_requested();
        session.offer_retrieved();
        assert_eq!(session.state, SessionState::AccessTokenRequested);
    }

    #[test]
    fn expired_nonce_is_not_live() {
        let mut session = session();
        session.token_issued("nonce", Utc::now() - TimeDelta::try_seconds(1).unwrap_or_default());
        assert!(!session.nonce_is_live(Utc::now()));
    }
}
