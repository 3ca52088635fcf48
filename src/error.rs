//! # Errors
//!
//! Errors raised while driving a credential issuance flow. Each variant
//! renders as the OAuth/OID4VCI wire shape
//! `{"error": "<code>", "error_description": "..."}`.
//!
//! Only [`Error::SignerProducedNothing`] and [`Error::DeferredUnsupported`]
//! move a session to its error state; every other failure leaves the session
//! untouched so the wallet may retry with a corrected request.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Issuance flow errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Offer construction constraints were violated: no credentials, a
    /// duplicate or unsupported configuration id, or an inconsistent
    /// PIN/transaction-code combination. No session is written.
    #[error(r#"{{"error": "invalid_request", "error_description": "{0}"}}"#)]
    InvalidOffer(String),

    /// The session is not in a state that accepts credential requests.
    #[error(r#"{{"error": "invalid_grant", "error_description": "{0}"}}"#)]
    InvalidState(String),

    /// The Credential Request did not contain a proof.
    #[error(r#"{{"error": "invalid_proof", "error_description": "{0}"}}"#)]
    MissingProof(String),

    /// No `c_nonce` was found in the request, the proof object, or the proof
    /// JWT claims.
    #[error(r#"{{"error": "invalid_request", "error_description": "{0}"}}"#)]
    MissingNonce(String),

    /// The `c_nonce` presented by the wallet does not match the session's.
    #[error(r#"{{"error": "invalid_grant", "error_description": "{0}"}}"#)]
    NonceMismatch(String),

    /// The session's `c_nonce` has expired; the wallet must obtain a fresh
    /// one.
    #[error(r#"{{"error": "invalid_grant", "error_description": "{0}"}}"#)]
    NonceExpired(String),

    /// The requested `credential_identifier` is not part of this session's
    /// offer.
    #[error(r#"{{"error": "unsupported_credential_type", "error_description": "{0}"}}"#)]
    NotOffered(String),

    /// No offered configuration satisfies the request's format and type
    /// descriptors.
    #[error(r#"{{"error": "unsupported_credential_type", "error_description": "{0}"}}"#)]
    NoMatchingOffer(String),

    /// The mapper's sign options disagree with the request's format.
    #[error(r#"{{"error": "unsupported_credential_format", "error_description": "{0}"}}"#)]
    FormatMismatch(String),

    /// The configuration has already been issued in this session.
    #[error(r#"{{"error": "invalid_credential_request", "error_description": "{0}"}}"#)]
    AlreadyIssued(String),

    /// The signer returned no credential. The session is moved to its error
    /// state.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    SignerProducedNothing(String),

    /// The signer attempted to defer issuance (`acceptance_token` /
    /// `transaction_id`), which is not supported. The session is moved to its
    /// error state.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    DeferredUnsupported(String),

    /// No session matched the lookup.
    #[error(r#"{{"error": "invalid_grant", "error_description": "{0}"}}"#)]
    NotFound(String),

    /// More than one session matched a single-row lookup — a data-model
    /// violation.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    AmbiguousSession(String),

    /// The proof JWT's `kid` is not a DID URL.
    #[error(r#"{{"error": "invalid_proof", "error_description": "{0}"}}"#)]
    UnsupportedKidScheme(String),

    /// The proof JWT's `kid` does not name a verification method fragment.
    #[error(r#"{{"error": "invalid_proof", "error_description": "{0}"}}"#)]
    AmbiguousKid(String),

    /// The proof was malformed or its signature did not verify.
    #[error(r#"{{"error": "invalid_proof", "error_description": "{0}"}}"#)]
    InvalidProof(String),

    /// The signing key supports no JWA signature algorithm.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    NoSupportedAlgorithm(String),

    /// The server encountered an unexpected condition that prevented it from
    /// fulfilling the request.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    ServerError(String),
}

impl Error {
    /// The OAuth/OID4VCI error code the variant maps to on the wire.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidOffer(_) | Self::MissingNonce(_) => "invalid_request",
            Self::InvalidState(_)
            | Self::NonceMismatch(_)
            | Self::NonceExpired(_)
            | Self::NotFound(_) => "invalid_grant",
            Self::MissingProof(_)
            | Self::UnsupportedKidScheme(_)
            | Self::AmbiguousKid(_)
            | Self::InvalidProof(_) => "invalid_proof",
            Self::NotOffered(_) | Self::NoMatchingOffer(_) => "unsupported_credential_type",
            Self::FormatMismatch(_) => "unsupported_credential_format",
            Self::AlreadyIssued(_) => "invalid_credential_request",
            Self::SignerProducedNothing(_)
            | Self::DeferredUnsupported(_)
            | Self::AmbiguousSession(_)
            | Self::NoSupportedAlgorithm(_)
            | Self::ServerError(_) => "server_error",
        }
    }

    /// The human-readable error description.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::InvalidOffer(d)
            | Self::InvalidState(d)
            | Self::MissingProof(d)
            | Self::MissingNonce(d)
            | Self::NonceMismatch(d)
            | Self::NonceExpired(d)
            | Self::NotOffered(d)
            | Self::NoMatchingOffer(d)
            | Self::FormatMismatch(d)
            | Self::AlreadyIssued(d)
            | Self::SignerProducedNothing(d)
            | Self::DeferredUnsupported(d)
            | Self::NotFound(d)
            | Self::AmbiguousSession(d)
            | Self::UnsupportedKidScheme(d)
            | Self::AmbiguousKid(d)
            | Self::InvalidProof(d)
            | Self::NoSupportedAlgorithm(d)
            | Self::ServerError(d) => d,
        }
    }

    /// Whether this failure moves the session to its error state.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SignerProducedNothing(_) | Self::DeferredUnsupported(_))
    }
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("error", self.code())?;
        map.serialize_entry("error_description", self.description())?;
        map.end()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Self>() {
            Ok(err) => err,
            Err(err) => {
                let source = err.source().map_or_else(String::new, ToString::to_string);
                Self::ServerError(format!("{err}: {source}"))
            }
        }
    }
}
