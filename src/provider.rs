//! # Provider Traits
//!
//! The collaborators a host must supply: issuer records, session
//! persistence, DID resolution, JWS verification, the
//! request-to-credential mapper, and the three format signing services.
//! Everything cryptographic or storage-backed lives behind these traits.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use crate::binding::HolderBinding;
use crate::did::{Document, PublicKeyJwk};
use crate::session::IssuanceSession;
use crate::types::{
    CredentialConfiguration, CredentialFormat, CredentialRequest, CredentialSupported, Issuer,
    OfferPayload, SignOptions, SignerResponse, W3cCredential,
};

/// Result type for provider callbacks.
pub type Result<T> = anyhow::Result<T>;

/// Issuer Provider trait.
pub trait Provider:
    Metadata
    + SessionStore
    + DidResolver
    + JwsVerifier
    + CredentialMapper
    + W3cCredentialService
    + SdJwtVcService
    + MdocService
    + Clone
{
}

/// A blanket implementation for `Provider` trait so that any type
/// implementing the required super traits is considered a `Provider`.
impl<T> Provider for T where
    T: Metadata
        + SessionStore
        + DidResolver
        + JwsVerifier
        + CredentialMapper
        + W3cCredentialService
        + SdJwtVcService
        + MdocService
        + Clone
{
}

/// The `Metadata` trait is used by implementers to provide Credential Issuer
/// records to the library.
pub trait Metadata: Send + Sync {
    /// The issuer record for the specified issuer.
    fn issuer(&self, issuer_id: &str) -> impl Future<Output = Result<Issuer>> + Send;

    /// Replace an issuer record, e.g. on access-token key rotation. In-flight
    /// access tokens signed with the previous key remain valid until their
    /// own expiry.
    fn update_issuer(&self, issuer: &Issuer) -> impl Future<Output = Result<()>> + Send;
}

/// Correlation keys for single-row session lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionFilter {
    /// Restrict to sessions of this issuer.
    pub issuer_id: Option<String>,

    /// Match on the offer URI.
    pub credential_offer_uri: Option<String>,

    /// Match on the live `c_nonce`.
    pub c_nonce: Option<String>,

    /// Match on the pre-authorized code.
    pub pre_authorized_code: Option<String>,
}

impl SessionFilter {
    /// Filter on a `c_nonce`.
    #[must_use]
    pub fn by_c_nonce(c_nonce: impl Into<String>) -> Self {
        Self {
            c_nonce: Some(c_nonce.into()),
            ..Self::default()
        }
    }

    /// Filter on an offer URI.
    #[must_use]
    pub fn by_offer_uri(credential_offer_uri: impl Into<String>) -> Self {
        Self {
            credential_offer_uri: Some(credential_offer_uri.into()),
            ..Self::default()
        }
    }

    /// Filter on a pre-authorized code.
    #[must_use]
    pub fn by_pre_authorized_code(code: impl Into<String>) -> Self {
        Self {
            pre_authorized_code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Additionally restrict the filter to one issuer.
    #[must_use]
    pub fn issuer(mut self, issuer_id: impl Into<String>) -> Self {
        self.issuer_id = Some(issuer_id.into());
        self
    }

    /// Whether a session satisfies every set correlation key. Store
    /// implementations without a query engine can filter with this directly.
    #[must_use]
    pub fn matches(&self, session: &IssuanceSession) -> bool {
        self.issuer_id.as_ref().is_none_or(|id| &session.issuer_id == id)
            && self
                .credential_offer_uri
                .as_ref()
                .is_none_or(|uri| &session.credential_offer_uri == uri)
            && self.c_nonce.as_ref().is_none_or(|nonce| session.c_nonce.as_ref() == Some(nonce))
            && self
                .pre_authorized_code
                .as_ref()
                .is_none_or(|code| &session.pre_authorized_code == code)
    }
}

/// The `SessionStore` trait is implemented to provide persistence for
/// issuance sessions. It is the serialization point for session mutations.
pub trait SessionStore: Send + Sync {
    /// Persist a new session. MUST reject a session whose
    /// `(issuer_id, credential_offer_uri)` pair collides with an existing
    /// one.
    fn create(&self, session: &IssuanceSession) -> impl Future<Output = Result<()>> + Send;

    /// Retrieve a session by id.
    fn session(&self, id: &str) -> impl Future<Output = Result<Option<IssuanceSession>>> + Send;

    /// Retrieve every session matching the filter. Callers treat more than
    /// one row as a data-model violation.
    fn find(
        &self, filter: &SessionFilter,
    ) -> impl Future<Output = Result<Vec<IssuanceSession>>> + Send;

    /// Replace a session by id, last-writer-wins. A transactional store
    /// should additionally reject an update whose `issued_credentials` would
    /// drop an id already persisted, turning the duplicate-issuance guard
    /// into a conditional update.
    fn update(&self, session: &IssuanceSession) -> impl Future<Output = Result<()>> + Send;
}

/// Resolution of DID documents, supplied by the host.
pub trait DidResolver: Send + Sync {
    /// Resolve the DID document for a DID URL (the fragment, if any, is
    /// ignored).
    fn resolve(&self, did_url: &str) -> impl Future<Output = Result<Document>> + Send;
}

/// Verification of compact JWS signatures, supplied by the host.
pub trait JwsVerifier: Send + Sync {
    /// Verify the signature of a compact JWS against the given public key.
    fn verify(&self, compact_jws: &str, jwk: &PublicKeyJwk)
    -> impl Future<Output = Result<()>> + Send;
}

/// Everything the host-supplied mapper needs to turn an accepted credential
/// request into sign options.
#[derive(Clone, Debug)]
pub struct MapRequest {
    /// The issuance session, including its `issuance_metadata`.
    pub session: IssuanceSession,

    /// The holder binding extracted from the proof JWT.
    pub holder: HolderBinding,

    /// The offer payload in the draft shape it was created for.
    pub offer: OfferPayload,

    /// The wallet's credential request.
    pub request: CredentialRequest,

    /// The configuration satisfying the request. The matcher reduces an
    /// ambiguous match to the first in offer order, so this holds exactly
    /// one entry.
    pub matched: Vec<(String, CredentialConfiguration)>,

    /// The matched configurations projected into the draft 11 shape, for
    /// sessions created for draft 11.
    pub matched_draft11: Option<Vec<CredentialSupported>>,
}

impl MapRequest {
    /// The matched configuration ids, in offer order.
    #[must_use]
    pub fn configuration_ids(&self) -> Vec<&str> {
        self.matched.iter().map(|(id, _)| id.as_str()).collect()
    }
}

/// The host-supplied mapper from an accepted credential request to the
/// credential payload to sign.
pub trait CredentialMapper: Send + Sync {
    /// Produce sign options for the request. The returned
    /// `credential_configuration_id` must be one of the matched ids.
    fn sign_options(&self, request: MapRequest)
    -> impl Future<Output = Result<SignOptions>> + Send;
}

/// Parameters for signing a W3C credential.
#[derive(Clone, Debug)]
pub struct W3cSignRequest {
    /// The credential payload, with the holder imprinted as subject.
    pub credential: W3cCredential,

    /// The securing mechanism to apply: `jwt_vc_json`, `jwt_vc_json-ld` or
    /// `ldp_vc`.
    pub format: CredentialFormat,

    /// DID URL of the issuer verification method to sign with.
    pub verification_method: String,

    /// The JWA algorithm for JWT-secured credentials.
    pub algorithm: Option<String>,

    /// The Data-Integrity cryptosuite for `ldp_vc` credentials.
    pub cryptosuite: Option<String>,
}

/// The host's W3C credential signing service.
pub trait W3cCredentialService: Send + Sync {
    /// Sign a W3C credential.
    fn sign(&self, request: W3cSignRequest) -> impl Future<Output = Result<SignerResponse>> + Send;
}

/// Parameters for signing an SD-JWT VC.
#[derive(Clone, Debug)]
pub struct SdJwtSignRequest {
    /// The SD-JWT claims set, carrying `vct`.
    pub payload: Map<String, Value>,

    /// The holder's key, for the `cnf` confirmation claim.
    pub holder_key: Option<PublicKeyJwk>,

    /// DID URL of the issuer verification method to sign with.
    pub verification_method: String,
}

/// The host's SD-JWT VC signing service.
pub trait SdJwtVcService: Send + Sync {
    /// Sign an SD-JWT VC.
    fn sign(&self, request: SdJwtSignRequest)
    -> impl Future<Output = Result<SignerResponse>> + Send;
}

/// Parameters for signing an ISO mdoc.
#[derive(Clone, Debug)]
pub struct MdocSignRequest {
    /// The mdoc document type.
    pub doctype: String,

    /// Claims keyed by element identifier.
    pub claims: Map<String, Value>,

    /// The holder's device key.
    pub device_key: Option<PublicKeyJwk>,

    /// DID URL of the issuer verification method to sign with.
    pub verification_method: String,
}

/// The host's ISO mdoc signing service.
pub trait MdocService: Send + Sync {
    /// Sign an mdoc.
    fn sign(&self, request: MdocSignRequest)
    -> impl Future<Output = Result<SignerResponse>> + Send;
}

/// Maps opaque context correlation ids to issuer ids so an HTTP router can
/// direct inbound requests to the issuer they belong to. Constructed by the
/// host and passed where needed, never process-wide.
#[derive(Clone, Debug, Default)]
pub struct ContextRegistry {
    issuers: Arc<RwLock<HashMap<String, String>>>,
}

impl ContextRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a context correlation id with an issuer.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    pub fn register(&self, context_id: impl Into<String>, issuer_id: impl Into<String>) {
        self.issuers
            .write()
            .expect("should lock")
            .insert(context_id.into(), issuer_id.into());
    }

    /// The issuer registered for a context correlation id.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    #[must_use]
    pub fn issuer_id(&self, context_id: &str) -> Option<String> {
        self.issuers.read().expect("should lock").get(context_id).cloned()
    }
}
