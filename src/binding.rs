//! # Holder Binding
//!
//! Extracts the cryptographic link between the credential to issue and a key
//! controlled by the wallet, from the proof JWT's protected header. The
//! header identifies the holder key with exactly one of `kid` (a DID URL
//! dereferenced under `assertionMethod`) or an inline `jwk`.
//!
//! The proof's signature is verified separately (see [`verify_proof`]),
//! sharing the DID resolution rule but permitting `authentication` as well
//! as `assertionMethod` usage.

use crate::did::{KeyPurpose, PublicKeyJwk};
use crate::error::Error;
use crate::proof;
use crate::provider::{DidResolver, JwsVerifier};
use crate::types::CredentialRequest;

/// The holder binding of a credential request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HolderBinding {
    /// The holder is bound through a DID verification method.
    Did {
        /// The DID URL of the verification method, as sent in the proof's
        /// `kid`.
        did_url: String,

        /// The dereferenced public key.
        key: PublicKeyJwk,
    },

    /// The holder is bound through a raw JWK.
    Jwk {
        /// The key from the proof's protected header.
        jwk: PublicKeyJwk,
    },
}

impl HolderBinding {
    /// The holder's public key.
    #[must_use]
    pub const fn key(&self) -> &PublicKeyJwk {
        match self {
            Self::Did { key, .. } => key,
            Self::Jwk { jwk } => jwk,
        }
    }

    /// The holder's DID (the `kid` stripped of its fragment), when the
    /// binding is DID-based.
    #[must_use]
    pub fn did(&self) -> Option<&str> {
        match self {
            Self::Did { did_url, .. } => did_url.split('#').next(),
            Self::Jwk { .. } => None,
        }
    }
}

/// Extract the holder binding from a credential request's proof JWT.
///
/// # Errors
///
/// Returns [`Error::MissingProof`] when the request carries no proof,
/// [`Error::UnsupportedKidScheme`] / [`Error::AmbiguousKid`] for a `kid`
/// that is not a DID URL with a verification-method fragment, and
/// [`Error::InvalidProof`] for a malformed header.
pub async fn extract_binding(
    resolver: &impl DidResolver, request: &CredentialRequest,
) -> crate::Result<HolderBinding> {
    let Some(proof) = &request.proof else {
        return Err(Error::MissingProof("credential request has no proof".into()));
    };
    let header = proof::decode_header(proof.jwt())
        .map_err(|e| Error::InvalidProof(format!("issue decoding proof JWT: {e}")))?;

    match (header.kid, header.jwk) {
        (Some(_), Some(_)) => {
            Err(Error::InvalidProof("proof header must not carry both `kid` and `jwk`".into()))
        }
        (None, None) => {
            Err(Error::InvalidProof("proof header must carry one of `kid` or `jwk`".into()))
        }
        (Some(kid), None) => {
            let key = dereference_did_key(resolver, &kid, &[KeyPurpose::AssertionMethod]).await?;
            Ok(HolderBinding::Did { did_url: kid, key })
        }
        (None, Some(jwk)) => Ok(HolderBinding::Jwk { jwk }),
    }
}

/// Verify the signature of a credential request's proof JWT, resolving the
/// signing key under the `authentication` or `assertionMethod` relationship.
///
/// # Errors
///
/// Returns [`Error::InvalidProof`] when the signature does not verify, plus
/// the same header errors as [`extract_binding`].
pub async fn verify_proof(
    provider: &(impl DidResolver + JwsVerifier), request: &CredentialRequest,
) -> crate::Result<()> {
    let Some(proof) = &request.proof else {
        return Err(Error::MissingProof("credential request has no proof".into()));
    };
    let header = proof::decode_header(proof.jwt())
        .map_err(|e| Error::InvalidProof(format!("issue decoding proof JWT: {e}")))?;

    let key = match (header.kid, header.jwk) {
        (Some(kid), None) => {
            dereference_did_key(
                provider,
                &kid,
                &[KeyPurpose::Authentication, KeyPurpose::AssertionMethod],
            )
            .await?
        }
        (None, Some(jwk)) => jwk,
        _ => {
            return Err(Error::InvalidProof(
                "proof header must carry exactly one of `kid` or `jwk`".into(),
            ));
        }
    };

    JwsVerifier::verify(provider, proof.jwt(), &key)
        .await
        .map_err(|e| Error::InvalidProof(format!("proof signature did not verify: {e}")))
}

// Resolve a `kid` DID URL and dereference its key under the given purposes.
async fn dereference_did_key(
    resolver: &impl DidResolver, kid: &str, purposes: &[KeyPurpose],
) -> crate::Result<PublicKeyJwk> {
    if !kid.starts_with("did:") {
        return Err(Error::UnsupportedKidScheme(format!("proof `kid` is not a DID URL: {kid}")));
    }
    if !kid.contains('#') {
        return Err(Error::AmbiguousKid(format!(
            "proof `kid` does not name a verification method: {kid}"
        )));
    }

    let document = resolver
        .resolve(kid)
        .await
        .map_err(|e| Error::InvalidProof(format!("issue resolving {kid}: {e}")))?;
    document
        .dereference_key(kid, purposes)
        .map_err(|e| Error::InvalidProof(format!("issue dereferencing {kid}: {e}")))
}

#[cfg(test)]
mod tests {
    use base64ct::{Base64UrlUnpadded, Encoding};
    use serde_json::json;

    use super::*;
    use crate::did::Document;

    #[derive(Clone)]
    struct Resolver;

    impl DidResolver for Resolver {
        async fn resolve(&self, _did_url: &str) -> anyhow::Result<Document> {
            Ok(serde_json::from_value(json!({
                "id": "did:example:alice",
                "verificationMethod": [{
                    "id": "did:example:alice#key-1",
                    "type": "JsonWebKey2020",
                    "controller": "did:example:alice",
                    "publicKeyJwk": { "kty": "OKP", "crv": "Ed25519", "x": "8Qob..." }
                }],
                "authentication": ["did:example:alice#key-1"],
                "assertionMethod": ["did:example:alice#key-1"]
            }))
            .expect("should deserialize"))
        }
    }

    fn request(header: &serde_json::Value) -> CredentialRequest {
        let header = Base64UrlUnpadded::encode_string(
            &serde_json::to_vec(header).expect("should serialize"),
        );
        let claims = Base64UrlUnpadded::encode_string(b"{\"aud\":\"iss\",\"iat\":0}");
        serde_json::from_value(json!({
            "format": "vc+sd-jwt",
            "vct": "UniversityDegree_SD",
            "proof": { "proof_type": "jwt", "jwt": format!("{header}.{claims}.c2ln") }
        }))
        .expect("should deserialize")
    }

    #[tokio::test]
    async fn did_binding() {
        let request = request(&json!({ "alg": "EdDSA", "kid": "did:example:alice#key-1" }));
        let binding = extract_binding(&Resolver, &request).await.expect("should extract");

        assert_eq!(binding.did(), Some("did:example:alice"));
        assert_eq!(binding.key().kty, "OKP");
    }

    #[tokio::test]
    async fn jwk_binding() {
        let request = request(&json!({
            "alg": "EdDSA",
            "jwk": { "kty": "OKP", "crv": "Ed25519", "x": "8Qob..." }
        }));
        let binding = extract_binding(&Resolver, &request).await.expect("should extract");

        assert_eq!(binding.did(), None);
        assert_eq!(binding.key().crv, "Ed25519");
    }

    #[tokio::test]
    async fn kid_must_be_a_did() {
        let request = request(&json!({ "alg": "ES256", "kid": "urn:example:key-1" }));
        let err = extract_binding(&Resolver, &request).await.expect_err("should reject");
        assert!(matches!(err, Error::UnsupportedKidScheme(_)));
    }

    #[tokio::test]
    async fn kid_must_name_a_fragment() {
        let request = request(&json!({ "alg": "EdDSA", "kid": "did:example:alice" }));
        let err = extract_binding(&Resolver, &request).await.expect_err("should reject");
        assert!(matches!(err, Error::AmbiguousKid(_)));
    }

    #[tokio::test]
    async fn exactly_one_of_kid_or_jwk() {
        let req = request(&json!({
            "alg": "EdDSA",
            "kid": "did:example:alice#key-1",
            "jwk": { "kty": "OKP", "crv": "Ed25519", "x": "8Qob..." }
        }));
        let err = extract_binding(&Resolver, &req).await.expect_err("should reject");
        assert!(matches!(err, Error::InvalidProof(_)));

        let req = request(&json!({ "alg": "EdDSA" }));
        let err = extract_binding(&Resolver, &req).await.expect_err("should reject");
        assert!(matches!(err, Error::InvalidProof(_)));
    }
}
