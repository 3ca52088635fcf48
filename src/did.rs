//! # DID Documents
//!
//! A minimal DID document model, sufficient to dereference verification
//! methods under a verification relationship. Resolution itself is performed
//! by the host through [`crate::provider::DidResolver`].

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::types::Kind;

/// A DID document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The DID for a particular DID subject.
    pub id: String,

    /// If set, MUST be a set of verification methods for the DID subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<Vec<VerificationMethod>>,

    /// The `authentication` verification relationship is used to specify how
    /// the DID subject is expected to be authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Vec<Kind<VerificationMethod>>>,

    /// The `assertion_method` verification relationship is used to specify
    /// how the DID subject is expected to express claims, such as for the
    /// purposes of issuing a Verifiable Credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_method: Option<Vec<Kind<VerificationMethod>>>,
}

/// Verification relationships a key can be dereferenced under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPurpose {
    /// The `authentication` relationship.
    Authentication,

    /// The `assertionMethod` relationship.
    AssertionMethod,
}

impl Document {
    /// Dereference a verification method by its DID URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the document contains no verification method
    /// with the given id.
    pub fn dereference_verification_method(&self, did_url: &str) -> Result<&VerificationMethod> {
        self.verification_method
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|vm| vm.id == did_url)
            .ok_or_else(|| anyhow!("no verification method {did_url} in DID document"))
    }

    /// Dereference the public key of a verification method, requiring the
    /// method to be permitted for at least one of the given purposes.
    ///
    /// # Errors
    ///
    /// Returns an error when the method does not exist, is not referenced
    /// from any of the purpose relationships, or carries no JWK.
    pub fn dereference_key(&self, did_url: &str, purposes: &[KeyPurpose]) -> Result<PublicKeyJwk> {
        let permitted = purposes.iter().any(|purpose| {
            let relationship = match purpose {
                KeyPurpose::Authentication => self.authentication.as_deref(),
                KeyPurpose::AssertionMethod => self.assertion_method.as_deref(),
            };
            relationship.unwrap_or_default().iter().any(|entry| match entry {
                Kind::String(id) => id == did_url,
                Kind::Object(vm) => vm.id == did_url,
            })
        });
        if !permitted {
            return Err(anyhow!("verification method {did_url} not permitted for purpose"));
        }

        // the method may be embedded in a relationship rather than listed
        let method = self.dereference_verification_method(did_url).ok().or_else(|| {
            [self.authentication.as_deref(), self.assertion_method.as_deref()]
                .into_iter()
                .flatten()
                .flatten()
                .find_map(|entry| match entry {
                    Kind::Object(vm) if vm.id == did_url => Some(vm),
                    _ => None,
                })
        });
        let Some(method) = method else {
            return Err(anyhow!("no verification method {did_url} in DID document"));
        };

        method
            .public_key_jwk
            .clone()
            .ok_or_else(|| anyhow!("verification method {did_url} carries no JWK"))
    }
}

/// A DID document verification method: a cryptographic public key which can
/// be used to authenticate or authorize interactions with the DID subject.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// A DID URL that identifies the verification method.
    pub id: String,

    /// References a verification method type registered in the
    /// [DID Specification Registries](https://www.w3.org/TR/did-spec-registries/).
    #[serde(rename = "type")]
    pub type_: String,

    /// The DID of the controller of the verification method.
    pub controller: String,

    /// The public key material for the verification method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<PublicKeyJwk>,
}

/// A public key expressed as a JWK.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PublicKeyJwk {
    /// Key type, e.g. "OKP" or "EC".
    pub kty: String,

    /// Cryptographic curve.
    pub crv: String,

    /// Base64url-encoded x coordinate.
    pub x: String,

    /// Base64url-encoded y coordinate, for curves that carry one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// The algorithm intended for use with the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl PublicKeyJwk {
    /// The JWA signature algorithms the key supports, most preferred first.
    /// An explicit `alg` takes precedence over the curve's defaults.
    #[must_use]
    pub fn signing_algorithms(&self) -> Vec<&str> {
        if let Some(alg) = &self.alg {
            return vec![alg.as_str()];
        }
        match (self.kty.as_str(), self.crv.as_str()) {
            ("OKP", "Ed25519") => vec!["EdDSA"],
            ("EC", "P-256") => vec!["ES256"],
            ("EC", "P-384") => vec!["ES384"],
            ("EC", "secp256k1") => vec!["ES256K"],
            _ => vec![],
        }
    }
}
