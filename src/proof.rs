//! # Proof JWT Decoding
//!
//! Structural decoding of the wallet's compact JWS: protected header and
//! claims only. Signature verification is delegated to the host through
//! [`crate::provider::JwsVerifier`].

use anyhow::{Result, anyhow};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::did::PublicKeyJwk;
use crate::types::ProofClaims;

/// The JWT `typ` expected on key-possession proofs.
pub const PROOF_JWT_TYPE: &str = "openid4vci-proof+jwt";

/// The protected header of a proof JWS. Exactly one of `kid` and `jwk`
/// identifies the holder's key.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProtectedHeader {
    /// The signing algorithm.
    pub alg: String,

    /// The JWT type, expected to be `openid4vci-proof+jwt`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// DID URL of the holder's verification method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// The holder's public key, inlined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<PublicKeyJwk>,
}

/// Decode the protected header of a compact JWS.
///
/// # Errors
///
/// Returns an error when the JWS is not three base64url segments or the
/// header is not valid JSON.
pub fn decode_header(compact_jws: &str) -> Result<ProtectedHeader> {
    decode_part(compact_jws, 0)
}

/// Decode the claims of a proof JWS.
///
/// # Errors
///
/// Returns an error when the JWS is not three base64url segments or the
/// payload is not valid JSON.
pub fn decode_claims(compact_jws: &str) -> Result<ProofClaims> {
    decode_part(compact_jws, 1)
}

fn decode_part<T: DeserializeOwned>(compact_jws: &str, index: usize) -> Result<T> {
    let parts: Vec<&str> = compact_jws.split('.').collect();
    if parts.len() != 3 {
        return Err(anyhow!("compact JWS must have 3 segments, found {}", parts.len()));
    }
    let bytes = Base64UrlUnpadded::decode_vec(parts[index])
        .map_err(|e| anyhow!("issue decoding JWS segment: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| anyhow!("issue deserializing JWS segment: {e}"))
}
