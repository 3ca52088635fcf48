//! # Format Signers
//!
//! Built-in adapters from accepted sign options to the host's format
//! signing services. The adapters prepare format specifics — JWA algorithm
//! selection, Data-Integrity cryptosuite derivation, holder imprint on the
//! credential subject — and hand the payload to the pluggable service.

use crate::binding::HolderBinding;
use crate::did::{KeyPurpose, PublicKeyJwk};
use crate::error::Error;
use crate::provider::{
    DidResolver, MdocService, MdocSignRequest, Provider, SdJwtSignRequest, SdJwtVcService,
    W3cCredentialService, W3cSignRequest,
};
use crate::types::{
    CredentialFormat, Quota, SignCredential, SignOptions, SignerResponse, W3cCredential,
};

/// Sign the mapped credential with the service for its format. `format` is
/// the wire format of the accepted request, used to label W3C JWT
/// credentials (`jwt_vc_json` vs `jwt_vc_json-ld`).
///
/// # Errors
///
/// Returns [`Error::NoSupportedAlgorithm`] when the signing key supports no
/// usable algorithm or suite, and surfaces signing service failures as
/// [`Error::ServerError`].
pub async fn issue(
    provider: &impl Provider, options: &SignOptions, holder: &HolderBinding,
    format: CredentialFormat,
) -> crate::Result<SignerResponse> {
    match &options.credential {
        SignCredential::JwtVc(credential) => {
            let key = signing_key(provider, &options.verification_method).await?;
            let Some(algorithm) = key.signing_algorithms().first().map(ToString::to_string)
            else {
                return Err(Error::NoSupportedAlgorithm(format!(
                    "{} supports no JWA signature algorithm",
                    options.verification_method
                )));
            };

            let mut credential = credential.clone();
            imprint_subject_id(&mut credential, holder);

            let jwt_format = if matches!(format, CredentialFormat::JwtVcJsonLd) {
                CredentialFormat::JwtVcJsonLd
            } else {
                CredentialFormat::JwtVcJson
            };
            let response = W3cCredentialService::sign(provider, W3cSignRequest {
                credential,
                format: jwt_format,
                verification_method: options.verification_method.clone(),
                algorithm: Some(algorithm),
                cryptosuite: None,
            })
            .await
            .map_err(Error::from)?;
            Ok(response)
        }
        SignCredential::LdpVc(credential) => {
            let key = signing_key(provider, &options.verification_method).await?;
            let cryptosuite = data_integrity_suite(&key).ok_or_else(|| {
                Error::NoSupportedAlgorithm(format!(
                    "no Data-Integrity cryptosuite for a {} key",
                    key.kty
                ))
            })?;

            let mut credential = credential.clone();
            imprint_subject_id(&mut credential, holder);

            let response = W3cCredentialService::sign(provider, W3cSignRequest {
                credential,
                format: CredentialFormat::LdpVc,
                verification_method: options.verification_method.clone(),
                algorithm: None,
                cryptosuite: Some(cryptosuite.to_string()),
            })
            .await
            .map_err(Error::from)?;
            Ok(response)
        }
        SignCredential::SdJwtVc { payload } => {
            let response = SdJwtVcService::sign(provider, SdJwtSignRequest {
                payload: payload.clone(),
                holder_key: Some(holder.key().clone()),
                verification_method: options.verification_method.clone(),
            })
            .await
            .map_err(Error::from)?;
            Ok(response)
        }
        SignCredential::MsoMdoc { doctype, claims } => {
            let response = MdocService::sign(provider, MdocSignRequest {
                doctype: doctype.clone(),
                claims: claims.clone(),
                device_key: Some(holder.key().clone()),
                verification_method: options.verification_method.clone(),
            })
            .await
            .map_err(Error::from)?;
            Ok(response)
        }
    }
}

// Dereference the issuer's signing key named by the sign options.
async fn signing_key(
    resolver: &impl DidResolver, verification_method: &str,
) -> crate::Result<PublicKeyJwk> {
    let document = resolver
        .resolve(verification_method)
        .await
        .map_err(|e| Error::ServerError(format!("issue resolving signing key: {e}")))?;
    document
        .dereference_key(verification_method, &[KeyPurpose::AssertionMethod])
        .map_err(|e| Error::ServerError(format!("issue dereferencing signing key: {e}")))
}

// The Data-Integrity cryptosuite for a signing key type.
fn data_integrity_suite(key: &PublicKeyJwk) -> Option<&'static str> {
    match (key.kty.as_str(), key.crv.as_str()) {
        ("OKP", "Ed25519") => Some("eddsa-rdfc-2022"),
        ("EC", "P-256" | "P-384") => Some("ecdsa-rdfc-2019"),
        _ => None,
    }
}

// Imprint the holder's DID as the credential subject id when the mapper left
// it unset. An existing id, and bindings without a DID, are left untouched.
fn imprint_subject_id(credential: &mut W3cCredential, holder: &HolderBinding) {
    let Some(did) = holder.did() else {
        return;
    };
    let subject = match &mut credential.credential_subject {
        Quota::One(subject) => Some(subject),
        Quota::Many(subjects) => subjects.first_mut(),
    };
    if let Some(subject) = subject {
        if subject.id.is_none() {
            subject.id = Some(did.to_string());
        }
    }
}
