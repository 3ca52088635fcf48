use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::format::{CredentialDefinition, CredentialFormat};
use crate::types::w3c::W3cCredential;
use crate::types::Kind;

/// `CredentialRequest` is used by the Wallet to make a Credential Request to
/// the Credential Endpoint.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CredentialRequest {
    /// Identifies the credential requested for issuance using either a
    /// `credential_identifier` or a supported format.
    ///
    /// If `credential_identifiers` were returned in the Token
    /// Response, they MUST be used here. Otherwise, they MUST NOT be used.
    #[serde(flatten)]
    pub credential: RequestBy,

    /// A previously issued `c_nonce` echoed at the top level of the request.
    /// Wallets more commonly carry the nonce inside the proof JWT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,

    /// Wallet's proof of possession of cryptographic key material the issued
    /// Credential will be bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl CredentialRequest {
    /// The requested wire format, when the request is made by format rather
    /// than by credential identifier.
    #[must_use]
    pub const fn format(&self) -> Option<CredentialFormat> {
        match &self.credential {
            RequestBy::Identifier { .. } => None,
            RequestBy::Format(request) => Some(request.format()),
        }
    }
}

/// Means used to identify Credential type and format when requesting a
/// Credential.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RequestBy {
    /// Credential is requested by `credential_identifier`.
    /// REQUIRED when an Authorization Details of type `openid_credential` was
    /// returned from the Token Response.
    Identifier {
        /// Identifies a Credential in the issuer's supported configuration
        /// metadata.
        credential_identifier: String,
    },

    /// Defines the format and type of the Credential to be issued. REQUIRED
    /// when `credential_identifiers` was not returned from the Token Response.
    Format(FormatRequest),
}

impl Default for RequestBy {
    fn default() -> Self {
        Self::Identifier {
            credential_identifier: String::new(),
        }
    }
}

/// Format-specific type descriptors carried by a Credential Request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "format")]
pub enum FormatRequest {
    /// A W3C Verifiable Credential secured as a JWT, not using JSON-LD.
    /// Draft 13 wallets send a `credential_definition`; draft 11 wallets a
    /// top-level `types` array.
    #[serde(rename = "jwt_vc_json")]
    JwtVcJson {
        /// The detailed description of the requested credential type.
        #[serde(skip_serializing_if = "Option::is_none")]
        credential_definition: Option<CredentialDefinition>,

        /// Draft 11 spelling of the requested type array.
        #[serde(skip_serializing_if = "Option::is_none")]
        types: Option<Vec<String>>,
    },

    /// A W3C Verifiable Credential secured as a JWT, using JSON-LD.
    #[serde(rename = "jwt_vc_json-ld")]
    JwtVcJsonLd {
        /// The detailed description of the requested credential type.
        credential_definition: CredentialDefinition,
    },

    /// A W3C Verifiable Credential secured with a Data-Integrity proof.
    #[serde(rename = "ldp_vc")]
    LdpVc {
        /// The detailed description of the requested credential type.
        credential_definition: CredentialDefinition,
    },

    /// An IETF SD-JWT VC.
    #[serde(rename = "vc+sd-jwt")]
    VcSdJwt {
        /// The SD-JWT VC type identifier.
        vct: String,
    },

    /// An ISO mdoc credential.
    #[serde(rename = "mso_mdoc")]
    MsoMdoc {
        /// The mdoc document type.
        doctype: String,
    },
}

impl FormatRequest {
    /// The requested format tag.
    #[must_use]
    pub const fn format(&self) -> CredentialFormat {
        match self {
            Self::JwtVcJson { .. } => CredentialFormat::JwtVcJson,
            Self::JwtVcJsonLd { .. } => CredentialFormat::JwtVcJsonLd,
            Self::LdpVc { .. } => CredentialFormat::LdpVc,
            Self::VcSdJwt { .. } => CredentialFormat::VcSdJwt,
            Self::MsoMdoc { .. } => CredentialFormat::MsoMdoc,
        }
    }

    /// The requested W3C type array, for the formats that carry one. For
    /// `jwt_vc_json` the `credential_definition` takes precedence over the
    /// legacy top-level `types`.
    #[must_use]
    pub fn type_set(&self) -> Option<&[String]> {
        match self {
            Self::JwtVcJson {
                credential_definition,
                types,
            } => credential_definition
                .as_ref()
                .and_then(CredentialDefinition::type_set)
                .or(types.as_deref()),
            Self::JwtVcJsonLd {
                credential_definition,
            }
            | Self::LdpVc {
                credential_definition,
            } => credential_definition.type_set(),
            Self::VcSdJwt { .. } | Self::MsoMdoc { .. } => None,
        }
    }
}

/// Wallet's proof of possession of the key material the issued Credential is
/// to be bound to.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(tag = "proof_type")]
pub enum Proof {
    /// The JWT containing the Wallet's proof of possession of key material.
    #[serde(rename = "jwt")]
    Jwt {
        /// The compact JWS.
        jwt: String,

        /// A previously issued `c_nonce`, echoed beside the JWT by some
        /// wallets.
        #[serde(skip_serializing_if = "Option::is_none")]
        c_nonce: Option<String>,
    },
}

impl Proof {
    /// The proof's compact JWS.
    #[must_use]
    pub fn jwt(&self) -> &str {
        let Self::Jwt { jwt, .. } = self;
        jwt
    }

    /// The `c_nonce` carried beside the JWT, if any.
    #[must_use]
    pub fn c_nonce(&self) -> Option<&str> {
        let Self::Jwt { c_nonce, .. } = self;
        c_nonce.as_deref()
    }
}

/// Claims containing a Wallet's proof of possession of key material that can
/// be used for binding an issued Credential.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProofClaims {
    /// The `client_id` of the Client making the Credential request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// The Credential Issuer Identifier.
    pub aud: String,

    /// The time at which the proof was issued, as
    /// [RFC7519](https://www.rfc-editor.org/rfc/rfc7519) `NumericDate`.
    pub iat: i64,

    /// A server-provided `c_nonce`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// The issuer's response to a Credential Request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CredentialResponse {
    /// The format of the issued credential. Draft 13 omits the field from the
    /// wire model, but responses are built in the draft 11 shape and keep it
    /// populated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<CredentialFormat>,

    /// The issued Credential. MAY be a string or an object, depending on the
    /// Credential Format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<Kind<Value>>,

    /// A nonce to be used to create a proof of possession of key material when
    /// requesting a further Credential. When received, the Wallet MUST use
    /// this value for its subsequent credential requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,

    /// The lifetime in seconds of the `c_nonce` parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_in: Option<i64>,
}

/// Output of the host-supplied credential mapper: the payload to sign, the
/// signing key reference, and the offered configuration the credential
/// consumes.
#[derive(Clone, Debug)]
pub struct SignOptions {
    /// The offered configuration this credential is issued against. Appended
    /// to the session's issued list before signing.
    pub credential_configuration_id: String,

    /// DID URL of the issuer verification method to sign with.
    pub verification_method: String,

    /// The format-tagged credential payload.
    pub credential: SignCredential,
}

/// The credential payload handed to a format signer.
#[derive(Clone, Debug)]
pub enum SignCredential {
    /// A W3C credential to secure as a JWT.
    JwtVc(W3cCredential),

    /// A W3C credential to secure with a Data-Integrity proof.
    LdpVc(W3cCredential),

    /// An SD-JWT VC payload. Must carry a `vct` claim.
    SdJwtVc {
        /// The SD-JWT claims set.
        payload: Map<String, Value>,
    },

    /// An ISO mdoc document.
    MsoMdoc {
        /// The mdoc document type.
        doctype: String,

        /// Claims keyed by element identifier.
        claims: Map<String, Value>,
    },
}

impl SignCredential {
    /// The `vct` claim of an SD-JWT payload, if this is one and it has one.
    #[must_use]
    pub fn vct(&self) -> Option<&str> {
        match self {
            Self::SdJwtVc { payload } => payload.get("vct").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// The envelope returned by a credential signer.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SignerResponse {
    /// The signed credential. MAY be a string or an object, depending on the
    /// Credential Format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<Kind<Value>>,

    /// Set by signers that defer issuance. Deferred issuance is not
    /// supported; a response carrying this is rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance_token: Option<String>,

    /// Set by signers that defer issuance. Rejected, as for
    /// `acceptance_token`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_by_identifier() {
        let request: CredentialRequest = serde_json::from_value(json!({
            "credential_identifier": "EmployeeID_JWT",
            "proof": { "proof_type": "jwt", "jwt": "eyJhbGciOi..." }
        }))
        .expect("should deserialize");

        let RequestBy::Identifier {
            credential_identifier,
        } = &request.credential
        else {
            panic!("should be an identifier request");
        };
        assert_eq!(credential_identifier, "EmployeeID_JWT");
        assert_eq!(request.format(), None);
    }

    #[test]
    fn request_by_format() {
        let request: CredentialRequest = serde_json::from_value(json!({
            "format": "vc+sd-jwt",
            "vct": "UniversityDegree_SD",
            "proof": { "proof_type": "jwt", "jwt": "eyJhbGciOi..." }
        }))
        .expect("should deserialize");

        assert_eq!(request.format(), Some(CredentialFormat::VcSdJwt));
        assert!(request.proof.is_some());
    }

    #[test]
    fn legacy_types_array() {
        let request: FormatRequest = serde_json::from_value(json!({
            "format": "jwt_vc_json",
            "types": ["VerifiableCredential", "EmployeeIDCredential"]
        }))
        .expect("should deserialize");

        assert_eq!(
            request.type_set(),
            Some(&["VerifiableCredential".to_string(), "EmployeeIDCredential".to_string()][..])
        );
    }
}
