use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::compat;
use crate::types::format::Format;

/// The persistent record of a Credential Issuer: its identity, display
/// properties, token-endpoint key material, and the credential configurations
/// it can issue.
///
/// Created once and mutated only by explicit update (e.g. key rotation);
/// never deleted by this crate.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Issuer {
    /// The Credential Issuer's unique identifier (a URL).
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub credential_issuer: String,

    /// Credential Issuer display properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<Display>,

    /// JWS algorithms accepted for DPoP proofs at the token endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpop_signing_alg_values_supported: Option<Vec<String>>,

    /// Fingerprint of the public key access tokens are currently signed
    /// with. Rotated by a single record update; access tokens signed with a
    /// previous key stay valid until their own expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_public_key_fingerprint: Option<String>,

    /// The credential configurations this issuer can issue, in exactly one of
    /// the draft 13 or draft 11 metadata shapes.
    #[serde(flatten)]
    pub configurations: SupportedConfigurations,
}

/// Language-based display properties for an `Issuer`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Display {
    /// The name to use when displaying the Issuer for the specified locale.
    /// If no locale is set, then this value is the default value.
    pub name: String,

    /// A BCP47 [RFC5646] language tag identifying the display language.
    ///
    /// [RFC5646]: (https://www.rfc-editor.org/rfc/rfc5646)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// The issuer's supported credential configurations. Draft 13 metadata keys
/// them by id in `credential_configurations_supported`; draft 11 metadata
/// lists them in a `credentials_supported` array with inline ids. A record
/// carries exactly one of the two shapes.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SupportedConfigurations {
    /// Draft 13 configuration map.
    Draft13 {
        /// Configurations keyed by `credential_configuration_id`.
        credential_configurations_supported: HashMap<String, CredentialConfiguration>,
    },

    /// Draft 11 configuration list.
    Draft11 {
        /// Supported credentials with inline `id` fields.
        credentials_supported: Vec<CredentialSupported>,
    },
}

impl Default for SupportedConfigurations {
    fn default() -> Self {
        Self::Draft13 {
            credential_configurations_supported: HashMap::new(),
        }
    }
}

impl SupportedConfigurations {
    /// Whether a configuration with the given id is supported.
    #[must_use]
    pub fn contains(&self, configuration_id: &str) -> bool {
        match self {
            Self::Draft13 {
                credential_configurations_supported,
            } => credential_configurations_supported.contains_key(configuration_id),
            Self::Draft11 {
                credentials_supported,
            } => credentials_supported.iter().any(|c| c.id == configuration_id),
        }
    }

    /// A draft 13 view of the supported configurations, converting a draft 11
    /// list when necessary.
    #[must_use]
    pub fn as_draft13(&self) -> HashMap<String, CredentialConfiguration> {
        match self {
            Self::Draft13 {
                credential_configurations_supported,
            } => credential_configurations_supported.clone(),
            Self::Draft11 {
                credentials_supported,
            } => compat::configs_v11_to_v13(credentials_supported),
        }
    }
}

/// Credential configuration: the issuer-defined template a future credential
/// will satisfy, identified by a string id in the issuer metadata.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CredentialConfiguration {
    /// Identifies the format of the credential, e.g. "`jwt_vc_json`", along
    /// with its format-specific type parameters.
    ///
    /// See OpenID4VCI [Credential Format Profiles] for more detail.
    ///
    /// [Credential Format Profiles]: https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html#name-credential-format-profiles
    #[serde(flatten)]
    pub format: Format,

    /// The `scope` value this issuer supports for this credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Identifies how the Credential should be bound to the identifier of the
    /// End-User who possesses the Credential, e.g. "`did:example`" or
    /// "`jwk`". Is case sensitive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cryptographic_binding_methods_supported: Option<Vec<String>>,

    /// Case sensitive strings that identify the cryptographic suites
    /// supported for the `cryptographic_binding_methods_supported`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_signing_alg_values_supported: Option<Vec<String>>,

    /// The key proof(s) that the Credential Issuer supports, keyed by proof
    /// type identifier (e.g. "`jwt`").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_types_supported: Option<HashMap<String, ProofTypesSupported>>,

    /// Language-based display properties of the supported credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<Vec<CredentialDisplay>>,
}

/// Metadata about a supported key proof type.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProofTypesSupported {
    /// Case sensitive strings that identify the algorithms the Issuer
    /// supports for this proof type.
    pub proof_signing_alg_values_supported: Vec<String>,
}

/// Language-based display properties of a supported credential.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialDisplay {
    /// The value to use when displaying the name of the Credential.
    pub name: String,

    /// A BCP47 [RFC5646] language tag identifying the display language.
    ///
    /// [RFC5646]: (https://www.rfc-editor.org/rfc/rfc5646)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Description of the Credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A draft 11 `credentials_supported` entry: the configuration id is carried
/// inline and W3C type arrays use the `types` spelling.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialSupported {
    /// The configuration identifier, used in offers to reference this entry.
    pub id: String,

    /// Format tag and format-specific type parameters.
    #[serde(flatten)]
    pub format: LegacyProfile,
}

/// Draft 11 format profiles.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "format")]
pub enum LegacyProfile {
    /// A W3C Verifiable Credential secured as a JWT, not using JSON-LD.
    #[serde(rename = "jwt_vc_json")]
    JwtVcJson {
        /// The credential type array.
        types: Vec<String>,
    },

    /// A W3C Verifiable Credential secured as a JWT, using JSON-LD.
    #[serde(rename = "jwt_vc_json-ld")]
    JwtVcJsonLd {
        /// The JSON-LD context for the credential.
        #[serde(rename = "@context")]
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<Vec<String>>,

        /// The credential type array.
        types: Vec<String>,
    },

    /// A W3C Verifiable Credential secured with a Data-Integrity proof.
    #[serde(rename = "ldp_vc")]
    LdpVc {
        /// The JSON-LD context for the credential.
        #[serde(rename = "@context")]
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<Vec<String>>,

        /// The credential type array.
        types: Vec<String>,
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn draft13_record() {
        let issuer: Issuer = serde_json::from_value(json!({
            "credential_issuer": "https://issuer.example.com",
            "credential_configurations_supported": {
                "UniversityDegree_SD": {
                    "format": "vc+sd-jwt",
                    "vct": "UniversityDegree_SD"
                }
            }
        }))
        .expect("should deserialize");

        assert!(issuer.configurations.contains("UniversityDegree_SD"));
        assert!(!issuer.configurations.contains("EmployeeID_JWT"));
    }

    #[test]
    fn draft11_record() {
        let issuer: Issuer = serde_json::from_value(json!({
            "credential_issuer": "https://issuer.example.com",
            "credentials_supported": [{
                "id": "EmployeeID_JWT",
                "format": "jwt_vc_json",
                "types": ["VerifiableCredential", "EmployeeIDCredential"]
            }]
        }))
        .expect("should deserialize");

        assert!(issuer.configurations.contains("EmployeeID_JWT"));

        let configs = issuer.configurations.as_draft13();
        let config = configs.get("EmployeeID_JWT").expect("should convert");
        let Format::JwtVcJson(w3c) = &config.format else {
            panic!("should be a jwt_vc_json profile");
        };
        assert_eq!(
            w3c.credential_definition.type_set(),
            Some(&["VerifiableCredential".to_string(), "EmployeeIDCredential".to_string()][..])
        );
    }
}
