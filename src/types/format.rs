use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Credential formats supported for issuance.
///
/// Matcher and signer selection dispatch exhaustively on this tag, so an
/// unsupported format is unrepresentable on internal paths.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum CredentialFormat {
    /// A W3C Verifiable Credential secured as a JWT, not using JSON-LD.
    #[default]
    #[serde(rename = "jwt_vc_json")]
    JwtVcJson,

    /// A W3C Verifiable Credential secured as a JWT, using JSON-LD.
    #[serde(rename = "jwt_vc_json-ld")]
    JwtVcJsonLd,

    /// A W3C Verifiable Credential secured with a Data-Integrity proof.
    #[serde(rename = "ldp_vc")]
    LdpVc,

    /// An IETF SD-JWT VC.
    #[serde(rename = "vc+sd-jwt")]
    VcSdJwt,

    /// An ISO mdoc (ISO.18013-5) credential.
    #[serde(rename = "mso_mdoc")]
    MsoMdoc,
}

impl CredentialFormat {
    /// Returns `true` for the three W3C credential formats.
    #[must_use]
    pub const fn is_w3c(self) -> bool {
        matches!(self, Self::JwtVcJson | Self::JwtVcJsonLd | Self::LdpVc)
    }
}

impl fmt::Display for CredentialFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JwtVcJson => write!(f, "jwt_vc_json"),
            Self::JwtVcJsonLd => write!(f, "jwt_vc_json-ld"),
            Self::LdpVc => write!(f, "ldp_vc"),
            Self::VcSdJwt => write!(f, "vc+sd-jwt"),
            Self::MsoMdoc => write!(f, "mso_mdoc"),
        }
    }
}

/// The `OpenID4VCI` specification defines commonly used [Credential Format
/// Profiles] to support. The profiles define Credential format specific
/// parameters or claims used to support a particular format.
///
/// [Credential Format Profiles]: (https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html#name-credential-format-profiles)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "format")]
pub enum Format {
    /// A W3C Verifiable Credential.
    ///
    /// When this format is specified, Credential Offer, Authorization Details,
    /// Credential Request, and Credential Issuer metadata, including
    /// `credential_definition` object, MUST NOT be processed using JSON-LD
    /// rules.
    #[serde(rename = "jwt_vc_json")]
    JwtVcJson(ProfileW3c),

    /// A W3C Verifiable Credential using JSON-LD.
    #[serde(rename = "jwt_vc_json-ld")]
    JwtVcJsonLd(ProfileW3c),

    /// A W3C Verifiable Credential secured with a Data-Integrity proof.
    ///
    /// N.B. The `@context` value in the `credential_definition` object can be
    /// used by the Wallet to check whether it supports a certain VC.
    #[serde(rename = "ldp_vc")]
    LdpVc(ProfileW3c),

    /// IETF SD-JWT VC.
    ///
    /// A Credential Format Profile for Credentials complying with
    /// [I-D.ietf-oauth-sd-jwt-vc] — SD-JWT-based Verifiable Credentials for
    /// selective disclosure.
    ///
    /// [I-D.ietf-oauth-sd-jwt-vc]: (https://datatracker.ietf.org/doc/html/draft-ietf-oauth-sd-jwt-vc-01)
    #[serde(rename = "vc+sd-jwt")]
    VcSdJwt(ProfileSdJwt),

    /// ISO mDL.
    ///
    /// A Credential Format Profile for Credentials complying with [ISO.18013-5]
    /// — ISO-compliant driving licence specification.
    ///
    /// [ISO.18013-5]: (https://www.iso.org/standard/69084.html)
    #[serde(rename = "mso_mdoc")]
    MsoMdoc(ProfileIsoMdl),
}

impl Format {
    /// The format tag of the profile.
    #[must_use]
    pub const fn format(&self) -> CredentialFormat {
        match self {
            Self::JwtVcJson(_) => CredentialFormat::JwtVcJson,
            Self::JwtVcJsonLd(_) => CredentialFormat::JwtVcJsonLd,
            Self::LdpVc(_) => CredentialFormat::LdpVc,
            Self::VcSdJwt(_) => CredentialFormat::VcSdJwt,
            Self::MsoMdoc(_) => CredentialFormat::MsoMdoc,
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Self::JwtVcJson(ProfileW3c::default())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Credential Format Profile for W3C Verifiable Credentials.
#[derive(Clone, Default, Debug, Deserialize, Serialize)]
pub struct ProfileW3c {
    /// The Credential's definition.
    pub credential_definition: CredentialDefinition,
}

impl PartialEq for ProfileW3c {
    fn eq(&self, other: &Self) -> bool {
        self.credential_definition.type_set() == other.credential_definition.type_set()
    }
}

/// Credential Format Profile for Selective Disclosure JWT ([SD-JWT])
/// credentials.
///
/// [SD-JWT]: <https://datatracker.ietf.org/doc/html/draft-ietf-oauth-sd-jwt-vc-04>
#[derive(Clone, Default, Debug, Deserialize, Serialize, Eq)]
pub struct ProfileSdJwt {
    /// The Verifiable Credential type. The `vct` value MUST be a
    /// case-sensitive String or URI serving as an identifier for
    /// the type of the SD-JWT VC.
    pub vct: String,
}

impl PartialEq for ProfileSdJwt {
    fn eq(&self, other: &Self) -> bool {
        self.vct == other.vct
    }
}

/// Credential Format Profile for `ISO.18013-5` (Mobile Driving License)
/// credentials.
#[derive(Clone, Default, Debug, Deserialize, Serialize, Eq)]
pub struct ProfileIsoMdl {
    /// The Credential type, as defined in [ISO.18013-5].
    pub doctype: String,
}

impl PartialEq for ProfileIsoMdl {
    fn eq(&self, other: &Self) -> bool {
        self.doctype == other.doctype
    }
}

/// The detailed description of a W3C Verifiable Credential type.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CredentialDefinition {
    /// The `@context` property defines the vocabulary for the credential.
    /// Used (and required) only when the format requires JSON-LD processing.
    #[serde(rename = "@context")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,

    /// Uniquely identifies the credential type the Credential contains.
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_: Option<Vec<String>>,

    /// The credential type array as serialized by pre-draft-13 wallets
    /// (`types` rather than `type`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,

    /// Claims the credential will contain, keyed by claim name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_subject: Option<Map<String, Value>>,
}

impl CredentialDefinition {
    /// The effective credential type array: `type` when present, falling back
    /// to the legacy `types` spelling.
    #[must_use]
    pub fn type_set(&self) -> Option<&[String]> {
        self.type_.as_deref().or(self.types.as_deref())
    }
}
