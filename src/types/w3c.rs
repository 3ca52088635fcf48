use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Kind, Quota};

/// The W3C Verifiable Credential payload handed to the W3C signer. Proof and
/// envelope are added by the signing service.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct W3cCredential {
    /// The `@context` property defines the vocabulary for the credential.
    #[serde(rename = "@context")]
    pub context: Vec<Kind<Value>>,

    /// The credential's identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The credential type. The first entry is `VerifiableCredential`.
    #[serde(rename = "type")]
    pub type_: Vec<String>,

    /// The issuer of the credential.
    pub issuer: String,

    /// One or more claim subjects.
    pub credential_subject: Quota<CredentialSubject>,

    /// Further data-model properties (`validFrom`, `credentialStatus`, ...)
    /// passed through to the signer untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A claims subject of a W3C credential.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CredentialSubject {
    /// The identifier of the subject, typically the holder's DID. Left unset
    /// by the mapper when the holder binding should supply it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The subject's claims.
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}
