use std::io::Cursor;

use anyhow::anyhow;
use base64ct::{Base64, Encoding};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// URI scheme for credential offer deep links.
pub const OFFER_URI_SCHEME: &str = "openid-credential-offer";

/// Path segment under which generated offers are made retrievable,
/// `<base>/<path>/<id>`.
pub const DEFAULT_OFFER_PATH: &str = "credential_offer";

const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'_').remove(b'-').remove(b'~');

/// The protocol draft an offer is created for. Offers are stored in the
/// draft 13 shape; draft 11 offers additionally persist their legacy
/// projection.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum OfferVersion {
    /// OID4VCI draft 11.
    #[serde(rename = "v1.draft11")]
    Draft11,

    /// OID4VCI draft 13.
    #[default]
    #[serde(rename = "v1.draft13")]
    Draft13,
}

/// A Credential Offer object that can be sent to a Wallet as an HTTP GET
/// request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialOffer {
    /// The URL of the Credential Issuer, the Wallet is requested to obtain one
    /// or more Credentials from.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub credential_issuer: String,

    /// Credentials offered to the Wallet.
    /// A list of names identifying entries in the
    /// `credential_configurations_supported` `HashMap` in the Credential
    /// Issuer metadata. The Wallet uses the identifier to obtain the
    /// respective Credential Definition containing information about the
    /// Credential being offered.
    ///
    /// # Example
    ///
    /// ```json
    ///    "credential_configuration_ids": [
    ///       "UniversityDegree_JWT",
    ///       "org.iso.18013.5.1.mDL"
    ///    ],
    /// ```
    pub credential_configuration_ids: Vec<String>,

    /// Indicates to the Wallet the Grant Types the Credential Issuer is
    /// prepared to process for this credential offer. If not present, the
    /// Wallet MUST determine the Grant Types the Credential Issuer supports
    /// using the Issuer metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grants: Option<Grants>,
}

impl CredentialOffer {
    /// Convenience method for extracting a pre-authorized code grant from an
    /// offer if it exists.
    #[must_use]
    pub fn pre_authorized_code(&self) -> Option<&PreAuthorizedCodeGrant> {
        self.grants.as_ref().and_then(|grants| grants.pre_authorized_code.as_ref())
    }
}

/// Generate a qrcode for the deep link pointing at an offer URI, as a
/// base64-encoded PNG data URL.
///
/// # Errors
///
/// Returns an error if the QR code or PNG image cannot be generated.
pub fn to_qrcode(credential_offer_uri: &str) -> anyhow::Result<String> {
    let qr_code = QrCode::new(deep_link(credential_offer_uri))
        .map_err(|e| anyhow!("failed to create QR code: {e}"))?;

    // write image to buffer
    let img_buf = qr_code.render::<image::Luma<u8>>().build();
    let mut buffer: Vec<u8> = Vec::new();
    let mut writer = Cursor::new(&mut buffer);
    img_buf
        .write_to(&mut writer, image::ImageFormat::Png)
        .map_err(|e| anyhow!("failed to render QR code: {e}"))?;

    // base64 encode image
    Ok(format!("data:image/png;base64,{}", Base64::encode_string(buffer.as_slice())))
}

/// The draft 11 projection of a Credential Offer: configuration ids are
/// carried in `credentials` and the pre-authorized grant signals a PIN with
/// `user_pin_required` rather than a `tx_code` descriptor.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialOfferDraft11 {
    /// The URL of the Credential Issuer.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub credential_issuer: String,

    /// Identifiers of the offered credentials, referencing entries in the
    /// issuer's `credentials_supported` metadata.
    pub credentials: Vec<String>,

    /// Grant Types the Credential Issuer is prepared to process for this
    /// credential offer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grants: Option<GrantsDraft11>,
}

/// A stored or retrieved offer payload in either draft shape.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OfferPayload {
    /// Draft 13 offer.
    Draft13(CredentialOffer),

    /// Draft 11 offer.
    Draft11(CredentialOfferDraft11),
}

impl OfferPayload {
    /// The offered credential configuration identifiers, regardless of draft
    /// shape.
    #[must_use]
    pub fn configuration_ids(&self) -> &[String] {
        match self {
            Self::Draft13(offer) => &offer.credential_configuration_ids,
            Self::Draft11(offer) => &offer.credentials,
        }
    }
}

/// Grant Types the Credential Issuer's Authorization Server is prepared to
/// process for this credential offer.
///
/// The Credential Issuer can obtain user information to turn into a Verifiable
/// Credential using out of bound mechanisms outside of the issuance flow
/// (Pre-Authorized Code Flow).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Grants {
    /// Pre-Authorized Code Grant Type.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "urn:ietf:params:oauth:grant-type:pre-authorized_code")]
    pub pre_authorized_code: Option<PreAuthorizedCodeGrant>,
}

/// Draft 11 grants object.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct GrantsDraft11 {
    /// Pre-Authorized Code Grant Type.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "urn:ietf:params:oauth:grant-type:pre-authorized_code")]
    pub pre_authorized_code: Option<PreAuthorizedCodeGrantDraft11>,
}

/// The Pre-Authorized Code Grant Type contains parameters used by the Wallet
/// when using the Pre-Authorized Code Flow.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PreAuthorizedCodeGrant {
    /// The code representing the Issuer's authorization for the Wallet to
    /// obtain Credentials of the type specified in the offer. This code
    /// MUST be short lived and single-use. If the Wallet decides to use the
    /// Pre-Authorized Code Flow, this parameter MUST be included
    /// in the subsequent Token Request with the Pre-Authorized Code Flow.
    #[serde(rename = "pre-authorized_code")]
    pub pre_authorized_code: String,

    /// The `tx_code` specifies whether the Authorization Server expects
    /// presentation of a Transaction Code by the End-User along with the
    /// Token Request in a Pre-Authorized Code Flow.
    ///
    /// The Transaction Code binds the Pre-Authorized Code to a certain
    /// transaction to prevent replay of this code by an attacker that, for
    /// example, scanned the QR code while standing behind the legitimate
    /// End-User. It is RECOMMENDED to send the Transaction Code via a
    /// separate channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_code: Option<TxCode>,
}

/// The draft 11 pre-authorized code grant. A required PIN is signalled with
/// `user_pin_required` instead of a `tx_code` descriptor.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PreAuthorizedCodeGrantDraft11 {
    /// The code representing the Issuer's authorization for the Wallet to
    /// obtain Credentials of the type specified in the offer.
    #[serde(rename = "pre-authorized_code")]
    pub pre_authorized_code: String,

    /// Specifies whether the End-User must present a PIN along with the Token
    /// Request.
    #[serde(default)]
    pub user_pin_required: bool,
}

/// Specifies whether the Authorization Server expects presentation of a
/// Transaction Code by the End-User along with the Token Request in a
/// Pre-Authorized Code Flow.
///
/// If no length or description is given, this object may be empty, indicating
/// that a Transaction Code is required.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TxCode {
    /// Specifies the input character set. Possible values are "numeric" (only
    /// digits) and "text" (any characters). The default is "numeric".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<String>,

    /// Specifies the length of the Transaction Code. This helps the Wallet to
    /// render the input screen and improve the user experience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<i32>,

    /// Guidance for the Holder of the Wallet on how to obtain the Transaction
    /// Code, e.g., describing over which communication channel it is
    /// delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Build the `openid-credential-offer://` deep link for an offer URI. The
/// link carries only the URL-encoded offer URI, never the inlined payload.
#[must_use]
pub fn deep_link(credential_offer_uri: &str) -> String {
    let encoded = utf8_percent_encode(credential_offer_uri, UNRESERVED);
    format!("{OFFER_URI_SCHEME}://?credential_offer_uri={encoded}")
}

/// Extract the offer URI from an `openid-credential-offer://` deep link.
///
/// # Errors
///
/// Returns an error when the link does not use the expected scheme or does
/// not carry a `credential_offer_uri` parameter.
pub fn parse_deep_link(uri: &str) -> anyhow::Result<String> {
    let Some(query) = uri.strip_prefix(&format!("{OFFER_URI_SCHEME}://?")) else {
        return Err(anyhow!("unexpected deep link scheme: {uri}"));
    };
    for param in query.split('&') {
        if let Some(value) = param.strip_prefix("credential_offer_uri=") {
            return Ok(percent_decode_str(value).decode_utf8()?.into_owned());
        }
    }
    Err(anyhow!("deep link has no `credential_offer_uri` parameter"))
}

/// Request a Credential Offer for a Credential Issuer.
#[derive(Clone, Default, Debug, Deserialize, Serialize)]
pub struct CreateOfferRequest {
    /// A list of keys of Credentials in the issuer's supported configuration
    /// metadata. All entries must be supported and pairwise unique.
    pub credential_configuration_ids: Vec<String>,

    /// Parameters of the pre-authorized code grant to mint.
    #[serde(default)]
    pub pre_authorized: PreAuthorizedCodeConfig,

    /// Opaque metadata attached to the issuance session and carried through
    /// to the credential mapper.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub issuance_metadata: Map<String, Value>,

    /// The protocol draft to shape the offer payload for.
    #[serde(default)]
    pub version: OfferVersion,

    /// Base URL the offer URI is minted under. Defaults to the issuer
    /// identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
}

impl CreateOfferRequest {
    /// Create a new `CreateOfferRequestBuilder`.
    #[must_use]
    pub fn builder() -> CreateOfferRequestBuilder {
        CreateOfferRequestBuilder::new()
    }
}

/// Parameters of the pre-authorized code grant included in an offer.
#[derive(Clone, Default, Debug, Deserialize, Serialize)]
pub struct PreAuthorizedCodeConfig {
    /// The pre-authorized code to use. Generated when not provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_authorized_code: Option<String>,

    /// Whether the End-User must present a PIN at the token endpoint.
    /// Forced to `true` when a `tx_code` descriptor is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_pin_required: Option<bool>,

    /// Transaction code descriptor for the offer's grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_code: Option<TxCode>,
}

/// Build a Credential Offer request.
#[derive(Clone, Default, Debug)]
pub struct CreateOfferRequestBuilder {
    request: CreateOfferRequest,
}

impl CreateOfferRequestBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential to the offer by its configuration id.
    #[must_use]
    pub fn with_credential(mut self, configuration_id: impl Into<String>) -> Self {
        self.request.credential_configuration_ids.push(configuration_id.into());
        self
    }

    /// Use the provided pre-authorized code instead of generating one.
    #[must_use]
    pub fn pre_authorized_code(mut self, code: impl Into<String>) -> Self {
        self.request.pre_authorized.pre_authorized_code = Some(code.into());
        self
    }

    /// Specify whether a Transaction Code (PIN) will be required by the token
    /// endpoint.
    #[must_use]
    pub const fn user_pin_required(mut self, required: bool) -> Self {
        self.request.pre_authorized.user_pin_required = Some(required);
        self
    }

    /// Provide a Transaction Code descriptor. Implies a required PIN.
    #[must_use]
    pub fn tx_code(mut self, tx_code: TxCode) -> Self {
        self.request.pre_authorized.tx_code = Some(tx_code);
        self
    }

    /// Attach an opaque metadata entry to the issuance session.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.request.issuance_metadata.insert(key.into(), value);
        self
    }

    /// Shape the offer for the given protocol draft.
    #[must_use]
    pub const fn version(mut self, version: OfferVersion) -> Self {
        self.request.version = version;
        self
    }

    /// Mint the offer URI under the given base URL.
    #[must_use]
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.request.base_uri = Some(base_uri.into());
        self
    }

    /// Build the request.
    #[must_use]
    pub fn build(self) -> CreateOfferRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn credential_offer() {
        let offer = CredentialOffer {
            credential_issuer: "https://example.com".into(),
            credential_configuration_ids: vec!["UniversityDegree_JWT".into()],
            grants: None,
        };

        let offer_str = serde_json::to_string(&offer).expect("should serialize to string");
        let offer2: CredentialOffer =
            serde_json::from_str(&offer_str).expect("should deserialize from string");
        assert_eq!(offer, offer2);
    }

    #[test]
    fn grant_wire_names() {
        let offer = CredentialOffer {
            credential_issuer: "https://example.com".into(),
            credential_configuration_ids: vec!["UniversityDegree_JWT".into()],
            grants: Some(Grants {
                pre_authorized_code: Some(PreAuthorizedCodeGrant {
                    pre_authorized_code: "secret".into(),
                    tx_code: Some(TxCode::default()),
                }),
            }),
        };

        let value = serde_json::to_value(&offer).expect("should serialize");
        let grant = &value["grants"]["urn:ietf:params:oauth:grant-type:pre-authorized_code"];
        assert_eq!(grant["pre-authorized_code"], json!("secret"));
        assert_eq!(grant["tx_code"], json!({}));
    }

    #[test]
    fn deep_link_round_trip() {
        let uri = "https://issuer.example.com/credential_offer/4b4c6e35";
        let link = deep_link(uri);
        assert!(link.starts_with("openid-credential-offer://?credential_offer_uri="));
        assert_eq!(parse_deep_link(&link).expect("should parse"), uri);
    }

    #[test]
    fn qrcode_data_url() {
        let qr = to_qrcode("https://issuer.example.com/credential_offer/4b4c6e35")
            .expect("should render");
        assert!(qr.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn payload_shapes() {
        let draft11: OfferPayload = serde_json::from_value(json!({
            "credential_issuer": "https://example.com",
            "credentials": ["EmployeeID_JWT"],
            "grants": {
                "urn:ietf:params:oauth:grant-type:pre-authorized_code": {
                    "pre-authorized_code": "secret",
                    "user_pin_required": true
                }
            }
        }))
        .expect("should deserialize");

        let OfferPayload::Draft11(offer) = &draft11 else {
            panic!("should be a draft 11 payload");
        };
        assert!(
            offer
                .grants
                .as_ref()
                .and_then(|g| g.pre_authorized_code.as_ref())
                .is_some_and(|g| g.user_pin_required)
        );
        assert_eq!(draft11.configuration_ids(), &["EmployeeID_JWT".to_string()]);
    }
}
