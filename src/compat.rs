//! # Draft 11 Compatibility
//!
//! Projections between the draft 13 (canonical) and draft 11 wire shapes of
//! offers and configuration metadata. Offers are always stored in the draft
//! 13 shape; draft 11 offers additionally persist the projection produced
//! here.

use std::collections::HashMap;

use crate::types::{
    CredentialConfiguration, CredentialDefinition, CredentialFormat, CredentialOffer,
    CredentialOfferDraft11, CredentialSupported, Format, Grants, GrantsDraft11, LegacyProfile,
    PreAuthorizedCodeGrant, PreAuthorizedCodeGrantDraft11, ProfileIsoMdl, ProfileSdJwt,
    ProfileW3c, TxCode,
};

/// Project a draft 13 offer into its draft 11 shape:
/// `credential_configuration_ids` becomes `credentials`, and a `tx_code`
/// descriptor on the pre-authorized grant becomes `user_pin_required`.
#[must_use]
pub fn offer_to_draft11(offer: &CredentialOffer) -> CredentialOfferDraft11 {
    CredentialOfferDraft11 {
        credential_issuer: offer.credential_issuer.clone(),
        credentials: offer.credential_configuration_ids.clone(),
        grants: offer.grants.as_ref().map(|grants| GrantsDraft11 {
            pre_authorized_code: grants.pre_authorized_code.as_ref().map(|grant| {
                PreAuthorizedCodeGrantDraft11 {
                    pre_authorized_code: grant.pre_authorized_code.clone(),
                    user_pin_required: grant.tx_code.is_some(),
                }
            }),
        }),
    }
}

/// Lift a draft 11 offer back into the draft 13 shape. `user_pin_required`
/// becomes a `tx_code` descriptor — the provided one when the caller kept it,
/// an empty one otherwise.
#[must_use]
pub fn offer_to_draft13(
    offer: &CredentialOfferDraft11, tx_code: Option<&TxCode>,
) -> CredentialOffer {
    CredentialOffer {
        credential_issuer: offer.credential_issuer.clone(),
        credential_configuration_ids: offer.credentials.clone(),
        grants: offer.grants.as_ref().map(|grants| Grants {
            pre_authorized_code: grants.pre_authorized_code.as_ref().map(|grant| {
                PreAuthorizedCodeGrant {
                    pre_authorized_code: grant.pre_authorized_code.clone(),
                    tx_code: grant
                        .user_pin_required
                        .then(|| tx_code.cloned().unwrap_or_default()),
                }
            }),
        }),
    }
}

/// Convert a draft 11 `credentials_supported` list into the draft 13
/// configuration map.
#[must_use]
pub fn configs_v11_to_v13(
    credentials_supported: &[CredentialSupported],
) -> HashMap<String, CredentialConfiguration> {
    credentials_supported
        .iter()
        .map(|supported| {
            let format = match &supported.format {
                LegacyProfile::JwtVcJson { types } => Format::JwtVcJson(ProfileW3c {
                    credential_definition: CredentialDefinition {
                        type_: Some(types.clone()),
                        ..CredentialDefinition::default()
                    },
                }),
                LegacyProfile::JwtVcJsonLd { context, types } => Format::JwtVcJsonLd(ProfileW3c {
                    credential_definition: CredentialDefinition {
                        context: context.clone(),
                        type_: Some(types.clone()),
                        ..CredentialDefinition::default()
                    },
                }),
                LegacyProfile::LdpVc { context, types } => Format::LdpVc(ProfileW3c {
                    credential_definition: CredentialDefinition {
                        context: context.clone(),
                        type_: Some(types.clone()),
                        ..CredentialDefinition::default()
                    },
                }),
                LegacyProfile::VcSdJwt { vct } => Format::VcSdJwt(ProfileSdJwt { vct: vct.clone() }),
                LegacyProfile::MsoMdoc { doctype } => Format::MsoMdoc(ProfileIsoMdl {
                    doctype: doctype.clone(),
                }),
            };
            (supported.id.clone(), CredentialConfiguration {
                format,
                ..CredentialConfiguration::default()
            })
        })
        .collect()
}

/// Project draft 13 configurations into the draft 11 `credentials_supported`
/// list shape.
#[must_use]
pub fn configs_v13_to_v11<'a>(
    configurations: impl IntoIterator<Item = (&'a String, &'a CredentialConfiguration)>,
) -> Vec<CredentialSupported> {
    configurations
        .into_iter()
        .map(|(id, config)| {
            let format = match &config.format {
                Format::JwtVcJson(w3c) => LegacyProfile::JwtVcJson {
                    types: w3c.credential_definition.type_set().unwrap_or_default().to_vec(),
                },
                Format::JwtVcJsonLd(w3c) => LegacyProfile::JwtVcJsonLd {
                    context: w3c.credential_definition.context.clone(),
                    types: w3c.credential_definition.type_set().unwrap_or_default().to_vec(),
                },
                Format::LdpVc(w3c) => LegacyProfile::LdpVc {
                    context: w3c.credential_definition.context.clone(),
                    types: w3c.credential_definition.type_set().unwrap_or_default().to_vec(),
                },
                Format::VcSdJwt(sd_jwt) => LegacyProfile::VcSdJwt {
                    vct: sd_jwt.vct.clone(),
                },
                Format::MsoMdoc(mdoc) => LegacyProfile::MsoMdoc {
                    doctype: mdoc.doctype.clone(),
                },
            };
            CredentialSupported {
                id: id.clone(),
                format,
            }
        })
        .collect()
}

/// The `format` value for a credential response. Responses are built in the
/// draft 11 shape, which carries the field natively; draft 13 omits it from
/// its wire model but the field is forced onto the response regardless, so
/// both versions get it.
#[must_use]
pub const fn response_format(format: CredentialFormat) -> Option<CredentialFormat> {
    Some(format)
}
