//! # Credential Matching
//!
//! Determines which of a session's offered configurations a credential
//! request satisfies. Requests by `credential_identifier` name a
//! configuration directly; requests by format are filtered by format
//! equality, by the one-shot rule (a configuration is issued at most once
//! per session), and by a format-specific type predicate.
//!
//! Matching is pure and idempotent: the same inputs always produce the same
//! result, in the offer's insertion order.

use crate::error::Error;
use crate::session::IssuanceSession;
use crate::types::{
    CredentialConfiguration, CredentialRequest, Format, FormatRequest, Issuer, RequestBy,
};

/// The configuration of the session's offer that satisfies the request.
/// When several offered configurations satisfy a request by format, the
/// first in offer order is picked and a warning logged, so the result holds
/// exactly one entry.
///
/// # Errors
///
/// Returns [`Error::NotOffered`] when a requested `credential_identifier` is
/// not part of the offer and [`Error::NoMatchingOffer`] when no offered
/// configuration satisfies a request by format.
pub fn matched_configurations(
    session: &IssuanceSession, request: &CredentialRequest, issuer: &Issuer,
) -> crate::Result<Vec<(String, CredentialConfiguration)>> {
    let configs = issuer.configurations.as_draft13();

    // offered ids, read from the draft shape the offer was created in
    let offered_ids = match &session.offer_draft11 {
        Some(offer) => &offer.credentials,
        None => &session.offer.credential_configuration_ids,
    };

    // intersect the offer with the issuer's supported configurations
    let offered: Vec<(String, CredentialConfiguration)> = offered_ids
        .iter()
        .filter_map(|id| configs.get(id).map(|config| (id.clone(), config.clone())))
        .collect();

    match &request.credential {
        RequestBy::Identifier {
            credential_identifier,
        } => {
            let entry = offered.into_iter().find(|(id, _)| id == credential_identifier);
            entry.map(|entry| vec![entry]).ok_or_else(|| {
                Error::NotOffered(format!("{credential_identifier} is not part of the offer"))
            })
        }
        RequestBy::Format(format_request) => {
            let mut matched: Vec<(String, CredentialConfiguration)> = offered
                .into_iter()
                .filter(|(id, config)| {
                    config.format.format() == format_request.format()
                        && !session.issued_credentials.contains(id)
                        && profile_matches(&config.format, format_request)
                })
                .collect();

            if matched.is_empty() {
                return Err(Error::NoMatchingOffer(format!(
                    "no offered configuration matches a {} request",
                    format_request.format()
                )));
            }
            if matched.len() > 1 {
                tracing::warn!(
                    "request matches {} offered configurations, issuing the first",
                    matched.len()
                );
                matched.truncate(1);
            }
            Ok(matched)
        }
    }
}

// The format-specific predicate: W3C formats compare type arrays as
// multisets, SD-JWT compares `vct`, mdoc compares `doctype`.
fn profile_matches(configured: &Format, requested: &FormatRequest) -> bool {
    match (configured, requested) {
        (Format::JwtVcJson(w3c), FormatRequest::JwtVcJson { .. })
        | (Format::JwtVcJsonLd(w3c), FormatRequest::JwtVcJsonLd { .. })
        | (Format::LdpVc(w3c), FormatRequest::LdpVc { .. }) => {
            requested.type_set().is_some_and(|requested_types| {
                equal_as_sets(
                    w3c.credential_definition.type_set().unwrap_or_default(),
                    requested_types,
                )
            })
        }
        (Format::VcSdJwt(sd_jwt), FormatRequest::VcSdJwt { vct }) => &sd_jwt.vct == vct,
        (Format::MsoMdoc(mdoc), FormatRequest::MsoMdoc { doctype }) => &mdoc.doctype == doctype,
        _ => false,
    }
}

// Order-independent comparison of two type-IRI arrays as multisets.
fn equal_as_sets(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}
