//! An API for the issuance of Verifiable Credentials based on the
//! [OpenID for Verifiable Credential Issuance] specification, supporting
//! drafts 11 and 13 of the pre-authorized code flow.
//!
//! The library drives each issuance from offer creation through credential
//! delivery:
//!
//! ```text
//! +--------------+   +-----------+                                    +-------------------+
//! | User         |   |   Wallet  |                                    | Credential Issuer |
//! +--------------+   +-----------+                                    +-------------------+
//!         |                |                                                    |
//!         |                |  (1) User provides information required            |
//!         |                |      for the issuance of a certain Credential      |
//!         |-------------------------------------------------------------------->|
//!         |                |                                                    |
//!         |                |  (2) Credential Offer (Pre-Authorized Code)        |
//!         |                |<---------------------------------------------------|
//!         |   interacts    |                                                    |
//!         |--------------->|                                                    |
//!         |                |                                                    |
//!         |                |  (3) Token Request (Pre-Authorized Code, pin)      |
//!         |                |--------------------------------------------------->|
//!         |                |      Token Response (access_token, c_nonce)        |
//!         |                |<---------------------------------------------------|
//!         |                |                                                    |
//!         |                |  (4) Credential Request (proof of possession)      |
//!         |                |--------------------------------------------------->|
//!         |                |      Credential Response (credential)              |
//!         |                |<---------------------------------------------------|
//! ```
//!
//! Each issuance is tracked by a persistent [`IssuanceSession`] keyed by the
//! offer URI and, once an access token exists, by the `c_nonce` challenge
//! the wallet must echo inside its proof JWT. Credentials are issued in the
//! W3C JWT, W3C Data-Integrity, SD-JWT VC, and ISO mdoc formats, with
//! signing delegated to host-supplied services.
//!
//! Endpoints are designed to be wrapped by Rust-based HTTP servers with a
//! few lines of code per route. Implementors supply `Provider` traits for
//! externals: issuer records, session storage, DID resolution, JWS
//! verification, and the format signers. See [`provider`].
//!
//! [OpenID for Verifiable Credential Issuance]: (https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html)

pub mod binding;
pub mod compat;
pub mod did;
pub mod matcher;
pub mod proof;
pub mod provider;
pub mod resolver;
pub mod signer;
pub mod types;

mod error;
mod generate;
mod handlers;
mod session;

pub use self::binding::HolderBinding;
pub use self::error::Error;
pub use self::handlers::*;
pub use self::session::{Expire, IssuanceSession, SessionState};
pub use self::types::*;

/// Result type for `OpenID` for Verifiable Credential Issuance.
pub type Result<T, E = Error> = std::result::Result<T, E>;
