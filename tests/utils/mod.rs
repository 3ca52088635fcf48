//! Hard-coded provider trait implementations for testing the issuance flow.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use anyhow::anyhow;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use oid4vci_issuer::did::{Document, PublicKeyJwk};
use oid4vci_issuer::provider::{
    CredentialMapper, DidResolver, JwsVerifier, MapRequest, MdocService, MdocSignRequest,
    Metadata, SdJwtSignRequest, SdJwtVcService, SessionFilter, SessionStore, W3cCredentialService,
    W3cSignRequest,
};
use oid4vci_issuer::{
    CredentialSubject, Format, IssuanceSession, Issuer, Kind, Quota, SignCredential, SignOptions,
    SignerResponse, W3cCredential,
};
use serde_json::{Map, Value, json};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub const ISSUER: &str = "http://localhost:8080";
pub const ALICE_KID: &str = "did:example:alice#key-1";
pub const ALICE_DID: &str = "did:example:alice";
pub const ISSUER_KID: &str = "did:example:issuer#key-1";

const SIGNATURE: &[u8] = b"test-signature";

// initalise tracing once for all tests
static INIT: Once = Once::new();

/// Initialise tracing for tests.
pub fn init_tracer() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::ERROR).finish();
        tracing::subscriber::set_global_default(subscriber).expect("subscriber set");
    });
}

/// What the mock signing services should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignerMode {
    /// Return a signed credential.
    Issue,
    /// Return a deferred-issuance envelope.
    Defer,
    /// Return an empty envelope.
    Empty,
}

#[derive(Clone)]
pub struct TestProvider {
    issuers: Arc<Mutex<HashMap<String, Issuer>>>,
    sessions: Arc<Mutex<HashMap<String, IssuanceSession>>>,
    signer_mode: Arc<Mutex<SignerMode>>,
}

impl TestProvider {
    pub fn new() -> Self {
        let issuer: Issuer = serde_json::from_value(json!({
            "credential_issuer": ISSUER,
            "display": { "name": "Example University", "locale": "en-NZ" },
            "dpop_signing_alg_values_supported": ["ES256", "EdDSA"],
            "access_token_public_key_fingerprint": "z6Mk...",
            "credential_configurations_supported": {
                "UniversityDegree_SD": {
                    "format": "vc+sd-jwt",
                    "vct": "UniversityDegree_SD",
                    "proof_types_supported": {
                        "jwt": { "proof_signing_alg_values_supported": ["ES256", "EdDSA"] }
                    }
                },
                "EmployeeID_JWT": {
                    "format": "jwt_vc_json",
                    "credential_definition": {
                        "type": ["VerifiableCredential", "EmployeeIDCredential"]
                    }
                },
                "UniversityDegree_LDP": {
                    "format": "ldp_vc",
                    "credential_definition": {
                        "@context": ["https://www.w3.org/2018/credentials/v1"],
                        "type": ["VerifiableCredential", "UniversityDegreeCredential"]
                    }
                },
                "org.iso.18013.5.1.mDL": {
                    "format": "mso_mdoc",
                    "doctype": "org.iso.18013.5.1.mDL"
                }
            }
        }))
        .expect("should deserialize");

        Self {
            issuers: Arc::new(Mutex::new(HashMap::from([(ISSUER.to_string(), issuer)]))),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            signer_mode: Arc::new(Mutex::new(SignerMode::Issue)),
        }
    }

    pub fn set_signer_mode(&self, mode: SignerMode) {
        *self.signer_mode.lock().expect("should lock") = mode;
    }

    fn signer_response(&self, credential: &str) -> SignerResponse {
        match *self.signer_mode.lock().expect("should lock") {
            SignerMode::Issue => SignerResponse {
                credential: Some(Kind::String(credential.to_string())),
                ..SignerResponse::default()
            },
            SignerMode::Defer => SignerResponse {
                transaction_id: Some("txn-1".to_string()),
                ..SignerResponse::default()
            },
            SignerMode::Empty => SignerResponse::default(),
        }
    }
}

impl Metadata for TestProvider {
    async fn issuer(&self, issuer_id: &str) -> anyhow::Result<Issuer> {
        self.issuers
            .lock()
            .expect("should lock")
            .get(issuer_id)
            .cloned()
            .ok_or_else(|| anyhow!("issuer not found"))
    }

    async fn update_issuer(&self, issuer: &Issuer) -> anyhow::Result<()> {
        self.issuers
            .lock()
            .expect("should lock")
            .insert(issuer.credential_issuer.clone(), issuer.clone());
        Ok(())
    }
}

impl SessionStore for TestProvider {
    async fn create(&self, session: &IssuanceSession) -> anyhow::Result<()> {
        let mut sessions = self.sessions.lock().expect("should lock");
        let colliding = SessionFilter::by_offer_uri(session.credential_offer_uri.as_str())
            .issuer(session.issuer_id.as_str());
        if sessions.values().any(|existing| colliding.matches(existing)) {
            return Err(anyhow!("offer URI already in use"));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn session(&self, id: &str) -> anyhow::Result<Option<IssuanceSession>> {
        Ok(self.sessions.lock().expect("should lock").get(id).cloned())
    }

    async fn find(&self, filter: &SessionFilter) -> anyhow::Result<Vec<IssuanceSession>> {
        Ok(self
            .sessions
            .lock()
            .expect("should lock")
            .values()
            .filter(|session| filter.matches(session))
            .cloned()
            .collect())
    }

    async fn update(&self, session: &IssuanceSession) -> anyhow::Result<()> {
        self.sessions.lock().expect("should lock").insert(session.id.clone(), session.clone());
        Ok(())
    }
}

impl DidResolver for TestProvider {
    async fn resolve(&self, did_url: &str) -> anyhow::Result<Document> {
        let did = did_url.split('#').next().unwrap_or_default();
        let (id, kid) = match did {
            ALICE_DID => (ALICE_DID, ALICE_KID),
            "did:example:issuer" => ("did:example:issuer", ISSUER_KID),
            _ => return Err(anyhow!("unknown DID: {did}")),
        };

        Ok(serde_json::from_value(json!({
            "id": id,
            "verificationMethod": [{
                "id": kid,
                "type": "JsonWebKey2020",
                "controller": id,
                "publicKeyJwk": { "kty": "OKP", "crv": "Ed25519", "x": "8QobBmmo..." }
            }],
            "authentication": [kid],
            "assertionMethod": [kid]
        }))
        .expect("should deserialize"))
    }
}

impl JwsVerifier for TestProvider {
    async fn verify(&self, compact_jws: &str, _jwk: &PublicKeyJwk) -> anyhow::Result<()> {
        let parts: Vec<&str> = compact_jws.split('.').collect();
        if parts.len() != 3 {
            return Err(anyhow!("not a compact JWS"));
        }
        let signature = Base64UrlUnpadded::decode_vec(parts[2])?;
        if signature != SIGNATURE {
            return Err(anyhow!("signature mismatch"));
        }
        Ok(())
    }
}

impl CredentialMapper for TestProvider {
    async fn sign_options(&self, request: MapRequest) -> anyhow::Result<SignOptions> {
        let (configuration_id, configuration) =
            request.matched.first().ok_or_else(|| anyhow!("nothing matched"))?;

        let credential = match &configuration.format {
            Format::VcSdJwt(sd_jwt) => {
                let mut payload = Map::new();
                payload.insert("vct".to_string(), Value::String(sd_jwt.vct.clone()));
                payload.insert("university".to_string(), json!("Example University"));
                payload.insert("degree".to_string(), json!("Bachelor of Science"));
                SignCredential::SdJwtVc { payload }
            }
            Format::JwtVcJson(w3c) | Format::JwtVcJsonLd(w3c) => {
                SignCredential::JwtVc(w3c_credential(&request.session, w3c))
            }
            Format::LdpVc(w3c) => SignCredential::LdpVc(w3c_credential(&request.session, w3c)),
            Format::MsoMdoc(mdoc) => {
                let mut claims = Map::new();
                claims.insert("family_name".to_string(), json!("Person"));
                SignCredential::MsoMdoc {
                    doctype: mdoc.doctype.clone(),
                    claims,
                }
            }
        };

        Ok(SignOptions {
            credential_configuration_id: configuration_id.clone(),
            verification_method: ISSUER_KID.to_string(),
            credential,
        })
    }
}

fn w3c_credential(
    session: &IssuanceSession, w3c: &oid4vci_issuer::ProfileW3c,
) -> W3cCredential {
    let mut claims = Map::new();
    claims.insert("family_name".to_string(), json!("Person"));

    W3cCredential {
        context: vec![Kind::String("https://www.w3.org/2018/credentials/v1".to_string())],
        id: None,
        type_: w3c.credential_definition.type_set().unwrap_or_default().to_vec(),
        issuer: session.issuer_id.clone(),
        credential_subject: Quota::One(CredentialSubject {
            id: None,
            claims,
        }),
        extra: Map::new(),
    }
}

impl W3cCredentialService for TestProvider {
    async fn sign(&self, request: W3cSignRequest) -> anyhow::Result<SignerResponse> {
        assert!(request.algorithm.is_some() || request.cryptosuite.is_some());
        Ok(self.signer_response("eyJhbGciOiJFZERTQSJ9.mock-w3c-credential.c2ln"))
    }
}

impl SdJwtVcService for TestProvider {
    async fn sign(&self, request: SdJwtSignRequest) -> anyhow::Result<SignerResponse> {
        assert!(request.payload.contains_key("vct"));
        Ok(self.signer_response("eyJhbGciOiJFZERTQSJ9.mock-sd-jwt.c2ln~WyJzYWx0Il0~"))
    }
}

impl MdocService for TestProvider {
    async fn sign(&self, request: MdocSignRequest) -> anyhow::Result<SignerResponse> {
        assert!(!request.doctype.is_empty());
        Ok(self.signer_response("o2d2ZXJzaW9uYzEuMG-mock-mdoc"))
    }
}

/// A proof JWT bound to Alice's DID key, echoing the given nonce.
pub fn proof_jwt(nonce: &str) -> String {
    encode_jwt(&json!({
        "alg": "EdDSA",
        "typ": "openid4vci-proof+jwt",
        "kid": ALICE_KID
    }), nonce)
}

/// A proof JWT carrying Alice's key as an inline JWK.
pub fn proof_jwt_with_jwk(nonce: &str) -> String {
    encode_jwt(&json!({
        "alg": "EdDSA",
        "typ": "openid4vci-proof+jwt",
        "jwk": { "kty": "OKP", "crv": "Ed25519", "x": "8QobBmmo..." }
    }), nonce)
}

fn encode_jwt(header: &Value, nonce: &str) -> String {
    let header =
        Base64UrlUnpadded::encode_string(&serde_json::to_vec(header).expect("should serialize"));
    let claims = Base64UrlUnpadded::encode_string(
        &serde_json::to_vec(&json!({
            "aud": ISSUER,
            "iat": Utc::now().timestamp(),
            "nonce": nonce
        }))
        .expect("should serialize"),
    );
    let signature = Base64UrlUnpadded::encode_string(SIGNATURE);
    format!("{header}.{claims}.{signature}")
}
