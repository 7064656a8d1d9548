//! RS256 token issuance and verification
//!
//! Tokens carry the user's identity and greenhouse grants. Verification is
//! pinned to the RSA signature family: the header is inspected first and
//! anything outside RS256/RS384/RS512 is rejected before any signature
//! work, so a token re-signed under HS256 with the public key as the HMAC
//! secret never reaches the verifier.
//!
//! Keys are fetched from the custodian on every issue/verify call rather
//! than cached at construction. A store that was unreachable at startup, or
//! a key record replaced by another replica, takes effect on the next
//! request without a restart; an unavailable key surfaces as a per-call
//! error.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use serde::{Deserialize, Serialize};

use crate::keys::{KeyCustodian, DEFAULT_KEY_ID};
use crate::types::{AuthError, Result};

/// Issuer written into every token.
pub const TOKEN_ISSUER: &str = "plant-care-auth-service";

/// Signature algorithms accepted on verification. RSA family only.
const ACCEPTED_ALGS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Registered and application claims carried by issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub username: String,
    pub user_id: String,
    pub role: String,
    #[serde(default)]
    pub greenhouses: Vec<String>,
}

/// Issues and verifies RS256 tokens against the custodian's keypair.
pub struct TokenService {
    custodian: Arc<KeyCustodian>,
    ttl: Duration,
}

impl TokenService {
    /// `ttl` is how long issued tokens stay valid; a non-positive ttl
    /// produces already-expired tokens.
    pub fn new(custodian: Arc<KeyCustodian>, ttl: Duration) -> Self {
        Self { custodian, ttl }
    }

    /// Validity window applied to issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for the given identity, valid from now until now + ttl.
    ///
    /// The private key is loaded from the custodian for this call; a key
    /// that cannot be loaded or decrypted is an issuance failure.
    pub async fn issue(
        &self,
        username: &str,
        user_id: &str,
        role: &str,
        greenhouses: &[String],
    ) -> Result<String> {
        let private_key = self.custodian.load_private_key(DEFAULT_KEY_ID).await?;
        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|_| AuthError::Internal("private key encoding failed".into()))?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|_| AuthError::Internal("signing key PEM rejected".into()))?;

        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            username: username.to_string(),
            user_id: user_id.to_string(),
            role: role.to_string(),
            greenhouses: greenhouses.to_vec(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|_| AuthError::Internal("token signing failed".into()))
    }

    /// Verify a token's signature and temporal validity, returning its
    /// claims. The algorithm check happens before the public key is even
    /// fetched, so no signature work precedes it.
    pub async fn verify(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token).map_err(map_jwt_error)?;
        if !ACCEPTED_ALGS.contains(&header.alg) {
            return Err(AuthError::AlgorithmRejected(format!("{:?}", header.alg)));
        }

        let public_pem = self.custodian.public_key_pem(DEFAULT_KEY_ID).await?;
        let decoding_key = DecodingKey::from_rsa_pem(&public_pem)
            .map_err(|_| AuthError::Internal("verification key PEM rejected".into()))?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, &decoding_key, &validation).map_err(map_jwt_error)?;
        Ok(data.claims)
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::ImmatureSignature => AuthError::NotYetValid,
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm => AuthError::AlgorithmRejected("unexpected algorithm".into()),
        _ => AuthError::MalformedToken,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    async fn service(ttl: Duration) -> TokenService {
        let (_store, custodian) = testutil::seeded_custodian("s3cr3t").await;
        TokenService::new(custodian, ttl)
    }

    #[tokio::test]
    async fn issue_verify_roundtrip_preserves_claims() {
        let svc = service(Duration::hours(24)).await;
        let greenhouses = vec!["gh-1".to_string(), "gh-2".to_string()];
        let token = svc
            .issue("alice", "u-42", "admin", &greenhouses)
            .await
            .unwrap();

        let claims = svc.verify(&token).await.unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.user_id, "u-42");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.greenhouses, greenhouses);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_as_expired() {
        let svc = service(Duration::seconds(-1)).await;
        let token = svc.issue("alice", "u-42", "admin", &[]).await.unwrap();

        assert!(matches!(svc.verify(&token).await, Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn hmac_signed_token_is_rejected_before_signature_check() {
        let svc = service(Duration::hours(1)).await;

        // HS256 token keyed with the (public!) verification key, the
        // classic algorithm-confusion attempt.
        let (_, public_pem) = testutil::rsa_pem_pair();
        let claims = Claims {
            sub: "alice".into(),
            iss: TOKEN_ISSUER.into(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Utc::now().timestamp(),
            nbf: Utc::now().timestamp(),
            username: "alice".into(),
            user_id: "u-42".into(),
            role: "admin".into(),
            greenhouses: vec![],
        };
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(public_pem.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            svc.verify(&forged).await,
            Err(AuthError::AlgorithmRejected(_))
        ));
    }

    #[tokio::test]
    async fn symmetric_header_with_garbage_signature_is_rejected() {
        let svc = service(Duration::hours(1)).await;

        // The signature segment is arbitrary junk; rejection must come from
        // the declared algorithm alone, with no signature computation.
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"alice","role":"admin","exp":9999999999}"#);
        let forged = format!("{}.{}.!!not-even-base64!!", header, payload);

        assert!(matches!(
            svc.verify(&forged).await,
            Err(AuthError::AlgorithmRejected(_))
        ));
    }

    #[tokio::test]
    async fn tampered_payload_fails_signature_verification() {
        let svc = service(Duration::hours(1)).await;
        let token = svc.issue("bob", "u-7", "user", &[]).await.unwrap();

        // Rewrite the payload segment with an escalated role, leaving the
        // original signature attached.
        let mut segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        let payload = URL_SAFE_NO_PAD.decode(segments[1]).unwrap();
        let escalated = String::from_utf8(payload)
            .unwrap()
            .replace("\"role\":\"user\"", "\"role\":\"admin\"");
        let forged_payload = URL_SAFE_NO_PAD.encode(escalated.as_bytes());
        segments[1] = &forged_payload;
        let forged = segments.join(".");

        assert!(matches!(
            svc.verify(&forged).await,
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn not_yet_valid_token_is_rejected() {
        let svc = service(Duration::hours(1)).await;
        let (private_pem, _) = testutil::rsa_pem_pair();

        let now = Utc::now();
        let claims = Claims {
            sub: "alice".into(),
            iss: TOKEN_ISSUER.into(),
            exp: (now + Duration::hours(2)).timestamp(),
            iat: now.timestamp(),
            nbf: (now + Duration::hours(1)).timestamp(),
            username: "alice".into(),
            user_id: "u-42".into(),
            role: "admin".into(),
            greenhouses: vec![],
        };
        let token = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            svc.verify(&token).await,
            Err(AuthError::NotYetValid)
        ));
    }

    #[tokio::test]
    async fn garbage_and_wrong_segment_counts_are_malformed() {
        let svc = service(Duration::hours(1)).await;

        assert!(matches!(
            svc.verify("not-a-token").await,
            Err(AuthError::MalformedToken)
        ));
        assert!(matches!(
            svc.verify("abc.def").await,
            Err(AuthError::MalformedToken)
        ));
        assert!(matches!(svc.verify("").await, Err(AuthError::MalformedToken)));
    }

    #[tokio::test]
    async fn replaced_key_takes_effect_without_rebuilding_the_service() {
        let (_store, custodian) = testutil::seeded_custodian("s3cr3t").await;
        let svc = TokenService::new(Arc::clone(&custodian), Duration::hours(1));

        let old_token = svc.issue("alice", "u-42", "admin", &[]).await.unwrap();
        assert!(svc.verify(&old_token).await.is_ok());

        // Another replica wins a bootstrap race and replaces the record.
        custodian.generate_and_store(DEFAULT_KEY_ID).await.unwrap();

        // The same service instance now verifies against the stored key:
        // tokens under the overwritten key fail, fresh ones pass.
        assert!(matches!(
            svc.verify(&old_token).await,
            Err(AuthError::SignatureInvalid)
        ));
        let new_token = svc.issue("alice", "u-42", "admin", &[]).await.unwrap();
        assert!(svc.verify(&new_token).await.is_ok());
    }

    #[tokio::test]
    async fn key_provisioned_after_construction_is_picked_up() {
        let (store, custodian) = testutil::empty_custodian("s3cr3t");
        let svc = TokenService::new(custodian, Duration::hours(1));

        // Store had no key when the service was built
        assert!(matches!(
            svc.issue("alice", "u-42", "admin", &[]).await,
            Err(AuthError::KeyNotFound(_))
        ));

        testutil::seed_cached_key(&store, "s3cr3t").await;

        let token = svc.issue("alice", "u-42", "admin", &[]).await.unwrap();
        assert_eq!(svc.verify(&token).await.unwrap().username, "alice");
    }
}
