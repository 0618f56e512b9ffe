//! # Sessions
//!
//! Compact HS256 JWS carried in the `session` cookie.
//!
//! ```text
//! base64url({"alg":"HS256","typ":"JWT"}) . base64url({userId, role, iat, exp}) . base64url(hmac)
//! ```
//!
//! Tokens are self-contained, nothing is kept server side. A token stays valid
//! until `exp` (issuance + 7 days) even if the user is deleted in the meantime.
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use registry::Role;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::SessionError;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";
/// Seconds, shared by the `exp` claim and the cookie `Max-Age`.
pub const SESSION_MAX_AGE: i64 = 60 * 60 * 24 * 7;

const ALGORITHM: &str = "HS256";
const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const MAX_TOKEN_LEN: usize = 2048;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: String,
    role: Role,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

pub struct Sessions {
    secret: Vec<u8>,
}

impl Sessions {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    pub fn sign_session(&self, user_id: &str, role: Role) -> Result<String, SessionError> {
        self.sign_at(user_id, role, Utc::now())
    }

    pub fn sign_at(
        &self,
        user_id: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let claims = Claims {
            user_id: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: now.timestamp() + SESSION_MAX_AGE,
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// `None` for anything but an untampered, unexpired token.
    pub fn verify_session(&self, token: &str) -> Option<Session> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        if token.len() > MAX_TOKEN_LEN {
            return None;
        }

        let mut parts = token.split('.');
        let (header_part, claims_part, signature_part) =
            (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        let mut mac = self.mac().ok()?;
        mac.update(header_part.as_bytes());
        mac.update(b".");
        mac.update(claims_part.as_bytes());
        let signature = URL_SAFE_NO_PAD.decode(signature_part).ok()?;
        mac.verify_slice(&signature).ok()?;

        let header: Header = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_part).ok()?).ok()?;
        if header.alg != ALGORITHM {
            return None;
        }

        let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(claims_part).ok()?).ok()?;
        if now.timestamp() >= claims.exp {
            return None;
        }

        Some(Session {
            user_id: claims.user_id,
            role: claims.role,
        })
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| SessionError::Key(e.to_string()))
    }
}
