//! Refresh Tokens
//!
//! A refresh token binds an email to the role the user had at login.
//!
//! The plain format is `base64("<email>,has role,<role>")`. It carries no
//! integrity protection: anyone can build one for a known email and role,
//! so the service re-checks the role against the user store on every
//! refresh. The signed format appends an HMAC-SHA256 tag over the payload
//! and rejects anything that was not issued with the same secret.

use crate::config::{RefreshTokenFormat, SigningSecret};
use crate::error::RefreshTokenError;

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Separator between email and role in the refresh payload
pub const ROLE_SEPARATOR: &str = ",has role,";

/// Domain prefix mixed into the signed refresh MAC so an access-token
/// signature can never be replayed as a refresh tag.
const SIGNED_REFRESH_CONTEXT: &[u8] = b"limpo-auth/refresh/v1";

type HmacSha256 = Hmac<Sha256>;

/// Encodes and decodes refresh tokens
#[derive(Clone)]
pub enum RefreshTokenCodec {
    Plain,
    Signed { key: SigningSecret },
}

impl RefreshTokenCodec {
    pub fn new(format: RefreshTokenFormat, secret: &SigningSecret) -> Self {
        match format {
            RefreshTokenFormat::Plain => Self::Plain,
            RefreshTokenFormat::Signed => Self::Signed {
                key: secret.clone(),
            },
        }
    }

    pub fn format(&self) -> RefreshTokenFormat {
        match self {
            Self::Plain => RefreshTokenFormat::Plain,
            Self::Signed { .. } => RefreshTokenFormat::Signed,
        }
    }

    pub fn encode(&self, email: &str, role: &str) -> String {
        let payload = format!("{}{}{}", email, ROLE_SEPARATOR, role);

        match self {
            Self::Plain => STANDARD.encode(payload),
            Self::Signed { key } => {
                let tag = mac(key, payload.as_bytes()).finalize().into_bytes();
                format!(
                    "{}.{}",
                    URL_SAFE_NO_PAD.encode(&payload),
                    URL_SAFE_NO_PAD.encode(tag)
                )
            }
        }
    }

    /// Decode a refresh token into `(email, role)`
    pub fn decode(&self, token: &str) -> Result<(String, String), RefreshTokenError> {
        let payload = match self {
            // Query-string decoding turns an unescaped '+' into ' '
            Self::Plain => STANDARD
                .decode(token.replace(' ', "+").trim())
                .map_err(|_| RefreshTokenError::Malformed)?,
            Self::Signed { key } => {
                let (payload_b64, tag_b64) = token
                    .trim()
                    .split_once('.')
                    .ok_or(RefreshTokenError::Malformed)?;
                let payload = URL_SAFE_NO_PAD
                    .decode(payload_b64)
                    .map_err(|_| RefreshTokenError::Malformed)?;
                let tag = URL_SAFE_NO_PAD
                    .decode(tag_b64)
                    .map_err(|_| RefreshTokenError::Malformed)?;

                // Constant-time comparison
                mac(key, &payload)
                    .verify_slice(&tag)
                    .map_err(|_| RefreshTokenError::BadSignature)?;
                payload
            }
        };

        let payload = String::from_utf8(payload).map_err(|_| RefreshTokenError::Malformed)?;
        split_payload(&payload)
    }
}

fn mac(key: &SigningSecret, payload: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(SIGNED_REFRESH_CONTEXT);
    mac.update(payload);
    mac
}

fn split_payload(payload: &str) -> Result<(String, String), RefreshTokenError> {
    let fields: Vec<&str> = payload.split(ROLE_SEPARATOR).collect();
    match fields.as_slice() {
        [email, role] if !email.is_empty() && !role.is_empty() => {
            Ok((email.to_string(), role.to_string()))
        }
        _ => Err(RefreshTokenError::Malformed),
    }
}

impl std::fmt::Debug for RefreshTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RefreshTokenCodec").field(&self.format()).finish()
    }
}
