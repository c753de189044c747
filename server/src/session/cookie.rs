use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::MIN_SESSION_SECRET_LEN;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signs session ids into cookie values of the form `<id>.<signature>`.
#[derive(Clone)]
pub struct CookieSigner {
    secret: Arc<[u8]>,
}

impl CookieSigner {
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(AppError::Config(format!(
                "session secret is too short (min {} bytes)",
                MIN_SESSION_SECRET_LEN
            )));
        }

        Ok(Self {
            secret: Arc::<[u8]>::from(secret),
        })
    }

    pub fn sign(&self, session_id: &str) -> Result<String> {
        let signature = URL_SAFE_NO_PAD.encode(self.mac(session_id)?.finalize().into_bytes());
        Ok(format!("{session_id}.{signature}"))
    }

    /// Returns the session id when the signature matches, `None` otherwise.
    pub fn unsign<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (session_id, signature_b64) = value.rsplit_once('.')?;
        if session_id.is_empty() {
            return None;
        }

        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
        self.mac(session_id).ok()?.verify_slice(&signature).ok()?;
        Some(session_id)
    }

    fn mac(&self, session_id: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("invalid session secret: {}", e)))?;
        mac.update(session_id.as_bytes());
        Ok(mac)
    }
}
