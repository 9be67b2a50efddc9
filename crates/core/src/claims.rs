//! Unverified JWT payload inspection.
//!
//! Used only by the kiosk's offline path: the signature is NOT checked,
//! so nothing decoded here may be trusted beyond "best effort while the
//! backend is unreachable".

use crate::error::{GymError, GymResult};
use crate::types::MemberId;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

/// The subset of access-token claims the kiosk looks at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessClaims {
    pub sub: MemberId,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<i64>,
    /// Token purpose (`access`, `qr`, ...), when the issuer sets one.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl AccessClaims {
    /// A token without `exp` is left for the server to judge.
    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.exp.map_or(false, |exp| exp <= now_unix)
    }
}

/// Decodes the payload segment of a compact JWT.
pub fn decode_claims(token: &str) -> GymResult<AccessClaims> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(GymError::InvalidToken("expected three segments".into()));
    };

    // Some issuers keep base64 padding; the URL-safe engine rejects it.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| GymError::InvalidToken(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| GymError::InvalidToken(format!("payload is not a claims object: {e}")))
}

#[cfg(test)]
pub(crate) fn encode_unsigned(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}
