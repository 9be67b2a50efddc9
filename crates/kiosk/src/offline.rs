//! Offline verification: unsigned token inspection plus cached roster.
//!
//! Best effort only. The signature is never checked and the roster is as
//! old as the last successful sync, so this is an access-logging
//! convenience, not a security control.

use chrono::{DateTime, Utc};
use gymdesk_core::{decode_claims, AccessDecision, RosterSnapshot, ScanOutcome, ScanSource};

pub const REASON_INVALID_TOKEN: &str = "invalid_token";
pub const REASON_TOKEN_EXPIRED: &str = "token_expired";
pub const REASON_NOT_IN_ROSTER: &str = "not_in_offline_roster";

pub fn verify_offline(token: &str, roster: &RosterSnapshot, now: DateTime<Utc>) -> ScanOutcome {
    let denied = |member_id, reason: &str| ScanOutcome {
        decision: AccessDecision::Denied,
        source: ScanSource::Offline,
        member_id,
        member_name: None,
        reason: Some(reason.to_string()),
        scanned_at: now,
    };

    let claims = match decode_claims(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "offline verify: undecodable token");
            return denied(None, REASON_INVALID_TOKEN);
        }
    };

    // Expiry wins over anything the roster says.
    if claims.is_expired(now.timestamp()) {
        return denied(Some(claims.sub), REASON_TOKEN_EXPIRED);
    }

    if !roster.is_active(&claims.sub) {
        tracing::info!(member_id = %claims.sub, "offline deny: not in cached roster");
        return denied(Some(claims.sub), REASON_NOT_IN_ROSTER);
    }

    let member_name = roster.details(&claims.sub).map(|d| d.full_name.clone());
    tracing::info!(member_id = %claims.sub, "offline grant");
    ScanOutcome {
        decision: AccessDecision::Granted,
        source: ScanSource::Offline,
        member_id: Some(claims.sub),
        member_name,
        reason: None,
        scanned_at: now,
    }
}
