//! Terminal rendering of scan results.

use crate::scanner::ReplaySummary;
use gymdesk_client::LocaleContext;
use gymdesk_core::{AccessDecision, ScanOutcome, ScanSource};

/// Localized text for a reason code, or the reason verbatim when it is
/// free text from the server.
pub fn reason_text(ctx: &LocaleContext, reason: &str) -> String {
    let key = format!("scan.reason.{reason}");
    let text = ctx.t(&key);
    if text == key {
        reason.to_string()
    } else {
        text.to_string()
    }
}

pub fn decision_text<'a>(ctx: &'a LocaleContext, decision: AccessDecision) -> &'a str {
    match decision {
        AccessDecision::Granted => ctx.t("scan.granted"),
        AccessDecision::Denied => ctx.t("scan.denied"),
        AccessDecision::AlreadyScanned => ctx.t("scan.already_scanned"),
    }
}

/// Boxed, localized summary of one scan.
pub fn render_outcome(outcome: &ScanOutcome, ctx: &LocaleContext) -> String {
    let fmt = ctx.formatter();
    let marker = match outcome.decision {
        AccessDecision::Granted => "✔",
        AccessDecision::Denied => "✘",
        AccessDecision::AlreadyScanned => "•",
    };
    let source = match outcome.source {
        ScanSource::Online => ctx.t("scan.source.online"),
        ScanSource::Offline => ctx.t("scan.source.offline"),
    };

    let mut out = String::new();
    out.push_str("╔══════════════════════════════════════════════╗\n");
    out.push_str(&format!(
        "║  {marker} {}\n",
        decision_text(ctx, outcome.decision)
    ));
    out.push_str("╠══════════════════════════════════════════════╣\n");
    if let Some(name) = &outcome.member_name {
        out.push_str(&format!("║  {name}\n"));
    }
    if let Some(id) = &outcome.member_id {
        out.push_str(&format!("║  #{id}\n"));
    }
    if let Some(reason) = &outcome.reason {
        out.push_str(&format!("║  {}\n", reason_text(ctx, reason)));
    }
    out.push_str(&format!(
        "║  {}  ({source})\n",
        fmt.datetime(outcome.scanned_at)
    ));
    if outcome.source == ScanSource::Offline {
        out.push_str(&format!("║  {}\n", ctx.t("kiosk.offline_banner")));
    }
    out.push_str("╚══════════════════════════════════════════════╝\n");
    out
}

pub fn render_replay(summary: &ReplaySummary, ctx: &LocaleContext) -> String {
    let fmt = ctx.formatter();
    format!(
        "{}: {} / {}",
        ctx.t("kiosk.replayed"),
        fmt.number(summary.succeeded as f64, 0),
        fmt.number(summary.attempted as f64, 0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gymdesk_core::{Locale, MemberId};

    fn offline_denial() -> ScanOutcome {
        ScanOutcome {
            decision: AccessDecision::Denied,
            source: ScanSource::Offline,
            member_id: Some(MemberId::new("m-9")),
            member_name: None,
            reason: Some("token_expired".into()),
            scanned_at: Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn english_rendering() {
        let ctx = LocaleContext::detached();
        let text = render_outcome(&offline_denial(), &ctx);
        assert!(text.contains("Access denied"));
        assert!(text.contains("QR code has expired"));
        assert!(text.contains("#m-9"));
        assert!(text.contains("Oct 18, 2026, 09:30  (offline)"));
        assert!(text.contains("Offline mode"));
    }

    #[test]
    fn arabic_rendering() {
        let ctx = LocaleContext::detached();
        ctx.set_locale(Locale::Ar).unwrap();
        let text = render_outcome(&offline_denial(), &ctx);
        assert!(text.contains("تم رفض الدخول"));
        assert!(text.contains("انتهت صلاحية رمز QR"));
    }

    #[test]
    fn server_reasons_pass_through() {
        let ctx = LocaleContext::detached();
        assert_eq!(reason_text(&ctx, "Subscription frozen"), "Subscription frozen");
    }

    #[test]
    fn replay_line() {
        let ctx = LocaleContext::detached();
        let line = render_replay(
            &ReplaySummary {
                attempted: 3,
                succeeded: 2,
                dropped: 1,
            },
            &ctx,
        );
        assert_eq!(line, "Pending scans submitted: 2 / 3");
    }
}
