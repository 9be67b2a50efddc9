use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gymdesk_core::{decode_claims, MemberDetails, MemberId, RosterSnapshot};
use gymdesk_kiosk::verify_offline;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_token(sub: &str) -> String {
    let payload = serde_json::json!({
        "sub": sub,
        "exp": Utc::now().timestamp() + 3600,
        "type": "qr",
    });
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

fn make_roster(size: usize) -> RosterSnapshot {
    let members = (0..size)
        .map(|i| MemberDetails {
            id: MemberId::new(format!("m-{i}")),
            full_name: format!("Member {i}"),
            subscription_status: Some("ACTIVE".into()),
            subscription_end_date: None,
        })
        .collect();
    RosterSnapshot::from_members(members)
}

// ---------------------------------------------------------------------------
// Benchmark: decode_claims
// ---------------------------------------------------------------------------

fn bench_decode_claims(c: &mut Criterion) {
    let token = make_token("m-123");
    c.bench_function("decode_claims", |b| {
        b.iter(|| decode_claims(black_box(&token)))
    });
}

// ---------------------------------------------------------------------------
// Benchmark: verify_offline over growing rosters
// ---------------------------------------------------------------------------

fn bench_verify_offline(c: &mut Criterion) {
    let now = Utc::now();
    let mut group = c.benchmark_group("verify_offline");
    for size in [100usize, 1_000, 10_000] {
        let roster = make_roster(size);
        let hit = make_token(&format!("m-{}", size / 2));
        let miss = make_token("stranger");

        group.bench_with_input(BenchmarkId::new("member", size), &roster, |b, roster| {
            b.iter(|| verify_offline(black_box(&hit), roster, now))
        });
        group.bench_with_input(BenchmarkId::new("stranger", size), &roster, |b, roster| {
            b.iter(|| verify_offline(black_box(&miss), roster, now))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode_claims, bench_verify_offline);
criterion_main!(benches);
