use criterion::{black_box, criterion_group, criterion_main, Criterion};
use chrono::{Duration, Utc};

use models::enums::PaymentStatus;
use service::crypto::PiiCipher;
use service::renewal::{compute_renewal, RenewalPolicy};

fn bench_renewal(c: &mut Criterion) {
    let policy = RenewalPolicy::default();
    let now = Utc::now();
    let active_end = now + Duration::days(40);
    let expired_end = now - Duration::days(40);

    c.bench_function("compute_renewal_active", |b| {
        b.iter(|| compute_renewal(black_box(active_end), black_box(now), black_box(180), &policy).unwrap());
    });
    c.bench_function("compute_renewal_expired", |b| {
        b.iter(|| compute_renewal(black_box(expired_end), black_box(now), black_box(30), &policy).unwrap());
    });
}

fn bench_transition_table(c: &mut Criterion) {
    let all = [PaymentStatus::Pending, PaymentStatus::Processing, PaymentStatus::Success, PaymentStatus::Failed, PaymentStatus::Cancelled];
    c.bench_function("payment_transition_lookup", |b| {
        b.iter(|| {
            let mut legal = 0;
            for from in all {
                for to in all {
                    if black_box(from).can_transition_to(black_box(to)) { legal += 1; }
                }
            }
            legal
        });
    });
}

fn bench_pii(c: &mut Criterion) {
    let cipher = PiiCipher::generate();
    let blob = cipher.encrypt_str("110101199001011234").unwrap();
    c.bench_function("pii_decrypt", |b| {
        b.iter(|| cipher.decrypt_str(black_box(&blob)).unwrap());
    });
}

criterion_group!(benches, bench_renewal, bench_transition_table, bench_pii);
criterion_main!(benches);
