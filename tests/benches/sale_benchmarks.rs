//! # Token-Sale Benchmarks
//!
//! | Path | Hot spot |
//! |------|----------|
//! | admission | personal-message recovery per `/register` |
//! | ledger | `merge_logs` over a bootstrap-sized batch |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use k256::ecdsa::SigningKey;
use rand::Rng;
use shared_types::{EventKind, RawEvent, U256};
use std::time::Duration;
use ts_01_admission_gate::{address_from_pubkey, sign_personal_message, verify_signature, RpcSignature};
use ts_02_event_ledger::{merge_logs, Ledger, LedgerError};

const CHALLENGE: &[u8] = b"Please sign to confirm you accept the sale terms";

fn bench_signature_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission");
    group.measurement_time(Duration::from_secs(10));

    let key = SigningKey::random(&mut rand::thread_rng());
    let address = address_from_pubkey(key.verifying_key());
    let signature = sign_personal_message(&key, CHALLENGE).unwrap();
    let rpc = RpcSignature::from_rpc_hex(&signature).unwrap();

    group.bench_function("verify_personal_signature", |b| {
        b.iter(|| verify_signature(black_box(&address), black_box(CHALLENGE), black_box(&rpc)))
    });
    group.bench_function("parse_rpc_signature", |b| {
        b.iter(|| RpcSignature::from_rpc_hex(black_box(&signature)))
    });
    group.finish();
}

fn random_batch(events: usize) -> Vec<RawEvent> {
    let mut rng = rand::thread_rng();
    (0..events)
        .map(|i| {
            let block = rng.gen_range(1..=(events as u64 / 4).max(1));
            let kind = if rng.gen_bool(0.9) {
                EventKind::Buyin
            } else {
                EventKind::Injected
            };
            RawEvent::mined([0x5a; 20], block, i as u64, kind, U256::from(rng.gen::<u64>()))
        })
        .collect()
}

fn bench_merge_logs(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger");

    for size in [100usize, 1_000, 10_000] {
        let batch = random_batch(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("merge_logs", size), &batch, |b, batch| {
            b.iter(|| {
                futures::executor::block_on(merge_logs(&Ledger::new(), batch, |block| async move {
                    Ok::<_, LedgerError>(1_500_000_000 + block * 15)
                }))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_signature_verification, bench_merge_logs);
criterion_main!(benches);
