//! Cipher benchmarks.
//!
//! Run with: cargo bench -p acpe-core

use std::io::Cursor;
use std::sync::Arc;

use acpe_core::{
    CryptoService, KdfParams, Keypair, LocalKeyWrapper, PolicyRegistry, SensitivityLevel,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn service() -> CryptoService {
    CryptoService::new(
        Keypair::from_seed(&[1u8; 32]),
        Arc::new(LocalKeyWrapper::new("bench", [2u8; 32])),
        KdfParams::default(),
    )
}

fn bench_encrypt_by_level(c: &mut Criterion) {
    let svc = service();
    let registry = PolicyRegistry::default();
    let data = vec![0x42u8; 64 * 1024];

    let mut group = c.benchmark_group("encrypt_64k");
    group.throughput(Throughput::Bytes(data.len() as u64));
    for level in SensitivityLevel::ALL {
        let policy = registry.get(level).clone();
        group.bench_with_input(BenchmarkId::from_parameter(level), &policy, |b, policy| {
            b.iter(|| svc.encrypt(&data, policy, level, None).unwrap());
        });
    }
    group.finish();
}

fn bench_decrypt(c: &mut Criterion) {
    let svc = service();
    let level = SensitivityLevel::HighlySensitive;
    let policy = PolicyRegistry::default().get(level).clone();
    let payload = svc.encrypt(&vec![7u8; 64 * 1024], &policy, level, None).unwrap();

    c.bench_function("decrypt_64k_signed", |b| {
        b.iter(|| svc.decrypt(&payload, None).unwrap());
    });
}

fn bench_stream(c: &mut Criterion) {
    let svc = service();
    let level = SensitivityLevel::Confidential;
    let policy = PolicyRegistry::default().get(level).clone();
    let data = vec![9u8; 1024 * 1024];

    let mut group = c.benchmark_group("stream_1m");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("encrypt", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(data.len() + 1024);
            svc.encrypt_stream(Cursor::new(&data), &mut out, &policy, level, None)
                .unwrap()
        });
    });
    group.finish();
}

fn bench_password_kdf(c: &mut Criterion) {
    let svc = service();
    let level = SensitivityLevel::Internal;
    let policy = PolicyRegistry::default().get(level).clone();

    let mut group = c.benchmark_group("argon2id");
    group.sample_size(10);
    group.bench_function("encrypt_with_password", |b| {
        b.iter(|| svc.encrypt(b"short", &policy, level, Some(b"passphrase")).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_encrypt_by_level,
    bench_decrypt,
    bench_stream,
    bench_password_kdf
);
criterion_main!(benches);
