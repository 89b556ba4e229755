// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for protect/unprotect.
//!
//! Measures both encryptor families across payload sizes, plus the cached
//! key-ring read path.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cloak::{
    DataProtectionProvider, DataProtector, EncryptionAlgorithm, InMemoryRepository, KeyRingConfig,
    ValidationAlgorithm,
};

fn protector_for(config: KeyRingConfig) -> DataProtector {
    let provider =
        DataProtectionProvider::with_repository(Arc::new(InMemoryRepository::new()), config)
            .expect("failed to wire provider");
    provider
        .create_protector("bench")
        .expect("failed to create protector")
}

fn bench_family(c: &mut Criterion, name: &str, config: KeyRingConfig) {
    let protector = protector_for(config);
    let mut group = c.benchmark_group(name);

    for size in [64usize, 256, 1024, 4096, 16384, 65536] {
        let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();

        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("protect", size), &data, |b, data| {
            b.iter(|| {
                let payload = protector.protect(black_box(data)).unwrap();
                black_box(payload)
            })
        });

        let payload = protector.protect(&data).unwrap();
        group.bench_with_input(BenchmarkId::new("unprotect", size), &payload, |b, payload| {
            b.iter(|| {
                let plaintext = protector.unprotect(black_box(payload)).unwrap();
                black_box(plaintext)
            })
        });
    }

    group.finish();
}

fn bench_cbc(c: &mut Criterion) {
    bench_family(
        c,
        "cbc_hmac",
        KeyRingConfig::default().with_algorithms(
            EncryptionAlgorithm::Aes256Cbc,
            ValidationAlgorithm::HmacSha512,
        ),
    );
}

fn bench_gcm(c: &mut Criterion) {
    bench_family(
        c,
        "gcm",
        KeyRingConfig::default().with_algorithms(
            EncryptionAlgorithm::Aes256Gcm,
            ValidationAlgorithm::HmacSha256,
        ),
    );
}

fn bench_ring_read_path(c: &mut Criterion) {
    let provider = DataProtectionProvider::with_repository(
        Arc::new(InMemoryRepository::new()),
        KeyRingConfig::default(),
    )
    .expect("failed to wire provider");
    provider
        .create_protector("warmup")
        .unwrap()
        .protect(b"warmup")
        .unwrap();

    c.bench_function("key_ring_current", |b| {
        b.iter(|| {
            let ring = provider.keyring().current().unwrap();
            black_box(ring)
        })
    });
}

criterion_group!(benches, bench_cbc, bench_gcm, bench_ring_read_path);
criterion_main!(benches);
