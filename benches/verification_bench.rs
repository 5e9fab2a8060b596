use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rollcall::{
    core::{
        attendance::{AttendanceDecisionPolicy, CheckInState, ClassMode, VerificationEvidence},
        capability::{SubmittedDescriptor, SystemClock},
        identity::{euclidean_distance, BiometricVerifier, Descriptor},
    },
    storage::{AttendanceStore, EncryptedStore, MemoryStore},
    utils::config::PolicyConfig,
};
use std::sync::Arc;
use tempfile::tempdir;
use tokio::runtime::Runtime;
use uuid::Uuid;

fn descriptor(dimension: usize, shift: f32) -> Vec<f32> {
    (0..dimension)
        .map(|i| ((i as f32) * 0.37).sin() * 0.1 + shift)
        .collect()
}

fn bench_euclidean_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("euclidean_distance");

    for dimension in [64, 128, 512].iter() {
        let a = descriptor(*dimension, 0.0);
        let b = descriptor(*dimension, 0.01);

        group.bench_with_input(
            BenchmarkId::new("distance", dimension),
            &(a, b),
            |bench, (a, b)| {
                bench.iter(|| euclidean_distance(black_box(a), black_box(b)));
            },
        );
    }

    group.finish();
}

fn bench_verify_enrolled(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("face_verification");

    let config = PolicyConfig::default();
    let store: Arc<dyn AttendanceStore> = Arc::new(MemoryStore::new());
    let verifier = BiometricVerifier::new(store, Arc::new(SystemClock), &config);
    let user_id = Uuid::new_v4();

    rt.block_on(async {
        verifier
            .enroll(user_id, Descriptor::new(descriptor(config.descriptor_dimension, 0.0)))
            .await
            .unwrap()
    });
    let live = Descriptor::new(descriptor(config.descriptor_dimension, 0.01));

    group.bench_function("verify_enrolled", |b| {
        b.iter(|| {
            rt.block_on(async {
                let capture = SubmittedDescriptor::new(Some(live.clone()));
                verifier
                    .verify_enrolled(black_box(user_id), &capture)
                    .await
                    .unwrap()
            })
        });
    });

    group.finish();
}

fn bench_policy(c: &mut Criterion) {
    let policy = AttendanceDecisionPolicy::default();
    let mut group = c.benchmark_group("decision_policy");

    group.bench_function("can_check_in", |b| {
        let evidence = VerificationEvidence::new(2, true);
        b.iter(|| {
            policy.can_check_in(black_box(ClassMode::Online), black_box(&evidence))
                || policy.can_check_in(black_box(ClassMode::Offline), black_box(&evidence))
        });
    });

    group.bench_function("toggle_refused", |b| {
        let evidence = VerificationEvidence::new(1, false);
        b.iter(|| {
            policy
                .toggle_check_in(CheckInState::CheckedOut, black_box(ClassMode::Online), &evidence)
                .is_err()
        });
    });

    group.finish();
}

fn bench_encrypted_enrollment(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("encrypted_enrollment");
    group.sample_size(20);

    let temp_dir = tempdir().unwrap();
    let store = EncryptedStore::new(temp_dir.path(), b"bench_key").unwrap();
    let user_id = Uuid::new_v4();
    let enrolled = Descriptor::new(descriptor(128, 0.0));

    group.bench_function("upsert_biometric", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .upsert_biometric(black_box(user_id), enrolled.clone(), chrono::Utc::now())
                    .await
                    .unwrap()
            })
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_euclidean_distance,
    bench_verify_enrolled,
    bench_policy,
    bench_encrypted_enrollment
);
criterion_main!(benches);
