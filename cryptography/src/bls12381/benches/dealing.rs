use criterion::{criterion_group, BatchSize, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;
use vssq_cryptography::bls12381::dkg::{Action, Config, Instance};
use vssq_utils::optimal_threshold;

const CONTRIBUTORS: &[u32] = &[5, 10, 20, 50];

/// Runs an honest dealing among `n` in-memory instances.
fn deal(n: u32, t: u32, seed: u64) {
    let mut instances = (0..n)
        .map(|me| {
            Instance::new(Config {
                size: n,
                threshold: t,
                me,
                dealer: 0,
            })
            .unwrap()
        })
        .collect::<Vec<_>>();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut actions = Vec::new();
    for instance in instances.iter_mut() {
        actions.extend(instance.start(&mut rng).unwrap());
    }

    // Deliver the dealing
    for action in actions {
        match action {
            Action::Broadcast(msg) => {
                for instance in instances.iter_mut().skip(1) {
                    assert!(instance.handle_broadcast(0, &msg).unwrap().is_empty());
                }
            }
            Action::Send { to, msg } => {
                let instance = &mut instances[to as usize];
                assert!(instance.handle_private(0, &msg).unwrap().is_empty());
            }
            action => panic!("unexpected action: {:?}", action),
        }
    }

    // Finalize
    for instance in instances.iter_mut() {
        assert!(instance.next_timeout().unwrap().is_empty());
        assert!(instance.next_timeout().unwrap().is_empty());
        black_box(instance.end().1.unwrap());
    }
}

fn benchmark_dealing(c: &mut Criterion) {
    for &n in CONTRIBUTORS {
        let Some(t) = optimal_threshold(n) else {
            continue;
        };
        c.bench_function(&format!("{}/n={} t={}", module_path!(), n, t), |b| {
            b.iter_batched(|| n as u64, |seed| deal(n, t, seed), BatchSize::SmallInput);
        });
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = benchmark_dealing
}
