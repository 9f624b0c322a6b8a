use criterion::criterion_main;

mod dealing;

criterion_main!(
    dealing::benches,
    evaluate_point::benches,
    verify_share::benches,
);
