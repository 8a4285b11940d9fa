use dseq_core::rng::RngHandle;
use rand::Rng;

fn draws(seed: u64) -> Vec<f64> {
    let mut rng = RngHandle::from_seed(seed);
    (0..64).map(|_| rng.gen_range(290.0..=320.0)).collect()
}

#[test]
fn seeded_handles_replay_the_same_draws() {
    assert_eq!(draws(1234), draws(1234));
}

#[test]
fn distinct_seeds_diverge() {
    assert_ne!(draws(1), draws(2));
}

#[test]
fn draws_respect_the_requested_range() {
    assert!(draws(77).iter().all(|value| (290.0..=320.0).contains(value)));
}
