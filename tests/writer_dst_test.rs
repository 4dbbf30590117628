//! Rotating Writer Deterministic Simulation Tests
//!
//! VOPR-style tests for RotatingListWriter with multiple seeds.

use ledis::writer_dst::{run_writer_batch, summarize_writer_batch, WriterDSTConfig, WriterDSTHarness};
use ledis::SimulatedStoreConfig;

// =============================================================================
// Standard Configuration Tests - 100+ Seeds
// =============================================================================

#[test]
fn test_writer_dst_100_seeds_standard() {
    let results = run_writer_batch(0, 100, 500, WriterDSTConfig::new);
    let summary = summarize_writer_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with standard config");
}

#[test]
fn test_writer_dst_100_seeds_high_chaos() {
    let results = run_writer_batch(1000, 100, 500, WriterDSTConfig::high_chaos);
    let summary = summarize_writer_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with high chaos");

    let errors: u64 = results.iter().map(|r| r.transport_errors).sum();
    assert!(errors > 0, "high chaos should produce transport errors");
}

#[test]
fn test_writer_dst_100_seeds_tight_cap() {
    let results = run_writer_batch(2000, 100, 300, WriterDSTConfig::tight_cap);
    let summary = summarize_writer_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with cap 1");
}

#[test]
fn test_writer_dst_100_seeds_long_cycle() {
    let results = run_writer_batch(3000, 100, 500, WriterDSTConfig::long_cycle);
    let summary = summarize_writer_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with cycle > cap");
}

// =============================================================================
// Stress Tests
// =============================================================================

#[test]
fn test_writer_dst_stress_5000_ops() {
    let mut harness = WriterDSTHarness::with_seed(12345);
    harness.run(5000);
    let result = harness.result();
    println!("Stress 5000 ops: {}", result.summary());
    assert!(result.is_success(), "5000 ops should maintain invariants");
}

#[test]
fn test_writer_dst_stress_high_chaos_2000_ops() {
    let mut harness = WriterDSTHarness::new(WriterDSTConfig::high_chaos(99999));
    harness.run(2000);
    let result = harness.result();
    let stats = harness.store_stats();
    println!(
        "Stress high chaos 2000 ops: {} (push failures:{}, trim failures:{}, lost replies:{})",
        result.summary(),
        stats.push_failures,
        stats.trim_failures,
        stats.replies_lost
    );
    assert!(result.is_success(), "High chaos stress should maintain invariants");
}

// =============================================================================
// Edge Case Tests
// =============================================================================

#[test]
fn test_writer_dst_every_trim_fails() {
    let mut store = SimulatedStoreConfig::no_faults(4242);
    store.trim_fail_prob = 1.0;
    let config = WriterDSTConfig {
        seed: 4242,
        cap: 3,
        cycle: 2,
        truncate_prob: 0.0,
        store,
        ..Default::default()
    };

    let mut harness = WriterDSTHarness::new(config);
    harness.run(200);
    let result = harness.result();
    println!("Every trim fails: {}", result.summary());
    assert!(result.is_success());
    assert_eq!(result.transport_errors, 0, "trim failures are never reported as write errors");
    assert!(harness.store_stats().trim_failures > 0);
}

#[test]
fn test_writer_dst_every_push_fails() {
    let mut store = SimulatedStoreConfig::no_faults(777);
    store.push_fail_prob = 1.0;
    let config = WriterDSTConfig {
        seed: 777,
        store,
        ..Default::default()
    };

    let mut harness = WriterDSTHarness::new(config);
    harness.run(300);
    let result = harness.result();
    println!("Every push fails: {}", result.summary());
    assert!(result.is_success());
    assert_eq!(result.stored, 0);
    // The step counter still advances, so rotation keeps its schedule
    assert_eq!(result.rotation_trims, result.writes / 10);
}

// =============================================================================
// Mixed Configuration Tests
// =============================================================================

#[test]
fn test_writer_dst_50_seeds_mixed_configs() {
    let mut failures = Vec::new();

    for seed in 0..50 {
        let config = match seed % 4 {
            0 => WriterDSTConfig::new(seed),
            1 => WriterDSTConfig::high_chaos(seed),
            2 => WriterDSTConfig::tight_cap(seed),
            _ => WriterDSTConfig::long_cycle(seed),
        };

        let mut harness = WriterDSTHarness::new(config);
        harness.run(500);
        let result = harness.result();

        if !result.is_success() {
            failures.push(result.clone());
        }
    }

    for f in &failures {
        println!("FAILED: {}", f.summary());
        for v in &f.invariant_violations {
            println!("  {}", v);
        }
    }

    assert!(failures.is_empty(), "{} seeds failed", failures.len());
}

// =============================================================================
// Longer Tests (ignored by default)
// =============================================================================

#[test]
#[ignore]
fn test_writer_dst_1000_seeds() {
    let results = run_writer_batch(0, 1000, 1000, WriterDSTConfig::high_chaos);
    let summary = summarize_writer_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 1000, "All 1000 seeds should pass");
}
