//! Deterministic Simulation Testing for the rotating writer
//!
//! VOPR-style harness driving a [`RotatingListWriter`] over a
//! fault-injecting store:
//! - Seeded operation mix (write, tail, truncate, size)
//! - Invariant checks against the backing list after each operation
//! - A final read-back with faults suppressed, which must match the list
//! - Seed-based reproducibility for debugging

use crate::buggify;
use crate::config::LedisConfig;
use crate::store::{InMemoryListStore, SimulatedListStore, SimulatedStoreConfig, SimulatedStoreStats};
use crate::writer::{RotatingListWriter, WriteStatus};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const LIST: &str = "dst:log";

/// Configuration for writer DST
#[derive(Debug, Clone)]
pub struct WriterDSTConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    pub cap: usize,
    pub cycle: usize,
    /// Step counter at start; wrapped by the writer
    pub initial_step: usize,
    /// Probability of a tail read (vs write)
    pub tail_prob: f64,
    /// Probability of a manual truncate
    pub truncate_prob: f64,
    /// Probability of a size read
    pub size_prob: f64,
    /// Store fault injection
    pub store: SimulatedStoreConfig,
}

impl Default for WriterDSTConfig {
    fn default() -> Self {
        WriterDSTConfig {
            seed: 0,
            cap: 50,
            cycle: 10,
            initial_step: 0,
            tail_prob: 0.05,
            truncate_prob: 0.01,
            size_prob: 0.05,
            store: SimulatedStoreConfig::new(0),
        }
    }
}

impl WriterDSTConfig {
    pub fn new(seed: u64) -> Self {
        WriterDSTConfig {
            seed,
            initial_step: (seed % 10) as usize,
            store: SimulatedStoreConfig::new(seed),
            ..Default::default()
        }
    }

    /// Frequent store failures
    pub fn high_chaos(seed: u64) -> Self {
        WriterDSTConfig {
            seed,
            cap: 20,
            cycle: 7,
            initial_step: (seed % 7) as usize,
            tail_prob: 0.10,
            truncate_prob: 0.03,
            size_prob: 0.10,
            store: SimulatedStoreConfig::high_chaos(seed),
        }
    }

    /// Capacity of one, trimmed on every write
    pub fn tight_cap(seed: u64) -> Self {
        WriterDSTConfig {
            seed,
            cap: 1,
            cycle: 1,
            initial_step: 0,
            tail_prob: 0.10,
            truncate_prob: 0.02,
            size_prob: 0.10,
            store: SimulatedStoreConfig::new(seed),
        }
    }

    /// Cycle longer than the capacity
    pub fn long_cycle(seed: u64) -> Self {
        WriterDSTConfig {
            seed,
            cap: 5,
            cycle: 64,
            initial_step: (seed % 64) as usize,
            store: SimulatedStoreConfig::new(seed),
            ..Default::default()
        }
    }
}

/// Operation type for logging
#[derive(Debug, Clone)]
pub enum WriterOp {
    Write { seq: u64 },
    Tail { n: usize },
    Truncate { size: usize },
    Size,
}

/// Result of a writer DST run
#[derive(Debug, Clone)]
pub struct WriterDSTResult {
    pub seed: u64,
    pub total_operations: u64,
    pub writes: u64,
    pub stored: u64,
    pub transport_errors: u64,
    pub rotation_trims: u64,
    pub tails: u64,
    pub truncates: u64,
    pub sizes: u64,
    /// Faults that fired during the run, from the buggify counters
    pub faults_injected: u64,
    pub invariant_violations: Vec<String>,
    pub last_op: Option<WriterOp>,
}

impl WriterDSTResult {
    pub fn new(seed: u64) -> Self {
        WriterDSTResult {
            seed,
            total_operations: 0,
            writes: 0,
            stored: 0,
            transport_errors: 0,
            rotation_trims: 0,
            tails: 0,
            truncates: 0,
            sizes: 0,
            faults_injected: 0,
            invariant_violations: Vec::new(),
            last_op: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.invariant_violations.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Seed {}: {} ops (write:{}, stored:{}, failed:{}, rotations:{}, tail:{}, truncate:{}, size:{}), {} faults, {} violations",
            self.seed,
            self.total_operations,
            self.writes,
            self.stored,
            self.transport_errors,
            self.rotation_trims,
            self.tails,
            self.truncates,
            self.sizes,
            self.faults_injected,
            self.invariant_violations.len()
        )
    }
}

/// DST harness for the rotating writer
pub struct WriterDSTHarness {
    config: WriterDSTConfig,
    rng: ChaCha8Rng,
    writer: RotatingListWriter<SimulatedListStore<InMemoryListStore>>,
    /// Faulty view of the store, for stats
    store: SimulatedListStore<InMemoryListStore>,
    /// Fault-free view of the same lists
    backing: InMemoryListStore,
    result: WriterDSTResult,
    next_seq: u64,
    /// Writes issued since the harness started, for the step check
    expected_step: usize,
    /// Some rotation trim has failed, so the length bound no longer holds
    trim_failed: bool,
}

impl WriterDSTHarness {
    pub fn new(mut config: WriterDSTConfig) -> Self {
        config.cap = config.cap.max(1);
        config.cycle = config.cycle.max(1);
        buggify::reset_stats();

        let backing = InMemoryListStore::new();
        let store = SimulatedListStore::new(backing.clone(), config.store.clone());
        let writer_config = LedisConfig {
            list: LIST.to_string(),
            cap: config.cap,
            cycle: config.cycle,
            step: config.initial_step,
            ..LedisConfig::default()
        };
        let writer = RotatingListWriter::with_connection(store.clone(), writer_config)
            .expect("cap and cycle clamped to at least 1")
            .with_diagnostics(std::io::sink())
            .with_console(std::io::sink());

        WriterDSTHarness {
            rng: ChaCha8Rng::seed_from_u64(config.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            result: WriterDSTResult::new(config.seed),
            expected_step: config.initial_step % config.cycle,
            config,
            writer,
            store,
            backing,
            next_seq: 0,
            trim_failed: false,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(WriterDSTConfig::new(seed))
    }

    fn run_single_op(&mut self) {
        let roll: f64 = self.rng.gen();
        let tail_threshold = self.config.tail_prob;
        let truncate_threshold = tail_threshold + self.config.truncate_prob;
        let size_threshold = truncate_threshold + self.config.size_prob;

        let check = if roll < tail_threshold {
            self.do_tail()
        } else if roll < truncate_threshold {
            self.do_truncate()
        } else if roll < size_threshold {
            self.do_size()
        } else {
            self.do_write()
        };

        self.result.total_operations += 1;
        self.result.faults_injected = buggify::get_stats().total_triggers();

        if let Err(violation) = check.and_then(|()| self.check_invariants()) {
            self.result.invariant_violations.push(format!(
                "Op #{}: {:?} - {}",
                self.result.total_operations, self.result.last_op, violation
            ));
        }
    }

    fn do_write(&mut self) -> Result<(), String> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.result.last_op = Some(WriterOp::Write { seq });

        let before = self.store.stats();
        let message = format!("line:{}", seq);
        let outcome = self.writer.write(&message);
        let after = self.store.stats();

        self.result.writes += 1;
        self.expected_step = (self.expected_step + 1) % self.config.cycle;

        match &outcome.status {
            WriteStatus::Stored { .. } => self.result.stored += 1,
            WriteStatus::TransportError(_) => self.result.transport_errors += 1,
        }

        // Exactly one push per write, and a trim only when the cycle closes
        if after.push_attempts != before.push_attempts + 1 {
            return Err("write did not issue exactly one push".to_string());
        }
        let trims_issued = after.trim_attempts - before.trim_attempts;
        if outcome.trimmed != (self.expected_step == 0) {
            return Err(format!(
                "trimmed={} but step is now {}",
                outcome.trimmed, self.expected_step
            ));
        }
        if trims_issued != u64::from(outcome.trimmed) {
            return Err(format!("{} trims issued for one write", trims_issued));
        }

        let lines = self.backing.snapshot(LIST);
        if let WriteStatus::Stored { len } = &outcome.status {
            if *len == 0 {
                return Err("stored push reported an empty list".to_string());
            }
            // The trim may have dropped older entries but never the newest
            if lines.first() != Some(&message) {
                return Err(format!("stored line {} is not at the head", message));
            }
        }

        if outcome.trimmed {
            self.result.rotation_trims += 1;
            let trim_reached_store = after.trim_failures == before.trim_failures
                && after.timeouts == before.timeouts;
            if trim_reached_store {
                if lines.len() > self.config.cap {
                    return Err(format!(
                        "length {} exceeds cap {} after rotation",
                        lines.len(),
                        self.config.cap
                    ));
                }
            } else {
                self.trim_failed = true;
            }
        }
        Ok(())
    }

    fn do_tail(&mut self) -> Result<(), String> {
        let n = self.rng.gen_range(0..=self.config.cap + self.config.cycle);
        self.result.last_op = Some(WriterOp::Tail { n });
        self.result.tails += 1;

        let Ok(tail) = self.writer.tail(n) else {
            return Ok(());
        };
        let mut expected: Vec<String> = self.backing.snapshot(LIST).into_iter().take(n).collect();
        expected.reverse();
        if tail != expected {
            return Err(format!("tail({}) = {:?}, expected {:?}", n, tail, expected));
        }
        Ok(())
    }

    fn do_truncate(&mut self) -> Result<(), String> {
        let size = self.rng.gen_range(0..=self.config.cap);
        self.result.last_op = Some(WriterOp::Truncate { size });
        self.result.truncates += 1;

        let prev = self.backing.snapshot(LIST).len();
        let outcome = self.writer.truncate(size);
        let now = self.backing.snapshot(LIST).len();
        let truncated = prev.min(size);

        match outcome {
            Ok(()) if now != truncated => Err(format!(
                "truncate({}) left {} entries, expected {}",
                size, now, truncated
            )),
            // A failed truncate either never ran or lost its reply
            Err(_) if now != prev && now != truncated => Err(format!(
                "failed truncate({}) left {} entries (was {})",
                size, now, prev
            )),
            _ => Ok(()),
        }
    }

    fn do_size(&mut self) -> Result<(), String> {
        self.result.last_op = Some(WriterOp::Size);
        self.result.sizes += 1;

        match self.writer.size() {
            Ok(n) if n != self.backing.snapshot(LIST).len() => {
                Err(format!("size() = {} disagrees with the list", n))
            }
            _ => Ok(()),
        }
    }

    fn check_invariants(&self) -> Result<(), String> {
        // Invariant 1: step stays in range and counts writes modulo cycle
        let step = self.writer.step();
        if step >= self.config.cycle {
            return Err(format!("step {} out of range for cycle {}", step, self.config.cycle));
        }
        if step != self.expected_step {
            return Err(format!("step {} but expected {}", step, self.expected_step));
        }

        // Invariant 2: newest first, no duplicates, nothing invented
        let lines = self.backing.snapshot(LIST);
        let mut last_seq = None;
        for line in &lines {
            let seq = line
                .strip_prefix("line:")
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| format!("unexpected entry {:?}", line))?;
            if seq >= self.next_seq {
                return Err(format!("entry {} was never written", line));
            }
            if let Some(last) = last_seq {
                if seq >= last {
                    return Err(format!("entries out of order at {}", line));
                }
            }
            last_seq = Some(seq);
        }

        // Invariant 3: while every trim has landed, the list is bounded
        if !self.trim_failed && lines.len() > self.config.cap + self.config.cycle {
            return Err(format!(
                "length {} exceeds cap {} + cycle {}",
                lines.len(),
                self.config.cap,
                self.config.cycle
            ));
        }

        Ok(())
    }

    /// With faults suppressed, `size` and `tail` must agree with the list
    fn check_quiescent(&mut self) -> Result<(), String> {
        let _quiet = crate::suppress_buggify!();
        let lines = self.backing.snapshot(LIST);

        let size = self
            .writer
            .size()
            .map_err(|e| format!("size() failed with faults off: {}", e))?;
        if size != lines.len() {
            return Err(format!("size() = {} but the list holds {}", size, lines.len()));
        }

        let mut expected = lines;
        expected.reverse();
        let tail = self
            .writer
            .tail(usize::MAX)
            .map_err(|e| format!("tail() failed with faults off: {}", e))?;
        if tail != expected {
            return Err(format!("full tail {:?} disagrees with the list", tail));
        }
        Ok(())
    }

    pub fn run(&mut self, operations: usize) {
        for _ in 0..operations {
            self.run_single_op();
            if !self.result.invariant_violations.is_empty() {
                return;
            }
        }
        if let Err(violation) = self.check_quiescent() {
            self.result
                .invariant_violations
                .push(format!("Quiescent check: {}", violation));
        }
    }

    pub fn result(&self) -> &WriterDSTResult {
        &self.result
    }

    pub fn store_stats(&self) -> SimulatedStoreStats {
        self.store.stats()
    }

    pub fn writer(&self) -> &RotatingListWriter<SimulatedListStore<InMemoryListStore>> {
        &self.writer
    }
}

/// Run a batch of DST tests
pub fn run_writer_batch(
    start_seed: u64,
    num_seeds: usize,
    ops_per_seed: usize,
    config_fn: fn(u64) -> WriterDSTConfig,
) -> Vec<WriterDSTResult> {
    (0..num_seeds)
        .map(|i| {
            let seed = start_seed + i as u64;
            let config = config_fn(seed);
            let mut harness = WriterDSTHarness::new(config);
            harness.run(ops_per_seed);
            harness.result().clone()
        })
        .collect()
}

/// Summarize batch results
pub fn summarize_writer_batch(results: &[WriterDSTResult]) -> String {
    let total = results.len();
    let passed = results.iter().filter(|r| r.is_success()).count();
    let failed = total - passed;
    let total_ops: u64 = results.iter().map(|r| r.total_operations).sum();
    let total_errors: u64 = results.iter().map(|r| r.transport_errors).sum();
    let total_faults: u64 = results.iter().map(|r| r.faults_injected).sum();

    let mut summary = format!(
        "Writer DST Summary\n\
         ==================\n\
         Seeds: {} total, {} passed, {} failed\n\
         Total operations: {}\n\
         Transport errors: {}\n\
         Faults injected: {}\n",
        total, passed, failed, total_ops, total_errors, total_faults
    );

    if failed > 0 {
        summary.push_str("\nFailed seeds:\n");
        for result in results.iter().filter(|r| !r.is_success()) {
            summary.push_str(&format!("  Seed {}: {}\n", result.seed, result.summary()));
            for violation in &result.invariant_violations {
                summary.push_str(&format!("    - {}\n", violation));
            }
        }
    }

    summary
}
