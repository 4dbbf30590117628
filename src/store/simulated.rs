//! Simulated List Store with Fault Injection
//!
//! DST wrapper that injects failures into another store using buggify.
//! Failures are decided by a seeded RNG, so a failing seed replays exactly.
//! Scripted failures (`fail_next_pushes`, `fail_next_trims`) fire before any
//! random fault and are meant for scenario tests.

use super::{Connect, ListStore, StoreError};
use crate::buggify::faults::list_store as faults;
use crate::config::LedisConfig;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Configuration for simulated fault injection
#[derive(Debug, Clone)]
pub struct SimulatedStoreConfig {
    /// RNG seed
    pub seed: u64,
    /// Probability of LPUSH failure
    pub push_fail_prob: f64,
    /// Probability of LTRIM failure
    pub trim_fail_prob: f64,
    /// Probability of LRANGE failure
    pub range_fail_prob: f64,
    /// Probability of LLEN failure
    pub len_fail_prob: f64,
    /// Probability of QUIT failure
    pub close_fail_prob: f64,
    /// Probability of any call timing out before it reaches the store
    pub timeout_prob: f64,
    /// Probability that a command is applied but its reply is lost
    pub reply_lost_prob: f64,
}

impl Default for SimulatedStoreConfig {
    fn default() -> Self {
        SimulatedStoreConfig {
            seed: 0,
            push_fail_prob: 0.01,   // 1%
            trim_fail_prob: 0.01,   // 1%
            range_fail_prob: 0.01,  // 1%
            len_fail_prob: 0.01,    // 1%
            close_fail_prob: 0.01,  // 1%
            timeout_prob: 0.005,    // 0.5%
            reply_lost_prob: 0.002, // 0.2%
        }
    }
}

impl SimulatedStoreConfig {
    pub fn new(seed: u64) -> Self {
        SimulatedStoreConfig {
            seed,
            ..Default::default()
        }
    }

    /// High chaos configuration for stress testing
    pub fn high_chaos(seed: u64) -> Self {
        SimulatedStoreConfig {
            seed,
            push_fail_prob: 0.15,
            trim_fail_prob: 0.20,
            range_fail_prob: 0.05,
            len_fail_prob: 0.05,
            close_fail_prob: 0.20,
            timeout_prob: 0.05,
            reply_lost_prob: 0.05,
        }
    }

    /// No random faults - scripted failures only
    pub fn no_faults(seed: u64) -> Self {
        SimulatedStoreConfig {
            seed,
            push_fail_prob: 0.0,
            trim_fail_prob: 0.0,
            range_fail_prob: 0.0,
            len_fail_prob: 0.0,
            close_fail_prob: 0.0,
            timeout_prob: 0.0,
            reply_lost_prob: 0.0,
        }
    }
}

/// Statistics for fault injection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedStoreStats {
    pub push_attempts: u64,
    pub push_failures: u64,
    pub trim_attempts: u64,
    pub trim_failures: u64,
    pub range_attempts: u64,
    pub range_failures: u64,
    pub len_attempts: u64,
    pub len_failures: u64,
    pub close_attempts: u64,
    pub close_failures: u64,
    pub timeouts: u64,
    pub replies_lost: u64,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Push,
    Trim,
    Range,
    Len,
    Close,
}

impl Op {
    fn fault(self) -> &'static str {
        match self {
            Op::Push => faults::PUSH_FAIL,
            Op::Trim => faults::TRIM_FAIL,
            Op::Range => faults::RANGE_FAIL,
            Op::Len => faults::LEN_FAIL,
            Op::Close => faults::CLOSE_FAIL,
        }
    }

    fn fail_prob(self, config: &SimulatedStoreConfig) -> f64 {
        match self {
            Op::Push => config.push_fail_prob,
            Op::Trim => config.trim_fail_prob,
            Op::Range => config.range_fail_prob,
            Op::Len => config.len_fail_prob,
            Op::Close => config.close_fail_prob,
        }
    }

    fn command(self) -> &'static str {
        match self {
            Op::Push => "LPUSH",
            Op::Trim => "LTRIM",
            Op::Range => "LRANGE",
            Op::Len => "LLEN",
            Op::Close => "QUIT",
        }
    }
}

#[derive(Debug)]
struct SimulatedStoreInner {
    config: SimulatedStoreConfig,
    rng: ChaCha8Rng,
    stats: SimulatedStoreStats,
    scripted_push_failures: usize,
    scripted_trim_failures: usize,
}

/// Simulated list store that wraps another store and injects faults.
///
/// Clones share the fault configuration, RNG, stats and scripted failures.
/// Separate stores never affect each other, whichever thread they run on.
#[derive(Debug, Clone)]
pub struct SimulatedListStore<S: ListStore> {
    inner_store: S,
    state: Arc<Mutex<SimulatedStoreInner>>,
}

impl<S: ListStore> SimulatedListStore<S> {
    pub fn new(inner_store: S, config: SimulatedStoreConfig) -> Self {
        SimulatedListStore {
            inner_store,
            state: Arc::new(Mutex::new(SimulatedStoreInner {
                rng: ChaCha8Rng::seed_from_u64(config.seed),
                config,
                stats: SimulatedStoreStats::default(),
                scripted_push_failures: 0,
                scripted_trim_failures: 0,
            })),
        }
    }

    /// Make the next `n` pushes fail with a connection error
    pub fn fail_next_pushes(&self, n: usize) {
        self.state.lock().scripted_push_failures += n;
    }

    /// Make the next `n` trims fail with an error reply
    pub fn fail_next_trims(&self, n: usize) {
        self.state.lock().scripted_trim_failures += n;
    }

    pub fn config(&self) -> SimulatedStoreConfig {
        self.state.lock().config.clone()
    }

    pub fn stats(&self) -> SimulatedStoreStats {
        self.state.lock().stats.clone()
    }

    pub fn reset_stats(&self) {
        self.state.lock().stats = SimulatedStoreStats::default();
    }

    pub fn inner(&self) -> &S {
        &self.inner_store
    }

    /// Decide the fate of one call before it reaches the inner store.
    /// `Ok(true)` means the command runs but its reply is lost.
    fn inject(&self, op: Op) -> Result<bool, StoreError> {
        let mut guard = self.state.lock();
        let s = &mut *guard;

        match op {
            Op::Push => s.stats.push_attempts += 1,
            Op::Trim => s.stats.trim_attempts += 1,
            Op::Range => s.stats.range_attempts += 1,
            Op::Len => s.stats.len_attempts += 1,
            Op::Close => s.stats.close_attempts += 1,
        }

        let scripted = match op {
            Op::Push if s.scripted_push_failures > 0 => {
                s.scripted_push_failures -= 1;
                true
            }
            Op::Trim if s.scripted_trim_failures > 0 => {
                s.scripted_trim_failures -= 1;
                true
            }
            _ => false,
        };

        if !scripted && crate::buggify!(&mut s.rng, faults::TIMEOUT, s.config.timeout_prob) {
            s.stats.timeouts += 1;
            return Err(StoreError::Timeout(format!(
                "simulated {} timeout",
                op.command()
            )));
        }

        if scripted || crate::buggify!(&mut s.rng, op.fault(), op.fail_prob(&s.config)) {
            match op {
                Op::Push => s.stats.push_failures += 1,
                Op::Trim => s.stats.trim_failures += 1,
                Op::Range => s.stats.range_failures += 1,
                Op::Len => s.stats.len_failures += 1,
                Op::Close => s.stats.close_failures += 1,
            }
            return Err(match op {
                Op::Push => StoreError::Connection("simulated LPUSH failure".to_string()),
                other => StoreError::Response(format!("simulated {} failure", other.command())),
            });
        }

        // Only mutating commands can lose a reply after being applied
        let reply_lost = matches!(op, Op::Push | Op::Trim)
            && crate::buggify!(&mut s.rng, faults::REPLY_LOST, s.config.reply_lost_prob);
        if reply_lost {
            s.stats.replies_lost += 1;
        }
        Ok(reply_lost)
    }

    fn lost_reply(op: Op) -> StoreError {
        StoreError::Connection(format!("connection reset after {}", op.command()))
    }
}

impl<S: ListStore> ListStore for SimulatedListStore<S> {
    fn push_head(&mut self, key: &str, value: &str) -> Result<usize, StoreError> {
        let reply_lost = self.inject(Op::Push)?;
        let len = self.inner_store.push_head(key, value)?;
        if reply_lost {
            return Err(Self::lost_reply(Op::Push));
        }
        Ok(len)
    }

    fn trim(&mut self, key: &str, start: isize, stop: isize) -> Result<(), StoreError> {
        let reply_lost = self.inject(Op::Trim)?;
        self.inner_store.trim(key, start, stop)?;
        if reply_lost {
            return Err(Self::lost_reply(Op::Trim));
        }
        Ok(())
    }

    fn range(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        self.inject(Op::Range)?;
        self.inner_store.range(key, start, stop)
    }

    fn len(&mut self, key: &str) -> Result<usize, StoreError> {
        self.inject(Op::Len)?;
        self.inner_store.len(key)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.inject(Op::Close)?;
        self.inner_store.close()
    }
}

impl<S: Connect> Connect for SimulatedListStore<S> {
    fn connect(config: &LedisConfig) -> Self {
        SimulatedListStore::new(S::connect(config), SimulatedStoreConfig::no_faults(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryListStore;

    #[test]
    fn test_no_faults_passes_through() {
        let backing = InMemoryListStore::new();
        let mut store = SimulatedListStore::new(backing.clone(), SimulatedStoreConfig::no_faults(1));

        for i in 0..100 {
            store.push_head("log", &format!("line {}", i)).unwrap();
        }
        store.trim("log", 0, 9).unwrap();

        assert_eq!(store.len("log").unwrap(), 10);
        assert_eq!(backing.snapshot("log")[0], "line 99");

        let stats = store.stats();
        assert_eq!(stats.push_attempts, 100);
        assert_eq!(stats.push_failures, 0);
        assert_eq!(stats.trim_attempts, 1);
    }

    #[test]
    fn test_scripted_push_failure_leaves_list_untouched() {
        let backing = InMemoryListStore::new();
        let mut store = SimulatedListStore::new(backing.clone(), SimulatedStoreConfig::no_faults(2));
        store.push_head("log", "kept").unwrap();

        store.fail_next_pushes(1);
        let err = store.push_head("log", "dropped").unwrap_err();
        assert_eq!(err.kind(), "ConnectionError");
        assert_eq!(backing.snapshot("log"), vec!["kept"]);

        // Only the next push was scripted
        store.push_head("log", "after").unwrap();
        assert_eq!(store.stats().push_failures, 1);
    }

    #[test]
    fn test_scripted_trim_failure() {
        let mut store =
            SimulatedListStore::new(InMemoryListStore::new(), SimulatedStoreConfig::no_faults(3));
        store.push_head("log", "a").unwrap();
        store.push_head("log", "b").unwrap();

        store.fail_next_trims(1);
        assert!(store.trim("log", 0, 0).is_err());
        assert_eq!(store.len("log").unwrap(), 2);

        store.trim("log", 0, 0).unwrap();
        assert_eq!(store.len("log").unwrap(), 1);
    }

    #[test]
    fn test_chaos_is_deterministic() {
        let run = |seed| {
            let mut store = SimulatedListStore::new(
                InMemoryListStore::new(),
                SimulatedStoreConfig::high_chaos(seed),
            );
            let outcomes: Vec<bool> = (0..200)
                .map(|i| store.push_head("log", &i.to_string()).is_ok())
                .collect();
            (outcomes, store.stats())
        };

        let (a, stats_a) = run(7);
        let (b, stats_b) = run(7);
        assert_eq!(a, b);
        assert_eq!(stats_a, stats_b);
        assert!(stats_a.push_failures + stats_a.timeouts > 0);
    }

    #[test]
    fn test_lost_reply_still_applies_push() {
        let backing = InMemoryListStore::new();
        let mut config = SimulatedStoreConfig::no_faults(4);
        config.reply_lost_prob = 1.0;
        let mut store = SimulatedListStore::new(backing.clone(), config);

        assert!(store.push_head("log", "applied").is_err());
        assert_eq!(backing.snapshot("log"), vec!["applied"]);
        assert_eq!(store.stats().replies_lost, 1);
    }

    #[test]
    fn test_fault_settings_stay_with_their_store() {
        let mut config = SimulatedStoreConfig::no_faults(5);
        config.push_fail_prob = 1.0;
        let mut failing = SimulatedListStore::new(InMemoryListStore::new(), config);

        // A quiet store built later on the same thread changes nothing
        let mut quiet =
            SimulatedListStore::new(InMemoryListStore::new(), SimulatedStoreConfig::no_faults(6));
        assert!(failing.push_head("log", "a").is_err());
        assert!(quiet.push_head("log", "b").is_ok());
        assert_eq!(failing.config().push_fail_prob, 1.0);
    }

    #[test]
    fn test_faults_follow_store_across_threads() {
        let mut config = SimulatedStoreConfig::no_faults(8);
        config.trim_fail_prob = 1.0;
        let store = SimulatedListStore::new(InMemoryListStore::new(), config);

        let mut moved = store.clone();
        let result = std::thread::spawn(move || {
            moved.push_head("log", "a").unwrap();
            moved.trim("log", 0, 0)
        })
        .join()
        .unwrap();

        assert!(result.is_err());
        assert_eq!(store.stats().trim_failures, 1);
    }
}
