//! BUGGIFY - FoundationDB-Style Fault Injection
//!
//! Deterministic, reproducible fault injection for the list-store layer.
//! Every store call in [`SimulatedListStore`](crate::store::SimulatedListStore)
//! is a potential injection site identified by a named fault. The caller
//! owns both the RNG and the probability, so two stores never share fault
//! settings.
//!
//! # Usage
//!
//! ```ignore
//! use ledis::buggify;
//!
//! if buggify!(&mut rng, faults::list_store::PUSH_FAIL, config.push_fail_prob) {
//!     return Err(StoreError::Connection("simulated".into()));
//! }
//! ```
//!
//! Given the same seed, faults fire at the same call sites in the same order.
//! Checks and triggers are counted per thread; a DST run resets the counts
//! when it starts and reads them back for its report.

pub mod faults;

use rand::Rng;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Checks and triggers of one fault
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultCount {
    pub checks: u64,
    pub triggers: u64,
}

/// Per-fault counters, ordered by fault id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuggifyStats {
    faults: BTreeMap<String, FaultCount>,
}

impl BuggifyStats {
    fn entry(&mut self, fault_id: &str) -> &mut FaultCount {
        self.faults.entry(fault_id.to_string()).or_default()
    }

    pub fn get(&self, fault_id: &str) -> FaultCount {
        self.faults.get(fault_id).copied().unwrap_or_default()
    }

    pub fn triggered(&self, fault_id: &str) -> u64 {
        self.get(fault_id).triggers
    }

    pub fn total_triggers(&self) -> u64 {
        self.faults.values().map(|count| count.triggers).sum()
    }

    pub fn trigger_rate(&self, fault_id: &str) -> f64 {
        let count = self.get(fault_id);
        if count.checks == 0 {
            return 0.0;
        }
        count.triggers as f64 / count.checks as f64
    }

    pub fn summary(&self) -> String {
        let mut out = String::from("BUGGIFY Statistics:");
        for (fault_id, count) in &self.faults {
            out.push_str(&format!(
                "\n  {}: {}/{} ({:.2}%)",
                fault_id,
                count.triggers,
                count.checks,
                self.trigger_rate(fault_id) * 100.0
            ));
        }
        out
    }
}

#[derive(Debug, Default)]
struct BuggifyContext {
    stats: BuggifyStats,
    /// Nesting depth of live suppressors
    suppressed: usize,
}

thread_local! {
    static BUGGIFY_CONTEXT: RefCell<BuggifyContext> = RefCell::new(BuggifyContext::default());
}

/// Counters for the current thread
pub fn get_stats() -> BuggifyStats {
    BUGGIFY_CONTEXT.with(|ctx| ctx.borrow().stats.clone())
}

pub fn reset_stats() {
    BUGGIFY_CONTEXT.with(|ctx| ctx.borrow_mut().stats = BuggifyStats::default());
}

/// While alive, no fault fires on this thread
pub struct BuggifySuppressor {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl BuggifySuppressor {
    pub fn new() -> Self {
        BUGGIFY_CONTEXT.with(|ctx| ctx.borrow_mut().suppressed += 1);
        BuggifySuppressor {
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Default for BuggifySuppressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BuggifySuppressor {
    fn drop(&mut self) {
        BUGGIFY_CONTEXT.with(|ctx| ctx.borrow_mut().suppressed -= 1);
    }
}

/// Roll for `fault_id` with the given probability. Suppressed checks are
/// not counted and do not consume the RNG.
#[inline]
pub fn should_buggify<R: Rng>(rng: &mut R, fault_id: &str, probability: f64) -> bool {
    BUGGIFY_CONTEXT.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        if ctx.suppressed > 0 {
            return false;
        }

        let triggered = probability > 0.0 && rng.gen_bool(probability.min(1.0));
        let count = ctx.stats.entry(fault_id);
        count.checks += 1;
        if triggered {
            count.triggers += 1;
        }
        triggered
    })
}

/// BUGGIFY macro - the main interface for fault injection
#[macro_export]
macro_rules! buggify {
    ($rng:expr, $fault_id:expr, $prob:expr) => {
        $crate::buggify::should_buggify($rng, $fault_id, $prob)
    };
}

/// Suppress all buggify calls within a scope
///
/// ```ignore
/// {
///     let _guard = suppress_buggify!();
///     // no faults injected here
/// }
/// ```
#[macro_export]
macro_rules! suppress_buggify {
    () => {
        $crate::buggify::BuggifySuppressor::new()
    };
}
