//! Lazy `(g, rhs)` estimate store, keyed by cell identity.
//!
//! Materialises a cell's estimate pair on first touch rather than
//! preallocating one for every cell the host map might contain.

use rustc_hash::FxHashMap;
use std::hash::Hash;

use crate::num::INFINITY;

#[derive(Debug, Clone, Copy)]
struct Estimate {
    g: f64,
    rhs: f64,
}

impl Default for Estimate {
    fn default() -> Self {
        Estimate {
            g: INFINITY,
            rhs: INFINITY,
        }
    }
}

/// Store of `(g, rhs)` estimate pairs for a single planning episode.
///
/// `rhs(goal)` is pinned to `0.0` regardless of whether the goal has been
/// otherwise materialised, per the distilled spec's state-store invariant.
pub struct StateStore<Id> {
    goal: Id,
    estimates: FxHashMap<Id, Estimate>,
}

impl<Id: Copy + Eq + Hash> StateStore<Id> {
    pub fn new(goal: Id) -> Self {
        StateStore {
            goal,
            estimates: FxHashMap::default(),
        }
    }

    /// Reset the store for a fresh episode anchored at `goal`.
    pub fn reset(&mut self, goal: Id) {
        self.goal = goal;
        self.estimates.clear();
    }

    pub fn g(&self, u: Id) -> f64 {
        self.estimates.get(&u).map_or(INFINITY, |e| e.g)
    }

    pub fn set_g(&mut self, u: Id, v: f64) {
        self.estimates.entry(u).or_default().g = v;
    }

    pub fn rhs(&self, u: Id) -> f64 {
        if u == self.goal {
            0.0
        } else {
            self.estimates.get(&u).map_or(INFINITY, |e| e.rhs)
        }
    }

    /// Sets `rhs(u)`; a no-op if `u` is the goal, whose rhs is always 0.
    pub fn set_rhs(&mut self, u: Id, v: f64) {
        if u == self.goal {
            return;
        }
        self.estimates.entry(u).or_default().rhs = v;
    }

    /// Whether `u` has been touched by the store yet. Exposed for tests and
    /// for invariant checks; the planner itself never needs it.
    #[cfg(test)]
    fn is_materialised(&self, u: Id) -> bool {
        self.estimates.contains_key(&u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_cells_default_to_infinite_estimates() {
        let store: StateStore<u32> = StateStore::new(0);
        assert_eq!(store.g(7), INFINITY);
        assert_eq!(store.rhs(7), INFINITY);
        assert!(!store.is_materialised(7));
    }

    #[test]
    fn rhs_of_goal_is_always_zero() {
        let mut store: StateStore<u32> = StateStore::new(42);
        assert_eq!(store.rhs(42), 0.0);
        store.set_rhs(42, 99.0);
        assert_eq!(store.rhs(42), 0.0);
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut store: StateStore<u32> = StateStore::new(0);
        store.set_g(5, 3.5);
        store.set_rhs(5, 2.0);
        assert_eq!(store.g(5), 3.5);
        assert_eq!(store.rhs(5), 2.0);
    }

    #[test]
    fn reset_clears_all_estimates_and_re_anchors_goal() {
        let mut store: StateStore<u32> = StateStore::new(0);
        store.set_g(5, 3.5);
        store.reset(9);
        assert_eq!(store.g(5), INFINITY);
        assert_eq!(store.rhs(9), 0.0);
    }
}
