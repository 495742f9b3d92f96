use crate::core::{Node, Result, RouterError};
use std::collections::HashMap;
use std::sync::Mutex;

/// Passes a counter may go unused before it is dropped.
pub const IDLE_PASSES_BEFORE_EVICTION: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct Counter {
    value: f64,
    last_pass: u64,
}

#[derive(Debug, Default)]
struct State {
    counters: HashMap<String, Counter>,
    passes: u64,
}

/// Smooth weighted round-robin (the nginx variant).
///
/// Each pass adds every node's weight to its running counter, picks the
/// highest counter (first seen wins ties) and subtracts the total weight
/// from the winner. Over many passes selection frequency converges to
/// `weight / total` without bursts. Counters are keyed by address; one that
/// has not been among the candidates for [`IDLE_PASSES_BEFORE_EVICTION`]
/// passes is dropped, so departed nodes do not accumulate.
#[derive(Debug, Default)]
pub struct SmoothWeightedRoundRobin {
    state: Mutex<State>,
}

impl SmoothWeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one selection pass over `nodes`.
    ///
    /// The lock is held for the whole pass and nothing else.
    pub fn next<'a>(&self, nodes: &'a [Node]) -> Result<&'a Node> {
        if nodes.is_empty() {
            return Err(RouterError::NoAvailable);
        }
        let mut state = self.state.lock()?;
        state.passes += 1;
        let pass = state.passes;

        let mut total = 0.0;
        let mut selected: Option<(&'a Node, f64)> = None;
        for node in nodes {
            let weight = node.weight();
            total += weight;
            let counter = state
                .counters
                .entry(node.address().to_string())
                .or_insert(Counter {
                    value: 0.0,
                    last_pass: pass,
                });
            counter.value += weight;
            counter.last_pass = pass;
            let value = counter.value;
            if selected.is_none_or(|(_, best)| value > best) {
                selected = Some((node, value));
            }
        }

        let (node, _) = selected.ok_or(RouterError::NoAvailable)?;
        if let Some(winner) = state.counters.get_mut(node.address()) {
            winner.value -= total;
        }

        if pass % IDLE_PASSES_BEFORE_EVICTION == 0 {
            state
                .counters
                .retain(|_, counter| pass - counter.last_pass < IDLE_PASSES_BEFORE_EVICTION);
        }
        Ok(node)
    }

    pub fn current_weight(&self, address: &str) -> Result<Option<f64>> {
        Ok(self
            .state
            .lock()?
            .counters
            .get(address)
            .map(|counter| counter.value))
    }

    /// Copy of every counter, for diagnostics.
    pub fn snapshot(&self) -> Result<HashMap<String, f64>> {
        Ok(self
            .state
            .lock()?
            .counters
            .iter()
            .map(|(address, counter)| (address.clone(), counter.value))
            .collect())
    }
}
