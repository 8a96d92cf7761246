//!
//! EM iteration
//!
//! One cycle, applied to all codons and edges:
//!
//! 1. expected reads per codon: `weight = prior * total_activity`
//! 2. normalize each read's weights to sum 1 (an unexplained read stays 0)
//! 3. scale each read's weights by its observed count
//! 4. M-step: `total_activity = sum of incident weights`
//!
//! The loop repeats until the largest activity change drops to the
//! threshold or the iteration cap is reached; hitting the cap is accepted
//! silently as a best-effort result.
//!
use super::MatrixCore;
use crate::common::Activity;
use log::debug;

///
/// Outcome of one EM run.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmSummary {
    pub iterations: usize,
    pub converged: bool,
    pub max_abs_change: f64,
}

impl std::fmt::Display for EmSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "iterations={} converged={} max_abs_change={:.2e}",
            self.iterations, self.converged, self.max_abs_change
        )
    }
}

impl MatrixCore {
    ///
    /// Steps 1 and 2: distribute activities onto edges and normalize per
    /// read, leaving each read's weights as its current posterior over
    /// candidate codons.
    ///
    pub(crate) fn expect_weights(&mut self) {
        for e in self.edges.iter_mut() {
            e.weight = e.prior * self.codons[e.codon.0].total_activity;
        }
        for r in self.reads.iter() {
            let s: f64 = r.edges.iter().map(|&e| self.edges[e.0].weight).sum();
            if s > 0.0 {
                for &e in r.edges.iter() {
                    self.edges[e.0].weight /= s;
                }
            }
        }
    }
    ///
    /// Step 3 over the summed count of every condition.
    ///
    pub(crate) fn scale_weights_by_total(&mut self) {
        for r in self.reads.iter() {
            for &e in r.edges.iter() {
                self.edges[e.0].weight *= r.total_count;
            }
        }
    }
    ///
    /// Step 3 restricted to one condition; every other condition's
    /// contribution is zeroed by its own count.
    ///
    pub(crate) fn scale_weights_by_condition(&mut self, cond: usize) {
        for r in self.reads.iter() {
            let count = r.counts[cond];
            for &e in r.edges.iter() {
                self.edges[e.0].weight *= count;
            }
        }
    }
    ///
    /// Step 4: recompute every codon's total activity, returning the
    /// largest absolute change.
    ///
    pub(crate) fn m_step(&mut self) -> f64 {
        let mut max_change = 0.0f64;
        let Self { codons, edges, .. } = self;
        for c in codons.iter_mut() {
            let total: Activity = c.edges.iter().map(|&e| edges[e.0].weight).sum();
            assert!(
                !total.is_nan(),
                "activity of codon {} became NaN",
                c.region
            );
            max_change = max_change.max((total - c.total_activity).abs());
            c.total_activity = total;
        }
        max_change
    }

    pub(crate) fn em_step(&mut self) -> f64 {
        self.expect_weights();
        self.scale_weights_by_total();
        self.m_step()
    }

    pub(crate) fn reset_activities(&mut self, value: Activity) {
        for c in self.codons.iter_mut() {
            c.total_activity = value;
        }
    }

    ///
    /// Run E/M cycles to convergence.
    ///
    pub(crate) fn em(&mut self, threshold: f64, max_iter: usize) -> EmSummary {
        let mut last = f64::INFINITY;
        for iteration in 1..=max_iter {
            last = self.em_step();
            if last <= threshold {
                let summary = EmSummary {
                    iterations: iteration,
                    converged: true,
                    max_abs_change: last,
                };
                debug!("em: {}", summary);
                return summary;
            }
        }
        // best effort: ribosome profiling data is inherently ambiguous
        let summary = EmSummary {
            iterations: max_iter,
            converged: false,
            max_abs_change: last,
        };
        debug!("em: {}", summary);
        summary
    }

    ///
    /// Final per-condition M-step.
    ///
    /// Runs one expectation pass, snapshots the shared prior weights, and
    /// then resolves each condition independently: scale by that
    /// condition's counts, sum into `activity[cond]`, restore the snapshot.
    /// Every condition therefore starts from the same shared prior.
    ///
    /// Afterwards the edge weights hold the total-count expectations again,
    /// ready for goodness of fit.
    ///
    pub(crate) fn finalize_activities(&mut self) {
        let n = self.n_conditions();
        self.expect_weights();
        let snapshot: Vec<f64> = self.edges.iter().map(|e| e.weight).collect();
        for c in self.codons.iter_mut() {
            c.activity = vec![0.0; n];
        }
        for cond in 0..n {
            self.scale_weights_by_condition(cond);
            let Self { codons, edges, .. } = &mut *self;
            for c in codons.iter_mut() {
                let a: Activity = c.edges.iter().map(|&e| edges[e.0].weight).sum();
                assert!(
                    !a.is_nan(),
                    "activity of codon {} became NaN",
                    c.region
                );
                c.activity[cond] = a;
            }
            for (e, &w) in self.edges.iter_mut().zip(snapshot.iter()) {
                e.weight = w;
            }
        }
        self.scale_weights_by_total();
    }
}

//
// tests
//
