//!
//! Single-model Read x Codon matrix
//!
//! One cleavage model explains every condition: reads are keyed by
//! (region, leading mismatch) and carry a per-condition count vector, so
//! conditions pool their evidence during iteration and are separated again
//! by the final per-condition M-step.
//!
use super::{EmSummary, MatrixCore, RegularizeSummary, ReadObservation};
use crate::codon::Codon;
use crate::model::{CleavageModel, OffsetTable};
use crate::orf::OrfIndex;
use crate::region::Strand;
use log::debug;

#[derive(Clone, Debug)]
pub struct ReadCodonMatrix {
    pub(crate) core: MatrixCore,
}

impl ReadCodonMatrix {
    pub fn new(
        model: &CleavageModel,
        strand: Strand,
        min_profile_weight: f64,
        min_posterior: f64,
    ) -> ReadCodonMatrix {
        let table = OffsetTable::from_model(model, min_profile_weight, min_posterior);
        ReadCodonMatrix {
            core: MatrixCore::new(strand, table, None),
        }
    }
    ///
    /// Add one observation. Returns whether the read is backed by at least
    /// one edge.
    ///
    pub fn add_read(&mut self, obs: &ReadObservation, orf: Option<&OrfIndex>) -> bool {
        self.core.add_observation(
            obs.region,
            obs.leading_mismatch,
            None,
            &obs.counts,
            orf,
        )
    }
    ///
    /// Add every observation, returning the number of useful reads.
    ///
    pub fn add_all<'a, I>(&mut self, reads: I, orf: Option<&OrfIndex>) -> usize
    where
        I: IntoIterator<Item = &'a ReadObservation>,
    {
        let useful = reads
            .into_iter()
            .filter(|obs| self.add_read(obs, orf))
            .count();
        debug!(
            "added reads: {} useful, {} codons, {} edges",
            useful,
            self.core.n_codons(),
            self.core.n_edges()
        );
        useful
    }
    pub fn em(&mut self, threshold: f64, max_iter: usize) -> EmSummary {
        self.core.em(threshold, max_iter)
    }
    pub fn regularize(
        &mut self,
        lambda: f64,
        neighbor_factor: f64,
        min_neighbor_activity: f64,
    ) -> RegularizeSummary {
        self.core
            .regularize(lambda, neighbor_factor, min_neighbor_activity)
    }
    pub fn finalize(&mut self) {
        self.core.finalize_activities();
        self.core.compute_goodness();
    }
    pub fn to_codons(&self) -> Vec<Codon> {
        self.core.to_codons()
    }
    pub fn core(&self) -> &MatrixCore {
        &self.core
    }
}

//
// tests
//
