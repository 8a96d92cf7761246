//!
//! Joint multi-condition Read x Codon matrix
//!
//! One cleavage model per condition. The candidate offset table is built by
//! majority vote over the models, and every condition keeps its own read
//! records (keyed by region, leading mismatch and condition), so conditions
//! with different cleavage behavior are modeled jointly without mixing
//! their counts.
//!
use super::{EmSummary, MatrixCore, RegularizeSummary, ReadObservation};
use crate::codon::Codon;
use crate::model::{CleavageModel, OffsetTable};
use crate::orf::OrfIndex;
use crate::region::Strand;
use log::debug;

#[derive(Clone, Debug)]
pub struct MultiReadCodonMatrix {
    pub(crate) core: MatrixCore,
    n_conditions: usize,
}

impl MultiReadCodonMatrix {
    pub fn new(
        models: &[CleavageModel],
        strand: Strand,
        min_profile_weight: f64,
        min_posterior: f64,
    ) -> MultiReadCodonMatrix {
        assert!(models.len() > 1, "joint matrix needs at least two models");
        let table = OffsetTable::majority_vote(models, min_profile_weight, min_posterior);
        MultiReadCodonMatrix {
            core: MatrixCore::new(strand, table, Some(models.len())),
            n_conditions: models.len(),
        }
    }
    ///
    /// Add one observation: each condition with a nonzero count becomes (or
    /// accumulates into) its own condition-keyed read. Returns whether any
    /// condition contributed an edge.
    ///
    pub fn add_read(&mut self, obs: &ReadObservation, orf: Option<&OrfIndex>) -> bool {
        assert_eq!(
            obs.counts.len(),
            self.n_conditions,
            "inconsistent conditions: expected {}, got {}",
            self.n_conditions,
            obs.counts.len()
        );
        let mut useful = false;
        for (cond, &count) in obs.counts.iter().enumerate() {
            if count == 0.0 {
                continue;
            }
            let mut counts = vec![0.0; self.n_conditions];
            counts[cond] = count;
            useful |= self.core.add_observation(
                obs.region,
                obs.leading_mismatch,
                Some(cond),
                &counts,
                orf,
            );
        }
        useful
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
            "added reads over {} conditions: {} useful, {} codons, {} edges",
            self.n_conditions,
            useful,
            self.core.n_codons(),
            self.core.n_edges()
        );
        useful
    }
    pub fn n_conditions(&self) -> usize {
        self.n_conditions
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::mock_profile_model;
    use crate::region::Region;

    fn models() -> Vec<CleavageModel> {
        vec![mock_profile_model(), mock_profile_model(), mock_profile_model()]
    }

    #[test]
    fn conditions_get_separate_reads() {
        let models = models();
        let mut matrix = MultiReadCodonMatrix::new(&models, Strand::Plus, 0.01, 0.01);
        let obs = ReadObservation::new(Region::new(1, 29), false, vec![2.0, 0.0, 5.0]);
        assert!(matrix.add_read(&obs, None));
        // the zero-count condition creates no read
        assert_eq!(matrix.core().n_reads(), 2);
        // both condition reads share the same candidate codons
        assert_eq!(matrix.core().n_codons(), 3);
        assert_eq!(matrix.core().n_edges(), 6);
    }
    #[test]
    fn joint_inference_separates_conditions() {
        let models = models();
        let mut matrix = MultiReadCodonMatrix::new(&models, Strand::Plus, 0.01, 0.01);
        // condition 0 is loaded at start 2, condition 1 at start 32,
        // condition 2 is empty
        let reads = vec![
            ReadObservation::new(Region::new(2, 30), false, vec![7.0, 0.0, 0.0]),
            ReadObservation::new(Region::new(1, 29), false, vec![2.0, 0.0, 0.0]),
            ReadObservation::new(Region::new(32, 60), false, vec![0.0, 4.0, 0.0]),
        ];
        assert_eq!(matrix.add_all(&reads, None), 3);
        matrix.em(1e-2, 1000);
        matrix.finalize();
        let codons = matrix.to_codons();
        let total: f64 = codons.iter().map(|c| c.total_activity).sum();
        assert_abs_diff_eq!(total, 13.0, epsilon = 1e-6);
        for c in codons.iter() {
            assert_eq!(c.activity.len(), 3);
            // no cross-talk between conditions
            assert_abs_diff_eq!(c.activity[2], 0.0, epsilon = 1e-9);
            if c.region.start < 30 {
                assert_abs_diff_eq!(c.activity[1], 0.0, epsilon = 1e-9);
            } else {
                assert_abs_diff_eq!(c.activity[0], 0.0, epsilon = 1e-9);
            }
        }
        let cond1: f64 = codons.iter().map(|c| c.activity[1]).sum();
        assert_abs_diff_eq!(cond1, 4.0, epsilon = 1e-6);
    }
    #[test]
    #[should_panic(expected = "inconsistent conditions")]
    fn wrong_condition_count_panics() {
        let models = models();
        let mut matrix = MultiReadCodonMatrix::new(&models, Strand::Plus, 0.01, 0.01);
        let obs = ReadObservation::new(Region::new(1, 29), false, vec![2.0]);
        matrix.add_read(&obs, None);
    }
}
