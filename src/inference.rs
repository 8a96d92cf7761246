//!
//! Codon inference driver
//!
//! Orchestrates one genomic window: build the matrix (single model or
//! joint multi-condition), run EM to convergence, prune by regularization
//! and re-converge, resolve per-condition activities, score goodness of
//! fit, and hand the codons back in the caller's coordinate system.
//!
use crate::codon::Codon;
use crate::matrix::{
    EmSummary, MatrixCore, MultiReadCodonMatrix, ReadCodonMatrix, ReadObservation,
    RegularizeSummary,
};
use crate::model::CleavageModel;
use crate::orf::OrfIndex;
use crate::region::{Region, Strand};
use log::info;
use rayon::prelude::*;

///
/// Tuning knobs of the inference pipeline.
///
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceParams {
    /// EM stops once no codon activity moves more than this
    pub convergence: f64,
    /// EM iteration cap; reaching it is accepted as best effort
    pub max_iter: usize,
    /// regularization strength; negative disables the pruning pass
    pub lambda: f64,
    /// divides lambda while a codon has active in-frame neighbors
    pub neighbor_factor: f64,
    /// neighbors below this activity do not count as active
    pub min_neighbor_activity: f64,
    /// offset retention: minimum normalized profile weight
    pub min_profile_weight: f64,
    /// offset retention: minimum posterior
    pub min_posterior: f64,
}

impl Default for InferenceParams {
    fn default() -> InferenceParams {
        InferenceParams {
            convergence: 1e-2,
            max_iter: 1000,
            lambda: 1.0,
            neighbor_factor: 2.0,
            min_neighbor_activity: 1e-2,
            min_profile_weight: 0.01,
            min_posterior: 0.01,
        }
    }
}

impl InferenceParams {
    ///
    /// Keep every candidate codon the EM produces.
    ///
    pub fn without_regularization() -> InferenceParams {
        InferenceParams {
            lambda: -1.0,
            ..InferenceParams::default()
        }
    }
    ///
    /// Tighter convergence for small windows.
    ///
    pub fn strict() -> InferenceParams {
        InferenceParams {
            convergence: 1e-4,
            ..InferenceParams::default()
        }
    }
}

impl std::fmt::Display for InferenceParams {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "convergence: {}", self.convergence)?;
        writeln!(f, "max_iter: {}", self.max_iter)?;
        writeln!(f, "lambda: {}", self.lambda)?;
        writeln!(f, "neighbor_factor: {}", self.neighbor_factor)?;
        writeln!(f, "min_neighbor_activity: {}", self.min_neighbor_activity)?;
        writeln!(f, "min_profile_weight: {}", self.min_profile_weight)?;
        writeln!(f, "min_posterior: {}", self.min_posterior)
    }
}

///
/// Inferred codons of one window plus run diagnostics.
///
#[derive(Clone, Debug)]
pub struct InferenceResult {
    pub codons: Vec<Codon>,
    pub em: EmSummary,
    pub regularization: Option<RegularizeSummary>,
    pub useful_reads: usize,
}

///
/// The inference engine: one cleavage model per condition (a single model
/// pools all conditions through one matrix; several models run the joint
/// multi-condition matrix), an optional allowed-ORF filter, and the tuning
/// parameters.
///
/// Windows are independent: the engine itself is immutable during
/// inference, so disjoint windows may be inferred from multiple threads.
///
#[derive(Clone, Debug)]
pub struct CodonInference {
    models: Vec<CleavageModel>,
    params: InferenceParams,
    orf: Option<OrfIndex>,
}

impl CodonInference {
    pub fn new(models: Vec<CleavageModel>, params: InferenceParams) -> CodonInference {
        assert!(!models.is_empty(), "at least one cleavage model is required");
        CodonInference {
            models,
            params,
            orf: None,
        }
    }
    ///
    /// Restrict candidate codons to in-frame positions of allowed
    /// intervals.
    ///
    pub fn with_orf_index(mut self, orf: OrfIndex) -> CodonInference {
        self.orf = Some(orf);
        self
    }
    pub fn params(&self) -> &InferenceParams {
        &self.params
    }
    pub fn n_models(&self) -> usize {
        self.models.len()
    }

    ///
    /// Infer the codons of one window. Returns `None` when no read
    /// contributed any edge (the distinguished no-data outcome).
    ///
    pub fn infer(&self, strand: Strand, reads: &[ReadObservation]) -> Option<InferenceResult> {
        let p = &self.params;
        let (useful, mut core) = self.build_matrix(strand, reads);
        if useful == 0 {
            info!("no usable reads, nothing to infer");
            return None;
        }
        let mut em = core.em(p.convergence, p.max_iter);
        let regularization = if p.lambda >= 0.0 {
            let summary = core.regularize(p.lambda, p.neighbor_factor, p.min_neighbor_activity);
            em = core.em(p.convergence, p.max_iter);
            Some(summary)
        } else {
            None
        };
        core.finalize_activities();
        core.compute_goodness();
        let codons = core.to_codons();
        info!(
            "inferred {} codons from {} reads ({})",
            codons.len(),
            useful,
            em
        );
        Some(InferenceResult {
            codons,
            em,
            regularization,
            useful_reads: useful,
        })
    }

    ///
    /// Like `infer`, with the codons remapped into window-relative
    /// coordinates (strand-correct) and restricted to the window.
    ///
    pub fn infer_anchored(
        &self,
        window: &Region,
        strand: Strand,
        reads: &[ReadObservation],
    ) -> Option<InferenceResult> {
        let mut result = self.infer(strand, reads)?;
        result.codons = result
            .codons
            .iter()
            .filter_map(|c| c.remapped(window, strand))
            .collect();
        result.codons.sort();
        Some(result)
    }

    ///
    /// Infer many disjoint windows in parallel. Matrices share no mutable
    /// state, so this is a plain data-parallel fan-out.
    ///
    pub fn infer_all(
        &self,
        windows: &[(Region, Strand, Vec<ReadObservation>)],
    ) -> Vec<Option<InferenceResult>> {
        windows
            .par_iter()
            .map(|(window, strand, reads)| self.infer_anchored(window, *strand, reads))
            .collect()
    }

    fn build_matrix(&self, strand: Strand, reads: &[ReadObservation]) -> (usize, MatrixCore) {
        let p = &self.params;
        match self.models.as_slice() {
            [model] => {
                let mut matrix =
                    ReadCodonMatrix::new(model, strand, p.min_profile_weight, p.min_posterior);
                let useful = matrix.add_all(reads, self.orf.as_ref());
                (useful, matrix.core)
            }
            models => {
                let mut matrix =
                    MultiReadCodonMatrix::new(models, strand, p.min_profile_weight, p.min_posterior);
                let useful = matrix.add_all(reads, self.orf.as_ref());
                (useful, matrix.core)
            }
        }
    }
}

//
// tests
//
