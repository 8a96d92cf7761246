//!
//! Cleavage models and the derived candidate offset table
//!
//! A cleavage model describes, per read length and leading-mismatch flag,
//! where the ribosome P-site codon sits relative to the read's 5' end.
//! Two kinds exist:
//!
//! * a full probabilistic profile with a posterior per offset
//! * a fixed single-offset rule
//!
//! Matrices never consult the model directly during iteration; they derive
//! an `OffsetTable` once at construction and read only that.
//!
use log::debug;
use serde::{Deserialize, Serialize};

///
/// Probabilistic cleavage profile, indexed by leading-mismatch flag and
/// read length.
///
/// `profiles[mm][len][offset]` is the (unnormalized) profile weight of the
/// codon sitting `offset` bases from the 5' end; `posteriors[mm][len][offset]`
/// is the posterior probability of that placement. Lengths without an entry
/// are invalid read lengths.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileModel {
    profiles: [Vec<Option<Vec<f64>>>; 2],
    posteriors: [Vec<Option<Vec<f64>>>; 2],
}

fn mm_index(leading_mismatch: bool) -> usize {
    if leading_mismatch {
        1
    } else {
        0
    }
}

impl ProfileModel {
    ///
    /// Create an empty model covering read lengths up to `max_length`.
    ///
    pub fn new(max_length: usize) -> ProfileModel {
        ProfileModel {
            profiles: [vec![None; max_length + 1], vec![None; max_length + 1]],
            posteriors: [vec![None; max_length + 1], vec![None; max_length + 1]],
        }
    }
    ///
    /// Register the profile and matching posteriors of one
    /// (leading-mismatch, read length) combination.
    ///
    pub fn set(
        &mut self,
        leading_mismatch: bool,
        length: usize,
        profile: Vec<f64>,
        posterior: Vec<f64>,
    ) {
        assert!(length < self.profiles[0].len(), "length {} out of range", length);
        assert_eq!(profile.len(), posterior.len());
        let i = mm_index(leading_mismatch);
        self.profiles[i][length] = Some(profile);
        self.posteriors[i][length] = Some(posterior);
    }
    pub fn profile(&self, leading_mismatch: bool, length: usize) -> Option<&[f64]> {
        self.profiles[mm_index(leading_mismatch)]
            .get(length)?
            .as_deref()
    }
    pub fn posterior(&self, leading_mismatch: bool, length: usize, offset: usize) -> f64 {
        self.posteriors[mm_index(leading_mismatch)]
            .get(length)
            .and_then(|p| p.as_ref())
            .and_then(|p| p.get(offset))
            .copied()
            .unwrap_or(0.0)
    }
    pub fn max_length(&self) -> usize {
        self.profiles[0].len() - 1
    }
    pub fn is_valid_read_length(&self, length: usize) -> bool {
        length < self.profiles[0].len()
            && (self.profiles[0][length].is_some() || self.profiles[1][length].is_some())
    }
}

///
/// Deterministic single-offset rule: every valid read length reports its
/// codon at the same 5'-measured offset, with posterior 1.
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedRule {
    pub offset: usize,
    pub min_length: usize,
    pub max_length: usize,
}

impl FixedRule {
    pub fn new(offset: usize, min_length: usize, max_length: usize) -> FixedRule {
        assert!(min_length <= max_length);
        FixedRule {
            offset,
            min_length,
            max_length,
        }
    }
}

///
/// A cleavage model, dispatched once at matrix construction.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CleavageModel {
    Profile(ProfileModel),
    Fixed(FixedRule),
}

impl CleavageModel {
    pub fn is_valid_read_length(&self, length: usize) -> bool {
        match self {
            CleavageModel::Profile(m) => m.is_valid_read_length(length),
            CleavageModel::Fixed(r) => r.min_length <= length && length <= r.max_length,
        }
    }
    pub fn observed_max_length(&self) -> usize {
        match self {
            CleavageModel::Profile(m) => m.max_length(),
            CleavageModel::Fixed(r) => r.max_length,
        }
    }
    ///
    /// Normalized profile weight of one offset, or 0 if the length has no
    /// profile.
    ///
    fn normalized_weight(&self, leading_mismatch: bool, length: usize, offset: usize) -> f64 {
        match self {
            CleavageModel::Profile(m) => match m.profile(leading_mismatch, length) {
                Some(profile) => {
                    let total: f64 = profile.iter().sum();
                    if total > 0.0 {
                        profile.get(offset).copied().unwrap_or(0.0) / total
                    } else {
                        0.0
                    }
                }
                None => 0.0,
            },
            CleavageModel::Fixed(r) => {
                if self.is_valid_read_length(length) && offset == r.offset {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
    pub fn posterior(&self, leading_mismatch: bool, length: usize, offset: usize) -> f64 {
        match self {
            CleavageModel::Profile(m) => m.posterior(leading_mismatch, length, offset),
            CleavageModel::Fixed(r) => {
                if self.is_valid_read_length(length) && offset == r.offset {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
    ///
    /// Does this model consider `offset` a probable codon position for the
    /// given read class, under the two retention thresholds?
    ///
    fn passes(
        &self,
        leading_mismatch: bool,
        length: usize,
        offset: usize,
        min_profile_weight: f64,
        min_posterior: f64,
    ) -> bool {
        self.normalized_weight(leading_mismatch, length, offset) > min_profile_weight
            && self.posterior(leading_mismatch, length, offset) > min_posterior
    }
}

///
/// Probable codon positions per (leading-mismatch, read length), with the
/// posterior weight of each retained offset. Derived once per matrix and
/// read-only afterwards, so it can be shared across threads.
///
#[derive(Clone, Debug, Default)]
pub struct OffsetTable {
    /// entries[mm][length]: (offset, weight) pairs, ascending by offset
    entries: [Vec<Vec<(usize, f64)>>; 2],
}

impl OffsetTable {
    ///
    /// Candidate table of a single model. An offset is retained when its
    /// normalized profile weight and its posterior both exceed the
    /// thresholds; the retained weight is the posterior.
    ///
    pub fn from_model(
        model: &CleavageModel,
        min_profile_weight: f64,
        min_posterior: f64,
    ) -> OffsetTable {
        let max_length = model.observed_max_length();
        let mut entries = [
            vec![Vec::new(); max_length + 1],
            vec![Vec::new(); max_length + 1],
        ];
        for length in 1..=max_length {
            if !model.is_valid_read_length(length) {
                continue;
            }
            for (i, &mm) in [false, true].iter().enumerate() {
                for offset in 0..length {
                    if model.passes(mm, length, offset, min_profile_weight, min_posterior) {
                        entries[i][length].push((offset, model.posterior(mm, length, offset)));
                    }
                }
            }
        }
        let table = OffsetTable { entries };
        debug!("offset table: {} candidate offsets", table.n_candidates());
        table
    }
    ///
    /// Joint candidate table of one model per condition, built by majority
    /// vote: an offset is retained only when strictly more than half of the
    /// models pass both thresholds for it. The retained weight is the mean
    /// posterior over the voting models.
    ///
    pub fn majority_vote(
        models: &[CleavageModel],
        min_profile_weight: f64,
        min_posterior: f64,
    ) -> OffsetTable {
        assert!(!models.is_empty());
        let max_length = models
            .iter()
            .map(|m| m.observed_max_length())
            .max()
            .unwrap();
        let mut entries = [
            vec![Vec::new(); max_length + 1],
            vec![Vec::new(); max_length + 1],
        ];
        for length in 1..=max_length {
            for (i, &mm) in [false, true].iter().enumerate() {
                for offset in 0..length {
                    let voters: Vec<&CleavageModel> = models
                        .iter()
                        .filter(|m| {
                            m.is_valid_read_length(length)
                                && m.passes(mm, length, offset, min_profile_weight, min_posterior)
                        })
                        .collect();
                    if voters.len() * 2 > models.len() {
                        let weight = voters
                            .iter()
                            .map(|m| m.posterior(mm, length, offset))
                            .sum::<f64>()
                            / voters.len() as f64;
                        entries[i][length].push((offset, weight));
                    }
                }
            }
        }
        let table = OffsetTable { entries };
        debug!(
            "majority-vote offset table over {} models: {} candidate offsets",
            models.len(),
            table.n_candidates()
        );
        table
    }
    ///
    /// Retained (offset, weight) candidates of one read class. Empty for
    /// lengths beyond the table or without a profile.
    ///
    pub fn candidates(&self, leading_mismatch: bool, length: usize) -> &[(usize, f64)] {
        self.entries[mm_index(leading_mismatch)]
            .get(length)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
    pub fn max_length(&self) -> usize {
        self.entries[0].len().saturating_sub(1)
    }
    fn n_candidates(&self) -> usize {
        self.entries.iter().flatten().map(|v| v.len()).sum()
    }
}

//
// tests
//
