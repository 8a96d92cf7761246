//!
//! Goodness of fit
//!
//! Per codon: a Pearson-residual statistic comparing the mass the model
//! alone would have assigned (prior times read count) against the mass the
//! EM actually assigned. A global variant scores an externally supplied
//! codon set against the model's theoretical offset profile, independent of
//! the EM solution.
//!
use super::MatrixCore;
use crate::region::Region;
use fnv::FnvHashMap as HashMap;
use fnv::FnvHashSet as HashSet;
use itertools::Itertools;

impl MatrixCore {
    ///
    /// Fill `goodness` of every codon from the current edge weights.
    ///
    pub(crate) fn compute_goodness(&mut self) {
        for c in self.codons.iter_mut() {
            let mut g = 0.0;
            for &e in c.edges.iter() {
                let edge = &self.edges[e.0];
                let expected = edge.prior * self.reads[edge.read.0].total_count;
                if expected > 0.0 {
                    let observed = edge.weight;
                    g += (observed - expected) * (observed - expected) / expected;
                }
            }
            c.goodness = g;
        }
    }

    ///
    /// Score how well a given codon assignment fits the data, regardless
    /// of what the EM inferred.
    ///
    /// The mass assigned to the given codons is bucketed by
    /// (leading mismatch, read length, offset) and compared against the
    /// model's offset weights scaled to the observed total of each
    /// (leading mismatch, read length) class.
    ///
    pub fn goodness_of_fit(&self, codons: &[Region]) -> f64 {
        let set: HashSet<Region> = codons.iter().copied().collect();
        // (mismatch, length) -> offset -> observed mass
        let mut observed: HashMap<(bool, usize), HashMap<usize, f64>> = HashMap::default();
        for r in self.reads.iter() {
            for &e in r.edges.iter() {
                let edge = &self.edges[e.0];
                let codon = self.codons[edge.codon.0].region;
                if !set.contains(&codon) {
                    continue;
                }
                let offset = r.key.region.offset_of(&codon, self.strand());
                *observed
                    .entry((r.key.leading_mismatch, r.key.region.len()))
                    .or_default()
                    .entry(offset)
                    .or_insert(0.0) += edge.weight;
            }
        }
        let mut g = 0.0;
        // fixed summation order keeps repeated runs bit-identical
        for (&(mismatch, length), by_offset) in observed.iter().sorted_by_key(|&(k, _)| *k) {
            let candidates = self.table().candidates(mismatch, length);
            let weight_total: f64 = candidates.iter().map(|&(_, w)| w).sum();
            if weight_total == 0.0 {
                continue;
            }
            let observed_total: f64 = by_offset
                .iter()
                .sorted_by_key(|&(o, _)| *o)
                .map(|(_, &mass)| mass)
                .sum();
            for &(offset, weight) in candidates {
                let expected = weight / weight_total * observed_total;
                if expected > 0.0 {
                    let o = by_offset.get(&offset).copied().unwrap_or(0.0);
                    g += (o - expected) * (o - expected) / expected;
                }
            }
        }
        g
    }
}

//
// tests
//
