//!
//! Mock models and read sets for testing
//!
use crate::matrix::ReadObservation;
use crate::model::{CleavageModel, FixedRule, ProfileModel};
use crate::region::Region;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

const MOCK_LENGTH: usize = 28;
const MOCK_OFFSETS: [(usize, f64); 3] = [(11, 0.1), (12, 0.7), (13, 0.2)];

///
/// Profile model for length-28 reads: codon offsets {11, 12, 13} with
/// posterior {0.1, 0.7, 0.2}. Leading-mismatch reads shift one base
/// downstream to {12, 13, 14}.
///
pub fn mock_profile_model() -> CleavageModel {
    let mut model = ProfileModel::new(40);
    let mut profile = vec![0.0; 15];
    let mut posterior = vec![0.0; 15];
    for &(offset, weight) in MOCK_OFFSETS.iter() {
        profile[offset] = weight;
        posterior[offset] = weight;
    }
    model.set(false, MOCK_LENGTH, profile.clone(), posterior.clone());
    let mut shifted_profile = vec![0.0; 15];
    let mut shifted_posterior = vec![0.0; 15];
    for &(offset, weight) in MOCK_OFFSETS.iter() {
        shifted_profile[offset + 1] = weight;
        shifted_posterior[offset + 1] = weight;
    }
    model.set(true, MOCK_LENGTH, shifted_profile, shifted_posterior);
    CleavageModel::Profile(model)
}

///
/// Deterministic single-offset rule: offset 12 for lengths 26..=32.
///
pub fn mock_fixed_model() -> CleavageModel {
    CleavageModel::Fixed(FixedRule::new(12, 26, 32))
}

///
/// The canonical three-read scenario: length-28 reads at 5' starts
/// {1, 2, 3} with counts {2, 7, 1}. All three support the codon at 14,
/// the offset-12 placement of the middle read.
///
pub fn mock_scenario_reads() -> Vec<ReadObservation> {
    vec![
        ReadObservation::new(Region::new(1, 29), false, vec![2.0]),
        ReadObservation::new(Region::new(2, 30), false, vec![7.0]),
        ReadObservation::new(Region::new(3, 31), false, vec![1.0]),
    ]
}

///
/// Simulate plus-strand reads from known translocation sites through the
/// mock profile: each read picks a site proportional to its activity and
/// an offset from the profile. Seeded, so repeated calls reproduce the
/// same observations.
///
/// Site positions must leave room for the largest offset.
///
pub fn sim_reads(sites: &[(usize, f64)], n_reads: usize, seed: u64) -> Vec<ReadObservation> {
    assert!(!sites.is_empty());
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let total: f64 = sites.iter().map(|&(_, activity)| activity).sum();
    let mut reads = Vec::with_capacity(n_reads);
    for _ in 0..n_reads {
        let mut t = rng.gen::<f64>() * total;
        let mut site = sites[sites.len() - 1].0;
        for &(position, activity) in sites.iter() {
            if t < activity {
                site = position;
                break;
            }
            t -= activity;
        }
        let mut u = rng.gen::<f64>();
        let mut offset = MOCK_OFFSETS[MOCK_OFFSETS.len() - 1].0;
        for &(o, weight) in MOCK_OFFSETS.iter() {
            if u < weight {
                offset = o;
                break;
            }
            u -= weight;
        }
        let start = site - offset;
        reads.push(ReadObservation::new(
            Region::new(start, start + MOCK_LENGTH),
            false,
            vec![1.0],
        ));
    }
    reads
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_is_reproducible() {
        let sites = [(100, 5.0), (130, 1.0)];
        let a = sim_reads(&sites, 50, 7);
        let b = sim_reads(&sites, 50, 7);
        assert_eq!(a, b);
        let c = sim_reads(&sites, 50, 8);
        assert_ne!(a, c);
    }
    #[test]
    fn sim_reads_surround_the_sites() {
        let sites = [(100, 1.0)];
        for read in sim_reads(&sites, 100, 1) {
            // the read must contain the site at one of the mock offsets
            let offset = 100 - read.region.start;
            assert!(offset == 11 || offset == 12 || offset == 13);
            assert_eq!(read.region.len(), 28);
        }
    }
}
