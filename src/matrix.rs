//!
//! Sparse bipartite Read x Codon matrices
//!
//! Reads and codons live in index-addressed arenas with stable numeric
//! handles; their hash keys are immutable identity values, so mutating a
//! payload can never corrupt an index. Adjacency is symmetric edge lists:
//! an edge is present in a codon's list iff it is present in its read's
//! list, always inserted and removed as a pair.
//!
//! Each edge carries two numeric slots:
//!
//! * `prior`: the static model posterior that the read supports the codon
//! * `weight`: the working expectation, rewritten every EM iteration
//!
//! The priors of one read sum to at most 1; the remainder is mass the model
//! assigns to "no explanation".
//!
use crate::common::{Activity, CondId, Count, CODON_LEN};
use crate::codon::Codon;
use crate::model::OffsetTable;
use crate::orf::OrfIndex;
use crate::region::{Region, Strand};
use derive_new::new;
use fnv::FnvHashMap as HashMap;
use log::debug;
use serde::{Deserialize, Serialize};

pub mod em;
pub mod goodness;
pub mod multi;
pub mod regularize;
pub mod single;

pub use em::EmSummary;
pub use multi::MultiReadCodonMatrix;
pub use regularize::RegularizeSummary;
pub use single::ReadCodonMatrix;

///
/// stable handle of a codon record
///
#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Hash, Copy, Clone)]
pub struct CodonId(pub usize);

///
/// stable handle of a read record
///
#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Hash, Copy, Clone)]
pub struct ReadId(pub usize);

///
/// stable handle of an edge
///
#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Hash, Copy, Clone)]
pub struct EdgeId(pub usize);

///
/// One aligned distinct sequence: its footprint, the leading-mismatch flag
/// derived upstream, and its observed count per condition.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct ReadObservation {
    pub region: Region,
    pub leading_mismatch: bool,
    pub counts: Vec<Count>,
}

///
/// Immutable identity of a canonical read. The condition id is set only in
/// the joint multi-condition matrix, where every condition keeps its own
/// read records.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReadKey {
    pub region: Region,
    pub leading_mismatch: bool,
    pub condition: Option<CondId>,
}

///
/// Codon record: immutable interval identity plus the mutable activity
/// payload.
///
#[derive(Clone, Debug)]
pub struct CodonRecord {
    pub region: Region,
    pub total_activity: Activity,
    pub activity: Vec<Activity>,
    pub goodness: f64,
    pub(crate) edges: Vec<EdgeId>,
}

///
/// Read record: immutable key plus accumulated counts. Never removed once
/// created.
///
#[derive(Clone, Debug)]
pub struct ReadRecord {
    pub key: ReadKey,
    pub counts: Vec<Count>,
    pub total_count: Count,
    pub(crate) edges: Vec<EdgeId>,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub read: ReadId,
    pub codon: CodonId,
    pub prior: f64,
    pub weight: f64,
}

///
/// The shared arena + adjacency core of both matrix types.
///
/// One instance covers one genomic window on one strand and is iterated
/// single-threadedly; instances share no mutable state, so callers may run
/// disjoint windows in parallel.
///
#[derive(Clone, Debug)]
pub struct MatrixCore {
    strand: Strand,
    table: OffsetTable,
    n_conditions: Option<usize>,
    pub(crate) codons: Vec<CodonRecord>,
    pub(crate) reads: Vec<ReadRecord>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) codon_index: HashMap<Region, CodonId>,
    read_index: HashMap<ReadKey, ReadId>,
}

impl MatrixCore {
    pub(crate) fn new(strand: Strand, table: OffsetTable, n_conditions: Option<usize>) -> Self {
        MatrixCore {
            strand,
            table,
            n_conditions,
            codons: Vec::new(),
            reads: Vec::new(),
            edges: Vec::new(),
            codon_index: HashMap::default(),
            read_index: HashMap::default(),
        }
    }
    pub fn strand(&self) -> Strand {
        self.strand
    }
    pub fn table(&self) -> &OffsetTable {
        &self.table
    }
    pub fn n_codons(&self) -> usize {
        self.codons.len()
    }
    pub fn n_reads(&self) -> usize {
        self.reads.len()
    }
    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }
    ///
    /// Number of conditions, learned from the first observation (or fixed
    /// at construction for the joint matrix).
    ///
    pub fn n_conditions(&self) -> usize {
        self.n_conditions.unwrap_or(0)
    }
    pub fn codon(&self, id: CodonId) -> &CodonRecord {
        &self.codons[id.0]
    }
    pub fn read(&self, id: ReadId) -> &ReadRecord {
        &self.reads[id.0]
    }
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }
    pub fn iter_codons(&self) -> impl Iterator<Item = (CodonId, &CodonRecord)> + '_ {
        self.codons.iter().enumerate().map(|(i, c)| (CodonId(i), c))
    }
    pub fn iter_reads(&self) -> impl Iterator<Item = (ReadId, &ReadRecord)> + '_ {
        self.reads.iter().enumerate().map(|(i, r)| (ReadId(i), r))
    }
    pub fn find_codon(&self, region: &Region) -> Option<CodonId> {
        self.codon_index.get(region).copied()
    }
    pub fn find_read(&self, key: &ReadKey) -> Option<ReadId> {
        self.read_index.get(key).copied()
    }

    fn check_conditions(&mut self, n: usize) {
        match self.n_conditions {
            Some(expected) => assert_eq!(
                expected, n,
                "inconsistent conditions: expected {}, got {}",
                expected, n
            ),
            None => self.n_conditions = Some(n),
        }
    }

    ///
    /// Add one observation under the given canonical condition key.
    ///
    /// Reads with no model profile for their length (or longer than the
    /// table) are skipped. New reads generate one candidate codon per
    /// probable offset, restricted by the optional allowed-ORF filter; if
    /// no offset survives the filter, the read is dropped entirely and is
    /// never indexed. Every surviving offset inserts a symmetric edge whose
    /// prior is that offset's posterior weight.
    ///
    /// Counts accumulate into the canonical read. Returns whether the read
    /// is backed by at least one edge.
    ///
    pub(crate) fn add_observation(
        &mut self,
        region: Region,
        leading_mismatch: bool,
        condition: Option<CondId>,
        counts: &[Count],
        orf: Option<&OrfIndex>,
    ) -> bool {
        self.check_conditions(counts.len());
        for &c in counts {
            assert!(!c.is_nan(), "NaN count for read {}", region);
        }
        let length = region.len();
        let candidates = self.table.candidates(leading_mismatch, length);
        if candidates.is_empty() {
            return false;
        }
        let key = ReadKey {
            region,
            leading_mismatch,
            condition,
        };
        let rid = match self.read_index.get(&key) {
            Some(&rid) => rid,
            None => {
                // strand-correct candidate codons of a first-seen read
                let mut chosen: Vec<(Region, f64)> = Vec::with_capacity(candidates.len());
                for &(offset, weight) in candidates {
                    if offset + CODON_LEN > length {
                        continue;
                    }
                    let codon = region.codon_at(offset, self.strand);
                    if let Some(index) = orf {
                        if !index.allows(&codon, self.strand) {
                            continue;
                        }
                    }
                    chosen.push((codon, weight));
                }
                if chosen.is_empty() {
                    return false;
                }
                let rid = ReadId(self.reads.len());
                self.reads.push(ReadRecord {
                    key,
                    counts: vec![0.0; counts.len()],
                    total_count: 0.0,
                    edges: Vec::with_capacity(chosen.len()),
                });
                self.read_index.insert(key, rid);
                for (codon, prior) in chosen {
                    let cid = self.intern_codon(codon);
                    self.insert_edge(rid, cid, prior);
                }
                rid
            }
        };
        let read = &mut self.reads[rid.0];
        for (acc, &c) in read.counts.iter_mut().zip(counts) {
            *acc += c;
        }
        read.total_count += counts.iter().sum::<Count>();
        assert!(
            !read.total_count.is_nan(),
            "NaN total count for read {}",
            region
        );
        !read.edges.is_empty()
    }

    ///
    /// Get or create the codon record of an interval.
    ///
    fn intern_codon(&mut self, region: Region) -> CodonId {
        match self.codon_index.get(&region) {
            Some(&cid) => cid,
            None => {
                let cid = CodonId(self.codons.len());
                self.codons.push(CodonRecord {
                    region,
                    total_activity: 1.0,
                    activity: Vec::new(),
                    goodness: 0.0,
                    edges: Vec::new(),
                });
                self.codon_index.insert(region, cid);
                cid
            }
        }
    }

    fn insert_edge(&mut self, read: ReadId, codon: CodonId, prior: f64) {
        let eid = EdgeId(self.edges.len());
        self.edges.push(Edge {
            read,
            codon,
            prior,
            weight: 0.0,
        });
        self.reads[read.0].edges.push(eid);
        self.codons[codon.0].edges.push(eid);
    }

    ///
    /// Export the inferred codons, sorted by interval.
    ///
    pub fn to_codons(&self) -> Vec<Codon> {
        let mut codons: Vec<Codon> = self
            .codons
            .iter()
            .map(|c| Codon {
                region: c.region,
                activity: c.activity.clone(),
                total_activity: c.total_activity,
                goodness: c.goodness,
                sequence: None,
            })
            .collect();
        codons.sort();
        debug!("exported {} codons", codons.len());
        codons
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::mock_profile_model;
    use crate::model::OffsetTable;

    fn core() -> MatrixCore {
        let table = OffsetTable::from_model(&mock_profile_model(), 0.01, 0.01);
        MatrixCore::new(Strand::Plus, table, None)
    }

    #[test]
    fn candidate_generation() {
        let mut c = core();
        let useful = c.add_observation(Region::new(1, 29), false, None, &[2.0], None);
        assert!(useful);
        // offsets 11, 12, 13 of a read starting at 1
        assert_eq!(c.n_codons(), 3);
        assert_eq!(c.n_reads(), 1);
        assert_eq!(c.n_edges(), 3);
        assert!(c.find_codon(&Region::new(12, 15)).is_some());
        assert!(c.find_codon(&Region::new(13, 16)).is_some());
        assert!(c.find_codon(&Region::new(14, 17)).is_some());
        let rid = c
            .find_read(&ReadKey {
                region: Region::new(1, 29),
                leading_mismatch: false,
                condition: None,
            })
            .unwrap();
        assert_abs_diff_eq!(c.read(rid).total_count, 2.0);
        // symmetric adjacency
        for (eid, e) in c.edges.iter().enumerate() {
            assert!(c.codon(e.codon).edges.contains(&EdgeId(eid)));
            assert!(c.read(e.read).edges.contains(&EdgeId(eid)));
        }
    }
    #[test]
    fn counts_accumulate_into_canonical_read() {
        let mut c = core();
        c.add_observation(Region::new(1, 29), false, None, &[2.0], None);
        c.add_observation(Region::new(1, 29), false, None, &[3.0], None);
        assert_eq!(c.n_reads(), 1);
        assert_eq!(c.n_edges(), 3);
        assert_abs_diff_eq!(c.read(ReadId(0)).total_count, 5.0);
        // a distinct leading-mismatch flag is a distinct read
        c.add_observation(Region::new(1, 29), true, None, &[1.0], None);
        assert_eq!(c.n_reads(), 2);
        assert_abs_diff_eq!(c.read(ReadId(0)).total_count, 5.0);
        assert_abs_diff_eq!(c.read(ReadId(1)).total_count, 1.0);
    }
    #[test]
    fn invalid_length_is_skipped() {
        let mut c = core();
        assert!(!c.add_observation(Region::new(1, 28), false, None, &[2.0], None));
        assert!(!c.add_observation(Region::new(1, 200), false, None, &[2.0], None));
        assert_eq!(c.n_reads(), 0);
        assert_eq!(c.n_codons(), 0);
    }
    #[test]
    fn orf_filter_drops_read_entirely() {
        use crate::orf::OrfIndex;
        let mut c = core();
        // allowed interval in a different frame than every candidate codon
        let orf: OrfIndex = vec![Region::new(0, 30)].into_iter().collect();
        // read at 1: candidate codons start at 12, 13, 14; only 12 is in
        // frame 0 of the interval
        assert!(c.add_observation(Region::new(1, 29), false, None, &[2.0], Some(&orf)));
        assert_eq!(c.n_codons(), 1);
        // read at 2: candidates 13, 14, 15; 15 is in frame
        assert!(c.add_observation(Region::new(2, 30), false, None, &[1.0], Some(&orf)));
        // read at 60: no allowed interval at all, dropped without a trace
        assert!(!c.add_observation(Region::new(60, 88), false, None, &[9.0], Some(&orf)));
        assert_eq!(c.n_reads(), 2);
        assert!(c
            .find_read(&ReadKey {
                region: Region::new(60, 88),
                leading_mismatch: false,
                condition: None,
            })
            .is_none());
        let total: Count = c.reads.iter().map(|r| r.total_count).sum();
        assert_abs_diff_eq!(total, 3.0);
    }
    #[test]
    #[should_panic(expected = "inconsistent conditions")]
    fn inconsistent_condition_vectors_panic() {
        let mut c = core();
        c.add_observation(Region::new(1, 29), false, None, &[2.0], None);
        c.add_observation(Region::new(2, 30), false, None, &[1.0, 1.0], None);
    }
    #[test]
    #[should_panic(expected = "NaN")]
    fn nan_count_panics() {
        let mut c = core();
        c.add_observation(Region::new(1, 29), false, None, &[f64::NAN], None);
    }
}
