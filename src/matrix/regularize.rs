//!
//! Likelihood-based pruning of redundant codons
//!
//! Positional uncertainty turns every read into several overlapping
//! candidate codons. After the first convergence this pass walks codons in
//! ascending activity order and tentatively removes each one, pro-rata
//! redistributing its per-read expectations onto the read's other codons.
//! A removal is kept when the log-likelihood loss stays above a lambda
//! threshold, and rejected outright when any incident read would lose its
//! last support.
//!
//! The tentative mutation is planned first and applied only on acceptance,
//! so a rejected removal never touches the matrix.
//!
use super::{CodonId, EdgeId, MatrixCore};
use crate::common::CODON_LEN;
use crate::region::Region;
use fixedbitset::FixedBitSet;
use fnv::FnvHashMap as HashMap;
use log::debug;

///
/// Outcome of one regularization sweep.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegularizeSummary {
    pub examined: usize,
    pub removed: usize,
    pub deferred_revisits: usize,
}

impl std::fmt::Display for RegularizeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "examined={} removed={} deferred_revisits={}",
            self.examined, self.removed, self.deferred_revisits
        )
    }
}

impl MatrixCore {
    ///
    /// Prune codons whose read support can be absorbed by the remaining
    /// candidates with acceptable likelihood loss, then compact the arena
    /// and reset the survivors' activities to 1. The caller re-runs the EM
    /// loop on the reduced topology afterwards.
    ///
    /// A negative `lambda` skips the pass entirely. The acceptance
    /// threshold is `-lambda / neighbor_factor` while the codon has an
    /// adjacent in-frame neighbor with activity above
    /// `min_neighbor_activity`, and `-lambda` once it is isolated. Codons
    /// are processed in ascending activity order, ties broken by ascending
    /// interval. A codon whose sole remaining neighbor is later removed is
    /// revisited through a deferred queue after the main sweep.
    ///
    pub(crate) fn regularize(
        &mut self,
        lambda: f64,
        neighbor_factor: f64,
        min_neighbor_activity: f64,
    ) -> RegularizeSummary {
        let mut summary = RegularizeSummary {
            examined: 0,
            removed: 0,
            deferred_revisits: 0,
        };
        if lambda < 0.0 || self.codons.is_empty() {
            return summary;
        }
        let mut order: Vec<CodonId> = (0..self.codons.len()).map(CodonId).collect();
        order.sort_by(|&a, &b| {
            let ca = &self.codons[a.0];
            let cb = &self.codons[b.0];
            ca.total_activity
                .partial_cmp(&cb.total_activity)
                .unwrap()
                .then(ca.region.cmp(&cb.region))
        });
        let mut removed = FixedBitSet::with_capacity(self.codons.len());
        // sole remaining neighbor -> codons waiting on its removal
        let mut watch: HashMap<CodonId, Vec<CodonId>> = HashMap::default();
        let mut deferred: Vec<CodonId> = Vec::new();

        for &cid in order.iter() {
            self.consider(
                cid,
                lambda,
                neighbor_factor,
                min_neighbor_activity,
                &mut removed,
                &mut watch,
                &mut deferred,
                &mut summary,
            );
        }
        while let Some(cid) = deferred.pop() {
            summary.deferred_revisits += 1;
            self.consider(
                cid,
                lambda,
                neighbor_factor,
                min_neighbor_activity,
                &mut removed,
                &mut watch,
                &mut deferred,
                &mut summary,
            );
        }

        self.compact();
        self.reset_activities(1.0);
        debug!("regularize: {}", summary);
        summary
    }

    fn consider(
        &mut self,
        cid: CodonId,
        lambda: f64,
        neighbor_factor: f64,
        min_neighbor_activity: f64,
        removed: &mut FixedBitSet,
        watch: &mut HashMap<CodonId, Vec<CodonId>>,
        deferred: &mut Vec<CodonId>,
        summary: &mut RegularizeSummary,
    ) {
        if removed.contains(cid.0) {
            return;
        }
        summary.examined += 1;
        let remaining: Vec<CodonId> = self
            .adjacent_codons(cid)
            .into_iter()
            .filter(|d| !removed.contains(d.0))
            .collect();
        let n_active = remaining
            .iter()
            .filter(|d| self.codons[d.0].total_activity > min_neighbor_activity)
            .count();
        let threshold = if n_active > 0 {
            -lambda / neighbor_factor
        } else {
            -lambda
        };
        if self.try_remove_codon(cid, threshold) {
            removed.insert(cid.0);
            summary.removed += 1;
            // later codons in the sweep must see the absorbed mass
            self.recompute_incident_activities(cid);
            if let Some(waiting) = watch.remove(&cid) {
                for d in waiting {
                    if !removed.contains(d.0) {
                        deferred.push(d);
                    }
                }
            }
        } else if remaining.len() == 1 {
            watch.entry(remaining[0]).or_default().push(cid);
        }
    }

    ///
    /// Adjacent in-frame codons: the intervals sharing this codon's start
    /// or end coordinate.
    ///
    fn adjacent_codons(&self, cid: CodonId) -> Vec<CodonId> {
        let region = self.codons[cid.0].region;
        let mut out = Vec::with_capacity(2);
        if region.start >= CODON_LEN {
            let left = Region::new(region.start - CODON_LEN, region.start);
            if let Some(&d) = self.codon_index.get(&left) {
                out.push(d);
            }
        }
        let right = Region::new(region.end, region.end + CODON_LEN);
        if let Some(&d) = self.codon_index.get(&right) {
            out.push(d);
        }
        out
    }

    ///
    /// Tentatively remove one codon.
    ///
    /// Pass 1 plans, per incident read, the pro-rata redistribution of the
    /// read's expectation onto its other edges and accumulates the
    /// log-likelihood delta `count * (ln(s) - ln(s + w))`. A read with no
    /// alternative support (`s == 0`) rejects the removal outright. Pass 2
    /// applies the plan and zeroes the codon's own edges, but only when the
    /// delta reached the acceptance threshold.
    ///
    fn try_remove_codon(&mut self, cid: CodonId, threshold: f64) -> bool {
        let mut delta = 0.0;
        let mut plan: Vec<(EdgeId, f64)> = Vec::new();
        for &own in self.codons[cid.0].edges.iter() {
            let rid = self.edges[own.0].read;
            let w = self.edges[own.0].weight;
            let read = &self.reads[rid.0];
            let s: f64 = read
                .edges
                .iter()
                .filter(|&&e| e != own)
                .map(|&e| self.edges[e.0].weight)
                .sum();
            if s == 0.0 {
                // the removal would strand this read
                return false;
            }
            delta += read.total_count * (s.ln() - (s + w).ln());
            for &e in read.edges.iter() {
                if e != own {
                    plan.push((e, w * self.edges[e.0].weight / s));
                }
            }
        }
        if delta < threshold {
            return false;
        }
        for &(e, add) in plan.iter() {
            self.edges[e.0].weight += add;
        }
        let own: Vec<EdgeId> = self.codons[cid.0].edges.clone();
        for e in own {
            self.edges[e.0].weight = 0.0;
        }
        true
    }

    ///
    /// Recompute the activities of every codon sharing a read with the
    /// removed one (the removed codon itself drops to 0).
    ///
    fn recompute_incident_activities(&mut self, cid: CodonId) {
        let mut touched: Vec<CodonId> = Vec::new();
        for &own in self.codons[cid.0].edges.iter() {
            let rid = self.edges[own.0].read;
            for &e in self.reads[rid.0].edges.iter() {
                touched.push(self.edges[e.0].codon);
            }
        }
        touched.sort();
        touched.dedup();
        for d in touched {
            let total: f64 = self.codons[d.0]
                .edges
                .iter()
                .map(|&e| self.edges[e.0].weight)
                .sum();
            self.codons[d.0].total_activity = total;
        }
    }

    ///
    /// Physically delete zero-activity codons and their edges from both
    /// adjacency sides, keeping all handles stable by rebuilding the
    /// arenas. Reads are never removed.
    ///
    pub(crate) fn compact(&mut self) {
        let mut codon_map: Vec<Option<CodonId>> = vec![None; self.codons.len()];
        let mut codons = Vec::new();
        for (i, c) in self.codons.iter().enumerate() {
            if c.total_activity > 0.0 {
                codon_map[i] = Some(CodonId(codons.len()));
                codons.push(c.clone());
            }
        }
        let mut edge_map: Vec<Option<EdgeId>> = vec![None; self.edges.len()];
        let mut edges = Vec::new();
        for (i, e) in self.edges.iter().enumerate() {
            if let Some(codon) = codon_map[e.codon.0] {
                edge_map[i] = Some(EdgeId(edges.len()));
                let mut e = e.clone();
                e.codon = codon;
                edges.push(e);
            }
        }
        for c in codons.iter_mut() {
            c.edges = c.edges.iter().filter_map(|&e| edge_map[e.0]).collect();
        }
        for r in self.reads.iter_mut() {
            r.edges = r.edges.iter().filter_map(|&e| edge_map[e.0]).collect();
        }
        debug!(
            "compacted {} -> {} codons, {} -> {} edges",
            self.codons.len(),
            codons.len(),
            self.edges.len(),
            edges.len()
        );
        self.codons = codons;
        self.edges = edges;
        self.codon_index = self
            .codons
            .iter()
            .enumerate()
            .map(|(i, c)| (c.region, CodonId(i)))
            .collect();
    }
}

//
// tests
//
