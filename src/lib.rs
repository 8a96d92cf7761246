//!
//! riboem: codon inference from ribosome profiling reads
//!
//! Pooled ribosome profiling reads report their translocation site only up
//! to positional ambiguity from variable read lengths, leading mismatches
//! and multi-mapping. This crate resolves that ambiguity by
//! expectation-maximization over a sparse bipartite graph of canonical
//! reads and candidate codons, prunes low-evidence codons by a
//! likelihood-based regularization pass, and reports per-condition codon
//! activities.
//!
pub mod codon;
pub mod common;
pub mod inference;
pub mod matrix;
pub mod mocks;
pub mod model;
pub mod orf;
pub mod region;

#[macro_use]
extern crate approx;
