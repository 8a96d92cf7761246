//!
//! Shared type aliases and constants
//!

/// observed count of a read (fractional after upstream multi-mapper weighting)
pub type Count = f64;

/// expected number of reads assigned to a codon
pub type Activity = f64;

/// index of an experimental condition
pub type CondId = usize;

/// width of a codon in nucleotides
pub const CODON_LEN: usize = 3;
