//!
//! Genomic intervals and strand-correct codon positioning
//!
use crate::common::CODON_LEN;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

///
/// Strand of a genomic window.
///
/// On the minus strand the 5' end of a read is its highest coordinate,
/// so candidate offsets are measured from `end` and reflected.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    pub fn is_plus(&self) -> bool {
        match self {
            Strand::Plus => true,
            Strand::Minus => false,
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
        }
    }
}

///
/// Error (unit type) in from_str of Strand
///
#[derive(Clone, Debug)]
pub struct StrandParseError;

impl FromStr for Strand {
    type Err = StrandParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Plus),
            "-" => Ok(Strand::Minus),
            _ => Err(StrandParseError),
        }
    }
}

///
/// Half-open genomic interval `[start, end)`.
///
/// Used both as the footprint of an aligned read and as the immutable
/// identity of a codon (a 3 nt interval).
///
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn new(start: usize, end: usize) -> Region {
        assert!(start <= end, "invalid region {}..{}", start, end);
        Region { start, end }
    }
    pub fn len(&self) -> usize {
        self.end - self.start
    }
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
    ///
    /// Does this interval fully contain `other`?
    ///
    pub fn contains(&self, other: &Region) -> bool {
        self.start <= other.start && other.end <= self.end
    }
    ///
    /// Candidate codon of a read occupying this interval, for a cleavage
    /// offset measured from the read's 5' end.
    ///
    /// Plus strand: the codon starts `offset` bases downstream of `start`.
    /// Minus strand: `offset` is measured from `end` and reflected.
    ///
    /// The offset must leave room for a full codon inside the read.
    ///
    pub fn codon_at(&self, offset: usize, strand: Strand) -> Region {
        assert!(offset + CODON_LEN <= self.len());
        match strand {
            Strand::Plus => Region::new(self.start + offset, self.start + offset + CODON_LEN),
            Strand::Minus => Region::new(self.end - offset - CODON_LEN, self.end - offset),
        }
    }
    ///
    /// Inverse of `codon_at`: the 5'-measured offset that places `codon`
    /// on a read occupying this interval.
    ///
    pub fn offset_of(&self, codon: &Region, strand: Strand) -> usize {
        match strand {
            Strand::Plus => codon.start - self.start,
            Strand::Minus => self.end - codon.end,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

//
// tests
//
