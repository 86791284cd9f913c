use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Sparse bag-of-words vectors and the similarity scores defined over them.
pub mod bow;
pub use bow::{BoWTrait, BowVector};

/// The word space and the single scoring function shared by every search.
pub mod vocab;
pub use vocab::{ScoringType, Vocabulary};

/// Interfaces the database consumes from the map: frames and keyframes.
pub mod keyframe;
pub use keyframe::{Frame, GlobalDescriptor, KeyFrame, Neighbors};

/// Tunable thresholds of the candidate searches.
pub mod params;
pub use params::SearchParams;

/// Per-query bookkeeping and the scoring stages shared by the searches.
pub(crate) mod query;

/// Inverted file over visual words, and the candidate searches,
/// which provide the main functionality of this crate.
pub mod database;
pub use database::KeyFrameDatabase;

/// Identifier of a visual word (leaf) in the vocabulary.
pub type WordId = u32;

/// Unique identifier of a keyframe.
///
/// Identity of keyframes inside the database (erase, exclusion,
/// deduplication of results) is decided by this id alone.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyFrameId(pub u64);

/// Identifier of a transient query frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u64);

impl fmt::Display for KeyFrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KF{}", self.0)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

pub type DbResult<T> = std::result::Result<T, DbErr>;

#[derive(Error, Debug)]
pub enum DbErr {
    #[error("Word {word} is outside the vocabulary ({num_words} words)")]
    WordOutOfRange { word: WordId, num_words: usize },
    #[error("Global descriptor length mismatch: expected {expected}, found {found}")]
    DescriptorMismatch { expected: usize, found: usize },
    #[error("Invalid search parameters: {0}")]
    InvalidParams(String),
    #[error("Io Error")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "bincode")]
    #[error("Parameter Serialization Error")]
    Bincode(#[from] bincode::Error),
}
