use serde::{Deserialize, Serialize};

use crate::*;

/// Similarity score used to compare two bag-of-words vectors.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringType {
    /// Galvez L1 score. Expects L1-normalized vectors.
    L1,
    /// `1 - sqrt(1 - <a, b>)`. Expects L2-normalized vectors.
    L2,
    /// Plain inner product.
    DotProduct,
}

impl Default for ScoringType {
    fn default() -> Self {
        ScoringType::L1
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// The visual vocabulary as seen by the keyframe database:
/// 1. Defines the word id space `0..num_words`.
/// 2. Owns the one scoring function every candidate search uses.
///
/// Building the vocabulary tree and transforming descriptors into
/// bag-of-words vectors happen elsewhere.
pub struct Vocabulary {
    num_words: usize,
    scoring: ScoringType,
}

/// Vocabulary API
impl Vocabulary {
    pub fn new(num_words: usize, scoring: ScoringType) -> Self {
        Self { num_words, scoring }
    }

    /// Vocabulary of `num_words` words scored with L1.
    pub fn with_words(num_words: usize) -> Self {
        Self::new(num_words, ScoringType::L1)
    }

    pub fn num_words(&self) -> usize {
        self.num_words
    }

    pub fn scoring(&self) -> ScoringType {
        self.scoring
    }

    /// Similarity between two bag-of-words vectors.
    #[inline]
    pub fn score(&self, a: &BowVector, b: &BowVector) -> f32 {
        match self.scoring {
            ScoringType::L1 => a.l1(b),
            ScoringType::L2 => a.l2(b),
            ScoringType::DotProduct => a.dot(b),
        }
    }

    /// Fail if `bow` holds a word that is not part of this vocabulary.
    pub fn check_bow(&self, bow: &BowVector) -> DbResult<()> {
        match bow.max_word() {
            Some(word) if word as usize >= self.num_words => Err(DbErr::WordOutOfRange {
                word,
                num_words: self.num_words,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_words_outside_vocabulary() {
        let voc = Vocabulary::with_words(10);
        let ok: BowVector = vec![(0, 0.5), (9, 0.5)].into_iter().collect();
        let bad: BowVector = vec![(3, 0.5), (10, 0.5)].into_iter().collect();
        assert!(voc.check_bow(&ok).is_ok());
        assert!(voc.check_bow(&BowVector::new()).is_ok());
        match voc.check_bow(&bad) {
            Err(DbErr::WordOutOfRange { word, num_words }) => {
                assert_eq!(word, 10);
                assert_eq!(num_words, 10);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn score_dispatches_on_scoring_type() {
        let a: BowVector = vec![(1, 0.6), (2, 0.8)].into_iter().collect();
        let b: BowVector = vec![(2, 0.8), (3, 0.6)].into_iter().collect();
        assert_eq!(Vocabulary::new(4, ScoringType::L1).score(&a, &b), a.l1(&b));
        assert_eq!(Vocabulary::new(4, ScoringType::L2).score(&a, &b), a.l2(&b));
        assert_eq!(Vocabulary::new(4, ScoringType::DotProduct).score(&a, &b), a.dot(&b));
    }
}
