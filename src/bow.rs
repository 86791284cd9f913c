use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap};
use std::iter::FromIterator;

use crate::WordId;

/// Bag-of-Words representation of an image or descriptor set.
///
/// Key: word/leaf id in the vocabulary.
///
/// Value: total weight of that word in provided features. Words that are
/// absent have weight 0, and non-positive weights are never stored.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BowVector(BTreeMap<WordId, f32>);

impl BowVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add `weight` to the entry of `word`. Non-positive weights are ignored.
    pub fn add_weight(&mut self, word: WordId, weight: f32) {
        if weight > 0. {
            *self.0.entry(word).or_insert(0.) += weight;
        }
    }

    pub fn weight(&self, word: WordId) -> f32 {
        self.0.get(&word).copied().unwrap_or(0.)
    }

    pub fn contains(&self, word: WordId) -> bool {
        self.0.contains_key(&word)
    }

    /// Word ids in ascending order.
    pub fn words(&self) -> impl Iterator<Item = WordId> + '_ {
        self.0.keys().copied()
    }

    /// Largest word id present.
    pub fn max_word(&self) -> Option<WordId> {
        self.0.keys().next_back().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, WordId, f32> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Scale weights so they sum to one.
    pub fn normalize_l1(&mut self) {
        let sum: f32 = self.0.values().sum();
        if sum > 0. {
            let inv_sum = 1. / sum;
            for w in self.0.values_mut() {
                *w *= inv_sum;
            }
        }
    }

    /// Scale weights to unit euclidean norm.
    pub fn normalize_l2(&mut self) {
        let norm = self.0.values().map(|w| w * w).sum::<f32>().sqrt();
        if norm > 0. {
            let inv_norm = 1. / norm;
            for w in self.0.values_mut() {
                *w *= inv_norm;
            }
        }
    }

    /// Walk the words present in both vectors, in ascending word order.
    fn common<'a>(&'a self, other: &'a Self) -> impl Iterator<Item = (f32, f32)> + 'a {
        let (small, large, flip) = if self.len() <= other.len() {
            (self, other, false)
        } else {
            (other, self, true)
        };
        small.0.iter().filter_map(move |(w, &a)| {
            large
                .0
                .get(w)
                .map(|&b| if flip { (b, a) } else { (a, b) })
        })
    }
}

impl FromIterator<(WordId, f32)> for BowVector {
    fn from_iter<I: IntoIterator<Item = (WordId, f32)>>(iter: I) -> Self {
        let mut bow = BowVector::new();
        for (word, weight) in iter {
            bow.add_weight(word, weight);
        }
        bow
    }
}

impl<'a> IntoIterator for &'a BowVector {
    type Item = (&'a WordId, &'a f32);
    type IntoIter = btree_map::Iter<'a, WordId, f32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Provides method(s) for computing the similarity score between bow vectors.
///
/// Every score is symmetric and non-negative.
pub trait BoWTrait {
    fn l1(&self, other: &Self) -> f32;
    fn l2(&self, other: &Self) -> f32;
    fn dot(&self, other: &Self) -> f32;
}

impl BoWTrait for BowVector {
    /// Compute L1 score between two bow. (Used in Galvez (Eq 2)).
    ///
    /// Equal to `1 - 0.5 * |a - b|_1` for L1-normalized vectors, but
    /// only touches the words both vectors share.
    fn l1(&self, other: &Self) -> f32 {
        0.5 * self
            .common(other)
            .fold(0., |a, (b, c)| a + b.abs() + c.abs() - (b - c).abs())
    }

    /// Score for L2-normalized vectors: `1 - sqrt(1 - <a, b>)`.
    fn l2(&self, other: &Self) -> f32 {
        let d = self.dot(other);
        if d >= 1. {
            1.
        } else {
            1. - (1. - d).sqrt()
        }
    }

    fn dot(&self, other: &Self) -> f32 {
        self.common(other).fold(0., |a, (b, c)| a + b * c)
    }
}
