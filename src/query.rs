//! Bookkeeping for a single candidate search.
//!
//! A [`QueryContext`] is built fresh by every search and dropped when the
//! search returns, so nothing a query learns about a keyframe can leak into
//! the next one, and keyframes themselves are never written to.

use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::*;

/// What a query knows about one keyframe it met in the inverted file.
#[derive(Debug)]
pub struct Tally<K> {
    pub keyframe: Arc<K>,
    /// Accepted as a candidate of this query.
    pub tagged: bool,
    /// Words shared with the query.
    pub words: u32,
    /// Similarity with the query, once computed.
    pub score: Option<f32>,
}

/// Per-query scratch state, keyed by keyframe id.
pub struct QueryContext<K> {
    label: String,
    tallies: HashMap<KeyFrameId, Tally<K>>,
    candidates: Vec<KeyFrameId>,
}

impl<K: KeyFrame> QueryContext<K> {
    pub fn new(label: String) -> Self {
        Self {
            label,
            tallies: HashMap::new(),
            candidates: Vec::new(),
        }
    }

    /// Record that `keyframe` shares one more word with the query.
    ///
    /// The first time a keyframe is met its word count starts from zero and,
    /// unless it is `excluded`, it becomes a candidate. An excluded keyframe
    /// is never tagged, so its count restarts on every word.
    pub fn visit(&mut self, keyframe: &Arc<K>, excluded: Option<&HashSet<KeyFrameId>>) {
        let id = keyframe.id();
        let tally = self.tallies.entry(id).or_insert_with(|| Tally {
            keyframe: Arc::clone(keyframe),
            tagged: false,
            words: 0,
            score: None,
        });
        if !tally.tagged {
            tally.words = 0;
            if !excluded.map_or(false, |e| e.contains(&id)) {
                tally.tagged = true;
                self.candidates.push(id);
            }
        }
        tally.words += 1;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Number of keyframes tagged as candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[cfg(test)]
    pub fn tally(&self, id: KeyFrameId) -> Option<&Tally<K>> {
        self.tallies.get(&id)
    }

    /// Candidates in the order they were first met.
    pub fn candidates(&self) -> impl Iterator<Item = &Tally<K>> + '_ {
        self.candidates.iter().filter_map(move |id| self.tallies.get(id))
    }

    pub fn max_common_words(&self) -> u32 {
        self.candidates().map(|t| t.words).max().unwrap_or(0)
    }

    /// Score every candidate sharing more than `min_common_words` words with
    /// the query. The score is stored on the tally; the candidate is returned
    /// only if the score reaches `floor`, when one is given.
    pub fn score_candidates(
        &mut self,
        voc: &Vocabulary,
        query: &BowVector,
        min_common_words: u32,
        floor: Option<f32>,
    ) -> Vec<(f32, KeyFrameId)> {
        let mut scored = Vec::new();
        for id in &self.candidates {
            let tally = match self.tallies.get_mut(id) {
                Some(t) if t.words > min_common_words => t,
                _ => continue,
            };
            let si = voc.score(query, tally.keyframe.bow());
            tally.score = Some(si);
            if floor.map_or(true, |f| si >= f) {
                scored.push((si, *id));
            }
        }
        scored
    }

    /// Score of `id` if it is a candidate of this query sharing more than
    /// `min_common_words` words.
    fn group_score(&self, id: &KeyFrameId, min_common_words: u32) -> Option<f32> {
        self.tallies
            .get(id)
            .filter(|t| t.tagged && t.words > min_common_words)
            .and_then(|t| t.score)
    }

    /// Accumulate each scored candidate's score over its covisible neighbours
    /// that are themselves candidates, and keep the best keyframe of every
    /// group whose accumulated score is above `retain_ratio` times the best
    /// one. The best accumulated score starts at `best_acc_floor`.
    pub fn accumulate_and_retain(
        &self,
        scored: &[(f32, KeyFrameId)],
        params: &SearchParams,
        min_common_words: u32,
        best_acc_floor: f32,
    ) -> Vec<Arc<K>> {
        let mut acc_score_and_match: Vec<(f32, KeyFrameId)> = Vec::with_capacity(scored.len());
        let mut best_acc_score = best_acc_floor;

        for &(score, id) in scored {
            let neighbors = match self.tallies.get(&id) {
                Some(t) => t
                    .keyframe
                    .best_covisibility_keyframes(params.covisibility_neighbors),
                None => continue,
            };

            let mut best_score = score;
            let mut acc_score = score;
            let mut best_id = id;
            for n in neighbors.iter().take(params.covisibility_neighbors) {
                if let Some(si) = self.group_score(n, min_common_words) {
                    acc_score += si;
                    if si > best_score {
                        best_score = si;
                        best_id = *n;
                    }
                }
            }

            acc_score_and_match.push((acc_score, best_id));
            if acc_score > best_acc_score {
                best_acc_score = acc_score;
            }
        }

        let min_score_to_retain = params.retain_ratio * best_acc_score;
        debug!(
            "{}: {} groups, best accumulated score {}, retaining above {}",
            self.label,
            acc_score_and_match.len(),
            best_acc_score,
            min_score_to_retain
        );

        let mut already_added = HashSet::new();
        acc_score_and_match
            .into_iter()
            .filter(|&(acc, _)| acc > min_score_to_retain)
            .filter(|&(_, id)| already_added.insert(id))
            .filter_map(|(_, id)| self.tallies.get(&id).map(|t| Arc::clone(&t.keyframe)))
            .collect()
    }
}
