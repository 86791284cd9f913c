use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::keyframe::squared_distance;
use crate::query::QueryContext;
use crate::*;

/// Inverted file over visual words: for every word, the keyframes whose
/// bag-of-words vector held that word when they were added.
///
/// Keyframes are shared as `Arc<K>` by the map that owns them. The database
/// only keeps weak references, so it never extends a keyframe's lifetime,
/// while every search hands back strong references that stay valid however
/// the database is modified afterwards.
///
/// `add`, `erase` and `clear` lock the inverted file for their whole body.
/// A search only holds the lock while it collects the keyframes sharing
/// words with the query; scoring happens unlocked. Each search keeps its
/// bookkeeping in its own query context, so searches may run concurrently
/// with each other as well as with insertions.
pub struct KeyFrameDatabase<K> {
    voc: Vocabulary,
    params: SearchParams,
    inverted_file: Mutex<InvertedFile<K>>,
}

struct Entry<K> {
    id: KeyFrameId,
    keyframe: Weak<K>,
}

impl<K> Entry<K> {
    /// The keyframe has not been dropped by its owner.
    fn is_live(&self) -> bool {
        self.keyframe.strong_count() > 0
    }
}

struct InvertedFile<K> {
    buckets: BTreeMap<WordId, Vec<Entry<K>>>,
}

impl<K: KeyFrame> InvertedFile<K> {
    fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    /// Tag every live keyframe sharing a word of `bow` in `ctx`.
    fn gather(
        &self,
        bow: &BowVector,
        excluded: Option<&HashSet<KeyFrameId>>,
        ctx: &mut QueryContext<K>,
    ) {
        for word in bow.words() {
            let bucket = match self.buckets.get(&word) {
                Some(b) => b,
                None => continue,
            };
            for entry in bucket {
                match entry.keyframe.upgrade() {
                    Some(kf) => ctx.visit(&kf, excluded),
                    None => trace!("{}: skipping dropped {}", ctx.label(), entry.id),
                }
            }
        }
    }
}

/// KeyFrameDatabase API
impl<K: KeyFrame> KeyFrameDatabase<K> {
    /// Empty database scoring with `voc`, with default search parameters.
    pub fn new(voc: Vocabulary) -> Self {
        Self {
            voc,
            params: SearchParams::default(),
            inverted_file: Mutex::new(InvertedFile::new()),
        }
    }

    /// Empty database with custom search parameters.
    pub fn with_params(voc: Vocabulary, params: SearchParams) -> DbResult<Self> {
        params.validate()?;
        Ok(Self {
            voc,
            params,
            inverted_file: Mutex::new(InvertedFile::new()),
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.voc
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Index `kf` under every word of its bag-of-words vector.
    ///
    /// No deduplication is done: adding a keyframe twice without erasing it
    /// in between indexes it twice, and one `erase` then only removes one
    /// of the two entries per word. Use [`contains`](Self::contains) if
    /// unsure.
    pub fn add(&self, kf: &Arc<K>) -> DbResult<()> {
        self.voc.check_bow(kf.bow())?;
        let id = kf.id();

        let mut inverted_file = self.inverted_file.lock();
        for word in kf.bow().words() {
            let bucket = inverted_file.buckets.entry(word).or_default();
            bucket.retain(Entry::is_live);
            bucket.push(Entry {
                id,
                keyframe: Arc::downgrade(kf),
            });
        }
        debug!("Add {} ({} words)", id, kf.bow().len());
        Ok(())
    }

    /// Remove `kf` from the bucket of every word of its bag-of-words vector.
    ///
    /// Only the first entry of `kf` in each bucket is removed. Erasing a
    /// keyframe that was never added is a no-op. Entries of keyframes that
    /// were dropped without being erased are pruned from the buckets `add`
    /// and `erase` touch.
    pub fn erase(&self, kf: &K) {
        let id = kf.id();
        let mut missing = 0;

        let mut inverted_file = self.inverted_file.lock();
        for word in kf.bow().words() {
            let bucket = match inverted_file.buckets.get_mut(&word) {
                Some(b) => b,
                None => {
                    missing += 1;
                    continue;
                }
            };
            match bucket.iter().position(|e| e.id == id) {
                Some(pos) => {
                    bucket.remove(pos);
                }
                None => missing += 1,
            }
            bucket.retain(Entry::is_live);
            if bucket.is_empty() {
                inverted_file.buckets.remove(&word);
            }
        }
        drop(inverted_file);

        if missing > 0 {
            warn!("Erase {}: absent from {} of its {} words", id, missing, kf.bow().len());
        } else {
            debug!("Erase {}", id);
        }
    }

    /// Drop every entry of the inverted file.
    pub fn clear(&self) {
        self.inverted_file.lock().buckets.clear();
        debug!("Clear keyframe database");
    }

    /// Find keyframes that may close a loop with `kf`.
    ///
    /// Keyframes connected to `kf` in the covisibility graph are never
    /// returned. Candidates must score at least `min_score` with `kf`, and
    /// their covisibility group must accumulate more than
    /// `retain_ratio` times the best group (and than `retain_ratio * min_score`).
    /// Results are in discovery order, not sorted by score.
    pub fn detect_loop_candidates(&self, kf: &K, min_score: f32) -> DbResult<Vec<Arc<K>>> {
        self.voc.check_bow(kf.bow())?;
        let connected = kf.connected_keyframes();
        let mut ctx = QueryContext::new(format!("Loop query {}", kf.id()));

        self.inverted_file
            .lock()
            .gather(kf.bow(), Some(&connected), &mut ctx);

        Ok(self.rank(ctx, kf.bow(), Some(min_score)))
    }

    /// Find keyframes where the camera that took `frame` may be.
    ///
    /// Unlike loop detection, no keyframe is excluded and no absolute score
    /// is required: only the relative thresholds apply.
    pub fn detect_relocalization_candidates<F: Frame>(&self, frame: &F) -> DbResult<Vec<Arc<K>>> {
        self.voc.check_bow(frame.bow())?;
        let mut ctx = QueryContext::new(format!("Relocalization query {}", frame.frame_id()));

        self.inverted_file.lock().gather(frame.bow(), None, &mut ctx);

        Ok(self.rank(ctx, frame.bow(), None))
    }

    /// Find the keyframes sharing words with `frame` whose global descriptor
    /// is closest to the one of `frame`.
    ///
    /// Returns at most `global_top_k` keyframes, by ascending squared
    /// euclidean distance. Keyframes at equal distance keep discovery order.
    pub fn detect_relocalization_by_global<F: Frame>(
        &self,
        frame: &F,
    ) -> DbResult<Vec<Arc<K>>> {
        self.voc.check_bow(frame.bow())?;
        let query = frame.global_descriptor();
        let mut ctx = QueryContext::new(format!("Global query {}", frame.frame_id()));

        let mut by_distance = {
            let inverted_file = self.inverted_file.lock();
            inverted_file.gather(frame.bow(), None, &mut ctx);
            ctx.candidates()
                .map(|t| {
                    squared_distance(query, t.keyframe.global_descriptor())
                        .map(|d| (d, Arc::clone(&t.keyframe)))
                })
                .collect::<DbResult<Vec<_>>>()?
        };
        if by_distance.is_empty() {
            return Ok(Vec::new());
        }

        // NaN distances sort last.
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
        by_distance.truncate(self.params.global_top_k);
        debug!(
            "{}: {} candidates, keeping {}",
            ctx.label(),
            ctx.len(),
            by_distance.len()
        );

        Ok(by_distance.into_iter().map(|(_, kf)| kf).collect())
    }

    /// Whether some bucket holds a live entry for `id`.
    pub fn contains(&self, id: KeyFrameId) -> bool {
        self.inverted_file
            .lock()
            .buckets
            .values()
            .any(|b| b.iter().any(|e| e.id == id && e.is_live()))
    }

    /// Ids of the live keyframes indexed under `word`, in insertion order.
    pub fn bucket(&self, word: WordId) -> Vec<KeyFrameId> {
        self.inverted_file
            .lock()
            .buckets
            .get(&word)
            .map(|b| b.iter().filter(|e| e.is_live()).map(|e| e.id).collect())
            .unwrap_or_default()
    }

    /// Number of words with at least one keyframe.
    pub fn num_words_indexed(&self) -> usize {
        self.inverted_file.lock().buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inverted_file.lock().buckets.is_empty()
    }

    /// Shared scoring stages of loop and relocalization search, run without
    /// the lock.
    fn rank(&self, mut ctx: QueryContext<K>, query: &BowVector, min_score: Option<f32>) -> Vec<Arc<K>> {
        if ctx.is_empty() {
            debug!("{}: no keyframe shares a word", ctx.label());
            return Vec::new();
        }

        // Only compare against those keyframes that share enough words
        let max_common_words = ctx.max_common_words();
        let min_common_words = self.params.min_common_words(max_common_words);

        let scored = ctx.score_candidates(&self.voc, query, min_common_words, min_score);
        debug!(
            "{}: {} candidates, common words max {} min {}, {} scored",
            ctx.label(),
            ctx.len(),
            max_common_words,
            min_common_words,
            scored.len()
        );
        if scored.is_empty() {
            return Vec::new();
        }

        ctx.accumulate_and_retain(
            &scored,
            &self.params,
            min_common_words,
            min_score.unwrap_or(0.),
        )
    }
}

impl<K> fmt::Debug for KeyFrameDatabase<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inverted_file = self.inverted_file.lock();
        let entries: usize = inverted_file.buckets.values().map(|b| b.len()).sum();
        f.debug_struct("KeyFrameDatabase")
            .field("Vocabulary Words", &self.voc.num_words())
            .field("Scoring", &self.voc.scoring())
            .field("Indexed Words", &inverted_file.buckets.len())
            .field("Entries", &entries)
            .field("Params", &self.params)
            .finish()
    }
}
