#![allow(dead_code)]

use abow_kfdb::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Keyframe as a map would hold it, with a frozen covisibility graph.
#[derive(Debug)]
pub struct MapKeyFrame {
    pub id: KeyFrameId,
    pub bow: BowVector,
    pub descriptor: GlobalDescriptor,
    pub connected: HashSet<KeyFrameId>,
    pub neighbors: Vec<KeyFrameId>,
}

impl MapKeyFrame {
    pub fn new(id: u64, words: &[(WordId, f32)]) -> Self {
        Self {
            id: KeyFrameId(id),
            bow: words.iter().copied().collect(),
            descriptor: Vec::new(),
            connected: HashSet::new(),
            neighbors: Vec::new(),
        }
    }

    /// Covisible neighbours, strongest first. They also count as connected.
    pub fn neighbors(mut self, ids: &[u64]) -> Self {
        self.neighbors = ids.iter().map(|&i| KeyFrameId(i)).collect();
        self.connected.extend(self.neighbors.iter().copied());
        self
    }

    /// Connected without being among the best covisible neighbours.
    pub fn connected(mut self, ids: &[u64]) -> Self {
        self.connected.extend(ids.iter().map(|&i| KeyFrameId(i)));
        self
    }

    pub fn descriptor(mut self, d: &[f32]) -> Self {
        self.descriptor = d.to_vec();
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl KeyFrame for MapKeyFrame {
    fn id(&self) -> KeyFrameId {
        self.id
    }

    fn bow(&self) -> &BowVector {
        &self.bow
    }

    fn global_descriptor(&self) -> &[f32] {
        &self.descriptor
    }

    fn connected_keyframes(&self) -> HashSet<KeyFrameId> {
        self.connected.clone()
    }

    fn best_covisibility_keyframes(&self, n: usize) -> Neighbors {
        self.neighbors.iter().take(n).copied().collect()
    }
}

/// Transient frame used for relocalization queries.
#[derive(Debug)]
pub struct QueryFrame {
    pub id: FrameId,
    pub bow: BowVector,
    pub descriptor: GlobalDescriptor,
}

impl QueryFrame {
    pub fn new(id: u64, words: &[(WordId, f32)]) -> Self {
        Self {
            id: FrameId(id),
            bow: words.iter().copied().collect(),
            descriptor: Vec::new(),
        }
    }

    pub fn descriptor(mut self, d: &[f32]) -> Self {
        self.descriptor = d.to_vec();
        self
    }
}

impl Frame for QueryFrame {
    fn frame_id(&self) -> FrameId {
        self.id
    }

    fn bow(&self) -> &BowVector {
        &self.bow
    }

    fn global_descriptor(&self) -> &[f32] {
        &self.descriptor
    }
}

/// Words with unit weight.
pub fn unit(words: &[WordId]) -> Vec<(WordId, f32)> {
    words.iter().map(|&w| (w, 1.)).collect()
}

pub fn ids(kfs: &[Arc<MapKeyFrame>]) -> Vec<KeyFrameId> {
    kfs.iter().map(|k| k.id).collect()
}

pub fn id_set(kfs: &[Arc<MapKeyFrame>]) -> HashSet<KeyFrameId> {
    kfs.iter().map(|k| k.id).collect()
}

/// Database scoring with the inner product, so scores are easy to predict.
pub fn dot_db(num_words: usize) -> KeyFrameDatabase<MapKeyFrame> {
    KeyFrameDatabase::new(Vocabulary::new(num_words, ScoringType::DotProduct))
}
