use std::collections::HashSet;
use std::sync::Arc;

use abow_kfdb::*;

/// Keyframe of a toy map whose covisibility graph links consecutive keyframes.
struct ToyKeyFrame {
    id: KeyFrameId,
    bow: BowVector,
    descriptor: GlobalDescriptor,
    neighbors: Vec<KeyFrameId>,
}

impl KeyFrame for ToyKeyFrame {
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
        self.neighbors.iter().copied().collect()
    }
    fn best_covisibility_keyframes(&self, n: usize) -> Neighbors {
        self.neighbors.iter().take(n).copied().collect()
    }
}

struct ToyFrame {
    bow: BowVector,
    descriptor: GlobalDescriptor,
}

impl Frame for ToyFrame {
    fn frame_id(&self) -> FrameId {
        FrameId(0)
    }
    fn bow(&self) -> &BowVector {
        &self.bow
    }
    fn global_descriptor(&self) -> &[f32] {
        &self.descriptor
    }
}

/// Words seen around position `place` of a circular route of 20 places.
fn observe(place: u64) -> (BowVector, GlobalDescriptor) {
    let place = place % 20;
    let mut bow: BowVector = (0..40u32)
        .map(|j| ((place as u32 * 25 + j) % 500, 1.))
        .collect();
    bow.normalize_l1();
    let angle = place as f32 / 20. * std::f32::consts::PI * 2.;
    (bow, vec![angle.cos(), angle.sin()])
}

fn main() {
    let voc = Vocabulary::with_words(500);
    let db = KeyFrameDatabase::new(voc);
    println!("Database: {:#?}", db);

    // Drive the route once, inserting one keyframe per place.
    let mut map: Vec<Arc<ToyKeyFrame>> = Vec::new();
    for i in 0..20u64 {
        let (bow, descriptor) = observe(i);
        let neighbors = (i.saturating_sub(2)..(i + 3).min(20))
            .filter(|&j| j != i)
            .map(KeyFrameId)
            .collect();
        let kf = Arc::new(ToyKeyFrame {
            id: KeyFrameId(i),
            bow,
            descriptor,
            neighbors,
        });
        db.add(&kf).unwrap();
        map.push(kf);
    }
    println!("\nIndexed {} keyframes: {:#?}", map.len(), db);

    // Coming back to place 3 on the second lap.
    let (bow, descriptor) = observe(23);
    let current = ToyKeyFrame {
        id: KeyFrameId(23),
        bow,
        descriptor,
        neighbors: vec![KeyFrameId(22), KeyFrameId(21)],
    };
    let loops = db.detect_loop_candidates(&current, 0.1).unwrap();
    println!("\nLoop candidates for {}:", current.id);
    for kf in loops.iter() {
        println!("{} | {:#?}", kf.id, db.vocabulary().score(&current.bow, &kf.bow));
    }

    // Lost somewhere around place 12.
    let (bow, descriptor) = observe(12);
    let frame = ToyFrame { bow, descriptor };
    let reloc = db.detect_relocalization_candidates(&frame).unwrap();
    println!("\nRelocalization candidates:");
    for kf in reloc.iter() {
        println!("{} | {:#?}", kf.id, db.vocabulary().score(&frame.bow, &kf.bow));
    }

    let nearest = db.detect_relocalization_by_global(&frame).unwrap();
    println!("\nNearest by global descriptor:");
    for kf in nearest.iter() {
        println!("{} | {:?}", kf.id, kf.descriptor);
    }
}
