use smallvec::SmallVec;
use std::collections::HashSet;

use crate::*;

/// Whole-image descriptor of a frame or keyframe.
pub type GlobalDescriptor = Vec<f32>;

/// Best covisible neighbours of a keyframe, strongest first.
pub type Neighbors = SmallVec<[KeyFrameId; 10]>;

/// A frame the database can be queried with. Frames are never indexed.
pub trait Frame {
    fn frame_id(&self) -> FrameId;
    fn bow(&self) -> &BowVector;
    fn global_descriptor(&self) -> &[f32];
}

/// A keyframe owned by the map and referenced (weakly) by the database.
///
/// The covisibility graph is read through the last two methods; the
/// database never writes to a keyframe.
pub trait KeyFrame {
    fn id(&self) -> KeyFrameId;
    fn bow(&self) -> &BowVector;
    fn global_descriptor(&self) -> &[f32];

    /// Keyframes sharing observations with this one.
    fn connected_keyframes(&self) -> HashSet<KeyFrameId>;

    /// Up to `n` covisible keyframes, by descending covisibility weight.
    fn best_covisibility_keyframes(&self, n: usize) -> Neighbors;
}

/// Squared euclidean distance between two global descriptors.
pub(crate) fn squared_distance(a: &[f32], b: &[f32]) -> DbResult<f32> {
    if a.len() != b.len() {
        return Err(DbErr::DescriptorMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(a.iter().zip(b).fold(0., |acc, (x, y)| acc + (x - y) * (x - y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_distance_of_descriptors() {
        assert_eq!(squared_distance(&[1., 2., 3.], &[1., 0., 6.]).unwrap(), 13.);
        assert_eq!(squared_distance(&[], &[]).unwrap(), 0.);
        assert!(matches!(
            squared_distance(&[1., 2.], &[1.]),
            Err(DbErr::DescriptorMismatch { expected: 2, found: 1 })
        ));
    }
}
