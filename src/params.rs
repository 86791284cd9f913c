#[cfg(feature = "bincode")]
use bincode;
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
/// Thresholds of the candidate searches. Can be:
/// 1. Left at their defaults (the values loop closing is usually tuned with).
/// 2. Saved to a file & loaded from a file (requires bincode feature, enabled by default).
pub struct SearchParams {
    /// Candidates must share more than `ratio * max` words with the query,
    /// where `max` is the best shared-word count of any candidate.
    pub common_words_ratio: f32,
    /// Groups are retained if their accumulated score is above
    /// `ratio * best accumulated score`.
    pub retain_ratio: f32,
    /// Number of covisible neighbours a candidate accumulates score from.
    pub covisibility_neighbors: usize,
    /// Number of candidates returned by the global descriptor search.
    pub global_top_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            common_words_ratio: 0.8,
            retain_ratio: 0.75,
            covisibility_neighbors: 10,
            global_top_k: 4,
        }
    }
}

impl SearchParams {
    pub fn validate(&self) -> DbResult<()> {
        if !(0.0..=1.0).contains(&self.common_words_ratio) {
            return Err(DbErr::InvalidParams(format!(
                "common_words_ratio {} not in [0, 1]",
                self.common_words_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.retain_ratio) {
            return Err(DbErr::InvalidParams(format!(
                "retain_ratio {} not in [0, 1]",
                self.retain_ratio
            )));
        }
        if self.global_top_k == 0 {
            return Err(DbErr::InvalidParams("global_top_k must be positive".into()));
        }
        Ok(())
    }

    /// `floor(common_words_ratio * max_common_words)`.
    #[inline]
    pub fn min_common_words(&self, max_common_words: u32) -> u32 {
        (max_common_words as f32 * self.common_words_ratio) as u32
    }

    /// Load search parameters from a file
    #[cfg(feature = "bincode")]
    pub fn load<P: AsRef<std::path::Path>>(file: P) -> DbResult<Self> {
        let mut file = std::fs::File::open(file)?;
        let mut buffer: Vec<u8> = Vec::new();
        std::io::Read::read_to_end(&mut file, &mut buffer)?;
        let params: Self = bincode::deserialize(&buffer)?;
        params.validate()?;
        Ok(params)
    }

    /// Save search parameters to a file
    #[cfg(feature = "bincode")]
    pub fn save<P: AsRef<std::path::Path>>(&self, file: P) -> DbResult<()> {
        let serialized = bincode::serialize(&self)?;
        let mut file = std::fs::File::create(file)?;
        std::io::Write::write_all(&mut file, &serialized)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = SearchParams::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.covisibility_neighbors, 10);
        assert_eq!(p.global_top_k, 4);
    }

    #[test]
    fn min_common_words_truncates() {
        let p = SearchParams::default();
        assert_eq!(p.min_common_words(5), 4);
        assert_eq!(p.min_common_words(4), 3);
        assert_eq!(p.min_common_words(1), 0);
        assert_eq!(p.min_common_words(0), 0);
        assert_eq!(p.min_common_words(10), 8);
    }

    #[test]
    fn rejects_out_of_range_params() {
        let mut p = SearchParams::default();
        p.retain_ratio = 1.5;
        assert!(matches!(p.validate(), Err(DbErr::InvalidParams(_))));

        let mut p = SearchParams::default();
        p.common_words_ratio = -0.1;
        assert!(p.validate().is_err());

        let mut p = SearchParams::default();
        p.global_top_k = 0;
        assert!(p.validate().is_err());
    }

    #[cfg(feature = "bincode")]
    #[test]
    fn save_and_load() {
        let path = std::env::temp_dir().join(format!("abow-kfdb-params-{}.bin", std::process::id()));
        let p = SearchParams {
            retain_ratio: 0.5,
            global_top_k: 8,
            ..Default::default()
        };
        p.save(&path).unwrap();
        let loaded = SearchParams::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(p, loaded);
    }
}
