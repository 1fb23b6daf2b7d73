/// BM25 similarity, the default for text fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f32,
    /// Length-normalization strength.
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Params {
    /// Lucene-style idf, always positive.
    pub fn idf(&self, doc_freq: u64, doc_count: u64) -> f32 {
        let doc_freq = doc_freq as f32;
        let doc_count = doc_count as f32;
        (1.0 + (doc_count - doc_freq + 0.5) / (doc_freq + 0.5)).ln()
    }

    pub fn score(&self, term_freq: u32, field_len: u32, avg_field_len: f32, idf: f32) -> f32 {
        let tf = term_freq as f32;
        let norm = if avg_field_len > 0.0 {
            field_len as f32 / avg_field_len
        } else {
            1.0
        };
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * norm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idf_decreases_with_doc_freq() {
        let params = Bm25Params::default();
        assert!(params.idf(1, 100) > params.idf(50, 100));
        assert!(params.idf(100, 100) > 0.0);
    }

    #[test]
    fn test_score_saturates_with_term_freq() {
        let params = Bm25Params::default();
        let idf = params.idf(1, 10);
        let s1 = params.score(1, 10, 10.0, idf);
        let s2 = params.score(2, 10, 10.0, idf);
        let s10 = params.score(10, 10, 10.0, idf);
        assert!(s2 > s1);
        // Increment from 9→10 occurrences is smaller than from 1→2.
        assert!(s10 - s2 < (s2 - s1) * 8.0);
    }

    #[test]
    fn test_longer_fields_score_lower() {
        let params = Bm25Params::default();
        let idf = params.idf(1, 10);
        assert!(params.score(1, 5, 10.0, idf) > params.score(1, 20, 10.0, idf));
    }
}
