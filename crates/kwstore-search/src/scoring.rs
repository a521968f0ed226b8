//! BM25 scoring variants.
//!
//! Term statistics come from the Tantivy index; this module only turns
//! them into scores for the configured method:
//!
//! | method    | idf                                | term weight                                  |
//! |-----------|------------------------------------|----------------------------------------------|
//! | robertson | ln((N - df + 0.5) / (df + 0.5))    | tf / (tf + k1 * norm)                        |
//! | lucene    | ln(1 + (N - df + 0.5) / (df + 0.5))| tf / (tf + k1 * norm)                        |
//! | atire     | ln(N / df)                         | tf * (k1 + 1) / (tf + k1 * norm)             |
//! | bm25l     | ln((N + 1) / (df + 0.5))           | (k1 + 1)(c + d) / (k1 + c + d), c = tf / norm|
//! | bm25+     | ln((N + 1) / df)                   | tf * (k1 + 1) / (tf + k1 * norm) + d         |
//!
//! with `norm = 1 - b + b * dl / avgdl`. Negative Robertson idf values are
//! replaced by `epsilon * mean idf` over the vocabulary.

use kwstore_types::{Bm25Config, ScoringMethod};

/// Length-normalized tf shift for BM25L.
pub const BM25L_DELTA: f32 = 0.5;

/// Lower bound added to every matching term for BM25+.
pub const BM25_PLUS_DELTA: f32 = 1.0;

/// Corpus-level statistics a scorer needs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CorpusStats {
    pub num_docs: u64,
    /// Sum of analyzed document lengths
    pub total_tokens: u64,
}

impl CorpusStats {
    pub fn avg_doc_len(&self) -> f32 {
        if self.num_docs == 0 || self.total_tokens == 0 {
            return 1.0;
        }
        self.total_tokens as f32 / self.num_docs as f32
    }
}

/// Scores term matches with the configured BM25 variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Scorer {
    method: ScoringMethod,
    k1: f32,
    b: f32,
    epsilon: f32,
    num_docs: f32,
    avg_doc_len: f32,
    idf_floor: f32,
}

impl Bm25Scorer {
    pub fn new(config: &Bm25Config, stats: CorpusStats) -> Self {
        Self {
            method: config.method,
            k1: config.k1 as f32,
            b: config.b as f32,
            epsilon: config.epsilon as f32,
            num_docs: stats.num_docs as f32,
            avg_doc_len: stats.avg_doc_len(),
            idf_floor: 0.0,
        }
    }

    pub fn method(&self) -> ScoringMethod {
        self.method
    }

    /// Derive the Robertson idf floor from the vocabulary's document
    /// frequencies. Other methods never produce negative idf.
    pub fn with_vocabulary<I>(mut self, doc_freqs: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        if self.method != ScoringMethod::Robertson {
            return self;
        }
        let (sum, count) = doc_freqs
            .into_iter()
            .fold((0.0f32, 0usize), |(sum, count), df| (sum + self.raw_idf(df), count + 1));
        if count > 0 {
            self.idf_floor = self.epsilon * sum / count as f32;
        }
        self
    }

    fn raw_idf(&self, doc_freq: u64) -> f32 {
        let n = self.num_docs;
        let df = doc_freq as f32;
        match self.method {
            ScoringMethod::Robertson => ((n - df + 0.5) / (df + 0.5)).ln(),
            ScoringMethod::Lucene => (1.0 + (n - df + 0.5) / (df + 0.5)).ln(),
            ScoringMethod::Atire => (n / df).ln(),
            ScoringMethod::Bm25L => ((n + 1.0) / (df + 0.5)).ln(),
            ScoringMethod::Bm25Plus => ((n + 1.0) / df).ln(),
        }
    }

    /// Inverse document frequency of a term present in `doc_freq` documents.
    pub fn idf(&self, doc_freq: u64) -> f32 {
        if doc_freq == 0 {
            return 0.0;
        }
        let idf = self.raw_idf(doc_freq);
        if self.method == ScoringMethod::Robertson && idf < 0.0 {
            self.idf_floor
        } else {
            idf
        }
    }

    /// Saturated, length-normalized weight of `term_freq` occurrences in a
    /// document of `doc_len` tokens.
    pub fn term_weight(&self, term_freq: u32, doc_len: u32) -> f32 {
        let tf = term_freq as f32;
        let k1 = self.k1;
        let norm = 1.0 - self.b + self.b * doc_len as f32 / self.avg_doc_len;

        match self.method {
            ScoringMethod::Robertson | ScoringMethod::Lucene => tf / (tf + k1 * norm),
            ScoringMethod::Atire => tf * (k1 + 1.0) / (tf + k1 * norm),
            ScoringMethod::Bm25L => {
                let c = if norm > 0.0 { tf / norm } else { tf };
                (k1 + 1.0) * (c + BM25L_DELTA) / (k1 + c + BM25L_DELTA)
            }
            ScoringMethod::Bm25Plus => tf * (k1 + 1.0) / (tf + k1 * norm) + BM25_PLUS_DELTA,
        }
    }
}
