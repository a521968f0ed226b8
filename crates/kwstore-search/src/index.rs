//! Tantivy-backed ranking engine.
//!
//! Each build creates a fresh in-RAM index over the whole corpus. Tantivy
//! supplies analysis, postings, field norms and metadata term queries;
//! [`Bm25Scorer`] turns the term statistics into scores for the configured
//! BM25 variant.

use std::collections::{BTreeMap, HashMap, HashSet};

use kwstore_types::{Bm25Config, Document};
use serde_json::Value;
use tantivy::collector::DocSetCollector;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::postings::Postings;
use tantivy::{
    DocAddress, DocSet, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher,
    TantivyDocument, Term, TERMINATED,
};
use tracing::{debug, info};

use crate::engine::{EngineBuilder, EngineCapabilities, RankingEngine, ScoredDoc};
use crate::error::SearchError;
use crate::filter::{Criterion, MetadataFilter, Operator};
use crate::schema::{build_keyword_schema, meta_term, KeywordSchema, CONTENT_ANALYZER};
use crate::scoring::{Bm25Scorer, CorpusStats};
use crate::tokenizer::{build_analyzer, Analyzer};

/// Memory budget for IndexWriter (50MB)
const WRITER_MEMORY_BYTES: usize = 50 * 1024 * 1024;

/// Builds [`TantivyEngine`]s with one shared analyzer.
#[derive(Clone)]
pub struct TantivyEngineBuilder {
    analyzer: Analyzer,
}

impl TantivyEngineBuilder {
    /// Assemble the analyzer for `config`. Dictionary loading happens here.
    pub fn new(config: &Bm25Config) -> Result<Self, SearchError> {
        Ok(Self {
            analyzer: build_analyzer(config)?,
        })
    }
}

impl EngineBuilder for TantivyEngineBuilder {
    fn build(
        &self,
        config: &Bm25Config,
        documents: &[Document],
    ) -> Result<Box<dyn RankingEngine>, SearchError> {
        debug!(tokenizer = %config.tokenizer, docs = documents.len(), "Building keyword index");
        let engine = TantivyEngine::build(self.analyzer.clone(), config, documents)?;
        Ok(Box::new(engine))
    }
}

/// BM25 index over a fixed corpus.
pub struct TantivyEngine {
    reader: IndexReader,
    schema: KeywordSchema,
    analyzer: Analyzer,
    scorer: Bm25Scorer,
    num_docs: usize,
}

impl TantivyEngine {
    /// Index `documents` in order. Fails if the analyzer could not segment
    /// any of them.
    pub fn build(
        analyzer: Analyzer,
        config: &Bm25Config,
        documents: &[Document],
    ) -> Result<Self, SearchError> {
        let schema = build_keyword_schema();
        let index = Index::create_in_ram(schema.schema().clone());
        index
            .tokenizers()
            .register(CONTENT_ANALYZER, analyzer.text_analyzer());

        let failures_before = analyzer.failures();
        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?;

        for (ordinal, document) in documents.iter().enumerate() {
            let mut doc = TantivyDocument::default();
            doc.add_u64(schema.ordinal, ordinal as u64);
            doc.add_text(schema.content, &document.content);
            for (key, value) in &document.metadata {
                if let Some(term) = meta_term(key, value) {
                    doc.add_text(schema.meta, &term);
                }
            }
            writer.add_document(doc)?;
        }
        writer.commit()?;

        let failed = analyzer.failures().saturating_sub(failures_before);
        if failed > 0 {
            return Err(SearchError::analyzer(format!(
                "segmentation failed for {failed} of {} documents",
                documents.len()
            )));
        }

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let scorer = corpus_scorer(config, &reader.searcher(), &schema)?;

        info!(
            docs = documents.len(),
            method = %scorer.method(),
            "Built keyword index"
        );

        Ok(Self {
            reader,
            schema,
            analyzer,
            scorer,
            num_docs: documents.len(),
        })
    }

    /// Score every document containing at least one query term, optionally
    /// restricted to `allowed`.
    fn score(
        &self,
        tokens: &[String],
        allowed: Option<&HashSet<DocAddress>>,
    ) -> Result<Vec<ScoredDoc>, SearchError> {
        let searcher = self.reader.searcher();

        let mut query_terms: BTreeMap<&str, usize> = BTreeMap::new();
        for token in tokens {
            *query_terms.entry(token.as_str()).or_default() += 1;
        }

        let mut scores: HashMap<DocAddress, f32> = HashMap::new();
        for (text, repeats) in query_terms {
            let term = Term::from_field_text(self.schema.content, text);
            let doc_freq = searcher.doc_freq(&term)?;
            if doc_freq == 0 {
                continue;
            }
            let idf = self.scorer.idf(doc_freq) * repeats as f32;

            for (segment_ord, segment) in searcher.segment_readers().iter().enumerate() {
                let inverted = segment.inverted_index(self.schema.content)?;
                let Some(mut postings) =
                    inverted.read_postings(&term, IndexRecordOption::WithFreqs)?
                else {
                    continue;
                };
                let norms = segment.get_fieldnorms_reader(self.schema.content)?;

                let mut doc = postings.doc();
                while doc != TERMINATED {
                    let address = DocAddress::new(segment_ord as u32, doc);
                    if allowed.map_or(true, |set| set.contains(&address)) {
                        let weight = self
                            .scorer
                            .term_weight(postings.term_freq(), norms.fieldnorm(doc));
                        *scores.entry(address).or_insert(0.0) += idf * weight;
                    }
                    doc = postings.advance();
                }
            }
        }

        let ordinals = searcher
            .segment_readers()
            .iter()
            .map(|segment| segment.fast_fields().u64("ordinal"))
            .collect::<Result<Vec<_>, _>>()?;

        scores
            .into_iter()
            .map(|(address, score)| {
                ordinals
                    .get(address.segment_ord as usize)
                    .and_then(|column| column.first(address.doc_id))
                    .map(|ordinal| ScoredDoc {
                        ordinal: ordinal as usize,
                        score,
                    })
                    .ok_or_else(|| {
                        SearchError::Tantivy(tantivy::TantivyError::SchemaError(
                            "document without ordinal".to_string(),
                        ))
                    })
            })
            .collect()
    }

    /// Translate equality and `$in` on strings and booleans. Anything else
    /// is left to the caller's fallback.
    fn filter_query(&self, filter: &MetadataFilter) -> Result<Box<dyn Query>, SearchError> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for (field, criterion) in filter.criteria() {
            let values: Vec<&Value> = match criterion {
                Criterion::Equals(value) => vec![value],
                Criterion::AnyOf(values) => values.iter().collect(),
                Criterion::Operators(ops) => match ops.as_slice() {
                    [Operator::In(values)] => values.iter().collect(),
                    _ => {
                        return Err(SearchError::unsupported_filter(format!(
                            "operators on field {field}"
                        )))
                    }
                },
            };
            if values.is_empty() {
                return Err(SearchError::unsupported_filter(format!(
                    "empty value list on field {field}"
                )));
            }

            let mut alternatives: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(values.len());
            for value in values {
                let term = meta_term(field, value).ok_or_else(|| {
                    SearchError::unsupported_filter(format!("value {value} on field {field}"))
                })?;
                let query = TermQuery::new(
                    Term::from_field_text(self.schema.meta, &term),
                    IndexRecordOption::Basic,
                );
                alternatives.push((Occur::Should, Box::new(query)));
            }
            clauses.push((Occur::Must, Box::new(BooleanQuery::new(alternatives))));
        }

        Ok(Box::new(BooleanQuery::new(clauses)))
    }
}

/// Corpus statistics for the content field, folded into a scorer.
fn corpus_scorer(
    config: &Bm25Config,
    searcher: &Searcher,
    schema: &KeywordSchema,
) -> Result<Bm25Scorer, SearchError> {
    let mut stats = CorpusStats {
        num_docs: searcher.num_docs(),
        total_tokens: 0,
    };
    let mut vocabulary: HashMap<Vec<u8>, u64> = HashMap::new();

    for segment in searcher.segment_readers() {
        let inverted = segment.inverted_index(schema.content)?;
        stats.total_tokens += inverted.total_num_tokens();

        let mut terms = inverted.terms().stream()?;
        while terms.advance() {
            *vocabulary.entry(terms.key().to_vec()).or_default() +=
                u64::from(terms.value().doc_freq);
        }
    }

    Ok(Bm25Scorer::new(config, stats).with_vocabulary(vocabulary.into_values()))
}

/// Highest score first, ties by corpus position, at most `top_k`.
fn rank(mut hits: Vec<ScoredDoc>, top_k: usize) -> Vec<ScoredDoc> {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.ordinal.cmp(&b.ordinal))
    });
    hits.truncate(top_k);
    hits
}

impl RankingEngine for TantivyEngine {
    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            native_filter: true,
        }
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        self.analyzer.analyze(text)
    }

    fn retrieve(&self, tokens: &[String], top_k: usize) -> Result<Vec<ScoredDoc>, SearchError> {
        if tokens.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        Ok(rank(self.score(tokens, None)?, top_k))
    }

    fn retrieve_filtered(
        &self,
        tokens: &[String],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredDoc>, SearchError> {
        if filter.is_empty() {
            return self.retrieve(tokens, top_k);
        }
        let filter_query = self.filter_query(filter)?;
        if tokens.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let allowed = self
            .reader
            .searcher()
            .search(filter_query.as_ref(), &DocSetCollector)?;
        Ok(rank(self.score(tokens, Some(&allowed))?, top_k))
    }

    fn num_docs(&self) -> usize {
        self.num_docs
    }
}
