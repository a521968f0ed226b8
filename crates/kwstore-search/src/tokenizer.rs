//! Text analysis for documents and queries.
//!
//! Both sides go through the same [`TextAnalyzer`]:
//! base tokenizer -> RemoveLongFilter -> LowerCaser -> stop words -> stemmer.
//! Texts the base tokenizer fails to segment are counted in
//! [`SegmentationFailures`] so index builds can reject them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kwstore_types::{Bm25Config, TokenizerKind};
use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter,
    TextAnalyzer, TextAnalyzerBuilder, TokenStream,
};

use crate::error::SearchError;

/// Tokens longer than this many bytes are dropped.
pub const MAX_TOKEN_LEN: usize = 40;

/// Common Japanese function words.
pub const JAPANESE_STOP_WORDS: &[&str] = &[
    "あっ", "あり", "ある", "い", "いう", "いる", "う", "か", "が", "から", "こと", "これ",
    "さ", "し", "する", "ず", "せ", "その", "それ", "た", "だ", "たち", "ため", "だっ", "て",
    "で", "でき", "できる", "です", "と", "という", "として", "な", "ない", "なく", "など",
    "なっ", "なり", "なる", "に", "において", "における", "について", "による", "により",
    "の", "ので", "は", "ば", "へ", "ます", "また", "まで", "も", "もの", "や", "よう",
    "より", "ら", "られ", "られる", "れ", "れる", "を", "ん",
];

/// Shared count of texts the base tokenizer could not segment.
#[derive(Debug, Clone, Default)]
pub struct SegmentationFailures(Arc<AtomicUsize>);

impl SegmentationFailures {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// A configured analyzer plus its failure counter. Clones share both.
#[derive(Clone)]
pub struct Analyzer {
    text: TextAnalyzer,
    failures: SegmentationFailures,
}

impl Analyzer {
    pub fn new(text: TextAnalyzer, failures: SegmentationFailures) -> Self {
        Self { text, failures }
    }

    /// The analyzer to register with a Tantivy index.
    pub fn text_analyzer(&self) -> TextAnalyzer {
        self.text.clone()
    }

    pub fn failures(&self) -> usize {
        self.failures.count()
    }

    /// Run text through the analyzer and collect the terms.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.text.clone();
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        stream.process(&mut |token| terms.push(token.text.clone()));
        terms
    }
}

/// Build the analyzer described by the configuration.
///
/// Fails with [`SearchError::Analyzer`] for unknown stemmer or stop word
/// names, or when the Japanese tokenizer is unavailable.
pub fn build_analyzer(config: &Bm25Config) -> Result<Analyzer, SearchError> {
    let failures = SegmentationFailures::default();
    let base = match config.tokenizer {
        TokenizerKind::Simple => TextAnalyzer::builder(SimpleTokenizer::default()).dynamic(),
        TokenizerKind::Japanese => japanese_base(&failures)?,
    };

    let mut builder = base
        .filter_dynamic(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter_dynamic(LowerCaser);

    if let Some(stop_words) = stop_word_filter(config.stopwords.as_deref())? {
        builder = builder.filter_dynamic(stop_words);
    }
    if let Some(language) = stemmer_language(config.stemmer.as_deref())? {
        builder = builder.filter_dynamic(Stemmer::new(language));
    }

    Ok(Analyzer::new(builder.build(), failures))
}

fn is_disabled(name: &str) -> bool {
    matches!(name, "" | "none" | "off" | "false")
}

fn stop_word_filter(name: Option<&str>) -> Result<Option<StopWordFilter>, SearchError> {
    let name = match name.map(|n| n.trim().to_lowercase()) {
        Some(n) if !is_disabled(&n) => n,
        _ => return Ok(None),
    };
    match name.as_str() {
        "en" | "english" => StopWordFilter::new(Language::English)
            .map(Some)
            .ok_or_else(|| SearchError::analyzer("english stop words unavailable")),
        "ja" | "japanese" => Ok(Some(StopWordFilter::remove(
            JAPANESE_STOP_WORDS.iter().map(|w| w.to_string()),
        ))),
        other => Err(SearchError::analyzer(format!("unknown stop word list: {other}"))),
    }
}

fn stemmer_language(name: Option<&str>) -> Result<Option<Language>, SearchError> {
    let name = match name.map(|n| n.trim().to_lowercase()) {
        Some(n) if !is_disabled(&n) => n,
        _ => return Ok(None),
    };
    let language = match name.as_str() {
        "arabic" => Language::Arabic,
        "danish" => Language::Danish,
        "dutch" => Language::Dutch,
        "english" | "en" => Language::English,
        "finnish" => Language::Finnish,
        "french" => Language::French,
        "german" => Language::German,
        "greek" => Language::Greek,
        "hungarian" => Language::Hungarian,
        "italian" => Language::Italian,
        "norwegian" => Language::Norwegian,
        "portuguese" => Language::Portuguese,
        "romanian" => Language::Romanian,
        "russian" => Language::Russian,
        "spanish" => Language::Spanish,
        "swedish" => Language::Swedish,
        "tamil" => Language::Tamil,
        "turkish" => Language::Turkish,
        other => return Err(SearchError::analyzer(format!("unknown stemmer: {other}"))),
    };
    Ok(Some(language))
}

#[cfg(feature = "japanese")]
fn japanese_base(failures: &SegmentationFailures) -> Result<TextAnalyzerBuilder, SearchError> {
    let tokenizer = japanese::JapaneseTokenizer::new()?.with_failures(failures.clone());
    Ok(TextAnalyzer::builder(tokenizer).dynamic())
}

#[cfg(not(feature = "japanese"))]
fn japanese_base(_failures: &SegmentationFailures) -> Result<TextAnalyzerBuilder, SearchError> {
    Err(SearchError::analyzer(
        "japanese tokenizer requires the `japanese` feature",
    ))
}

#[cfg(feature = "japanese")]
pub use japanese::JapaneseTokenizer;

#[cfg(feature = "japanese")]
mod japanese {
    use std::sync::Arc;

    use lindera::dictionary::load_dictionary;
    use lindera::mode::Mode;
    use lindera::segmenter::Segmenter;
    use lindera::tokenizer::Tokenizer as LinderaTokenizer;
    use tantivy::tokenizer::{Token, TokenStream, Tokenizer};
    use tracing::{debug, warn};

    use super::SegmentationFailures;
    use crate::error::SearchError;

    const DICTIONARY_URI: &str = "embedded://unidic";

    /// Tantivy tokenizer backed by lindera morphological segmentation.
    ///
    /// The dictionary is loaded once; clones share it.
    #[derive(Clone)]
    pub struct JapaneseTokenizer {
        inner: Arc<LinderaTokenizer>,
        failures: SegmentationFailures,
    }

    impl JapaneseTokenizer {
        pub fn new() -> Result<Self, SearchError> {
            let dictionary = load_dictionary(DICTIONARY_URI)
                .map_err(|e| SearchError::analyzer(format!("failed to load {DICTIONARY_URI}: {e}")))?;
            let segmenter = Segmenter::new(Mode::Normal, dictionary, None);
            debug!(dictionary = DICTIONARY_URI, "Loaded Japanese tokenizer");
            Ok(Self {
                inner: Arc::new(LinderaTokenizer::new(segmenter)),
                failures: SegmentationFailures::default(),
            })
        }

        /// Count segmentation failures in `failures`.
        pub fn with_failures(mut self, failures: SegmentationFailures) -> Self {
            self.failures = failures;
            self
        }

        fn segment(&self, text: &str) -> Vec<Token> {
            let tokens = match self.inner.tokenize(text) {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!(error = %e, "Japanese segmentation failed");
                    self.failures.record();
                    return Vec::new();
                }
            };

            tokens
                .into_iter()
                .filter(|t| is_word(&t.surface))
                .enumerate()
                .map(|(position, t)| Token {
                    offset_from: t.byte_start,
                    offset_to: t.byte_end,
                    position,
                    text: t.surface.to_string(),
                    position_length: 1,
                })
                .collect()
        }
    }

    /// Whitespace and punctuation-only segments carry no search value.
    fn is_word(surface: &str) -> bool {
        surface.chars().any(char::is_alphanumeric)
    }

    pub struct JapaneseTokenStream {
        tokens: std::vec::IntoIter<Token>,
        token: Token,
    }

    impl Tokenizer for JapaneseTokenizer {
        type TokenStream<'a> = JapaneseTokenStream;

        fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
            JapaneseTokenStream {
                tokens: self.segment(text).into_iter(),
                token: Token::default(),
            }
        }
    }

    impl TokenStream for JapaneseTokenStream {
        fn advance(&mut self) -> bool {
            match self.tokens.next() {
                Some(token) => {
                    self.token = token;
                    true
                }
                None => false,
            }
        }

        fn token(&self) -> &Token {
            &self.token
        }

        fn token_mut(&mut self) -> &mut Token {
            &mut self.token
        }
    }

}
