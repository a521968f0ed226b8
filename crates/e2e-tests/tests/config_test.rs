//! Configuration precedence E2E tests.

use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::{hit_ids, metadata, TestHarness};
use kwstore_adapters::{AdapterError, KeywordSearch, KeywordStore, StoreOptions};
use kwstore_types::{ConfigOverrides, Document, EnvSource};

fn legacy() -> kwstore_types::Metadata {
    metadata(json!({
        "k1": 1.8,
        "b": 0.85,
        "epsilon": 0.3,
        "tokenizer": "simple",
        "index_path": "./data/legacy_index.json"
    }))
}

#[test]
fn test_legacy_mapping_over_defaults() {
    let store = KeywordStore::new(
        StoreOptions::new()
            .without_env()
            .with_legacy(legacy())
            .load_existing(false),
    )
    .unwrap();

    let config = store.get_config();
    assert_eq!(config["k1"], json!(1.8));
    assert_eq!(config["b"], json!(0.85));
    assert_eq!(config["epsilon"], json!(0.3));
    assert_eq!(config["index_path"], json!("./data/legacy_index.json"));
}

#[test]
fn test_env_over_legacy_and_overrides_over_env() {
    let harness = TestHarness::new();
    let env = EnvSource::vars([
        ("REFINIRE_RAG_BM25S_K1", "2.0"),
        ("REFINIRE_RAG_BM25S_B", "0.6"),
        ("REFINIRE_RAG_BM25S_INDEX_PATH", harness.index_path.to_str().unwrap()),
    ]);

    let store = KeywordStore::new(
        StoreOptions::new()
            .with_legacy(legacy())
            .with_env(env)
            .with_overrides(ConfigOverrides::new().k1(2.5)),
    )
    .unwrap();

    let config = store.config();
    assert_eq!(config.k1, 2.5);
    assert_eq!(config.b, 0.6);
    assert_eq!(config.epsilon, 0.3);
    assert_eq!(
        config.index_path.as_deref(),
        harness.index_path.to_str()
    );
}

#[test]
fn test_invalid_ranges_fail_construction() {
    for overrides in [
        ConfigOverrides::new().k1(-1.0),
        ConfigOverrides::new().b(1.01),
        ConfigOverrides::new().method("bm26"),
        ConfigOverrides::new().tokenizer("morse"),
    ] {
        let result = KeywordStore::new(StoreOptions::new().without_env().with_overrides(overrides));
        assert!(matches!(result, Err(AdapterError::Config(_))));
    }

    let env = EnvSource::vars([("REFINIRE_RAG_BM25S_B", "7")]);
    assert!(KeywordStore::new(StoreOptions::new().with_env(env)).is_err());
}

#[test]
fn test_unknown_analyzer_names_fail_construction() {
    let result = KeywordStore::new(
        StoreOptions::new()
            .without_env()
            .with_overrides(ConfigOverrides::new().tokenizer("simple").stemmer("klingon")),
    );
    assert!(matches!(result, Err(AdapterError::Search(_))));
}

#[test]
fn test_get_config_reports_every_field() {
    let harness = TestHarness::new();
    let store = KeywordStore::new(
        harness
            .options()
            .with_overrides(harness.overrides().method("robertson").stopwords("en")),
    )
    .unwrap();

    let config = store.get_config();
    let mut keys: Vec<&str> = config.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["b", "epsilon", "index_path", "k1", "method", "stemmer", "stopwords", "tokenizer"]
    );
    assert_eq!(config["method"], json!("robertson"));
    assert_eq!(config["stopwords"], json!("en"));
    assert_eq!(config["stemmer"], json!(null));
}

fn scored_store(overrides: ConfigOverrides) -> KeywordStore {
    let mut store = KeywordStore::new(
        StoreOptions::new()
            .without_env()
            .with_overrides(overrides.tokenizer("simple")),
    )
    .unwrap();
    store
        .index_documents(vec![
            Document::new("verbose", "rust rust rust notes on tooling and other words"),
            Document::new("terse", "rust"),
            Document::new("unrelated", "python"),
        ])
        .unwrap();
    store
}

#[test]
fn test_ranking_parameters_reach_the_scorer() {
    let normalized = scored_store(ConfigOverrides::new().k1(0.1).b(1.0));
    assert_eq!(
        hit_ids(&normalized.retrieve("rust", None, None).unwrap()),
        vec!["terse", "verbose"]
    );

    let raw = scored_store(ConfigOverrides::new().k1(3.0).b(0.0));
    assert_eq!(
        hit_ids(&raw.retrieve("rust", None, None).unwrap()),
        vec!["verbose", "terse"]
    );

    let score_of = |method: &str| {
        scored_store(ConfigOverrides::new().method(method))
            .retrieve("rust", Some(1), None)
            .unwrap()[0]
            .score
    };
    let lucene = score_of("lucene");
    for method in ["robertson", "atire", "bm25l", "bm25+"] {
        assert!((score_of(method) - lucene).abs() > 1e-4, "{method}");
    }
}
