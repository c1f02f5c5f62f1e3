//! Dispatcher behaviour: version resolution, fallback, fault isolation,
//! canonicalization and caching

mod common;

use common::{loader, ScriptedClassifier, StaticLoader, FAIL, PANIC};
use sentiserve_cache::{CacheConfig, MemoryStore, ResultCache};
use sentiserve_classifiers::{
    Classifier, ClassifierLoader, LabelTable, ModelRegistry, RuntimeLoader, SentimentClassifier,
};
use sentiserve_core::{ModelDescriptor, PredictionRequest, SentimentClass};
use sentiserve_engine::{Dispatcher, DispatcherConfig, ExecutionMode};
use sentiserve_telemetry::MetricsCollector;
use std::sync::Arc;

fn lexicon_dispatcher(metrics: &MetricsCollector) -> Dispatcher {
    let registry = ModelRegistry::new(
        vec![
            ModelDescriptor::new("v1", "Lexicon", "builtin:lexicon"),
            ModelDescriptor::new("v9", "Broken", "builtin:no-such-model"),
        ],
        None,
    )
    .unwrap();
    let sink = Arc::new(metrics.clone());
    let loader = ClassifierLoader::new(Arc::new(registry), Arc::new(RuntimeLoader::new()), sink.clone());

    Dispatcher::new(Arc::new(loader), sink)
}

fn cached(dispatcher: Dispatcher, metrics: &MetricsCollector) -> Dispatcher {
    let cache = ResultCache::new(
        Arc::new(MemoryStore::new()),
        Arc::new(metrics.clone()),
        CacheConfig::default(),
    );
    dispatcher.with_cache(Arc::new(cache))
}

#[tokio::test]
async fn test_basic_positive() {
    let metrics = MetricsCollector::new();
    let dispatcher = lexicon_dispatcher(&metrics);

    let response = dispatcher
        .predict(PredictionRequest::new("r1", ["I love this product"]).with_version("v1"))
        .await;

    assert_eq!(response.request_id, "r1");
    assert_eq!(response.model_version, "v1");
    assert_eq!(response.results.len(), 1);

    let item = &response.results[0];
    assert_eq!(item.class, SentimentClass::Positive);
    assert_eq!(item.label, 1);
    assert!(item.confidence > 0.5);
    assert!(item.error.is_none());
    assert!(!response.cached);
    assert_eq!(metrics.snapshot().inference_batches, 1);
}

#[tokio::test]
async fn test_unknown_version_uses_default() {
    let v1 = Arc::new(ScriptedClassifier::new("baseline", "positive", 0.8));
    let v2 = Arc::new(ScriptedClassifier::new("candidate", "negative", 0.8));
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = Dispatcher::new(
        loader(StaticLoader::new().with("v1", v1.clone()).with("v2", v2.clone()), sink.clone()),
        sink,
    );

    let response = dispatcher
        .predict(PredictionRequest::new("r2", ["hello"]).with_version("does-not-exist"))
        .await;

    assert_eq!(response.model_version, "v1");
    assert_eq!(v1.call_count(), 1);
    assert_eq!(v2.call_count(), 0);

    let response = dispatcher.predict(PredictionRequest::new("r3", ["hello"])).await;
    assert_eq!(response.model_version, "v1");
}

#[tokio::test]
async fn test_order_and_count_preserved_around_failure() {
    let v1 = Arc::new(ScriptedClassifier::new("baseline", "positive", 0.9));
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = Dispatcher::new(loader(StaticLoader::new().with("v1", v1.clone()), sink.clone()), sink);

    let texts = vec![
        "first".to_string(),
        "second".to_string(),
        format!("third {FAIL}"),
        "fourth".to_string(),
        "fifth".to_string(),
    ];
    let response = dispatcher
        .predict(PredictionRequest::new("r4", texts.clone()))
        .await;

    assert_eq!(response.results.len(), texts.len());
    for (j, (item, text)) in response.results.iter().zip(&texts).enumerate() {
        assert_eq!(&item.text, text);
        if j == 2 {
            assert_eq!(item.class, SentimentClass::Unknown);
            assert_eq!(item.label, 0);
            assert_eq!(item.confidence, 0.0);
            assert!(item.raw_label.is_none());
            assert!(item.error.is_some());
        } else {
            assert_eq!(item.class, SentimentClass::Positive);
            assert_eq!(item.raw_label.as_deref(), Some("positive"));
            assert!(item.error.is_none());
        }
    }
    assert_eq!(v1.call_count(), 5);
}

#[tokio::test]
async fn test_panicking_classifier_is_isolated_on_blocking_pool() {
    let v1 = Arc::new(ScriptedClassifier::new("baseline", "positive", 0.9));
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = Dispatcher::new(loader(StaticLoader::new().with("v1", v1), sink.clone()), sink)
        .with_config(DispatcherConfig {
            execution: ExecutionMode::Blocking,
        });

    let response = dispatcher
        .predict(PredictionRequest::new("r5", ["ok", PANIC, "also ok"]))
        .await;

    let classes: Vec<_> = response.results.iter().map(|r| r.class).collect();
    assert_eq!(
        classes,
        vec![
            SentimentClass::Positive,
            SentimentClass::Unknown,
            SentimentClass::Positive
        ]
    );
}

#[tokio::test]
async fn test_inline_execution() {
    let v1 = Arc::new(ScriptedClassifier::new("baseline", "NEG", 0.7));
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = Dispatcher::new(loader(StaticLoader::new().with("v1", v1.clone()), sink.clone()), sink)
        .with_config(DispatcherConfig {
            execution: ExecutionMode::Inline,
        });

    let response = dispatcher.predict(PredictionRequest::new("r6", ["meh"])).await;

    assert_eq!(response.results[0].class, SentimentClass::Negative);
    assert_eq!(response.results[0].raw_label.as_deref(), Some("NEG"));
    assert_eq!(v1.call_count(), 1);
}

#[tokio::test]
async fn test_unrecognized_label_threshold_boundary() {
    let at = Arc::new(ScriptedClassifier::new("at", "LABEL_7", 0.5));
    let above = Arc::new(ScriptedClassifier::new("above", "LABEL_7", 0.500_000_1));
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = Dispatcher::new(
        loader(StaticLoader::new().with("v1", at).with("v2", above), sink.clone()),
        sink,
    );

    let response = dispatcher
        .predict(PredictionRequest::new("r7", ["x"]).with_version("v1"))
        .await;
    assert_eq!(response.results[0].class, SentimentClass::Negative);
    assert_eq!(response.results[0].label, 0);

    let response = dispatcher
        .predict(PredictionRequest::new("r8", ["x"]).with_version("v2"))
        .await;
    assert_eq!(response.results[0].class, SentimentClass::Positive);
    assert_eq!(response.results[0].label, 1);
}

#[tokio::test]
async fn test_custom_label_table() {
    let v1 = Arc::new(ScriptedClassifier::new("stars", "5 stars", 0.2));
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = Dispatcher::new(loader(StaticLoader::new().with("v1", v1), sink.clone()), sink)
        .with_labels(LabelTable::new(["4 stars", "5 stars"], ["1 star", "2 stars"]));

    let response = dispatcher.predict(PredictionRequest::new("r9", ["great"])).await;
    assert_eq!(response.results[0].class, SentimentClass::Positive);
    assert_eq!(response.results[0].confidence, 0.2);
}

#[tokio::test]
async fn test_invalid_locator_falls_back_to_default() {
    let metrics = MetricsCollector::new();
    let dispatcher = lexicon_dispatcher(&metrics);
    let texts = ["I love this product", "this is awful", "the sky"];

    let response = dispatcher
        .predict(PredictionRequest::new("r10", texts).with_version("v9"))
        .await;

    assert_eq!(response.model_version, "v1");
    assert_eq!(response.results.len(), texts.len());

    let direct = SentimentClassifier::new().unwrap();
    let table = LabelTable::default();
    for (item, text) in response.results.iter().zip(texts) {
        let raw = direct.classify(text).unwrap();
        assert_eq!(item.class, table.canonicalize(&raw.label, raw.score).class());
        assert_eq!(item.confidence, raw.score);
        assert_eq!(item.raw_label.as_deref(), Some(raw.label.as_str()));
    }
}

#[tokio::test]
async fn test_default_load_failure_degrades() {
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = Dispatcher::new(loader(StaticLoader::new(), sink.clone()), sink);

    let response = dispatcher
        .predict(PredictionRequest::new("r11", ["anything", "at all"]).with_version("v2"))
        .await;

    assert_eq!(response.request_id, "r11");
    assert_eq!(response.model_version, "v2");
    assert!(response.results.is_empty());
    assert_eq!(response.latency_ms, 0.0);
    assert!(!response.cached);
}

#[tokio::test]
async fn test_empty_batch() {
    let metrics = MetricsCollector::new();
    let dispatcher = cached(lexicon_dispatcher(&metrics), &metrics);

    let response = dispatcher
        .predict(PredictionRequest::new("r12", Vec::<String>::new()))
        .await;

    assert!(response.results.is_empty());
    assert!(!response.cached);
}

#[tokio::test]
async fn test_repeated_texts_served_from_cache() {
    let v1 = Arc::new(ScriptedClassifier::new("baseline", "positive", 0.9));
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = cached(
        Dispatcher::new(loader(StaticLoader::new().with("v1", v1.clone()), sink.clone()), sink),
        &metrics,
    );

    let first = dispatcher
        .predict(PredictionRequest::new("a", ["one", "two"]))
        .await;
    assert!(!first.cached);
    assert_eq!(v1.call_count(), 2);

    let second = dispatcher
        .predict(PredictionRequest::new("b", ["two", "one"]))
        .await;
    assert!(second.cached);
    assert_eq!(v1.call_count(), 2);
    assert_eq!(second.results[0], first.results[1]);
    assert_eq!(second.results[1], first.results[0]);

    // One new text means the response is no longer fully cached.
    let third = dispatcher
        .predict(PredictionRequest::new("c", ["one", "three"]))
        .await;
    assert!(!third.cached);
    assert_eq!(v1.call_count(), 3);

    assert_eq!(metrics.cache_hits("v1"), 3);
    assert_eq!(metrics.cache_misses("v1"), 3);
}

#[tokio::test]
async fn test_failed_items_are_not_cached() {
    let v1 = Arc::new(ScriptedClassifier::new("baseline", "positive", 0.9));
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = cached(
        Dispatcher::new(loader(StaticLoader::new().with("v1", v1.clone()), sink.clone()), sink),
        &metrics,
    );

    for id in ["a", "b"] {
        let response = dispatcher.predict(PredictionRequest::new(id, [FAIL])).await;
        assert_eq!(response.results[0].class, SentimentClass::Unknown);
        assert!(!response.cached);
    }
    assert_eq!(v1.call_count(), 2);
}

#[tokio::test]
async fn test_non_finite_score_fails_the_item() {
    let v1 = Arc::new(ScriptedClassifier::new("baseline", "positive", f32::NAN));
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = cached(
        Dispatcher::new(loader(StaticLoader::new().with("v1", v1.clone()), sink.clone()), sink),
        &metrics,
    );

    for id in ["a", "b"] {
        let response = dispatcher.predict(PredictionRequest::new(id, ["fine"])).await;
        let item = &response.results[0];

        assert_eq!(item.class, SentimentClass::Unknown);
        assert!(item.error.as_deref().unwrap().contains("non-finite"));
        assert!(serde_json::to_string(&response).is_ok());
        assert!(!response.cached);
    }
    assert_eq!(v1.call_count(), 2);
}

#[tokio::test]
async fn test_cache_is_keyed_by_serving_version() {
    let v1 = Arc::new(ScriptedClassifier::new("baseline", "positive", 0.9));
    let v2 = Arc::new(ScriptedClassifier::new("candidate", "negative", 0.9));
    let metrics = MetricsCollector::new();
    let sink = Arc::new(metrics.clone());
    let dispatcher = cached(
        Dispatcher::new(
            loader(StaticLoader::new().with("v1", v1.clone()).with("v2", v2.clone()), sink.clone()),
            sink,
        ),
        &metrics,
    );

    let a = dispatcher
        .predict(PredictionRequest::new("a", ["same"]).with_version("v1"))
        .await;
    let b = dispatcher
        .predict(PredictionRequest::new("b", ["same"]).with_version("v2"))
        .await;

    assert_eq!(a.results[0].class, SentimentClass::Positive);
    assert_eq!(b.results[0].class, SentimentClass::Negative);
    assert!(!b.cached);
    assert_eq!(v2.call_count(), 1);
}

#[tokio::test]
async fn test_disabled_cache_does_not_change_results() {
    let metrics = MetricsCollector::new();
    let cache = ResultCache::disabled(Arc::new(metrics.clone()), CacheConfig::default());
    let dispatcher = lexicon_dispatcher(&metrics).with_cache(Arc::new(cache));

    let response = dispatcher
        .predict(PredictionRequest::new("r13", ["I love this product"]))
        .await;

    assert_eq!(response.results[0].class, SentimentClass::Positive);
    assert!(!response.cached);
    assert_eq!(metrics.cache_misses("v1"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_load() {
    let metrics = MetricsCollector::new();
    let dispatcher = lexicon_dispatcher(&metrics);

    let requests = (0..8).map(|i| {
        dispatcher.predict(PredictionRequest::new(format!("r{i}"), ["good", "bad"]))
    });
    let responses = futures::future::join_all(requests).await;

    assert!(responses.iter().all(|r| r.results.len() == 2));
    assert_eq!(metrics.snapshot().models_loaded, 1);
    assert_eq!(metrics.active_models("v1"), 1);
}

#[test]
fn test_list_models_in_registration_order() {
    let metrics = MetricsCollector::new();
    let dispatcher = lexicon_dispatcher(&metrics);

    let versions: Vec<_> = dispatcher
        .list_models()
        .iter()
        .map(|d| d.version.as_str())
        .collect();
    assert_eq!(versions, vec!["v1", "v9"]);
}
