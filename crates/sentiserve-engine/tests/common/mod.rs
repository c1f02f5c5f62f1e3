//! Test doubles for dispatcher tests

#![allow(dead_code)]

use async_trait::async_trait;
use sentiserve_classifiers::{ClassificationResult, Classifier, ClassifierLoader, ModelRegistry, WeightLoader};
use sentiserve_core::{Error, ModelDescriptor, Result};
use sentiserve_telemetry::ObservabilitySink;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Marker that makes `ScriptedClassifier` fail the item
pub const FAIL: &str = "FAIL";

/// Marker that makes `ScriptedClassifier` panic
pub const PANIC: &str = "PANIC";

/// A classifier with a fixed answer, scripted failures and a call counter
pub struct ScriptedClassifier {
    name: String,
    label: String,
    score: f32,
    call_count: AtomicU32,
}

impl ScriptedClassifier {
    pub fn new(name: &str, label: &str, score: f32) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            score,
            call_count: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if text.contains(PANIC) {
            panic!("scripted classifier panic");
        }
        if text.contains(FAIL) {
            return Err(Error::classifier("scripted failure"));
        }
        Ok(ClassificationResult::new(self.label.clone(), self.score))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Hands out pre-built classifiers by version; unknown versions fail to load
#[derive(Default)]
pub struct StaticLoader {
    classifiers: HashMap<String, Arc<ScriptedClassifier>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, version: &str, classifier: Arc<ScriptedClassifier>) -> Self {
        self.classifiers.insert(version.to_string(), classifier);
        self
    }
}

#[async_trait]
impl WeightLoader for StaticLoader {
    async fn load(&self, descriptor: &ModelDescriptor) -> Result<Arc<dyn Classifier>> {
        match self.classifiers.get(&descriptor.version) {
            Some(classifier) => Ok(classifier.clone() as Arc<dyn Classifier>),
            None => Err(Error::classifier(format!(
                "no weights at '{}'",
                descriptor.weight_locator
            ))),
        }
    }
}

/// Registry with v1 (default), v2 and v9
pub fn registry() -> Arc<ModelRegistry> {
    Arc::new(
        ModelRegistry::new(
            vec![
                ModelDescriptor::new("v1", "Baseline", "mock:v1"),
                ModelDescriptor::new("v2", "Candidate", "mock:v2"),
                ModelDescriptor::new("v9", "Broken", "mock:v9"),
            ],
            None,
        )
        .unwrap(),
    )
}

pub fn loader(weights: StaticLoader, sink: Arc<dyn ObservabilitySink>) -> Arc<ClassifierLoader> {
    Arc::new(ClassifierLoader::new(registry(), Arc::new(weights), sink))
}
