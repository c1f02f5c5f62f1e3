//! Test doubles for classifiers and weight loading
//!
//! Provides configurable mock implementations of the `Classifier` and
//! `WeightLoader` traits for exercising the loader without real weights.

#![allow(dead_code)]

use async_trait::async_trait;
use sentiserve_classifiers::{ClassificationResult, Classifier, WeightLoader};
use sentiserve_core::{Error, ModelDescriptor, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A classifier returning a fixed label and score
pub struct MockClassifier {
    name: String,
    label: String,
    score: f32,
    call_count: AtomicU32,
}

impl MockClassifier {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: "positive".to_string(),
            score: 0.9,
            call_count: AtomicU32::new(0),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Get the number of times classify was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Classifier for MockClassifier {
    fn classify(&self, _text: &str) -> Result<ClassificationResult> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Ok(ClassificationResult::new(self.label.clone(), self.score))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A classifier that always fails
pub struct FailingClassifier {
    name: String,
}

impl FailingClassifier {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Classifier for FailingClassifier {
    fn classify(&self, _text: &str) -> Result<ClassificationResult> {
        Err(Error::classifier("Simulated classifier failure"))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A weight loader that counts constructions per version
#[derive(Default)]
pub struct CountingLoader {
    constructions: Mutex<HashMap<String, u32>>,
    failing: HashSet<String>,
    flaky: Mutex<HashMap<String, u32>>,
    delay: Option<Duration>,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every load of this version fails
    pub fn with_failing(mut self, version: &str) -> Self {
        self.failing.insert(version.to_string());
        self
    }

    /// The first `failures` loads of this version fail
    pub fn with_flaky(self, version: &str, failures: u32) -> Self {
        self.flaky
            .lock()
            .unwrap()
            .insert(version.to_string(), failures);
        self
    }

    /// Simulate slow weight loading
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of load calls made for a version, failed ones included
    pub fn constructions(&self, version: &str) -> u32 {
        self.constructions
            .lock()
            .unwrap()
            .get(version)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl WeightLoader for CountingLoader {
    async fn load(&self, descriptor: &ModelDescriptor) -> Result<Arc<dyn Classifier>> {
        *self
            .constructions
            .lock()
            .unwrap()
            .entry(descriptor.version.clone())
            .or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&descriptor.version) {
            return Err(Error::classifier("weights not found"));
        }

        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(remaining) = flaky.get_mut(&descriptor.version) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(Error::classifier("transient download failure"));
                }
            }
        }

        Ok(Arc::new(MockClassifier::new(&descriptor.display_name)))
    }
}
