//! Remote NER backend (spec §9 "remote service" alternative), built only
//! with the `remote-ner` feature. Posts the document text to a configurable
//! external NER endpoint and parses PER spans from its JSON response; a
//! transport failure marks the backend unavailable rather than panicking,
//! so `NerDetector` degrades the layer instead of treating an empty result
//! as "no names in this document".
//!
//! `Detector::detect` is a synchronous call (spec §5: detection does not
//! suspend); this is the one backend that breaks that assumption by making
//! a network call, so it bridges into the surrounding Tokio runtime via
//! `block_in_place` rather than changing the trait's signature for every
//! other (CPU-bound) backend.

use pseudon_engine::detect::ner::{NerBackend, PersonCandidate};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Deserialize)]
struct NerResponseEntity {
    text: String,
    start: usize,
    end: usize,
    label: String,
}

#[derive(Deserialize)]
struct NerResponse {
    entities: Vec<NerResponseEntity>,
}

pub struct RemoteNerBackend {
    client: reqwest::Client,
    url: String,
    available: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl RemoteNerBackend {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            available: AtomicBool::new(true),
            last_error: Mutex::new(None),
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    async fn call(&self, text: &str) -> reqwest::Result<NerResponse> {
        self.client
            .post(&self.url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?
            .error_for_status()?
            .json::<NerResponse>()
            .await
    }
}

impl NerBackend for RemoteNerBackend {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn recognize(&self, text: &str) -> Vec<PersonCandidate> {
        let result = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(self.call(text))
        });

        match result {
            Ok(parsed) => {
                self.available.store(true, Ordering::Relaxed);
                parsed
                    .entities
                    .into_iter()
                    .filter(|e| e.label == "PER")
                    .map(|e| PersonCandidate {
                        value: e.text,
                        start: e.start,
                        end: e.end,
                    })
                    .collect()
            }
            Err(e) => {
                self.available.store(false, Ordering::Relaxed);
                *self.last_error.lock().unwrap() = Some(e.to_string());
                Vec::new()
            }
        }
    }
}
