//! Shared test helpers
//!
//! `FakeExtractor` stands in for the OCR service. Each `extract` call takes the
//! next queued response; tests resolve it through the returned sender, which
//! lets them control the order in which concurrent extractions finish.
//! Availability checks can be held open the same way with `hold_next_check`.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use piletest_verify::models::{ProjectRecord, ReadingRecord, SourceFile};
use piletest_verify::types::{ConfidenceValue, ExtractionBatch, ExtractionError, Extractor};

pub type ExtractResult = Result<ExtractionBatch, ExtractionError>;

pub struct FakeExtractor {
    available: AtomicBool,
    calls: AtomicUsize,
    checks: AtomicUsize,
    check_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    responses: Mutex<VecDeque<oneshot::Receiver<ExtractResult>>>,
}

impl FakeExtractor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            checks: AtomicUsize::new(0),
            check_gates: Mutex::new(VecDeque::new()),
            responses: Mutex::new(VecDeque::new()),
        })
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Queue a pending response for the next `extract` call
    pub fn queue(&self) -> oneshot::Sender<ExtractResult> {
        let (tx, rx) = oneshot::channel();
        self.responses.lock().unwrap().push_back(rx);
        tx
    }

    /// Queue a response that is returned immediately
    pub fn queue_ready(&self, result: ExtractResult) {
        let tx = self.queue();
        let _ = tx.send(result);
    }

    /// Make the next `is_available` call wait until the sender fires
    pub fn hold_next_check(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.check_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    /// Wait until `is_available` has been entered `n` times
    pub async fn wait_for_checks(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.checks() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("availability was not checked in time");
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until `extract` has been entered `n` times
    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("extractor was not called in time");
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn is_available(&self) -> bool {
        let gate = self.check_gates.lock().unwrap().pop_front();
        self.checks.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.available.load(Ordering::SeqCst)
    }

    async fn extract(&self, _sources: &[SourceFile]) -> ExtractResult {
        let next = self.responses.lock().unwrap().pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        match next {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ExtractionError::Network("response dropped".into()))),
            None => Err(ExtractionError::Api(500, "no response queued".into())),
        }
    }
}

/// Reading with a pressure and the first two gauges set
pub fn reading(pressure: f64, gauge: f64) -> ReadingRecord {
    let mut record = ReadingRecord {
        pressure: ConfidenceValue::new(Some(pressure), 0.9),
        ..Default::default()
    };
    record.gauges[0] = ConfidenceValue::new(Some(gauge), 0.8);
    record.gauges[1] = ConfidenceValue::new(Some(gauge), 0.7);
    record
}

/// Batch with a ram area of 706 cm² and the given (pressure, gauge) rows
pub fn batch(rows: &[(f64, f64)]) -> ExtractionBatch {
    let mut project = ProjectRecord::default();
    project.ram_area = ConfidenceValue::new(Some("706".into()), 0.9);
    ExtractionBatch {
        project,
        readings: rows.iter().map(|(p, g)| reading(*p, *g)).collect(),
        page_count: 1,
    }
}

pub fn sheet(name: &str) -> SourceFile {
    SourceFile::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF]).unwrap()
}
