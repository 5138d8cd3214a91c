//! Multi-page batch merger
//!
//! Combines per-page extraction batches into one batch in page order:
//! - the first page with any header value supplies the project record
//! - readings are concatenated; rows repeated across page boundaries (same
//!   time and pressure) collapse to the copy with the higher mean gauge
//!   confidence, kept at the position of the first occurrence

use std::collections::HashMap;

use crate::models::ReadingRecord;
use crate::types::ExtractionBatch;

fn dedupe_key(reading: &ReadingRecord) -> Option<(String, u64)> {
    let time = reading.time.value.as_deref()?.trim().to_string();
    let pressure = reading.pressure.value?;
    Some((time, pressure.to_bits()))
}

/// Merge page batches into one
pub fn merge_pages(pages: Vec<ExtractionBatch>) -> ExtractionBatch {
    let mut merged = ExtractionBatch::default();
    let mut project_taken = false;
    let mut seen: HashMap<(String, u64), usize> = HashMap::new();
    let mut duplicates = 0usize;

    for page in pages {
        merged.page_count += page.page_count;

        if !project_taken && !page.project.is_blank() {
            merged.project = page.project;
            project_taken = true;
        }

        for reading in page.readings {
            let Some(key) = dedupe_key(&reading) else {
                merged.readings.push(reading);
                continue;
            };

            match seen.get(&key) {
                Some(&position) => {
                    duplicates += 1;
                    if reading.mean_gauge_confidence()
                        > merged.readings[position].mean_gauge_confidence()
                    {
                        merged.readings[position] = reading;
                    }
                }
                None => {
                    seen.insert(key, merged.readings.len());
                    merged.readings.push(reading);
                }
            }
        }
    }

    if duplicates > 0 {
        tracing::debug!(duplicates, readings = merged.readings.len(), "Collapsed duplicate readings");
    }

    merged
}
