//! Readers for the candidate files scrapers hand over (CSV or JSON).

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::info;

use deodar::models::GeoPoint;
use deodar::CandidateRecord;

/// Load one source's candidate records, dispatching on file extension.
pub fn load_candidates(path: &Path, source: &str) -> Result<Vec<CandidateRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let records = match ext.as_str() {
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => bail!("unsupported candidate file extension: {:?}", other),
    };

    info!("loaded {} candidates from {}", records.len(), path.display());

    Ok(records
        .into_iter()
        .map(|mut r| {
            if r.source_label.trim().is_empty() {
                r.source_label = source.to_string();
            }
            r
        })
        .collect())
}

fn load_json(path: &Path) -> Result<Vec<CandidateRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open candidate file: {}", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse candidate JSON: {}", path.display()))
}

fn load_csv(path: &Path) -> Result<Vec<CandidateRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open candidate file: {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let find = |names: &[&str]| -> Option<usize> {
        headers
            .iter()
            .position(|h| names.contains(&h.to_lowercase().trim()))
    };

    let name_idx = find(&["name", "facility_name"]).context("Column 'name' not found")?;
    let id_idx = find(&["id", "facility_id"]);
    let type_idx = find(&["type", "facility_type"]);
    let region_idx = find(&["region", "province", "region_text"]);
    let subdivision_idx = find(&["district", "subdivision", "subdivision_text"]);
    let address_idx = find(&["address", "location"]);
    let phone_idx = find(&["phone", "telephone", "contact"]);
    let lat_idx = find(&["latitude", "lat"]);
    let lon_idx = find(&["longitude", "lon", "lng"]);
    let website_idx = find(&["website", "url"]);

    let cell = |record: &csv::StringRecord, idx: Option<usize>| -> Option<String> {
        let value = idx.and_then(|i| record.get(i)).map(str::trim)?;
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    };

    let mut out = Vec::new();
    for result in reader.records() {
        let record = result?;

        // Malformed coordinates are treated as absent, never as an error;
        // a lone latitude or longitude is useless on its own.
        let lat = cell(&record, lat_idx).and_then(|v| v.parse::<f64>().ok());
        let lon = cell(&record, lon_idx).and_then(|v| v.parse::<f64>().ok());
        let position = match (lat, lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
            _ => None,
        };

        out.push(CandidateRecord {
            id: cell(&record, id_idx),
            name: cell(&record, Some(name_idx)).unwrap_or_default(),
            facility_type: cell(&record, type_idx).unwrap_or_default(),
            region_text: cell(&record, region_idx).unwrap_or_default(),
            subdivision_text: cell(&record, subdivision_idx),
            address: cell(&record, address_idx),
            phone: cell(&record, phone_idx),
            position,
            website: cell(&record, website_idx),
            source_label: String::new(),
            retrieved_at: None,
        });
    }

    Ok(out)
}
