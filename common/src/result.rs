use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::{
    error::LoadError,
    record::{MetricRecord, ResultTable},
};

/// Result file format version. Picked explicitly by the caller instead of
/// sniffing the document, and it also fixes how the concurrency level is
/// derived from the filename.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    /// Top-level numeric fields; the whole filename stem is the concurrency
    /// (`16.json` -> 16).
    #[default]
    Flat,
    /// Nested report with per-metric summaries; the concurrency is the digit
    /// characters of the stem, concatenated (`sweep_c8.json` -> 8).
    Nested,
}

/// The four metrics of one run, as stored by the flat shape. Both shapes
/// normalize to this before a [`MetricRecord`] is built.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlatMetrics {
    pub throughput: f64,
    pub ttft_ms: f64,
    pub itl_ms: f64,
    pub e2e_ms: f64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NestedReport {
    pub benchmarks: Vec<BenchmarkEntry>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub metrics: BenchmarkMetrics,
}

/// The metric families the report reads. The real documents carry more
/// siblings per mapping, which serde ignores.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub tokens_per_second: MetricSummary,
    pub time_to_first_token_ms: MetricSummary,
    pub inter_token_latency_ms: MetricSummary,
    pub request_latency: MetricSummary,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    pub successful: StatSummary,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StatSummary {
    pub mean: f64,
}

/// Enumerates the `.json` result files directly inside `dir`, sorted by
/// filename so the table's tie-break order is deterministic.
pub fn discover_results(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::Discovery(dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(LoadError::NoResults(dir.to_path_buf()));
    }
    Ok(files)
}

pub fn concurrency_from_path(path: &Path, shape: PayloadShape) -> Result<u32, LoadError> {
    let name = file_name(path);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LoadError::Concurrency {
            name: name.clone(),
            reason: "filename is not valid UTF-8".to_owned(),
        })?;

    let digits = match shape {
        PayloadShape::Flat => stem.to_owned(),
        PayloadShape::Nested => stem.chars().filter(char::is_ascii_digit).collect(),
    };
    let concurrency: u32 = digits.parse().map_err(|_| LoadError::Concurrency {
        name: name.clone(),
        reason: match shape {
            PayloadShape::Flat => format!("stem {stem:?} is not an integer"),
            PayloadShape::Nested => format!("no usable digits in stem {stem:?}"),
        },
    })?;
    if concurrency == 0 {
        return Err(LoadError::Concurrency {
            name,
            reason: "concurrency must be positive".to_owned(),
        });
    }
    Ok(concurrency)
}

/// Pulls the four metrics out of one result document.
pub fn extract_metrics(
    name: &str,
    data: &str,
    shape: PayloadShape,
) -> Result<FlatMetrics, LoadError> {
    match shape {
        PayloadShape::Flat => serde_json::from_str(data).map_err(|source| LoadError::Parse {
            name: name.to_owned(),
            source,
        }),
        PayloadShape::Nested => {
            let report: NestedReport =
                serde_json::from_str(data).map_err(|source| LoadError::Parse {
                    name: name.to_owned(),
                    source,
                })?;
            let entry = report
                .benchmarks
                .first()
                .ok_or_else(|| LoadError::MissingData {
                    name: name.to_owned(),
                    reason: "empty benchmarks list".to_owned(),
                })?;
            let metrics = &entry.metrics;
            Ok(FlatMetrics {
                throughput: metrics.tokens_per_second.successful.mean,
                ttft_ms: metrics.time_to_first_token_ms.successful.mean,
                itl_ms: metrics.inter_token_latency_ms.successful.mean,
                e2e_ms: metrics.request_latency.successful.mean,
            })
        }
    }
}

/// Reads every result file in `dir` and builds the ordered table. Any
/// unreadable or malformed file aborts the load.
pub fn load_results(dir: &Path, shape: PayloadShape) -> Result<ResultTable, LoadError> {
    let files = discover_results(dir)?;
    debug!("Found {} result files in {}", files.len(), dir.display());

    let mut records = Vec::with_capacity(files.len());
    for path in &files {
        let name = file_name(path);
        let concurrency = concurrency_from_path(path, shape)?;
        let data = fs::read_to_string(path).map_err(|source| LoadError::Io {
            name: name.clone(),
            source,
        })?;
        let metrics = extract_metrics(&name, &data, shape)?;
        debug!("{name}: concurrency {concurrency}");
        records.push(MetricRecord {
            concurrency,
            throughput: metrics.throughput,
            ttft_ms: metrics.ttft_ms,
            itl_ms: metrics.itl_ms,
            e2e_ms: metrics.e2e_ms,
        });
    }
    Ok(ResultTable::from_records(records))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
