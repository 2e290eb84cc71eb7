//! End-to-end run: template → discover → (text → parameters → derive → row)* → persist.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use simreport_dataset::Dataset;
use simreport_documents::{self as documents, DiscoveryOptions, TextExtractor};
use simreport_shared::{MissingInputPolicy, Result, RowDefaults, RunId};

use crate::derive;
use crate::extraction::ParameterSource;
use crate::row;

/// Configuration for one [`run`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Template whose header fixes column order; may already hold rows.
    pub template_path: PathBuf,
    /// Root directory searched recursively for reports.
    pub reports_dir: PathBuf,
    /// Where the accumulated dataset is written.
    pub output_path: PathBuf,
    pub discovery: DiscoveryOptions,
    pub missing_inputs: MissingInputPolicy,
    pub row_defaults: RowDefaults,
}

/// A report that produced no row.
#[derive(Debug, Clone)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a [`run`].
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub documents_found: usize,
    pub rows_appended: usize,
    /// Id given to the first appended row, if any.
    pub first_id: Option<u64>,
    pub skipped: Vec<SkippedDocument>,
    /// Rows in the written dataset, template rows included.
    pub total_rows: usize,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a report is processed (`current` is 1-based).
    fn document_started(&self, path: &Path, current: usize, total: usize);
    /// Called when a report is skipped after an error.
    fn document_skipped(&self, path: &Path, reason: &str);
    /// Called once the dataset has been written.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_started(&self, _path: &Path, _current: usize, _total: usize) {}
    fn document_skipped(&self, _path: &Path, _reason: &str) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Process every report under `config.reports_dir` into one dataset.
///
/// A template that cannot be loaded, or an output that cannot be written,
/// fails the whole run. Any error while handling a single report is logged,
/// recorded in [`RunSummary::skipped`], and the run moves on.
#[instrument(skip_all, fields(reports_dir = %config.reports_dir.display()))]
pub async fn run<E, S>(
    config: &RunConfig,
    extractor: &E,
    source: &S,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary>
where
    E: TextExtractor,
    S: ParameterSource,
{
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();

    info!(%run_id, template = %config.template_path.display(), "starting run");

    // --- Phase 1: Template ---
    progress.phase("Loading template");
    let mut dataset = Dataset::load(&config.template_path)?;

    // --- Phase 2: Discovery ---
    progress.phase("Discovering reports");
    let paths = documents::discover(&config.reports_dir, &config.discovery);
    if paths.is_empty() {
        warn!("no reports found");
    }
    info!(count = paths.len(), "discovered reports");

    // --- Phase 3: Extraction ---
    progress.phase("Extracting parameters");
    let mut first_id = None;
    let mut rows_appended = 0;
    let mut skipped = Vec::new();

    for (i, path) in paths.iter().enumerate() {
        progress.document_started(path, i + 1, paths.len());

        match process_document(path, &mut dataset, config, extractor, source).await {
            Ok(id) => {
                info!(path = %path.display(), id, "appended row");
                first_id.get_or_insert(id);
                rows_appended += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping report");
                let reason = e.to_string();
                progress.document_skipped(path, &reason);
                skipped.push(SkippedDocument {
                    path: path.clone(),
                    reason,
                });
            }
        }
    }

    // --- Phase 4: Persist ---
    progress.phase("Saving dataset");
    dataset.persist(&config.output_path)?;

    let summary = RunSummary {
        run_id,
        started_at,
        documents_found: paths.len(),
        rows_appended,
        first_id,
        skipped,
        total_rows: dataset.len(),
        output_path: config.output_path.clone(),
        elapsed: start.elapsed(),
    };

    info!(
        appended = summary.rows_appended,
        skipped = summary.skipped.len(),
        total_rows = summary.total_rows,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run complete"
    );

    progress.done(&summary);
    Ok(summary)
}

/// Text → parameters → derived set → row, appended under the next id.
async fn process_document<E, S>(
    path: &Path,
    dataset: &mut Dataset,
    config: &RunConfig,
    extractor: &E,
    source: &S,
) -> Result<u64>
where
    E: TextExtractor,
    S: ParameterSource,
{
    let text = extractor.extract(path)?;
    let params = source.extract(&text).await?;
    let derived = derive::derive_parameters(&params, config.missing_inputs);

    let id = dataset.next_id();
    dataset.append(row::build_row(&derived, id, &config.row_defaults));
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use simreport_documents::DocumentTextExtractor;
    use simreport_shared::schema::{
        APPLIED_FORCE, DEFORMATION_RANGE, ENTITY_ID_COLUMN, MAX_FAILURE_LOAD_COLUMN, STRAND_COUNT,
        WORK_DONE,
    };
    use simreport_shared::{FieldValue, ParameterSet, SimReportError};
    use url::Url;

    use crate::extraction::{ExtractionConfig, OpenRouterSource, apply_overrides};

    const TEMPLATE_HEADER: &str = "Bridge ID,Applied Force (N),Min/Max Deformation (m),Work Done (J),Max Failure Load (N),Bridge Type\n";

    /// Reads reports from disk but fails on any file whose stem contains "broken".
    struct FlakyExtractor;

    impl TextExtractor for FlakyExtractor {
        fn extract(&self, path: &Path) -> Result<String> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if stem.contains("broken") {
                return Err(SimReportError::Extraction("no text extracted".into()));
            }
            DocumentTextExtractor.extract(path)
        }
    }

    /// Returns the same parameters for every report.
    struct StaticSource;

    impl ParameterSource for StaticSource {
        async fn extract(&self, _report_text: &str) -> Result<ParameterSet> {
            let mut params: ParameterSet = [
                (APPLIED_FORCE, FieldValue::Number(-1703.0)),
                (
                    DEFORMATION_RANGE,
                    FieldValue::List(vec![0.0.into(), 0.00637.into()]),
                ),
            ]
            .into_iter()
            .collect();
            apply_overrides(&mut params);
            Ok(params)
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.events.lock().unwrap().push(format!("phase:{name}"));
        }
        fn document_started(&self, _path: &Path, current: usize, total: usize) {
            self.events.lock().unwrap().push(format!("start:{current}/{total}"));
        }
        fn document_skipped(&self, path: &Path, _reason: &str) {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.events.lock().unwrap().push(format!("skip:{name}"));
        }
        fn done(&self, summary: &RunSummary) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done:{}", summary.rows_appended));
        }
    }

    struct Workspace {
        _dir: tempfile::TempDir,
        config: RunConfig,
    }

    fn workspace(template: &str, reports: &[&str]) -> Workspace {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.csv");
        std::fs::write(&template_path, template).unwrap();

        let reports_dir = dir.path().join("reports");
        std::fs::create_dir_all(&reports_dir).unwrap();
        for name in reports {
            std::fs::write(reports_dir.join(name), "Force -1703 N\nTotal Deformation 0.00637 m").unwrap();
        }

        let config = RunConfig {
            template_path,
            reports_dir,
            output_path: dir.path().join("out.csv"),
            discovery: DiscoveryOptions {
                extensions: vec!["txt".into()],
            },
            missing_inputs: MissingInputPolicy::Zero,
            row_defaults: RowDefaults::default(),
        };

        Workspace { _dir: dir, config }
    }

    #[tokio::test]
    async fn failed_report_is_skipped_and_ids_stay_contiguous() {
        let ws = workspace(
            TEMPLATE_HEADER,
            &["a_report.txt", "b_broken.txt", "c_report.txt"],
        );
        let progress = RecordingProgress::default();

        let summary = run(&ws.config, &FlakyExtractor, &StaticSource, &progress)
            .await
            .unwrap();

        assert_eq!(summary.documents_found, 3);
        assert_eq!(summary.rows_appended, 2);
        assert_eq!(summary.first_id, Some(0));
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.skipped.len(), 1);
        assert!(summary.skipped[0].path.ends_with("b_broken.txt"));

        let out = Dataset::load(&ws.config.output_path).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.value(0, ENTITY_ID_COLUMN), Some(&FieldValue::Number(0.0)));
        assert_eq!(out.value(1, ENTITY_ID_COLUMN), Some(&FieldValue::Number(1.0)));
        assert_eq!(
            out.value(0, MAX_FAILURE_LOAD_COLUMN),
            Some(&FieldValue::Number(173.77551))
        );
        assert_eq!(out.value(0, STRAND_COUNT), Some(&FieldValue::Number(6.0)));
        assert_eq!(out.value(1, "Bridge Type"), Some(&FieldValue::from("Truss")));

        let events = progress.events.lock().unwrap();
        assert!(events.contains(&"start:2/3".to_string()));
        assert!(events.contains(&"skip:b_broken.txt".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("done:2"));
    }

    #[tokio::test]
    async fn existing_rows_are_kept_and_ids_continue() {
        let template = format!("{TEMPLATE_HEADER}4,-900,\"[0.0, 0.002]\",0.9,91.83673,Arch\n");
        let ws = workspace(&template, &["one.txt", "two.txt"]);

        let summary = run(&ws.config, &FlakyExtractor, &StaticSource, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(summary.first_id, Some(5));
        assert_eq!(summary.total_rows, 3);

        let out = Dataset::load(&ws.config.output_path).unwrap();
        assert_eq!(out.value(0, ENTITY_ID_COLUMN), Some(&FieldValue::Number(4.0)));
        assert_eq!(out.value(0, "Bridge Type"), Some(&FieldValue::from("Arch")));
        assert_eq!(
            out.value(0, DEFORMATION_RANGE),
            Some(&FieldValue::from("[0.0, 0.002]"))
        );
        assert_eq!(out.value(2, ENTITY_ID_COLUMN), Some(&FieldValue::Number(6.0)));
        assert_eq!(out.next_id(), 7);
    }

    #[tokio::test]
    async fn missing_template_fails_before_processing() {
        let mut ws = workspace(TEMPLATE_HEADER, &["one.txt"]);
        ws.config.template_path = ws.config.reports_dir.join("missing.csv");
        let progress = RecordingProgress::default();

        let err = run(&ws.config, &FlakyExtractor, &StaticSource, &progress)
            .await
            .unwrap_err();

        assert!(matches!(err, SimReportError::Load { .. }));
        assert!(!ws.config.output_path.exists());
        let events = progress.events.lock().unwrap();
        assert!(!events.iter().any(|e| e.starts_with("start:")));
    }

    #[tokio::test]
    async fn unwritable_output_is_save_error() {
        let mut ws = workspace(TEMPLATE_HEADER, &["one.txt"]);
        ws.config.output_path = ws.config.reports_dir.join("no/such/dir/out.csv");

        let err = run(&ws.config, &FlakyExtractor, &StaticSource, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SimReportError::Save { .. }));
    }

    #[tokio::test]
    async fn empty_reports_dir_still_writes_template() {
        let template = format!("{TEMPLATE_HEADER}0,-1703,\"[0.0, 0.00637]\",5.42406,173.77551,Truss\n");
        let ws = workspace(&template, &[]);

        let summary = run(&ws.config, &FlakyExtractor, &StaticSource, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(summary.documents_found, 0);
        assert_eq!(summary.first_id, None);

        let out = Dataset::load(&ws.config.output_path).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn run_against_openrouter_mock() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let reply = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content":
                "```json\n{\"Applied Force (N)\": -1703, \"Min/Max Deformation (m)\": \"[0.0, 0.00637]\", \"Strain Energy (J)\": 4.82}\n```"
            }}]
        });
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .expect(2)
            .mount(&server)
            .await;

        let source = OpenRouterSource::new(ExtractionConfig {
            base_url: Url::parse(&format!("{}/api/v1", server.uri())).unwrap(),
            api_key: "sk-test".into(),
            model_id: "test/model".into(),
            timeout_secs: 5,
            max_report_chars: 4_000,
        })
        .unwrap();

        let ws = workspace(TEMPLATE_HEADER, &["one.txt", "two.txt"]);
        let summary = run(&ws.config, &DocumentTextExtractor, &source, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(summary.rows_appended, 2);

        let out = Dataset::load(&ws.config.output_path).unwrap();
        let work = out.value(1, WORK_DONE).and_then(FieldValue::as_f64).unwrap();
        assert!((work - 5.424055).abs() < 1e-5);
        assert_eq!(out.value(1, "Number of Beams"), Some(&FieldValue::Number(2.0)));
    }
}
