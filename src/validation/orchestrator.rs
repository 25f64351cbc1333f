//! Runs many IFC files against many IDS documents.
//!
//! Small batches run on the calling thread. Several small files are validated
//! concurrently on a worker pool; any large file switches to one file at a
//! time, with the specifications of big models fanned out to the pool.

use super::engine::{applicable_entities, validate_applicable};
use super::facet::FacetMatcher;
use crate::config::ValidatorConfig;
use crate::error::ParseError;
use crate::model::{Entity, IdsDocument, IdsResult, IfcResult, SpecificationResult, ValidationReport};
use crate::parser::parse_chunked;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

/// How long a freshly built pool has to answer the PING task.
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// An IFC file already read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfcSource {
    pub name: String,
    pub content: String,
}

impl IfcSource {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref).map_err(|source| ParseError::FileRead {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Ok(Self::new(file_name(path_ref), content))
    }

    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }
}

/// A parsed IDS document and the name it is reported under.
#[derive(Debug, Clone, PartialEq)]
pub struct IdsSource {
    pub name: String,
    pub document: IdsDocument,
}

impl IdsSource {
    #[must_use]
    pub fn new(name: impl Into<String>, document: IdsDocument) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy())
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One small file, validated on the calling thread.
    Single,
    /// Several files, all below the size threshold, validated concurrently.
    ParallelSmallFiles,
    /// At least one file at or above the threshold; files run one at a time.
    SequentialLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Starting,
    Validating,
    Complete,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ValidationEvent {
    Started {
        strategy: Strategy,
        files: usize,
    },
    Progress {
        file: String,
        file_percent: f64,
        overall_percent: f64,
    },
    /// Fired exactly once per run, also after an abort.
    Complete { report: ValidationReport },
}

/// Cancels a running validation from any thread.
///
/// Aborting drops the orchestrator's worker pool and sets a flag that is
/// checked between files and between specifications.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    aborted: Arc<AtomicBool>,
    pool: Arc<Mutex<Option<Arc<ThreadPool>>>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        if !self.aborted.swap(true, Ordering::SeqCst) {
            tracing::info!("validation abort requested");
        }
        self.teardown();
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.aborted.store(false, Ordering::SeqCst);
    }

    fn pool(&self) -> Option<Arc<ThreadPool>> {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn install(&self, pool: ThreadPool) {
        *self.pool.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(pool));
    }

    fn teardown(&self) {
        if let Some(pool) = self.pool.lock().unwrap_or_else(PoisonError::into_inner).take() {
            tracing::debug!(threads = pool.current_num_threads(), "worker pool torn down");
        }
    }
}

/// Builds a pool and checks it answers a PING before handing it out.
/// `Some(0)` threads disables the pool.
fn start_pool(threads: Option<usize>) -> Option<ThreadPool> {
    if threads == Some(0) {
        tracing::info!("worker pool disabled, validating synchronously");
        return None;
    }
    let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("ids-validate-{i}"));
    if let Some(threads) = threads {
        builder = builder.num_threads(threads);
    }
    let pool = match builder.build() {
        Ok(pool) => pool,
        Err(err) => {
            tracing::warn!(%err, "worker pool unavailable, validating synchronously");
            return None;
        }
    };

    if ping(&pool, PING_TIMEOUT) {
        tracing::debug!(threads = pool.current_num_threads(), "worker pool ready");
        Some(pool)
    } else {
        None
    }
}

fn ping(pool: &ThreadPool, timeout: Duration) -> bool {
    let (tx, rx) = mpsc::channel();
    pool.spawn(move || {
        let _ = tx.send("PONG");
    });
    match rx.recv_timeout(timeout) {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(%err, "worker pool did not answer PING, validating synchronously");
            false
        }
    }
}

/// Coordinates one validation run at a time.
///
/// # Example
///
/// ```no_run
/// use ids_inspector::config::ValidatorConfig;
/// use ids_inspector::ids::parse_ids_file;
/// use ids_inspector::validation::{IdsSource, IfcSource, Orchestrator};
///
/// let ifc = IfcSource::from_path("model.ifc")?;
/// let ids = IdsSource::new("rules.ids", parse_ids_file("rules.ids")?);
/// let mut orchestrator = Orchestrator::new(ValidatorConfig::default());
/// let report = orchestrator.validate(&[ifc], &[ids], |_| {});
/// println!("{} failed", report.summary().failed);
/// # Ok::<(), ids_inspector::error::ParseError>(())
/// ```
#[derive(Debug)]
pub struct Orchestrator {
    config: ValidatorConfig,
    state: OrchestratorState,
    abort: AbortHandle,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.abort.teardown();
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            state: OrchestratorState::Idle,
            abort: AbortHandle::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// A handle that can abort the current run from another thread.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    #[must_use]
    pub fn choose_strategy(&self, files: &[IfcSource]) -> Strategy {
        let threshold = self.config.large_file_threshold_bytes;
        if files.iter().any(|f| f.size_bytes() >= threshold) {
            Strategy::SequentialLarge
        } else if files.len() > 1 {
            Strategy::ParallelSmallFiles
        } else {
            Strategy::Single
        }
    }

    /// Validates every IFC file against every IDS document.
    ///
    /// `observer` receives `Started`, then `Progress` after each parsed file
    /// and each validated specification, then exactly one `Complete`. It may
    /// be called from worker threads.
    pub fn validate<F>(
        &mut self,
        ifc_files: &[IfcSource],
        ids_files: &[IdsSource],
        observer: F,
    ) -> ValidationReport
    where
        F: Fn(&ValidationEvent) + Sync,
    {
        self.abort.reset();
        self.state = OrchestratorState::Starting;

        let strategy = self.choose_strategy(ifc_files);
        tracing::info!(
            ?strategy,
            ifc_files = ifc_files.len(),
            ids_files = ids_files.len(),
            "validation started"
        );
        observer(&ValidationEvent::Started {
            strategy,
            files: ifc_files.len(),
        });
        self.state = OrchestratorState::Validating;

        let specs_per_file: usize = ids_files.iter().map(|ids| ids.document.specifications.len()).sum();
        let run = Run {
            config: &self.config,
            matcher: FacetMatcher::new(self.config.strict_structural_requirements),
            abort: &self.abort,
            ids_files,
            progress: ProgressTracker {
                files: ifc_files,
                // One unit for the parse plus one per specification
                units_per_file: 1 + specs_per_file,
                percents: Mutex::new(vec![0.0; ifc_files.len()]),
                observer: &observer,
            },
            pool_ready: OnceLock::new(),
        };

        let per_file: Vec<Option<Vec<IfcResult>>> = match strategy {
            Strategy::ParallelSmallFiles => match run.pool() {
                Some(pool) => pool.install(|| {
                    ifc_files
                        .par_iter()
                        .enumerate()
                        .map(|(i, source)| run.process_file(i, source, false))
                        .collect()
                }),
                None => run.process_sequentially(ifc_files),
            },
            Strategy::Single | Strategy::SequentialLarge => run.process_sequentially(ifc_files),
        };
        drop(run);

        let aborted = self.abort.is_aborted();
        let mut report = ValidationReport {
            ids_results: ids_files
                .iter()
                .map(|ids| IdsResult {
                    ids_name: ids.name.clone(),
                    ifc_results: Vec::new(),
                })
                .collect(),
            aborted,
        };
        for file_results in per_file.into_iter().flatten() {
            for (ids_result, ifc_result) in report.ids_results.iter_mut().zip(file_results) {
                ids_result.ifc_results.push(ifc_result);
            }
        }

        self.state = if aborted {
            OrchestratorState::Aborted
        } else {
            OrchestratorState::Complete
        };
        let summary = report.summary();
        tracing::info!(
            aborted,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            "validation finished"
        );
        observer(&ValidationEvent::Complete {
            report: report.clone(),
        });
        report
    }
}

struct ProgressTracker<'a, F> {
    files: &'a [IfcSource],
    units_per_file: usize,
    percents: Mutex<Vec<f64>>,
    observer: &'a F,
}

impl<F: Fn(&ValidationEvent) + Sync> ProgressTracker<'_, F> {
    fn advance(&self, file: usize, units_done: usize) {
        let file_percent = (units_done as f64 / self.units_per_file as f64 * 100.0).min(100.0);
        let overall_percent = {
            let mut percents = self.percents.lock().unwrap_or_else(PoisonError::into_inner);
            percents[file] = file_percent;
            percents.iter().sum::<f64>() / percents.len() as f64
        };
        (self.observer)(&ValidationEvent::Progress {
            file: self.files[file].name.clone(),
            file_percent,
            overall_percent,
        });
    }
}

/// State shared by every file of one `validate` call.
struct Run<'a, F> {
    config: &'a ValidatorConfig,
    matcher: FacetMatcher,
    abort: &'a AbortHandle,
    ids_files: &'a [IdsSource],
    progress: ProgressTracker<'a, F>,
    pool_ready: OnceLock<bool>,
}

impl<F: Fn(&ValidationEvent) + Sync> Run<'_, F> {
    /// The worker pool, started and probed on first use. `None` after an
    /// abort or when the pool failed its PING.
    fn pool(&self) -> Option<Arc<ThreadPool>> {
        if self.abort.is_aborted() {
            return None;
        }
        let ready = *self.pool_ready.get_or_init(|| {
            if self.abort.pool().is_some() {
                return true;
            }
            match start_pool(self.config.worker_threads) {
                Some(pool) => {
                    self.abort.install(pool);
                    true
                }
                None => false,
            }
        });
        if ready {
            self.abort.pool()
        } else {
            None
        }
    }

    fn process_sequentially(&self, files: &[IfcSource]) -> Vec<Option<Vec<IfcResult>>> {
        let mut results = Vec::with_capacity(files.len());
        for (i, source) in files.iter().enumerate() {
            if self.abort.is_aborted() {
                break;
            }
            results.push(self.process_file(i, source, true));
        }
        results
    }

    /// Parses one file and validates it against every IDS. `None` when the
    /// run was aborted before the parse finished.
    fn process_file(&self, index: usize, source: &IfcSource, delegate: bool) -> Option<Vec<IfcResult>> {
        if self.abort.is_aborted() {
            return None;
        }
        let model = parse_chunked(&source.content, &source.name, self.config.parse_chunk_lines, |_| {
            if self.abort.is_aborted() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;

        let entities = Arc::new(model.entities);
        let mut units_done = 1;
        self.progress.advance(index, units_done);

        let mut results = Vec::with_capacity(self.ids_files.len());
        for ids in self.ids_files {
            if self.abort.is_aborted() {
                break;
            }
            let spec_results = self.validate_document(index, &entities, &ids.document, delegate, &mut units_done);
            results.push(IfcResult {
                file_name: source.name.clone(),
                entity_count: entities.len(),
                specification_results: spec_results.into_iter().flatten().collect(),
            });
        }
        Some(results)
    }

    /// Validates every specification of `document`.
    ///
    /// A specification goes to the pool when more than
    /// `worker_entity_threshold` entities pass its applicability; the rest run
    /// inline. Pool results are slotted back by index so completion order
    /// does not matter.
    fn validate_document(
        &self,
        index: usize,
        entities: &Arc<Vec<Entity>>,
        document: &IdsDocument,
        delegate: bool,
        units_done: &mut usize,
    ) -> Vec<Option<SpecificationResult>> {
        let mut slots: Vec<Option<SpecificationResult>> = vec![None; document.specifications.len()];
        let (tx, rx) = mpsc::channel();

        for (i, spec) in document.specifications.iter().enumerate() {
            if self.abort.is_aborted() {
                break;
            }
            let applicable = applicable_entities(entities, spec, &self.matcher);
            let pool = if delegate && applicable.len() > self.config.worker_entity_threshold {
                self.pool()
            } else {
                None
            };

            match pool {
                Some(pool) => {
                    tracing::debug!(
                        specification = %spec.name,
                        applicable = applicable.len(),
                        "delegating specification to worker pool"
                    );
                    let tx = tx.clone();
                    let entities = Arc::clone(entities);
                    let spec = spec.clone();
                    let matcher = self.matcher;
                    let aborted = Arc::clone(&self.abort.aborted);
                    pool.spawn(move || {
                        if aborted.load(Ordering::SeqCst) {
                            return;
                        }
                        let result = validate_applicable(&entities, &applicable, &spec, &matcher);
                        // The receiver is gone if the run was aborted
                        let _ = tx.send((i, result));
                    });
                }
                None => {
                    slots[i] = validate_applicable(entities, &applicable, spec, &self.matcher);
                    *units_done += 1;
                    self.progress.advance(index, *units_done);
                    std::thread::yield_now();
                }
            }
        }
        drop(tx);

        for (i, result) in rx {
            slots[i] = result;
            *units_done += 1;
            self.progress.advance(index, *units_done);
            if self.abort.is_aborted() {
                break;
            }
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Facet, Specification, Status, Value};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    fn ids() -> IdsSource {
        let mut spec = Specification::new("Walls", "IFC4");
        spec.applicability.push(Facet::entity(Value::simple("IFCWALL")));
        spec.requirements.push(Facet::property(
            Value::simple("Pset_WallCommon"),
            Value::simple("FireRating"),
            None,
        ));
        let mut doors = Specification::new("Doors", "IFC4");
        doors.applicability.push(Facet::entity(Value::simple("IFCDOOR")));
        IdsSource::new(
            "rules.ids",
            IdsDocument {
                specifications: vec![spec, doors],
                ..IdsDocument::default()
            },
        )
    }

    fn wall_specs(names: &[&str]) -> IdsSource {
        let specifications = names
            .iter()
            .map(|name| {
                let mut spec = Specification::new(*name, "IFC4");
                spec.applicability.push(Facet::entity(Value::simple("IFCWALL")));
                spec.requirements.push(Facet::attribute(Value::simple("Name"), None));
                spec
            })
            .collect();
        IdsSource::new(
            "walls.ids",
            IdsDocument {
                specifications,
                ..IdsDocument::default()
            },
        )
    }

    fn spec_names(report: &ValidationReport) -> Vec<String> {
        report.ids_results[0]
            .ifc_results
            .iter()
            .flat_map(|ifc| ifc.specification_results.iter().map(|s| s.specification.clone()))
            .collect()
    }

    fn ifc(name: &str, walls: usize) -> IfcSource {
        let content: String = (0..walls)
            .map(|i| format!("#{}=IFCWALL('{name}-{i}',$,'Wall {i}',$,$,$,$,$,$);\n", i + 1))
            .collect();
        IfcSource::new(name, content)
    }

    #[test]
    fn strategy_selection() {
        let config = ValidatorConfig {
            large_file_threshold_bytes: 100,
            ..ValidatorConfig::default()
        };
        let orchestrator = Orchestrator::new(config);
        assert_eq!(orchestrator.choose_strategy(&[ifc("a", 1)]), Strategy::Single);
        assert_eq!(
            orchestrator.choose_strategy(&[ifc("a", 1), ifc("b", 1)]),
            Strategy::ParallelSmallFiles
        );
        assert_eq!(
            orchestrator.choose_strategy(&[ifc("a", 1), ifc("big", 10)]),
            Strategy::SequentialLarge
        );
    }

    #[test]
    fn emits_started_progress_and_one_complete() {
        let events = Mutex::new(Vec::new());
        let mut orchestrator = Orchestrator::default();
        let report = orchestrator.validate(&[ifc("a.ifc", 2)], &[ids()], |e| {
            events.lock().unwrap().push(e.clone());
        });

        let events = events.into_inner().unwrap();
        assert!(matches!(events.first(), Some(ValidationEvent::Started { strategy: Strategy::Single, files: 1 })));
        assert!(matches!(events.last(), Some(ValidationEvent::Complete { .. })));
        let percents: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                ValidationEvent::Progress { overall_percent, .. } => Some(*overall_percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents.len(), 3);
        assert!((percents[2] - 100.0).abs() < 1e-9);

        assert_eq!(orchestrator.state(), OrchestratorState::Complete);
        let specs = &report.ids_results[0].ifc_results[0].specification_results;
        assert_eq!(specs.len(), 1, "Doors has no applicable entities");
        assert_eq!(specs[0].status, Status::Fail);
    }

    #[test]
    fn delegated_results_match_inline_results() {
        let files = [ifc("a.ifc", 5)];
        let inline = Orchestrator::default().validate(&files, &[ids()], |_| {});

        let mut delegated = Orchestrator::new(ValidatorConfig {
            worker_entity_threshold: 0,
            worker_threads: Some(2),
            ..ValidatorConfig::default()
        });
        assert_eq!(delegated.validate(&files, &[ids()], |_| {}), inline);
    }

    #[test]
    fn abort_still_completes_once() {
        let mut orchestrator = Orchestrator::default();
        let handle = orchestrator.abort_handle();
        let completes = AtomicUsize::new(0);
        let files: Vec<IfcSource> = (0..4).map(|i| ifc(&format!("f{i}.ifc"), 3)).collect();
        let config = ValidatorConfig {
            // Force one file at a time so the abort lands between files
            large_file_threshold_bytes: 1,
            ..ValidatorConfig::default()
        };
        orchestrator.config = config;

        let report = orchestrator.validate(&files, &[ids()], |e| match e {
            ValidationEvent::Progress { .. } => handle.abort(),
            ValidationEvent::Complete { .. } => {
                completes.fetch_add(1, Ordering::SeqCst);
            }
            ValidationEvent::Started { .. } => {}
        });

        assert!(report.aborted);
        assert_eq!(completes.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.state(), OrchestratorState::Aborted);
        assert!(report.ids_results[0].ifc_results.is_empty());
    }

    #[test]
    fn abort_between_inline_specifications_keeps_finished_ones() {
        let mut orchestrator = Orchestrator::default();
        let handle = orchestrator.abort_handle();
        let progress = AtomicUsize::new(0);
        let completes = AtomicUsize::new(0);

        let report = orchestrator.validate(&[ifc("a.ifc", 2)], &[wall_specs(&["First", "Second", "Third"])], |e| {
            match e {
                // Parse, then the first specification
                ValidationEvent::Progress { .. } if progress.fetch_add(1, Ordering::SeqCst) == 1 => handle.abort(),
                ValidationEvent::Complete { .. } => {
                    completes.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
        });

        assert!(report.aborted);
        assert_eq!(orchestrator.state(), OrchestratorState::Aborted);
        assert_eq!(completes.load(Ordering::SeqCst), 1);
        assert_eq!(progress.load(Ordering::SeqCst), 2);
        assert_eq!(report.ids_results[0].ifc_results.len(), 1);
        assert_eq!(spec_names(&report), ["First"]);
    }

    #[test]
    fn abort_during_pool_delegation_tears_down_pool() {
        let mut orchestrator = Orchestrator::new(ValidatorConfig {
            worker_entity_threshold: 0,
            worker_threads: Some(2),
            ..ValidatorConfig::default()
        });
        let handle = orchestrator.abort_handle();
        let progress = AtomicUsize::new(0);
        let completes = AtomicUsize::new(0);
        let pool_was_running = AtomicBool::new(false);

        let report = orchestrator.validate(&[ifc("a.ifc", 3)], &[wall_specs(&["First", "Second", "Third"])], |e| {
            match e {
                ValidationEvent::Progress { .. } if progress.fetch_add(1, Ordering::SeqCst) == 1 => {
                    pool_was_running.store(handle.pool().is_some(), Ordering::SeqCst);
                    handle.abort();
                }
                ValidationEvent::Complete { .. } => {
                    completes.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
        });

        assert!(pool_was_running.load(Ordering::SeqCst));
        assert!(handle.pool().is_none());
        assert!(report.aborted);
        assert_eq!(completes.load(Ordering::SeqCst), 1);
        // Only the first result back from the pool is kept
        let names = spec_names(&report);
        assert_eq!(names.len(), 1);
        assert!(["First", "Second", "Third"].contains(&names[0].as_str()));
    }

    #[test]
    fn disabled_pool_falls_back_to_inline_validation() {
        let files = [ifc("a.ifc", 5)];
        let inline = Orchestrator::default().validate(&files, &[ids()], |_| {});

        let mut orchestrator = Orchestrator::new(ValidatorConfig {
            worker_entity_threshold: 0,
            worker_threads: Some(0),
            ..ValidatorConfig::default()
        });
        let report = orchestrator.validate(&files, &[ids()], |_| {});
        assert_eq!(report, inline);
        assert_eq!(orchestrator.state(), OrchestratorState::Complete);
        assert!(orchestrator.abort_handle().pool().is_none());
    }

    #[test]
    fn busy_pool_fails_ping() {
        let pool = ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let (release, blocked) = mpsc::channel::<()>();
        pool.spawn(move || {
            let _ = blocked.recv();
        });
        assert!(!ping(&pool, Duration::from_millis(50)));

        drop(release);
        assert!(ping(&pool, PING_TIMEOUT));
    }

    #[test]
    fn delegation_counts_applicable_entities() {
        let mut content: String = (1..=10)
            .map(|i| format!("#{i}=IFCSLAB('S{i}',$,'Slab',$,$,$,$,$,$);\n"))
            .collect();
        content.push_str("#11=IFCWALL('W1',$,'Wall',$,$,$,$,$,$);\n#12=IFCWALL('W2',$,'Wall',$,$,$,$,$,$);\n");
        let files = [IfcSource::new("mixed.ifc", content)];

        let mut below = Orchestrator::new(ValidatorConfig {
            worker_entity_threshold: 5,
            worker_threads: Some(2),
            ..ValidatorConfig::default()
        });
        let inline = below.validate(&files, &[ids()], |_| {});
        assert!(below.abort_handle().pool().is_none(), "2 applicable walls stay inline");

        let mut above = Orchestrator::new(ValidatorConfig {
            worker_entity_threshold: 1,
            worker_threads: Some(2),
            ..ValidatorConfig::default()
        });
        assert_eq!(above.validate(&files, &[ids()], |_| {}), inline);
        assert!(above.abort_handle().pool().is_some());
    }

    #[test]
    fn overall_percent_is_mean_of_file_percents() {
        let mut orchestrator = Orchestrator::new(ValidatorConfig {
            large_file_threshold_bytes: 1,
            ..ValidatorConfig::default()
        });
        let events = Mutex::new(Vec::new());
        orchestrator.validate(&[ifc("a.ifc", 2), ifc("b.ifc", 2)], &[ids()], |e| {
            if let ValidationEvent::Progress {
                file,
                file_percent,
                overall_percent,
            } = e
            {
                events.lock().unwrap().push((file.clone(), *file_percent, *overall_percent));
            }
        });

        // Three units per file: the parse and two specifications
        let third = 100.0 / 3.0;
        let expected = [
            ("a.ifc", third, third / 2.0),
            ("a.ifc", 2.0 * third, third),
            ("a.ifc", 100.0, 50.0),
            ("b.ifc", third, 50.0 + third / 2.0),
            ("b.ifc", 2.0 * third, 50.0 + third),
            ("b.ifc", 100.0, 100.0),
        ];
        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), expected.len());
        for ((file, file_percent, overall), (want_file, want_file_percent, want_overall)) in events.iter().zip(expected) {
            assert_eq!(file, want_file);
            assert!((file_percent - want_file_percent).abs() < 1e-9, "{file_percent} != {want_file_percent}");
            assert!((overall - want_overall).abs() < 1e-9, "{overall} != {want_overall}");
        }
    }
}
