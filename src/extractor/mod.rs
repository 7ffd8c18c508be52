// Function extraction driver

pub mod output;
pub mod process;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, SweepError};
use crate::store::LineSpan;

pub use process::ProcessExtractor;

/// Why an extractor invocation counts as a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractorFailure {
    /// Exited with a status other than 0 or 2
    Status(i32),
    /// Terminated by a signal
    Signal,
    /// Killed after exceeding the configured timeout
    TimedOut(Duration),
    /// Could not be started or waited on
    Launch(String),
}

impl fmt::Display for ExtractorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractorFailure::Status(code) => write!(f, "exit status {}", code),
            ExtractorFailure::Signal => write!(f, "terminated by signal"),
            ExtractorFailure::TimedOut(limit) => write!(f, "timed out after {:?}", limit),
            ExtractorFailure::Launch(reason) => write!(f, "could not run: {}", reason),
        }
    }
}

/// Classified result of one extractor invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractorOutcome {
    /// A function exists at this index. `span` is `None` when its offsets were unreadable.
    Success { span: Option<LineSpan>, src: String },
    /// No function at this index: the file is done
    Exhausted,
    /// Unexpected failure: the file's sweep stops here
    Error(ExtractorFailure),
}

/// Something that can pull the function at `index` out of a source file
#[allow(async_fn_in_trait)]
pub trait Extractor {
    async fn invoke(&self, path: &Path, index: u32) -> ExtractorOutcome;
}

/// One extracted function, numbered in extraction order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub func_id: u32,
    pub span: Option<LineSpan>,
    pub src: String,
}

/// How a file's sweep ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The extractor reported no further functions
    Exhausted,
    /// The extractor failed at `index`
    Failed { index: u32, failure: ExtractorFailure },
}

/// Per-file report returned to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub extracted: u32,
    pub termination: Termination,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Exhausted
    }
}

/// Collected results of one file's sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSweep {
    pub results: Vec<ExtractionResult>,
    pub report: SweepReport,
}

/// Drives an extractor over increasing function indices until it stops
pub struct Driver<E> {
    extractor: E,
}

impl<E: Extractor> Driver<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Sweep one file, handing every extracted function to `sink` as it arrives.
    ///
    /// Only errors from `sink` are returned; extractor failures end the sweep
    /// and show up in the report.
    pub async fn sweep<F>(&self, path: &Path, mut sink: F) -> Result<SweepReport>
    where
        F: FnMut(ExtractionResult) -> Result<()>,
    {
        let mut func_id: u32 = 0;

        loop {
            match self.extractor.invoke(path, func_id).await {
                ExtractorOutcome::Success { span, src } => {
                    debug!("{}: function {} extracted ({:?})", path.display(), func_id, span);
                    sink(ExtractionResult { func_id, span, src })?;
                    func_id += 1;
                }
                ExtractorOutcome::Exhausted => {
                    debug!("{}: exhausted after {} functions", path.display(), func_id);
                    return Ok(SweepReport {
                        extracted: func_id,
                        termination: Termination::Exhausted,
                    });
                }
                ExtractorOutcome::Error(failure) => {
                    let err = SweepError::Extractor {
                        path: path.to_path_buf(),
                        index: func_id,
                        failure: failure.clone(),
                    };
                    debug!("{}", err);
                    return Ok(SweepReport {
                        extracted: func_id,
                        termination: Termination::Failed {
                            index: func_id,
                            failure,
                        },
                    });
                }
            }
        }
    }

    /// Sweep one file and collect every result
    pub async fn drive_file(&self, path: &Path) -> Result<FileSweep> {
        let mut results = Vec::new();
        let report = self
            .sweep(path, |result| {
                results.push(result);
                Ok(())
            })
            .await?;

        Ok(FileSweep { results, report })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub(crate) fn success(start: u32, end: u32, src: &str) -> ExtractorOutcome {
        ExtractorOutcome::Success {
            span: Some(LineSpan::new(start, end)),
            src: src.to_string(),
        }
    }

    /// Replays a fixed outcome list per file name; anything past the end is Exhausted
    #[derive(Default)]
    pub(crate) struct ScriptedExtractor {
        scripts: HashMap<String, Vec<ExtractorOutcome>>,
        calls: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedExtractor {
        pub(crate) fn with_file(mut self, name: &str, script: Vec<ExtractorOutcome>) -> Self {
            self.scripts.insert(name.to_string(), script);
            self
        }

        pub(crate) fn calls(&self) -> Vec<(String, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Extractor for ScriptedExtractor {
        async fn invoke(&self, path: &Path, index: u32) -> ExtractorOutcome {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.calls.lock().unwrap().push((name.clone(), index));

            self.scripts
                .get(&name)
                .and_then(|script| script.get(index as usize))
                .cloned()
                .unwrap_or(ExtractorOutcome::Exhausted)
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    fn script_of(k: u32) -> Vec<ExtractorOutcome> {
        (0..k)
            .map(|i| success(i * 10 + 1, i * 10 + 5, &format!("void f{}(void) {{}}\n", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_sweep_until_exhausted() {
        let extractor = ScriptedExtractor::default().with_file(
            "a.c",
            vec![success(1, 3, "int a;\n"), success(5, 9, "int b;\n")],
        );
        let driver = Driver::new(extractor);

        let sweep = driver.drive_file(Path::new("/corpus/a.c")).await.unwrap();

        assert_eq!(sweep.report.extracted, 2);
        assert!(sweep.report.is_complete());
        assert_eq!(
            sweep.results,
            vec![
                ExtractionResult {
                    func_id: 0,
                    span: Some(LineSpan::new(1, 3)),
                    src: "int a;\n".to_string()
                },
                ExtractionResult {
                    func_id: 1,
                    span: Some(LineSpan::new(5, 9)),
                    src: "int b;\n".to_string()
                },
            ]
        );
        assert_eq!(
            driver.extractor().calls(),
            vec![
                ("a.c".to_string(), 0),
                ("a.c".to_string(), 1),
                ("a.c".to_string(), 2)
            ]
        );
    }

    #[tokio::test]
    async fn test_immediately_exhausted() {
        let driver = Driver::new(ScriptedExtractor::default());

        let sweep = driver.drive_file(Path::new("empty.c")).await.unwrap();

        assert!(sweep.results.is_empty());
        assert_eq!(
            sweep.report,
            SweepReport {
                extracted: 0,
                termination: Termination::Exhausted
            }
        );
        assert_eq!(driver.extractor().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_crash_on_first_invocation() {
        let extractor = ScriptedExtractor::default().with_file(
            "bad.c",
            vec![ExtractorOutcome::Error(ExtractorFailure::Status(1))],
        );
        let driver = Driver::new(extractor);

        let sweep = driver.drive_file(Path::new("bad.c")).await.unwrap();

        assert!(sweep.results.is_empty());
        assert_eq!(
            sweep.report.termination,
            Termination::Failed {
                index: 0,
                failure: ExtractorFailure::Status(1)
            }
        );
        assert!(!sweep.report.is_complete());
    }

    #[tokio::test]
    async fn test_unknown_span_passes_through() {
        let extractor = ScriptedExtractor::default().with_file(
            "m.c",
            vec![ExtractorOutcome::Success {
                span: None,
                src: "?? ??\nint m;\n".to_string(),
            }],
        );
        let driver = Driver::new(extractor);

        let sweep = driver.drive_file(Path::new("m.c")).await.unwrap();

        assert_eq!(sweep.results.len(), 1);
        assert_eq!(sweep.results[0].span, None);
        assert_eq!(sweep.results[0].src, "?? ??\nint m;\n");
    }

    #[tokio::test]
    async fn test_sink_error_stops_sweep() {
        let extractor = ScriptedExtractor::default().with_file("a.c", script_of(5));
        let driver = Driver::new(extractor);

        let mut seen = 0;
        let result = driver
            .sweep(Path::new("a.c"), |r| {
                seen += 1;
                if r.func_id == 1 {
                    Err(SweepError::Store(rusqlite::Error::InvalidQuery))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(SweepError::Store(_))));
        assert_eq!(seen, 2);
        assert_eq!(driver.extractor().calls().len(), 2);
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(ExtractorFailure::Status(139).to_string(), "exit status 139");
        assert_eq!(ExtractorFailure::Signal.to_string(), "terminated by signal");
        assert_eq!(
            ExtractorFailure::TimedOut(Duration::from_secs(3)).to_string(),
            "timed out after 3s"
        );
    }

    proptest! {
        #[test]
        fn k_functions_need_k_plus_one_invocations(k in 0u32..48) {
            let extractor = ScriptedExtractor::default().with_file("f.c", script_of(k));
            let driver = Driver::new(extractor);

            let sweep = runtime().block_on(driver.drive_file(Path::new("f.c"))).unwrap();

            let ids: Vec<u32> = sweep.results.iter().map(|r| r.func_id).collect();
            prop_assert_eq!(ids, (0..k).collect::<Vec<_>>());
            prop_assert_eq!(sweep.report.extracted, k);
            prop_assert!(sweep.report.is_complete());

            let indices: Vec<u32> = driver.extractor().calls().into_iter().map(|(_, i)| i).collect();
            prop_assert_eq!(indices, (0..=k).collect::<Vec<_>>());
        }

        #[test]
        fn error_at_j_stops_after_j(k in 0u32..32, j in 0u32..32, code in 3i32..255) {
            let j = j.min(k);
            let mut script = script_of(k);
            script.truncate(j as usize);
            script.push(ExtractorOutcome::Error(ExtractorFailure::Status(code)));

            let extractor = ScriptedExtractor::default().with_file("f.c", script);
            let driver = Driver::new(extractor);

            let sweep = runtime().block_on(driver.drive_file(Path::new("f.c"))).unwrap();

            prop_assert_eq!(sweep.results.len() as u32, j);
            prop_assert_eq!(
                sweep.report.termination,
                Termination::Failed { index: j, failure: ExtractorFailure::Status(code) }
            );

            let calls = driver.extractor().calls();
            prop_assert_eq!(calls.len() as u32, j + 1);
            prop_assert!(calls.iter().all(|(_, i)| *i <= j));
        }

        #[test]
        fn sweeps_are_deterministic(k in 0u32..24) {
            let first = Driver::new(ScriptedExtractor::default().with_file("f.c", script_of(k)));
            let second = Driver::new(ScriptedExtractor::default().with_file("f.c", script_of(k)));

            let rt = runtime();
            let a = rt.block_on(first.drive_file(Path::new("f.c"))).unwrap();
            let b = rt.block_on(second.drive_file(Path::new("f.c"))).unwrap();

            prop_assert_eq!(a, b);
        }
    }
}
