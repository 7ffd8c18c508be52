use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::Config;
use crate::corpus::{CorpusEnumerator, CorpusFile};
use crate::extractor::{Driver, Extractor, ExtractorFailure, ProcessExtractor, Termination};
use crate::store::db::{ResultStore, StoreStats};

/// What happened over a whole run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub files: usize,
    pub functions: usize,
    pub failed: Vec<FailedFile>,
}

/// A file whose sweep ended in an extractor failure
#[derive(Debug, Clone, PartialEq)]
pub struct FailedFile {
    pub path: PathBuf,
    pub index: u32,
    pub extracted: u32,
    pub failure: ExtractorFailure,
}

/// Run one full sweep as described by `config`
pub async fn harvest(config: &Config) -> Result<()> {
    info!("Harvesting project {} from {}", config.project, config.dir.display());

    config.check_extractor()?;

    // Enumerate before touching the store so a bad root leaves the old store intact
    let files = CorpusEnumerator::from_config(config)
        .collect_files()
        .context("Failed to enumerate corpus")?;

    let store = ResultStore::initialize(&config.database).context("Failed to initialize store")?;
    let driver = Driver::new(ProcessExtractor::from_config(config));

    println!("funcsweep v{}", env!("CARGO_PKG_VERSION"));
    println!("Project: {}", config.project);
    println!("Corpus: {} ({} files)", config.dir.display(), files.len());
    println!("Extractor: {}", driver.extractor().program().display());
    println!("Database: {}", store.path().display());

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let summary = sweep_corpus(&config.project, &files, &driver, &store, &progress).await?;
    progress.finish_and_clear();

    let stats = store.stats()?;
    print_summary(&summary, &stats);

    Ok(())
}

/// Record every file, then sweep each one in order, streaming functions into the store
pub async fn sweep_corpus<E: Extractor>(
    project: &str,
    files: &[CorpusFile],
    driver: &Driver<E>,
    store: &ResultStore,
    progress: &ProgressBar,
) -> Result<RunSummary> {
    for (file_id, file) in files.iter().enumerate() {
        store
            .record_file(project, &file.display_path(), file_id as u32)
            .with_context(|| format!("Failed to record {}", file.path.display()))?;
    }

    let mut summary = RunSummary {
        files: files.len(),
        ..Default::default()
    };

    for (file_id, file) in files.iter().enumerate() {
        let file_id = file_id as u32;
        progress.set_message(file.display_path());

        let report = driver
            .sweep(&file.path, |result| {
                store.record_function(file_id, result.func_id, result.span, &result.src)
            })
            .await
            .with_context(|| format!("Failed to store functions of {}", file.path.display()))?;

        summary.functions += report.extracted as usize;

        match report.termination {
            Termination::Exhausted => {
                progress.suspend(|| {
                    println!("{}: OK ({} functions)", file.display_path(), report.extracted)
                });
            }
            Termination::Failed { index, failure } => {
                warn!(
                    "{}: something went wrong at function {} ({}), kept {} functions",
                    file.display_path(),
                    index,
                    failure,
                    report.extracted
                );
                progress.suspend(|| {
                    println!(
                        "{}: FAILED at function {} ({})",
                        file.display_path(),
                        index,
                        failure
                    )
                });
                summary.failed.push(FailedFile {
                    path: file.path.clone(),
                    index,
                    extracted: report.extracted,
                    failure,
                });
            }
        }

        progress.inc(1);
    }

    Ok(summary)
}

fn print_summary(summary: &RunSummary, stats: &StoreStats) {
    println!("\nSweep complete!");
    println!("Files: {}", stats.total_files);
    println!("Functions: {}", stats.total_functions);
    println!("Files with functions: {}", stats.files_with_functions);
    if stats.unknown_spans > 0 {
        println!("Functions without offsets: {}", stats.unknown_spans);
    }
    if !summary.failed.is_empty() {
        println!("Files with extractor failures: {}", summary.failed.len());
        for failed in &summary.failed {
            println!(
                "  - {} (index {}, {})",
                failed.path.display(),
                failed.index,
                failed.failure
            );
        }
    }
}
