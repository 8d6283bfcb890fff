use anyhow::{Context, Result};
use redline_core::{
    reviewed_file_name, BatchReport, InputDocument, JsonReport, ReviewConfig, ReviewProcessor,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Load the review tables. An explicit path that cannot be loaded or fails
/// validation is an error; without a path the built-in tables are used.
pub fn load_config(path: Option<&str>) -> redline_core::Result<ReviewConfig> {
    let config = match path {
        Some(p) => ReviewConfig::load_from_file(p)?,
        None => ReviewConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// An input path that could not be read
#[derive(Debug)]
pub struct UnreadableInput {
    pub path: PathBuf,
    pub error: String,
}

/// Read every input path. Unreadable files are collected, not fatal.
pub fn read_inputs(paths: &[PathBuf]) -> (Vec<InputDocument>, Vec<UnreadableInput>) {
    let mut inputs = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in paths {
        match InputDocument::from_path(path) {
            Ok(input) => inputs.push(input),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read input");
                unreadable.push(UnreadableInput {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    (inputs, unreadable)
}

/// Write `Reviewed_<name>` for every successfully reviewed document.
/// Returns the paths written, in batch order.
pub fn write_reviewed(batch: &BatchReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create output directory {}", output_dir.display()))?;

    let mut written = Vec::new();
    for document in &batch.documents {
        let Some(bytes) = &document.file else {
            continue;
        };
        let path = output_dir.join(reviewed_file_name(&document.name));
        fs::write(&path, bytes).with_context(|| format!("cannot write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "wrote reviewed document");
        written.push(path);
    }
    Ok(written)
}

pub struct RunOptions {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub report: Option<PathBuf>,
}

pub struct RunSummary {
    pub batch: BatchReport,
    pub written: Vec<PathBuf>,
    pub unreadable: Vec<UnreadableInput>,
}

/// Read, review and write one batch with an already constructed processor
pub fn run(processor: &ReviewProcessor, options: &RunOptions) -> Result<RunSummary> {
    let (inputs, unreadable) = read_inputs(&options.inputs);
    let batch = processor.review_batch(inputs);
    let written = write_reviewed(&batch, &options.output_dir)?;

    if let Some(report_path) = &options.report {
        JsonReport::new(&batch, &processor.config().requirements)
            .save(report_path)
            .with_context(|| format!("cannot write report {}", report_path.display()))?;
    }

    Ok(RunSummary {
        batch,
        written,
        unreadable,
    })
}
