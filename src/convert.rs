use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use epub::doc::{EpubDoc, NavPoint};

use crate::assemble::{self, Section};
use crate::book;
use crate::cli::{Cli, PageSize};
use crate::error::ConversionError;
use crate::{extract, render, style};

/// Immutable settings for one run, built once from CLI input.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    pub page_size: PageSize,
    pub margins: u32,
    pub font_size: u32,
    pub include_toc: bool,
    pub output: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl ConversionOptions {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        if cli.output.is_some() && cli.inputs.len() > 1 {
            anyhow::bail!("--output cannot be used with multiple inputs; use --output-dir");
        }

        Ok(Self {
            page_size: cli.page_size,
            margins: cli.margins,
            font_size: cli.font_size,
            include_toc: !cli.no_toc,
            output: cli.output.clone(),
            output_dir: cli.output_dir.clone(),
        })
    }

    /// Explicit `-o` wins, then `--output-dir` with a derived filename, then
    /// the input path with a `.pdf` extension.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        if let Some(dir) = &self.output_dir {
            let mut name = input
                .file_stem()
                .map(|stem| stem.to_os_string())
                .unwrap_or_else(|| "book".into());
            name.push(".pdf");
            return dir.join(name);
        }
        input.with_extension("pdf")
    }
}

/// Batch driver: converts every input in sequence, isolating per-file
/// failures so one bad file never aborts the run. Exits nonzero when any file
/// failed.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let options = ConversionOptions::from_cli(cli)?;
    let total = cli.inputs.len();
    let mut failed = 0usize;

    for (idx, input) in cli.inputs.iter().enumerate() {
        if total > 1 {
            println!("[{}/{}] {}", idx + 1, total, input.display());
        }
        match convert(input, &options) {
            Ok(output) => {
                println!("converted {} -> {}", input.display(), output.display());
            }
            Err(err) => {
                failed += 1;
                eprintln!("failed to convert {}: {err}", input.display());
            }
        }
    }

    if total > 1 {
        println!(
            "batch complete: {} succeeded, {failed} failed",
            total - failed
        );
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {total} conversions failed");
    }
    Ok(())
}

/// Runs the full pipeline for a single file and returns the output path.
pub fn convert(input: &Path, options: &ConversionOptions) -> Result<PathBuf, ConversionError> {
    tracing::info!(input = %input.display(), "validating input");
    book::validate(input)?;

    tracing::info!("reading container");
    let mut book = book::load(input)?;
    tracing::debug!(
        title = ?book.metadata.title,
        chapters = book.chapters.len(),
        "loaded container"
    );

    // The extraction directory lives for this conversion only; dropping the
    // guard removes it even when a later stage fails.
    let extract_dir = tempfile::tempdir()
        .map_err(|err| ConversionError::Extraction(format!("create extraction dir: {err}")))?;

    tracing::info!("extracting images and cleaning chapter markup");
    let nav_labels = nav_labels(&book.doc);
    let chapters = std::mem::take(&mut book.chapters);
    let mut images = BTreeMap::new();
    let mut sections = Vec::with_capacity(chapters.len());
    for chapter in &chapters {
        let body = extract::process_chapter(&mut book.doc, chapter, extract_dir.path(), &mut images)?;
        let title = nav_labels
            .get(&chapter.path)
            .cloned()
            .or_else(|| assemble::first_heading(&body))
            .unwrap_or_else(|| format!("Chapter {}", chapter.spine_index + 1));
        sections.push(Section { title, body });
    }
    tracing::debug!(images = images.len(), "image extraction complete");

    tracing::info!("assembling document");
    let css = style::stylesheet(options.page_size, options.margins, options.font_size);
    let html = assemble::document(&book.metadata, &sections, options.include_toc, &css);

    tracing::info!("rendering pdf");
    let bytes = render::render_pdf(&html, &images, options.page_size)?;

    let output = options.output_path_for(input);
    render::write_output(&output, &bytes)?;
    tracing::info!(output = %output.display(), "wrote pdf");

    Ok(output)
}

/// Chapter labels from the container's navigation document, keyed by the
/// content path with any fragment stripped.
fn nav_labels(doc: &EpubDoc<BufReader<File>>) -> HashMap<PathBuf, String> {
    let mut labels = HashMap::new();
    collect_nav_labels(&doc.toc, &mut labels);
    labels
}

fn collect_nav_labels(points: &[NavPoint], labels: &mut HashMap<PathBuf, String>) {
    for point in points {
        let content = point.content.to_string_lossy();
        let path = PathBuf::from(content.split('#').next().unwrap_or(""));
        labels.entry(path).or_insert_with(|| point.label.clone());
        collect_nav_labels(&point.children, labels);
    }
}
