use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// EPUB file(s) to convert.
    #[arg(required = true, value_name = "EPUB_FILES")]
    pub inputs: Vec<PathBuf>,

    /// Output PDF path (single-file conversion only).
    #[arg(short, long, conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Output directory for batch conversion.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Page size for the PDF.
    #[arg(long, value_enum, default_value_t = PageSize::A4)]
    pub page_size: PageSize,

    /// Page margins in millimeters.
    #[arg(long, default_value_t = 20)]
    pub margins: u32,

    /// Base font size in points.
    #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(u32).range(1..))]
    pub font_size: u32,

    /// Disable table of contents generation.
    #[arg(long)]
    pub no_toc: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PageSize {
    #[value(name = "A4", alias = "a4")]
    A4,
    #[value(name = "Letter", alias = "letter")]
    Letter,
    #[value(name = "A5", alias = "a5")]
    A5,
    #[value(name = "Legal", alias = "legal")]
    Legal,
}
