use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use printpdf::{Base64OrRaw, GeneratePdfOptions, PdfDocument, PdfSaveOptions};

use crate::cli::PageSize;
use crate::error::ConversionError;

/// Lays out the assembled document into PDF bytes. Page dimensions go in
/// through the engine options, which is the only geometry channel the engine
/// honors; typography and margins arrive through the embedded stylesheet.
/// `images` maps each rewritten image reference to the extracted bytes.
pub fn render_pdf(
    html: &str,
    images: &BTreeMap<String, Vec<u8>>,
    page_size: PageSize,
) -> Result<Vec<u8>, ConversionError> {
    let images: BTreeMap<String, Base64OrRaw> = images
        .iter()
        .map(|(reference, bytes)| (reference.clone(), Base64OrRaw::Raw(bytes.clone())))
        .collect();
    let fonts: BTreeMap<String, Base64OrRaw> = BTreeMap::new();

    let (page_width, page_height) = page_size.dimensions_mm();
    let options = GeneratePdfOptions {
        page_width: Some(page_width),
        page_height: Some(page_height),
        ..GeneratePdfOptions::default()
    };

    let mut warnings = Vec::new();
    let doc = PdfDocument::from_html(html, &images, &fonts, &options, &mut warnings)
        .map_err(ConversionError::Render)?;
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);

    for warning in &warnings {
        tracing::debug!(?warning, "renderer warning");
    }

    if bytes.is_empty() {
        return Err(ConversionError::Render(
            "rendering engine produced no output".to_string(),
        ));
    }
    Ok(bytes)
}

/// Writes the PDF bytes to the resolved output path, creating parent
/// directories as needed.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<(), ConversionError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ConversionError::Output {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, bytes).map_err(|source| ConversionError::Output {
        path: path.to_path_buf(),
        source,
    })
}
