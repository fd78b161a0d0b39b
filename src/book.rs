use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read as _};
use std::path::{Path, PathBuf};

use epub::doc::EpubDoc;

use crate::error::ConversionError;

/// Dublin Core fields read from the package descriptor. Everything is
/// optional; absent fields fall back to documented defaults at display time.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
    pub date: Option<String>,
}

impl Metadata {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown Title")
    }
}

/// One content document in reading order.
#[derive(Debug, Clone)]
pub struct ChapterItem {
    pub id: String,
    /// Path of the document inside the container.
    pub path: PathBuf,
    pub html: String,
    pub spine_index: usize,
}

/// An opened container plus everything the pipeline needs from it. Owned for
/// the duration of one conversion; the `doc` handle stays open so image
/// resources can be pulled lazily during extraction.
pub struct LoadedBook {
    pub metadata: Metadata,
    pub chapters: Vec<ChapterItem>,
    pub doc: EpubDoc<BufReader<File>>,
}

/// Checks that `path` points at something we can plausibly convert before the
/// EPUB library takes over: the file exists, carries the `.epub` extension,
/// opens as a zip archive, declares the EPUB mimetype, and is not
/// DRM-protected.
pub fn validate(path: &Path) -> Result<(), ConversionError> {
    if !path.is_file() {
        return Err(ConversionError::InvalidInput(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let has_epub_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"));
    if !has_epub_ext {
        return Err(ConversionError::InvalidInput(format!(
            "not an .epub file: {}",
            path.display()
        )));
    }

    let file = File::open(path).map_err(|err| {
        ConversionError::InvalidInput(format!("cannot open {}: {err}", path.display()))
    })?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|err| {
        ConversionError::InvalidInput(format!(
            "{} is not a zip archive: {err}",
            path.display()
        ))
    })?;

    if archive.by_name("META-INF/encryption.xml").is_ok() {
        return Err(ConversionError::InvalidInput(format!(
            "{} is DRM-protected; encrypted EPUBs are not supported",
            path.display()
        )));
    }

    let mut mimetype = String::new();
    match archive.by_name("mimetype") {
        Ok(mut entry) => {
            entry.read_to_string(&mut mimetype).map_err(|err| {
                ConversionError::InvalidInput(format!(
                    "{}: unreadable mimetype entry: {err}",
                    path.display()
                ))
            })?;
        }
        Err(err) => {
            return Err(ConversionError::InvalidInput(format!(
                "{}: missing mimetype entry: {err}",
                path.display()
            )));
        }
    }
    if mimetype.trim() != "application/epub+zip" {
        return Err(ConversionError::InvalidInput(format!(
            "{}: unexpected mimetype {:?}",
            path.display(),
            mimetype.trim()
        )));
    }

    Ok(())
}

/// Opens the container and reads metadata plus the ordered chapter list.
pub fn load(path: &Path) -> Result<LoadedBook, ConversionError> {
    let mut doc = EpubDoc::new(path).map_err(|err| {
        ConversionError::InvalidInput(format!("{}: {err}", path.display()))
    })?;

    let metadata = read_metadata(&doc);
    let chapters = read_chapters(&mut doc)?;

    Ok(LoadedBook {
        metadata,
        chapters,
        doc,
    })
}

fn read_metadata(doc: &EpubDoc<BufReader<File>>) -> Metadata {
    let field = |name: &str| doc.mdata(name).map(|item| item.value.clone());

    let metadata = Metadata {
        title: field("title"),
        authors: doc
            .metadata
            .iter()
            .filter(|item| item.property == "creator")
            .map(|item| item.value.clone())
            .collect(),
        publisher: field("publisher"),
        language: field("language"),
        identifier: field("identifier"),
        date: field("date"),
    };

    if metadata.title.is_none() {
        tracing::warn!("container declares no title; using \"Unknown Title\"");
    }

    metadata
}

fn is_document_mime(mime: &str) -> bool {
    mime == "application/xhtml+xml" || mime == "text/html"
}

/// Resolves the spine into an ordered chapter sequence. The spine is
/// authoritative; document items it never mentions are appended afterwards,
/// ordered by internal path. An empty spine degrades to that same path order
/// for every document item.
fn read_chapters(
    doc: &mut EpubDoc<BufReader<File>>,
) -> Result<Vec<ChapterItem>, ConversionError> {
    let mut ordered_ids = Vec::new();
    let mut in_spine = HashSet::new();

    let spine_ids: Vec<String> = doc.spine.iter().map(|item| item.idref.clone()).collect();
    for id in spine_ids {
        if !doc.resources.contains_key(&id) {
            tracing::warn!(%id, "spine references an unknown manifest item; skipping");
            continue;
        }
        in_spine.insert(id.clone());
        ordered_ids.push(id);
    }

    let mut stragglers: Vec<(PathBuf, String)> = doc
        .resources
        .iter()
        .filter(|(id, item)| is_document_mime(&item.mime) && !in_spine.contains(*id))
        .map(|(id, item)| (item.path.clone(), id.clone()))
        .collect();
    stragglers.sort();
    if !stragglers.is_empty() && !ordered_ids.is_empty() {
        tracing::debug!(
            count = stragglers.len(),
            "appending document items missing from the spine"
        );
    }
    ordered_ids.extend(stragglers.into_iter().map(|(_, id)| id));

    let mut chapters = Vec::new();
    for id in &ordered_ids {
        let Some(path) = doc.resources.get(id).map(|item| item.path.clone()) else {
            continue;
        };
        let Some((html, _mime)) = doc.get_resource_str(id) else {
            tracing::warn!(%id, "chapter entry could not be read; skipping");
            continue;
        };
        let spine_index = chapters.len();
        chapters.push(ChapterItem {
            id: id.clone(),
            path,
            html,
            spine_index,
        });
    }

    if chapters.is_empty() {
        return Err(ConversionError::Extraction(
            "container holds no readable chapter documents".to_string(),
        ));
    }

    Ok(chapters)
}
