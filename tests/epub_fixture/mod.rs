//! Builds minimal EPUB containers for tests.
#![allow(dead_code)]

use std::fs::File;
use std::io::Write as _;
use std::path::Path;

use zip::write::SimpleFileOptions;

/// A 1x1 transparent PNG.
pub const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Debug, Default)]
pub struct EpubFixture {
    title: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    /// (stem, body html), written to `OEBPS/<stem>.xhtml` and listed in the
    /// spine in this order.
    chapters: Vec<(String, String)>,
    /// Chapters present in the manifest but left out of the spine.
    loose_chapters: Vec<(String, String)>,
    /// (path under OEBPS, bytes)
    images: Vec<(String, Vec<u8>)>,
}

impl EpubFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.authors.push(author.to_string());
        self
    }

    pub fn publisher(mut self, publisher: &str) -> Self {
        self.publisher = Some(publisher.to_string());
        self
    }

    pub fn chapter(mut self, stem: &str, body: &str) -> Self {
        self.chapters.push((stem.to_string(), body.to_string()));
        self
    }

    pub fn loose_chapter(mut self, stem: &str, body: &str) -> Self {
        self.loose_chapters.push((stem.to_string(), body.to_string()));
        self
    }

    pub fn image(mut self, rel_path: &str, bytes: &[u8]) -> Self {
        self.images.push((rel_path.to_string(), bytes.to_vec()));
        self
    }

    pub fn write_to(&self, out_path: &Path) {
        let out_file = File::create(out_path).expect("create fixture epub");
        let mut zip = zip::ZipWriter::new(out_file);

        // The mimetype entry must come first and must be stored uncompressed.
        let mimetype_options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o644);
        zip.start_file("mimetype", mimetype_options).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        let deflated_options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);

        zip.start_file("META-INF/container.xml", deflated_options)
            .unwrap();
        zip.write_all(container_xml().as_bytes()).unwrap();

        zip.start_file("OEBPS/content.opf", deflated_options)
            .unwrap();
        zip.write_all(self.content_opf().as_bytes()).unwrap();

        for (stem, body) in self.chapters.iter().chain(&self.loose_chapters) {
            zip.start_file(format!("OEBPS/{stem}.xhtml"), deflated_options)
                .unwrap();
            zip.write_all(chapter_xhtml(stem, body).as_bytes()).unwrap();
        }

        for (rel_path, bytes) in &self.images {
            zip.start_file(format!("OEBPS/{rel_path}"), deflated_options)
                .unwrap();
            zip.write_all(bytes).unwrap();
        }

        zip.finish().unwrap();
    }

    fn content_opf(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        out.push_str(
            "<package xmlns=\"http://www.idpf.org/2007/opf\" unique-identifier=\"bookid\" version=\"3.0\">\n",
        );
        out.push_str("  <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n");
        out.push_str(
            "    <dc:identifier id=\"bookid\">urn:uuid:00000000-0000-0000-0000-000000000001</dc:identifier>\n",
        );
        if let Some(title) = &self.title {
            out.push_str(&format!("    <dc:title>{title}</dc:title>\n"));
        }
        for author in &self.authors {
            out.push_str(&format!("    <dc:creator>{author}</dc:creator>\n"));
        }
        if let Some(publisher) = &self.publisher {
            out.push_str(&format!("    <dc:publisher>{publisher}</dc:publisher>\n"));
        }
        out.push_str("    <dc:language>en</dc:language>\n");
        out.push_str("    <meta property=\"dcterms:modified\">2026-01-01T00:00:00Z</meta>\n");
        out.push_str("  </metadata>\n");

        out.push_str("  <manifest>\n");
        for (stem, _) in self.chapters.iter().chain(&self.loose_chapters) {
            out.push_str(&format!(
                "    <item id=\"{stem}\" href=\"{stem}.xhtml\" media-type=\"application/xhtml+xml\" />\n"
            ));
        }
        for (idx, (rel_path, _)) in self.images.iter().enumerate() {
            out.push_str(&format!(
                "    <item id=\"img-{}\" href=\"{rel_path}\" media-type=\"{}\" />\n",
                idx + 1,
                media_type(rel_path)
            ));
        }
        out.push_str("  </manifest>\n");

        out.push_str("  <spine>\n");
        for (stem, _) in &self.chapters {
            out.push_str(&format!("    <itemref idref=\"{stem}\" />\n"));
        }
        out.push_str("  </spine>\n");
        out.push_str("</package>\n");
        out
    }
}

fn container_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#
}

fn chapter_xhtml(title: &str, body: &str) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<!DOCTYPE html>\n");
    out.push_str("<html xmlns=\"http://www.w3.org/1999/xhtml\">\n");
    out.push_str("<head>\n");
    out.push_str(&format!("  <title>{title}</title>\n"));
    out.push_str("</head>\n");
    out.push_str("<body>\n");
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("</body>\n");
    out.push_str("</html>\n");
    out
}

fn media_type(rel_path: &str) -> &'static str {
    let ext = Path::new(rel_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
