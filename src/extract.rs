use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use epub::doc::EpubDoc;
use percent_encoding::percent_decode_str;

use crate::book::ChapterItem;
use crate::error::ConversionError;

/// Attributes an image reference may live in. `xlink:href` is checked before
/// the bare `href` so SVG `<image>` elements resolve the right attribute.
const IMAGE_ATTRS: &[&str] = &["src", "xlink:href", "href"];

/// Cleans one chapter document and extracts every image it references.
///
/// The returned fragment is the chapter body with script/style elements
/// removed and resolvable image references rewritten to files under
/// `extract_dir`. Extracted bytes are also recorded in `images`, keyed by the
/// rewritten reference, so the rendering stage can resolve them without
/// touching the container again. Unresolvable references are logged and the
/// offending tag dropped.
pub fn process_chapter(
    doc: &mut EpubDoc<BufReader<File>>,
    chapter: &ChapterItem,
    extract_dir: &Path,
    images: &mut BTreeMap<String, Vec<u8>>,
) -> Result<String, ConversionError> {
    let body = body_fragment(&chapter.html);
    let body = strip_elements(&body, &["script", "style"]);

    let base_dir = chapter
        .path
        .parent()
        .map(|dir| dir.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();

    // Internal path -> rewritten reference, so repeated uses of one asset
    // extract it once.
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut write_error: Option<ConversionError> = None;

    let rewritten = rewrite_image_tags(&body, |reference| {
        if is_external_ref(reference) {
            return ImageRef::Keep;
        }

        let Some(internal) = resolve_relative(&base_dir, reference) else {
            tracing::warn!(
                %reference,
                chapter = %chapter.id,
                "unresolvable image reference; dropping"
            );
            return ImageRef::Drop;
        };
        if let Some(path) = seen.get(&internal) {
            return ImageRef::Rewrite(path.clone());
        }

        let Some(bytes) = doc.get_resource_by_path(&internal) else {
            tracing::warn!(
                %reference,
                %internal,
                chapter = %chapter.id,
                "image not found in container; dropping"
            );
            return ImageRef::Drop;
        };

        let out_path = extract_dir.join(&internal);
        if let Err(err) = write_image(&out_path, &bytes) {
            write_error.get_or_insert(ConversionError::Extraction(format!(
                "extract image {internal}: {err}"
            )));
            return ImageRef::Drop;
        }

        let rewritten_ref = out_path.to_string_lossy().into_owned();
        seen.insert(internal, rewritten_ref.clone());
        images.insert(rewritten_ref.clone(), bytes);
        ImageRef::Rewrite(rewritten_ref)
    });

    match write_error {
        Some(err) => Err(err),
        None => Ok(rewritten),
    }
}

fn write_image(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

fn is_external_ref(reference: &str) -> bool {
    reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("data:")
}

enum ImageRef {
    /// Leave the reference untouched.
    Keep,
    /// Replace the reference with a new value.
    Rewrite(String),
    /// Remove the whole tag.
    Drop,
}

/// Resolves `reference` against the chapter's directory inside the container.
/// Returns `None` when the reference escapes the container root or decodes to
/// nothing.
fn resolve_relative(base_dir: &str, reference: &str) -> Option<String> {
    let reference = reference.split(['#', '?']).next().unwrap_or("");
    let decoded: String = percent_decode_str(reference).decode_utf8().ok()?.into_owned();
    if decoded.is_empty() {
        return None;
    }

    let mut stack: Vec<&str> = if decoded.starts_with('/') {
        Vec::new()
    } else {
        base_dir
            .split('/')
            .filter(|seg| !seg.is_empty() && *seg != ".")
            .collect()
    };

    for seg in decoded.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            seg => stack.push(seg),
        }
    }

    if stack.is_empty() {
        return None;
    }
    Some(stack.join("/"))
}

/// Extracts the inner content of the `<body>` element, or the whole input
/// when no body tag is present.
fn body_fragment(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let Some(body_lt) = find_tag(&lower, "<body", 0) else {
        return html.to_string();
    };
    let Some(body_gt) = tag_end(html, body_lt) else {
        return html.to_string();
    };

    let inner_start = body_gt + 1;
    let inner_end = find_tag(&lower, "</body", inner_start).unwrap_or(html.len());

    html[inner_start..inner_end].to_string()
}

/// Position of `pat` as a complete tag name, rejecting longer names such as
/// `<bodytext>`.
fn find_tag(lower: &str, pat: &str, mut search: usize) -> Option<usize> {
    while let Some(rel) = lower[search..].find(pat) {
        let at = search + rel;
        let next = lower.as_bytes().get(at + pat.len());
        if next.is_none_or(|b| b.is_ascii_whitespace() || matches!(b, b'>' | b'/')) {
            return Some(at);
        }
        search = at + pat.len();
    }
    None
}

/// Removes the named elements together with their content.
fn strip_elements(html: &str, names: &[&str]) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0usize;

    while let Some(rel_lt) = html[cursor..].find('<') {
        let lt = cursor + rel_lt;
        let Some(gt) = tag_end(html, lt) else {
            out.push_str(&html[cursor..]);
            return out;
        };

        let raw_tag = &html[lt..=gt];
        let Some(name) = start_tag_name(raw_tag).filter(|n| names.contains(&n.as_str())) else {
            out.push_str(&html[cursor..=gt]);
            cursor = gt + 1;
            continue;
        };

        out.push_str(&html[cursor..lt]);

        if raw_tag[..raw_tag.len() - 1].trim_end().ends_with('/') {
            cursor = gt + 1;
            continue;
        }

        let close_pat = format!("</{name}");
        cursor = match lower[gt + 1..].find(&close_pat) {
            Some(rel_close) => {
                let close_lt = gt + 1 + rel_close;
                match tag_end(html, close_lt) {
                    Some(close_gt) => close_gt + 1,
                    None => html.len(),
                }
            }
            // Unterminated element; drop the rest of the fragment.
            None => html.len(),
        };
    }

    out.push_str(&html[cursor..]);
    out
}

fn rewrite_image_tags<F>(html: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> ImageRef,
{
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0usize;

    while let Some(rel_lt) = html[cursor..].find('<') {
        let lt = cursor + rel_lt;
        out.push_str(&html[cursor..lt]);

        let Some(gt) = tag_end(html, lt) else {
            // Malformed HTML; copy the rest as-is.
            out.push_str(&html[lt..]);
            return out;
        };
        let raw_tag = &html[lt..=gt];
        cursor = gt + 1;

        let is_image_tag =
            start_tag_name(raw_tag).is_some_and(|name| name == "img" || name == "image");
        if !is_image_tag {
            out.push_str(raw_tag);
            continue;
        }
        let Some((value_start, value_end)) = image_ref_span(raw_tag) else {
            out.push_str(raw_tag);
            continue;
        };

        match resolve(&raw_tag[value_start..value_end]) {
            ImageRef::Keep => out.push_str(raw_tag),
            ImageRef::Rewrite(new_ref) => {
                out.push_str(&raw_tag[..value_start]);
                out.push_str(&new_ref);
                out.push_str(&raw_tag[value_end..]);
            }
            ImageRef::Drop => {}
        }
    }

    out.push_str(&html[cursor..]);
    out
}

/// Finds the end of the tag opened at `lt` while respecting quoted
/// attribute values. Returns the index of the closing `>`.
fn tag_end(html: &str, lt: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut in_quote: Option<u8> = None;
    let mut gt = lt + 1;

    while gt < bytes.len() {
        let b = bytes[gt];
        if let Some(q) = in_quote {
            if b == q {
                in_quote = None;
            }
            gt += 1;
            continue;
        }
        if b == b'"' || b == b'\'' {
            in_quote = Some(b);
            gt += 1;
            continue;
        }
        if b == b'>' {
            return Some(gt);
        }
        gt += 1;
    }

    None
}

/// Lowercased element name for a start tag, or `None` for end tags,
/// comments, doctypes, and processing instructions.
fn start_tag_name(raw_tag: &str) -> Option<String> {
    let bytes = raw_tag.as_bytes();
    if bytes.get(1).is_some_and(|b| matches!(b, b'!' | b'?' | b'/')) {
        return None;
    }

    let mut end = 1;
    while end < bytes.len() && (bytes[end] as char).is_ascii_alphanumeric() {
        end += 1;
    }
    if end == 1 {
        return None;
    }
    Some(raw_tag[1..end].to_ascii_lowercase())
}

/// Byte span of the image reference value inside `raw_tag`, excluding the
/// surrounding quotes.
fn image_ref_span(raw_tag: &str) -> Option<(usize, usize)> {
    let lower = raw_tag.to_ascii_lowercase();
    let bytes = raw_tag.as_bytes();

    for name in IMAGE_ATTRS {
        let mut search = 0usize;
        while let Some(rel) = lower[search..].find(name) {
            let start = search + rel;
            search = start + name.len();

            let preceded_by_ws = raw_tag[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_whitespace());
            if !preceded_by_ws {
                continue;
            }

            let mut i = start + name.len();
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if bytes.get(i) != Some(&b'=') {
                continue;
            }
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            let quote = *bytes.get(i)?;
            if quote != b'"' && quote != b'\'' {
                continue;
            }
            let value_start = i + 1;
            let close = raw_tag[value_start..].find(quote as char)?;
            return Some((value_start, value_start + close));
        }
    }

    None
}
