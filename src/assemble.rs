use crate::book::Metadata;

/// One processed chapter ready for assembly.
#[derive(Debug, Clone)]
pub struct Section {
    pub title: String,
    pub body: String,
}

/// Concatenates the title page, optional table of contents, and chapter
/// sections into the single document handed to the rendering engine. The
/// stylesheet is embedded in the head; chapter order is the caller's order.
pub fn document(metadata: &Metadata, sections: &[Section], include_toc: bool, css: &str) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n");
    out.push_str("<html>\n<head>\n");
    out.push_str("  <meta charset=\"utf-8\" />\n");
    out.push_str(&format!(
        "  <title>{}</title>\n",
        xml_escape(metadata.display_title())
    ));
    out.push_str("  <style>\n");
    out.push_str(css);
    out.push_str("  </style>\n");
    out.push_str("</head>\n<body>\n");

    push_title_page(&mut out, metadata);
    if include_toc {
        push_toc(&mut out, sections);
    }

    for (idx, section) in sections.iter().enumerate() {
        out.push_str(&format!(
            "<section class=\"chapter\" id=\"chapter-{}\">\n",
            idx + 1
        ));
        out.push_str(&section.body);
        if !section.body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("</section>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn push_title_page(out: &mut String, metadata: &Metadata) {
    out.push_str("<div class=\"title-page\">\n");
    out.push_str(&format!(
        "  <h1>{}</h1>\n",
        xml_escape(metadata.display_title())
    ));
    if !metadata.authors.is_empty() {
        out.push_str(&format!(
            "  <p class=\"author\">by {}</p>\n",
            xml_escape(&metadata.authors.join(", "))
        ));
    }
    if let Some(publisher) = &metadata.publisher {
        out.push_str(&format!(
            "  <p class=\"publisher\">{}</p>\n",
            xml_escape(publisher)
        ));
    }
    out.push_str("</div>\n");
}

fn push_toc(out: &mut String, sections: &[Section]) {
    out.push_str("<nav class=\"toc\">\n");
    out.push_str("  <h2>Contents</h2>\n");
    out.push_str("  <ol>\n");
    for (idx, section) in sections.iter().enumerate() {
        out.push_str(&format!(
            "    <li><a href=\"#chapter-{}\">{}</a></li>\n",
            idx + 1,
            xml_escape(&section.title)
        ));
    }
    out.push_str("  </ol>\n");
    out.push_str("</nav>\n");
}

/// First heading text in a chapter fragment, used as a TOC label when the
/// container's navigation document has none for it.
pub fn first_heading(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();

    let mut best: Option<(usize, usize)> = None;
    for level in ["<h1", "<h2", "<h3"] {
        let mut search = 0usize;
        while let Some(rel) = lower[search..].find(level) {
            let at = search + rel;
            let next = lower.as_bytes().get(at + level.len());
            // Require `<h1>` or `<h1 ...`, not `<h10`.
            if matches!(next, Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n')) {
                if best.is_none_or(|(pos, _)| at < pos) {
                    best = Some((at, level.len()));
                }
                break;
            }
            search = at + level.len();
        }
    }

    let (at, level_len) = best?;
    let open_end = lower[at..].find('>').map(|rel| at + rel)?;
    let close_pat = format!("</h{}", &lower[at + 2..at + level_len][..1]);
    let close = lower[open_end..].find(&close_pat).map(|rel| open_end + rel)?;

    let text = strip_tags(&html[open_end + 1..close]);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            ch if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
