use crate::cli::PageSize;

impl PageSize {
    /// CSS dimensions for the `@page` rule, width then height.
    pub fn css_size(self) -> (&'static str, &'static str) {
        match self {
            PageSize::A4 => ("210mm", "297mm"),
            PageSize::Letter => ("8.5in", "11in"),
            PageSize::A5 => ("148mm", "210mm"),
            PageSize::Legal => ("8.5in", "14in"),
        }
    }

    /// Page dimensions in millimeters, width then height. The rendering
    /// engine takes geometry through its options rather than the `@page`
    /// rule, so these feed the render stage directly.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::A5 => (148.0, 210.0),
            PageSize::Legal => (215.9, 355.6),
        }
    }
}

/// Generates the stylesheet controlling typography, margins, the running
/// header and footer, and block styling for the assembled document. Margins
/// sit on `body` so the layout engine applies them; the running header
/// carries the book title via `string-set`, the footer the page counter.
pub fn stylesheet(page_size: PageSize, margins: u32, font_size: u32) -> String {
    let (width, height) = page_size.css_size();
    let h1 = font_size * 2;
    let h2 = f64::from(font_size) * 1.5;
    let h3 = f64::from(font_size) * 1.25;
    let h4 = f64::from(font_size) * 1.1;

    format!(
        r#"@page {{
    size: {width} {height};

    @top-center {{
        content: string(book-title);
        font-size: 9pt;
        color: #666;
    }}

    @bottom-center {{
        content: counter(page);
        font-size: 9pt;
        color: #666;
    }}
}}

body {{
    margin: {margins}mm;
    font-family: Georgia, 'Times New Roman', serif;
    font-size: {font_size}pt;
    line-height: 1.6;
    text-align: justify;
    color: #000;
}}

h1 {{
    string-set: book-title content();
    font-size: {h1}pt;
    font-weight: bold;
    margin-top: 1em;
    margin-bottom: 0.5em;
    page-break-after: avoid;
}}

h2 {{
    font-size: {h2}pt;
    font-weight: bold;
    margin-top: 0.8em;
    margin-bottom: 0.4em;
    page-break-after: avoid;
}}

h3 {{
    font-size: {h3}pt;
    font-weight: bold;
    margin-top: 0.6em;
    margin-bottom: 0.3em;
    page-break-after: avoid;
}}

h4, h5, h6 {{
    font-size: {h4}pt;
    font-weight: bold;
    margin-top: 0.5em;
    margin-bottom: 0.25em;
    page-break-after: avoid;
}}

p {{
    margin: 0.5em 0;
    text-indent: 1.5em;
    orphans: 3;
    widows: 3;
}}

p:first-child,
h1 + p, h2 + p, h3 + p, h4 + p {{
    text-indent: 0;
}}

img {{
    max-width: 100%;
    height: auto;
    display: block;
    margin: 1em auto;
    page-break-inside: avoid;
}}

table {{
    border-collapse: collapse;
    width: 100%;
    margin: 1em 0;
    page-break-inside: avoid;
}}

th, td {{
    border: 1px solid #ddd;
    padding: 8px;
    text-align: left;
}}

th {{
    background-color: #f2f2f2;
    font-weight: bold;
}}

blockquote {{
    margin: 1em 2em;
    padding: 0.5em 1em;
    border-left: 3px solid #ccc;
    font-style: italic;
}}

ul, ol {{
    margin: 0.5em 0;
    padding-left: 2em;
}}

li {{
    margin: 0.25em 0;
}}

pre, code {{
    font-family: 'Courier New', monospace;
    background-color: #f5f5f5;
    padding: 0.2em 0.4em;
    border-radius: 3px;
}}

pre {{
    padding: 1em;
    overflow-x: auto;
    page-break-inside: avoid;
}}

a {{
    color: #0066cc;
    text-decoration: none;
}}

hr {{
    border: none;
    border-top: 1px solid #ccc;
    margin: 2em 0;
}}

.title-page {{
    text-align: center;
    padding: 5em 2em;
    page-break-after: always;
}}

.toc {{
    page-break-after: always;
}}

.chapter {{
    page-break-before: always;
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_carries_page_geometry() {
        let css = stylesheet(PageSize::A4, 25, 14);
        assert!(css.contains("size: 210mm 297mm;"));
        assert!(css.contains("margin: 25mm;"));
        assert!(css.contains("font-size: 14pt;"));
        assert!(css.contains("font-size: 28pt;"));
    }

    #[test]
    fn every_page_size_has_dimensions() {
        assert_eq!(PageSize::A4.css_size(), ("210mm", "297mm"));
        assert_eq!(PageSize::Letter.css_size(), ("8.5in", "11in"));
        assert_eq!(PageSize::A5.css_size(), ("148mm", "210mm"));
        assert_eq!(PageSize::Legal.css_size(), ("8.5in", "14in"));

        assert_eq!(PageSize::A4.dimensions_mm(), (210.0, 297.0));
        assert_eq!(PageSize::Letter.dimensions_mm(), (215.9, 279.4));
        assert_eq!(PageSize::A5.dimensions_mm(), (148.0, 210.0));
        assert_eq!(PageSize::Legal.dimensions_mm(), (215.9, 355.6));
    }

    #[test]
    fn margins_apply_to_the_body_box() {
        let css = stylesheet(PageSize::A4, 35, 12);
        let body = css.find("body {").unwrap();
        let body_block = &css[body..css[body..].find('}').unwrap() + body];
        assert!(body_block.contains("margin: 35mm;"));
    }

    #[test]
    fn stylesheet_keeps_widow_and_orphan_control() {
        let css = stylesheet(PageSize::Letter, 20, 12);
        assert!(css.contains("orphans: 3;"));
        assert!(css.contains("widows: 3;"));
        assert!(css.contains("counter(page)"));
        assert!(css.contains("string(book-title)"));
    }
}
