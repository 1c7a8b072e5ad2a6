// ============================================================================
// INLINE EXTRACTOR — move inline <style>/<script> blocks out of an HTML page
// into style.css / script.js and link them back in
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SlicerError};

pub const CSS_FILE: &str = "style.css";
pub const JS_FILE: &str = "script.js";

const CSS_APPEND_MARKER: &str = "\n\n/* --- Extracted from HTML --- */\n\n";
const JS_APPEND_MARKER: &str = "\n\n// --- Extracted from HTML --- \n\n";

/// Result of stripping inline blocks out of a page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    /// The page with every matched block removed.
    pub html: String,
    /// Concatenated stylesheet text, each block trimmed and followed by a
    /// blank line.
    pub css: String,
    pub js: String,
    /// Non-blank blocks only; blank blocks are removed but not counted.
    pub css_blocks: usize,
    pub js_blocks: usize,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.css_blocks == 0 && self.js_blocks == 0
    }
}

/// What a run did on disk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    pub css_blocks: usize,
    pub js_blocks: usize,
    /// `style.css` already existed and the new rules were appended.
    pub css_appended: bool,
    pub js_appended: bool,
    pub html_rewritten: bool,
}

// ============================================================================
// TAG SCANNING
// ============================================================================

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Case-insensitive search for an ASCII needle.
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.is_empty() || from > hay.len() || hay.len() - from < pat.len() {
        return None;
    }
    (from..=hay.len() - pat.len()).find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}

/// An opening tag's attributes carry `src=` at a word boundary.
fn has_src_attr(html: &str, attrs_start: usize, attrs_end: usize) -> bool {
    let bytes = html.as_bytes();
    let mut from = attrs_start;
    while let Some(i) = find_ci(&html[..attrs_end], "src=", from) {
        if i == 0 || !is_word_byte(bytes[i - 1]) {
            return true;
        }
        from = i + 1;
    }
    false
}

/// Remove every `<tag ...>...</tag>` block whose opening tag is not vetoed
/// by `skip_open`, passing the trimmed inner text of each to `sink` when
/// non-blank.  A start tag with no `>` or no closing tag is left in place.
fn strip_blocks(
    html: &str,
    tag: &str,
    skip_open: impl Fn(&str, usize, usize) -> bool,
    mut sink: impl FnMut(&str),
) -> String {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut out = String::with_capacity(html.len());
    let mut copied = 0;
    let mut from = 0;

    while let Some(start) = find_ci(html, &open, from) {
        let attrs = start + open.len();
        let Some(gt) = html[attrs..].find('>').map(|i| attrs + i) else {
            break;
        };
        if skip_open(html, attrs, gt) {
            from = start + 1;
            continue;
        }
        let Some(close_at) = find_ci(html, &close, gt + 1) else {
            from = start + 1;
            continue;
        };

        let content = html[gt + 1..close_at].trim();
        if !content.is_empty() {
            sink(content);
        }
        out.push_str(&html[copied..start]);
        copied = close_at + close.len();
        from = copied;
    }
    out.push_str(&html[copied..]);
    out
}

/// Strip inline `<style>` blocks, then `<script>` blocks without a `src`
/// attribute, collecting their text.
pub fn extract_inline(html: &str) -> Extraction {
    let mut ex = Extraction::default();

    let without_styles = strip_blocks(
        html,
        "style",
        |_, _, _| false,
        |content| {
            ex.css.push_str(content);
            ex.css.push_str("\n\n");
            ex.css_blocks += 1;
        },
    );

    let mut js = String::new();
    let mut js_blocks = 0;
    ex.html = strip_blocks(&without_styles, "script", has_src_attr, |content| {
        js.push_str(content);
        js.push_str("\n\n");
        js_blocks += 1;
    });
    ex.js = js;
    ex.js_blocks = js_blocks;
    ex
}

/// Add `<link rel="stylesheet" href="style.css">` unless the page already
/// mentions the stylesheet.
pub fn inject_stylesheet_link(html: &str) -> String {
    if html.contains(CSS_FILE) {
        return html.to_string();
    }
    let link = format!("<link rel=\"stylesheet\" href=\"{}\">", CSS_FILE);
    if html.contains("</head>") {
        html.replacen("</head>", &format!("    {}\n</head>", link), 1)
    } else {
        format!("{}\n{}", link, html)
    }
}

/// Add `<script src="script.js"></script>` unless a tag already loads it.
pub fn inject_script_tag(html: &str) -> String {
    if html.contains(&format!("src=\"{}\"", JS_FILE)) || html.contains(&format!("src='{}'", JS_FILE)) {
        return html.to_string();
    }
    let tag = format!("<script src=\"{}\"></script>", JS_FILE);
    if html.contains("</body>") {
        html.replacen("</body>", &format!("    {}\n</body>", tag), 1)
    } else {
        format!("{}\n{}", html, tag)
    }
}

/// Collapse runs of three or more line breaks (`\n` or `\r\n`) into `\n\n`.
pub fn collapse_blank_lines(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let run_start = i;
        let mut breaks = 0;
        loop {
            if bytes.get(i) == Some(&b'\n') {
                i += 1;
            } else if bytes.get(i) == Some(&b'\r') && bytes.get(i + 1) == Some(&b'\n') {
                i += 2;
            } else {
                break;
            }
            breaks += 1;
        }
        if breaks >= 3 {
            out.push_str(&text[copied..run_start]);
            out.push_str("\n\n");
            copied = i;
        }
        if breaks == 0 {
            i += 1;
        }
    }
    out.push_str(&text[copied..]);
    out
}

// ============================================================================
// FILE PROCESSING
// ============================================================================

/// Write `fresh` to `path`, appending after `marker` if the file exists.
/// Returns whether an existing file was appended to.
fn write_or_append(path: &Path, fresh: &str, marker: &str) -> Result<bool> {
    if path.exists() {
        let existing = fs::read_to_string(path)?;
        fs::write(path, format!("{}{}{}", existing, marker, fresh))?;
        Ok(true)
    } else {
        fs::write(path, fresh)?;
        Ok(false)
    }
}

/// Process one HTML file in place.  Sibling `style.css` / `script.js` are
/// created or appended to as needed; the page itself is only rewritten when
/// something was extracted.
pub fn process_file(html_path: &Path) -> Result<Report> {
    if !html_path.exists() {
        return Err(SlicerError::NotFound(html_path.to_path_buf()));
    }
    let dir: PathBuf = html_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let source = fs::read_to_string(html_path)?;
    let ex = extract_inline(&source);
    let mut report = Report {
        css_blocks: ex.css_blocks,
        js_blocks: ex.js_blocks,
        ..Report::default()
    };
    if ex.is_empty() {
        log::info!("{}: nothing to extract", html_path.display());
        return Ok(report);
    }

    let mut html = ex.html;
    if ex.css_blocks > 0 {
        report.css_appended = write_or_append(&dir.join(CSS_FILE), &ex.css, CSS_APPEND_MARKER)?;
        html = inject_stylesheet_link(&html);
    }
    if ex.js_blocks > 0 {
        report.js_appended = write_or_append(&dir.join(JS_FILE), &ex.js, JS_APPEND_MARKER)?;
        html = inject_script_tag(&html);
    }

    fs::write(html_path, collapse_blank_lines(&html))?;
    report.html_rewritten = true;
    log::info!(
        "{}: {} style block(s), {} script block(s) extracted",
        html_path.display(),
        report.css_blocks,
        report.js_blocks
    );
    Ok(report)
}
