//! HTML comparison report over a result log.
//!
//! Rows are grouped by equivalence class so vectors with identical behavior across implementations sit together;
//! the pruned report keeps one representative per class.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use minefield_core::verdict::VERDICTS;
use minefield_core::{ExecutionRecord, Verdict, VerdictMatrix};

use crate::corpus::{Corpus, TestVector};
use crate::error::{HarnessError, HarnessResult};
use crate::version::MINEFIELD_VERSION;

/// Default report file name inside a results directory.
pub const DEFAULT_REPORT_NAME: &str = "parsing.html";

const DEFAULT_TITLE: &str = "JSON Parsing Tests";
const DEFAULT_STYLESHEET: &str = "style.css";

/// Vectors longer than this many bytes get a cut preview.
const PREVIEW_LIMIT: usize = 36;

/// Report rendering options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub title: String,
    /// Keep only the first vector of each equivalence class
    pub pruned: bool,
    /// Stylesheet href; the report carries class names only
    pub stylesheet: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            pruned: false,
            stylesheet: DEFAULT_STYLESHEET.to_string(),
        }
    }
}

impl ReportOptions {
    pub fn with_pruned(mut self, pruned: bool) -> Self {
        self.pruned = pruned;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    fn heading(&self) -> String {
        format!("{}, {}", self.title, if self.pruned { "Pruned" } else { "Full" })
    }
}

/// Render the report for `records`. Previews are read from the matching vector in `corpus`; records naming a
/// vector the corpus does not hold are left out.
#[tracing::instrument(skip_all, fields(records = records.len(), pruned = options.pruned))]
pub fn render_html(records: &[ExecutionRecord], corpus: &Corpus, options: &ReportOptions) -> String {
    let matrix = VerdictMatrix::from_records(records);
    let implementations = matrix.implementations();
    let classes = matrix.group(&implementations);

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<HTML>\n<HEAD>\n    <TITLE>{title}</TITLE>\n    \
         <LINK rel=\"stylesheet\" type=\"text/css\" href=\"{css}\">\n    <META charset=\"UTF-8\">\n</HEAD>\n<BODY>\n",
        title = escape(&options.title),
        css = escape(&options.stylesheet),
    );
    let _ = writeln!(html, "<H1>{}</H1>", escape(&options.heading()));

    html.push_str("<A NAME=\"color_scheme\"></A>\n<H4>Color scheme:</H4>\n<TABLE>\n");
    for info in VERDICTS.iter().filter(|info| info.in_legend) {
        let _ = writeln!(
            html,
            "    <TR><TD class=\"{}\">{}</TD></TR>",
            info.canonical,
            escape(info.description)
        );
    }
    html.push_str("</TABLE>\n");

    html.push_str("<A NAME=\"all_results\"></A>\n<H4>Full Results</H4>\n<TABLE>\n    <TR>\n        <TH></TH>\n");
    for implementation in &implementations {
        let _ = writeln!(html, "        <TH class=\"vertical\"><DIV>{}</DIV></TH>", escape(implementation));
    }
    html.push_str("        <TH></TH>\n    </TR>\n");

    let mut rows = 0usize;
    let mut missing = 0usize;
    for class in &classes {
        let members: Vec<&str> = if options.pruned {
            class.representative().into_iter().collect()
        } else {
            class.members.iter().map(String::as_str).collect()
        };

        for vector in members {
            let Some(Ok(bytes)) = corpus.get(vector).map(TestVector::read_bytes) else {
                missing += 1;
                continue;
            };
            rows += 1;

            html.push_str("    <TR>\n");
            let _ = writeln!(html, "        <TD>{}</TD>", escape(vector));
            for implementation in &implementations {
                let verdict = matrix
                    .verdict(vector, implementation)
                    .unwrap_or(Verdict::ExpectedResult);
                let _ = writeln!(html, "        <TD class=\"{}\"></TD>", verdict.as_str());
            }
            let _ = writeln!(html, "        <TD>{}</TD>", underline_non_printable(&bytes));
            html.push_str("    </TR>\n");
        }
    }
    html.push_str("</TABLE>\n");
    let _ = writeln!(html, "<P>minefield {}</P>", MINEFIELD_VERSION);
    html.push_str("</BODY>\n</HTML>\n");

    if missing > 0 {
        tracing::warn!(missing, "vectors absent from the corpus were left out of the report");
    }
    tracing::debug!(rows, classes = classes.len(), "report rendered");
    html
}

/// Write a rendered report, creating parent directories.
pub fn write_report(path: &Path, html: &str) -> HarnessResult<()> {
    let report_error = |source| HarnessError::Report {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(report_error)?;
    }
    fs::write(path, html).map_err(report_error)
}

enum Piece<'a> {
    Printable(u8),
    Hidden(u8),
    Separator,
    Decoded(&'a str),
}

impl Piece<'_> {
    /// Width as counted against the preview limit: markup included, escaping excluded.
    fn width(&self) -> usize {
        match self {
            Piece::Printable(_) => 1,
            Piece::Hidden(_) => "<U>00</U>".len(),
            Piece::Separator => " <=> ".len(),
            Piece::Decoded(text) => text.chars().count(),
        }
    }

    fn render(&self, out: &mut String) {
        match self {
            Piece::Printable(b) => out.push_str(&escape_char(char::from(*b))),
            Piece::Hidden(b) => {
                let _ = write!(out, "<U>{:02X}</U>", b);
            }
            Piece::Separator => out.push_str(" &lt;=&gt; "),
            Piece::Decoded(text) => out.push_str(&escape(text)),
        }
    }
}

/// Preview of a vector's bytes.
///
/// Bytes outside `0x20..=0x7E` are shown as underlined hex. If there are any, the valid UTF-8 text of the vector
/// follows after ` <=> ` (invalid sequences dropped). Vectors longer than 36 bytes are cut to 36 preview
/// characters and marked `(...)`; a hex cell is never split.
pub fn underline_non_printable(bytes: &[u8]) -> String {
    let mut pieces: Vec<Piece<'_>> = bytes
        .iter()
        .map(|&b| {
            if (0x20..=0x7e).contains(&b) {
                Piece::Printable(b)
            } else {
                Piece::Hidden(b)
            }
        })
        .collect();

    if pieces.iter().any(|p| matches!(p, Piece::Hidden(_))) {
        pieces.push(Piece::Separator);
        pieces.extend(bytes.utf8_chunks().map(|chunk| Piece::Decoded(chunk.valid())));
    }

    let mut out = String::new();
    if bytes.len() <= PREVIEW_LIMIT {
        pieces.iter().for_each(|p| p.render(&mut out));
        return out;
    }

    let mut budget = PREVIEW_LIMIT;
    for piece in &pieces {
        match piece {
            Piece::Decoded(text) if piece.width() > budget => {
                let head: String = text.chars().take(budget).collect();
                out.push_str(&escape(&head));
                break;
            }
            _ if piece.width() > budget => break,
            _ => {
                budget -= piece.width();
                piece.render(&mut out);
            }
        }
    }
    out.push_str("(...)");
    out
}

fn escape_char(c: char) -> String {
    match c {
        '<' => "&lt;".to_string(),
        '>' => "&gt;".to_string(),
        '&' => "&amp;".to_string(),
        '"' => "&quot;".to_string(),
        c => c.to_string(),
    }
}

fn escape(text: &str) -> String {
    text.chars().map(escape_char).collect()
}
