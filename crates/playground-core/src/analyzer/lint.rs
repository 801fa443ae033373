//! Built-in Gleam analyzer
//!
//! Parses the source with the tree-sitter Gleam grammar and reports the
//! syntax errors found in the tree, plus a few lints the compiler would
//! accept: `todo` expressions, trailing whitespace and tab indentation.
//! Columns are counted in UTF-16 code units, like the editor surface does.

use super::{AnalysisResult, AnalyzerFactory, Diagnostic, LocalAnalyzer, Severity, TextRange};
use crate::error::AnalyzerError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tree_sitter::{Language, Node, Parser, Point, Tree};

const TODO_KEYWORD: &str = "todo";
const SNIPPET_CHARS: usize = 24;

/// Parser with the Gleam grammar loaded
fn gleam_parser() -> Result<Parser, AnalyzerError> {
    let language: Language = tree_sitter_gleam::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| AnalyzerError::Instantiate(e.to_string()))?;
    Ok(parser)
}

/// Maps tree-sitter byte positions to editor positions
struct LineIndex<'a> {
    code: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(code: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(code.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { code, starts }
    }

    /// 1-based UTF-16 column of `byte_column` on `row`
    fn column(&self, row: usize, byte_column: usize) -> usize {
        let start = self.starts.get(row).copied().unwrap_or(self.code.len());
        let prefix = self
            .code
            .get(start..)
            .and_then(|line| line.get(..byte_column))
            .unwrap_or_default();
        prefix.encode_utf16().count() + 1
    }

    fn range(&self, start: Point, end: Point) -> TextRange {
        let start_column = self.column(start.row, start.column);
        let mut end_column = self.column(end.row, end.column);
        if end.row == start.row && end_column <= start_column {
            end_column = start_column + 1;
        }
        TextRange {
            start_line: start.row + 1,
            start_column,
            end_line: end.row + 1,
            end_column,
        }
    }
}

fn snippet(node: Node<'_>, code: &str) -> String {
    node.utf8_text(code.as_bytes())
        .unwrap_or_default()
        .trim()
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(SNIPPET_CHARS)
        .collect()
}

/// Marker for `node`, or `None`; the bool says whether to descend into it
fn inspect(node: Node<'_>, code: &str, lines: &LineIndex<'_>) -> (Option<Diagnostic>, bool) {
    if node.is_error() {
        let text = snippet(node, code);
        let message = if text.is_empty() {
            "syntax error".to_string()
        } else {
            format!("syntax error near `{text}`")
        };
        let range = lines.range(node.start_position(), node.end_position());
        return (Some(Diagnostic::new(range, Severity::Error, message)), false);
    }
    if node.is_missing() {
        let range = lines.range(node.start_position(), node.end_position());
        let message = format!("missing `{}`", node.kind());
        return (Some(Diagnostic::new(range, Severity::Error, message)), false);
    }
    if node.is_named() && node.kind() == TODO_KEYWORD {
        let start = node.start_position();
        let end = Point::new(start.row, start.column + TODO_KEYWORD.len());
        let marker = Diagnostic::new(
            lines.range(start, end),
            Severity::Warning,
            "`todo` marks unfinished code and will crash when evaluated",
        );
        return (Some(marker), true);
    }
    (None, true)
}

fn tree_markers(tree: &Tree, code: &str, lines: &LineIndex<'_>, markers: &mut Vec<Diagnostic>) {
    let mut cursor = tree.walk();
    loop {
        let (marker, descend) = inspect(cursor.node(), code, lines);
        markers.extend(marker);
        if descend && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// True if the byte at `offset` belongs to a string literal
fn in_string(tree: &Tree, offset: usize) -> bool {
    let mut node = tree.root_node().descendant_for_byte_range(offset, offset + 1);
    while let Some(n) = node {
        if n.kind() == "string" {
            return true;
        }
        node = n.parent();
    }
    false
}

fn whitespace_markers(tree: &Tree, lines: &LineIndex<'_>, markers: &mut Vec<Diagnostic>) {
    for (row, &start) in lines.starts.iter().enumerate() {
        let raw = lines.code[start..].split('\n').next().unwrap_or_default();
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        let tab = line
            .bytes()
            .take_while(|b| *b == b' ' || *b == b'\t')
            .position(|b| b == b'\t');
        if let Some(tab) = tab.filter(|tab| !in_string(tree, start + tab)) {
            markers.push(Diagnostic::new(
                TextRange::on_line(row + 1, lines.column(row, tab), lines.column(row, tab + 1)),
                Severity::Info,
                "tab used for indentation, Gleam uses two spaces",
            ));
        }

        let trimmed = line.trim_end_matches([' ', '\t']).len();
        if trimmed < line.len() && !in_string(tree, start + line.len() - 1) {
            markers.push(Diagnostic::new(
                TextRange::on_line(
                    row + 1,
                    lines.column(row, trimmed),
                    lines.column(row, line.len()),
                ),
                Severity::Hint,
                "trailing whitespace",
            ));
        }
    }
}

/// All markers for `code`, parsed into `tree`
fn markers(tree: &Tree, code: &str) -> Vec<Diagnostic> {
    let lines = LineIndex::new(code);
    let mut markers = Vec::new();
    tree_markers(tree, code, &lines, &mut markers);
    whitespace_markers(tree, &lines, &mut markers);
    markers.sort_by_key(|m| (m.range.start_line, m.range.start_column));
    markers
}

/// Analyzer running the Gleam parser in-process
///
/// Disposing drops the parser; later passes fail with `AnalyzerError::Disposed`.
pub struct LintAnalyzer {
    parser: Mutex<Option<Parser>>,
}

impl LintAnalyzer {
    /// Create new analyzer
    ///
    /// # Errors
    /// Returns `AnalyzerError::Instantiate` if the Gleam grammar cannot be loaded.
    pub fn new() -> Result<Self, AnalyzerError> {
        Ok(Self {
            parser: Mutex::new(Some(gleam_parser()?)),
        })
    }

    /// True once `dispose` was called
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.parser.lock().is_none()
    }
}

impl fmt::Debug for LintAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LintAnalyzer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[async_trait]
impl LocalAnalyzer for LintAnalyzer {
    async fn analyze_code(&self, code: &str) -> Result<AnalysisResult, AnalyzerError> {
        let tree = {
            let mut guard = self.parser.lock();
            let parser = guard.as_mut().ok_or(AnalyzerError::Disposed)?;
            parser
                .parse(code, None)
                .ok_or_else(|| AnalyzerError::Analysis("parser returned no tree".to_string()))?
        };
        Ok(AnalysisResult {
            markers: markers(&tree, code),
        })
    }

    fn dispose(&self) {
        if self.parser.lock().take().is_some() {
            tracing::debug!("lint analyzer disposed");
        }
    }
}

/// Factory for `LintAnalyzer`; always supported
#[derive(Debug, Clone, Copy, Default)]
pub struct LintAnalyzerFactory;

impl AnalyzerFactory for LintAnalyzerFactory {
    fn supported(&self) -> bool {
        true
    }

    fn instantiate(&self) -> Result<Arc<dyn LocalAnalyzer>, AnalyzerError> {
        Ok(Arc::new(LintAnalyzer::new()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const HELLO: &str = "import gleam/io\n\npub fn main() {\n  io.println(\"Hello, world!\")\n}\n";

    fn lint(code: &str) -> Vec<Diagnostic> {
        let tree = gleam_parser().unwrap().parse(code, None).unwrap();
        markers(&tree, code)
    }

    fn of_severity(code: &str, severity: Severity) -> Vec<Diagnostic> {
        lint(code)
            .into_iter()
            .filter(|m| m.severity == severity)
            .collect()
    }

    #[test]
    fn valid_program_is_clean() {
        assert_eq!(lint(HELLO), vec![]);
    }

    #[test]
    fn syntax_error_without_bracket_problems() {
        let errors = of_severity("pub fn main() { let = 1 }", Severity::Error);
        assert!(!errors.is_empty());
        assert!(errors.iter().all(|m| m.range.start_line == 1));
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let errors = of_severity("pub fn main() {\n  io.println(\"hi\"\n", Severity::Error);
        assert!(!errors.is_empty());
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(!of_severity("pub fn main() {\n  \"abc\n}\n", Severity::Error).is_empty());
    }

    #[test]
    fn todo_expression_is_a_warning() {
        let warnings = of_severity(
            "pub fn main() {\n  let todos = 1\n  todo\n}\n",
            Severity::Warning,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].range, TextRange::on_line(3, 3, 7));
    }

    #[test]
    fn whitespace_findings() {
        let code = "pub fn main() {  \n\t1\n}\n";
        assert_eq!(
            of_severity(code, Severity::Hint)
                .iter()
                .map(|m| m.range)
                .collect::<Vec<_>>(),
            vec![TextRange::on_line(1, 16, 18)]
        );
        assert_eq!(
            of_severity(code, Severity::Info)
                .iter()
                .map(|m| m.range)
                .collect::<Vec<_>>(),
            vec![TextRange::on_line(2, 1, 2)]
        );
    }

    #[test]
    fn whitespace_inside_strings_is_ignored() {
        let code = "pub fn main() {\n  \"a  \n\tb\"\n}\n";
        assert!(of_severity(code, Severity::Hint).is_empty());
        assert!(of_severity(code, Severity::Info).is_empty());
    }

    #[test]
    fn columns_count_utf16_units() {
        let code = "pub fn main() {\n  let x = \"\u{1F600}\"  \n  x\n}\n";
        let hints = of_severity(code, Severity::Hint);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].range, TextRange::on_line(2, 15, 17));
    }

    #[test]
    fn line_index_columns() {
        let lines = LineIndex::new("ab\n\u{e9}\u{1F600}x");
        assert_eq!(lines.column(0, 2), 3);
        assert_eq!(lines.column(1, 2), 2);
        assert_eq!(lines.column(1, 6), 4);
        assert_eq!(lines.column(5, 0), 1);
    }

    #[tokio::test]
    async fn analyzer_refuses_after_dispose() {
        let analyzer = LintAnalyzer::new().unwrap();
        assert!(analyzer.analyze_code("pub fn main() { 1 }").await.is_ok());
        analyzer.dispose();
        analyzer.dispose();
        assert!(analyzer.is_disposed());
        assert_eq!(
            analyzer.analyze_code("pub fn main() { 1 }").await,
            Err(AnalyzerError::Disposed)
        );
    }

    #[tokio::test]
    async fn identical_text_yields_identical_markers() {
        let analyzer = LintAnalyzer::new().unwrap();
        let code = "pub fn f( {\n  todo ";
        let first = analyzer.analyze_code(code).await.unwrap();
        let second = analyzer.analyze_code(code).await.unwrap();
        assert_eq!(first, second);
        assert!(!first.markers.is_empty());
    }

    proptest! {
        #[test]
        fn markers_stay_inside_the_text(code in "[ -~\t\n]{0,300}") {
            let line_count = code.split('\n').count();
            for marker in lint(&code) {
                let range = marker.range;
                prop_assert!(range.start_line >= 1);
                prop_assert!(range.start_line <= range.end_line);
                prop_assert!(range.end_line <= line_count);
                prop_assert!(range.start_line < range.end_line || range.start_column < range.end_column);
            }
        }

        #[test]
        fn integer_bodies_are_clean(n in 0u32..100_000) {
            let code = format!("pub fn main() {{\n  {n}\n}}\n");
            prop_assert!(lint(&code).is_empty());
        }
    }
}
