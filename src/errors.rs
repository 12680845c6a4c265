//! Shared diagnostic infrastructure: source spans, the compiler-wide
//! error sink, and the `ErrorEmitted` witness carried by error-sentinel
//! AST nodes.

use std::{cell::RefCell, error::Error, fmt::Display, rc::Rc};

use colored::Colorize;

/// A loaded source file. Spans keep a shared handle to it so diagnostics
/// can render the offending line without re-reading the file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl ToString, content: impl ToString) -> Rc<SourceFile> {
        Rc::new(SourceFile {
            name: name.to_string(),
            content: content.to_string(),
        })
    }
}

/// A region of a source file. `start` and `end` are zero based
/// (line, column) pairs; `end` is exclusive.
#[derive(Clone, Debug)]
pub struct Span {
    pub start: (usize, usize),
    pub end: (usize, usize),
    pub source: Rc<SourceFile>,
}

impl Default for Span {
    fn default() -> Self {
        Span {
            start: (0, 0),
            end: (0, 0),
            source: Rc::new(SourceFile::default()),
        }
    }
}

impl PartialEq for Span {
    fn eq(&self, _other: &Span) -> bool {
        // spans never participate in node equality
        true
    }
}

impl Eq for Span {}

impl Span {
    /// Render this span with a message, pointing at the offending source
    /// line.
    pub fn to_string(&self, msg: impl ToString) -> String {
        let msg = msg.to_string();
        let (line, col) = self.start;
        let lines = self.source.content.lines().collect::<Vec<_>>();

        let Some(line_str) = lines.get(line) else {
            return format!("{}: {msg}", self.source.name);
        };

        let gutter = format!("{}", line + 1);
        let pad = " ".repeat(gutter.len());

        let width = if self.end.0 == line && self.end.1 > col {
            self.end.1 - col
        } else {
            line_str.len().saturating_sub(col)
        };
        let carets = "^".repeat(width.max(1));

        format!(
            "{name}:{l}:{c}\n{pad} |\n{gutter} | {line_str}\n{pad} | {caret_pad}{carets} {msg}",
            name = self.source.name,
            l = line + 1,
            c = col + 1,
            caret_pad = " ".repeat(col),
            carets = carets.red(),
        )
    }

    /// Combine two spans into one covering both.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
            source: Rc::clone(&self.source),
        }
    }
}

/// A recoverable diagnostic. Emitting one never aborts a phase; the
/// emitting site substitutes an error sentinel and carries on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerError {
    pub message: String,
    pub span: Span,
}

impl Display for CompilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.span.to_string(&self.message).as_str())
    }
}

impl Error for CompilerError {}

/// Witness that a diagnostic has been emitted. Error-sentinel nodes carry
/// one, which is only obtainable from [`ErrorSink::emit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorEmitted(());

/// Monotonically accumulating list of diagnostics shared by all phases of
/// a compilation. Cheap to clone; all clones feed the same list.
#[derive(Clone, Debug, Default)]
pub struct ErrorSink {
    inner: Rc<RefCell<Vec<CompilerError>>>,
}

impl ErrorSink {
    pub fn new() -> ErrorSink {
        ErrorSink::default()
    }

    pub fn emit(&self, message: impl ToString, span: Span) -> ErrorEmitted {
        let message = message.to_string();
        log::debug!("diagnostic: {message}");
        self.inner.borrow_mut().push(CompilerError { message, span });
        ErrorEmitted(())
    }

    pub fn has_errors(&self) -> bool {
        !self.inner.borrow().is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn errors(&self) -> Vec<CompilerError> {
        self.inner.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_accumulates() {
        let sink = ErrorSink::new();
        assert!(!sink.has_errors());

        sink.emit("first", Span::default());
        sink.emit("second", Span::default());

        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 2);
        assert_eq!(sink.errors()[0].message, "first");
    }

    #[test]
    fn test_clones_share_the_list() {
        let sink = ErrorSink::new();
        let other = sink.clone();

        other.emit("oops", Span::default());

        assert!(sink.has_errors());
    }

    #[test]
    fn test_span_render_points_at_line() {
        let source = SourceFile::new("main.weft", "let a = 1;\nlet b = ;");
        let span = Span {
            start: (1, 8),
            end: (1, 9),
            source,
        };

        let rendered = span.to_string("expected expression");
        assert!(rendered.contains("main.weft:2:9"));
        assert!(rendered.contains("let b = ;"));
    }

    #[test]
    fn test_span_merge_covers_both() {
        let source = SourceFile::new("main.weft", "let a = 1;");
        let first = Span {
            start: (0, 0),
            end: (0, 3),
            source: std::rc::Rc::clone(&source),
        };
        let second = Span {
            start: (0, 8),
            end: (0, 9),
            source,
        };

        let merged = first.merge(&second);
        assert_eq!(merged.start, (0, 0));
        assert_eq!(merged.end, (0, 9));
    }

    #[test]
    fn test_render_survives_out_of_range_spans() {
        let source = SourceFile::new("main.weft", "");
        let span = Span {
            start: (5, 2),
            end: (5, 3),
            source,
        };

        let rendered = span.to_string("boom");
        assert!(rendered.contains("main.weft"));
        assert!(rendered.contains("boom"));
    }
}
