//! Compiler diagnostics rendered with file/line/col and a caret.

use crate::span::Span;

#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let start = self.span.start as usize;
        let end = (self.span.end as usize).max(start + 1);

        let mut report = Report::build(kind, filename, start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        let _ = report.finish().eprint((filename, Source::from(source)));
    }
}

/// A process-wide tally of diagnostics, mirroring the reference compiler's
/// global error counter: compilation proceeds through the end of a stage to
/// surface as many diagnostics as possible, then aborts if the count is
/// nonzero.
#[derive(Default, Debug)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        if diag.severity == Severity::Error {
            self.errors += 1;
        }
        self.diagnostics.push(diag);
    }

    pub fn had_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn render_all(&self, filename: &str, source: &str) {
        for diag in &self.diagnostics {
            diag.render(filename, source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_construction() {
        let d = Diagnostic::error("undefined subroutine 'f'", Span::new(10, 15, 2, 3));
        assert_eq!(d.severity, Severity::Error);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn chained_builders() {
        let d = Diagnostic::warning("unused variable", Span::dummy())
            .with_note("declared here")
            .with_help("remove it");
        assert_eq!(d.notes.len(), 1);
        assert!(d.help.is_some());
    }

    #[test]
    fn bag_tracks_error_count_only() {
        let mut bag = DiagnosticBag::new();
        assert!(!bag.had_errors());
        bag.push(Diagnostic::warning("cosmetic", Span::dummy()));
        assert!(!bag.had_errors());
        bag.push(Diagnostic::error("fatal", Span::dummy()));
        assert!(bag.had_errors());
        assert_eq!(bag.error_count(), 1);
    }

    #[test]
    fn render_does_not_panic() {
        let source = "sub main()\n    return 1\nend\n";
        let d = Diagnostic::error("undefined identifier 'x'", Span::new(15, 16, 2, 12));
        d.render("test.mb", source);
    }
}
