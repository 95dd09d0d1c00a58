use crate::span::Span;

/// A problem found while decoding external input (error or warning).
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
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    fn report<'a>(
        &'a self,
        filename: &'a str,
        source: &str,
        colored: bool,
    ) -> ariadne::Report<'a, (&'a str, std::ops::Range<usize>)> {
        use ariadne::{Color, Config, Label, Report, ReportKind};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        // ariadne addresses characters, spans address bytes
        let start = char_offset(source, self.span.start as usize);
        let end = char_offset(source, self.span.end as usize).max(start);

        let mut report = Report::build(kind, filename, start)
            .with_config(Config::default().with_color(colored))
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

        report.finish()
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::Source;

        if let Err(e) = self
            .report(filename, source, true)
            .eprint((filename, Source::from(source)))
        {
            log::warn!("cannot render diagnostic: {}", e);
        }
    }

    /// Render the diagnostic into a string without colors.
    pub fn render_to_string(&self, filename: &str, source: &str) -> String {
        use ariadne::Source;

        let mut buf = Vec::new();
        if let Err(e) = self
            .report(filename, source, false)
            .write((filename, Source::from(source)), &mut buf)
        {
            log::warn!("cannot render diagnostic: {}", e);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

fn char_offset(source: &str, byte: usize) -> usize {
    let byte = byte.min(source.len());
    source
        .char_indices()
        .take_while(|(i, _)| *i < byte)
        .count()
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(10, 15);
        let d = Diagnostic::error("unexpected character".to_string(), span);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "unexpected character");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_warning_construction() {
        let d = Diagnostic::warning("treated as string".to_string(), Span::dummy());
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.message, "treated as string");
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::error("unbound name".to_string(), Span::new(0, 5))
            .with_note("names must be bound before use".to_string())
            .with_help("`△` is the only predefined name".to_string())
            .with_note("note 2".to_string());
        assert_eq!(d.notes.len(), 2);
        assert_eq!(d.help.as_deref(), Some("`△` is the only predefined name"));
    }

    #[test]
    fn test_char_offset_counts_multibyte() {
        let source = "△ △ x";
        // '△' is three bytes wide
        assert_eq!(char_offset(source, 0), 0);
        assert_eq!(char_offset(source, 4), 2);
        assert_eq!(char_offset(source, 8), 4);
        assert_eq!(char_offset(source, 100), 5);
    }

    #[test]
    fn test_render_to_string_mentions_message() {
        let source = "2103";
        let d = Diagnostic::error("unexpected character '3'".to_string(), Span::at(3, 1));
        let out = d.render_to_string("input", source);
        assert!(out.contains("unexpected character '3'"));
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "△ (△ △";
        let d = Diagnostic::error("unmatched parenthesis".to_string(), Span::at(4, 1))
            .with_help("close the group with ')'".to_string());
        d.render("input", source);
        render_diagnostics(&[d], "input", source);
    }
}
