//! Startup report of bound repositories.

use log::info;

/// Collects one line per registration and renders them under a title.
#[derive(Debug, Clone)]
pub struct Reporter {
    title: String,
    lines: Vec<String>,
}

impl Reporter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Title followed by each line indented on its own row; `None` when
    /// nothing was recorded.
    pub fn render(&self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        let mut out = self.title.clone();
        for line in &self.lines {
            out.push_str("\n    ");
            out.push_str(line);
        }
        Some(out)
    }

    /// Logs the rendered report at info level and returns it.
    pub fn report(&self) -> Option<String> {
        let rendered = self.render()?;
        info!("{rendered}");
        Some(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::Reporter;

    #[test]
    fn empty_reporter_renders_nothing() {
        let reporter = Reporter::new("repositories = ");
        assert!(reporter.is_empty());
        assert_eq!(reporter.render(), None);
        assert_eq!(reporter.report(), None);
    }

    #[test]
    fn lines_render_indented_under_title() {
        let mut reporter = Reporter::new("repositories = ");
        reporter.line("(NoteRepository)");
        reporter.line("(TagRepository)");
        assert_eq!(
            reporter.render().as_deref(),
            Some("repositories = \n    (NoteRepository)\n    (TagRepository)")
        );
    }
}
