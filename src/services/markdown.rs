use comrak::{markdown_to_html, Options};

/// Turns fetched readme text into displayable markup.
pub trait ContentRenderer {
    fn render(&self, text: &str) -> String;
}

/// GitHub-flavoured markdown through comrak. Raw HTML in the source is not
/// passed through.
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::default();
        options.extension.table = true;
        options.extension.strikethrough = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;
        options.render.unsafe_ = false;
        Self { options }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRenderer for MarkdownRenderer {
    fn render(&self, text: &str) -> String {
        markdown_to_html(text, &self.options)
    }
}
