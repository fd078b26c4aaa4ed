use std::fs;
use std::path::Path;
use anyhow::{Context, Result};

const BUILTIN_PAGE: &str = "\
# docchat

Open a documentation page with `docchat path/to/page.md`.

Select text with the mouse to ask about it, or press `c` to open the
assistant and ask a free-form question.

## Keys

- j / k, PageUp / PageDown: scroll the page
- c: open or close the assistant
- Tab: move focus between the page and the assistant
- q: quit
";

/// The documentation page shown behind the widget
pub struct Page {
    pub title: String,
    pub lines: Vec<String>,
    pub scroll: usize,
}

impl Page {
    pub fn from_text(title: impl Into<String>, text: &str) -> Self {
        Self {
            title: title.into(),
            // Tabs would throw mouse columns out of step with chars.
            lines: text.lines().map(|l| l.replace('\t', "    ")).collect(),
            scroll: 0,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Could not read page {}", path.display()))?;
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_text(title, &text))
    }

    pub fn builtin() -> Self {
        Self::from_text("Welcome", BUILTIN_PAGE)
    }

    pub fn max_scroll(&self, height: usize) -> usize {
        self.lines.len().saturating_sub(height.max(1))
    }

    pub fn scroll_by(&mut self, delta: isize, height: usize) {
        let target = self.scroll as isize + delta;
        self.scroll = target.clamp(0, self.max_scroll(height) as isize) as usize;
    }
}
