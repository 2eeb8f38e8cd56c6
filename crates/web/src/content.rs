//! Marketing content loaded from markdown.
//!
//! Markdown files under the content directory are grouped in three sections:
//!
//! ```text
//! content/
//!   pages/       about, pricing, contact
//!   solutions/   one page per business type (kirana, boutique, ...)
//!   features/    one page per product feature (ai-upload, whatsapp, ...)
//! ```
//!
//! Each file carries YAML frontmatter and is rendered to HTML once at startup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use comrak::{Options, markdown_to_html};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use serde::Deserialize;

/// Content section, one directory each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Pages,
    Solutions,
    Features,
}

impl Section {
    pub const ALL: [Self; 3] = [Self::Pages, Self::Solutions, Self::Features];

    const fn dir(self) -> &'static str {
        match self {
            Self::Pages => "pages",
            Self::Solutions => "solutions",
            Self::Features => "features",
        }
    }
}

/// Frontmatter of a content page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Short line shown on cards linking to the page.
    #[serde(default)]
    pub summary: Option<String>,
    /// Position in listings; lower first.
    #[serde(default)]
    pub order: Option<u32>,
}

/// A rendered page.
#[derive(Debug, Clone)]
pub struct Page {
    pub slug: String,
    pub meta: PageMeta,
    pub content_html: String,
}

/// All marketing content, held in memory.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    sections: Arc<HashMap<Section, Vec<Page>>>,
}

impl ContentStore {
    /// Load every section from `content_dir`.
    ///
    /// Missing section directories are logged and left empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a section directory exists but cannot be read.
    pub fn load(content_dir: &Path) -> Result<Self, ContentError> {
        let mut sections = HashMap::new();
        for section in Section::ALL {
            let pages = load_section(&content_dir.join(section.dir()))?;
            sections.insert(section, pages);
        }
        Ok(Self {
            sections: Arc::new(sections),
        })
    }

    /// Look up a page by slug.
    #[must_use]
    pub fn get(&self, section: Section, slug: &str) -> Option<&Page> {
        self.list(section).iter().find(|p| p.slug == slug)
    }

    /// Pages of a section in listing order.
    #[must_use]
    pub fn list(&self, section: Section) -> &[Page] {
        self.sections.get(&section).map_or(&[], Vec::as_slice)
    }
}

fn load_section(dir: &Path) -> Result<Vec<Page>, ContentError> {
    let mut pages = Vec::new();

    if !dir.exists() {
        tracing::warn!("Content directory does not exist: {:?}", dir);
        return Ok(pages);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ContentError::Io(e.to_string()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "md") {
            match load_page(&path) {
                Ok(page) => {
                    tracing::debug!("Loaded page: {}", page.slug);
                    pages.push(page);
                }
                Err(e) => tracing::error!("Failed to load page {:?}: {}", path, e),
            }
        }
    }

    pages.sort_by(|a, b| {
        a.meta
            .order
            .unwrap_or(u32::MAX)
            .cmp(&b.meta.order.unwrap_or(u32::MAX))
            .then_with(|| a.slug.cmp(&b.slug))
    });
    Ok(pages)
}

fn load_page(path: &Path) -> Result<Page, ContentError> {
    let content = std::fs::read_to_string(path).map_err(|e| ContentError::Io(e.to_string()))?;

    let slug = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ContentError::Parse("Invalid filename".to_string()))?
        .to_string();

    parse_page(slug, &content)
}

fn parse_page(slug: String, content: &str) -> Result<Page, ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<PageMeta> = matter
        .parse(content)
        .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

    Ok(Page {
        slug,
        meta,
        content_html: render_markdown(&parsed.content),
    })
}

/// Render markdown with the GitHub extensions used by the marketing copy.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.header_ids = Some(String::new());
    markdown_to_html(content, &options)
}

/// Content loading errors
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_renders_markdown() {
        let page = parse_page(
            "kirana".to_string(),
            "---\ntitle: Kirana stores\nsummary: Take your corner shop online\norder: 2\n---\n\n## Why\n\n| a | b |\n|---|---|\n| 1 | 2 |\n",
        )
        .unwrap();
        assert_eq!(page.meta.title, "Kirana stores");
        assert_eq!(page.meta.order, Some(2));
        assert!(page.content_html.contains("<h2"));
        assert!(page.content_html.contains("<table>"));
    }

    #[test]
    fn test_parse_page_requires_frontmatter() {
        assert!(parse_page("x".to_string(), "# No frontmatter").is_err());
    }

    #[test]
    fn test_raw_html_is_not_rendered() {
        let page = parse_page(
            "x".to_string(),
            "---\ntitle: X\n---\n<script>alert(1)</script>\n",
        )
        .unwrap();
        assert!(!page.content_html.contains("<script>"));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let store = ContentStore::load(Path::new("/nonexistent/bizgrow-content")).unwrap();
        assert!(store.list(Section::Solutions).is_empty());
        assert!(store.get(Section::Pages, "about").is_none());
    }
}
