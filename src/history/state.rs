use crate::catalog::{AssetShortHeader, OpenedPack};

use super::page::{FiltersState, Page, PageTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Applied,
    Noop,
}

/// Back-stack of store pages. Never empty; the last page is current.
///
/// Callers save the scroll offset of the page they are leaving before
/// pushing; pushing does not capture it.
#[derive(Debug, Clone)]
pub struct NavigationHistory {
    pages: Vec<Page>,
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self {
            pages: vec![Page::home()],
        }
    }

    pub fn current(&self) -> &Page {
        self.pages
            .last()
            .unwrap_or_else(|| unreachable!("navigation history is never empty"))
    }

    pub fn current_mut(&mut self) -> &mut Page {
        self.pages
            .last_mut()
            .unwrap_or_else(|| unreachable!("navigation history is never empty"))
    }

    pub fn depth(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn open_home(&mut self) {
        self.push(Page::home());
    }

    pub fn open_pack(&mut self, pack: OpenedPack) {
        self.push(Page::new(PageTarget::Pack(pack)));
    }

    pub fn open_tag(&mut self, tag: impl Into<String>) {
        self.push(Page::new(PageTarget::Tag(tag.into())));
    }

    pub fn open_detail(&mut self, asset: AssetShortHeader) {
        self.push(Page::new(PageTarget::Detail(asset)));
    }

    pub fn back(&mut self) -> NavOutcome {
        if self.pages.len() <= 1 {
            return NavOutcome::Noop;
        }
        self.pages.pop();
        NavOutcome::Applied
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.pages.push(Page::home());
    }

    /// Switches the current page to free-text search intent in place.
    ///
    /// A home page becomes a search page. Any other page keeps its position
    /// in the stack but loses its pack or tag context so stale filters do
    /// not leak into the query.
    pub fn activate_textual_search(&mut self) {
        let current = self.current_mut();
        match current.target {
            PageTarget::Search => {}
            _ => {
                current.target = PageTarget::Search;
                current.filters = FiltersState::default();
            }
        }
    }

    pub fn save_scroll_position(&mut self, offset: f64) {
        self.current_mut().scroll_position = Some(offset);
    }

    pub fn take_scroll_position(&mut self) -> Option<f64> {
        self.current_mut().scroll_position.take()
    }

    fn push(&mut self, page: Page) {
        tracing::trace!(kind = ?page.kind(), depth = self.pages.len() + 1, "navigation push");
        self.pages.push(page);
    }
}
