use std::collections::BTreeSet;

use crate::catalog::{AssetShortHeader, OpenedPack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Home,
    PackPage,
    TagPage,
    SearchPage,
    DetailPage,
}

/// What a page shows. Exactly one identity per page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageTarget {
    Home,
    Pack(OpenedPack),
    Tag(String),
    Search,
    Detail(AssetShortHeader),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FiltersState {
    pub chosen_category: Option<String>,
    pub chosen_filters: BTreeSet<String>,
}

impl FiltersState {
    pub fn for_category(category: impl Into<String>) -> Self {
        Self {
            chosen_category: Some(category.into()),
            chosen_filters: BTreeSet::new(),
        }
    }

    pub fn clear_all(&mut self) {
        self.chosen_category = None;
        self.chosen_filters.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.chosen_category.is_none() && self.chosen_filters.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub target: PageTarget,
    pub filters: FiltersState,
    /// Saved when leaving the page, consumed once when coming back.
    pub scroll_position: Option<f64>,
}

impl Page {
    pub fn new(target: PageTarget) -> Self {
        let filters = match &target {
            PageTarget::Tag(tag) => FiltersState::for_category(tag.clone()),
            _ => FiltersState::default(),
        };
        Self {
            target,
            filters,
            scroll_position: None,
        }
    }

    pub fn home() -> Self {
        Self::new(PageTarget::Home)
    }

    pub fn kind(&self) -> PageKind {
        match self.target {
            PageTarget::Home => PageKind::Home,
            PageTarget::Pack(_) => PageKind::PackPage,
            PageTarget::Tag(_) => PageKind::TagPage,
            PageTarget::Search => PageKind::SearchPage,
            PageTarget::Detail(_) => PageKind::DetailPage,
        }
    }

    pub fn is_on_home_page(&self) -> bool {
        matches!(self.target, PageTarget::Home)
    }

    pub fn opened_asset_pack(&self) -> Option<&OpenedPack> {
        match &self.target {
            PageTarget::Pack(pack) => Some(pack),
            _ => None,
        }
    }

    pub fn opened_tag(&self) -> Option<&str> {
        match &self.target {
            PageTarget::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn opened_asset_short_header(&self) -> Option<&AssetShortHeader> {
        match &self.target {
            PageTarget::Detail(asset) => Some(asset),
            _ => None,
        }
    }

    /// Header title: the pack name, else the chosen category.
    pub fn title(&self) -> Option<String> {
        if let Some(pack) = self.opened_asset_pack() {
            return Some(pack.name().to_string());
        }
        self.filters
            .chosen_category
            .as_deref()
            .map(capitalize)
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
