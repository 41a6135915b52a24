//! Core document types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Which pages receive the theme background image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BgScope {
    #[default]
    All,
    First,
}

/// Visual theme for the page sheets.
///
/// Every field is optional in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub page_bg: Option<String>,
    pub body_bg: Option<String>,
    pub text: Option<String>,
    pub accent: Option<String>,
    pub accent2: Option<String>,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
    pub page_bg_image: Option<String>,
    pub bg_scope: BgScope,
    /// Zero-based indices of pages that never get the background image.
    pub bg_disabled_pages: BTreeSet<usize>,
}

impl Theme {
    /// Background image for the page at `index`, if any.
    pub fn background_for(&self, index: usize) -> Option<&str> {
        let image = self.page_bg_image.as_deref().filter(|s| !s.trim().is_empty())?;
        if self.bg_disabled_pages.contains(&index) {
            return None;
        }
        match self.bg_scope {
            BgScope::All => Some(image),
            BgScope::First if index == 0 => Some(image),
            BgScope::First => None,
        }
    }

    /// Accent colours in top-to-bottom order.
    pub fn accent_bars(&self) -> Vec<String> {
        [&self.accent, &self.accent2]
            .into_iter()
            .flatten()
            .filter(|colour| !colour.trim().is_empty())
            .cloned()
            .collect()
    }

    /// Header template, ignoring blank ones.
    pub fn header(&self) -> Option<&str> {
        self.header_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }

    /// Footer template, ignoring blank ones.
    pub fn footer(&self) -> Option<&str> {
        self.footer_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Book-level values available to header and footer templates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMeta {
    pub title: String,
    pub subtitle: String,
    pub unit: String,
    pub class: String,
    pub date: String,
}

/// Snapshot of one page as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    pub index: usize,
    pub source: String,
    pub is_sparse: bool,
    pub is_dirty: bool,
    pub is_selected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme_with_bg(scope: BgScope) -> Theme {
        Theme {
            page_bg_image: Some("paper.png".to_string()),
            bg_scope: scope,
            ..Theme::default()
        }
    }

    #[test]
    fn test_background_applies_to_all_pages() {
        let theme = theme_with_bg(BgScope::All);
        assert_eq!(theme.background_for(0), Some("paper.png"));
        assert_eq!(theme.background_for(7), Some("paper.png"));
    }

    #[test]
    fn test_background_first_scope() {
        let theme = theme_with_bg(BgScope::First);
        assert_eq!(theme.background_for(0), Some("paper.png"));
        assert_eq!(theme.background_for(1), None);
    }

    #[test]
    fn test_background_disabled_page() {
        let mut theme = theme_with_bg(BgScope::All);
        theme.bg_disabled_pages.insert(2);
        assert_eq!(theme.background_for(2), None);
        assert_eq!(theme.background_for(3), Some("paper.png"));
    }

    #[test]
    fn test_theme_deserializes_partial_json() {
        let theme: Theme = serde_json::from_str(
            r##"{"accent": "#c00", "bg_scope": "first", "bg_disabled_pages": [1, 3]}"##,
        )
        .unwrap();
        assert_eq!(theme.accent.as_deref(), Some("#c00"));
        assert_eq!(theme.bg_scope, BgScope::First);
        assert!(theme.bg_disabled_pages.contains(&3));
        assert!(theme.header_template.is_none());
    }

    #[test]
    fn test_accent_bars_skip_blank() {
        let theme = Theme {
            accent: Some(" ".to_string()),
            accent2: Some("#00f".to_string()),
            ..Theme::default()
        };
        assert_eq!(theme.accent_bars(), vec!["#00f".to_string()]);
    }

    #[test]
    fn test_blank_templates_are_absent() {
        let theme = Theme {
            header_template: Some("   ".to_string()),
            footer_template: Some("{{page}}".to_string()),
            ..Theme::default()
        };
        assert!(theme.header().is_none());
        assert_eq!(theme.footer(), Some("{{page}}"));
    }
}
