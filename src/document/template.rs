//! Header and footer chrome.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::types::{DocumentMeta, Theme};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_]+)\s*\}\}").expect("placeholder pattern compiles"));

/// Values for one sheet's placeholders.
#[derive(Debug, Clone, Copy)]
pub struct Placeholders<'a> {
    /// 1-based page number.
    pub page: usize,
    pub total: usize,
    pub meta: &'a DocumentMeta,
}

impl Placeholders<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        let value = match name.to_ascii_lowercase().as_str() {
            "page" => self.page.to_string(),
            "total" => self.total.to_string(),
            "unit" => self.meta.unit.clone(),
            "class" => self.meta.class.clone(),
            "date" => self.meta.date.clone(),
            "title" => self.meta.title.clone(),
            "subtitle" => self.meta.subtitle.clone(),
            _ => return None,
        };
        Some(value)
    }
}

/// Substitute `{{ name }}` placeholders, case-insensitively.
///
/// Unknown placeholders are kept verbatim.
///
/// ```
/// use folio::document::{render_template, DocumentMeta, Placeholders};
///
/// let meta = DocumentMeta { unit: "Unit 2".into(), ..DocumentMeta::default() };
/// let values = Placeholders { page: 3, total: 9, meta: &meta };
/// assert_eq!(
///     render_template("{{UNIT}} - {{ page }}/{{total}} {{nope}}", &values),
///     "Unit 2 - 3/9 {{nope}}"
/// );
/// ```
pub fn render_template(template: &str, values: &Placeholders<'_>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            values
                .lookup(&caps[1])
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Header or footer content for a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chrome {
    /// Theme template after substitution (may contain markup).
    Template(String),
    /// Built-in plain-text bar.
    Default(String),
}

impl Chrome {
    pub fn text(&self) -> &str {
        match self {
            Self::Template(text) | Self::Default(text) => text,
        }
    }
}

pub fn header_chrome(theme: Option<&Theme>, values: &Placeholders<'_>) -> Chrome {
    if let Some(template) = theme.and_then(Theme::header) {
        return Chrome::Template(render_template(template, values));
    }
    let page = format!("Page {} of {}", values.page, values.total);
    if values.meta.unit.trim().is_empty() {
        Chrome::Default(page)
    } else {
        Chrome::Default(format!("{} · {page}", values.meta.unit))
    }
}

pub fn footer_chrome(theme: Option<&Theme>, values: &Placeholders<'_>) -> Chrome {
    if let Some(template) = theme.and_then(Theme::footer) {
        return Chrome::Template(render_template(template, values));
    }
    if values.meta.title.trim().is_empty() {
        Chrome::Default(values.page.to_string())
    } else {
        Chrome::Default(format!("{} · {}", values.meta.title, values.page))
    }
}
