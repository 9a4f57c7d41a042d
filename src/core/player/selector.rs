use regex::Regex;

use crate::core::player::element::ElementSnapshot;
use crate::core::settings::SettingsError;

/// `tag#id.class` style compound selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl CompoundSelector {
    pub fn matches(&self, element: &ElementSnapshot) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if &element.id != id {
                return false;
            }
        }
        self.classes.iter().all(|class| element.has_class(class))
    }
}

/// Comma separated selector list from site settings.
///
/// Combinators are not evaluated: only the right-most compound of each
/// complex selector is matched against the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSet {
    selectors: Vec<CompoundSelector>,
}

impl SelectorSet {
    pub fn parse(input: &str) -> Result<Self, SettingsError> {
        let compound = Regex::new(r"^(\*|[A-Za-z][A-Za-z0-9-]*)?((?:[#.][A-Za-z0-9_-]+)*)$")
            .map_err(|e| SettingsError::InvalidSelector(e.to_string()))?;
        let part = Regex::new(r"([#.])([A-Za-z0-9_-]+)")
            .map_err(|e| SettingsError::InvalidSelector(e.to_string()))?;

        let mut selectors = Vec::new();

        for raw in input.split(',') {
            let last = raw
                .split(|c: char| c.is_whitespace() || c == '>' || c == '+' || c == '~')
                .filter(|s| !s.is_empty())
                .last()
                .ok_or_else(|| SettingsError::InvalidSelector(input.to_string()))?;

            let caps = compound
                .captures(last)
                .ok_or_else(|| SettingsError::InvalidSelector(raw.trim().to_string()))?;

            let tag = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|t| *t != "*")
                .map(|t| t.to_ascii_lowercase());

            let mut id = None;
            let mut classes = Vec::new();
            if let Some(rest) = caps.get(2) {
                for p in part.captures_iter(rest.as_str()) {
                    match &p[1] {
                        "#" => id = Some(p[2].to_string()),
                        _ => classes.push(p[2].to_string()),
                    }
                }
            }

            selectors.push(CompoundSelector { tag, id, classes });
        }

        Ok(Self { selectors })
    }

    pub fn matches(&self, element: &ElementSnapshot) -> bool {
        self.selectors.iter().any(|s| s.matches(element))
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}
