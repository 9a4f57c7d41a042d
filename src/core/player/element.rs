use serde::Serialize;

/// Opaque host-side identity of a DOM element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ElementHandle(pub u64);

/// One element as seen by the host at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    pub handle: ElementHandle,
    pub tag_name: String,
    pub id: String,
    pub class_list: Vec<String>,
    pub width: f64,
    pub height: f64,
}

impl ElementSnapshot {
    pub fn new(handle: u64, tag_name: &str, width: f64, height: f64) -> Self {
        Self {
            handle: ElementHandle(handle),
            tag_name: tag_name.to_ascii_lowercase(),
            id: String::new(),
            class_list: Vec::new(),
            width,
            height,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_classes(mut self, classes: &[&str]) -> Self {
        self.class_list = classes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_list.iter().any(|c| c == class)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScoreDetails {
    pub player_size_penalty: f64,
    pub diff_x: f64,
    pub diff_y: f64,
    pub penalty_multiplier: u32,
}

/// Why an entry was or wasn't scored during the last locate pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Heuristics {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub invalid_size: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_score_details: Option<AutoScoreDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qs_score: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub manual_element_by_parent_index: bool,
}

/// An ancestor of the video surface captured for one locate pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStackEntry {
    #[serde(flatten)]
    pub element: ElementSnapshot,
    pub auto_score: Option<f64>,
    pub heuristics: Heuristics,
}

impl ElementStackEntry {
    pub fn from_snapshot(element: ElementSnapshot) -> Self {
        Self {
            element,
            auto_score: None,
            heuristics: Heuristics::default(),
        }
    }

    pub fn handle(&self) -> ElementHandle {
        self.element.handle
    }

    pub fn width(&self) -> f64 {
        self.element.width
    }

    pub fn height(&self) -> f64 {
        self.element.height
    }

    pub fn has_valid_size(&self) -> bool {
        self.element.width > 0.0 && self.element.height > 0.0
    }
}

/// `a` lies strictly within `tolerance` of `b`.
pub fn equalish(a: f64, b: f64, tolerance: f64) -> bool {
    a > b - tolerance && a < b + tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equalish_is_strict() {
        assert!(equalish(100.0, 104.9, 5.0));
        assert!(!equalish(100.0, 105.0, 5.0));
        assert!(equalish(100.0, 96.0, 5.0));
    }

    #[test]
    fn test_entry_serializes_heuristics_compactly() {
        let mut entry = ElementStackEntry::from_snapshot(
            ElementSnapshot::new(7, "DIV", 0.0, 720.0).with_id("player"),
        );
        entry.heuristics.invalid_size = true;

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["tagName"], "div");
        assert_eq!(json["id"], "player");
        assert_eq!(json["heuristics"]["invalidSize"], true);
        assert!(json["heuristics"].get("qsScore").is_none());
        assert!(!entry.has_valid_size());
    }
}
