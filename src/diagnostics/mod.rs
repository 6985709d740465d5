//! # Plan Health Diagnostics
//!
//! Snapshot types used to explain an apparently stuck plan. Not performance
//! critical and not a machine contract: the text form is for humans.

pub mod tree_formatter;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use tree_formatter::TreeFormatter;

/// Basic diagnostic information about the state of a work source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    display_name: String,
    ordinal_groups: Vec<String>,
    queued_items: Vec<String>,
    other_items: Vec<String>,
}

impl Diagnostics {
    pub fn new(
        display_name: impl Into<String>,
        ordinal_groups: Vec<String>,
        queued_items: Vec<String>,
        other_items: Vec<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            ordinal_groups,
            queued_items,
            other_items,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn ordinal_groups(&self) -> &[String] {
        &self.ordinal_groups
    }

    pub fn queued_items(&self) -> &[String] {
        &self.queued_items
    }

    pub fn other_items(&self) -> &[String] {
        &self.other_items
    }

    pub fn describe_to(&self, formatter: &mut TreeFormatter) {
        if !self.queued_items.is_empty() {
            formatter.node(format!("Queued nodes for {}", self.display_name));
            formatter.start_children();
            for item in &self.queued_items {
                formatter.node(item);
            }
            formatter.end_children();
        }
        if !self.other_items.is_empty() {
            formatter.node(format!("Non-queued nodes for {}", self.display_name));
            formatter.start_children();
            for item in &self.other_items {
                formatter.node(item);
            }
            formatter.end_children();
        }
        formatter.node(format!("Ordinal groups for {}", self.display_name));
        formatter.start_children();
        for group in &self.ordinal_groups {
            formatter.node(group);
        }
        formatter.end_children();
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formatter = TreeFormatter::new();
        self.describe_to(&mut formatter);
        write!(f, "{formatter}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sections_are_omitted() {
        let diagnostics = Diagnostics::new(
            "build",
            vec!["group 0 (not started: 0, not finished: 0)".to_string()],
            vec![],
            vec![],
        );
        assert_eq!(
            diagnostics.to_string(),
            "Ordinal groups for build\n  - group 0 (not started: 0, not finished: 0)\n"
        );
    }

    #[test]
    fn test_full_report() {
        let diagnostics = Diagnostics::new(
            "build",
            vec!["group 0".to_string()],
            vec![":test (queued)".to_string()],
            vec![":jar (executing)".to_string()],
        );
        let text = diagnostics.to_string();
        assert!(text.starts_with("Queued nodes for build\n  - :test (queued)\n"));
        assert!(text.contains("Non-queued nodes for build\n  - :jar (executing)\n"));
        assert!(text.ends_with("Ordinal groups for build\n  - group 0\n"));
    }
}
