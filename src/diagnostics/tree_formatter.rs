use std::fmt;

/// Builds indented, human-readable trees for operator-facing reports.
///
/// ```rust
/// use tasker_plan::diagnostics::TreeFormatter;
///
/// let mut formatter = TreeFormatter::new();
/// formatter.node("Queued nodes for build");
/// formatter.start_children();
/// formatter.node(":compileJava");
/// formatter.end_children();
/// assert_eq!(formatter.to_string(), "Queued nodes for build\n  - :compileJava\n");
/// ```
#[derive(Debug, Default, Clone)]
pub struct TreeFormatter {
    output: String,
    depth: usize,
}

impl TreeFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node at the current depth
    pub fn node(&mut self, text: impl AsRef<str>) {
        if self.depth > 0 {
            for _ in 1..self.depth {
                self.output.push_str("    ");
            }
            self.output.push_str("  - ");
        }
        self.output.push_str(text.as_ref());
        self.output.push('\n');
    }

    /// Nodes appended after this call are children of the previous node
    pub fn start_children(&mut self) {
        self.depth += 1;
    }

    pub fn end_children(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

impl fmt::Display for TreeFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_children() {
        let mut formatter = TreeFormatter::new();
        formatter.node("root");
        formatter.start_children();
        formatter.node("child");
        formatter.start_children();
        formatter.node("grandchild");
        formatter.end_children();
        formatter.end_children();
        formatter.node("sibling");
        assert_eq!(
            formatter.to_string(),
            "root\n  - child\n      - grandchild\nsibling\n"
        );
    }
}
