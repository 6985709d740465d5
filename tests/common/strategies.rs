use proptest::prelude::*;
use proptest::strategy::Just;
use tasker_plan::plan::DependencyKind;

/// Strategy for generating item names
pub fn item_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9]{0,15}".prop_map(|name| format!(":{name}"))
}

/// Strategy for generating fixed acyclic DAG structures
pub fn acyclic_dag_strategy() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop_oneof![
        Just(vec![(0, 1)]),                 // Simple 2-node chain
        Just(vec![(0, 1), (1, 2)]),         // Simple 3-node chain
        Just(vec![(0, 1), (0, 2), (1, 2)]), // Triangle DAG
        Just(vec![(0, 1), (0, 2)]),         // Fan-out from 0
        Just(vec![(0, 2), (1, 2)]),         // Fan-in to 2
    ]
}

/// Strategy for generating dependency kinds, biased towards hard edges
pub fn dependency_kind_strategy() -> impl Strategy<Value = DependencyKind> {
    prop_oneof![
        3 => Just(DependencyKind::Hard),
        1 => Just(DependencyKind::Ordering),
    ]
}

/// A randomly generated acyclic work graph.
///
/// Edges always point from a lower to a higher index, so `(from, to, _)`
/// means `to` waits for `from`.
#[derive(Debug, Clone)]
pub struct RandomDag {
    pub item_count: usize,
    pub group_count: usize,
    /// Ordinal group of each item
    pub groups: Vec<usize>,
    pub edges: Vec<(usize, usize, DependencyKind)>,
}

impl RandomDag {
    pub fn dependencies_of(&self, item: usize) -> impl Iterator<Item = (usize, DependencyKind)> + '_ {
        self.edges
            .iter()
            .filter(move |(_, to, _)| *to == item)
            .map(|(from, _, kind)| (*from, *kind))
    }
}

/// Strategy for generating random acyclic graphs of 1..=`max_items` items
pub fn random_dag_strategy(max_items: usize) -> impl Strategy<Value = RandomDag> {
    (1usize..=max_items, 1usize..=3).prop_flat_map(|(item_count, group_count)| {
        let groups = prop::collection::vec(0..group_count, item_count);
        let edges = prop::collection::vec(
            (0..item_count, 0..item_count, dependency_kind_strategy()),
            0..item_count * 2,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .filter(|(a, b, _)| a != b)
                .map(|(a, b, kind)| (a.min(b), a.max(b), kind))
                .collect::<Vec<_>>()
        });
        (Just(item_count), Just(group_count), groups, edges).prop_map(
            |(item_count, group_count, groups, edges)| RandomDag {
                item_count,
                group_count,
                groups,
                edges,
            },
        )
    })
}

/// Strategy for choosing which items fail, as a per-item flag
pub fn failure_flags_strategy(item_count: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(prop::bool::weighted(0.2), item_count)
}

/// Realistic build graph shapes
#[derive(Debug, Clone)]
pub enum WorkflowPattern {
    Linear(usize),                // Linear chain of N items
    Diamond,                      // Diamond: 1->2,3->4 pattern
    FanOut(usize),                // 1 -> N pattern
    FanIn(usize),                 // N -> 1 pattern
    Complex(Vec<(usize, usize)>), // Custom DAG structure
}

pub fn workflow_pattern_strategy() -> impl Strategy<Value = WorkflowPattern> {
    prop_oneof![
        (2usize..=10).prop_map(WorkflowPattern::Linear),
        Just(WorkflowPattern::Diamond),
        (2usize..=8).prop_map(WorkflowPattern::FanOut),
        (2usize..=8).prop_map(WorkflowPattern::FanIn),
        acyclic_dag_strategy().prop_map(WorkflowPattern::Complex),
    ]
}

impl WorkflowPattern {
    /// Get the number of items in this pattern
    pub fn item_count(&self) -> usize {
        match self {
            WorkflowPattern::Linear(n) => *n,
            WorkflowPattern::Diamond => 4,
            WorkflowPattern::FanOut(n) => n + 1,
            WorkflowPattern::FanIn(n) => n + 1,
            WorkflowPattern::Complex(edges) => edges
                .iter()
                .flat_map(|(from, to)| [*from, *to])
                .max()
                .map(|max| max + 1)
                .unwrap_or(1),
        }
    }

    /// Get the edges for this pattern; `(from, to)` means `to` waits for `from`
    pub fn edges(&self) -> Vec<(usize, usize)> {
        match self {
            WorkflowPattern::Linear(n) => (0..(*n - 1)).map(|i| (i, i + 1)).collect(),
            WorkflowPattern::Diamond => vec![(0, 1), (0, 2), (1, 3), (2, 3)],
            WorkflowPattern::FanOut(n) => (1..=*n).map(|i| (0, i)).collect(),
            WorkflowPattern::FanIn(n) => (0..*n).map(|i| (i, *n)).collect(),
            WorkflowPattern::Complex(edges) => edges.clone(),
        }
    }

    /// Length of the longest dependency chain, counted in items
    pub fn critical_path(&self) -> usize {
        let count = self.item_count();
        let mut depth = vec![1usize; count];
        let mut edges = self.edges();
        edges.sort_by_key(|(from, _)| *from);
        for (from, to) in edges {
            depth[to] = depth[to].max(depth[from] + 1);
        }
        depth.into_iter().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_random_dag_edges_point_forward(dag in random_dag_strategy(12)) {
            prop_assert_eq!(dag.groups.len(), dag.item_count);
            for (from, to, _) in &dag.edges {
                prop_assert!(from < to);
                prop_assert!(*to < dag.item_count);
            }
        }

        #[test]
        fn test_item_names_are_prefixed(name in item_name_strategy()) {
            prop_assert!(name.starts_with(':'));
            prop_assert!(name.len() >= 2);
        }
    }

    #[test]
    fn test_workflow_patterns() {
        let linear = WorkflowPattern::Linear(3);
        assert_eq!(linear.item_count(), 3);
        assert_eq!(linear.edges(), vec![(0, 1), (1, 2)]);
        assert_eq!(linear.critical_path(), 3);

        let diamond = WorkflowPattern::Diamond;
        assert_eq!(diamond.item_count(), 4);
        assert_eq!(diamond.critical_path(), 3);

        let fan_in = WorkflowPattern::FanIn(3);
        assert_eq!(fan_in.item_count(), 4);
        assert_eq!(fan_in.edges(), vec![(0, 3), (1, 3), (2, 3)]);
        assert_eq!(fan_in.critical_path(), 2);
    }
}
