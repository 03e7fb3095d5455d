//! The department tree.
//!
//! The [`Registry`] is rebuilt wholesale from flat [`DeptRow`]s. Nodes live in
//! a single graph arena and refer to each other by index, with edges
//! pointing from parent to child. A virtual root ([`ROOT_ID`]) always exists
//! and adopts every department whose parent cannot be resolved.

use std::collections::{hash_map::Entry, BTreeSet, HashMap};

use petgraph::{
    algo::has_path_connecting,
    graph::{DiGraph, NodeIndex},
    visit::Dfs,
    Direction,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Identifier of the virtual root department.
pub const ROOT_ID: i64 = 0;

/// Business code of the virtual root department.
pub const ROOT_CODE: i64 = 0;

/// Display name of the virtual root department.
pub const ROOT_NAME: &str = "all departments";

/// A department row as stored by the persistent store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeptRow {
    /// Store-assigned identifier.
    pub id: i64,
    /// Business-facing department code.
    pub code: i64,
    /// Display name.
    pub name: String,
    /// Identifier of the parent department. `None` means top level.
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl DeptRow {
    /// Creates a row.
    #[must_use]
    pub fn new(id: i64, code: i64, name: impl Into<String>, parent_id: Option<i64>) -> Self {
        Self {
            id,
            code,
            name: name.into(),
            parent_id,
        }
    }
}

#[derive(Debug, Clone)]
struct DeptNode {
    id: i64,
    code: i64,
    name: String,
}

impl DeptNode {
    fn root() -> Self {
        Self {
            id: ROOT_ID,
            code: ROOT_CODE,
            name: ROOT_NAME.to_string(),
        }
    }
}

impl From<&DeptRow> for DeptNode {
    fn from(row: &DeptRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            name: row.name.clone(),
        }
    }
}

/// Which department codes a query should match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeptFilter {
    /// No filtering; every department matches.
    All,
    /// Only these department codes match.
    Codes(BTreeSet<i64>),
}

impl DeptFilter {
    /// Returns `true` if a record in department `code` passes the filter.
    #[must_use]
    pub fn matches(&self, code: i64) -> bool {
        match self {
            Self::All => true,
            Self::Codes(codes) => codes.contains(&code),
        }
    }
}

impl From<BTreeSet<i64>> for DeptFilter {
    /// An empty code set means "no filter", never "match nothing".
    fn from(codes: BTreeSet<i64>) -> Self {
        if codes.is_empty() {
            Self::All
        } else {
            Self::Codes(codes)
        }
    }
}

/// An in-memory tree of departments.
#[derive(Debug, Clone)]
pub struct Registry {
    /// Node arena. Edges point from parent to child.
    graph: DiGraph<DeptNode, ()>,

    /// Lookup from department id to arena index.
    by_id: HashMap<i64, NodeIndex>,

    /// The rows the current tree was derived from, in input order.
    rows: Vec<DeptRow>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry containing only the virtual root.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            graph: DiGraph::new(),
            by_id: HashMap::new(),
            rows: Vec::new(),
        };
        registry.rebuild();
        registry
    }

    /// Creates a registry from a set of rows.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = DeptRow>) -> Self {
        let mut registry = Self::new();
        registry.build_from_rows(rows);
        registry
    }

    /// Discards the current tree and rebuilds it from `rows`.
    ///
    /// Every node is created before any links are made, so a row may refer to
    /// a parent that appears later in the batch. Child order within a parent
    /// follows input order.
    ///
    /// This never fails. A row whose parent is missing, unknown, itself, or
    /// one of its own descendants is attached to the virtual root instead.
    /// Rows reusing the root id or an id already seen are skipped.
    ///
    /// Each link is guarded by its own reachability search, so a build is
    /// `O(n²)` in the number of rows in the worst case.
    pub fn build_from_rows(&mut self, rows: impl IntoIterator<Item = DeptRow>) {
        self.rows = rows.into_iter().collect();
        self.rebuild();
    }

    /// Appends a single row and re-derives the whole tree from the
    /// accumulated rows, at the full cost of [`Registry::build_from_rows`].
    pub fn append(&mut self, row: DeptRow) {
        self.rows.push(row);
        self.rebuild();
    }

    /// Removes every department, leaving only the virtual root.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.rebuild();
    }

    #[instrument(level = "debug", skip(self), fields(rows = self.rows.len()))]
    fn rebuild(&mut self) {
        let mut graph = DiGraph::with_capacity(self.rows.len() + 1, self.rows.len());
        let mut by_id = HashMap::with_capacity(self.rows.len() + 1);

        let root = graph.add_node(DeptNode::root());
        by_id.insert(ROOT_ID, root);

        let mut pending = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            match by_id.entry(row.id) {
                Entry::Occupied(_) => {
                    tracing::warn!(
                        id = row.id,
                        code = row.code,
                        "skipping department with a duplicate or reserved id"
                    );
                }
                Entry::Vacant(entry) => {
                    let index = graph.add_node(DeptNode::from(row));
                    entry.insert(index);
                    pending.push((index, row.parent_id));
                }
            }
        }

        for (child, parent_id) in pending {
            let parent = match parent_id.map(|id| (id, by_id.get(&id).copied())) {
                None => root,
                Some((_, Some(parent)))
                    if parent != child && !has_path_connecting(&graph, child, parent, None) =>
                {
                    parent
                }
                Some((parent_id, resolved)) => {
                    let reason = if resolved.is_some() {
                        "cycle"
                    } else {
                        "unknown parent"
                    };
                    tracing::warn!(
                        id = graph[child].id,
                        parent_id,
                        reason,
                        "attaching department to the root"
                    );
                    root
                }
            };
            graph.add_edge(parent, child, ());
        }

        self.graph = graph;
        self.by_id = by_id;
    }

    fn node(&self, id: i64) -> Option<&DeptNode> {
        self.by_id.get(&id).map(|&index| &self.graph[index])
    }

    fn child_indices(&self, index: NodeIndex) -> Vec<NodeIndex> {
        // petgraph yields the most recently added edge first
        let mut children: Vec<_> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .collect();
        children.reverse();
        children
    }

    /// Returns `true` if a department (or the root) has this id.
    #[must_use]
    pub fn contains_id(&self, id: i64) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Returns `true` if a real department has this business code.
    ///
    /// This is a linear scan. The virtual root is not considered.
    #[must_use]
    pub fn contains_code(&self, code: i64) -> bool {
        self.id_of_code(code).is_some()
    }

    /// Finds the id of the first department with this business code.
    #[must_use]
    pub fn id_of_code(&self, code: i64) -> Option<i64> {
        self.graph
            .node_weights()
            .find(|node| node.id != ROOT_ID && node.code == code)
            .map(|node| node.id)
    }

    /// The business code of a department, if it exists.
    #[must_use]
    pub fn code(&self, id: i64) -> Option<i64> {
        self.node(id).map(|node| node.code)
    }

    /// The display name of a department, if it exists.
    #[must_use]
    pub fn name(&self, id: i64) -> Option<&str> {
        self.node(id).map(|node| node.name.as_str())
    }

    /// The business code of a department, or `0` if the id is unknown.
    #[must_use]
    pub fn code_of(&self, id: i64) -> i64 {
        self.code(id).unwrap_or_default()
    }

    /// The display name of a department, or `""` if the id is unknown.
    #[must_use]
    pub fn name_of(&self, id: i64) -> &str {
        self.name(id).unwrap_or_default()
    }

    /// The id of a department's parent. `None` for the root and unknown ids.
    #[must_use]
    pub fn parent_of(&self, id: i64) -> Option<i64> {
        let &index = self.by_id.get(&id)?;
        self.graph
            .neighbors_directed(index, Direction::Incoming)
            .next()
            .map(|parent| self.graph[parent].id)
    }

    /// Ids of the direct children of a department, in insertion order.
    ///
    /// Unknown ids have no children.
    #[must_use]
    pub fn children_of(&self, id: i64) -> Vec<i64> {
        self.by_id.get(&id).map_or_else(Vec::new, |&index| {
            self.child_indices(index)
                .into_iter()
                .map(|child| self.graph[child].id)
                .collect()
        })
    }

    /// Business codes of a department and all of its descendants.
    ///
    /// The virtual root yields the empty set, as does an unknown id. Callers
    /// must read an empty set as "no department filter"; use
    /// [`Registry::filter_for`] to get that distinction as a type.
    #[must_use]
    pub fn subtree_codes(&self, id: i64) -> BTreeSet<i64> {
        if id == ROOT_ID {
            return BTreeSet::new();
        }
        let Some(&start) = self.by_id.get(&id) else {
            return BTreeSet::new();
        };

        let mut codes = BTreeSet::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(index) = dfs.next(&self.graph) {
            codes.insert(self.graph[index].code);
        }
        codes
    }

    /// The record filter for "this department and all its sub-departments".
    #[must_use]
    pub fn filter_for(&self, id: i64) -> DeptFilter {
        DeptFilter::from(self.subtree_codes(id))
    }

    /// Ids of every real department, in input order.
    #[must_use]
    pub fn ids(&self) -> Vec<i64> {
        self.graph
            .node_weights()
            .filter(|node| node.id != ROOT_ID)
            .map(|node| node.id)
            .collect()
    }

    /// The number of real departments (the root is not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count() - 1
    }

    /// Returns `true` if only the virtual root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The rows the tree was built from.
    #[must_use]
    pub fn rows(&self) -> &[DeptRow] {
        &self.rows
    }

    /// Pre-order walk from the root, yielding `(depth, id)` pairs.
    ///
    /// The root is at depth zero. Siblings appear in insertion order.
    #[must_use]
    pub fn walk(&self) -> Vec<(usize, i64)> {
        let mut out = Vec::with_capacity(self.graph.node_count());
        let Some(&root) = self.by_id.get(&ROOT_ID) else {
            return out;
        };

        let mut stack = vec![(0, root)];
        while let Some((depth, index)) = stack.pop() {
            out.push((depth, self.graph[index].id));
            stack.extend(
                self.child_indices(index)
                    .into_iter()
                    .rev()
                    .map(|child| (depth + 1, child)),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn org_rows() -> Vec<DeptRow> {
        vec![
            DeptRow::new(1, 10, "Admin", None),
            DeptRow::new(2, 20, "Engineering", None),
            DeptRow::new(3, 30, "Finance", None),
            DeptRow::new(4, 21, "Backend", Some(2)),
            DeptRow::new(5, 22, "Frontend", Some(2)),
            DeptRow::new(6, 23, "Storage", Some(4)),
        ]
    }

    fn codes(values: &[i64]) -> BTreeSet<i64> {
        values.iter().copied().collect()
    }

    #[test]
    fn two_level_scenario() {
        let registry = Registry::from_rows([
            DeptRow::new(1, 10, "Head office", None),
            DeptRow::new(2, 11, "Branch", Some(1)),
        ]);

        assert_eq!(registry.children_of(1), vec![2]);
        assert_eq!(registry.subtree_codes(1), codes(&[10, 11]));
        assert!(registry.contains_code(11));
        assert!(!registry.contains_code(99));
    }

    #[test]
    fn virtual_root_only_yields_no_filter() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.contains_id(ROOT_ID));
        assert!(registry.subtree_codes(ROOT_ID).is_empty());
        assert_eq!(registry.filter_for(ROOT_ID), DeptFilter::All);
        assert!(registry.filter_for(ROOT_ID).matches(12345));
    }

    #[test]
    fn root_is_never_a_real_department() {
        let registry = Registry::from_rows(org_rows());
        assert!(!registry.contains_code(ROOT_CODE));
        assert_eq!(registry.name_of(ROOT_ID), ROOT_NAME);
        assert_eq!(registry.parent_of(ROOT_ID), None);
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn children_follow_input_order() {
        let registry = Registry::from_rows(org_rows());
        assert_eq!(registry.children_of(ROOT_ID), vec![1, 2, 3]);
        assert_eq!(registry.children_of(2), vec![4, 5]);
        assert!(registry.children_of(6).is_empty());
        assert!(registry.children_of(404).is_empty());
    }

    #[test]
    fn subtree_includes_self_and_all_descendants() {
        let registry = Registry::from_rows(org_rows());
        assert_eq!(registry.subtree_codes(2), codes(&[20, 21, 22, 23]));
        assert_eq!(registry.subtree_codes(4), codes(&[21, 23]));
        assert_eq!(registry.subtree_codes(6), codes(&[23]));
        assert!(registry.subtree_codes(404).is_empty());
    }

    #[test]
    fn subtree_is_superset_of_each_child_subtree() {
        let registry = Registry::from_rows(org_rows());
        for id in registry.ids() {
            let own = registry.subtree_codes(id);
            assert!(own.contains(&registry.code_of(id)));
            for child in registry.children_of(id) {
                assert!(own.is_superset(&registry.subtree_codes(child)));
            }
        }
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut registry = Registry::from_rows(org_rows());
        let snapshot = |registry: &Registry| -> Vec<(Vec<i64>, BTreeSet<i64>)> {
            registry
                .ids()
                .into_iter()
                .map(|id| (registry.children_of(id), registry.subtree_codes(id)))
                .collect()
        };
        let before = snapshot(&registry);

        registry.build_from_rows(org_rows());

        assert_eq!(snapshot(&registry), before);
    }

    #[test]
    fn rebuild_discards_prior_state() {
        let mut registry = Registry::from_rows(org_rows());
        registry.build_from_rows([DeptRow::new(9, 90, "Only", None)]);
        assert_eq!(registry.ids(), vec![9]);
        assert!(!registry.contains_id(2));
        assert_eq!(registry.rows().len(), 1);
    }

    #[test]
    fn forward_reference_resolves() {
        let registry = Registry::from_rows([
            DeptRow::new(2, 21, "Child", Some(1)),
            DeptRow::new(1, 20, "Parent", None),
        ]);
        assert_eq!(registry.parent_of(2), Some(1));
        assert_eq!(registry.children_of(ROOT_ID), vec![1]);
    }

    #[test_case(Some(99); "unknown parent")]
    #[test_case(Some(7); "self parent")]
    #[test_case(Some(ROOT_ID); "explicit root")]
    #[test_case(None; "no parent")]
    fn unresolvable_parent_attaches_to_root(parent_id: Option<i64>) {
        let registry = Registry::from_rows([DeptRow::new(7, 70, "Loner", parent_id)]);
        assert_eq!(registry.parent_of(7), Some(ROOT_ID));
        assert_eq!(registry.children_of(ROOT_ID), vec![7]);
    }

    #[test]
    fn cycle_is_broken_at_the_root() {
        let registry = Registry::from_rows([
            DeptRow::new(1, 10, "A", Some(2)),
            DeptRow::new(2, 20, "B", Some(1)),
        ]);

        // 1 links under 2 first, so 2 -> 1 would close the loop.
        assert_eq!(registry.parent_of(1), Some(2));
        assert_eq!(registry.parent_of(2), Some(ROOT_ID));
        assert_eq!(registry.subtree_codes(2), codes(&[10, 20]));
        assert_eq!(registry.subtree_codes(1), codes(&[10]));
    }

    #[test]
    fn duplicate_and_reserved_ids_are_skipped() {
        let registry = Registry::from_rows([
            DeptRow::new(1, 10, "First", None),
            DeptRow::new(1, 11, "Second", None),
            DeptRow::new(ROOT_ID, 5, "Imposter", None),
        ]);
        assert_eq!(registry.ids(), vec![1]);
        assert_eq!(registry.name_of(1), "First");
        assert_eq!(registry.name_of(ROOT_ID), ROOT_NAME);
        assert!(!registry.contains_code(5));
    }

    #[test]
    fn lookups_are_lenient_for_unknown_ids() {
        let registry = Registry::from_rows(org_rows());
        assert_eq!(registry.code_of(404), 0);
        assert_eq!(registry.name_of(404), "");
        assert_eq!(registry.code(404), None);
        assert_eq!(registry.name(404), None);
        assert_eq!(registry.code(4), Some(21));
        assert_eq!(registry.name(4), Some("Backend"));
    }

    #[test]
    fn append_rederives_tree() {
        let mut registry = Registry::from_rows(org_rows());
        registry.append(DeptRow::new(7, 24, "Platform", Some(4)));
        assert_eq!(registry.children_of(4), vec![6, 7]);
        assert_eq!(registry.subtree_codes(2), codes(&[20, 21, 22, 23, 24]));
        assert_eq!(registry.id_of_code(24), Some(7));
    }

    #[test]
    fn walk_is_preorder_with_depths() {
        let registry = Registry::from_rows(org_rows());
        assert_eq!(
            registry.walk(),
            vec![
                (0, ROOT_ID),
                (1, 1),
                (1, 2),
                (2, 4),
                (3, 6),
                (2, 5),
                (1, 3),
            ]
        );
    }

    #[test]
    fn filter_matches_subtree_codes_only() {
        let registry = Registry::from_rows(org_rows());
        let filter = registry.filter_for(4);
        assert!(filter.matches(21));
        assert!(filter.matches(23));
        assert!(!filter.matches(22));
        assert!(!filter.matches(20));
    }

    #[test]
    fn clear_leaves_only_root() {
        let mut registry = Registry::from_rows(org_rows());
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.rows().is_empty());
        assert!(registry.children_of(ROOT_ID).is_empty());
    }
}
