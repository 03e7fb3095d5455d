//! An AVL-balanced ordered index of employee records.
//!
//! The [`OrderedIndex`] is the authoritative in-memory store for employee
//! rows. It is keyed by [`Record::no`] and knows nothing about departments
//! or persistence.

use std::cmp::Ordering;

use crate::domain::Record;

type Link = Option<Box<Node>>;

#[derive(Debug, Clone)]
struct Node {
    record: Record,
    left: Link,
    right: Link,
    height: u32,
}

impl Node {
    fn leaf(record: Record) -> Box<Self> {
        Box::new(Self {
            record,
            left: None,
            right: None,
            height: 1,
        })
    }

    fn key(&self) -> i64 {
        self.record.no()
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    /// Height of the left subtree minus height of the right subtree.
    fn balance(&self) -> i64 {
        i64::from(height(&self.left)) - i64::from(height(&self.right))
    }
}

fn height(link: &Link) -> u32 {
    link.as_ref().map_or(0, |node| node.height)
}

fn balance(link: &Link) -> i64 {
    link.as_ref().map_or(0, |node| node.balance())
}

fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    node.update_height();
    pivot.right = Some(node);
    pivot.update_height();
    pivot
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    node.update_height();
    pivot.left = Some(node);
    pivot.update_height();
    pivot
}

/// Restores the AVL invariant at `node`, assuming both subtrees satisfy it
/// and differ in height by at most two.
fn rebalance_node(mut node: Box<Node>) -> Box<Node> {
    node.update_height();
    let factor = node.balance();

    if factor > 1 {
        // LR
        if balance(&node.left) < 0 {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }

    if factor < -1 {
        // RL
        if balance(&node.right) > 0 {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }

    node
}

fn rebalance(link: &mut Link) {
    if let Some(node) = link.take() {
        *link = Some(rebalance_node(node));
    }
}

fn insert(link: &mut Link, record: Record) -> bool {
    let Some(node) = link else {
        *link = Some(Node::leaf(record));
        return true;
    };

    let inserted = match record.no().cmp(&node.key()) {
        Ordering::Less => insert(&mut node.left, record),
        Ordering::Greater => insert(&mut node.right, record),
        Ordering::Equal => false,
    };

    if inserted {
        rebalance(link);
    }
    inserted
}

/// Detaches the minimum node of a non-empty subtree and returns its record.
fn remove_min(link: &mut Link) -> Option<Record> {
    let node = link.as_mut()?;
    if node.left.is_some() {
        let min = remove_min(&mut node.left);
        rebalance(link);
        return min;
    }

    let mut node = link.take()?;
    *link = node.right.take();
    Some(node.record)
}

fn remove(link: &mut Link, no: i64) -> Option<Record> {
    let node = link.as_mut()?;

    let removed = match no.cmp(&node.key()) {
        Ordering::Less => remove(&mut node.left, no)?,
        Ordering::Greater => remove(&mut node.right, no)?,
        Ordering::Equal => {
            let mut node = link.take()?;
            match (node.left.take(), node.right.take()) {
                (None, child) | (child, None) => {
                    *link = child;
                    return Some(node.record);
                }
                (left, mut right) => {
                    // Two children: the in-order successor takes this slot.
                    let successor = remove_min(&mut right)?;
                    node.left = left;
                    node.right = right;
                    let removed = std::mem::replace(&mut node.record, successor);
                    *link = Some(node);
                    removed
                }
            }
        }
    };

    rebalance(link);
    Some(removed)
}

/// An ordered, self-balancing index of [`Record`]s keyed by employee number.
///
/// Every mutation leaves the tree in AVL balance: at every node the heights
/// of the two subtrees differ by at most one, so lookups, inserts and
/// removals are `O(log n)`.
///
/// The index is single-threaded. It performs no internal locking.
#[derive(Debug, Clone, Default)]
pub struct OrderedIndex {
    root: Link,
    len: usize,
}

impl OrderedIndex {
    /// Creates an empty index.
    #[must_use]
    pub const fn new() -> Self {
        Self { root: None, len: 0 }
    }

    /// Inserts a record.
    ///
    /// Returns `false`, leaving the index untouched, if a record with the same
    /// employee number is already present.
    pub fn insert(&mut self, record: Record) -> bool {
        let inserted = insert(&mut self.root, record);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Removes the record with the given employee number.
    ///
    /// Returns `false` if no such record exists.
    pub fn remove(&mut self, no: i64) -> bool {
        self.take(no).is_some()
    }

    /// Removes the record with the given employee number and returns it.
    pub fn take(&mut self, no: i64) -> Option<Record> {
        let removed = remove(&mut self.root, no);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Looks up a record by employee number.
    #[must_use]
    pub fn find(&self, no: i64) -> Option<&Record> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            current = match no.cmp(&node.key()) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Some(&node.record),
            };
        }
        None
    }

    /// Returns `true` if a record with this employee number is present.
    #[must_use]
    pub fn contains(&self, no: i64) -> bool {
        self.find(no).is_some()
    }

    /// Mutates a record in place.
    ///
    /// The closure receives a mutable borrow that cannot outlive the call.
    /// The employee number is not writable through it, so the tree never
    /// needs to be reordered. Returns `None` if the record does not exist.
    pub fn update<R>(&mut self, no: i64, f: impl FnOnce(&mut Record) -> R) -> Option<R> {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            current = match no.cmp(&node.key()) {
                Ordering::Less => node.left.as_deref_mut(),
                Ordering::Greater => node.right.as_deref_mut(),
                Ordering::Equal => return Some(f(&mut node.record)),
            };
        }
        None
    }

    /// Returns a copy of every record in ascending key order.
    ///
    /// This is the snapshot used both for filtered display and for saving.
    #[must_use]
    pub fn inorder(&self) -> Vec<Record> {
        self.iter().cloned().collect()
    }

    /// Iterates over the records in ascending key order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self.root.as_deref(), self.len)
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// The number of records in the index.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the index holds no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The height of the tree. An empty index has height zero.
    #[must_use]
    pub fn height(&self) -> u32 {
        height(&self.root)
    }

    /// Checks the structural invariants of the whole tree.
    ///
    /// Verifies strict key ordering, that every cached height is correct, that
    /// every balance factor lies in `-1..=1`, and that the size counter
    /// matches the node count. This walks the whole tree.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        fn check(
            link: &Link,
            lower: Option<i64>,
            upper: Option<i64>,
            count: &mut usize,
        ) -> Option<u32> {
            let Some(node) = link else {
                return Some(0);
            };
            let key = node.key();
            if lower.is_some_and(|lower| key <= lower) || upper.is_some_and(|upper| key >= upper) {
                return None;
            }
            *count += 1;
            let left = check(&node.left, lower, Some(key), count)?;
            let right = check(&node.right, Some(key), upper, count)?;
            let expected = 1 + left.max(right);
            (left.abs_diff(right) <= 1 && node.height == expected).then_some(expected)
        }

        let mut count = 0;
        check(&self.root, None, None, &mut count).is_some() && count == self.len
    }
}

impl Extend<Record> for OrderedIndex {
    fn extend<T: IntoIterator<Item = Record>>(&mut self, iter: T) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl FromIterator<Record> for OrderedIndex {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl<'a> IntoIterator for &'a OrderedIndex {
    type Item = &'a Record;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over an [`OrderedIndex`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
    remaining: usize,
}

impl<'a> Iter<'a> {
    fn new(root: Option<&'a Node>, len: usize) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: len,
        };
        iter.descend_left(root);
        iter
    }

    fn descend_left(&mut self, mut current: Option<&'a Node>) {
        while let Some(node) = current {
            self.stack.push(node);
            current = node.left.as_deref();
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.descend_left(node.right.as_deref());
        self.remaining = self.remaining.saturating_sub(1);
        Some(&node.record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::RecordError;

    fn record(no: i64, salary: f64) -> Record {
        Record::new(no, format!("emp-{no}"), 10, salary).unwrap()
    }

    fn index_of(keys: &[i64]) -> OrderedIndex {
        keys.iter().map(|&no| record(no, 1000.0)).collect()
    }

    fn keys(index: &OrderedIndex) -> Vec<i64> {
        index.iter().map(Record::no).collect()
    }

    fn root_key(index: &OrderedIndex) -> Option<i64> {
        index.root.as_ref().map(|node| node.key())
    }

    #[test]
    fn insert_then_remove_scenario() {
        let mut index = OrderedIndex::new();
        assert!(index.insert(record(1, 5000.0)));
        assert!(index.insert(record(2, 7000.0)));
        assert!(index.insert(record(3, 3000.0)));
        assert_eq!(keys(&index), vec![1, 2, 3]);

        assert!(index.remove(2));
        assert_eq!(keys(&index), vec![1, 3]);
        assert!(index.find(2).is_none());
        assert_eq!(index.len(), 2);
        assert!(index.is_balanced());
    }

    #[test_case(&[3, 2, 1]; "left left")]
    #[test_case(&[3, 1, 2]; "left right")]
    #[test_case(&[1, 2, 3]; "right right")]
    #[test_case(&[1, 3, 2]; "right left")]
    fn three_inserts_rotate_middle_key_to_root(order: &[i64]) {
        let index = index_of(order);
        assert_eq!(root_key(&index), Some(2));
        assert_eq!(index.height(), 2);
        assert!(index.is_balanced());
    }

    #[test]
    fn duplicate_insert_is_rejected_without_mutation() {
        let mut index = index_of(&[5, 3, 8]);
        let before = index.inorder();

        assert!(!index.insert(Record::new(3, "Other", 99, 1.0).unwrap()));

        assert_eq!(index.len(), 3);
        assert_eq!(index.inorder(), before);
        assert_eq!(index.find(3).unwrap().name(), "emp-3");
    }

    #[test]
    fn removing_absent_key_reports_failure() {
        let mut index = index_of(&[1, 2, 3]);
        assert!(!index.remove(42));
        assert_eq!(index.len(), 3);
        assert_eq!(keys(&index), vec![1, 2, 3]);
    }

    #[test]
    fn remove_from_empty_index() {
        let mut index = OrderedIndex::new();
        assert!(!index.remove(1));
        assert!(index.is_empty());
    }

    #[test]
    fn remove_node_with_two_children_uses_successor() {
        let mut index = index_of(&[50, 30, 70, 20, 40, 60, 80, 65]);
        let removed = index.take(70).unwrap();
        assert_eq!(removed.no(), 70);
        assert_eq!(keys(&index), vec![20, 30, 40, 50, 60, 65, 80]);
        assert!(index.is_balanced());

        // root with two children
        assert!(index.remove(50));
        assert_eq!(keys(&index), vec![20, 30, 40, 60, 65, 80]);
        assert_eq!(root_key(&index), Some(60));
        assert!(index.is_balanced());
    }

    #[test]
    fn removals_rebalance_every_ancestor() {
        let mut index = index_of(&(1..=64).collect::<Vec<_>>());
        for no in (1..=64).filter(|no| no % 3 != 0) {
            assert!(index.remove(no));
            assert!(index.is_balanced(), "unbalanced after removing {no}");
        }
        assert_eq!(
            keys(&index),
            (1..=64).filter(|no| no % 3 == 0).collect::<Vec<_>>()
        );
    }

    #[test]
    fn ascending_inserts_stay_logarithmic() {
        let index = index_of(&(0..1023).collect::<Vec<_>>());
        assert_eq!(index.len(), 1023);
        assert_eq!(index.height(), 10);
        assert!(index.is_balanced());
    }

    #[test]
    fn update_mutates_non_key_fields_in_place() {
        let mut index = index_of(&[1, 2, 3]);

        let updated = index.update(2, |record| {
            record.dept_code = 42;
            record.set_name("Renamed")?;
            record.set_salary(1234.5)
        });

        assert_eq!(updated, Some(Ok(())));
        let record = index.find(2).unwrap();
        assert_eq!(record.name(), "Renamed");
        assert_eq!(record.dept_code, 42);
        assert!((record.salary() - 1234.5).abs() < f64::EPSILON);
        assert_eq!(keys(&index), vec![1, 2, 3]);
    }

    #[test]
    fn invalid_update_keeps_snapshot_loadable() {
        let mut index = index_of(&[1, 2]);

        let rejected = index.update(1, |record| {
            record.set_salary(-5.0)?;
            record.set_name("")
        });
        assert!(matches!(rejected, Some(Err(RecordError::InvalidSalary { .. }))));
        assert_eq!(
            index.update(2, |record| record.set_name("  ")),
            Some(Err(RecordError::EmptyName))
        );

        let snapshot = index.inorder();
        assert_eq!(snapshot, vec![record(1, 1000.0), record(2, 1000.0)]);

        let json = serde_json::to_string(&snapshot).unwrap();
        let reloaded: Vec<Record> = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, snapshot);
    }

    #[test]
    fn update_of_missing_key_is_none() {
        let mut index = index_of(&[1]);
        assert!(index.update(9, |_| ()).is_none());
    }

    #[test]
    fn clear_resets_size() {
        let mut index = index_of(&[4, 2, 6]);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.height(), 0);
        assert!(index.inorder().is_empty());
        assert!(index.insert(record(2, 1.0)));
    }

    #[test]
    fn rebuild_from_snapshot_is_identical() {
        let mut index = index_of(&[9, 4, 17, 1, 6, 12, 20]);
        let snapshot = index.inorder();
        index.clear();
        index.extend(snapshot.clone());
        assert_eq!(index.inorder(), snapshot);
    }

    #[test]
    fn iterator_reports_exact_size() {
        let index = index_of(&[3, 1, 2]);
        let mut iter = index.iter();
        assert_eq!(iter.len(), 3);
        iter.next();
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.map(Record::no).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn negative_keys_order_correctly() {
        let index = index_of(&[0, -5, 5, i64::MIN, i64::MAX]);
        assert_eq!(keys(&index), vec![i64::MIN, -5, 0, 5, i64::MAX]);
    }
}
