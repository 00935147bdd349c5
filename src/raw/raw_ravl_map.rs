use core::borrow::Borrow;
use core::cmp::Ordering;

use alloc::vec::Vec;

use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::Node;

/// Which child slot of a parent a node occupies.
enum Side {
    Left,
    Right,
}

/// The core rank-augmented AVL tree backing `RavlMap`.
///
/// Values live in their own arena, separate from the link records, so key
/// traversal stays dense and a payload can be replaced without touching the
/// tree structure.
#[derive(Clone)]
pub(crate) struct RawRavlMap<K, V> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K>>,
    /// Arena storing all values.
    values: Arena<V>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
    /// Total number of key-value pairs in the tree.
    len: usize,
    /// Bumped by every structural mutation; snapshotted by detached queries
    /// to detect out-of-band modification.
    version: u64,
}

impl<K, V> RawRavlMap<K, V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            values: Arena::new(),
            root: None,
            len: 0,
            version: 0,
        }
    }

    /// Creates a new tree with the specified capacity.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            values: Arena::with_capacity(capacity),
            root: None,
            len: 0,
            version: 0,
        }
    }

    /// Returns the number of key-value pairs in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree contains no elements.
    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the capacity of the tree.
    pub(crate) fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Returns the current structural version.
    pub(crate) const fn version(&self) -> u64 {
        self.version
    }

    /// Clears all elements from the tree.
    ///
    /// Advances the version by the discarded element count, so a query that
    /// was mid-iteration cannot observe an equal version by accident.
    pub(crate) fn clear(&mut self) {
        self.version = self.version.wrapping_add(self.len as u64);
        self.nodes.clear();
        self.values.clear();
        self.root = None;
        self.len = 0;
    }

    /// Returns a reference to a node by handle.
    pub(crate) fn node(&self, handle: Handle) -> &Node<K> {
        self.nodes.get(handle)
    }

    /// Returns the key-value pair stored at a node handle.
    pub(crate) fn key_value(&self, handle: Handle) -> (&K, &V) {
        let node = self.nodes.get(handle);
        (&node.key, self.values.get(node.value))
    }

    /// Drains all key-value pairs in sorted order, leaving the tree empty.
    /// O(n), no rebalancing: the structure is discarded wholesale afterwards.
    pub(crate) fn drain_to_vec(&mut self) -> Vec<(K, V)> {
        let mut order: Vec<Handle> = Vec::with_capacity(self.len);
        let mut stack: SmallVec<[Handle; 48]> = SmallVec::new();
        let mut current = self.root;
        loop {
            while let Some(h) = current {
                stack.push(h);
                current = self.nodes.get(h).left;
            }
            match stack.pop() {
                Some(h) => {
                    order.push(h);
                    current = self.nodes.get(h).right;
                }
                None => break,
            }
        }

        let mut result = Vec::with_capacity(order.len());
        for h in order {
            let node = self.nodes.take(h);
            let value = self.values.take(node.value);
            result.push((node.key, value));
        }

        self.version = self.version.wrapping_add(self.len as u64);
        self.nodes.clear();
        self.values.clear();
        self.root = None;
        self.len = 0;
        result
    }

    fn height_of(&self, handle: Option<Handle>) -> i32 {
        handle.map_or(-1, |h| self.nodes.get(h).height)
    }

    fn update_height(&mut self, handle: Handle) {
        let (left, right) = {
            let node = self.nodes.get(handle);
            (node.left, node.right)
        };
        let height = self.height_of(left).max(self.height_of(right)) + 1;
        self.nodes.get_mut(handle).height = height;
    }

    /// Leftmost node of the subtree rooted at `handle`.
    pub(crate) fn min_node(&self, handle: Handle) -> Handle {
        let mut current = handle;
        while let Some(left) = self.nodes.get(current).left {
            current = left;
        }
        current
    }

    /// Rightmost node of the subtree rooted at `handle`.
    pub(crate) fn max_node(&self, handle: Handle) -> Handle {
        let mut current = handle;
        while let Some(right) = self.nodes.get(current).right {
            current = right;
        }
        current
    }

    /// Smallest node of the whole tree, if any.
    pub(crate) fn first_node(&self) -> Option<Handle> {
        self.root.map(|root| self.min_node(root))
    }

    /// Largest node of the whole tree, if any.
    pub(crate) fn last_node(&self) -> Option<Handle> {
        self.root.map(|root| self.max_node(root))
    }

    /// In-order successor via parent back-references. Amortized O(1) over a
    /// full traversal.
    pub(crate) fn successor(&self, handle: Handle) -> Option<Handle> {
        let node = self.nodes.get(handle);
        if let Some(right) = node.right {
            return Some(self.min_node(right));
        }
        let mut current = handle;
        let mut parent = node.parent;
        while let Some(p) = parent {
            let parent_node = self.nodes.get(p);
            if parent_node.right != Some(current) {
                break;
            }
            current = p;
            parent = parent_node.parent;
        }
        parent
    }

    /// In-order predecessor via parent back-references.
    pub(crate) fn predecessor(&self, handle: Handle) -> Option<Handle> {
        let node = self.nodes.get(handle);
        if let Some(left) = node.left {
            return Some(self.max_node(left));
        }
        let mut current = handle;
        let mut parent = node.parent;
        while let Some(p) = parent {
            let parent_node = self.nodes.get(p);
            if parent_node.left != Some(current) {
                break;
            }
            current = p;
            parent = parent_node.parent;
        }
        parent
    }

    /// Walks upward from a freshly linked leaf, growing the rank counter of
    /// every ancestor whose left subtree gained the new node.
    fn increment_counts_above(&mut self, start: Handle) {
        let mut lower = start;
        let mut upper = self.nodes.get(start).parent;
        while let Some(h) = upper {
            let node = self.nodes.get_mut(h);
            if node.left == Some(lower) {
                node.left_count.incr();
            }
            lower = h;
            upper = node.parent;
        }
    }

    /// Walks upward from a splice point, shrinking the rank counter of every
    /// ancestor whose left subtree lost a node. `lower` is the subtree that
    /// replaced the spliced node (possibly absent), `upper` its parent.
    fn decrement_counts_above(&mut self, mut lower: Option<Handle>, mut upper: Option<Handle>) {
        while let Some(h) = upper {
            let node = self.nodes.get_mut(h);
            if node.left == lower {
                node.left_count.decr();
            }
            lower = Some(h);
            upper = node.parent;
        }
    }

    /// Rotates the subtree rooted at `h1` to the left; returns the new
    /// subtree root. The caller reattaches the result to the grandparent.
    fn rotate_left(&mut self, h1: Handle) -> Handle {
        let h2 = self.nodes.get(h1).right.unwrap();
        let h1_parent = self.nodes.get(h1).parent;
        let h2_left = self.nodes.get(h2).left;

        {
            let node2 = self.nodes.get_mut(h2);
            node2.parent = h1_parent;
            node2.left = Some(h1);
        }
        {
            let node1 = self.nodes.get_mut(h1);
            node1.parent = Some(h2);
            node1.right = h2_left;
        }
        if let Some(moved) = h2_left {
            self.nodes.get_mut(moved).parent = Some(h1);
        }

        self.update_height(h1);
        self.update_height(h2);

        // h1's whole left subtree plus h1 itself now precede h2.
        let delta = self.nodes.get(h1).left_count.to_usize() + 1;
        let node2 = self.nodes.get_mut(h2);
        node2.left_count = node2.left_count.plus(delta);
        h2
    }

    /// Rotates the subtree rooted at `h1` to the right; returns the new
    /// subtree root.
    fn rotate_right(&mut self, h1: Handle) -> Handle {
        let h2 = self.nodes.get(h1).left.unwrap();
        let h1_parent = self.nodes.get(h1).parent;
        let h2_right = self.nodes.get(h2).right;

        {
            let node2 = self.nodes.get_mut(h2);
            node2.parent = h1_parent;
            node2.right = Some(h1);
        }
        {
            let node1 = self.nodes.get_mut(h1);
            node1.parent = Some(h2);
            node1.left = h2_right;
        }
        if let Some(moved) = h2_right {
            self.nodes.get_mut(moved).parent = Some(h1);
        }

        self.update_height(h1);
        self.update_height(h2);

        // h2 and its left subtree no longer precede h1.
        let delta = self.nodes.get(h2).left_count.to_usize() + 1;
        let node1 = self.nodes.get_mut(h1);
        node1.left_count = node1.left_count.minus(delta);
        h2
    }

    fn rotate_left_right(&mut self, h1: Handle) -> Handle {
        let left = self.nodes.get(h1).left.unwrap();
        let new_left = self.rotate_left(left);
        self.nodes.get_mut(h1).left = Some(new_left);
        self.rotate_right(h1)
    }

    fn rotate_right_left(&mut self, h1: Handle) -> Handle {
        let right = self.nodes.get(h1).right.unwrap();
        let new_right = self.rotate_right(right);
        self.nodes.get_mut(h1).right = Some(new_right);
        self.rotate_left(h1)
    }

    /// Reattaches a rotated subtree below `grandparent` (or as the root) and
    /// refreshes the grandparent's height.
    fn reattach(&mut self, grandparent: Option<Handle>, old_child: Handle, new_child: Handle) {
        match grandparent {
            None => self.root = Some(new_child),
            Some(g) => {
                let node = self.nodes.get_mut(g);
                if node.left == Some(old_child) {
                    node.left = Some(new_child);
                } else {
                    node.right = Some(new_child);
                }
                self.update_height(g);
            }
        }
    }

    /// Restores the AVL balance walking upward from `start`.
    ///
    /// After an insertion a single corrective rotation is always sufficient,
    /// so the walk returns as soon as one has been applied. After a removal
    /// every level up to the root may need one, so the walk never stops early.
    fn rebalance_upward(&mut self, start: Option<Handle>, insertion: bool) {
        let mut current = start;
        while let Some(p) = current {
            let (left, right) = {
                let node = self.nodes.get(p);
                (node.left, node.right)
            };
            let left_height = self.height_of(left);
            let right_height = self.height_of(right);

            if left_height == right_height + 2 {
                let grandparent = self.nodes.get(p).parent;
                let l = left.unwrap();
                let (ll, lr) = {
                    let node = self.nodes.get(l);
                    (node.left, node.right)
                };
                let subtree = if self.height_of(ll) >= self.height_of(lr) {
                    self.rotate_right(p)
                } else {
                    self.rotate_left_right(p)
                };
                self.reattach(grandparent, p, subtree);
                if insertion {
                    return;
                }
            } else if right_height == left_height + 2 {
                let grandparent = self.nodes.get(p).parent;
                let r = right.unwrap();
                let (rl, rr) = {
                    let node = self.nodes.get(r);
                    (node.left, node.right)
                };
                let subtree = if self.height_of(rr) >= self.height_of(rl) {
                    self.rotate_left(p)
                } else {
                    self.rotate_right_left(p)
                };
                self.reattach(grandparent, p, subtree);
                if insertion {
                    return;
                }
            }

            self.update_height(p);
            current = self.nodes.get(p).parent;
        }
    }
}

impl<K: Ord, V> RawRavlMap<K, V> {
    /// Standard binary search descent.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        while let Some(h) = current {
            let node = self.nodes.get(h);
            current = match key.cmp(node.key.borrow()) {
                Ordering::Equal => return Some(h),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        None
    }

    /// Returns a reference to the value corresponding to the key.
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        Some(self.values.get(self.nodes.get(handle).value))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        let value = self.nodes.get(handle).value;
        Some(self.values.get_mut(value))
    }

    /// Returns the key-value pair corresponding to the key.
    pub(crate) fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        Some(self.key_value(handle))
    }

    /// Returns true if the tree contains the specified key.
    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).is_some()
    }

    /// Returns true if any node holds the given payload. O(n) in-order scan;
    /// payload equality is independent of key ordering.
    pub(crate) fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let mut current = self.first_node();
        while let Some(h) = current {
            if self.values.get(self.nodes.get(h).value) == value {
                return true;
            }
            current = self.successor(h);
        }
        false
    }

    /// Inserts a key-value pair into the tree.
    ///
    /// If the key already exists its payload is overwritten in place and the
    /// prior payload returned; size and version are untouched since nothing
    /// structural happened. Otherwise a new leaf is linked, every ancestor
    /// whose left subtree grew has its rank counter bumped, and at most one
    /// rotation restores balance.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let Some(root) = self.root else {
            let value_handle = self.values.alloc(value);
            let handle = self.nodes.alloc(Node::new_leaf(key, value_handle));
            self.root = Some(handle);
            self.len = 1;
            self.version = self.version.wrapping_add(1);
            return None;
        };

        // Descend to the insertion point, overwriting in place on a match.
        let (parent, side) = {
            let mut current = root;
            loop {
                let node = self.nodes.get(current);
                match key.cmp(&node.key) {
                    Ordering::Equal => {
                        let value_handle = node.value;
                        return Some(core::mem::replace(self.values.get_mut(value_handle), value));
                    }
                    Ordering::Less => match node.left {
                        Some(left) => current = left,
                        None => break (current, Side::Left),
                    },
                    Ordering::Greater => match node.right {
                        Some(right) => current = right,
                        None => break (current, Side::Right),
                    },
                }
            }
        };

        let value_handle = self.values.alloc(value);
        let new = self.nodes.alloc(Node::new_leaf(key, value_handle));
        self.nodes.get_mut(new).parent = Some(parent);
        match side {
            Side::Left => self.nodes.get_mut(parent).left = Some(new),
            Side::Right => self.nodes.get_mut(parent).right = Some(new),
        }

        self.len += 1;
        self.version = self.version.wrapping_add(1);
        self.increment_counts_above(new);
        self.rebalance_upward(Some(parent), true);
        None
    }

    /// Removes a key from the tree and returns the value.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the tree and returns the key-value pair.
    pub(crate) fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let target = self.search(key)?;
        let (pair, _freed) = self.remove_node(target);
        Some(pair)
    }

    /// Physically removes the entry at `target`.
    ///
    /// Returns the removed pair together with the handle that actually left
    /// the tree: for a node with two children that is the in-order successor,
    /// whose key and payload migrate into `target` before the successor is
    /// spliced out. Detached queries use the freed handle to re-point their
    /// pending position.
    pub(crate) fn remove_node(&mut self, target: Handle) -> ((K, V), Handle) {
        let (left, right) = {
            let node = self.nodes.get(target);
            (node.left, node.right)
        };

        let freed = match (left, right) {
            (Some(_), Some(right)) => {
                // Two children: splice the successor, which has no left child.
                let succ = self.min_node(right);
                let (succ_right, succ_parent) = {
                    let node = self.nodes.get(succ);
                    (node.right, node.parent.unwrap())
                };
                {
                    let parent_node = self.nodes.get_mut(succ_parent);
                    if parent_node.left == Some(succ) {
                        parent_node.left = succ_right;
                    } else {
                        parent_node.right = succ_right;
                    }
                }
                if let Some(child) = succ_right {
                    self.nodes.get_mut(child).parent = Some(succ_parent);
                }
                self.decrement_counts_above(succ_right, Some(succ_parent));
                succ
            }
            (None, None) => {
                match self.nodes.get(target).parent {
                    None => self.root = None,
                    Some(parent) => {
                        // Count walk runs before the unlink so the child
                        // comparison still sees the node in place.
                        self.decrement_counts_above(Some(target), Some(parent));
                        let parent_node = self.nodes.get_mut(parent);
                        if parent_node.left == Some(target) {
                            parent_node.left = None;
                        } else {
                            parent_node.right = None;
                        }
                    }
                }
                target
            }
            (one_child, other) => {
                let child = one_child.or(other).unwrap();
                let parent = self.nodes.get(target).parent;
                self.nodes.get_mut(child).parent = parent;
                match parent {
                    None => self.root = Some(child),
                    Some(parent) => {
                        let parent_node = self.nodes.get_mut(parent);
                        if parent_node.left == Some(target) {
                            parent_node.left = Some(child);
                        } else {
                            parent_node.right = Some(child);
                        }
                        self.decrement_counts_above(Some(child), Some(parent));
                    }
                }
                target
            }
        };

        let freed_node = self.nodes.take(freed);
        let rebalance_from = freed_node.parent;
        let (removed_key, removed_value_handle) = if freed == target {
            (freed_node.key, freed_node.value)
        } else {
            // The successor's key and payload take the target's place; the
            // target's old pair is what the caller asked to remove.
            let node = self.nodes.get_mut(target);
            let old_key = core::mem::replace(&mut node.key, freed_node.key);
            let old_value = core::mem::replace(&mut node.value, freed_node.value);
            (old_key, old_value)
        };
        let removed_value = self.values.take(removed_value_handle);

        self.len -= 1;
        self.version = self.version.wrapping_add(1);
        self.rebalance_upward(rebalance_from, false);
        ((removed_key, removed_value), freed)
    }

    /// Removes and returns the first key-value pair.
    pub(crate) fn pop_first(&mut self) -> Option<(K, V)> {
        let first = self.first_node()?;
        Some(self.remove_node(first).0)
    }

    /// Removes and returns the last key-value pair.
    pub(crate) fn pop_last(&mut self) -> Option<(K, V)> {
        let last = self.last_node()?;
        Some(self.remove_node(last).0)
    }

    /// Node at zero-based `index` in sorted order, or `None` out of bounds.
    ///
    /// Descends by the rank counters: an index past the left subtree skips
    /// `left_count + 1` positions and recurses right, otherwise left.
    pub(crate) fn select(&self, index: usize) -> Option<Handle> {
        if index >= self.len {
            return None;
        }
        let mut current = self.root?;
        let mut remaining = index;
        loop {
            let node = self.nodes.get(current);
            let left_count = node.left_count.to_usize();
            match remaining.cmp(&left_count) {
                Ordering::Greater => {
                    remaining -= left_count + 1;
                    current = node.right?;
                }
                Ordering::Less => current = node.left?,
                Ordering::Equal => return Some(current),
            }
        }
    }

    /// Key paired with a mutable payload reference at `index`.
    pub(crate) fn select_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        let handle = self.select(index)?;
        let node = self.nodes.get(handle);
        let value_handle = node.value;
        Some((&node.key, self.values.get_mut(value_handle)))
    }

    /// Zero-based rank of `key`, or `None` if absent.
    ///
    /// Seeds the running rank with the root's rank counter and adjusts it on
    /// every branch, mirroring `select`'s descent in reverse.
    pub(crate) fn rank_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let root = self.root?;
        let mut current = root;
        let mut rank = self.nodes.get(root).left_count.to_usize();
        loop {
            let node = self.nodes.get(current);
            match key.cmp(node.key.borrow()) {
                Ordering::Less => {
                    let left = node.left?;
                    rank = rank - node.left_count.to_usize() + self.nodes.get(left).left_count.to_usize();
                    current = left;
                }
                Ordering::Greater => {
                    let right = node.right?;
                    rank += 1 + self.nodes.get(right).left_count.to_usize();
                    current = right;
                }
                Ordering::Equal => return Some(rank),
            }
        }
    }

    /// Least node with a key strictly greater than `key`. Single descent
    /// tracking the best candidate; no backtracking.
    pub(crate) fn higher_node<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        let mut candidate = None;
        while let Some(h) = current {
            let node = self.nodes.get(h);
            if key.cmp(node.key.borrow()) == Ordering::Less {
                candidate = Some(h);
                current = node.left;
            } else {
                current = node.right;
            }
        }
        candidate
    }

    /// Greatest node with a key strictly less than `key`.
    pub(crate) fn lower_node<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        let mut candidate = None;
        while let Some(h) = current {
            let node = self.nodes.get(h);
            if key.cmp(node.key.borrow()) == Ordering::Greater {
                candidate = Some(h);
                current = node.right;
            } else {
                current = node.left;
            }
        }
        candidate
    }

    /// Least node with a key greater than or equal to `key`.
    pub(crate) fn ceiling_node<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).or_else(|| self.higher_node(key))
    }

    /// Greatest node with a key less than or equal to `key`.
    pub(crate) fn floor_node<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).or_else(|| self.lower_node(key))
    }

    /// First node of a forward range walk, honoring the start bound's
    /// inclusivity. `None` start means the tree minimum.
    pub(crate) fn range_first<Q>(&self, start: Option<&Q>, inclusive: bool) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match start {
            None => self.first_node(),
            Some(key) if inclusive => self.ceiling_node(key),
            Some(key) => self.higher_node(key),
        }
    }

    /// First node of a reverse range walk, honoring the end bound's
    /// inclusivity. `None` end means the tree maximum.
    pub(crate) fn range_last<Q>(&self, end: Option<&Q>, inclusive: bool) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match end {
            None => self.last_node(),
            Some(key) if inclusive => self.floor_node(key),
            Some(key) => self.lower_node(key),
        }
    }

    /// Verifies the structural invariants of the whole tree: no cycles,
    /// heights correct, balance factors bounded, rank counters exact, and
    /// the size counter matching the reachable node count.
    ///
    /// Diagnostic only; used as a test oracle. Iterative so the check does
    /// not rely on call-stack depth.
    pub(crate) fn is_healthy(&self) -> bool {
        let Some(root) = self.root else {
            return self.len == 0;
        };

        // Depth-first walk with a visited bitmap over the arena slots; a
        // handle reached twice means the link graph is not a tree.
        let slot_count = self.nodes.slot_count();
        let mut visited = alloc::vec![false; slot_count];
        let mut post_order: Vec<Handle> = Vec::with_capacity(self.len);
        let mut stack: SmallVec<[(Handle, bool); 48]> = SmallVec::new();
        stack.push((root, false));
        while let Some((h, expanded)) = stack.pop() {
            if expanded {
                post_order.push(h);
                continue;
            }
            let index = h.to_index();
            if visited[index] {
                return false;
            }
            visited[index] = true;
            stack.push((h, true));
            let node = self.nodes.get(h);
            if let Some(left) = node.left {
                stack.push((left, false));
            }
            if let Some(right) = node.right {
                stack.push((right, false));
            }
        }

        // Bottom-up: recompute heights and subtree sizes and compare against
        // the stored augmentation fields.
        let mut heights = alloc::vec![0i32; slot_count];
        let mut counts = alloc::vec![0usize; slot_count];
        for &h in &post_order {
            let node = self.nodes.get(h);
            let left_height = node.left.map_or(-1, |l| heights[l.to_index()]);
            let right_height = node.right.map_or(-1, |r| heights[r.to_index()]);
            if node.height != left_height.max(right_height) + 1 {
                return false;
            }
            if (left_height - right_height).abs() > 1 {
                return false;
            }
            let left_size = node.left.map_or(0, |l| counts[l.to_index()]);
            let right_size = node.right.map_or(0, |r| counts[r.to_index()]);
            if node.left_count.to_usize() != left_size {
                return false;
            }
            heights[h.to_index()] = node.height;
            counts[h.to_index()] = left_size + 1 + right_size;
        }
        counts[root.to_index()] == self.len
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    fn collect_in_order(map: &RawRavlMap<i64, i64>) -> Vec<(i64, i64)> {
        let mut out = Vec::with_capacity(map.len());
        let mut current = map.first_node();
        while let Some(h) = current {
            let (k, v) = map.key_value(h);
            out.push((*k, *v));
            current = map.successor(h);
        }
        out
    }

    #[test]
    fn insert_remove_single() {
        let mut map: RawRavlMap<i64, i64> = RawRavlMap::new();
        assert!(map.is_healthy());
        assert_eq!(map.insert(1, 10), None);
        assert_eq!(map.insert(1, 11), Some(10));
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove(&1), Some(11));
        assert!(map.is_empty());
        assert!(map.is_healthy());
    }

    #[test]
    fn overwrite_keeps_version() {
        let mut map: RawRavlMap<i64, i64> = RawRavlMap::new();
        map.insert(1, 10);
        let version = map.version();
        assert_eq!(map.insert(1, 20), Some(10));
        assert_eq!(map.version(), version);
    }

    #[test]
    fn deletion_rebalances_to_the_root() {
        // Fibonacci-shaped tree: removing the deepest leaf forces rotations
        // on more than one level.
        let mut map: RawRavlMap<i64, i64> = RawRavlMap::new();
        for key in [8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1] {
            map.insert(key, key);
            assert!(map.is_healthy());
        }
        assert_eq!(map.remove(&12), Some(12));
        assert!(map.is_healthy());
    }

    #[test]
    fn select_and_rank_agree() {
        let mut map: RawRavlMap<i64, i64> = RawRavlMap::new();
        for key in [50, 20, 70, 10, 30, 60, 80] {
            map.insert(key, -key);
        }
        for index in 0..map.len() {
            let handle = map.select(index).unwrap();
            let (key, _) = map.key_value(handle);
            assert_eq!(map.rank_of(key), Some(index));
        }
        assert_eq!(map.select(map.len()), None);
        assert_eq!(map.rank_of(&55), None);
    }

    #[test]
    fn two_child_removal_moves_successor_payload() {
        let mut map: RawRavlMap<i64, &str> = RawRavlMap::new();
        for (key, name) in [(2, "two"), (1, "one"), (4, "four"), (3, "three"), (5, "five")] {
            map.insert(key, name);
        }
        // 2 has both children; its successor 3 is spliced physically and its
        // key and payload must travel together.
        assert_eq!(map.remove(&2), Some("two"));
        assert!(map.is_healthy());
        assert_eq!(map.get(&3), Some(&"three"));
        assert_eq!(map.drain_to_vec(), [(1, "one"), (3, "three"), (4, "four"), (5, "five")]);
    }

    proptest! {
        #[test]
        fn random_ops_stay_healthy(ops in prop::collection::vec((-64i64..64, any::<bool>()), 0..512)) {
            let mut map: RawRavlMap<i64, i64> = RawRavlMap::new();
            let mut model: alloc::collections::BTreeMap<i64, i64> = alloc::collections::BTreeMap::new();

            for (key, is_insert) in ops {
                if is_insert {
                    prop_assert_eq!(map.insert(key, key * 2), model.insert(key, key * 2));
                } else {
                    prop_assert_eq!(map.remove(&key), model.remove(&key));
                }
                prop_assert!(map.is_healthy());
                prop_assert_eq!(map.len(), model.len());
            }

            let expected: Vec<(i64, i64)> = model.iter().map(|(&k, &v)| (k, v)).collect();
            prop_assert_eq!(collect_in_order(&map), expected);
        }

        #[test]
        fn select_is_inverse_of_rank(keys in prop::collection::btree_set(-1000i64..1000, 0..128)) {
            let mut map: RawRavlMap<i64, i64> = RawRavlMap::new();
            for &key in &keys {
                map.insert(key, key);
            }
            let sorted: Vec<i64> = keys.into_iter().collect();
            for (index, key) in sorted.iter().enumerate() {
                let handle = map.select(index).unwrap();
                prop_assert_eq!(map.key_value(handle).0, key);
                prop_assert_eq!(map.rank_of(key), Some(index));
            }
        }
    }
}
