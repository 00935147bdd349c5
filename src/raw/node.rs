use super::handle::Handle;
use super::size::Size;

/// One element of the tree: a key, a handle into the value arena, and the
/// link/augmentation record.
///
/// `parent` is a plain back-reference for upward traversal during rotation
/// and navigation; it never determines ownership or lifetime. `height` is the
/// longest descendant path (-1 denotes an empty subtree at the call sites
/// that probe absent children). `left_count` is the exact node count of the
/// left subtree, maintained on every mutation so rank queries stay O(log n).
pub(crate) struct Node<K> {
    pub(crate) key: K,
    pub(crate) value: Handle,
    pub(crate) parent: Option<Handle>,
    pub(crate) left: Option<Handle>,
    pub(crate) right: Option<Handle>,
    pub(crate) height: i32,
    pub(crate) left_count: Size,
}

impl<K> Node<K> {
    /// Creates a fresh leaf, unlinked until the caller attaches it.
    pub(crate) const fn new_leaf(key: K, value: Handle) -> Self {
        Self {
            key,
            value,
            parent: None,
            left: None,
            right: None,
            height: 0,
            left_count: Size::ZERO,
        }
    }
}

impl<K: Clone> Clone for Node<K> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value,
            parent: self.parent,
            left: self.left,
            right: self.right,
            height: self.height,
            left_count: self.left_count,
        }
    }
}
