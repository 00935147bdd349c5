use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::ops::{Bound, Index, RangeBounds};

use crate::IterError;
use crate::raw::{Handle, RawRavlMap};

mod order_statistic;

pub use crate::Rank;

/// Validates that the start bound does not exceed the end bound.
///
/// # Panics
///
/// Panics if `start > end` or if `start == end` and both bounds are `Excluded`.
fn validate_range_bounds<T, R>(range: &R)
where
    T: ?Sized + Ord,
    R: RangeBounds<T>,
{
    if let (Bound::Included(start) | Bound::Excluded(start), Bound::Included(end) | Bound::Excluded(end)) =
        (range.start_bound(), range.end_bound())
    {
        let valid =
            if matches!(range.start_bound(), Bound::Excluded(_)) && matches!(range.end_bound(), Bound::Excluded(_)) {
                start < end
            } else {
                start <= end
            };
        assert!(valid, "range start is greater than range end in RavlMap");
    }
}

/// An ordered map based on a rank-augmented [AVL tree].
///
/// Given a key type with a [total order], an ordered map stores its entries in key order.
/// That means that keys must be of a type that implements the [`Ord`] trait,
/// such that two keys can always be compared to determine their [`Ordering`].
///
/// On top of the `BTreeMap`-shaped surface, every node tracks the exact size
/// of its left subtree, which buys two O(log n) order-statistic queries:
/// [`get_by_rank`](RavlMap::get_by_rank) (the k-th smallest entry) and
/// [`rank_of`](RavlMap::rank_of) (the sorted position of a key). Ordered
/// navigation ([`higher_key`](RavlMap::higher_key), [`lower_key`](RavlMap::lower_key),
/// [`ceiling_key`](RavlMap::ceiling_key), [`floor_key`](RavlMap::floor_key)) and
/// bounded, bidirectional range iteration round out the surface.
///
/// It is a logic error for a key to be modified in such a way that the key's ordering relative to
/// any other key, as determined by the [`Ord`] trait, changes while it is in the map. This is
/// normally only possible through [`Cell`], [`RefCell`], global state, I/O, or unsafe code.
/// The behavior resulting from such a logic error is not specified, but will be encapsulated to the
/// `RavlMap` that observed the logic error and not result in undefined behavior. This could
/// include panics, incorrect results, aborts, memory leaks, and non-termination.
///
/// # Examples
///
/// ```
/// use ravl_tree::RavlMap;
///
/// // type inference lets us omit an explicit type signature (which
/// // would be `RavlMap<&str, &str>` in this example).
/// let mut movie_reviews = RavlMap::new();
///
/// // review some movies.
/// movie_reviews.insert("Office Space",       "Deals with real issues in the workplace.");
/// movie_reviews.insert("Pulp Fiction",       "Masterpiece.");
/// movie_reviews.insert("The Godfather",      "Very enjoyable.");
/// movie_reviews.insert("The Blues Brothers", "Eye lyked it a lot.");
///
/// // check for a specific one.
/// if !movie_reviews.contains_key("Les Miserables") {
///     println!("We've got {} reviews, but Les Miserables ain't one.",
///              movie_reviews.len());
/// }
///
/// // oops, this review has a lot of spelling mistakes, let's delete it.
/// movie_reviews.remove("The Blues Brothers");
///
/// // alphabetically third review, in O(log n).
/// let (title, _review) = movie_reviews.get_by_rank(2).unwrap();
/// assert_eq!(*title, "The Godfather");
///
/// // iterate over everything.
/// for (movie, review) in &movie_reviews {
///     println!("{movie}: \"{review}\"");
/// }
/// ```
///
/// A `RavlMap` with a known list of items can be initialized from an array:
///
/// ```
/// use ravl_tree::RavlMap;
///
/// let solar_distance = RavlMap::from([
///     ("Mercury", 0.4),
///     ("Venus", 0.7),
///     ("Earth", 1.0),
///     ("Mars", 1.5),
/// ]);
/// ```
///
/// # Background
///
/// An AVL tree keeps the heights of every node's two subtrees within one of
/// each other, so the tree height - and with it every point operation - stays
/// logarithmic in the element count. Augmenting each node with its left
/// subtree's size turns the same descent into an order-statistic query:
/// selecting the k-th entry or ranking a key costs one root-to-leaf walk.
///
/// Nodes are stored in a growable arena and reference their parent and
/// children by index. The parent link is a plain back-reference used for
/// upward traversal; ownership follows the child links only, so the
/// bidirectional graph involves no reference counting and no leaks.
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
/// [total order]: https://en.wikipedia.org/wiki/Total_order
/// [`Cell`]: core::cell::Cell
/// [`RefCell`]: core::cell::RefCell
pub struct RavlMap<K, V> {
    raw: RawRavlMap<K, V>,
}

/// An iterator over the entries of a `RavlMap`.
///
/// This `struct` is created by the [`iter`] method on [`RavlMap`]. See its
/// documentation for more.
///
/// # Examples
///
/// ```
/// use ravl_tree::RavlMap;
///
/// let map = RavlMap::from([(1, "a"), (2, "b")]);
/// let mut iter = map.iter();
/// assert_eq!(iter.next(), Some((&1, &"a")));
/// assert_eq!(iter.next_back(), Some((&2, &"b")));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`iter`]: RavlMap::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    map: &'a RawRavlMap<K, V>,
    front: Option<Handle>,
    back: Option<Handle>,
    remaining: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            map: self.map,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

/// An owning iterator over the entries of a `RavlMap`, sorted by key.
///
/// This `struct` is created by the [`into_iter`] method on [`RavlMap`]
/// (provided by the [`IntoIterator`] trait). See its documentation for more.
///
/// [`into_iter`]: IntoIterator::into_iter
pub struct IntoIter<K, V> {
    inner: alloc::vec::IntoIter<(K, V)>,
}

/// An iterator over the keys of a `RavlMap`.
///
/// This `struct` is created by the [`keys`] method on [`RavlMap`]. See its
/// documentation for more.
///
/// [`keys`]: RavlMap::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over the values of a `RavlMap`.
///
/// This `struct` is created by the [`values`] method on [`RavlMap`]. See its
/// documentation for more.
///
/// [`values`]: RavlMap::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An owning iterator over the keys of a `RavlMap`.
///
/// This `struct` is created by the [`into_keys`] method on [`RavlMap`].
/// See its documentation for more.
///
/// [`into_keys`]: RavlMap::into_keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IntoKeys<K, V> {
    inner: IntoIter<K, V>,
}

/// An owning iterator over the values of a `RavlMap`.
///
/// This `struct` is created by the [`into_values`] method on [`RavlMap`].
/// See its documentation for more.
///
/// [`into_values`]: RavlMap::into_values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IntoValues<K, V> {
    inner: IntoIter<K, V>,
}

/// An iterator over a sub-range of entries in a `RavlMap`.
///
/// This `struct` is created by the [`range`] method on [`RavlMap`]. See its
/// documentation for more.
///
/// # Examples
///
/// ```
/// use ravl_tree::RavlMap;
///
/// let map = RavlMap::from([(1, "a"), (2, "b"), (3, "c")]);
/// let mut range = map.range(2..=3);
/// assert_eq!(range.next(), Some((&2, &"b")));
/// assert_eq!(range.next_back(), Some((&3, &"c")));
/// assert_eq!(range.next(), None);
/// ```
///
/// [`range`]: RavlMap::range
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Range<'a, K, V> {
    map: &'a RawRavlMap<K, V>,
    front: Option<Handle>,
    back: Option<Handle>,
    /// Tracks whether the iterator has been exhausted (front and back have crossed).
    finished: bool,
}

impl<K, V> Clone for Range<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            map: self.map,
            front: self.front,
            back: self.back,
            finished: self.finished,
        }
    }
}

/// A detached, single-pass range query over a [`RavlMap`].
///
/// Unlike [`Range`], a `RangedQuery` holds no borrow of the map. It is driven
/// explicitly by passing the map to [`next`](RangedQuery::next) (and
/// exclusively to [`remove`](RangedQuery::remove)), which makes it possible to
/// mutate the map between steps - and makes it necessary to detect when that
/// happened. The query snapshots the map's structural version at creation and
/// fails fast with [`IterError::TreeModified`] if any mutation other than its
/// own `remove` intervened.
///
/// This is a best-effort programming-error detector for a single-threaded
/// caller, not a concurrency mechanism.
///
/// # Examples
///
/// ```
/// use ravl_tree::RavlMap;
///
/// let mut map = RavlMap::from([(1, 'a'), (3, 'b'), (5, 'c'), (7, 'd')]);
///
/// // Entries in [3, 7), in reverse.
/// let mut query = map.ranged_query(Some(3), Some(7), (true, false), true);
/// assert_eq!(query.next(&map).unwrap(), Some((&5, &'c')));
/// assert_eq!(query.next(&map).unwrap(), Some((&3, &'b')));
/// assert_eq!(query.next(&map).unwrap(), None);
///
/// // An out-of-band mutation trips the next step.
/// let mut query = map.ranged_query(None, None, (true, true), false);
/// map.insert(9, 'e');
/// assert!(query.next(&map).is_err());
/// ```
#[must_use = "queries are lazy and do nothing unless driven"]
pub struct RangedQuery<K> {
    /// Next node to yield, if the walk has not reached an edge.
    next: Option<Handle>,
    /// Most recently yielded node, pending a possible `remove`.
    last: Option<Handle>,
    /// Map version captured at creation or at the query's own removal.
    expected_version: u64,
    /// Bound that terminates the walk (`None` walks to the tree edge).
    stop: Option<K>,
    stop_inclusive: bool,
    reverse: bool,
}

impl<K: Ord> RangedQuery<K> {
    /// Advances the query and returns the next entry, or `Ok(None)` once the
    /// opposite bound is crossed or the tree edge is reached.
    ///
    /// # Errors
    ///
    /// [`IterError::TreeModified`] if the map was structurally mutated since
    /// this query was created, other than through [`remove`](Self::remove).
    ///
    /// # Complexity
    ///
    /// O(log n) for the first step, amortized O(1) per subsequent step.
    pub fn next<'a, V>(&mut self, map: &'a RavlMap<K, V>) -> Result<Option<(&'a K, &'a V)>, IterError> {
        if map.raw.version() != self.expected_version {
            return Err(IterError::TreeModified);
        }
        let Some(handle) = self.next else {
            return Ok(None);
        };
        let (key, value) = map.raw.key_value(handle);
        if let Some(stop) = &self.stop {
            let crossed = if self.reverse {
                if self.stop_inclusive { key < stop } else { key <= stop }
            } else if self.stop_inclusive {
                key > stop
            } else {
                key >= stop
            };
            if crossed {
                self.next = None;
                return Ok(None);
            }
        }
        self.last = Some(handle);
        self.next = if self.reverse {
            map.raw.predecessor(handle)
        } else {
            map.raw.successor(handle)
        };
        Ok(Some((key, value)))
    }

    /// Removes the entry most recently yielded by [`next`](Self::next) and
    /// returns it.
    ///
    /// This is the one structural mutation an in-flight query survives: the
    /// removal is performed through the query, which re-captures the new
    /// version and keeps its position. When the physically spliced node was
    /// about to be the next yield (the removed entry had two children and its
    /// in-order successor stood in for it), the pending position is re-pointed
    /// so iteration continues with the correct entry.
    ///
    /// # Errors
    ///
    /// - [`IterError::NothingToRemove`] if nothing was yielded since the last
    ///   removal (or at all).
    /// - [`IterError::TreeModified`] if the map was structurally mutated out
    ///   of band.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut map = RavlMap::from([(1, "a"), (2, "b"), (3, "c")]);
    /// let mut query = map.ranged_query(None, None, (true, true), false);
    ///
    /// while let Some((&key, _)) = query.next(&map).unwrap() {
    ///     if key % 2 == 0 {
    ///         query.remove(&mut map).unwrap();
    ///     }
    /// }
    /// assert_eq!(map.len(), 2);
    /// assert!(!map.contains_key(&2));
    /// ```
    pub fn remove<V>(&mut self, map: &mut RavlMap<K, V>) -> Result<(K, V), IterError> {
        let Some(target) = self.last else {
            return Err(IterError::NothingToRemove);
        };
        if map.raw.version() != self.expected_version {
            return Err(IterError::TreeModified);
        }
        self.last = None;
        let (pair, freed) = map.raw.remove_node(target);
        if Some(freed) == self.next {
            // The pending successor was spliced into the target's slot; the
            // target handle now holds its key and payload.
            self.next = Some(target);
        }
        self.expected_version = map.raw.version();
        Ok(pair)
    }
}

impl<K, V> RavlMap<K, V> {
    /// Makes a new, empty `RavlMap`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut map = RavlMap::new();
    ///
    /// // entries can now be inserted into the empty map
    /// map.insert(1, "a");
    /// ```
    #[must_use]
    pub const fn new() -> RavlMap<K, V> {
        RavlMap {
            raw: RawRavlMap::new(),
        }
    }

    /// Makes a new, empty `RavlMap` with room for `capacity` entries before
    /// the node arena reallocates.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> RavlMap<K, V> {
        RavlMap {
            raw: RawRavlMap::with_capacity(capacity),
        }
    }

    /// Returns the number of entries the map can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns the number of entries in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut a = RavlMap::new();
    /// assert_eq!(a.len(), 0);
    /// a.insert(1, "a");
    /// assert_eq!(a.len(), 1);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut a = RavlMap::new();
    /// assert!(a.is_empty());
    /// a.insert(1, "a");
    /// assert!(!a.is_empty());
    /// ```
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Clears the map, removing all elements.
    ///
    /// # Complexity
    ///
    /// O(n)
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut a = RavlMap::new();
    /// a.insert(1, "a");
    /// a.clear();
    /// assert!(a.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let map = RavlMap::from([(3, "c"), (2, "b"), (1, "a")]);
    ///
    /// for (key, value) in map.iter() {
    ///     println!("{key}: {value}");
    /// }
    ///
    /// let (first_key, first_value) = map.iter().next().unwrap();
    /// assert_eq!((*first_key, *first_value), (1, "a"));
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            map: &self.raw,
            front: self.raw.first_node(),
            back: self.raw.last_node(),
            remaining: self.raw.len(),
        }
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let map = RavlMap::from([(2, "b"), (1, "a")]);
    /// let keys: Vec<_> = map.keys().copied().collect();
    /// assert_eq!(keys, [1, 2]);
    /// ```
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the map, in order by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let map = RavlMap::from([(1, "hello"), (2, "goodbye")]);
    /// let values: Vec<_> = map.values().copied().collect();
    /// assert_eq!(values, ["hello", "goodbye"]);
    /// ```
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Creates a consuming iterator visiting all the keys, in sorted order.
    /// The map cannot be used after calling this.
    pub fn into_keys(self) -> IntoKeys<K, V> {
        IntoKeys {
            inner: self.into_iter(),
        }
    }

    /// Creates a consuming iterator visiting all the values, in order by key.
    /// The map cannot be used after calling this.
    pub fn into_values(self) -> IntoValues<K, V> {
        IntoValues {
            inner: self.into_iter(),
        }
    }

    /// Verifies the structural invariants of the underlying tree: absence of
    /// cycles, height correctness, the AVL balance bound, and exact rank
    /// counters.
    ///
    /// This is a diagnostic for tests and debugging; no operation of the map
    /// relies on it.
    ///
    /// # Complexity
    ///
    /// O(n)
    #[must_use]
    pub fn is_healthy(&self) -> bool
    where
        K: Ord,
    {
        self.raw.is_healthy()
    }
}

impl<K: Ord, V> RavlMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut map = RavlMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut map = RavlMap::new();
    /// map.insert(1, "a");
    /// if let Some(x) = map.get_mut(&1) {
    ///     *x = "b";
    /// }
    /// assert_eq!(map[&1], "b");
    /// ```
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get_mut(key)
    }

    /// Returns the key-value pair corresponding to the supplied key. This is
    /// potentially useful for key types where non-identical keys can be
    /// considered equal, or for getting a reference to the stored key with
    /// the same lifetime as the collection.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get_key_value(key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut map = RavlMap::new();
    /// map.insert(1, "a");
    /// assert!(map.contains_key(&1));
    /// assert!(!map.contains_key(&2));
    /// ```
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.contains_key(key)
    }

    /// Returns `true` if the map contains an entry with the given value.
    ///
    /// Value equality is independent of the key ordering. This walks the
    /// whole map in the worst case.
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.raw.contains_value(value)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned.
    ///
    /// If the map did have this key present, the value is updated in place and
    /// the old value is returned. The key is not updated, though; this matters
    /// for types that can be `==` without being identical.
    ///
    /// # Complexity
    ///
    /// O(log n), with at most one rebalancing rotation.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut map = RavlMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert!(!map.is_empty());
    ///
    /// map.insert(37, "b");
    /// assert_eq!(map.insert(37, "c"), Some("b"));
    /// assert_eq!(map[&37], "c");
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.raw.insert(key, value)
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    ///
    /// # Complexity
    ///
    /// O(log n); unlike insertion, a removal may rotate at every level.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut map = RavlMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove(key)
    }

    /// Removes a key from the map, returning the stored key and value if the
    /// key was previously in the map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove_entry(key)
    }

    /// Returns the first key-value pair in the map.
    /// The key in this pair is the minimum key in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut map = RavlMap::new();
    /// assert_eq!(map.first_key_value(), None);
    /// map.insert(1, "b");
    /// map.insert(2, "a");
    /// assert_eq!(map.first_key_value(), Some((&1, &"b")));
    /// ```
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first_node().map(|h| self.raw.key_value(h))
    }

    /// Returns the last key-value pair in the map.
    /// The key in this pair is the maximum key in the map.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last_node().map(|h| self.raw.key_value(h))
    }

    /// Removes and returns the first element in the map.
    /// The key of this element is the minimum key that was in the map.
    ///
    /// # Examples
    ///
    /// Draining elements in ascending order, while keeping a usable map each iteration.
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let mut map = RavlMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    /// while let Some((key, _val)) = map.pop_first() {
    ///     assert!(map.iter().all(|(k, _v)| *k > key));
    /// }
    /// assert!(map.is_empty());
    /// ```
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.raw.pop_first()
    }

    /// Removes and returns the last element in the map.
    /// The key of this element is the maximum key that was in the map.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.raw.pop_last()
    }

    /// Returns the least key strictly greater than the given key.
    ///
    /// # Complexity
    ///
    /// O(log n), a single descent with no backtracking.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let map = RavlMap::from([(1, "one"), (3, "three")]);
    /// assert_eq!(map.higher_key(&1), Some(&3));
    /// assert_eq!(map.higher_key(&2), Some(&3));
    /// assert_eq!(map.higher_key(&3), None);
    /// ```
    pub fn higher_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.higher_entry(key).map(|(k, _)| k)
    }

    /// Returns the entry with the least key strictly greater than the given
    /// key.
    pub fn higher_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.higher_node(key).map(|h| self.raw.key_value(h))
    }

    /// Returns the greatest key strictly less than the given key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let map = RavlMap::from([(1, "one"), (3, "three")]);
    /// assert_eq!(map.lower_key(&1), None);
    /// assert_eq!(map.lower_key(&3), Some(&1));
    /// ```
    pub fn lower_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.lower_entry(key).map(|(k, _)| k)
    }

    /// Returns the entry with the greatest key strictly less than the given
    /// key.
    pub fn lower_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.lower_node(key).map(|h| self.raw.key_value(h))
    }

    /// Returns the least key greater than or equal to the given key: the key
    /// itself when present, otherwise the same as
    /// [`higher_key`](Self::higher_key).
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let map = RavlMap::from([(1, "one"), (3, "three")]);
    /// assert_eq!(map.ceiling_key(&1), Some(&1));
    /// assert_eq!(map.ceiling_key(&2), Some(&3));
    /// assert_eq!(map.ceiling_key(&4), None);
    /// ```
    pub fn ceiling_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.ceiling_entry(key).map(|(k, _)| k)
    }

    /// Returns the entry with the least key greater than or equal to the
    /// given key.
    pub fn ceiling_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.ceiling_node(key).map(|h| self.raw.key_value(h))
    }

    /// Returns the greatest key less than or equal to the given key: the key
    /// itself when present, otherwise the same as
    /// [`lower_key`](Self::lower_key).
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let map = RavlMap::from([(1, "one"), (3, "three")]);
    /// assert_eq!(map.floor_key(&2), Some(&1));
    /// assert_eq!(map.floor_key(&3), Some(&3));
    /// assert_eq!(map.floor_key(&0), None);
    /// ```
    pub fn floor_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.floor_entry(key).map(|(k, _)| k)
    }

    /// Returns the entry with the greatest key less than or equal to the
    /// given key.
    pub fn floor_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.floor_node(key).map(|h| self.raw.key_value(h))
    }

    /// Constructs a double-ended iterator over a sub-range of entries in the
    /// map. The simplest way is to use the range syntax `min..max`, thus
    /// `range(min..max)` will yield elements from min (inclusive) to max
    /// (exclusive). The range may also be entered as `(Bound<T>, Bound<T>)`.
    ///
    /// # Panics
    ///
    /// Panics if range `start > end`, or if range `start == end` and both
    /// bounds are `Excluded`.
    ///
    /// # Complexity
    ///
    /// O(log n) to construct, amortized O(1) per element.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::ops::Bound::Included;
    /// use ravl_tree::RavlMap;
    ///
    /// let mut map = RavlMap::new();
    /// map.insert(3, "a");
    /// map.insert(5, "b");
    /// map.insert(8, "c");
    /// for (&key, &value) in map.range((Included(&4), Included(&8))) {
    ///     println!("{key}: {value}");
    /// }
    /// assert_eq!(map.range(4..).next(), Some((&5, &"b")));
    /// ```
    pub fn range<Q, R>(&self, range: R) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        R: RangeBounds<Q>,
    {
        validate_range_bounds(&range);
        let front = match range.start_bound() {
            Bound::Unbounded => self.raw.first_node(),
            Bound::Included(key) => self.raw.ceiling_node(key),
            Bound::Excluded(key) => self.raw.higher_node(key),
        };
        let back = match range.end_bound() {
            Bound::Unbounded => self.raw.last_node(),
            Bound::Included(key) => self.raw.floor_node(key),
            Bound::Excluded(key) => self.raw.lower_node(key),
        };
        let finished = match (front, back) {
            (Some(front), Some(back)) => self.raw.node(front).key > self.raw.node(back).key,
            _ => true,
        };
        Range {
            map: &self.raw,
            front,
            back,
            finished,
        }
    }

    /// Creates a detached, lazy query over the entries between `start` and
    /// `end`, each bound independently inclusive or exclusive, traversed
    /// forward or in reverse.
    ///
    /// `None` bounds extend the range to the corresponding tree edge. The
    /// bounds are owned because the query outlives any borrow of the map:
    /// it is driven by [`RangedQuery::next`], which re-validates against the
    /// map's structural version on every step and fails fast if the map was
    /// mutated out of band. See [`RangedQuery`] for the full protocol,
    /// including removal mid-iteration.
    ///
    /// # Examples
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let map = RavlMap::from([(1, "a"), (3, "b"), (5, "c"), (7, "d"), (9, "e")]);
    ///
    /// let mut query = map.ranged_query(Some(3), Some(7), (true, true), false);
    /// let mut keys = Vec::new();
    /// while let Some((&key, _)) = query.next(&map).unwrap() {
    ///     keys.push(key);
    /// }
    /// assert_eq!(keys, [3, 5, 7]);
    /// ```
    pub fn ranged_query(&self, start: Option<K>, end: Option<K>, inclusive: (bool, bool), reverse: bool) -> RangedQuery<K> {
        let (first, stop, stop_inclusive) = if reverse {
            (self.raw.range_last(end.as_ref(), inclusive.1), start, inclusive.0)
        } else {
            (self.raw.range_first(start.as_ref(), inclusive.0), end, inclusive.1)
        };
        RangedQuery {
            next: first,
            last: None,
            expected_version: self.raw.version(),
            stop,
            stop_inclusive,
            reverse,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.front?;
        self.remaining -= 1;
        self.front = if self.remaining == 0 {
            None
        } else {
            self.map.successor(handle)
        };
        Some(self.map.key_value(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }

    fn last(mut self) -> Option<(&'a K, &'a V)> {
        self.next_back()
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<(&'a K, &'a V)> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.back?;
        self.remaining -= 1;
        self.back = if self.remaining == 0 {
            None
        } else {
            self.map.predecessor(handle)
        };
        Some(self.map.key_value(handle))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<(K, V)> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Keys<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for Values<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<K, V> Iterator for IntoKeys<K, V> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoKeys<K, V> {
    fn next_back(&mut self) -> Option<K> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for IntoKeys<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoKeys<K, V> {}

impl<K, V> Iterator for IntoValues<K, V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoValues<K, V> {
    fn next_back(&mut self) -> Option<V> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for IntoValues<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoValues<K, V> {}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        if self.finished {
            return None;
        }
        let handle = self.front?;
        if self.front == self.back {
            self.finished = true;
        } else {
            self.front = self.map.successor(handle);
        }
        Some(self.map.key_value(handle))
    }
}

impl<K, V> DoubleEndedIterator for Range<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let handle = self.back?;
        if self.front == self.back {
            self.finished = true;
        } else {
            self.back = self.map.predecessor(handle);
        }
        Some(self.map.key_value(handle))
    }
}

impl<K, V> FusedIterator for Range<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Range<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a RavlMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V> IntoIterator for RavlMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Gets an owning iterator over the entries of the map, sorted by key.
    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter {
            inner: self.raw.drain_to_vec().into_iter(),
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RavlMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> RavlMap<K, V> {
        let mut map = RavlMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for RavlMap<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K: Ord + Copy, V: Copy> Extend<(&'a K, &'a V)> for RavlMap<K, V> {
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|(&key, &value)| (key, value)));
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for RavlMap<K, V> {
    /// Converts a `[(K, V); N]` into a `RavlMap<K, V>`.
    ///
    /// ```
    /// use ravl_tree::RavlMap;
    ///
    /// let map1 = RavlMap::from([(1, 2), (3, 4)]);
    /// let map2: RavlMap<_, _> = [(1, 2), (3, 4)].into();
    /// assert_eq!(map1, map2);
    /// ```
    fn from(arr: [(K, V); N]) -> RavlMap<K, V> {
        RavlMap::from_iter(arr)
    }
}

impl<K, V> Default for RavlMap<K, V> {
    /// Creates an empty `RavlMap`.
    fn default() -> RavlMap<K, V> {
        RavlMap::new()
    }
}

impl<K: Clone, V: Clone> Clone for RavlMap<K, V> {
    fn clone(&self) -> Self {
        RavlMap {
            raw: self.raw.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RavlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for RavlMap<K, V> {
    fn eq(&self, other: &RavlMap<K, V>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq> Eq for RavlMap<K, V> {}

impl<K: PartialOrd, V: PartialOrd> PartialOrd for RavlMap<K, V> {
    fn partial_cmp(&self, other: &RavlMap<K, V>) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord> Ord for RavlMap<K, V> {
    fn cmp(&self, other: &RavlMap<K, V>) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K: Hash, V: Hash> Hash for RavlMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for entry in self.iter() {
            entry.hash(state);
        }
    }
}

impl<K, Q, V> Index<&Q> for RavlMap<K, V>
where
    K: Borrow<Q> + Ord,
    Q: ?Sized + Ord,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the `RavlMap`.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}
