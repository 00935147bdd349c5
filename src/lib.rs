//! Rank-augmented AVL collections for Rust.
//!
//! This crate provides [`RavlMap`] and [`RavlSet`], ordered associative
//! containers in the shape of the standard library's `BTreeMap` and `BTreeSet`
//! with additional O(log n) order-statistic operations:
//!
//! - [`get_by_rank`](RavlMap::get_by_rank) - Get the element at a given sorted position
//! - [`rank_of`](RavlMap::rank_of) - Get the sorted position of a key
//! - Indexing by [`Rank`] - e.g., `map[Rank(0)]` for the first element
//!
//! plus full ordered navigation ([`higher_key`](RavlMap::higher_key),
//! [`lower_key`](RavlMap::lower_key), [`ceiling_key`](RavlMap::ceiling_key),
//! [`floor_key`](RavlMap::floor_key)) and bounded range iteration in either
//! direction via [`ranged_query`](RavlMap::ranged_query).
//!
//! # Example
//!
//! ```
//! use ravl_tree::{RavlMap, Rank};
//!
//! let mut scores = RavlMap::new();
//! scores.insert("Alice", 100);
//! scores.insert("Bob", 85);
//! scores.insert("Carol", 92);
//!
//! // Standard BTreeMap operations work as expected
//! assert_eq!(scores.get(&"Bob"), Some(&85));
//! assert_eq!(scores.len(), 3);
//!
//! // Order-statistic operations (O(log n))
//! let (name, score) = scores.get_by_rank(1).unwrap();
//! assert_eq!((*name, *score), ("Bob", 85)); // Keys are sorted alphabetically
//! assert_eq!(scores.rank_of(&"Carol"), Some(2));
//! assert_eq!(scores[Rank(0)], 100);
//!
//! // Ordered navigation
//! assert_eq!(scores.higher_key(&"Bob"), Some(&"Carol"));
//! assert_eq!(scores.floor_key(&"Bo"), Some(&"Alice"));
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **O(log n) rank operations** - "k-th smallest" and "index of key" via
//!   subtree-size augmentation
//! - **Detached range queries** - [`RangedQuery`] iterates lazily without
//!   borrowing the tree, detecting out-of-band structural mutation through a
//!   version counter and supporting removal mid-iteration
//!
//! # Implementation
//!
//! The collections are implemented as a single AVL tree engine with each
//! node carrying the exact size of its left subtree. Nodes live in a
//! growable arena and refer to their relatives by index, so the bidirectional
//! parent/child links need no reference counting. Rebalancing restores both
//! the height bound and the rank counters with a closed-form adjustment per
//! rotation.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod order_statistic;
mod raw;

pub mod ravl_map;
pub mod ravl_set;

pub use error::IterError;
pub use order_statistic::Rank;
pub use ravl_map::{RangedQuery, RavlMap};
pub use ravl_set::RavlSet;
