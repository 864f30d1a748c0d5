//! # bdd-engine: Reduced Ordered Binary Decision Diagrams
//!
//! **`bdd-engine`** is a manager-centric library for **Reduced Ordered Binary Decision Diagrams (ROBDDs)**
//! with garbage collection and dynamic variable reordering.
//!
//! ## What is a BDD?
//!
//! A Binary Decision Diagram represents a boolean function as a directed acyclic graph.
//! For a fixed variable order every function has exactly one reduced representation,
//! so equivalence checking is a comparison of node ids.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: every function lives in one [`Bdd`][crate::bdd::Bdd] manager,
//!   which owns the node store, the unique table, and the operator caches.
//! - **Lightweight Handles**: functions are [`Ref`][crate::reference::Ref] ids. Ids `0` and `1` are FALSE and TRUE.
//! - **0-Based Variables**: variables are numbered `0..var_num`, and initially variable `v` sits at level `v`.
//! - **Garbage Collection**: nodes not reachable from a [protected](crate::bdd::Bdd::protect) root are reclaimed
//!   when the store runs full, or on demand with [`gc`](crate::bdd::Bdd::gc).
//! - **Dynamic Reordering**: sifting and window permutation, on demand or triggered automatically when the
//!   graph grows. See the [`reorder`] module.
//! - **Rich API**: binary operators, if-then-else, quantification, restriction, composition, renaming,
//!   and satisfiability queries.
//!
//! ## Basic Usage
//!
//! ```rust
//! use bdd_engine::bdd::Bdd;
//! use bdd_engine::reference::Ref;
//!
//! // 1. Initialize the manager with three variables
//! let mut bdd = Bdd::default();
//! bdd.set_var_num(3).unwrap();
//!
//! // 2. Fetch the literals
//! let x0 = bdd.ith_var(0).unwrap();
//! let x1 = bdd.ith_var(1).unwrap();
//!
//! // 3. Build f = x0 AND (NOT x1)
//! let not_x1 = bdd.apply_not(x1).unwrap();
//! let f = bdd.apply_and(x0, not_x1).unwrap();
//! let f = bdd.protect(f).unwrap();
//!
//! // 4. Check properties
//! assert_ne!(f, Ref::ZERO); // satisfiable
//! assert_ne!(f, Ref::ONE); // not a tautology
//! assert!(bdd.eval(f, &[true, false, true]).unwrap());
//! assert_eq!(bdd.sat_count(f).unwrap(), 2.0); // x2 is free
//!
//! // 5. Quantify x0 away
//! let cube = bdd.make_set(&[0]).unwrap();
//! assert_eq!(bdd.exist(f, cube).unwrap(), not_x1);
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: the [`Bdd`][crate::bdd::Bdd] manager, variables, node construction, and configuration setters.
//! - **[`apply`]**, **[`quant`]**, **[`restrict`]**, **[`compose`]**: the recursive operators.
//! - **[`count`]**, **[`sat`]**: model counting and satisfying assignments.
//! - **[`gc`]**: mark-sweep collection.
//! - **[`reorder`]**, **[`window`]**, **[`sift`]**: variable reordering.
//! - **[`config`]**, **[`error`]**: configuration and error types.

pub mod alloc;
pub mod apply;
pub mod bdd;
pub mod bitset;
pub mod blocks;
pub mod cache;
pub mod compose;
pub mod config;
pub mod count;
pub mod error;
pub mod gc;
pub mod node;
pub mod pairs;
pub mod quant;
pub mod reference;
pub mod reorder;
pub mod restrict;
pub mod roots;
pub mod sat;
pub mod sift;
pub mod storage;
pub mod table;
pub mod types;
pub mod utils;
pub mod validate;
pub mod window;
