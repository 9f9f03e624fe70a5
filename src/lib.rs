//! BIR - a mutable tree IR for compiler lowering
//!
//! # Overview
//!
//! A compiler backend rewrites its intermediate representation many times:
//! functions get inlined, blocks flattened, dead declarations deleted. Each
//! rewrite needs fast answers to a few questions that a plain tree cannot
//! give cheaply:
//!
//! - Who references this declaration?
//! - Which elements currently satisfy this predicate?
//! - Where exactly does this element sit in its parent?
//!
//! [`BirTree`] answers all three in time proportional to the answer, by
//! keeping parent links, back-reference buckets and predicate-indexed
//! element sets in step with every mutation.
//!
//! # Quick Start
//!
//! ```
//! use bir::{BirTree, ElementClass, ModuleOrigin, Pipeline};
//!
//! let mut tree = BirTree::new();
//! let unused = tree.function("unused", [], None).unwrap();
//! let answer = tree.constant(bir::ConstValue::Int(42));
//! let ret = tree.ret(None, Some(answer)).unwrap();
//! let body = tree.block([ret]).unwrap();
//! let main = tree.function("main", [], Some(body)).unwrap();
//! tree.modify(main, |kind| {
//!     if let bir::ElementKind::Function { is_exported, .. } = kind {
//!         *is_exported = true;
//!     }
//! })
//! .unwrap();
//! let file = tree.file("main", [unused, main]).unwrap();
//! tree.add_module(file, ModuleOrigin::Local).unwrap();
//!
//! Pipeline::standard().run(&mut tree).unwrap();
//!
//! assert_eq!(tree.elements_of_class(ElementClass::Function).unwrap().len(), 1);
//! assert!(tree.check_invariants().is_ok());
//! ```
//!
//! # Crate layout
//!
//! Everything lives in [`bir_core`], which is `no_std` + `alloc`. This crate
//! re-exports it with the `std` feature on, which enables phase timings.

pub use bir_core::*;
