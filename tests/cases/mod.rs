//! Shared fixtures and a brute-force reference model.
//!
//! The model recomputes from scratch everything the tree maintains
//! incrementally, using only the public read API, so the integration tests
//! can compare the two after every mutation.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use bir::{BackRef, BirTree, ElementId, ElementKind, ElementRef, ModuleOrigin, RefSlot, slots};

pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Attached elements and the origin of the module each one is under.
pub fn attached(tree: &BirTree) -> BTreeMap<ElementId, ModuleOrigin> {
    let mut out = BTreeMap::new();
    for (_, entry) in tree.modules() {
        for id in tree.preorder(entry.root) {
            out.insert(id, entry.origin);
        }
    }
    out
}

/// `e.parent == p` iff `p`'s slots hold `e`, at the recorded position.
pub fn assert_parent_invariant(tree: &BirTree) {
    for id in tree.ids() {
        let element = tree.get(id).unwrap();
        let layout = element.class().layout();
        for slot in 0..layout.children.len() {
            let slot = bir::ChildSlot(slot as u16);
            for (index, &child) in tree.slot_children(id, slot).iter().enumerate() {
                assert_eq!(tree.parent(child), Some(id), "{child} listed under {id}");
                assert_eq!(tree.position_in_parent(child), Some((slot, index)));
            }
        }
        if let Some(parent) = tree.parent(id) {
            assert!(
                tree.children(parent).any(|child| child == id),
                "{id} claims {parent} but is not among its children"
            );
        }
    }
}

/// Live reference edges of attached elements, as `(target, from, slot)`.
pub fn live_edges(tree: &BirTree) -> BTreeSet<(ElementId, ElementId, RefSlot)> {
    attached(tree)
        .keys()
        .flat_map(|&from| {
            tree.get(from)
                .unwrap()
                .references()
                .map(move |(slot, target)| (target, from, slot))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Every bucket entry in the tree, as `(target, from, slot)`.
pub fn recorded_edges(tree: &BirTree) -> BTreeSet<(ElementId, ElementId, RefSlot)> {
    let mut out = BTreeSet::new();
    for target in tree.ids() {
        for BackRef { from, slot } in tree.references_to(target).unwrap() {
            assert!(out.insert((target, from, slot)), "duplicate entry {from} -> {target}");
        }
    }
    out
}

/// Brute-force answer for a feature key over local (or all) modules.
pub fn brute_force(
    tree: &BirTree,
    include_other_modules: bool,
    predicate: impl Fn(ElementRef<'_>) -> bool,
) -> BTreeSet<ElementId> {
    attached(tree)
        .into_iter()
        .filter(|&(_, origin)| include_other_modules || origin == ModuleOrigin::Local)
        .map(|(id, _)| id)
        .filter(|&id| predicate(tree.element_ref(id).unwrap()))
        .collect()
}

pub fn is_inline_function(e: ElementRef<'_>) -> bool {
    e.kind().is_inline_function()
}

pub fn function(tree: &mut BirTree, name: &str, is_inline: bool) -> ElementId {
    tree.create(ElementKind::Function {
        name: name.into(),
        is_inline,
        is_exported: false,
    })
}

/// A tree with deep block nesting, empty optional slots and multi-item
/// lists, rooted at a file:
///
/// ```text
/// File
///   Function f (parameters: p0, p1(default: Const), body: Block)
///     Block [Block [Block [Return(empty)]], Call(no receiver)[GetValue, Const], When [Branch(cond, -), Branch(-, result)]]
///   Class C [Function g (no body)]
/// ```
pub fn representative(tree: &mut BirTree) -> ElementId {
    let p0 = tree.value_parameter("p0", None).unwrap();
    let default = tree.constant(bir::ConstValue::Bool(true));
    let p1 = tree.value_parameter("p1", Some(default)).unwrap();

    let empty_return = tree.ret(None, None).unwrap();
    let innermost = tree.block([empty_return]).unwrap();
    let middle = tree.block([innermost]).unwrap();
    let get = tree.get_value(p0).unwrap();
    let arg = tree.constant(bir::ConstValue::Str("s".into()));
    let call = tree.call(None, None, [get, arg]).unwrap();
    let cond = tree.constant(bir::ConstValue::Bool(false));
    let result = tree.constant(bir::ConstValue::Int(1));
    let first = tree.branch(Some(cond), None).unwrap();
    let second = tree.branch(None, Some(result)).unwrap();
    let when = tree.when([first, second]).unwrap();
    let body = tree.block([middle, call, when]).unwrap();
    let f = tree.function("f", [p0, p1], Some(body)).unwrap();
    tree.set_reference(call, slots::call::TARGET, Some(f)).unwrap();

    let g = tree.function("g", [], None).unwrap();
    let class = tree.class_decl("C", None, [g]).unwrap();
    tree.file("representative", [f, class]).unwrap()
}
