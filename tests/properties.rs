//! Property-based tests for the tree registries.
//!
//! Random mutation sequences are applied to a small program; after every
//! step the parent links, the back-reference buckets and every feature set
//! are compared with a from-scratch recomputation.

mod cases;

use std::rc::Rc;

use bir::{
    BirTree, ChildSlot, ConstValue, ElementClass, ElementId, ElementKind, ElementRef,
    ElementVisitor, FeatureKey, FeatureSpec, ModuleOrigin, RefSlot, WalkStep, accept, slots,
    traverse_parent_based,
};
use proptest::prelude::*;

use cases::{
    assert_parent_invariant, attached, brute_force, is_inline_function, live_edges,
    recorded_edges,
};

#[derive(Debug, Clone)]
enum Op {
    Create(u8),
    SetChild {
        parent: usize,
        slot: u8,
        child: Option<usize>,
    },
    Insert {
        parent: usize,
        slot: u8,
        index: usize,
        child: usize,
    },
    RemoveAt {
        parent: usize,
        slot: u8,
        index: usize,
    },
    Replace {
        old: usize,
        new: usize,
    },
    Remove(usize),
    SetReference {
        element: usize,
        slot: u8,
        target: Option<usize>,
    },
    Splice {
        dst: usize,
        dst_slot: u8,
        index: usize,
        src: usize,
        src_slot: u8,
    },
    Modify(usize),
    AddModule {
        root: usize,
        external: bool,
    },
    RemoveModule(usize),
    RegisterKey(u8),
    ReleaseKey(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => any::<u8>().prop_map(Op::Create),
        3 => (any::<usize>(), any::<u8>(), any::<Option<usize>>())
            .prop_map(|(parent, slot, child)| Op::SetChild { parent, slot, child }),
        4 => (any::<usize>(), any::<u8>(), 0usize..4, any::<usize>())
            .prop_map(|(parent, slot, index, child)| Op::Insert { parent, slot, index, child }),
        2 => (any::<usize>(), any::<u8>(), 0usize..4)
            .prop_map(|(parent, slot, index)| Op::RemoveAt { parent, slot, index }),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(old, new)| Op::Replace { old, new }),
        2 => any::<usize>().prop_map(Op::Remove),
        3 => (any::<usize>(), any::<u8>(), any::<Option<usize>>())
            .prop_map(|(element, slot, target)| Op::SetReference { element, slot, target }),
        2 => (any::<usize>(), any::<u8>(), any::<usize>(), any::<usize>(), any::<u8>()).prop_map(
            |(dst, dst_slot, index, src, src_slot)| Op::Splice { dst, dst_slot, index, src, src_slot }
        ),
        2 => any::<usize>().prop_map(Op::Modify),
        1 => (any::<usize>(), any::<bool>()).prop_map(|(root, external)| Op::AddModule { root, external }),
        1 => any::<usize>().prop_map(Op::RemoveModule),
        1 => any::<u8>().prop_map(Op::RegisterKey),
        1 => any::<usize>().prop_map(Op::ReleaseKey),
    ]
}

fn kind(n: u8) -> ElementKind {
    match n % 9 {
        0 => ElementKind::Block,
        1 => ElementKind::Call,
        2 => ElementKind::Function {
            name: format!("f{n}"),
            is_inline: n % 2 == 0,
            is_exported: false,
        },
        3 => ElementKind::Return,
        4 => ElementKind::GetValue,
        5 => ElementKind::When,
        6 => ElementKind::Branch,
        7 => ElementKind::Const(ConstValue::Int(n.into())),
        _ => ElementKind::Variable {
            name: format!("v{n}"),
            is_mutable: n % 2 == 1,
        },
    }
}

type Predicate = Rc<dyn Fn(ElementRef<'_>) -> bool>;

/// Number of distinct predicates [`Harness::register`] rotates through.
const KEY_KINDS: u8 = 6;

struct Tracked {
    key: FeatureKey,
    include_other_modules: bool,
    predicate: Predicate,
}

struct Harness {
    tree: BirTree,
    /// Target of the "calls to x" predicate.
    x: ElementId,
    /// Parent of the "statements of main" predicate.
    main_body: ElementId,
    keys: Vec<Tracked>,
}

impl Harness {
    fn new() -> Self {
        let mut tree = BirTree::new();
        let x = tree.function("x", [], None).unwrap();
        let call = tree.call(Some(x), None, []).unwrap();
        let body = tree.block([call]).unwrap();
        let main = tree.create(ElementKind::Function {
            name: "main".into(),
            is_inline: true,
            is_exported: true,
        });
        tree.set_child(main, slots::function::BODY, Some(body)).unwrap();
        let local = tree.file("local", [x, main]).unwrap();
        tree.add_module(local, ModuleOrigin::Local).unwrap();

        let external_call = tree.call(Some(x), None, []).unwrap();
        let external_body = tree.block([external_call]).unwrap();
        let external_fn = tree.function("lib", [], Some(external_body)).unwrap();
        let external = tree.file("external", [external_fn]).unwrap();
        tree.add_module(external, ModuleOrigin::External).unwrap();

        for n in 0..4 {
            tree.create(kind(n));
        }

        let mut harness = Self {
            tree,
            x,
            main_body: body,
            keys: Vec::new(),
        };
        for which in 0..KEY_KINDS {
            harness.register(which);
        }
        harness
    }

    fn register(&mut self, which: u8) {
        let (x, main_body) = (self.x, self.main_body);
        let (predicate, classes, include_other_modules): (Predicate, _, _) =
            match which % KEY_KINDS {
                0 => (Rc::new(is_inline_function) as Predicate, None, false),
                1 => {
                    let calls_x = move |e: ElementRef<'_>| {
                        e.class() == ElementClass::Call
                            && e.reference(slots::call::TARGET) == Some(x)
                    };
                    (Rc::new(calls_x) as Predicate, Some(ElementClass::Call), false)
                }
                2 => {
                    let blocks = |e: ElementRef<'_>| e.class() == ElementClass::Block;
                    (Rc::new(blocks) as Predicate, Some(ElementClass::Block), true)
                }
                3 => {
                    let busy_blocks = |e: ElementRef<'_>| {
                        e.class() == ElementClass::Block
                            && e.slot_children(slots::block::STATEMENTS).len() >= 2
                    };
                    (Rc::new(busy_blocks) as Predicate, Some(ElementClass::Block), false)
                }
                4 => {
                    let second_item = |e: ElementRef<'_>| {
                        e.element().parent_link().is_some_and(|link| link.index == 1)
                    };
                    (Rc::new(second_item) as Predicate, None, true)
                }
                _ => {
                    let in_main_body = move |e: ElementRef<'_>| e.parent() == Some(main_body);
                    (Rc::new(in_main_body) as Predicate, None, false)
                }
            };
        let inner = predicate.clone();
        let mut spec =
            FeatureSpec::new(move |e| inner(e)).include_other_modules(include_other_modules);
        if let Some(class) = classes {
            spec = spec.of_classes(class);
        }
        let key = self.tree.register_feature(spec);
        self.keys.push(Tracked {
            key,
            include_other_modules,
            predicate,
        });
    }

    fn pick(&self, n: usize) -> ElementId {
        self.tree.ids().nth(n % self.tree.len()).unwrap()
    }

    fn child_slot(&self, id: ElementId, n: u8) -> Option<ChildSlot> {
        let count = self.tree.class(id)?.layout().children.len();
        (count > 0).then(|| ChildSlot((n as usize % count) as u16))
    }

    fn ref_slot(&self, id: ElementId, n: u8) -> Option<RefSlot> {
        let count = self.tree.class(id)?.layout().references.len();
        (count > 0).then(|| RefSlot((n as usize % count) as u16))
    }

    /// Applies one operation. Returns `None` when it did not apply to the
    /// picked elements, otherwise whether the tree accepted it.
    fn apply(&mut self, op: &Op) -> Option<bool> {
        let accepted = match *op {
            Op::Create(n) => {
                self.tree.create(kind(n));
                true
            }
            Op::SetChild {
                parent,
                slot,
                child,
            } => {
                let parent = self.pick(parent);
                let slot = self.child_slot(parent, slot)?;
                let child = child.map(|c| self.pick(c));
                self.tree.set_child(parent, slot, child).is_ok()
            }
            Op::Insert {
                parent,
                slot,
                index,
                child,
            } => {
                let parent = self.pick(parent);
                let slot = self.child_slot(parent, slot)?;
                let child = self.pick(child);
                self.tree.insert_child(parent, slot, index, child).is_ok()
            }
            Op::RemoveAt {
                parent,
                slot,
                index,
            } => {
                let parent = self.pick(parent);
                let slot = self.child_slot(parent, slot)?;
                self.tree.remove_child_at(parent, slot, index).is_ok()
            }
            Op::Replace { old, new } => {
                let (old, new) = (self.pick(old), self.pick(new));
                self.tree.replace(old, new).is_ok()
            }
            Op::Remove(element) => {
                let element = self.pick(element);
                self.tree.remove(element).is_ok()
            }
            Op::SetReference {
                element,
                slot,
                target,
            } => {
                let element = self.pick(element);
                let slot = self.ref_slot(element, slot)?;
                let target = target.map(|t| self.pick(t));
                self.tree.set_reference(element, slot, target).is_ok()
            }
            Op::Splice {
                dst,
                dst_slot,
                index,
                src,
                src_slot,
            } => {
                let (dst, src) = (self.pick(dst), self.pick(src));
                let dst_slot = self.child_slot(dst, dst_slot)?;
                let src_slot = self.child_slot(src, src_slot)?;
                let index = index % (self.tree.slot_children(dst, dst_slot).len() + 1);
                self.tree
                    .splice_all_from_at(dst, dst_slot, index, src, src_slot)
                    .is_ok()
            }
            Op::Modify(element) => {
                let element = self.pick(element);
                self.tree
                    .modify(element, |kind| match kind {
                        ElementKind::Function { is_inline, .. } => *is_inline = !*is_inline,
                        ElementKind::Variable { is_mutable, .. } => *is_mutable = !*is_mutable,
                        _ => {}
                    })
                    .is_ok()
            }
            Op::AddModule { root, external } => {
                let root = self.pick(root);
                let origin = if external {
                    ModuleOrigin::External
                } else {
                    ModuleOrigin::Local
                };
                self.tree.add_module(root, origin).is_ok()
            }
            Op::RemoveModule(n) => {
                let modules: Vec<_> = self.tree.modules().map(|(module, _)| module).collect();
                if modules.is_empty() {
                    return None;
                }
                self.tree.remove_module(modules[n % modules.len()]).is_ok()
            }
            Op::RegisterKey(which) => {
                self.register(which);
                true
            }
            Op::ReleaseKey(n) => {
                if self.keys.is_empty() {
                    return None;
                }
                let tracked = self.keys.remove(n % self.keys.len());
                self.tree.release_feature(tracked.key).unwrap();
                assert!(self.tree.matching(tracked.key).is_err());
                true
            }
        };
        Some(accepted)
    }

    fn check(&self) {
        let tree = &self.tree;
        assert_parent_invariant(tree);

        let attached = attached(tree);
        for id in tree.ids() {
            assert_eq!(tree.is_attached(id), attached.contains_key(&id), "{id}");
        }

        assert_eq!(live_edges(tree), recorded_edges(tree));

        for tracked in &self.keys {
            let expected = brute_force(tree, tracked.include_other_modules, &*tracked.predicate);
            let actual = tree.matching(tracked.key).unwrap();
            assert_eq!(actual.to_sorted_vec(), expected.into_iter().collect::<Vec<_>>());
        }

        if let Err(violation) = tree.check_invariants() {
            panic!("{violation}");
        }
    }
}

#[derive(Default)]
struct Recorder(Vec<ElementId>);

impl ElementVisitor for Recorder {
    fn visit_element(&mut self, tree: &BirTree, element: ElementId) {
        self.0.push(element);
        self.super_visit_element(tree, element);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn registries_match_recomputation(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut harness = Harness::new();
        harness.check();
        for op in &ops {
            let stamp = harness.tree.mutation_stamp();
            if let Some(false) = harness.apply(op) {
                prop_assert_eq!(harness.tree.mutation_stamp(), stamp, "{:?} failed after mutating", op);
            }
            harness.check();
        }
    }

    #[test]
    fn traversals_agree_on_random_trees(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut harness = Harness::new();
        for op in &ops {
            harness.apply(op);
        }
        let tree = &harness.tree;
        for root in tree.ids().filter(|&id| tree.parent(id).is_none()) {
            let stack = tree.preorder(root);

            let mut parent = Vec::new();
            traverse_parent_based(tree, root, true, |id| {
                parent.push(id);
                WalkStep::StepInto
            });
            prop_assert_eq!(&parent, &stack);

            let mut recorder = Recorder::default();
            accept(&mut recorder, tree, root);
            prop_assert_eq!(&recorder.0, &stack);
        }
    }
}
