//! Per-class double dispatch.
//!
//! [`accept`] looks at an element's class and calls the matching
//! `visit_*` method. Every per-class method defaults to
//! [`ElementVisitor::visit_element`], which defaults to
//! [`ElementVisitor::super_visit_element`], which recurses into the
//! children. Override a class method to intercept that class; call
//! `super_visit_element` (or [`accept_children`]) from it to keep walking.
//!
//! # Example
//!
//! ```
//! use bir_core::{BirTree, ElementId, ElementKind, ElementVisitor, accept, slots};
//!
//! #[derive(Default)]
//! struct CountCalls(usize);
//!
//! impl ElementVisitor for CountCalls {
//!     fn visit_call(&mut self, tree: &BirTree, element: ElementId) {
//!         self.0 += 1;
//!         self.super_visit_element(tree, element);
//!     }
//! }
//!
//! let mut tree = BirTree::new();
//! let body = tree.create(ElementKind::Block);
//! let outer = tree.create(ElementKind::Call);
//! let inner = tree.create(ElementKind::Call);
//! tree.push_child(outer, slots::call::ARGUMENTS, inner).unwrap();
//! tree.push_child(body, slots::block::STATEMENTS, outer).unwrap();
//!
//! let mut counter = CountCalls::default();
//! accept(&mut counter, &tree, body);
//! assert_eq!(counter.0, 2);
//! ```

use crate::id::ElementId;
use crate::kind::ElementClass;
use crate::tree::BirTree;

pub trait ElementVisitor {
    /// Fallback for every class.
    fn visit_element(&mut self, tree: &BirTree, element: ElementId) {
        self.super_visit_element(tree, element)
    }

    /// Default recursion into the children.
    ///
    /// Override `visit_element` instead of this method.
    fn super_visit_element(&mut self, tree: &BirTree, element: ElementId) {
        accept_children(self, tree, element)
    }

    fn visit_module_fragment(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_file(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_class(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_function(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_value_parameter(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_variable(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_block(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_call(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_return(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_get_value(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_set_value(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_const(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_when(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }

    fn visit_branch(&mut self, tree: &BirTree, element: ElementId) {
        self.visit_element(tree, element)
    }
}

/// Dispatches `element` to the visitor method of its class. Unknown ids are
/// ignored.
pub fn accept<V: ElementVisitor + ?Sized>(visitor: &mut V, tree: &BirTree, element: ElementId) {
    let Some(class) = tree.class(element) else {
        return;
    };
    match class {
        ElementClass::ModuleFragment => visitor.visit_module_fragment(tree, element),
        ElementClass::File => visitor.visit_file(tree, element),
        ElementClass::Class => visitor.visit_class(tree, element),
        ElementClass::Function => visitor.visit_function(tree, element),
        ElementClass::ValueParameter => visitor.visit_value_parameter(tree, element),
        ElementClass::Variable => visitor.visit_variable(tree, element),
        ElementClass::Block => visitor.visit_block(tree, element),
        ElementClass::Call => visitor.visit_call(tree, element),
        ElementClass::Return => visitor.visit_return(tree, element),
        ElementClass::GetValue => visitor.visit_get_value(tree, element),
        ElementClass::SetValue => visitor.visit_set_value(tree, element),
        ElementClass::Const => visitor.visit_const(tree, element),
        ElementClass::When => visitor.visit_when(tree, element),
        ElementClass::Branch => visitor.visit_branch(tree, element),
    }
}

/// [`accept`] on each child of `element`, in structural order.
pub fn accept_children<V: ElementVisitor + ?Sized>(
    visitor: &mut V,
    tree: &BirTree,
    element: ElementId,
) {
    for child in tree.children(element) {
        accept(visitor, tree, child);
    }
}
