//! Indented text rendering of a subtree, for debugging and test snapshots.
//!
//! ```text
//! #1 File "a"
//!   declarations[0]: #2 Function "f" exported
//!     body: #3 Block
//!       statements[0]: #4 Call target=#2
//! ```

use core::fmt;

use crate::id::ElementId;
use crate::kind::{ConstValue, ElementKind, SlotShape};
use crate::traversal::StackWalker;
use crate::tree::BirTree;
use crate::{String, ToString};

/// Display adapter returned by [`BirTree::dump`].
pub struct Dump<'a> {
    tree: &'a BirTree,
    root: ElementId,
}

impl BirTree {
    pub fn dump(&self, root: ElementId) -> Dump<'_> {
        Dump { tree: self, root }
    }

    pub fn dump_string(&self, root: ElementId) -> String {
        self.dump(root).to_string()
    }
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree;
        let mut walker = StackWalker::new(self.root).include_self(true);
        while let Some(id) = walker.next(tree) {
            let element = tree.el(id);
            write!(f, "{:indent$}", "", indent = walker.depth() * 2)?;
            if id != self.root
                && let Some(link) = element.parent
            {
                let layout = tree.el(link.parent).class().layout();
                if let Some(info) = layout.child_slot(link.slot) {
                    match info.shape {
                        SlotShape::Single => write!(f, "{}: ", info.name)?,
                        SlotShape::List => write!(f, "{}[{}]: ", info.name, link.index)?,
                    }
                }
            }
            write!(f, "{id} {}", element.class())?;
            write_properties(f, element.kind())?;
            let names = element.class().layout().references;
            for (slot, target) in element.references() {
                write!(f, " {}={target}", names[slot.0 as usize])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn write_properties(f: &mut fmt::Formatter<'_>, kind: &ElementKind) -> fmt::Result {
    if let Some(name) = kind.name() {
        write!(f, " {name:?}")?;
    }
    match kind {
        ElementKind::Function {
            is_inline,
            is_exported,
            ..
        } => {
            if *is_inline {
                f.write_str(" inline")?;
            }
            if *is_exported {
                f.write_str(" exported")?;
            }
        }
        ElementKind::Variable { is_mutable: true, .. } => f.write_str(" mut")?,
        ElementKind::Const(value) => match value {
            ConstValue::Unit => f.write_str(" unit")?,
            ConstValue::Bool(b) => write!(f, " {b}")?,
            ConstValue::Int(i) => write!(f, " {i}")?,
            ConstValue::Str(s) => write!(f, " {s:?}")?,
        },
        _ => {}
    }
    Ok(())
}
