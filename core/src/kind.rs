//! The closed set of element kinds and their slot layouts.
//!
//! An element's *properties* live in [`ElementKind`]. Its *structure* (owned
//! children and non-owning references) lives in generic slot storage whose
//! shape is described by the static [`Layout`] of its [`ElementClass`]. The
//! mutation, registry and traversal machinery only ever looks at layouts, so
//! adding a kind means adding a variant and a layout row, nothing else.

use bitflags::bitflags;

use crate::id::{ChildSlot, RefSlot};
use crate::String;

/// Literal value carried by a [`ElementKind::Const`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Unit,
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Properties of an element, one variant per element class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    ModuleFragment {
        name: String,
    },
    File {
        name: String,
    },
    Class {
        name: String,
    },
    Function {
        name: String,
        is_inline: bool,
        is_exported: bool,
    },
    ValueParameter {
        name: String,
    },
    Variable {
        name: String,
        is_mutable: bool,
    },
    Block,
    Call,
    Return,
    GetValue,
    SetValue,
    Const(ConstValue),
    When,
    Branch,
}

impl ElementKind {
    pub fn class(&self) -> ElementClass {
        match self {
            ElementKind::ModuleFragment { .. } => ElementClass::ModuleFragment,
            ElementKind::File { .. } => ElementClass::File,
            ElementKind::Class { .. } => ElementClass::Class,
            ElementKind::Function { .. } => ElementClass::Function,
            ElementKind::ValueParameter { .. } => ElementClass::ValueParameter,
            ElementKind::Variable { .. } => ElementClass::Variable,
            ElementKind::Block => ElementClass::Block,
            ElementKind::Call => ElementClass::Call,
            ElementKind::Return => ElementClass::Return,
            ElementKind::GetValue => ElementClass::GetValue,
            ElementKind::SetValue => ElementClass::SetValue,
            ElementKind::Const(_) => ElementClass::Const,
            ElementKind::When => ElementClass::When,
            ElementKind::Branch => ElementClass::Branch,
        }
    }

    /// Declared name, for the kinds that have one.
    pub fn name(&self) -> Option<&str> {
        match self {
            ElementKind::ModuleFragment { name }
            | ElementKind::File { name }
            | ElementKind::Class { name }
            | ElementKind::Function { name, .. }
            | ElementKind::ValueParameter { name }
            | ElementKind::Variable { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_inline_function(&self) -> bool {
        matches!(self, ElementKind::Function { is_inline: true, .. })
    }
}

/// Discriminant of [`ElementKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ElementClass {
    ModuleFragment,
    File,
    Class,
    Function,
    ValueParameter,
    Variable,
    Block,
    Call,
    Return,
    GetValue,
    SetValue,
    Const,
    When,
    Branch,
}

impl ElementClass {
    pub const ALL: [ElementClass; 14] = [
        ElementClass::ModuleFragment,
        ElementClass::File,
        ElementClass::Class,
        ElementClass::Function,
        ElementClass::ValueParameter,
        ElementClass::Variable,
        ElementClass::Block,
        ElementClass::Call,
        ElementClass::Return,
        ElementClass::GetValue,
        ElementClass::SetValue,
        ElementClass::Const,
        ElementClass::When,
        ElementClass::Branch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ElementClass::ModuleFragment => "ModuleFragment",
            ElementClass::File => "File",
            ElementClass::Class => "Class",
            ElementClass::Function => "Function",
            ElementClass::ValueParameter => "ValueParameter",
            ElementClass::Variable => "Variable",
            ElementClass::Block => "Block",
            ElementClass::Call => "Call",
            ElementClass::Return => "Return",
            ElementClass::GetValue => "GetValue",
            ElementClass::SetValue => "SetValue",
            ElementClass::Const => "Const",
            ElementClass::When => "When",
            ElementClass::Branch => "Branch",
        }
    }

    pub fn layout(self) -> &'static Layout {
        &LAYOUTS[self as usize]
    }

    pub fn as_set(self) -> ElementClassSet {
        ElementClassSet::from_bits_truncate(1 << (self as u16))
    }
}

impl core::fmt::Display for ElementClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// A set of element classes, used to restrict feature-cache keys.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct ElementClassSet: u16 {
        const MODULE_FRAGMENT = 1 << 0;
        const FILE = 1 << 1;
        const CLASS = 1 << 2;
        const FUNCTION = 1 << 3;
        const VALUE_PARAMETER = 1 << 4;
        const VARIABLE = 1 << 5;
        const BLOCK = 1 << 6;
        const CALL = 1 << 7;
        const RETURN = 1 << 8;
        const GET_VALUE = 1 << 9;
        const SET_VALUE = 1 << 10;
        const CONST = 1 << 11;
        const WHEN = 1 << 12;
        const BRANCH = 1 << 13;

        const DECLARATIONS = Self::CLASS.bits()
            | Self::FUNCTION.bits()
            | Self::VALUE_PARAMETER.bits()
            | Self::VARIABLE.bits();
        const EXPRESSIONS = Self::BLOCK.bits()
            | Self::CALL.bits()
            | Self::RETURN.bits()
            | Self::GET_VALUE.bits()
            | Self::SET_VALUE.bits()
            | Self::CONST.bits()
            | Self::WHEN.bits();
    }
}

impl ElementClassSet {
    #[inline]
    pub fn contains_class(self, class: ElementClass) -> bool {
        self.contains(class.as_set())
    }
}

impl From<ElementClass> for ElementClassSet {
    fn from(class: ElementClass) -> Self {
        class.as_set()
    }
}

/// Whether a child slot holds at most one element or an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotShape {
    Single,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    pub name: &'static str,
    pub shape: SlotShape,
}

/// Static structure of an element class: its child slots in structural order
/// and the names of its reference slots.
#[derive(Debug)]
pub struct Layout {
    pub children: &'static [SlotInfo],
    pub references: &'static [&'static str],
}

impl Layout {
    pub fn child_slot(&self, slot: ChildSlot) -> Option<&SlotInfo> {
        self.children.get(slot.0 as usize)
    }

    pub fn has_reference(&self, slot: RefSlot) -> bool {
        (slot.0 as usize) < self.references.len()
    }
}

const fn single(name: &'static str) -> SlotInfo {
    SlotInfo {
        name,
        shape: SlotShape::Single,
    }
}

const fn list(name: &'static str) -> SlotInfo {
    SlotInfo {
        name,
        shape: SlotShape::List,
    }
}

// Indexed by `ElementClass as usize`.
static LAYOUTS: [Layout; 14] = [
    Layout {
        children: &[list("files")],
        references: &[],
    },
    Layout {
        children: &[list("declarations")],
        references: &[],
    },
    Layout {
        children: &[list("declarations")],
        references: &["super_class"],
    },
    Layout {
        children: &[list("parameters"), single("body")],
        references: &["overridden"],
    },
    Layout {
        children: &[single("default_value")],
        references: &[],
    },
    Layout {
        children: &[single("initializer")],
        references: &[],
    },
    Layout {
        children: &[list("statements")],
        references: &[],
    },
    Layout {
        children: &[single("receiver"), list("arguments")],
        references: &["target"],
    },
    Layout {
        children: &[single("value")],
        references: &["return_target"],
    },
    Layout {
        children: &[],
        references: &["target"],
    },
    Layout {
        children: &[single("value")],
        references: &["target"],
    },
    Layout {
        children: &[],
        references: &[],
    },
    Layout {
        children: &[list("branches")],
        references: &[],
    },
    Layout {
        children: &[single("condition"), single("result")],
        references: &[],
    },
];

/// Named slot indices per class, matching the layout table.
pub mod slots {
    use crate::id::{ChildSlot, RefSlot};

    pub mod module_fragment {
        use super::*;
        pub const FILES: ChildSlot = ChildSlot(0);
    }

    pub mod file {
        use super::*;
        pub const DECLARATIONS: ChildSlot = ChildSlot(0);
    }

    pub mod class {
        use super::*;
        pub const DECLARATIONS: ChildSlot = ChildSlot(0);
        pub const SUPER_CLASS: RefSlot = RefSlot(0);
    }

    pub mod function {
        use super::*;
        pub const PARAMETERS: ChildSlot = ChildSlot(0);
        pub const BODY: ChildSlot = ChildSlot(1);
        pub const OVERRIDDEN: RefSlot = RefSlot(0);
    }

    pub mod value_parameter {
        use super::*;
        pub const DEFAULT_VALUE: ChildSlot = ChildSlot(0);
    }

    pub mod variable {
        use super::*;
        pub const INITIALIZER: ChildSlot = ChildSlot(0);
    }

    pub mod block {
        use super::*;
        pub const STATEMENTS: ChildSlot = ChildSlot(0);
    }

    pub mod call {
        use super::*;
        pub const RECEIVER: ChildSlot = ChildSlot(0);
        pub const ARGUMENTS: ChildSlot = ChildSlot(1);
        pub const TARGET: RefSlot = RefSlot(0);
    }

    pub mod ret {
        use super::*;
        pub const VALUE: ChildSlot = ChildSlot(0);
        pub const RETURN_TARGET: RefSlot = RefSlot(0);
    }

    pub mod get_value {
        use super::*;
        pub const TARGET: RefSlot = RefSlot(0);
    }

    pub mod set_value {
        use super::*;
        pub const VALUE: ChildSlot = ChildSlot(0);
        pub const TARGET: RefSlot = RefSlot(0);
    }

    pub mod when {
        use super::*;
        pub const BRANCHES: ChildSlot = ChildSlot(0);
    }

    pub mod branch {
        use super::*;
        pub const CONDITION: ChildSlot = ChildSlot(0);
        pub const RESULT: ChildSlot = ChildSlot(1);
    }
}
