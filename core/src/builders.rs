//! Typed constructors.
//!
//! Each builder creates a detached element, fills its slots and returns its
//! id. Children passed in must be free (not attached anywhere); references
//! may point anywhere and are recorded once the new element is attached.

use crate::error::TreeError;
use crate::id::ElementId;
use crate::kind::slots::{
    block, branch, call, class, file, function, get_value, module_fragment, ret, set_value,
    value_parameter, variable, when,
};
use crate::kind::{ConstValue, ElementKind};
use crate::tree::BirTree;
use crate::String;

impl BirTree {
    pub fn module_fragment(
        &mut self,
        name: impl Into<String>,
        files: impl IntoIterator<Item = ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::ModuleFragment { name: name.into() });
        self.extend_children(id, module_fragment::FILES, files)?;
        Ok(id)
    }

    pub fn file(
        &mut self,
        name: impl Into<String>,
        declarations: impl IntoIterator<Item = ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::File { name: name.into() });
        self.extend_children(id, file::DECLARATIONS, declarations)?;
        Ok(id)
    }

    pub fn class_decl(
        &mut self,
        name: impl Into<String>,
        super_class: Option<ElementId>,
        declarations: impl IntoIterator<Item = ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::Class { name: name.into() });
        self.extend_children(id, class::DECLARATIONS, declarations)?;
        self.set_reference(id, class::SUPER_CLASS, super_class)?;
        Ok(id)
    }

    /// A non-inline, non-exported function.
    pub fn function(
        &mut self,
        name: impl Into<String>,
        parameters: impl IntoIterator<Item = ElementId>,
        body: Option<ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::Function {
            name: name.into(),
            is_inline: false,
            is_exported: false,
        });
        self.extend_children(id, function::PARAMETERS, parameters)?;
        self.set_child(id, function::BODY, body)?;
        Ok(id)
    }

    pub fn value_parameter(
        &mut self,
        name: impl Into<String>,
        default_value: Option<ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::ValueParameter { name: name.into() });
        self.set_child(id, value_parameter::DEFAULT_VALUE, default_value)?;
        Ok(id)
    }

    pub fn variable(
        &mut self,
        name: impl Into<String>,
        is_mutable: bool,
        initializer: Option<ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::Variable {
            name: name.into(),
            is_mutable,
        });
        self.set_child(id, variable::INITIALIZER, initializer)?;
        Ok(id)
    }

    pub fn block(
        &mut self,
        statements: impl IntoIterator<Item = ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::Block);
        self.extend_children(id, block::STATEMENTS, statements)?;
        Ok(id)
    }

    pub fn call(
        &mut self,
        target: Option<ElementId>,
        receiver: Option<ElementId>,
        arguments: impl IntoIterator<Item = ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::Call);
        self.set_child(id, call::RECEIVER, receiver)?;
        self.extend_children(id, call::ARGUMENTS, arguments)?;
        self.set_reference(id, call::TARGET, target)?;
        Ok(id)
    }

    pub fn ret(
        &mut self,
        return_target: Option<ElementId>,
        value: Option<ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::Return);
        self.set_child(id, ret::VALUE, value)?;
        self.set_reference(id, ret::RETURN_TARGET, return_target)?;
        Ok(id)
    }

    pub fn get_value(&mut self, target: ElementId) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::GetValue);
        self.set_reference(id, get_value::TARGET, Some(target))?;
        Ok(id)
    }

    pub fn set_value(
        &mut self,
        target: ElementId,
        value: Option<ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::SetValue);
        self.set_child(id, set_value::VALUE, value)?;
        self.set_reference(id, set_value::TARGET, Some(target))?;
        Ok(id)
    }

    pub fn constant(&mut self, value: ConstValue) -> ElementId {
        self.create(ElementKind::Const(value))
    }

    pub fn when(
        &mut self,
        branches: impl IntoIterator<Item = ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::When);
        self.extend_children(id, when::BRANCHES, branches)?;
        Ok(id)
    }

    pub fn branch(
        &mut self,
        condition: Option<ElementId>,
        result: Option<ElementId>,
    ) -> Result<ElementId, TreeError> {
        let id = self.create(ElementKind::Branch);
        self.set_child(id, branch::CONDITION, condition)?;
        self.set_child(id, branch::RESULT, result)?;
        Ok(id)
    }
}
