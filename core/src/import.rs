//! Bulk construction of a module from some external program model.

use crate::error::TreeError;
use crate::id::{ElementId, ModuleId};
use crate::options::TreeOptions;
use crate::tree::{BirTree, ModuleOrigin};

/// Something that can build a module's element graph.
///
/// The importer creates elements while they are detached, so nothing is
/// registered per element; the whole module is registered in one walk when
/// [`BirTree::import`] adds its root.
pub trait ProgramImporter {
    /// Rough number of elements [`build`](Self::build) will create.
    fn expected_element_count(&self) -> usize {
        0
    }

    /// Builds the module and returns its root.
    fn build(&mut self, tree: &mut BirTree) -> Result<ElementId, TreeError>;
}

impl BirTree {
    pub fn import<I: ProgramImporter + ?Sized>(
        &mut self,
        importer: &mut I,
        origin: ModuleOrigin,
    ) -> Result<ModuleId, TreeError> {
        let expected = importer.expected_element_count();
        self.reserve(expected);
        let before = self.len();
        let root = importer.build(self)?;
        let module = self.add_module(root, origin)?;
        tracing::debug!(
            %module,
            expected,
            created = self.len() - before,
            "imported module"
        );
        Ok(module)
    }

    /// A new tree sized for `importer`, with its module already imported.
    pub fn from_importer<I: ProgramImporter + ?Sized>(
        importer: &mut I,
        options: TreeOptions,
    ) -> Result<(Self, ModuleId), TreeError> {
        let mut tree = Self::with_options(TreeOptions {
            expected_element_count: options
                .expected_element_count
                .max(importer.expected_element_count()),
            ..options
        });
        let module = tree.import(importer, ModuleOrigin::Local)?;
        Ok((tree, module))
    }
}
