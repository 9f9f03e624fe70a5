//! Per-element side tables.
//!
//! Phases often need to hang private data off elements (a computed type, a
//! "visited" mark, a lowered replacement). Instead of widening every element
//! they register a typed [`AuxKey`] and store values in a table owned by the
//! tree. Values survive detach and re-attach; they are dropped with the tree.

use core::any::Any;
use core::fmt;
use core::marker::PhantomData;

use hashbrown::HashMap;

use crate::error::TreeError;
use crate::id::ElementId;
use crate::tree::BirTree;
use crate::{Box, Vec};

pub struct AuxKey<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for AuxKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AuxKey<T> {}

impl<T> fmt::Debug for AuxKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuxKey({})", self.index)
    }
}

#[derive(Default)]
pub(crate) struct AuxStorage {
    tables: Vec<Box<dyn Any>>,
}

impl AuxStorage {
    fn table<T: 'static>(&self, key: AuxKey<T>) -> Result<&HashMap<ElementId, T>, TreeError> {
        self.tables
            .get(key.index as usize)
            .and_then(|table| table.downcast_ref())
            .ok_or(TreeError::UnknownAuxKey { index: key.index })
    }

    fn table_mut<T: 'static>(
        &mut self,
        key: AuxKey<T>,
    ) -> Result<&mut HashMap<ElementId, T>, TreeError> {
        self.tables
            .get_mut(key.index as usize)
            .and_then(|table| table.downcast_mut())
            .ok_or(TreeError::UnknownAuxKey { index: key.index })
    }
}

impl BirTree {
    pub fn register_aux_key<T: 'static>(&mut self) -> AuxKey<T> {
        let index = self.aux.tables.len() as u32;
        self.aux.tables.push(Box::new(HashMap::<ElementId, T>::new()));
        AuxKey {
            index,
            _marker: PhantomData,
        }
    }

    /// Stores `value` for `element`; returns the value it replaces.
    pub fn set_aux<T: 'static>(
        &mut self,
        element: ElementId,
        key: AuxKey<T>,
        value: T,
    ) -> Result<Option<T>, TreeError> {
        self.check(element)?;
        Ok(self.aux.table_mut(key)?.insert(element, value))
    }

    pub fn aux<T: 'static>(&self, element: ElementId, key: AuxKey<T>) -> Result<Option<&T>, TreeError> {
        self.check(element)?;
        Ok(self.aux.table(key)?.get(&element))
    }

    pub fn aux_mut<T: 'static>(
        &mut self,
        element: ElementId,
        key: AuxKey<T>,
    ) -> Result<Option<&mut T>, TreeError> {
        self.check(element)?;
        Ok(self.aux.table_mut(key)?.get_mut(&element))
    }

    pub fn take_aux<T: 'static>(
        &mut self,
        element: ElementId,
        key: AuxKey<T>,
    ) -> Result<Option<T>, TreeError> {
        self.check(element)?;
        Ok(self.aux.table_mut(key)?.remove(&element))
    }
}
