//! Shared type table of a metadata blob.
//!
//! Types that occur many times (`kotlin.String`, `kotlin.Any?`) are stored once in the table
//! and referenced by index through [`TypeRef::Table`].

use std::sync::Arc;

use crate::{
    metadata::proto::{TypeProto, TypeRef},
    Result,
};

/// Index-addressed list of type messages.
#[derive(Debug, Default)]
pub struct TypeTable {
    types: Vec<Arc<TypeProto>>,
}

impl TypeTable {
    /// Creates a table over decoded types.
    #[must_use]
    pub fn new(types: Vec<TypeProto>) -> Self {
        TypeTable {
            types: types.into_iter().map(Arc::new).collect(),
        }
    }

    /// Returns the type at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` is outside the table.
    pub fn get(&self, index: u32) -> Result<Arc<TypeProto>> {
        self.types.get(index as usize).cloned().ok_or_else(|| {
            malformed_error!(
                "Type table index {} out of range (table size {})",
                index,
                self.types.len()
            )
        })
    }

    /// Resolves a type occurrence to its message.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a table reference outside the table.
    pub fn resolve(&self, type_ref: &TypeRef) -> Result<Arc<TypeProto>> {
        match type_ref {
            TypeRef::Inline(ty) => Ok(Arc::clone(ty)),
            TypeRef::Table(index) => self.get(*index),
        }
    }

    /// Number of types in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates over the table in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeProto>> {
        self.types.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_resolve() {
        let table = TypeTable::new(vec![TypeProto::class(3).with_nullable(true)]);

        let shared = table.resolve(&TypeRef::Table(0)).unwrap();
        assert!(shared.nullable);

        let inline = table
            .resolve(&TypeRef::inline(TypeProto::type_parameter(1)))
            .unwrap();
        assert!(!inline.nullable);

        assert!(matches!(
            table.resolve(&TypeRef::Table(1)),
            Err(Error::Malformed { .. })
        ));
    }
}
