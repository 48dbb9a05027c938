//! Member scopes: name-indexed views over the members of a class or package.
//!
//! [`MemberScope`] is a closed set of scope kinds dispatched by `match`:
//!
//! - [`ClassMemberScope`] - Declared members of a class plus fake overrides
//! - [`EnumEntryScope`] - Inherited members of an enum entry
//! - [`EnumStaticScope`] - `values()` / `valueOf()` of an enum class
//! - [`PackageMemberScope`] - Top-level declarations of a package fragment
//! - `Chained` - Several scopes queried in order (all fragments of a package)
//! - `Empty`
//!
//! Every lookup may carry a [`LookupLocation`]; when it does, the lookup is forwarded to the
//! module's [`crate::reporting::LookupTracker`] before it is answered.

use std::{
    collections::BTreeSet,
    sync::{Arc, Weak},
};

use crate::{
    descriptors::{ClassRc, FunctionDescriptor, PropertyDescriptor},
    module::Module,
    names::{FqName, Name},
    reporting::{lookup::record_lookup, LookupLocation, ScopeKind},
    Result,
};

pub mod class;
pub mod enums;
pub(crate) mod overrides;
pub mod package;

pub use class::ClassMemberScope;
pub use enums::{EnumEntryScope, EnumStaticScope};
pub use package::{PackageMemberScope, PackagePart};

/// A member scope.
#[derive(Clone, Debug)]
pub enum MemberScope {
    /// Contains nothing
    Empty,
    /// Top-level declarations of a package fragment
    Package(Arc<PackageMemberScope>),
    /// Members of a deserialized class
    Class(Arc<ClassMemberScope>),
    /// Members of an enum entry
    EnumEntry(Arc<EnumEntryScope>),
    /// Static members of an enum class
    EnumStatic(Arc<EnumStaticScope>),
    /// Several scopes, queried in order
    Chained(Arc<[MemberScope]>),
}

impl MemberScope {
    fn lookup_owner(&self) -> Option<(&Weak<Module>, FqName, ScopeKind)> {
        match self {
            MemberScope::Empty => None,
            MemberScope::Package(scope) => Some((
                scope.module_ref(),
                scope.fq_name().clone(),
                ScopeKind::Package,
            )),
            MemberScope::Class(scope) => Some((
                scope.module_ref(),
                scope.owner_fq_name(),
                ScopeKind::Classifier,
            )),
            MemberScope::EnumEntry(scope) => Some((
                scope.module_ref(),
                scope.owner_fq_name(),
                ScopeKind::Classifier,
            )),
            // Only adds `values` and `valueOf`, which no caller needs to be tracked against.
            MemberScope::EnumStatic(_) => None,
            MemberScope::Chained(scopes) => scopes.iter().find_map(MemberScope::lookup_owner),
        }
    }

    fn record(&self, name: &Name, location: Option<&LookupLocation>) -> Result<()> {
        if location.is_none() {
            return Ok(());
        }
        if let Some((module, fq_name, kind)) = self.lookup_owner() {
            let module = upgrade_module!(module);
            record_lookup(module.lookup_tracker(), location, &fq_name, kind, name);
        }
        Ok(())
    }

    /// Functions named `name`.
    ///
    /// # Arguments
    ///
    /// * `name` - The function name
    /// * `location` - Where the lookup originates, for lookup tracking
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn functions(
        &self,
        name: &Name,
        location: Option<&LookupLocation>,
    ) -> Result<Vec<Arc<FunctionDescriptor>>> {
        self.record(name, location)?;
        match self {
            MemberScope::Empty => Ok(Vec::new()),
            MemberScope::Package(scope) => scope.functions(name),
            MemberScope::Class(scope) => scope.functions(name),
            MemberScope::EnumEntry(scope) => scope.functions(name),
            MemberScope::EnumStatic(scope) => scope.functions(name),
            MemberScope::Chained(scopes) => {
                let mut functions = Vec::new();
                for scope in scopes.iter() {
                    functions.extend(scope.functions(name, None)?);
                }
                Ok(functions)
            }
        }
    }

    /// Properties named `name`.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn properties(
        &self,
        name: &Name,
        location: Option<&LookupLocation>,
    ) -> Result<Vec<Arc<PropertyDescriptor>>> {
        self.record(name, location)?;
        match self {
            MemberScope::Empty | MemberScope::EnumStatic(_) => Ok(Vec::new()),
            MemberScope::Package(scope) => scope.properties(name),
            MemberScope::Class(scope) => scope.properties(name),
            MemberScope::EnumEntry(scope) => scope.properties(name),
            MemberScope::Chained(scopes) => {
                let mut properties = Vec::new();
                for scope in scopes.iter() {
                    properties.extend(scope.properties(name, None)?);
                }
                Ok(properties)
            }
        }
    }

    /// The class named `name`; the first match wins in a chained scope.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn classifier(
        &self,
        name: &Name,
        location: Option<&LookupLocation>,
    ) -> Result<Option<ClassRc>> {
        self.record(name, location)?;
        match self {
            MemberScope::Empty | MemberScope::EnumEntry(_) | MemberScope::EnumStatic(_) => {
                Ok(None)
            }
            MemberScope::Package(scope) => scope.classifier(name),
            MemberScope::Class(scope) => scope.classifier(name),
            MemberScope::Chained(scopes) => {
                for scope in scopes.iter() {
                    if let Some(class) = scope.classifier(name, None)? {
                        return Ok(Some(class));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Names of all functions in the scope.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn function_names(&self) -> Result<BTreeSet<Name>> {
        match self {
            MemberScope::Empty => Ok(BTreeSet::new()),
            MemberScope::Package(scope) => scope.function_names(),
            MemberScope::Class(scope) => scope.function_names().cloned(),
            MemberScope::EnumEntry(scope) => scope.function_names(),
            MemberScope::EnumStatic(scope) => Ok(scope.function_names()),
            MemberScope::Chained(scopes) => {
                let mut names = BTreeSet::new();
                for scope in scopes.iter() {
                    names.extend(scope.function_names()?);
                }
                Ok(names)
            }
        }
    }

    /// Names of all properties in the scope.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn property_names(&self) -> Result<BTreeSet<Name>> {
        match self {
            MemberScope::Empty | MemberScope::EnumStatic(_) => Ok(BTreeSet::new()),
            MemberScope::Package(scope) => scope.property_names(),
            MemberScope::Class(scope) => scope.property_names().cloned(),
            MemberScope::EnumEntry(scope) => scope.property_names(),
            MemberScope::Chained(scopes) => {
                let mut names = BTreeSet::new();
                for scope in scopes.iter() {
                    names.extend(scope.property_names()?);
                }
                Ok(names)
            }
        }
    }

    /// Names of all classes in the scope.
    ///
    /// # Errors
    /// Propagates resolution errors.
    pub fn classifier_names(&self) -> Result<BTreeSet<Name>> {
        match self {
            MemberScope::Empty | MemberScope::EnumEntry(_) | MemberScope::EnumStatic(_) => {
                Ok(BTreeSet::new())
            }
            MemberScope::Package(scope) => Ok(scope.class_names().clone()),
            MemberScope::Class(scope) => scope.classifier_names(),
            MemberScope::Chained(scopes) => {
                let mut names = BTreeSet::new();
                for scope in scopes.iter() {
                    names.extend(scope.classifier_names()?);
                }
                Ok(names)
            }
        }
    }

    /// Returns `true` for [`MemberScope::Empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, MemberScope::Empty)
    }
}
