//! Package fragments and package views.
//!
//! A package may be split over several metadata sources (a library and the built-ins both
//! contributing to `kotlin`, say). Each source contributes one [`PackageFragment`]; the
//! [`PackageView`] chains all fragments of a package into one scope.

use std::{
    collections::BTreeSet,
    fmt,
    sync::{Arc, Weak},
};

use rayon::prelude::*;
use tracing::debug;

use crate::{
    descriptors::ClassRc,
    module::Module,
    names::{ClassId, FqName, Name},
    scopes::{MemberScope, PackageMemberScope, PackagePart},
    Result,
};

/// The declarations one metadata source contributes to a package.
pub struct PackageFragment {
    fq_name: FqName,
    module: Weak<Module>,
    scope: Arc<PackageMemberScope>,
}

impl PackageFragment {
    pub(crate) fn new(
        module: Weak<Module>,
        fq_name: FqName,
        parts: Vec<PackagePart>,
        class_names: BTreeSet<Name>,
    ) -> Self {
        let scope = Arc::new(PackageMemberScope::new(
            module.clone(),
            fq_name.clone(),
            parts,
            class_names,
        ));
        PackageFragment {
            fq_name,
            module,
            scope,
        }
    }

    /// The package name.
    #[must_use]
    pub fn fq_name(&self) -> &FqName {
        &self.fq_name
    }

    /// Top-level functions, properties and classes of this fragment.
    #[must_use]
    pub fn member_scope(&self) -> MemberScope {
        MemberScope::Package(Arc::clone(&self.scope))
    }

    /// Names of the top-level classes of this fragment.
    #[must_use]
    pub fn class_names(&self) -> &BTreeSet<Name> {
        self.scope.class_names()
    }

    /// Resolves every top-level class of this fragment on the rayon pool.
    ///
    /// Classes that can not be located are skipped. The result is in name order; every
    /// descriptor is the module's unique instance for its id.
    ///
    /// # Errors
    /// Returns the first resolution error met.
    pub fn resolve_all_classes(&self) -> Result<Vec<ClassRc>> {
        let module = upgrade_module!(self.module);
        let names: Vec<&Name> = self.class_names().iter().collect();
        debug!(package = %self.fq_name, classes = names.len(), "resolving package classes");

        let resolved = names
            .par_iter()
            .map(|name| {
                module.find_class(&ClassId::new(
                    self.fq_name.clone(),
                    FqName::topmost((*name).clone()),
                    false,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(resolved.into_iter().flatten().collect())
    }
}

impl fmt::Debug for PackageFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageFragment")
            .field("fq_name", &self.fq_name)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// All fragments of one package.
pub struct PackageView {
    fq_name: FqName,
    module: Weak<Module>,
    fragments: Vec<Arc<PackageFragment>>,
    scope: MemberScope,
}

impl PackageView {
    pub(crate) fn new(
        module: Weak<Module>,
        fq_name: FqName,
        fragments: Vec<Arc<PackageFragment>>,
    ) -> Self {
        let scope = match fragments.len() {
            0 => MemberScope::Empty,
            1 => fragments[0].member_scope(),
            _ => MemberScope::Chained(
                fragments
                    .iter()
                    .map(|fragment| fragment.member_scope())
                    .collect(),
            ),
        };
        PackageView {
            fq_name,
            module,
            fragments,
            scope,
        }
    }

    /// The package name.
    #[must_use]
    pub fn fq_name(&self) -> &FqName {
        &self.fq_name
    }

    /// The fragments in finder order.
    #[must_use]
    pub fn fragments(&self) -> &[Arc<PackageFragment>] {
        &self.fragments
    }

    /// Returns `true` if no source declares anything in this package.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// All fragment scopes chained in finder order.
    #[must_use]
    pub fn member_scope(&self) -> MemberScope {
        self.scope.clone()
    }

    /// Direct sub-packages.
    ///
    /// # Errors
    /// Returns I/O errors of the finders.
    pub fn sub_packages(&self) -> Result<Vec<FqName>> {
        let module = upgrade_module!(self.module);
        module.sub_packages_of(&self.fq_name)
    }

    /// Resolves every top-level class of every fragment in parallel.
    ///
    /// # Errors
    /// Returns the first resolution error met.
    pub fn resolve_all_classes(&self) -> Result<Vec<ClassRc>> {
        let mut classes = Vec::new();
        for fragment in &self.fragments {
            classes.extend(fragment.resolve_all_classes()?);
        }
        Ok(classes)
    }
}

impl fmt::Debug for PackageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageView")
            .field("fq_name", &self.fq_name)
            .field("fragments", &self.fragments.len())
            .finish_non_exhaustive()
    }
}
