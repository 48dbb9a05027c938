//! Chaining of several metadata sources.

use std::{collections::BTreeSet, sync::Arc};

use crate::{
    locator::{ClassData, ClassDataFinder, PackageData},
    names::{ClassId, FqName, Name},
    Result,
};

/// A [`ClassDataFinder`] that asks its finders in order.
///
/// A class is served by the first finder that knows it. Package parts, sub-packages and class
/// names are collected from all finders.
#[derive(Clone, Default)]
pub struct CompositeClassFinder {
    finders: Vec<Arc<dyn ClassDataFinder>>,
}

impl CompositeClassFinder {
    /// Chains `finders`, earlier ones taking precedence.
    #[must_use]
    pub fn new(finders: Vec<Arc<dyn ClassDataFinder>>) -> Self {
        CompositeClassFinder { finders }
    }

    /// Appends a finder with the lowest precedence.
    pub fn push(&mut self, finder: Arc<dyn ClassDataFinder>) {
        self.finders.push(finder);
    }

    /// The chained finders in precedence order.
    #[must_use]
    pub fn finders(&self) -> &[Arc<dyn ClassDataFinder>] {
        &self.finders
    }
}

impl ClassDataFinder for CompositeClassFinder {
    fn find_class_data(&self, class_id: &ClassId) -> Result<Option<ClassData>> {
        for finder in &self.finders {
            if let Some(data) = finder.find_class_data(class_id)? {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }

    fn find_package_data(&self, fq_name: &FqName) -> Result<Vec<PackageData>> {
        let mut parts = Vec::new();
        for finder in &self.finders {
            parts.extend(finder.find_package_data(fq_name)?);
        }
        Ok(parts)
    }

    fn sub_packages_of(&self, fq_name: &FqName) -> Result<Vec<FqName>> {
        let mut children = BTreeSet::new();
        for finder in &self.finders {
            children.extend(finder.sub_packages_of(fq_name)?);
        }
        Ok(children.into_iter().collect())
    }

    fn known_class_names(&self, fq_name: &FqName) -> Result<Vec<Name>> {
        let mut names = BTreeSet::new();
        for finder in &self.finders {
            names.extend(finder.known_class_names(fq_name)?);
        }
        Ok(names.into_iter().collect())
    }
}
