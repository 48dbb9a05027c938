//! Descriptors: the resolved, queryable representation of declarations.
//!
//! Every descriptor has exactly one owner which it refers to weakly ([`Container`]), and owns
//! its own lazily computed children. Descriptors are created once per identifier by the
//! module's caches and then only read.
//!
//! # Key Components
//!
//! - [`ClassDescriptor`] - Deserialized classes, enum entries and not-found placeholders
//! - [`ClassRef`] / [`ClassRc`] - Weak and strong class handles
//! - [`TypeParameterDescriptor`] / [`TypeParameterRef`] - Type parameters with lazy bounds
//! - [`FunctionDescriptor`], [`PropertyDescriptor`], [`ConstructorDescriptor`] - Members
//! - [`CallableMember`] - The common view used by override resolution
//! - [`PackageFragment`] / [`PackageView`] - Top-level declarations of a package

use crate::names::FqName;

pub mod callable;
pub mod class;
pub mod package;
pub mod typeparam;

pub use callable::{
    copy_value_parameters, CallableMember, ConstructorDescriptor, FunctionDescriptor,
    PropertyDescriptor, ValueParameterData, ValueParameterDescriptor,
};
pub use class::{ClassDescriptor, ClassRc, ClassRef};
pub use package::{PackageFragment, PackageView};
pub use typeparam::{TypeParameterDescriptor, TypeParameterRef};

/// The declaration that contains another one.
#[derive(Clone, Debug)]
pub enum Container {
    /// A class
    Class(ClassRef),
    /// A package
    Package(FqName),
}

impl Container {
    /// The class, if the container is one.
    #[must_use]
    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Container::Class(class) => Some(class),
            Container::Package(_) => None,
        }
    }

    /// The fully qualified name of the container.
    #[must_use]
    pub fn fq_name(&self) -> FqName {
        match self {
            Container::Class(class) => class.class_id().as_single_fq_name(),
            Container::Package(fq_name) => fq_name.clone(),
        }
    }
}
