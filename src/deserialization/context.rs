//! The environment a metadata message is interpreted in.

use std::{
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use crate::{
    descriptors::{Container, TypeParameterDescriptor, TypeParameterRef},
    metadata::{NameResolver, TypeTable},
    module::Module,
    names::Name,
    Result,
};

/// Everything needed to turn indices of a message into descriptors: the name pools and type
/// table of its blob, the declaration that owns the message, and the type parameters in scope.
///
/// Contexts form a chain from members up through their classes (and outer classes). Type
/// parameter references are resolved by walking that chain, innermost declaration first.
/// A context never owns the descriptors it mentions: the module, the container and the type
/// parameters are all held weakly, so types that keep their context alive do not keep the
/// graph alive.
pub struct DeserializationContext {
    module: Weak<Module>,
    name_resolver: Arc<NameResolver>,
    type_table: Arc<TypeTable>,
    container: Container,
    parent: Option<Arc<DeserializationContext>>,
    type_parameters: OnceLock<Vec<Weak<TypeParameterDescriptor>>>,
}

impl DeserializationContext {
    /// Creates a context for a class or package message.
    ///
    /// # Arguments
    ///
    /// * `module` - The owning module
    /// * `name_resolver` - Name pools of the blob the message came from
    /// * `type_table` - Type table of the same blob
    /// * `container` - The declaration being deserialized
    /// * `parent` - Context of the enclosing class, for nested classes
    #[must_use]
    pub fn new(
        module: Weak<Module>,
        name_resolver: Arc<NameResolver>,
        type_table: Arc<TypeTable>,
        container: Container,
        parent: Option<Arc<DeserializationContext>>,
    ) -> Arc<Self> {
        Arc::new(DeserializationContext {
            module,
            name_resolver,
            type_table,
            container,
            parent,
            type_parameters: OnceLock::new(),
        })
    }

    /// A context for a declaration inside this one (a member), sharing the name pools.
    #[must_use]
    pub fn child(self: &Arc<Self>, container: Container) -> Arc<Self> {
        Arc::new(DeserializationContext {
            module: self.module.clone(),
            name_resolver: Arc::clone(&self.name_resolver),
            type_table: Arc::clone(&self.type_table),
            container,
            parent: Some(Arc::clone(self)),
            type_parameters: OnceLock::new(),
        })
    }

    /// Weak handle to the owning module.
    #[must_use]
    pub fn module_ref(&self) -> Weak<Module> {
        self.module.clone()
    }

    /// The owning module.
    ///
    /// # Errors
    /// Returns [`crate::Error::ModuleReleased`] if it has been dropped.
    pub fn module(&self) -> Result<Arc<Module>> {
        Ok(upgrade_module!(self.module))
    }

    /// Name pools of the message.
    #[must_use]
    pub fn name_resolver(&self) -> &Arc<NameResolver> {
        &self.name_resolver
    }

    /// Type table of the message.
    #[must_use]
    pub fn type_table(&self) -> &Arc<TypeTable> {
        &self.type_table
    }

    /// The declaration this context belongs to.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// The enclosing context.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<DeserializationContext>> {
        self.parent.as_ref()
    }

    /// Registers the type parameters introduced by this context's declaration. Only the first
    /// registration takes effect.
    pub fn set_type_parameters(&self, parameters: &[Arc<TypeParameterDescriptor>]) {
        let _ = self
            .type_parameters
            .set(parameters.iter().map(Arc::downgrade).collect());
    }

    fn own_type_parameters(&self) -> impl Iterator<Item = Arc<TypeParameterDescriptor>> + '_ {
        self.type_parameters
            .get()
            .into_iter()
            .flatten()
            .filter_map(Weak::upgrade)
    }

    fn chain(&self) -> impl Iterator<Item = &DeserializationContext> {
        std::iter::successors(Some(self), |ctx| ctx.parent.as_deref())
    }

    /// Resolves a type parameter by its metadata id.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no declaration in scope introduces `id`.
    pub fn type_parameter_by_id(&self, id: u32) -> Result<TypeParameterRef> {
        for ctx in self.chain() {
            if let Some(parameter) = ctx
                .own_type_parameters()
                .find(|parameter| parameter.id() == Some(id))
            {
                return Ok(TypeParameterRef::new(&parameter));
            }
        }
        Err(malformed_error!(
            "Unknown type parameter id {} in {}",
            id,
            self.container.fq_name()
        ))
    }

    /// Resolves a type parameter by name, innermost declaration first.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no declaration in scope has a parameter `name`.
    pub fn type_parameter_by_name(&self, name: &Name) -> Result<TypeParameterRef> {
        for ctx in self.chain() {
            if let Some(parameter) = ctx
                .own_type_parameters()
                .find(|parameter| parameter.name() == name)
            {
                return Ok(TypeParameterRef::new(&parameter));
            }
        }
        Err(malformed_error!(
            "Unknown type parameter {} in {}",
            name,
            self.container.fq_name()
        ))
    }
}

impl fmt::Debug for DeserializationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeserializationContext")
            .field("container", &self.container)
            .field("depth", &self.chain().count())
            .finish_non_exhaustive()
    }
}
