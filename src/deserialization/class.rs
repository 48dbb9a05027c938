//! Deserialized classes.

use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use tracing::{debug, warn};

use crate::{
    builtins::BuiltInClass,
    deserialization::{
        enumentry::EnumEntryClass,
        members::{self, build_type_parameters, type_parameter_names, MemberDeserializer},
        DeserializationContext,
    },
    descriptors::{
        ClassDescriptor, ClassRc, ClassRef, ConstructorDescriptor, Container,
        TypeParameterDescriptor,
    },
    locator::{ClassData, SourceElement},
    metadata::{
        flags::{ClassAttributes, ClassKind, ConstructorAttributes, Modality, Visibility},
        proto::ClassProto,
    },
    module::Module,
    names::{ClassId, Name},
    scopes::{ClassMemberScope, EnumStaticScope, MemberScope},
    storage::{LazyValue, MemoizedFn},
    types::Type,
    Result,
};

#[derive(Clone)]
struct Constructors {
    all: Vec<Arc<ConstructorDescriptor>>,
    primary: Option<Arc<ConstructorDescriptor>>,
}

/// A class read from metadata.
///
/// Identity (id, kind, modality, visibility, names of nested declarations and type
/// parameters) is decoded when the class is created. Everything else is computed on first
/// access and cached:
///
/// - supertypes: declared ones plus injected ones; missing supertypes become not-found
///   placeholders and are reported once, looping supertypes are disconnected
/// - members: per name, through the [`ClassMemberScope`]
/// - constructors: the primary constructor is synthesized for objects, companions and enums
///   that do not declare one
/// - enum entries: per name, each a singleton [`EnumEntryClass`]
pub struct DeserializedClass {
    module: Weak<Module>,
    class_id: ClassId,
    proto: Arc<ClassProto>,
    ctx: Arc<DeserializationContext>,
    source: SourceElement,
    kind: ClassKind,
    modality: Modality,
    visibility: Visibility,
    attributes: ClassAttributes,
    container: Container,
    type_parameters: Vec<Arc<TypeParameterDescriptor>>,
    nested_class_names: Vec<Name>,
    enum_entry_names: Vec<Name>,
    companion_object_name: Option<Name>,
    supertypes: LazyValue<Vec<Type>>,
    incomplete_hierarchy_reported: AtomicBool,
    scope: Arc<ClassMemberScope>,
    static_scope: MemberScope,
    constructors: LazyValue<Constructors>,
    enum_entries: MemoizedFn<Name, ClassRc>,
    enum_member_names: LazyValue<Arc<BTreeSet<Name>>>,
    self_ref: ClassRef,
}

impl DeserializedClass {
    /// Builds the descriptor of `class_id` from its metadata.
    ///
    /// # Arguments
    ///
    /// * `module` - The owning module
    /// * `class_id` - The requested class
    /// * `data` - The located metadata
    /// * `container` - The outer class, or the package
    /// * `parent` - Context of the outer class, for nested classes
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the message names another class or has bad name
    /// indices.
    pub(crate) fn create(
        module: Weak<Module>,
        class_id: ClassId,
        data: ClassData,
        container: Container,
        parent: Option<Arc<DeserializationContext>>,
    ) -> Result<ClassRc> {
        let proto = data.proto;
        let resolver = data.name_resolver;

        let recorded_id = resolver.class_id(proto.fq_name)?;
        if recorded_id != class_id {
            return Err(malformed_error!(
                "Metadata for {} describes {}",
                class_id,
                recorded_id
            ));
        }

        let nested_class_names = proto
            .nested_class_names
            .iter()
            .map(|&index| resolver.name(index))
            .collect::<Result<Vec<_>>>()?;
        let enum_entry_names = proto
            .enum_entries
            .iter()
            .map(|&index| resolver.name(index))
            .collect::<Result<Vec<_>>>()?;
        let companion_object_name = proto
            .companion_object_name
            .map(|index| resolver.name(index))
            .transpose()?;
        let type_parameter_names = type_parameter_names(&resolver, &proto.type_parameters)?;

        let kind = ClassKind::from_flags(proto.flags);
        debug!(class = %class_id, kind = %kind, "deserializing class");

        Ok(Arc::new_cyclic(|weak| {
            let self_ref = ClassRef::from_weak(class_id.clone(), weak.clone());
            let ctx = DeserializationContext::new(
                module.clone(),
                resolver,
                data.type_table,
                Container::Class(self_ref.clone()),
                parent,
            );
            let type_parameters =
                build_type_parameters(&ctx, &proto.type_parameters, type_parameter_names);

            let scope = Arc::new(ClassMemberScope::new(
                self_ref.clone(),
                Arc::clone(&ctx),
                Arc::clone(&proto),
            ));
            let static_scope = if kind == ClassKind::EnumClass {
                MemberScope::EnumStatic(Arc::new(EnumStaticScope::new(
                    module.clone(),
                    self_ref.clone(),
                )))
            } else {
                MemberScope::Empty
            };

            ClassDescriptor::Deserialized(DeserializedClass {
                module,
                class_id,
                modality: Modality::from_flags(proto.flags),
                visibility: Visibility::from_flags(proto.flags),
                attributes: ClassAttributes::from_class_flags(proto.flags),
                proto,
                ctx,
                source: data.source,
                kind,
                container,
                type_parameters,
                nested_class_names,
                enum_entry_names,
                companion_object_name,
                supertypes: LazyValue::recursion_tolerant("class supertypes", Vec::new()),
                incomplete_hierarchy_reported: AtomicBool::new(false),
                scope,
                static_scope,
                constructors: LazyValue::new("class constructors"),
                enum_entries: MemoizedFn::new("enum entry"),
                enum_member_names: LazyValue::new("enum member names"),
                self_ref,
            })
        }))
    }

    /// The class id.
    #[must_use]
    pub fn class_id(&self) -> &ClassId {
        &self.class_id
    }

    /// The class kind.
    #[must_use]
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// The declared modality.
    #[must_use]
    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// The declared visibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Boolean attributes.
    #[must_use]
    pub fn attributes(&self) -> ClassAttributes {
        self.attributes
    }

    /// The outer class, or the package.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Where the metadata came from.
    #[must_use]
    pub fn source(&self) -> &SourceElement {
        &self.source
    }

    /// The raw class message.
    #[must_use]
    pub fn proto(&self) -> &Arc<ClassProto> {
        &self.proto
    }

    pub(crate) fn ctx(&self) -> &Arc<DeserializationContext> {
        &self.ctx
    }

    pub(crate) fn self_ref(&self) -> ClassRef {
        self.self_ref.clone()
    }

    /// Own type parameters.
    #[must_use]
    pub fn declared_type_parameters(&self) -> &[Arc<TypeParameterDescriptor>] {
        &self.type_parameters
    }

    /// Names of the directly nested classes.
    #[must_use]
    pub fn nested_class_names(&self) -> &[Name] {
        &self.nested_class_names
    }

    /// Names of the enum entries.
    #[must_use]
    pub fn enum_entry_names(&self) -> &[Name] {
        &self.enum_entry_names
    }

    /// Name of the companion object.
    #[must_use]
    pub fn companion_object_name(&self) -> Option<&Name> {
        self.companion_object_name.as_ref()
    }

    /// The member scope.
    #[must_use]
    pub fn member_scope(&self) -> MemberScope {
        MemberScope::Class(Arc::clone(&self.scope))
    }

    /// The static scope; only enum classes have a non-empty one.
    #[must_use]
    pub fn static_scope(&self) -> MemberScope {
        self.static_scope.clone()
    }

    /// The direct supertypes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for corrupted supertype messages.
    pub fn supertypes(&self) -> Result<&[Type]> {
        self.supertypes
            .get(|| self.compute_supertypes())
            .map(Vec::as_slice)
    }

    fn compute_supertypes(&self) -> Result<Vec<Type>> {
        let module = upgrade_module!(self.module);

        let mut supertypes = Vec::with_capacity(self.proto.supertypes.len());
        for supertype in &self.proto.supertypes {
            supertypes.push(members::type_ref(&self.ctx, supertype)?);
        }
        supertypes.extend(
            module
                .additional_supertypes()
                .for_class(&module, &self.class_id)?,
        );

        let mut missing = Vec::new();
        for supertype in &supertypes {
            if let Some(class) = supertype.class_descriptor()? {
                if class.is_not_found() {
                    missing.push(class.class_id().clone());
                }
            }
        }
        if !missing.is_empty() && !self.incomplete_hierarchy_reported.swap(true, Ordering::SeqCst)
        {
            debug!(class = %self.class_id, missing = ?missing, "incomplete class hierarchy");
            module
                .error_reporter()
                .report_incomplete_hierarchy(&self.class_id, &missing);
        }

        if module.config().detect_supertype_loops {
            let max_depth = module.config().max_hierarchy_depth;
            let mut kept = Vec::with_capacity(supertypes.len());
            let mut looping = Vec::new();
            for supertype in supertypes {
                match supertype.class_descriptor()? {
                    Some(class) if self.reaches_self(&class, max_depth)? => {
                        looping.push(class.class_id().clone());
                    }
                    _ => kept.push(supertype),
                }
            }
            if !looping.is_empty() {
                warn!(class = %self.class_id, looping = ?looping, "supertype loop disconnected");
                module
                    .error_reporter()
                    .report_cyclic_hierarchy(&self.class_id, &looping);
            }
            supertypes = kept;
        }

        Ok(supertypes)
    }

    /// Depth-first walk up from `start`; `true` if it leads back to this class.
    fn reaches_self(&self, start: &ClassRc, max_depth: usize) -> Result<bool> {
        let mut visited = HashSet::new();
        let mut stack = vec![(Arc::clone(start), 0usize)];
        while let Some((class, depth)) = stack.pop() {
            if class.class_id() == &self.class_id {
                return Ok(true);
            }
            if depth >= max_depth || !visited.insert(class.class_id().clone()) {
                continue;
            }
            for supertype in class.supertypes()? {
                if let Some(next) = supertype.class_descriptor()? {
                    stack.push((next, depth + 1));
                }
            }
        }
        Ok(false)
    }

    fn computed_constructors(&self) -> Result<&Constructors> {
        self.constructors.get(|| {
            let return_type = self.self_ref.upgrade()?.default_type()?;
            let deserializer = MemberDeserializer::new(&self.ctx);

            let mut secondary = Vec::new();
            let mut primary = if self.kind.is_singleton() {
                Some(deserializer.synthesized_constructor(return_type.clone()))
            } else {
                None
            };

            for proto in &self.proto.constructors {
                let attributes = ConstructorAttributes::from_constructor_flags(proto.flags);
                if attributes.contains(ConstructorAttributes::IS_SECONDARY) {
                    secondary.push(deserializer.constructor(proto, false, return_type.clone())?);
                } else if primary.is_none() {
                    primary = Some(deserializer.constructor(proto, true, return_type.clone())?);
                }
            }

            if primary.is_none() && self.kind == ClassKind::EnumClass {
                primary = Some(deserializer.synthesized_constructor(return_type));
            }

            let mut all = secondary;
            all.extend(primary.iter().cloned());
            Ok(Constructors { all, primary })
        })
    }

    /// Secondary constructors followed by the primary one.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for corrupted constructor messages.
    pub fn constructors(&self) -> Result<&[Arc<ConstructorDescriptor>]> {
        Ok(&self.computed_constructors()?.all)
    }

    /// The primary constructor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for corrupted constructor messages.
    pub fn primary_constructor(&self) -> Result<Option<Arc<ConstructorDescriptor>>> {
        Ok(self.computed_constructors()?.primary.clone())
    }

    /// The companion object, looked up by its recorded name.
    ///
    /// # Errors
    /// Propagates resolution errors of the companion class.
    pub fn companion_object(&self) -> Result<Option<ClassRc>> {
        match &self.companion_object_name {
            Some(name) => self.member_scope().classifier(name, None),
            None => Ok(None),
        }
    }

    /// The enum entry `name`.
    ///
    /// # Errors
    /// Returns [`crate::Error::ModuleReleased`] if the module is gone.
    pub fn enum_entry(&self, name: &Name) -> Result<Option<ClassRc>> {
        if self.kind != ClassKind::EnumClass || !self.enum_entry_names.contains(name) {
            return Ok(None);
        }
        self.enum_entries
            .get_or_compute(name, |name| {
                Ok(EnumEntryClass::create(
                    self.module.clone(),
                    self.self_ref.clone(),
                    name.clone(),
                ))
            })
            .map(Some)
    }

    /// Member names every entry of this enum exposes: the function and property names of all
    /// supertypes other than `kotlin.Any`, plus the enum's own declared members. Computed once
    /// and shared by all entries.
    ///
    /// # Errors
    /// Propagates resolution errors of the supertypes.
    pub fn enum_member_names(&self) -> Result<Arc<BTreeSet<Name>>> {
        self.enum_member_names
            .get(|| {
                let any = BuiltInClass::Any.class_id();
                let mut names = BTreeSet::new();
                for supertype in self.supertypes()? {
                    let Some(class) = supertype.class_descriptor()? else {
                        continue;
                    };
                    if class.class_id() == &any {
                        continue;
                    }
                    let scope = class.member_scope();
                    names.extend(scope.function_names()?);
                    names.extend(scope.property_names()?);
                }
                names.extend(self.scope.declared_member_names()?);
                Ok(Arc::new(names))
            })
            .cloned()
    }
}

impl fmt::Debug for DeserializedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeserializedClass")
            .field("class_id", &self.class_id)
            .field("kind", &self.kind)
            .field("modality", &self.modality)
            .field("visibility", &self.visibility)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptors::CallableMember,
        reporting::DiagnosticCategory,
        test::{class_blob, module_from_blobs},
    };

    #[test]
    fn missing_supertype_becomes_placeholder_and_is_reported_once() {
        let blob = class_blob(|e| {
            let mut b = e.class("a/Derived");
            let missing = b.class_type("a/Missing");
            b.supertype(missing);
            b.build()
        });
        let t = module_from_blobs(&[blob]);

        let class = t
            .module
            .find_class(&ClassId::parse("a/Derived"))
            .unwrap()
            .unwrap();
        let supertypes = class.supertypes().unwrap();
        assert_eq!(supertypes.len(), 1);
        assert!(supertypes[0].is_not_found().unwrap());
        assert_eq!(
            supertypes[0].class_id().unwrap(),
            Some(ClassId::parse("a/Missing"))
        );

        class.supertypes().unwrap();
        class.member_scope().function_names().unwrap();
        let reported = t
            .reporter
            .diagnostics()
            .by_category(DiagnosticCategory::IncompleteHierarchy)
            .len();
        assert_eq!(reported, 1);
    }

    #[test]
    fn supertype_loop_is_disconnected() {
        let a = class_blob(|e| {
            let mut b = e.class("a/A");
            let sup = b.class_type("a/B");
            b.modality(Modality::Open).supertype(sup);
            b.build()
        });
        let b = class_blob(|e| {
            let mut b = e.class("a/B");
            let sup = b.class_type("a/A");
            b.modality(Modality::Open).supertype(sup);
            b.build()
        });
        let t = module_from_blobs(&[a, b]);

        let class_a = t.module.find_class(&ClassId::parse("a/A")).unwrap().unwrap();
        assert!(class_a.supertypes().unwrap().is_empty());

        let class_b = t.module.find_class(&ClassId::parse("a/B")).unwrap().unwrap();
        assert_eq!(class_b.supertypes().unwrap().len(), 1);

        let cycles = t
            .reporter
            .diagnostics()
            .by_category(DiagnosticCategory::CyclicHierarchy)
            .len();
        assert_eq!(cycles, 1);
    }

    #[test]
    fn constructors_list_secondary_before_primary() {
        let blob = class_blob(|e| {
            let mut b = e.class("a/Point");
            let int = b.class_type("kotlin/Int");
            let string = b.class_type("kotlin/String");
            b.constructor(vec![("x", int.clone()), ("y", int)])
                .secondary_constructor(vec![("text", string)]);
            b.build()
        });
        let t = module_from_blobs(&[blob]);
        let class = t
            .module
            .find_class(&ClassId::parse("a/Point"))
            .unwrap()
            .unwrap();

        let constructors = class.constructors().unwrap();
        assert_eq!(constructors.len(), 2);
        assert!(!constructors[0].is_primary());
        assert!(constructors[1].is_primary());
        assert_eq!(constructors[1].value_parameters().len(), 2);

        let primary = class.primary_constructor().unwrap().unwrap();
        assert!(Arc::ptr_eq(&primary, &constructors[1]));
        assert!(!primary.is_synthesized());
        assert_eq!(primary.return_type().render().unwrap(), "a/Point");
    }

    #[test]
    fn objects_get_synthesized_private_constructor() {
        let blob = class_blob(|e| {
            let mut b = e.class("a/Registry");
            b.kind(ClassKind::Object);
            b.build()
        });
        let t = module_from_blobs(&[blob]);
        let class = t
            .module
            .find_class(&ClassId::parse("a/Registry"))
            .unwrap()
            .unwrap();

        let primary = class.primary_constructor().unwrap().unwrap();
        assert!(primary.is_synthesized());
        assert_eq!(primary.visibility(), Visibility::Private);
        assert!(primary.value_parameters().is_empty());
        assert_eq!(class.constructors().unwrap().len(), 1);
    }

    #[test]
    fn companion_and_nested_classes_resolve_by_name() {
        let outer = class_blob(|e| {
            let mut b = e.class("a/Outer");
            b.nested_class("Nested").companion_object("Companion");
            b.build()
        });
        let nested = class_blob(|e| e.class("a/Outer.Nested").build());
        let companion = class_blob(|e| {
            let mut b = e.class("a/Outer.Companion");
            b.kind(ClassKind::CompanionObject);
            b.build()
        });
        let t = module_from_blobs(&[outer, nested, companion]);

        let outer = t
            .module
            .find_class(&ClassId::parse("a/Outer"))
            .unwrap()
            .unwrap();
        let companion = outer.companion_object().unwrap().unwrap();
        assert!(companion.is_companion_object());
        assert_eq!(companion.class_id(), &ClassId::parse("a/Outer.Companion"));
        assert!(matches!(
            companion.container(),
            Container::Class(owner) if owner.points_to(&outer)
        ));

        let nested = outer
            .nested_class(&Name::identifier("Nested"))
            .unwrap()
            .unwrap();
        assert_eq!(nested.class_id(), &ClassId::parse("a/Outer.Nested"));
        assert!(outer
            .nested_class(&Name::identifier("Unknown"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn inner_class_type_parameters_follow_outer_ones() {
        use crate::metadata::{
            builder::FunctionProtoBuilder,
            proto::{TypeProto, VarianceProto},
        };

        let outer = class_blob(|e| {
            let mut b = e.class("a/Outer");
            b.type_parameter(0, "T", VarianceProto::Inv, Vec::new())
                .nested_class("Inner");
            b.build()
        });
        let inner = class_blob(|e| {
            let mut b = e.class("a/Outer.Inner");
            b.attributes(ClassAttributes::IS_INNER)
                .type_parameter(1, "U", VarianceProto::Out, Vec::new());
            let get = FunctionProtoBuilder::new(b.names(), "get")
                .returns(TypeProto::type_parameter(0))
                .build();
            b.function_proto(get);
            b.build()
        });
        let t = module_from_blobs(&[outer, inner]);

        let inner = t
            .module
            .find_class(&ClassId::parse("a/Outer.Inner"))
            .unwrap()
            .unwrap();
        assert!(inner.is_inner());
        let names: Vec<String> = inner
            .type_constructor_parameters()
            .unwrap()
            .iter()
            .map(|parameter| parameter.name().to_string())
            .collect();
        assert_eq!(names, vec!["T", "U"]);
        assert_eq!(
            inner.default_type().unwrap().render().unwrap(),
            "a/Outer.Inner<T, U>"
        );

        let outer = t
            .module
            .find_class(&ClassId::parse("a/Outer"))
            .unwrap()
            .unwrap();
        let get = inner
            .member_scope()
            .functions(&Name::identifier("get"), None)
            .unwrap();
        assert_eq!(get.len(), 1);
        let returned = get[0].return_type().constructor().unwrap();
        let parameter = returned.as_type_parameter().unwrap();
        assert!(parameter.points_to(&outer.declared_type_parameters()[0]));
    }
}
