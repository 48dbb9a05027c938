//! Integration tests for the metadata sources.
//!
//! Covers the file system layout, package blobs, finder precedence, version checks and
//! packages whose enumeration re-enters itself.

use metascope::{
    locator::{ClassData, PackageData, METADATA_FILE_EXTENSION, PACKAGE_FILE_NAME},
    metadata::{
        flags::Modality,
        proto::{TypeProto, TypeRef},
        writer::BlobEncoder,
        BinaryVersion, MetadataBlob,
    },
    prelude::*,
    types::RejectFlexibleTypes,
};
use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex, OnceLock, Weak},
};
use tempfile::TempDir;

/// Single-class blob for `id` declaring one function `name`.
fn class_with_function(id: &str, name: &str) -> Vec<u8> {
    let mut encoder = BlobEncoder::new();
    let mut b = encoder.class(id);
    b.modality(Modality::Open).function(name);
    let proto = b.build();
    encoder.encode_class(&proto)
}

/// Package blob for `package` with a top-level function `helper` and classes `class_names`.
fn package_blob(package: &str, class_names: &[&str]) -> Vec<u8> {
    let mut encoder = BlobEncoder::new();
    let mut part = encoder.package_proto();
    part.function("helper");
    let part = part.build();

    let classes: Vec<_> = class_names
        .iter()
        .map(|name| {
            let id = format!("{}/{}", package.replace('.', "/"), name);
            let mut b = encoder.class(&id);
            b.function("run");
            b.build()
        })
        .collect();
    let fq_name = encoder.names.package(&FqName::new(package));
    encoder.encode_package(fq_name, &part, &classes)
}

fn module_over(finder: Arc<dyn ClassDataFinder>) -> Arc<Module> {
    ModuleBuilder::new("locators").finder(finder).build().unwrap()
}

fn write(root: &Path, relative: &str, bytes: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

#[test]
fn file_system_layout_is_followed() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        &format!("a/b/Service.{METADATA_FILE_EXTENSION}"),
        &class_with_function("a/b/Service", "start"),
    );
    write(root, &format!("a/b/{PACKAGE_FILE_NAME}"), &package_blob("a.b", &[]));
    fs::create_dir_all(root.join("a/b/c")).unwrap();

    let finder = FileSystemClassFinder::new(root, ResolverConfig::default()).unwrap();
    assert_eq!(
        finder.class_file(&ClassId::parse("a/b/Outer.Inner")),
        root.join(format!("a/b/Outer$Inner.{METADATA_FILE_EXTENSION}"))
    );
    let module = module_over(Arc::new(finder));

    let service = module
        .find_class(&ClassId::parse("a/b/Service"))
        .unwrap()
        .unwrap();
    let start = service
        .member_scope()
        .functions(&Name::identifier("start"), None)
        .unwrap();
    assert_eq!(start.len(), 1);
    assert!(matches!(
        service.source(),
        Some(metascope::locator::SourceElement::File(_))
    ));
    assert!(module
        .find_class(&ClassId::parse("a/b/Absent"))
        .unwrap()
        .is_none());

    let view = module.package(&FqName::new("a.b")).unwrap();
    assert_eq!(
        view.member_scope().classifier_names().unwrap(),
        [Name::identifier("Service")].into_iter().collect()
    );
    assert_eq!(
        view.member_scope()
            .functions(&Name::identifier("helper"), None)
            .unwrap()
            .len(),
        1
    );
    assert_eq!(view.sub_packages().unwrap(), vec![FqName::new("a.b.c")]);
    assert_eq!(
        module.sub_packages_of(&FqName::new("a")).unwrap(),
        vec![FqName::new("a.b")]
    );
}

#[test]
fn file_describing_another_class_is_malformed() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        &format!("a/Foo.{METADATA_FILE_EXTENSION}"),
        &class_with_function("a/Bar", "run"),
    );
    write(dir.path(), &format!("a/Empty.{METADATA_FILE_EXTENSION}"), &[]);

    let finder = FileSystemClassFinder::new(dir.path(), ResolverConfig::default()).unwrap();
    let module = module_over(Arc::new(finder));

    assert!(matches!(
        module.find_class(&ClassId::parse("a/Foo")),
        Err(Error::Malformed { .. })
    ));
    assert!(matches!(
        module.find_class(&ClassId::parse("a/Empty")),
        Err(Error::Empty)
    ));
}

#[test]
fn file_system_root_must_be_a_directory() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();

    assert!(FileSystemClassFinder::new(&file, ResolverConfig::default()).is_err());
    assert!(matches!(
        FileSystemClassFinder::new(dir.path().join("missing"), ResolverConfig::default()),
        Err(Error::FileError(_))
    ));
}

#[test]
fn package_blob_serves_its_package() {
    let blob = package_blob("x.y", &["First", "Second"]);
    let finder = PackageBlobFinder::new(&blob, &ResolverConfig::default()).unwrap();
    assert_eq!(finder.fq_name(), &FqName::new("x.y"));
    let module = module_over(Arc::new(finder));

    let view = module.package(&FqName::new("x.y")).unwrap();
    let classes = view.resolve_all_classes().unwrap();
    let names: Vec<_> = classes.iter().map(|class| class.name()).collect();
    assert_eq!(names, vec![Name::identifier("First"), Name::identifier("Second")]);

    let first = module
        .find_class(&ClassId::parse("x/y/First"))
        .unwrap()
        .unwrap();
    assert!(Arc::ptr_eq(&classes[0], &first));
    assert_eq!(module.sub_packages_of(&FqName::new("x")).unwrap(), vec![FqName::new("x.y")]);

    let single = class_with_function("x/y/Other", "run");
    assert!(matches!(
        PackageBlobFinder::new(&single, &ResolverConfig::default()),
        Err(Error::Malformed { .. })
    ));
}

#[test]
fn earlier_finders_take_precedence() {
    let first = MemoryClassFinder::default();
    first.add_blob(&class_with_function("a/Shared", "fromFirst")).unwrap();
    let second = MemoryClassFinder::default();
    second.add_blob(&class_with_function("a/Shared", "fromSecond")).unwrap();
    second.add_blob(&class_with_function("a/Only", "run")).unwrap();

    let module = ModuleBuilder::new("precedence")
        .finder(Arc::new(first))
        .finder(Arc::new(second))
        .build()
        .unwrap();

    let shared = module
        .find_class(&ClassId::parse("a/Shared"))
        .unwrap()
        .unwrap();
    let names = shared.member_scope().function_names().unwrap();
    assert!(names.contains(&Name::identifier("fromFirst")));
    assert!(!names.contains(&Name::identifier("fromSecond")));
    assert!(module.find_class(&ClassId::parse("a/Only")).unwrap().is_some());
}

#[test]
fn incompatible_version_is_rejected_unless_permissive() {
    let mut encoder = BlobEncoder::new();
    encoder.version = BinaryVersion::new(BinaryVersion::CURRENT.major + 1, 0, 0);
    let mut b = encoder.class("a/Future");
    b.function("run");
    let proto = b.build();
    let blob = encoder.encode_class(&proto);

    let strict = MemoryClassFinder::new(ResolverConfig::strict());
    match strict.add_blob(&blob) {
        Err(Error::IncompatibleVersion { expected, actual }) => {
            assert_eq!(expected, BinaryVersion::CURRENT);
            assert_eq!(actual.major, BinaryVersion::CURRENT.major + 1);
        }
        other => panic!("expected a version error, got {other:?}"),
    }
    assert_eq!(strict.class_count(), 0);

    let permissive = MemoryClassFinder::new(ResolverConfig::permissive());
    permissive.add_blob(&blob).unwrap();
    assert!(permissive.contains_class(&ClassId::parse("a/Future")));

    let decoded = MetadataBlob::parse(&blob, &ResolverConfig::permissive()).unwrap();
    assert_eq!(decoded.version.major, BinaryVersion::CURRENT.major + 1);
}

#[test]
fn flexible_types_go_through_the_module_factory() {
    let mut encoder = BlobEncoder::new();
    let upper = encoder.class_type("kotlin/String").with_nullable(true);
    let mut flexible = encoder.class_type("kotlin/String");
    flexible.flexible_upper_bound = Some(TypeRef::inline(upper));
    flexible.flexible_type_id = Some(encoder.names.string("platform"));
    let mut b = encoder.class("a/Holder");
    b.property("name", flexible);
    let proto = b.build();
    let blob = encoder.encode_class(&proto);

    let name_type = |module: &Module| -> metascope::Result<Type> {
        let holder = module
            .find_class(&ClassId::parse("a/Holder"))?
            .expect("holder is registered");
        let properties = holder
            .member_scope()
            .properties(&Name::identifier("name"), None)?;
        Ok(properties[0].return_type().clone())
    };

    let lenient = MemoryClassFinder::default();
    lenient.add_blob(&blob).unwrap();
    let ty = name_type(&module_over(Arc::new(lenient))).unwrap();
    assert!(ty.is_flexible());
    assert_eq!(ty.render().unwrap(), "(kotlin/String..kotlin/String?)");

    let strict = MemoryClassFinder::default();
    strict.add_blob(&blob).unwrap();
    let module = ModuleBuilder::new("strict")
        .finder(Arc::new(strict))
        .flexible_type_factory(Arc::new(RejectFlexibleTypes))
        .build()
        .unwrap();
    assert!(matches!(
        name_type(&module),
        Err(Error::FlexibleTypesRejected(id)) if id == "platform"
    ));
}

/// A finder whose sub-package listing consults the module it is part of.
struct LinkFollowingFinder {
    module: OnceLock<Weak<Module>>,
    nested_results: Mutex<Vec<usize>>,
}

impl ClassDataFinder for LinkFollowingFinder {
    fn find_class_data(&self, _class_id: &ClassId) -> metascope::Result<Option<ClassData>> {
        Ok(None)
    }

    fn find_package_data(&self, _fq_name: &FqName) -> metascope::Result<Vec<PackageData>> {
        Ok(Vec::new())
    }

    fn sub_packages_of(&self, fq_name: &FqName) -> metascope::Result<Vec<FqName>> {
        if let Some(module) = self.module.get().and_then(Weak::upgrade) {
            let nested = module.sub_packages_of(fq_name)?;
            self.nested_results.lock().unwrap().push(nested.len());
        }
        Ok(vec![fq_name.child(Name::identifier("linked"))])
    }
}

#[test]
fn re_entrant_sub_package_enumeration_terminates() {
    let finder = Arc::new(LinkFollowingFinder {
        module: OnceLock::new(),
        nested_results: Mutex::new(Vec::new()),
    });
    let module = module_over(finder.clone());
    finder.module.set(Arc::downgrade(&module)).unwrap();

    let fq_name = FqName::new("app");
    assert_eq!(
        module.sub_packages_of(&fq_name).unwrap(),
        vec![FqName::new("app.linked")]
    );
    // The nested enumeration saw the empty fallback instead of recursing.
    assert_eq!(*finder.nested_results.lock().unwrap(), vec![0]);

    // Memoized: the finder is not consulted again.
    module.sub_packages_of(&fq_name).unwrap();
    assert_eq!(finder.nested_results.lock().unwrap().len(), 1);
}

#[test]
fn type_table_references_resolve() {
    let mut encoder = BlobEncoder::new();
    let int = encoder.class_type("kotlin/Int");
    let index = encoder.add_type(int);
    let mut b = encoder.class("a/Counter");
    b.property("count", TypeProto::type_parameter(0));
    let mut proto = b.build();
    proto.properties[0].return_type = TypeRef::Table(index);
    let blob = encoder.encode_class(&proto);

    let finder = MemoryClassFinder::default();
    finder.add_blob(&blob).unwrap();
    let module = module_over(Arc::new(finder));
    let counter = module
        .find_class(&ClassId::parse("a/Counter"))
        .unwrap()
        .unwrap();
    let count = counter
        .member_scope()
        .properties(&Name::identifier("count"), None)
        .unwrap();
    assert_eq!(count[0].return_type().render().unwrap(), "kotlin/Int");
}
