#![no_main]

use libfuzzer_sys::fuzz_target;
use metascope::{
    metadata::{BlobPayload, MetadataBlob},
    prelude::*,
};
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let config = ResolverConfig::permissive();
    let Ok(blob) = MetadataBlob::parse(data, &config) else {
        return;
    };

    let finder = MemoryClassFinder::new(config);
    if finder.add_blob(data).is_err() {
        return;
    }
    let Ok(module) = ModuleBuilder::new("fuzz")
        .config(config)
        .finder(Arc::new(finder))
        .build()
    else {
        return;
    };

    // Errors are expected for garbage; panics and hangs are not.
    let classes: Vec<ClassRc> = match &blob.payload {
        BlobPayload::Class(proto) => blob
            .name_resolver
            .class_id(proto.fq_name)
            .ok()
            .and_then(|id| module.find_class(&id).ok().flatten())
            .into_iter()
            .collect(),
        BlobPayload::Package { fq_name, .. } => {
            let fq_name = match fq_name {
                Some(index) => blob
                    .name_resolver
                    .fq_name(*index)
                    .unwrap_or_else(|_| FqName::root()),
                None => FqName::root(),
            };
            module
                .package(&fq_name)
                .and_then(|view| view.resolve_all_classes())
                .unwrap_or_default()
        }
    };

    for class in classes {
        let _ = class.supertypes();
        let _ = class.constructors();
        let scope = class.member_scope();
        if let Ok(names) = scope.function_names() {
            for name in names {
                let _ = scope.functions(&name, None);
            }
        }
    }
});
