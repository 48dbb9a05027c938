//! Concurrent resolution over a wide class path.
//!
//! Builds a chain of classes where every class extends the previous one, then hammers the
//! module from the rayon pool. Every query must observe the same descriptor instances and the
//! same member lists no matter which thread computed them first.

use metascope::{
    metadata::{flags::Modality, writer::BlobEncoder},
    prelude::*,
};
use rayon::prelude::*;
use std::sync::Arc;

const CHAIN_LENGTH: usize = 48;

fn class_id(index: usize) -> ClassId {
    ClassId::parse(&format!("chain/Link{index:02}"))
}

/// Package blob for `chain` holding `open class LinkNN : Link(NN-1) { open fun stepNN(value: Int): Int }`.
fn chain_blob() -> Vec<u8> {
    let mut encoder = BlobEncoder::new();
    let part = encoder.package_proto().build();

    let mut classes = Vec::with_capacity(CHAIN_LENGTH);
    for index in 0..CHAIN_LENGTH {
        let supertype = if index == 0 {
            encoder.class_type("kotlin/Any")
        } else {
            encoder.class_type(&format!("chain/Link{:02}", index - 1))
        };
        let int = encoder.class_type("kotlin/Int");
        let step = encoder
            .function(&format!("step{index}"))
            .modality(Modality::Open)
            .parameter("value", int.clone())
            .returns(int)
            .build();
        let mut b = encoder.class(&format!("chain/Link{index:02}"));
        b.modality(Modality::Open)
            .supertype(supertype)
            .function_proto(step);
        classes.push(b.build());
    }

    let fq_name = encoder.names.package(&FqName::new("chain"));
    encoder.encode_package(fq_name, &part, &classes)
}

fn chain_module() -> Arc<Module> {
    let finder = PackageBlobFinder::new(&chain_blob(), &ResolverConfig::default()).unwrap();
    ModuleBuilder::new("chain")
        .finder(Arc::new(finder))
        .build()
        .unwrap()
}

#[test]
fn parallel_lookups_share_instances() {
    let module = chain_module();

    let resolved: Vec<(usize, ClassRc)> = (0..CHAIN_LENGTH * 8)
        .into_par_iter()
        .map(|i| {
            // Walk the chain from the far end so threads race on the same lazy supertypes.
            let index = CHAIN_LENGTH - 1 - (i % CHAIN_LENGTH);
            let class = module.find_class(&class_id(index)).unwrap().unwrap();
            class.supertypes().unwrap();
            (index, class)
        })
        .collect();

    for (index, class) in &resolved {
        let canonical = module.find_class(&class_id(*index)).unwrap().unwrap();
        assert!(Arc::ptr_eq(class, &canonical));
    }
    assert!(module.loaded_classes().len() >= CHAIN_LENGTH);
}

#[test]
fn parallel_member_scopes_agree() {
    let module = chain_module();
    let last = class_id(CHAIN_LENGTH - 1);

    let counts: Vec<usize> = (0..CHAIN_LENGTH)
        .into_par_iter()
        .map(|index| {
            let class = module.find_class(&last).unwrap().unwrap();
            let step = class
                .member_scope()
                .functions(&Name::identifier(format!("step{index}")), None)
                .unwrap();
            assert_eq!(step.len(), 1, "step{index}");
            if index == CHAIN_LENGTH - 1 {
                assert_eq!(step[0].kind(), MemberKind::Declaration);
            } else {
                assert_eq!(step[0].kind(), MemberKind::FakeOverride);
            }
            class.member_scope().function_names().unwrap().len()
        })
        .collect();

    // Every step function plus equals, hashCode and toString.
    assert!(counts.iter().all(|&count| count == CHAIN_LENGTH + 3));

    let class = module.find_class(&last).unwrap().unwrap();
    let first = class
        .member_scope()
        .functions(&Name::identifier("step0"), None)
        .unwrap();
    let again = class
        .member_scope()
        .functions(&Name::identifier("step0"), None)
        .unwrap();
    assert!(Arc::ptr_eq(&first[0], &again[0]));
}

#[test]
fn resolve_all_classes_returns_module_instances() {
    let module = chain_module();
    let view = module.package(&FqName::new("chain")).unwrap();

    let all = view.resolve_all_classes().unwrap();
    assert_eq!(all.len(), CHAIN_LENGTH);
    for (index, class) in all.iter().enumerate() {
        assert_eq!(class.class_id(), &class_id(index));
        let canonical = module.find_class(&class_id(index)).unwrap().unwrap();
        assert!(Arc::ptr_eq(class, &canonical));
    }
}
