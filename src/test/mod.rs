//! Fixtures shared by the unit tests.

use std::sync::Arc;

pub use crate::metadata::writer::BlobEncoder;

use crate::{
    locator::MemoryClassFinder,
    metadata::proto::ClassProto,
    module::{Module, ModuleBuilder},
    reporting::{DiagnosticsReporter, RecordingLookupTracker},
    ResolverConfig,
};

/// A module over the given blobs with recording collaborators.
pub struct TestModule {
    pub module: Arc<Module>,
    pub reporter: Arc<DiagnosticsReporter>,
    pub tracker: Arc<RecordingLookupTracker>,
}

/// Builds a module from encoded blobs.
pub fn module_from_blobs(blobs: &[Vec<u8>]) -> TestModule {
    module_from_blobs_with(blobs, ResolverConfig::default())
}

/// Builds a module from encoded blobs with an explicit configuration.
pub fn module_from_blobs_with(blobs: &[Vec<u8>], config: ResolverConfig) -> TestModule {
    let finder = MemoryClassFinder::new(config);
    for blob in blobs {
        finder.add_blob(blob).unwrap();
    }
    let reporter = Arc::new(DiagnosticsReporter::new());
    let tracker = Arc::new(RecordingLookupTracker::new());
    let module = ModuleBuilder::new("test")
        .config(config)
        .finder(Arc::new(finder))
        .error_reporter(reporter.clone())
        .lookup_tracker(tracker.clone())
        .build()
        .unwrap();
    TestModule {
        module,
        reporter,
        tracker,
    }
}

/// Encodes the class built by `build` as a single-class blob with its own pools.
pub fn class_blob(build: impl FnOnce(&mut BlobEncoder) -> ClassProto) -> Vec<u8> {
    let mut encoder = BlobEncoder::new();
    let proto = build(&mut encoder);
    encoder.encode_class(&proto)
}
