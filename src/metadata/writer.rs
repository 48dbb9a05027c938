//! Encoder for metadata blobs.
//!
//! Produces exactly the layout [`crate::metadata::MetadataBlob::parse`] reads. Messages are
//! assembled with the [`crate::metadata::builder`] types against the encoder's name pools, then
//! written out together with those pools and the encoder's type table.
//!
//! # Examples
//!
//! ```rust
//! use metascope::metadata::{writer::BlobEncoder, BlobPayload, MetadataBlob};
//! use metascope::ResolverConfig;
//!
//! let mut encoder = BlobEncoder::new();
//! let proto = encoder.class("app/Point").function("draw").build();
//! let bytes = encoder.encode_class(&proto);
//!
//! let blob = MetadataBlob::parse(&bytes, &ResolverConfig::default())?;
//! assert!(matches!(blob.payload, BlobPayload::Class(_)));
//! # Ok::<(), metascope::Error>(())
//! ```

use crate::{
    metadata::{
        blob::{
            BLOB_MAGIC, PAYLOAD_CLASS, PAYLOAD_PACKAGE, TYPE_HAS_FLEXIBLE_ID,
            TYPE_HAS_FLEXIBLE_UPPER, TYPE_HAS_OUTER, TYPE_NULLABLE, TYPE_RAW,
        },
        builder::{
            class_type, ClassProtoBuilder, FunctionProtoBuilder, PackageProtoBuilder,
            PropertyProtoBuilder,
        },
        nameresolver::{NameResolver, NameTableBuilder, QualifiedNameKind},
        proto::{
            ClassProto, FunctionProto, PackageProto, ProjectionKind, PropertyProto,
            TypeClassifier, TypeParameterProto, TypeProto, TypeRef, ValueParameterProto,
            VarianceProto,
        },
        version::BinaryVersion,
    },
    names::ClassId,
};

/// Collects name pools and a type table, and encodes messages built against them.
#[derive(Clone, Debug)]
pub struct BlobEncoder {
    /// Name pools every message of the blob indexes into
    pub names: NameTableBuilder,
    /// Version written into the header
    pub version: BinaryVersion,
    types: Vec<TypeProto>,
}

impl Default for BlobEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobEncoder {
    /// An encoder with empty pools, writing the current format version.
    #[must_use]
    pub fn new() -> Self {
        BlobEncoder {
            names: NameTableBuilder::new(),
            version: BinaryVersion::CURRENT,
            types: Vec::new(),
        }
    }

    /// Adds a type to the type table and returns its index.
    pub fn add_type(&mut self, ty: TypeProto) -> u32 {
        self.types.push(ty);
        (self.types.len() - 1) as u32
    }

    /// Starts a class message for `class_id` (written as `a/b/Outer.Inner`).
    pub fn class(&mut self, class_id: &str) -> ClassProtoBuilder<'_> {
        ClassProtoBuilder::new(&mut self.names, &ClassId::parse(class_id))
    }

    /// Starts a package part message.
    pub fn package_proto(&mut self) -> PackageProtoBuilder<'_> {
        PackageProtoBuilder::new(&mut self.names)
    }

    /// Starts a function message.
    pub fn function(&mut self, name: &str) -> FunctionProtoBuilder<'_> {
        FunctionProtoBuilder::new(&mut self.names, name)
    }

    /// Starts a property message.
    pub fn property(&mut self, name: &str, ty: TypeProto) -> PropertyProtoBuilder<'_> {
        PropertyProtoBuilder::new(&mut self.names, name, ty)
    }

    /// A non-null class type for `class_id` (written as `a/b/Outer.Inner`).
    pub fn class_type(&mut self, class_id: &str) -> TypeProto {
        class_type(&mut self.names, class_id)
    }

    /// Encodes a single-class blob.
    #[must_use]
    pub fn encode_class(&self, class: &ClassProto) -> Vec<u8> {
        let mut writer = self.start();
        writer.byte(PAYLOAD_CLASS);
        writer.class(class);
        writer.finish()
    }

    /// Encodes a package blob.
    ///
    /// # Arguments
    ///
    /// * `fq_name` - Qualified-name index of the package, `None` for the root package
    /// * `package` - The top-level declarations
    /// * `classes` - Classes declared in the package part
    #[must_use]
    pub fn encode_package(
        &self,
        fq_name: Option<u32>,
        package: &PackageProto,
        classes: &[ClassProto],
    ) -> Vec<u8> {
        let mut writer = self.start();
        writer.byte(PAYLOAD_PACKAGE);
        writer.optional_index(fq_name);
        writer.functions_and_properties(&package.functions, &package.properties);
        writer.uint(classes.len() as u32);
        for class in classes {
            writer.class(class);
        }
        writer.finish()
    }

    fn start(&self) -> BlobWriter {
        let mut writer = BlobWriter::default();
        writer.bytes.extend_from_slice(BLOB_MAGIC);
        writer.uint(self.version.major);
        writer.uint(self.version.minor);
        writer.uint(self.version.patch);
        writer.name_pools(&self.names.clone().build());
        writer.uint(self.types.len() as u32);
        for ty in &self.types {
            writer.ty(ty);
        }
        writer
    }
}

#[derive(Default)]
struct BlobWriter {
    bytes: Vec<u8>,
}

impl BlobWriter {
    fn finish(self) -> Vec<u8> {
        self.bytes
    }

    fn byte(&mut self, value: u8) {
        self.bytes.push(value);
    }

    fn bool(&mut self, value: bool) {
        self.byte(u8::from(value));
    }

    /// Compressed unsigned integer: 1, 2 or 4 bytes, big-endian payload.
    fn uint(&mut self, value: u32) {
        if value < 0x80 {
            self.byte(value as u8);
        } else if value < 0x4000 {
            self.byte(0x80 | (value >> 8) as u8);
            self.byte(value as u8);
        } else {
            self.byte(0xC0 | (value >> 24) as u8);
            self.byte((value >> 16) as u8);
            self.byte((value >> 8) as u8);
            self.byte(value as u8);
        }
    }

    fn optional_index(&mut self, index: Option<u32>) {
        self.uint(index.map_or(0, |index| index + 1));
    }

    fn string(&mut self, text: &str) {
        let mut length = text.len() as u32;
        loop {
            let low = (length & 0x7F) as u8;
            length >>= 7;
            if length == 0 {
                self.byte(low);
                break;
            }
            self.byte(low | 0x80);
        }
        self.bytes.extend_from_slice(text.as_bytes());
    }

    fn name_pools(&mut self, resolver: &NameResolver) {
        self.uint(resolver.strings().len() as u32);
        for string in resolver.strings() {
            self.string(string);
        }

        self.uint(resolver.qualified_names().len() as u32);
        for link in resolver.qualified_names() {
            self.optional_index(link.parent);
            self.uint(link.short_name);
            self.byte(match link.kind {
                QualifiedNameKind::Class => 0,
                QualifiedNameKind::Package => 1,
                QualifiedNameKind::Local => 2,
            });
        }
    }

    fn type_ref(&mut self, type_ref: &TypeRef) {
        match type_ref {
            TypeRef::Inline(ty) => {
                self.byte(0);
                self.ty(ty);
            }
            TypeRef::Table(index) => {
                self.byte(1);
                self.uint(*index);
            }
        }
    }

    fn optional_type_ref(&mut self, type_ref: Option<&TypeRef>) {
        self.bool(type_ref.is_some());
        if let Some(type_ref) = type_ref {
            self.type_ref(type_ref);
        }
    }

    fn ty(&mut self, ty: &TypeProto) {
        let mut flags = 0;
        if ty.nullable {
            flags |= TYPE_NULLABLE;
        }
        if ty.flexible_upper_bound.is_some() {
            flags |= TYPE_HAS_FLEXIBLE_UPPER;
        }
        if ty.flexible_type_id.is_some() {
            flags |= TYPE_HAS_FLEXIBLE_ID;
        }
        if ty.outer_type.is_some() {
            flags |= TYPE_HAS_OUTER;
        }
        if ty.raw {
            flags |= TYPE_RAW;
        }
        self.byte(flags);

        match ty.classifier {
            TypeClassifier::Class(index) => {
                self.byte(0);
                self.uint(index);
            }
            TypeClassifier::TypeParameter(id) => {
                self.byte(1);
                self.uint(id);
            }
            TypeClassifier::TypeParameterName(index) => {
                self.byte(2);
                self.uint(index);
            }
        }

        self.uint(ty.arguments.len() as u32);
        for argument in &ty.arguments {
            match (argument.projection, &argument.ty) {
                (ProjectionKind::Star, _) | (_, None) => self.byte(3),
                (projection, Some(type_ref)) => {
                    self.byte(match projection {
                        ProjectionKind::In => 0,
                        ProjectionKind::Out => 1,
                        _ => 2,
                    });
                    self.type_ref(type_ref);
                }
            }
        }

        if let Some(id) = ty.flexible_type_id {
            self.uint(id);
        }
        if let Some(upper) = &ty.flexible_upper_bound {
            self.type_ref(upper);
        }
        if let Some(outer) = &ty.outer_type {
            self.type_ref(outer);
        }
    }

    fn type_parameters(&mut self, type_parameters: &[TypeParameterProto]) {
        self.uint(type_parameters.len() as u32);
        for parameter in type_parameters {
            self.uint(parameter.id);
            self.uint(parameter.name);
            self.bool(parameter.reified);
            self.byte(match parameter.variance {
                VarianceProto::In => 0,
                VarianceProto::Out => 1,
                VarianceProto::Inv => 2,
            });
            self.uint(parameter.upper_bounds.len() as u32);
            for bound in &parameter.upper_bounds {
                self.type_ref(bound);
            }
        }
    }

    fn value_parameters(&mut self, value_parameters: &[ValueParameterProto]) {
        self.uint(value_parameters.len() as u32);
        for parameter in value_parameters {
            self.uint(parameter.flags);
            self.uint(parameter.name);
            self.type_ref(&parameter.ty);
            self.optional_type_ref(parameter.vararg_element_type.as_ref());
        }
    }

    fn function(&mut self, function: &FunctionProto) {
        self.uint(function.flags);
        self.uint(function.name);
        self.type_parameters(&function.type_parameters);
        self.optional_type_ref(function.receiver_type.as_ref());
        self.value_parameters(&function.value_parameters);
        self.type_ref(&function.return_type);
    }

    fn property(&mut self, property: &PropertyProto) {
        self.uint(property.flags);
        self.uint(property.name);
        self.type_parameters(&property.type_parameters);
        self.optional_type_ref(property.receiver_type.as_ref());
        self.type_ref(&property.return_type);
    }

    fn functions_and_properties(&mut self, functions: &[FunctionProto], properties: &[PropertyProto]) {
        self.uint(functions.len() as u32);
        for function in functions {
            self.function(function);
        }
        self.uint(properties.len() as u32);
        for property in properties {
            self.property(property);
        }
    }

    fn indices(&mut self, indices: &[u32]) {
        self.uint(indices.len() as u32);
        for index in indices {
            self.uint(*index);
        }
    }

    fn class(&mut self, class: &ClassProto) {
        self.uint(class.flags);
        self.uint(class.fq_name);
        self.bool(class.companion_object_name.is_some());
        if let Some(name) = class.companion_object_name {
            self.uint(name);
        }
        self.type_parameters(&class.type_parameters);

        self.uint(class.supertypes.len() as u32);
        for supertype in &class.supertypes {
            self.type_ref(supertype);
        }

        self.indices(&class.nested_class_names);

        self.uint(class.constructors.len() as u32);
        for constructor in &class.constructors {
            self.uint(constructor.flags);
            self.value_parameters(&constructor.value_parameters);
        }

        self.functions_and_properties(&class.functions, &class.properties);
        self.indices(&class.enum_entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ResolverConfig,
        metadata::{BlobPayload, MetadataBlob},
        names::FqName,
        Parser,
    };

    #[test]
    fn compressed_uints_read_back() {
        for value in [0u32, 1, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1FFF_FFFF] {
            let mut writer = BlobWriter::default();
            writer.uint(value);
            let bytes = writer.finish();
            let mut parser = Parser::new(&bytes);
            assert_eq!(parser.read_compressed_uint().unwrap(), value);
            assert!(!parser.has_more_data());
        }
    }

    #[test]
    fn long_strings_use_multi_byte_prefix() {
        let text = "x".repeat(300);
        let mut writer = BlobWriter::default();
        writer.string(&text);
        let bytes = writer.finish();
        assert_eq!(bytes.len(), 302);

        let mut parser = Parser::new(&bytes);
        assert_eq!(parser.read_prefixed_string_utf8().unwrap(), text);
    }

    #[test]
    fn package_blob_decodes_to_same_messages() {
        let mut encoder = BlobEncoder::new();
        let string = encoder.class_type("kotlin/String");
        let shared = encoder.add_type(string.clone().with_nullable(true));
        let package = encoder
            .package_proto()
            .function("top")
            .property("name", string)
            .build();
        let class = encoder
            .class("a/b/Holder")
            .supertype_ref(TypeRef::Table(shared))
            .build();
        let fq_name = encoder.names.package(&FqName::new("a.b"));
        let bytes = encoder.encode_package(fq_name, &package, std::slice::from_ref(&class));

        let blob = MetadataBlob::parse(&bytes, &ResolverConfig::default()).unwrap();
        assert_eq!(blob.type_table.len(), 1);
        match blob.payload {
            BlobPayload::Package {
                fq_name: decoded_fq,
                package: decoded_package,
                classes,
            } => {
                assert_eq!(
                    blob.name_resolver.fq_name(decoded_fq.unwrap()).unwrap(),
                    FqName::new("a.b")
                );
                assert_eq!(*decoded_package, package);
                assert_eq!(*classes[0], class);
            }
            BlobPayload::Class(_) => panic!("expected a package payload"),
        }
    }
}
