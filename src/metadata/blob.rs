//! Decoder for serialized metadata blobs.
//!
//! A blob is one self-contained unit of metadata: either a single class or a package part
//! together with the classes declared in it. Each blob carries its own name pools and type
//! table, so every message decoded from it can only be interpreted together with them.
//!
//! # Layout
//!
//! All integers are compressed unsigned integers unless noted otherwise.
//!
//! ```text
//! blob        := magic "KMET" | major minor patch | strings | qualified | type-table | payload
//! strings     := count { 7-bit length, UTF-8 bytes }
//! qualified   := count { parent+1 (0 = none), short-name, kind:u8 (0 class, 1 package, 2 local) }
//! type-table  := count { type }
//! payload     := 1:u8 class | 2:u8 package-fq+1 package count { class }
//! type        := flags:u8 classifier-tag:u8 value args [flexible-id] [flexible-upper] [outer]
//! type-ref    := 0:u8 type | 1:u8 table-index
//! ```
//!
//! The version triple is checked right after the magic. An incompatible blob is rejected with
//! [`crate::Error::IncompatibleVersion`] before any pool is decoded, so no descriptor is ever
//! built from it.

use std::sync::Arc;

use crate::{
    config::ResolverConfig,
    file::Parser,
    metadata::{
        nameresolver::{NameResolver, QualifiedName, QualifiedNameKind},
        proto::{
            ArgumentProto, ClassProto, ConstructorProto, FunctionProto, PackageProto,
            ProjectionKind, PropertyProto, TypeClassifier, TypeParameterProto, TypeProto,
            TypeRef, ValueParameterProto, VarianceProto,
        },
        typetable::TypeTable,
        version::BinaryVersion,
    },
    Error, Result,
};

/// Leading magic of every blob
pub const BLOB_MAGIC: &[u8; 4] = b"KMET";

/// Payload tag of a single-class blob
pub const PAYLOAD_CLASS: u8 = 1;
/// Payload tag of a package blob
pub const PAYLOAD_PACKAGE: u8 = 2;

/// Type flag: `T?`
pub const TYPE_NULLABLE: u8 = 0x01;
/// Type flag: a flexible upper bound follows
pub const TYPE_HAS_FLEXIBLE_UPPER: u8 = 0x02;
/// Type flag: a flexible type id follows
pub const TYPE_HAS_FLEXIBLE_ID: u8 = 0x04;
/// Type flag: an outer type follows
pub const TYPE_HAS_OUTER: u8 = 0x08;
/// Type flag: raw type
pub const TYPE_RAW: u8 = 0x10;

/// Nesting limit for types inside types; deeper nesting only occurs in corrupted input.
const MAX_TYPE_DEPTH: usize = 64;

/// The decoded content of a blob.
#[derive(Debug)]
pub enum BlobPayload {
    /// A single class
    Class(Arc<ClassProto>),
    /// A package part and the classes it declares
    Package {
        /// Qualified-name index of the package, `None` for the root package
        fq_name: Option<u32>,
        /// Top-level declarations
        package: Arc<PackageProto>,
        /// Classes declared in the package part
        classes: Vec<Arc<ClassProto>>,
    },
}

/// A fully decoded metadata blob.
#[derive(Debug)]
pub struct MetadataBlob {
    /// Format version the blob was written with
    pub version: BinaryVersion,
    /// Name pools of the blob
    pub name_resolver: Arc<NameResolver>,
    /// Shared types of the blob
    pub type_table: Arc<TypeTable>,
    /// The messages
    pub payload: BlobPayload,
}

impl MetadataBlob {
    /// Decodes a blob.
    ///
    /// # Arguments
    ///
    /// * `data` - The raw blob bytes
    /// * `config` - Controls whether the version check is enforced
    ///
    /// # Errors
    ///
    /// - [`Error::Empty`] for empty input
    /// - [`Error::NotSupported`] if the magic does not match
    /// - [`Error::IncompatibleVersion`] for an unsupported format version
    /// - [`Error::Malformed`] / [`Error::OutOfBounds`] for corrupted content
    pub fn parse(data: &[u8], config: &ResolverConfig) -> Result<MetadataBlob> {
        if data.is_empty() {
            return Err(Error::Empty);
        }

        let mut parser = Parser::new(data);
        let version = read_header(&mut parser)?;
        if !version.is_compatible() && !config.skip_metadata_version_check {
            return Err(Error::IncompatibleVersion {
                expected: BinaryVersion::CURRENT,
                actual: version,
            });
        }

        let name_resolver = Arc::new(read_name_pools(&mut parser)?);

        let type_count = parser.read_count()?;
        let mut types = Vec::with_capacity(type_count);
        for _ in 0..type_count {
            types.push(read_type(&mut parser, 0)?);
        }
        let type_table = Arc::new(TypeTable::new(types));

        let payload = match parser.read_le::<u8>()? {
            PAYLOAD_CLASS => BlobPayload::Class(Arc::new(read_class(&mut parser)?)),
            PAYLOAD_PACKAGE => {
                let fq_name = read_optional_index(&mut parser)?;
                let package = Arc::new(read_package(&mut parser)?);
                let class_count = parser.read_count()?;
                let mut classes = Vec::with_capacity(class_count);
                for _ in 0..class_count {
                    classes.push(Arc::new(read_class(&mut parser)?));
                }
                BlobPayload::Package {
                    fq_name,
                    package,
                    classes,
                }
            }
            other => return Err(malformed_error!("Unknown blob payload tag {}", other)),
        };

        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after blob payload",
                parser.remaining()
            ));
        }

        Ok(MetadataBlob {
            version,
            name_resolver,
            type_table,
            payload,
        })
    }
}

/// Reads the magic and the version triple.
///
/// # Errors
/// Returns [`Error::NotSupported`] if the magic does not match.
pub fn read_header(parser: &mut Parser<'_>) -> Result<BinaryVersion> {
    let magic = parser.read_bytes(BLOB_MAGIC.len())?;
    if magic != BLOB_MAGIC {
        return Err(Error::NotSupported);
    }

    let major = parser.read_compressed_uint()?;
    let minor = parser.read_compressed_uint()?;
    let patch = parser.read_compressed_uint()?;
    Ok(BinaryVersion::new(major, minor, patch))
}

fn read_name_pools(parser: &mut Parser<'_>) -> Result<NameResolver> {
    let string_count = parser.read_count()?;
    let mut strings = Vec::with_capacity(string_count);
    for _ in 0..string_count {
        strings.push(parser.read_prefixed_string_utf8()?);
    }

    let qualified_count = parser.read_count()?;
    let mut qualified = Vec::with_capacity(qualified_count);
    for _ in 0..qualified_count {
        let parent = read_optional_index(parser)?;
        let short_name = parser.read_compressed_uint()?;
        let kind = match parser.read_le::<u8>()? {
            0 => QualifiedNameKind::Class,
            1 => QualifiedNameKind::Package,
            2 => QualifiedNameKind::Local,
            other => return Err(malformed_error!("Unknown qualified name kind {}", other)),
        };
        qualified.push(QualifiedName {
            parent,
            short_name,
            kind,
        });
    }

    Ok(NameResolver::new(strings, qualified))
}

fn read_optional_index(parser: &mut Parser<'_>) -> Result<Option<u32>> {
    Ok(match parser.read_compressed_uint()? {
        0 => None,
        value => Some(value - 1),
    })
}

fn read_type_ref(parser: &mut Parser<'_>, depth: usize) -> Result<TypeRef> {
    match parser.read_le::<u8>()? {
        0 => Ok(TypeRef::inline(read_type(parser, depth + 1)?)),
        1 => Ok(TypeRef::Table(parser.read_compressed_uint()?)),
        other => Err(malformed_error!("Unknown type reference tag {}", other)),
    }
}

fn read_optional_type_ref(parser: &mut Parser<'_>, depth: usize) -> Result<Option<TypeRef>> {
    if parser.read_bool()? {
        Ok(Some(read_type_ref(parser, depth)?))
    } else {
        Ok(None)
    }
}

fn read_type(parser: &mut Parser<'_>, depth: usize) -> Result<TypeProto> {
    if depth > MAX_TYPE_DEPTH {
        return Err(malformed_error!(
            "Type nesting exceeds {} levels at offset {}",
            MAX_TYPE_DEPTH,
            parser.pos()
        ));
    }

    let flags = parser.read_le::<u8>()?;
    let classifier = match parser.read_le::<u8>()? {
        0 => TypeClassifier::Class(parser.read_compressed_uint()?),
        1 => TypeClassifier::TypeParameter(parser.read_compressed_uint()?),
        2 => TypeClassifier::TypeParameterName(parser.read_compressed_uint()?),
        other => return Err(malformed_error!("Unknown type classifier tag {}", other)),
    };

    let argument_count = parser.read_count()?;
    let mut arguments = Vec::with_capacity(argument_count);
    for _ in 0..argument_count {
        let projection = match parser.read_le::<u8>()? {
            0 => ProjectionKind::In,
            1 => ProjectionKind::Out,
            2 => ProjectionKind::Inv,
            3 => ProjectionKind::Star,
            other => return Err(malformed_error!("Unknown projection kind {}", other)),
        };
        let ty = if projection == ProjectionKind::Star {
            None
        } else {
            Some(read_type_ref(parser, depth)?)
        };
        arguments.push(ArgumentProto { projection, ty });
    }

    let flexible_type_id = if flags & TYPE_HAS_FLEXIBLE_ID != 0 {
        Some(parser.read_compressed_uint()?)
    } else {
        None
    };
    let flexible_upper_bound = if flags & TYPE_HAS_FLEXIBLE_UPPER != 0 {
        Some(read_type_ref(parser, depth)?)
    } else {
        None
    };
    let outer_type = if flags & TYPE_HAS_OUTER != 0 {
        Some(read_type_ref(parser, depth)?)
    } else {
        None
    };

    Ok(TypeProto {
        classifier,
        arguments,
        nullable: flags & TYPE_NULLABLE != 0,
        flexible_upper_bound,
        flexible_type_id,
        outer_type,
        raw: flags & TYPE_RAW != 0,
    })
}

fn read_type_parameters(parser: &mut Parser<'_>) -> Result<Vec<TypeParameterProto>> {
    let count = parser.read_count()?;
    let mut type_parameters = Vec::with_capacity(count);
    for _ in 0..count {
        let id = parser.read_compressed_uint()?;
        let name = parser.read_compressed_uint()?;
        let reified = parser.read_bool()?;
        let variance = match parser.read_le::<u8>()? {
            0 => VarianceProto::In,
            1 => VarianceProto::Out,
            2 => VarianceProto::Inv,
            other => return Err(malformed_error!("Unknown variance {}", other)),
        };
        let bound_count = parser.read_count()?;
        let mut upper_bounds = Vec::with_capacity(bound_count);
        for _ in 0..bound_count {
            upper_bounds.push(read_type_ref(parser, 0)?);
        }
        type_parameters.push(TypeParameterProto {
            id,
            name,
            reified,
            variance,
            upper_bounds,
        });
    }
    Ok(type_parameters)
}

fn read_value_parameters(parser: &mut Parser<'_>) -> Result<Vec<ValueParameterProto>> {
    let count = parser.read_count()?;
    let mut value_parameters = Vec::with_capacity(count);
    for _ in 0..count {
        let flags = parser.read_compressed_uint()?;
        let name = parser.read_compressed_uint()?;
        let ty = read_type_ref(parser, 0)?;
        let vararg_element_type = read_optional_type_ref(parser, 0)?;
        value_parameters.push(ValueParameterProto {
            flags,
            name,
            ty,
            vararg_element_type,
        });
    }
    Ok(value_parameters)
}

fn read_function(parser: &mut Parser<'_>) -> Result<FunctionProto> {
    let flags = parser.read_compressed_uint()?;
    let name = parser.read_compressed_uint()?;
    let type_parameters = read_type_parameters(parser)?;
    let receiver_type = read_optional_type_ref(parser, 0)?;
    let value_parameters = read_value_parameters(parser)?;
    let return_type = read_type_ref(parser, 0)?;
    Ok(FunctionProto {
        flags,
        name,
        type_parameters,
        receiver_type,
        value_parameters,
        return_type,
    })
}

fn read_property(parser: &mut Parser<'_>) -> Result<PropertyProto> {
    let flags = parser.read_compressed_uint()?;
    let name = parser.read_compressed_uint()?;
    let type_parameters = read_type_parameters(parser)?;
    let receiver_type = read_optional_type_ref(parser, 0)?;
    let return_type = read_type_ref(parser, 0)?;
    Ok(PropertyProto {
        flags,
        name,
        type_parameters,
        receiver_type,
        return_type,
    })
}

fn read_functions_and_properties(
    parser: &mut Parser<'_>,
) -> Result<(Vec<FunctionProto>, Vec<PropertyProto>)> {
    let function_count = parser.read_count()?;
    let mut functions = Vec::with_capacity(function_count);
    for _ in 0..function_count {
        functions.push(read_function(parser)?);
    }

    let property_count = parser.read_count()?;
    let mut properties = Vec::with_capacity(property_count);
    for _ in 0..property_count {
        properties.push(read_property(parser)?);
    }
    Ok((functions, properties))
}

fn read_indices(parser: &mut Parser<'_>) -> Result<Vec<u32>> {
    let count = parser.read_count()?;
    let mut indices = Vec::with_capacity(count);
    for _ in 0..count {
        indices.push(parser.read_compressed_uint()?);
    }
    Ok(indices)
}

fn read_class(parser: &mut Parser<'_>) -> Result<ClassProto> {
    let flags = parser.read_compressed_uint()?;
    let fq_name = parser.read_compressed_uint()?;
    let companion_object_name = if parser.read_bool()? {
        Some(parser.read_compressed_uint()?)
    } else {
        None
    };
    let type_parameters = read_type_parameters(parser)?;

    let supertype_count = parser.read_count()?;
    let mut supertypes = Vec::with_capacity(supertype_count);
    for _ in 0..supertype_count {
        supertypes.push(read_type_ref(parser, 0)?);
    }

    let nested_class_names = read_indices(parser)?;

    let constructor_count = parser.read_count()?;
    let mut constructors = Vec::with_capacity(constructor_count);
    for _ in 0..constructor_count {
        let flags = parser.read_compressed_uint()?;
        let value_parameters = read_value_parameters(parser)?;
        constructors.push(ConstructorProto {
            flags,
            value_parameters,
        });
    }

    let (functions, properties) = read_functions_and_properties(parser)?;
    let enum_entries = read_indices(parser)?;

    Ok(ClassProto {
        flags,
        fq_name,
        companion_object_name,
        type_parameters,
        supertypes,
        nested_class_names,
        constructors,
        functions,
        properties,
        enum_entries,
    })
}

fn read_package(parser: &mut Parser<'_>) -> Result<PackageProto> {
    let (functions, properties) = read_functions_and_properties(parser)?;
    Ok(PackageProto {
        functions,
        properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::flags::{class_flags, ClassKind, Modality, Visibility},
        names::ClassId,
        test::BlobEncoder,
    };

    fn sample_class() -> (BlobEncoder, ClassProto) {
        let mut encoder = BlobEncoder::new();
        let fq_name = encoder.names.class_id(&ClassId::top_level("a.b", "Sample"));
        let any = encoder.names.class_id(&ClassId::top_level("kotlin", "Any"));
        let any_index = encoder.add_type(TypeProto::class(any));
        let f = encoder.names.string("f");

        let class = ClassProto {
            flags: class_flags(Visibility::Public, Modality::Open, ClassKind::Class),
            fq_name,
            companion_object_name: None,
            type_parameters: Vec::new(),
            supertypes: vec![TypeRef::Table(any_index)],
            nested_class_names: Vec::new(),
            constructors: Vec::new(),
            functions: vec![FunctionProto {
                flags: 0,
                name: f,
                type_parameters: Vec::new(),
                receiver_type: None,
                value_parameters: Vec::new(),
                return_type: TypeRef::inline(TypeProto::class(any).with_nullable(true)),
            }],
            properties: Vec::new(),
            enum_entries: Vec::new(),
        };
        (encoder, class)
    }

    #[test]
    fn test_decode_class_blob() {
        let (encoder, class) = sample_class();
        let bytes = encoder.encode_class(&class);

        let blob = MetadataBlob::parse(&bytes, &ResolverConfig::default()).unwrap();
        assert_eq!(blob.version, BinaryVersion::CURRENT);
        assert_eq!(blob.type_table.len(), 1);
        match blob.payload {
            BlobPayload::Class(decoded) => assert_eq!(*decoded, class),
            BlobPayload::Package { .. } => panic!("expected a class payload"),
        }
    }

    #[test]
    fn test_incompatible_version_is_rejected_first() {
        // Magic and a future major version, followed by garbage that would not decode.
        let bytes = [b'K', b'M', b'E', b'T', 9, 0, 0, 0xFF, 0xFF];

        let result = MetadataBlob::parse(&bytes, &ResolverConfig::default());
        match result {
            Err(Error::IncompatibleVersion { expected, actual }) => {
                assert_eq!(expected, BinaryVersion::CURRENT);
                assert_eq!(actual, BinaryVersion::new(9, 0, 0));
            }
            other => panic!("expected IncompatibleVersion, got {other:?}"),
        }

        // Skipping the check reaches the (broken) pools instead.
        let result = MetadataBlob::parse(&bytes, &ResolverConfig::permissive());
        assert!(matches!(
            result,
            Err(Error::Malformed { .. }) | Err(Error::OutOfBounds)
        ));
    }

    #[test]
    fn test_skip_version_check_decodes_newer_minor() {
        let (mut encoder, class) = sample_class();
        encoder.version = BinaryVersion::new(1, 7, 0);
        let bytes = encoder.encode_class(&class);

        assert!(matches!(
            MetadataBlob::parse(&bytes, &ResolverConfig::default()),
            Err(Error::IncompatibleVersion { .. })
        ));
        let blob = MetadataBlob::parse(&bytes, &ResolverConfig::permissive()).unwrap();
        assert_eq!(blob.version, BinaryVersion::new(1, 7, 0));
    }

    #[test]
    fn test_bad_magic_and_empty() {
        assert!(matches!(
            MetadataBlob::parse(b"MZ\x90\x00", &ResolverConfig::default()),
            Err(Error::NotSupported)
        ));
        assert!(matches!(
            MetadataBlob::parse(&[], &ResolverConfig::default()),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn test_truncated_blob() {
        let (encoder, class) = sample_class();
        let bytes = encoder.encode_class(&class);

        for len in 4..bytes.len() {
            assert!(
                MetadataBlob::parse(&bytes[..len], &ResolverConfig::default()).is_err(),
                "prefix of {len} bytes decoded"
            );
        }
    }

    #[test]
    fn test_decode_package_blob() {
        let (mut encoder, class) = sample_class();
        let g = encoder.names.string("g");
        let package = PackageProto {
            functions: vec![FunctionProto {
                flags: 0,
                name: g,
                type_parameters: Vec::new(),
                receiver_type: None,
                value_parameters: Vec::new(),
                return_type: TypeRef::Table(0),
            }],
            properties: Vec::new(),
        };
        let package_index = encoder.names.package(&crate::names::FqName::new("a.b"));
        let bytes = encoder.encode_package(package_index, &package, std::slice::from_ref(&class));

        let blob = MetadataBlob::parse(&bytes, &ResolverConfig::default()).unwrap();
        match blob.payload {
            BlobPayload::Package {
                fq_name,
                package: decoded,
                classes,
            } => {
                assert_eq!(fq_name, package_index);
                assert_eq!(*decoded, package);
                assert_eq!(classes.len(), 1);
                assert_eq!(*classes[0], class);
            }
            BlobPayload::Class(_) => panic!("expected a package payload"),
        }
    }
}
