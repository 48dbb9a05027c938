//! Turning metadata messages into descriptors.
//!
//! Deserialization is demand driven. A class is created from its message when it is first
//! looked up; its supertypes, members, constructors and enum entries are each deserialized
//! when first asked for, and every type is resolved only when inspected. Each step reads the
//! message through a [`DeserializationContext`] that knows the message's name pools, type
//! table and enclosing declarations.
//!
//! # Key Components
//!
//! - [`DeserializationContext`] - Name pools, type table and type parameter scope
//! - [`types`] - Lazy type deserialization and resolution
//! - [`MemberDeserializer`] - Functions, properties, constructors
//! - [`DeserializedClass`] / [`EnumEntryClass`] - Class descriptors
//! - [`NotFoundClasses`] - Placeholders for classes that can not be located
//! - [`AdditionalSupertypes`] - Injected supertypes

pub mod class;
pub mod context;
pub mod enumentry;
pub mod members;
pub mod notfound;
pub mod supertypes;
pub mod types;

pub use class::DeserializedClass;
pub use context::DeserializationContext;
pub use enumentry::EnumEntryClass;
pub use members::MemberDeserializer;
pub use notfound::{ClassRequest, NotFoundClass, NotFoundClasses};
pub use supertypes::{AdditionalSupertypes, NoAdditionalSupertypes, SerializableMarker};
