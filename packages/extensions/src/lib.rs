//! # Charon Extensions
//!
//! The contract between Charon (the host content-management application) and
//! the editor widgets that plug into it.
//!
//! The host owns documents and their schemas. Extensions see them through:
//!
//! - **Controls**: typed read/write access to a document value, with
//!   [`EmitOptions`] deciding whether a write notifies listeners
//! - **Reactive events**: a synchronous [`EventBus`] with explicit
//!   [`Subscription`] handles
//! - **Metadata**: [`Schema`]/[`SchemaProperty`] reflection, identifier
//!   conversion and display-text formatting
//! - **Specification dictionaries**: the free-form `key=value&...` annotation
//!   string every document and property carries

mod controls;
mod errors;
mod metadata;
mod reactive;
mod specification;

pub use controls::{EmitOptions, ValueChange, ValueControl};
pub use errors::ControlError;
pub use metadata::{
    DataType, DocumentId, DocumentReference, Metadata, Schema, SchemaProperty, SchemaReference,
};
pub use reactive::{EventBus, Subscription};
pub use specification::SpecificationDictionary;
