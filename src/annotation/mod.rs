//! Annotation payloads exchanged with the measurement system.

mod export;
mod validate;

pub use export::{AnnotationBuilder, AnnotationData};
pub use validate::{validate, FormatIssue};
