//! Import source selection.

mod descriptor;
mod selector;

pub use descriptor::{SourceDescriptor, SourceKind};
pub use selector::{SourceSelector, is_full_column_set};
