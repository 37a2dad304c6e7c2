//! B+ tree index pages.

mod internal;
mod key;
mod types;

pub use internal::InternalNode;
pub use key::{GenericKey, Key16, Key32, Key4, Key64, Key8};
pub use types::IndexPageHeader;
