//! ARM-specific building blocks: resource id parsing and template
//! expression construction.

pub mod expressions;
pub mod resource_id;

pub use resource_id::{ChildResource, ParsedResourceId};
