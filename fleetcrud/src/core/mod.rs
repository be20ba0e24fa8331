// Core traits and the request scope every operation runs under

pub mod scope;
pub mod traits;

pub use scope::Scope;
pub use traits::{CRUDResource, MergeIntoActiveModel};
