#![allow(dead_code)]

pub mod builders;
pub mod fixtures;

pub use builders::{RoleBuilder, VerbBuilder};
pub use fixtures::PolicyDir;
