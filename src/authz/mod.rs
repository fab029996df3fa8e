pub mod condition;
pub mod engine;
pub mod errors;
pub mod loader;
pub mod policy;
pub mod predicate;
pub mod session;
pub mod store;
pub mod types;

pub use engine::PrivilegeResolver;
pub use errors::AuthzError;
pub use predicate::{ConditionPredicate, Predicate};
pub use session::{Session, SessionView};
pub use store::{PolicyStore, SharedPolicy};
pub use types::{PolicyDocument, RoleDefinition, Verdict, VerbRule};
