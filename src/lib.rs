//! Authority - role-based privilege resolution
//!
//! Answers "may this role perform this verb, optionally against this
//! object?" from a declarative policy of verbs (deny/allow lists and
//! predicates) and roles (privilege listings and role inclusion).
//!
//! The resolver in [`authz::engine`] is pure: it reads an immutable
//! [`authz::PolicyDocument`] and never fails. Loading, reloading and the
//! CLI live around it.

pub mod authz;
pub mod errors;
pub mod settings;

pub use authz::{
    PolicyDocument, PolicyStore, Predicate, PrivilegeResolver, RoleDefinition, Session,
    SharedPolicy, Verdict, VerbRule,
};
