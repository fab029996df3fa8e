//! Privilege resolution over a read-only `PolicyDocument`.
//!
//! Every lookup fails closed: an unknown verb, role, predicate, title or
//! description yields `false`, an empty string or an empty list.

use std::collections::HashSet;

use serde_json::Value;

use crate::authz::session::{Session, SessionView};
use crate::authz::types::{normalize, PolicyDocument, Verdict};

#[derive(Debug, Clone, Copy)]
pub struct PrivilegeResolver<'a> {
    doc: &'a PolicyDocument,
}

impl<'a> PrivilegeResolver<'a> {
    pub fn new(doc: &'a PolicyDocument) -> Self {
        Self { doc }
    }

    /// Check whether `role` may perform `verb`, optionally against `subject`.
    ///
    /// Precedence: deny list, then allow list, then the role's own predicate,
    /// then the verb's custom predicate. A missing role (no session), a
    /// missing verb, a missing predicate and an abstaining predicate all
    /// resolve to `false`.
    pub fn can(&self, verb: &str, role: Option<&str>, subject: Option<&Value>) -> bool {
        let Some(role) = role else {
            tracing::trace!(verb, "no role supplied, denying");
            return false;
        };
        let role = normalize(role);

        let Some(rule) = self.doc.verb(verb) else {
            tracing::trace!(verb, role = %role, "unknown verb, denying");
            return false;
        };

        // deny is consulted first and short-circuits an allow entry for the same role
        if rule.denies(&role) {
            tracing::trace!(verb, role = %role, "denied by deny list");
            return false;
        }
        if rule.allows(&role) {
            tracing::trace!(verb, role = %role, "allowed by allow list");
            return true;
        }

        let verdict = rule
            .predicate_for(&role)
            .map(|p| p.evaluate(subject))
            .unwrap_or(Verdict::Deny);
        tracing::trace!(verb, role = %role, ?verdict, "resolved by predicate");
        verdict.is_allowed()
    }

    /// Short human-readable label of a verb.
    pub fn title(&self, verb: &str) -> &'a str {
        self.doc.verb(verb).and_then(|r| r.title()).unwrap_or("")
    }

    /// The role-specific description of `verb` if one exists, otherwise the default.
    pub fn describe(&self, verb: &str, role: Option<&str>) -> &'a str {
        let Some(rule) = self.doc.verb(verb) else {
            return "";
        };
        role.and_then(|r| rule.role_description(&normalize(r)))
            .or_else(|| rule.description())
            .unwrap_or("")
    }

    /// Privileges listed by `role` and every role it transitively includes,
    /// deduplicated, in first-seen order.
    ///
    /// This is a declarative listing only. It does not consult verb rules, so
    /// a listed privilege does not imply that `can` allows it, nor the reverse.
    /// A missing role (no session) has no privileges.
    pub fn effective_privileges(&self, role: Option<&str>) -> Vec<String> {
        self.effective_privileges_skipping(role, &[])
    }

    /// Like `effective_privileges`, but never expands the roles in `skip`.
    pub fn effective_privileges_skipping(&self, role: Option<&str>, skip: &[&str]) -> Vec<String> {
        let Some(role) = role else {
            return Vec::new();
        };
        let mut visited: HashSet<String> = skip.iter().map(|r| normalize(r)).collect();
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        self.collect_privileges(&normalize(role), &mut visited, &mut seen, &mut result);
        result
    }

    /// Each role is expanded at most once per call, which bounds the walk on
    /// cyclic inclusion graphs.
    fn collect_privileges(
        &self,
        role: &str,
        visited: &mut HashSet<String>,
        seen: &mut HashSet<String>,
        result: &mut Vec<String>,
    ) {
        visited.insert(role.to_string());

        let Some(definition) = self.doc.role(role) else {
            return;
        };

        for privilege in definition.privileges() {
            if seen.insert(privilege.clone()) {
                result.push(privilege.clone());
            }
        }

        for included in definition.includes() {
            if visited.contains(included) {
                continue;
            }
            self.collect_privileges(included, visited, seen, result);
        }
    }

    /// Bind this resolver to a session's acting role.
    pub fn for_session(&self, session: &'a Session) -> SessionView<'a> {
        SessionView::new(*self, session)
    }
}
