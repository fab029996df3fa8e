use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::authz::predicate::Predicate;

/// Verb and role names are compared case-insensitively; every key is stored in this form.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// Outcome of evaluating a predicate against a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Allow,
    Deny,
    /// The predicate expresses no opinion.
    Abstain,
}

impl Verdict {
    /// Abstain resolves the same way as deny.
    pub fn is_allowed(self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

impl From<bool> for Verdict {
    fn from(value: bool) -> Self {
        if value {
            Verdict::Allow
        } else {
            Verdict::Deny
        }
    }
}

impl From<Option<bool>> for Verdict {
    fn from(value: Option<bool>) -> Self {
        value.map(Verdict::from).unwrap_or(Verdict::Abstain)
    }
}

// ---------- Policy domain types ----------

/// Rule set attached to a single verb.
#[derive(Clone, Default)]
pub struct VerbRule {
    deny: HashSet<String>,
    allow: HashSet<String>,
    per_role: HashMap<String, Arc<dyn Predicate>>,
    custom: Option<Arc<dyn Predicate>>,
    title: Option<String>,
    description: Option<String>,
    description_by_role: HashMap<String, String>,
}

impl VerbRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deny(mut self, role: &str) -> Self {
        self.deny.insert(normalize(role));
        self
    }

    pub fn with_allow(mut self, role: &str) -> Self {
        self.allow.insert(normalize(role));
        self
    }

    /// Predicate consulted for `role` when it is in neither list.
    pub fn with_predicate(mut self, role: &str, predicate: impl Predicate + 'static) -> Self {
        self.per_role.insert(normalize(role), Arc::new(predicate));
        self
    }

    /// Fallback predicate for roles without a predicate of their own.
    pub fn with_custom(mut self, predicate: impl Predicate + 'static) -> Self {
        self.custom = Some(Arc::new(predicate));
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_role_description(mut self, role: &str, description: impl Into<String>) -> Self {
        self.description_by_role
            .insert(normalize(role), description.into());
        self
    }

    /// `role` must already be normalized.
    pub fn denies(&self, role: &str) -> bool {
        self.deny.contains(role)
    }

    /// `role` must already be normalized.
    pub fn allows(&self, role: &str) -> bool {
        self.allow.contains(role)
    }

    /// Per-role predicate if present, otherwise the custom fallback.
    pub fn predicate_for(&self, role: &str) -> Option<&dyn Predicate> {
        self.per_role
            .get(role)
            .or(self.custom.as_ref())
            .map(|p| &**p)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn role_description(&self, role: &str) -> Option<&str> {
        self.description_by_role.get(role).map(|s| s.as_str())
    }
}

impl fmt::Debug for VerbRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut predicates: Vec<&String> = self.per_role.keys().collect();
        predicates.sort();
        f.debug_struct("VerbRule")
            .field("deny", &self.deny)
            .field("allow", &self.allow)
            .field("per_role", &predicates)
            .field("custom", &self.custom.is_some())
            .field("title", &self.title)
            .field("description", &self.description)
            .field("description_by_role", &self.description_by_role)
            .finish()
    }
}

/// Privileges a role lists directly, plus the roles it inherits from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDefinition {
    privileges: Vec<String>,
    /// Lower-cased role names, in declaration order
    includes: Vec<String>,
}

impl RoleDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_privilege(mut self, privilege: impl Into<String>) -> Self {
        self.privileges.push(privilege.into());
        self
    }

    pub fn with_privileges<I, S>(mut self, privileges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.privileges.extend(privileges.into_iter().map(Into::into));
        self
    }

    pub fn with_include(mut self, role: &str) -> Self {
        self.includes.push(normalize(role));
        self
    }

    pub fn with_includes<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.includes
            .extend(roles.into_iter().map(|r| normalize(r.as_ref())));
        self
    }

    pub fn privileges(&self) -> &[String] {
        &self.privileges
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }
}

/// Immutable policy snapshot consumed by the resolver.
#[derive(Debug, Clone, Default)]
pub struct PolicyDocument {
    /// verb name -> rule
    privileges_by_verb: HashMap<String, VerbRule>,
    /// role name -> definition
    roles_by_name: HashMap<String, RoleDefinition>,
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verb(mut self, verb: &str, rule: VerbRule) -> Self {
        self.insert_verb(verb, rule);
        self
    }

    pub fn with_role(mut self, role: &str, definition: RoleDefinition) -> Self {
        self.insert_role(role, definition);
        self
    }

    /// Returns the rule previously stored under the same verb.
    pub fn insert_verb(&mut self, verb: &str, rule: VerbRule) -> Option<VerbRule> {
        self.privileges_by_verb.insert(normalize(verb), rule)
    }

    /// Returns the definition previously stored under the same role.
    pub fn insert_role(&mut self, role: &str, definition: RoleDefinition) -> Option<RoleDefinition> {
        self.roles_by_name.insert(normalize(role), definition)
    }

    pub fn verb(&self, verb: &str) -> Option<&VerbRule> {
        self.privileges_by_verb.get(&normalize(verb))
    }

    pub fn role(&self, role: &str) -> Option<&RoleDefinition> {
        self.roles_by_name.get(&normalize(role))
    }

    pub fn verb_names(&self) -> impl Iterator<Item = &str> {
        self.privileges_by_verb.keys().map(|k| k.as_str())
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles_by_name.keys().map(|k| k.as_str())
    }

    pub fn roles(&self) -> impl Iterator<Item = (&str, &RoleDefinition)> {
        self.roles_by_name.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn verb_count(&self) -> usize {
        self.privileges_by_verb.len()
    }

    pub fn role_count(&self) -> usize {
        self.roles_by_name.len()
    }
}

// ---------- Parsed (uncompiled) policy ----------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerbDef {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// (role, description) overrides
    pub role_descriptions: Vec<(String, String)>,
    pub allow: Vec<String>,
    pub deny: Vec<String>,
    /// (role, condition source) per-role predicates
    pub when: Vec<(String, String)>,
    /// Fallback condition source
    pub custom: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleDef {
    pub name: String,
    pub privileges: Vec<String>,
    /// Other role names this role includes (inherits from)
    pub includes: Vec<String>,
}

/// Intermediate result from parsing a single KDL file.
#[derive(Debug, Clone, Default)]
pub struct ParsedPolicy {
    pub verbs: Vec<VerbDef>,
    pub roles: Vec<RoleDef>,
}
