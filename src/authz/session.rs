use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::authz::engine::PrivilegeResolver;

/// The acting principal's role as resolved by the host, or none when
/// nobody is authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    role: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { role: None }
    }

    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
        }
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.role.is_some()
    }
}

/// A resolver bound to one session, so callers do not repeat the role.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    resolver: PrivilegeResolver<'a>,
    session: &'a Session,
}

impl<'a> SessionView<'a> {
    pub fn new(resolver: PrivilegeResolver<'a>, session: &'a Session) -> Self {
        Self { resolver, session }
    }

    pub fn can(&self, verb: &str, subject: Option<&Value>) -> bool {
        self.resolver.can(verb, self.session.role(), subject)
    }

    pub fn describe(&self, verb: &str) -> &'a str {
        self.resolver.describe(verb, self.session.role())
    }

    pub fn title(&self, verb: &str) -> &'a str {
        self.resolver.title(verb)
    }

    /// Empty for anonymous sessions.
    pub fn privileges(&self) -> Vec<String> {
        self.resolver.effective_privileges(self.session.role())
    }
}
