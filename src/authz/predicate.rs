//! Predicates decide a verb for a role when neither the deny nor the allow
//! list mentions it.
//!
//! A predicate sees only the subject, the optional object the verb targets.
//! Hosts may supply closures; policy files supply condition expressions.

use serde_json::{json, Value};

use crate::authz::condition::{self, Expr};
use crate::authz::errors::AuthzError;
use crate::authz::types::Verdict;

pub trait Predicate: Send + Sync {
    fn evaluate(&self, subject: Option<&Value>) -> Verdict;
}

impl<F> Predicate for F
where
    F: Fn(Option<&Value>) -> Verdict + Send + Sync,
{
    fn evaluate(&self, subject: Option<&Value>) -> Verdict {
        self(subject)
    }
}

/// Constant verdict regardless of subject.
impl Predicate for Verdict {
    fn evaluate(&self, _subject: Option<&Value>) -> Verdict {
        *self
    }
}

/// A compiled condition expression, evaluated with the subject bound to `subject`.
#[derive(Debug, Clone)]
pub struct ConditionPredicate {
    source: String,
    expr: Expr,
}

impl ConditionPredicate {
    pub fn compile(source: &str) -> Result<Self, AuthzError> {
        let expr = condition::parse_condition(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Predicate for ConditionPredicate {
    fn evaluate(&self, subject: Option<&Value>) -> Verdict {
        let context = json!({ "subject": subject.cloned().unwrap_or(Value::Null) });
        match condition::evaluate(&self.expr, &context) {
            Ok(result) => Verdict::from(result),
            Err(e) => {
                tracing::debug!(condition = %self.source, error = %e, "condition abstained");
                Verdict::Abstain
            }
        }
    }
}
