use miette::Diagnostic;
use thiserror::Error;

/// Failures raised while loading or compiling a policy document.
///
/// Resolution itself never fails; these only surface from the loader,
/// the parser and the condition compiler.
#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Failed to load policy file `{path}`")]
    #[diagnostic(
        code(authority::authz::policy_load),
        help("Check that the file exists and contains valid KDL syntax")
    )]
    PolicyLoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid policy: {0}")]
    #[diagnostic(
        code(authority::authz::invalid_policy),
        help("Each policy file must contain `verb` or `role` KDL nodes")
    )]
    InvalidPolicy(String),

    #[error("Invalid condition expression: {0}")]
    #[diagnostic(
        code(authority::authz::invalid_condition),
        help("Supported operators: ==, !=, >, <, >=, <=, &&, ||, !, in. Paths use dot notation (e.g. subject.owner)")
    )]
    InvalidCondition(String),

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(authority::authz::kdl_parse),
        help("Check your KDL file syntax, see https://kdl.dev for the specification")
    )]
    KdlParse(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(authority::authz::io))]
    Io(#[from] std::io::Error),
}
