use miette::Diagnostic;
use thiserror::Error;

use crate::authz::AuthzError;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthorityError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(authority::io))]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(authority::config),
        help("Check authority.toml and any AUTHORITY__* environment variables")
    )]
    Config(#[from] config::ConfigError),

    #[error("Invalid subject JSON: {0}")]
    #[diagnostic(
        code(authority::serde),
        help("Pass the subject as a JSON document, e.g. --subject '{{\"draft\": true}}'")
    )]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Authz(#[from] AuthzError),
}
