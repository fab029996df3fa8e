use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use authority::authz::loader::{inclusion_closure, load_policies};
use authority::errors::AuthorityError;
use authority::settings::Settings;
use authority::PrivilegeResolver;
use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "authority",
    version,
    about = "Role-based privilege resolution"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "authority.toml")]
    config: String,

    /// Policy file or directory, overriding the configured one
    #[arg(short, long)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a role may perform a verb. Exits 1 when denied.
    Check {
        verb: String,
        /// Acting role; omit to check as an unauthenticated caller
        #[arg(short, long)]
        role: Option<String>,
        /// JSON document describing the object the verb targets
        #[arg(short, long)]
        subject: Option<String>,
    },
    /// Print the title of a verb
    Title { verb: String },
    /// Print the description of a verb, as seen by a role
    Describe {
        verb: String,
        #[arg(short, long)]
        role: Option<String>,
    },
    /// List the effective privileges of a role
    Privileges {
        role: String,
        /// Roles whose privileges are not expanded
        #[arg(long)]
        skip: Vec<String>,
    },
    /// Load the policy and print a summary
    Validate,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;

    // logging, on stderr so command output stays parseable
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(?settings, "Loaded configuration");

    let policy_path = cli.policy.unwrap_or(settings.policy.path);
    Ok(run(cli.command, &policy_path)?)
}

fn run(command: Command, policy_path: &std::path::Path) -> Result<ExitCode, AuthorityError> {
    let doc = load_policies(policy_path)?;
    let resolver = PrivilegeResolver::new(&doc);
    let mut out = std::io::stdout().lock();

    match command {
        Command::Check {
            verb,
            role,
            subject,
        } => {
            let subject: Option<serde_json::Value> =
                subject.as_deref().map(serde_json::from_str).transpose()?;
            let allowed = resolver.can(&verb, role.as_deref(), subject.as_ref());
            writeln!(out, "{}", if allowed { "allowed" } else { "denied" })?;
            return Ok(if allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Command::Title { verb } => {
            writeln!(out, "{}", resolver.title(&verb))?;
        }
        Command::Describe { verb, role } => {
            writeln!(out, "{}", resolver.describe(&verb, role.as_deref()))?;
        }
        Command::Privileges { role, skip } => {
            let skip: Vec<&str> = skip.iter().map(String::as_str).collect();
            for privilege in resolver.effective_privileges_skipping(Some(&role), &skip) {
                writeln!(out, "{privilege}")?;
            }
        }
        Command::Validate => {
            let mut verbs: Vec<&str> = doc.verb_names().collect();
            verbs.sort_unstable();
            writeln!(out, "{} verbs, {} roles", doc.verb_count(), doc.role_count())?;
            for verb in verbs {
                writeln!(out, "verb {verb}: {}", resolver.title(verb))?;
            }
            let mut closure: Vec<_> = inclusion_closure(&doc).into_iter().collect();
            closure.sort();
            for (role, reached) in closure {
                writeln!(out, "role {role}: includes [{}]", reached.join(", "))?;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
