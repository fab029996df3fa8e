use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::authz::errors::AuthzError;
use crate::authz::policy::parse_kdl_document;
use crate::authz::predicate::ConditionPredicate;
use crate::authz::types::*;

/// Load a policy from a single `.kdl` file, or from every `.kdl` file in a
/// directory, and compile the result into one immutable `PolicyDocument`.
pub fn load_policies(path: &Path) -> Result<PolicyDocument, AuthzError> {
    let files = policy_files(path)?;

    let mut all_parsed = Vec::with_capacity(files.len());
    for file in &files {
        let contents =
            std::fs::read_to_string(file).map_err(|source| AuthzError::PolicyLoadError {
                path: file.display().to_string(),
                source,
            })?;
        all_parsed.push(parse_kdl_document(&contents)?);
    }

    let doc = compile_policies(all_parsed)?;

    tracing::info!(
        files = files.len(),
        verbs = doc.verb_count(),
        roles = doc.role_count(),
        "Loaded authorization policies"
    );

    Ok(doc)
}

fn policy_files(path: &Path) -> Result<Vec<PathBuf>, AuthzError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(AuthzError::InvalidPolicy(format!(
            "policy path `{}` is neither a file nor a directory",
            path.display()
        )));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map(|ext| ext == "kdl").unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

/// Merge and compile parsed policies. Later definitions of a verb or role
/// replace earlier ones.
pub fn compile_policies(parsed: Vec<ParsedPolicy>) -> Result<PolicyDocument, AuthzError> {
    let mut doc = PolicyDocument::new();

    for p in parsed {
        for verb in p.verbs {
            let name = verb.name.clone();
            if doc.insert_verb(&name, compile_verb(verb)?).is_some() {
                tracing::debug!(verb = %name, "verb redefined, later definition wins");
            }
        }
        for role in p.roles {
            let definition = RoleDefinition::new()
                .with_privileges(role.privileges)
                .with_includes(&role.includes);
            if doc.insert_role(&role.name, definition).is_some() {
                tracing::debug!(role = %role.name, "role redefined, later definition wins");
            }
        }
    }

    warn_on_role_graph_issues(&doc);

    Ok(doc)
}

fn compile_verb(def: VerbDef) -> Result<VerbRule, AuthzError> {
    let mut rule = VerbRule::new();

    for role in &def.deny {
        rule = rule.with_deny(role);
    }
    for role in &def.allow {
        rule = rule.with_allow(role);
    }
    for (role, condition) in &def.when {
        rule = rule.with_predicate(role, ConditionPredicate::compile(condition)?);
    }
    if let Some(condition) = &def.custom {
        rule = rule.with_custom(ConditionPredicate::compile(condition)?);
    }
    if let Some(title) = def.title {
        rule = rule.with_title(title);
    }
    if let Some(description) = def.description {
        rule = rule.with_description(description);
    }
    for (role, description) in def.role_descriptions {
        rule = rule.with_role_description(&role, description);
    }

    Ok(rule)
}

/// Cyclic and dangling includes are legal; the resolver tolerates both.
/// They are reported so that policy authors notice unintended structure.
fn warn_on_role_graph_issues(doc: &PolicyDocument) {
    for (name, role) in doc.roles() {
        for included in role.includes() {
            if doc.role(included).is_none() {
                tracing::warn!(role = %name, include = %included, "role includes an undefined role");
            }
        }
    }

    let mut names: Vec<&str> = doc.role_names().collect();
    names.sort_unstable();

    let mut visited: HashSet<String> = HashSet::new();
    let mut in_stack: HashSet<String> = HashSet::new();
    for name in names {
        if !visited.contains(name) {
            if let Some((from, to)) = find_cycle(name, doc, &mut visited, &mut in_stack) {
                tracing::warn!(%from, %to, "cyclic role inclusion");
            }
        }
    }
}

/// DFS returning the first back edge found below `name`.
fn find_cycle(
    name: &str,
    doc: &PolicyDocument,
    visited: &mut HashSet<String>,
    in_stack: &mut HashSet<String>,
) -> Option<(String, String)> {
    visited.insert(name.to_string());
    in_stack.insert(name.to_string());

    let mut cycle = None;
    if let Some(role) = doc.role(name) {
        for included in role.includes() {
            if in_stack.contains(included) {
                cycle = Some((name.to_string(), included.clone()));
                break;
            }
            if !visited.contains(included) {
                cycle = find_cycle(included, doc, visited, in_stack);
                if cycle.is_some() {
                    break;
                }
            }
        }
    }

    in_stack.remove(name);
    cycle
}

/// Lists, per role, the roles it reaches through `includes` (itself excluded).
/// Used by `authority validate` to summarize the inclusion graph.
pub fn inclusion_closure(doc: &PolicyDocument) -> HashMap<String, Vec<String>> {
    doc.role_names()
        .map(|name| {
            let mut seen = HashSet::from([name.to_string()]);
            let mut stack: Vec<String> = vec![name.to_string()];
            let mut reached = Vec::new();
            while let Some(current) = stack.pop() {
                let Some(role) = doc.role(&current) else {
                    continue;
                };
                for included in role.includes() {
                    if seen.insert(included.clone()) {
                        reached.push(included.clone());
                        stack.push(included.clone());
                    }
                }
            }
            reached.sort();
            (name.to_string(), reached)
        })
        .collect()
}
