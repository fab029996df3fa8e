use crate::authz::errors::AuthzError;
use crate::authz::types::*;
use kdl::{KdlDocument, KdlNode};

/// Parse a KDL document string into typed policy structs.
///
/// Names are kept as written; case folding happens when the parsed
/// policies are compiled.
pub fn parse_kdl_document(source: &str) -> Result<ParsedPolicy, AuthzError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| AuthzError::KdlParse(e.to_string()))?;

    let mut policy = ParsedPolicy::default();

    for node in doc.nodes() {
        match node.name().value() {
            "verb" => policy.verbs.push(parse_verb(node)?),
            "role" => policy.roles.push(parse_role(node)?),
            other => {
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(policy)
}

fn parse_verb(node: &KdlNode) -> Result<VerbDef, AuthzError> {
    let name = first_string_arg(node).ok_or_else(|| {
        AuthzError::InvalidPolicy(
            "verb node requires a string argument (e.g. verb \"edit\")".into(),
        )
    })?;

    let mut verb = VerbDef {
        name,
        ..Default::default()
    };

    let Some(children) = node.children() else {
        return Ok(verb);
    };

    for child in children.nodes() {
        match child.name().value() {
            "title" => {
                verb.title = Some(required_arg(child, &verb.name, "title \"Edit article\"")?);
            }
            "description" => {
                let text = required_arg(child, &verb.name, "description \"Modify an article\"")?;
                match child.get("role").and_then(|v| v.as_string()) {
                    Some(role) => verb.role_descriptions.push((role.to_string(), text)),
                    None => verb.description = Some(text),
                }
            }
            "allow" => verb.allow = dash_list(child, &format!("verb `{}`", verb.name))?,
            "deny" => verb.deny = dash_list(child, &format!("verb `{}`", verb.name))?,
            "when" => {
                let args = string_args(child);
                let [role, condition] = args.as_slice() else {
                    return Err(AuthzError::InvalidPolicy(format!(
                        "`when` in verb `{}` takes a role and a condition (e.g. when \"author\" \"subject.draft == true\")",
                        verb.name
                    )));
                };
                verb.when.push((role.clone(), condition.clone()));
            }
            "custom" => {
                verb.custom = Some(required_arg(child, &verb.name, "custom \"subject.public == true\"")?);
            }
            other => {
                return Err(AuthzError::InvalidPolicy(format!(
                    "unexpected child `{other}` in verb `{}` (expected `title`, `description`, `allow`, `deny`, `when` or `custom`)",
                    verb.name
                )));
            }
        }
    }

    Ok(verb)
}

fn parse_role(node: &KdlNode) -> Result<RoleDef, AuthzError> {
    let name = first_string_arg(node).ok_or_else(|| {
        AuthzError::InvalidPolicy(
            "role node requires a string argument (e.g. role \"editor\")".into(),
        )
    })?;

    let mut privileges = Vec::new();
    let mut includes = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "privileges" => privileges = dash_list(child, &format!("role `{name}`"))?,
                "includes" => includes = dash_list(child, &format!("role `{name}`"))?,
                other => {
                    return Err(AuthzError::InvalidPolicy(format!(
                        "unexpected child `{other}` in role `{name}` (expected `privileges` or `includes`)"
                    )));
                }
            }
        }
    }

    Ok(RoleDef {
        name,
        privileges,
        includes,
    })
}

/// All positional string arguments of a node, in order.
fn string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn first_string_arg(node: &KdlNode) -> Option<String> {
    string_args(node).into_iter().next()
}

fn required_arg(node: &KdlNode, verb: &str, example: &str) -> Result<String, AuthzError> {
    first_string_arg(node).ok_or_else(|| {
        AuthzError::InvalidPolicy(format!(
            "`{}` in verb `{verb}` requires a string argument (e.g. {example})",
            node.name().value()
        ))
    })
}

/// Extract dash-list children: nodes named "-" with exactly one string argument.
/// Example KDL:
/// ```kdl
/// allow {
///     - "editor"
///     - "admin"
/// }
/// ```
/// Any other shape is an error.
fn dash_list(node: &KdlNode, owner: &str) -> Result<Vec<String>, AuthzError> {
    let list = node.name().value();
    if !node.entries().is_empty() {
        return Err(AuthzError::InvalidPolicy(format!(
            "`{list}` in {owner} takes its entries as children (e.g. {list} {{ - \"name\" }}), not inline arguments"
        )));
    }

    let Some(children) = node.children() else {
        return Ok(Vec::new());
    };

    children
        .nodes()
        .iter()
        .map(|item| {
            let entry = match item.entries() {
                [entry] if item.name().value() == "-" && item.children().is_none() => entry,
                _ => {
                    return Err(AuthzError::InvalidPolicy(format!(
                        "`{list}` in {owner} may only contain `- \"name\"` entries, found `{}`",
                        item.to_string().trim()
                    )))
                }
            };
            match (entry.name(), entry.value().as_string()) {
                (None, Some(value)) => Ok(value.to_string()),
                _ => Err(AuthzError::InvalidPolicy(format!(
                    "`{list}` entry in {owner} must be a string, found `{}`",
                    item.to_string().trim()
                ))),
            }
        })
        .collect()
}
