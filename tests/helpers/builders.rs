/// Builder for `verb` KDL nodes
pub struct VerbBuilder {
    name: String,
    lines: Vec<String>,
}

impl VerbBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.lines.push(format!("title {}", quote(title)));
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.lines.push(format!("description {}", quote(text)));
        self
    }

    pub fn role_description(mut self, role: &str, text: &str) -> Self {
        self.lines
            .push(format!("description {} role={}", quote(text), quote(role)));
        self
    }

    pub fn allow(mut self, roles: &[&str]) -> Self {
        self.lines.push(dash_block("allow", roles));
        self
    }

    pub fn deny(mut self, roles: &[&str]) -> Self {
        self.lines.push(dash_block("deny", roles));
        self
    }

    pub fn when(mut self, role: &str, condition: &str) -> Self {
        self.lines
            .push(format!("when {} {}", quote(role), quote(condition)));
        self
    }

    pub fn custom(mut self, condition: &str) -> Self {
        self.lines.push(format!("custom {}", quote(condition)));
        self
    }

    pub fn build(self) -> String {
        node("verb", &self.name, &self.lines)
    }
}

/// Builder for `role` KDL nodes
pub struct RoleBuilder {
    name: String,
    lines: Vec<String>,
}

impl RoleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn privileges(mut self, privileges: &[&str]) -> Self {
        self.lines.push(dash_block("privileges", privileges));
        self
    }

    pub fn includes(mut self, roles: &[&str]) -> Self {
        self.lines.push(dash_block("includes", roles));
        self
    }

    pub fn build(self) -> String {
        node("role", &self.name, &self.lines)
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn dash_block(name: &str, items: &[&str]) -> String {
    let body: Vec<String> = items
        .iter()
        .map(|item| format!("        - {}", quote(item)))
        .collect();
    format!("{name} {{\n{}\n    }}", body.join("\n"))
}

fn node(kind: &str, name: &str, lines: &[String]) -> String {
    if lines.is_empty() {
        return format!("{kind} {}\n", quote(name));
    }
    let body: Vec<String> = lines.iter().map(|l| format!("    {l}")).collect();
    format!("{kind} {} {{\n{}\n}}\n", quote(name), body.join("\n"))
}
