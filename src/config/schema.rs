use crate::finders::{
    derive_tags, method_call, rename_params, tag_loops, template, DeriveFromMethods, Finder,
    MethodCallFinder, RenameParameters, TagLoops, TemplateFinder,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RewriteConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RewriteConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            let rule_id = if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
                None
            } else {
                if !seen.insert(rule.id.as_str()) {
                    issues.push(ValidationIssue::DuplicateId {
                        rule_id: rule.id.clone(),
                    });
                }
                Some(rule.id.clone())
            };

            let missing = |field: &'static str| ValidationIssue::MissingField {
                rule_id: rule_id.clone(),
                field,
            };

            match &rule.finder {
                FinderSpec::MethodCall(f) => {
                    if f.receiver.trim().is_empty() {
                        issues.push(missing("finder.receiver"));
                    }
                    if f.method.trim().is_empty() {
                        issues.push(missing("finder.method"));
                    }
                }
                FinderSpec::RenameParameters(f) => {
                    if f.function.trim().is_empty() {
                        issues.push(missing("finder.function"));
                    }
                    if f.renames.is_empty() {
                        issues.push(missing("finder.renames"));
                    }
                    if f.renames.iter().any(|(from, to)| from.trim().is_empty() || to.trim().is_empty()) {
                        issues.push(ValidationIssue::InvalidCombo {
                            rule_id: rule_id.clone(),
                            message: "parameter renames must not be empty".to_string(),
                        });
                    }
                }
                FinderSpec::TagLoops(f) => {
                    if f.marker.trim().is_empty() {
                        issues.push(missing("finder.marker"));
                    }
                    if f.attribute.trim().is_empty() {
                        issues.push(missing("finder.attribute"));
                    }
                    if f.attribute.contains('\n') {
                        issues.push(ValidationIssue::InvalidCombo {
                            rule_id: rule_id.clone(),
                            message: "attribute must be a single line".to_string(),
                        });
                    }
                }
                FinderSpec::DeriveFromMethods(f) => {
                    if f.methods.is_empty() {
                        issues.push(missing("finder.methods"));
                    }
                    for tag in &f.methods {
                        if tag.method.trim().is_empty() {
                            issues.push(missing("finder.methods.method"));
                        }
                        if tag.derive.trim().is_empty() {
                            issues.push(missing("finder.methods.derive"));
                        }
                    }
                    if f.combined.as_deref().is_some_and(|c| c.trim().is_empty()) {
                        issues.push(missing("finder.combined"));
                    }
                }
                FinderSpec::Template(f) => {
                    if f.pattern.trim().is_empty() {
                        issues.push(missing("finder.pattern"));
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub id: String,
    pub finder: FinderSpec,
}

/// Which finder a rule runs, and its settings.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FinderSpec {
    MethodCall(MethodCallFinder),
    RenameParameters(RenameParameters),
    TagLoops(TagLoops),
    DeriveFromMethods(DeriveFromMethods),
    Template(TemplateFinder),
}

impl FinderSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            FinderSpec::MethodCall(_) => method_call::KIND,
            FinderSpec::RenameParameters(_) => rename_params::KIND,
            FinderSpec::TagLoops(_) => tag_loops::KIND,
            FinderSpec::DeriveFromMethods(_) => derive_tags::KIND,
            FinderSpec::Template(_) => template::KIND,
        }
    }

    pub fn into_finder(self) -> Box<dyn Finder> {
        match self {
            FinderSpec::MethodCall(f) => Box::new(f),
            FinderSpec::RenameParameters(f) => Box::new(f),
            FinderSpec::TagLoops(f) => Box::new(f),
            FinderSpec::DeriveFromMethods(f) => Box::new(f),
            FinderSpec::Template(f) => Box::new(f),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
    InvalidCombo {
        rule_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule file contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is used more than once")
            }
            ValidationIssue::InvalidCombo { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
        }
    }
}
