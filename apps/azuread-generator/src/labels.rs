//! GitHub labeler files.

use crate::Generator;
use azuread_sdk::registration::ServiceRegistration;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const PROVIDER_PREFIX: &str = "azuread_";

const SERVICES_DIR: &str = "crates/azuread-provider/src/services";

const PULL_REQUEST_TEMPLATE: &str = "\
# NOTE: this file is generated via 'cargo run -p azuread-generator'

dependencies:
- changed-files:
  - any-glob-to-any-file:
    - Cargo.toml
    - Cargo.lock

documentation:
- changed-files:
  - any-glob-to-any-file:
    - docs/**/*

tooling:
- changed-files:
  - any-glob-to-any-file:
    - .github/**/*
    - apps/azuread-generator/**/*
    - scripts/**/*
";

const ISSUE_TEMPLATE: &str = "\
# NOTE: this file is generated via 'cargo run -p azuread-generator'

bug:
  - 'panic:'
crash:
  - 'panic:'
";

/// Groups non-skipped services by GitHub label. Unlabelled services are
/// dropped.
fn by_label<'a>(
    services: &'a [ServiceRegistration],
    skip: &BTreeSet<&str>,
) -> BTreeMap<&'static str, Vec<&'a ServiceRegistration>> {
    let mut labels: BTreeMap<&'static str, Vec<&ServiceRegistration>> = BTreeMap::new();
    for service in services.iter().filter(|s| !skip.contains(s.package)) {
        if let Some(label) = service.github_label {
            labels.entry(label).or_default().push(service);
        }
    }
    labels
}

/// `.github/labeler-pull-request-triage.yaml`
#[derive(Debug, Clone, Copy, Default)]
pub struct PullRequestLabels;

impl Generator for PullRequestLabels {
    fn output_path(&self, root: &Path) -> PathBuf {
        root.join(".github").join("labeler-pull-request-triage.yaml")
    }

    fn render(&self, services: &[ServiceRegistration], skip: &BTreeSet<&str>) -> String {
        let mut output = PULL_REQUEST_TEMPLATE.to_string();

        for (label, services) in by_label(services, skip) {
            let packages: BTreeSet<&str> = services.iter().map(|s| s.package).collect();

            output.push('\n');
            output.push_str(&format!("{label}:\n"));
            output.push_str("- changed-files:\n");
            output.push_str("  - any-glob-to-any-file:\n");
            for package in packages {
                output.push_str(&format!("    - {SERVICES_DIR}/{package}.rs\n"));
                output.push_str(&format!("    - {SERVICES_DIR}/{package}/**/*\n"));
            }
        }

        output
    }
}

/// `.github/labeler-issue-triage.yaml`
///
/// Each label matches issues whose "Affected Resource(s)" section mentions a
/// name sharing the label's common prefix. When a label's resources share
/// nothing beyond `azuread_`, they are grouped by their first name segment
/// instead. A prefix that would also match another label's names is replaced
/// by the exact names.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueLabels;

#[derive(Debug, Clone, PartialEq, Eq)]
struct NamePrefix {
    common: String,
    names: Vec<String>,
}

impl Generator for IssueLabels {
    fn output_path(&self, root: &Path) -> PathBuf {
        root.join(".github").join("labeler-issue-triage.yaml")
    }

    fn render(&self, services: &[ServiceRegistration], skip: &BTreeSet<&str>) -> String {
        // Unlabelled services still take part in collision checks.
        let mut names: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for service in services.iter().filter(|s| !skip.contains(s.package)) {
            let entry = names.entry(service.github_label.unwrap_or_default()).or_default();
            entry.extend(service.resources.iter().map(|n| (*n).to_string()));
            entry.extend(service.data_sources.iter().map(|n| (*n).to_string()));
        }

        let prefixes: BTreeMap<&str, Vec<NamePrefix>> = names
            .into_iter()
            .map(|(label, names)| (label, label_prefixes(names)))
            .collect();

        let mut output = ISSUE_TEMPLATE.to_string();
        for (label, entries) in &prefixes {
            if label.is_empty() {
                continue;
            }

            let mut patterns = Vec::new();
            for prefix in entries {
                if collides(label, prefix, &prefixes) {
                    patterns.extend(
                        prefix
                            .names
                            .iter()
                            .map(|n| format!(r"{}\W+", strip_provider(n))),
                    );
                } else {
                    patterns.push(strip_provider(&prefix.common).to_string());
                }
            }

            output.push('\n');
            output.push_str(&format!("{label}:\n"));
            match patterns.as_slice() {
                [] => {}
                [single] => output.push_str(&affected_resources(single)),
                many => output.push_str(&affected_resources(&format!("({})", many.join("|")))),
            }
        }

        output
    }
}

fn affected_resources(pattern: &str) -> String {
    format!(
        r"  - '### (|New or )Affected Resource\(s\)\/Data Source\(s\)((.|\n)*){PROVIDER_PREFIX}{pattern}((.|\n)*)###'"
    ) + "\n"
}

fn strip_provider(name: &str) -> &str {
    name.strip_prefix(PROVIDER_PREFIX).unwrap_or(name)
}

/// Splits a label's names into one or more prefixes.
fn label_prefixes(mut names: Vec<String>) -> Vec<NamePrefix> {
    names.sort();
    names.dedup();

    let common = common_prefix(&names);
    if common != PROVIDER_PREFIX {
        return vec![NamePrefix { common, names }];
    }

    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut current_segment: Option<String> = None;
    for name in names {
        let segment = first_segment(&name);
        match groups.last_mut() {
            Some(group) if segment.is_some() && segment == current_segment => group.push(name),
            _ => {
                current_segment = segment;
                groups.push(vec![name]);
            }
        }
    }

    groups
        .into_iter()
        .map(|names| NamePrefix {
            common: common_prefix(&names),
            names,
        })
        .collect()
}

/// Longest common prefix of sorted names.
fn common_prefix(sorted: &[String]) -> String {
    match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) => first
            .chars()
            .zip(last.chars())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a)
            .collect(),
        _ => String::new(),
    }
}

/// `azuread_access_package_catalog` -> `azuread_access`
fn first_segment(name: &str) -> Option<String> {
    let rest = name.strip_prefix(PROVIDER_PREFIX)?;
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let terminated = rest[end..].is_empty() || rest[end..].starts_with('_');
    (end > 0 && terminated).then(|| format!("{PROVIDER_PREFIX}{}", &rest[..end]))
}

/// True if another label has a prefix containing this one.
fn collides(label: &str, prefix: &NamePrefix, all: &BTreeMap<&str, Vec<NamePrefix>>) -> bool {
    all.iter()
        .filter(|(other, _)| **other != label)
        .flat_map(|(_, prefixes)| prefixes)
        .any(|other| other.common.contains(&prefix.common))
}
