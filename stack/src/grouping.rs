//! Assigning scanned documents to stacks.
//!
//! Automatic grouping makes one stack per directory. Manual grouping reads a
//! listing of the form:
//!
//! ```text
//! ### Camera Service
//! - 2024/240313_Cams.md
//! - 240314_Cams.md
//!
//! <!-- comment lines are ignored -->
//! ### Access Control
//! - 240301_Doors.md
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use report_sorter_pipeline::ScannedDocument;
use tracing::warn;

/// One group as written in a manual listing, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: String,
    pub entries: Vec<String>,
}

/// A resolved group of documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackGroup {
    pub name: String,
    pub members: Vec<ScannedDocument>,
}

/// Groups plus the problems found while building them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingOutcome {
    pub groups: Vec<StackGroup>,
    pub warnings: Vec<String>,
}

/// Parses a manual grouping listing.
///
/// Headings start with `#` marks; entries are `-` list items below a
/// heading. A repeated heading adds to the earlier group.
///
/// # Examples
///
/// ```
/// use report_sorter_stack::parse_grouping;
///
/// let specs = parse_grouping("### Cameras\n- a.md\n- b.md\n\n### Doors\n- c.md\n");
/// assert_eq!(specs.len(), 2);
/// assert_eq!(specs[0].name, "Cameras");
/// assert_eq!(specs[0].entries, vec!["a.md", "b.md"]);
/// ```
pub fn parse_grouping(text: &str) -> Vec<GroupSpec> {
    let mut specs: Vec<GroupSpec> = Vec::new();
    let mut current: Option<usize> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("<!--") {
            continue;
        }

        if line.starts_with('#') {
            let name = line.trim_start_matches('#').trim();
            if name.is_empty() {
                current = None;
                continue;
            }
            current = Some(match specs.iter().position(|spec| spec.name == name) {
                Some(index) => index,
                None => {
                    specs.push(GroupSpec {
                        name: name.to_string(),
                        entries: Vec::new(),
                    });
                    specs.len() - 1
                }
            });
        } else if let Some(entry) = line.strip_prefix('-') {
            let entry = entry.trim().trim_matches('`');
            if let (Some(index), false) = (current, entry.is_empty()) {
                specs[index].entries.push(entry.to_string());
            }
        }
    }

    specs
}

/// One group per directory containing documents, in directory order.
///
/// Groups are named by their directory path relative to `root`; files
/// directly in `root` form a group named after `root` itself. Members are
/// ordered by file name.
pub fn auto_groups(root: &Path, documents: &[ScannedDocument]) -> GroupingOutcome {
    let mut by_dir: BTreeMap<&str, Vec<ScannedDocument>> = BTreeMap::new();
    for doc in documents {
        let dir = doc.name.rsplit_once('/').map_or("", |(dir, _)| dir);
        by_dir.entry(dir).or_default().push(doc.clone());
    }

    let root_name = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reports".to_string());

    let groups = by_dir
        .into_iter()
        .map(|(dir, mut members)| {
            members.sort_by(|a, b| a.file_name().cmp(b.file_name()));
            StackGroup {
                name: if dir.is_empty() {
                    root_name.clone()
                } else {
                    dir.to_string()
                },
                members,
            }
        })
        .collect();

    GroupingOutcome {
        groups,
        warnings: Vec::new(),
    }
}

/// Resolves manual group entries against the scanned documents.
///
/// An entry matches a relative path first, then a bare file name. Entries
/// that match nothing become warnings; a group left with no members is
/// skipped with a warning.
pub fn manual_groups(specs: &[GroupSpec], documents: &[ScannedDocument]) -> GroupingOutcome {
    let mut grouping = GroupingOutcome::default();

    for spec in specs {
        let mut members: Vec<ScannedDocument> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for entry in &spec.entries {
            let wanted = entry.replace('\\', "/");
            let wanted = wanted.trim_start_matches("./");
            let by_path = documents.iter().find(|doc| doc.name == wanted);
            let found = by_path.or_else(|| {
                let mut by_name = documents.iter().filter(|doc| doc.file_name() == wanted);
                let first = by_name.next();
                if first.is_some() && by_name.next().is_some() {
                    grouping.warnings.push(format!(
                        "group '{}': '{entry}' matches several files, using {}",
                        spec.name,
                        first.map_or("", |doc| doc.name.as_str())
                    ));
                }
                first
            });

            match found {
                Some(doc) if seen.insert(doc.name.as_str()) => members.push(doc.clone()),
                Some(doc) => grouping.warnings.push(format!(
                    "group '{}': '{}' listed more than once",
                    spec.name, doc.name
                )),
                None => grouping.warnings.push(format!(
                    "group '{}': file not found: {entry}",
                    spec.name
                )),
            }
        }

        if members.is_empty() {
            grouping
                .warnings
                .push(format!("group '{}' has no members, skipped", spec.name));
            continue;
        }
        grouping.groups.push(StackGroup {
            name: spec.name.clone(),
            members,
        });
    }

    for warning in &grouping.warnings {
        warn!("{warning}");
    }
    grouping
}
