//! Stack and index document generation.
//!
//! A stack document starts with a title and timestamp, then repeats
//! separator, numbered section header and member content for every member.
//! The index lists every stack with its members, word count and estimated
//! token count, plus any warnings raised while grouping or writing.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use report_sorter_core::count_words;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StackError};
use crate::grouping::StackGroup;
use crate::titles::TitleMap;

/// Estimated tokens per word.
pub const TOKENS_PER_WORD: f64 = 1.33;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-]+").expect("static regex must compile"));

/// Formatting and placement of generated documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOptions {
    pub output_dir: PathBuf,
    /// Marker written before each member section.
    pub separator: String,
    /// Extension of stack documents, without the dot.
    pub output_extension: String,
    /// Timestamp used in headers and file names.
    pub generated_at: NaiveDateTime,
}

/// One written stack document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFile {
    pub group: String,
    pub path: PathBuf,
    /// Relative names of the included members, in order.
    pub members: Vec<String>,
    pub words: usize,
    pub estimated_tokens: usize,
}

/// Everything written by one stacking run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRun {
    pub stacks: Vec<StackFile>,
    pub index: PathBuf,
    pub warnings: Vec<String>,
}

impl StackRun {
    pub fn document_count(&self) -> usize {
        self.stacks.iter().map(|stack| stack.members.len()).sum()
    }
}

/// A member ready to be written: display title and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSection<'a> {
    pub title: &'a str,
    pub content: String,
}

/// Group name reduced to word characters and hyphens, runs of anything else
/// collapsed to `_`.
///
/// # Examples
///
/// ```
/// use report_sorter_stack::sanitize_name;
///
/// assert_eq!(sanitize_name("Camera Service / 2024"), "Camera_Service_2024");
/// assert_eq!(sanitize_name("***"), "stack");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name.trim(), "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        "stack".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<yymmdd>_<sanitized group>.<ext>`
pub fn stack_file_name(group: &str, options: &StackOptions) -> String {
    format!(
        "{}_{}.{}",
        options.generated_at.format("%y%m%d"),
        sanitize_name(group),
        options.output_extension.trim_start_matches('.')
    )
}

/// `<yymmdd_HHMMSS>_stack_index.md`
pub fn index_file_name(options: &StackOptions) -> String {
    format!("{}_stack_index.md", options.generated_at.format("%y%m%d_%H%M%S"))
}

/// Rough token estimate for `words` words.
pub fn estimate_tokens(words: usize) -> usize {
    (words as f64 * TOKENS_PER_WORD) as usize
}

/// Renders one stack document.
pub fn render_stack(group: &str, sections: &[StackSection<'_>], options: &StackOptions) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {group} Reports\n\n"));
    out.push_str(&format!(
        "*Generated on {}*\n",
        options.generated_at.format("%Y-%m-%d %H:%M")
    ));

    for (i, section) in sections.iter().enumerate() {
        out.push_str(&options.separator);
        out.push_str(&format!("## {}. {}\n\n", i + 1, section.title));
        out.push_str(section.content.trim_end());
        out.push('\n');
    }

    out
}

/// Renders the index of a stacking run.
pub fn render_index(stacks: &[StackFile], warnings: &[String], options: &StackOptions) -> String {
    let mut out = String::new();
    let documents: usize = stacks.iter().map(|stack| stack.members.len()).sum();
    let words: usize = stacks.iter().map(|stack| stack.words).sum();

    out.push_str("# Stack Index\n\n");
    out.push_str(&format!(
        "Generated: {}\n\n",
        options.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("- Stacks: {}\n", stacks.len()));
    out.push_str(&format!("- Documents: {documents}\n"));
    out.push_str(&format!(
        "- Words: {words} (est. ~{} tokens)\n",
        estimate_tokens(words)
    ));

    for stack in stacks {
        let file = stack
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        out.push_str(&format!("\n## {}\n\n", stack.group));
        out.push_str(&format!("File: `{file}`\n"));
        out.push_str(&format!(
            "Stack: {} [{} files, {} words, est. ~{} tokens]\n\n",
            stack.group,
            stack.members.len(),
            stack.words,
            stack.estimated_tokens
        ));
        for (i, member) in stack.members.iter().enumerate() {
            out.push_str(&format!("{}. {member}\n", i + 1));
        }
    }

    if !warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for warning in warnings {
            out.push_str(&format!("- {warning}\n"));
        }
    }

    out
}

/// Writes one stack per group and the index into `options.output_dir`.
///
/// Unreadable members are skipped with a warning; a group whose members
/// are all unreadable produces no stack.
///
/// # Errors
///
/// Returns [`CreateDir`](StackError::CreateDir) if the output directory
/// cannot be created, or [`Io`](StackError::Io) if a stack or the index
/// cannot be written.
pub fn write_stacks(
    groups: &[StackGroup],
    titles: &TitleMap,
    mut warnings: Vec<String>,
    options: &StackOptions,
) -> Result<StackRun> {
    fs::create_dir_all(&options.output_dir).map_err(|source| StackError::CreateDir {
        path: options.output_dir.clone(),
        source,
    })?;

    let mut stacks = Vec::with_capacity(groups.len());
    let mut used_names: HashSet<String> = HashSet::new();

    for group in groups {
        let mut sections = Vec::with_capacity(group.members.len());
        let mut members = Vec::with_capacity(group.members.len());
        for member in &group.members {
            match fs::read_to_string(&member.path) {
                Ok(content) => {
                    sections.push(StackSection {
                        title: titles.title_for(member.file_name()),
                        content,
                    });
                    members.push(member.name.clone());
                }
                Err(err) => {
                    let warning = format!(
                        "group '{}': cannot read {}: {err}",
                        group.name, member.name
                    );
                    warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }
        if sections.is_empty() {
            let warning = format!("group '{}' has no readable members, skipped", group.name);
            warn!("{warning}");
            warnings.push(warning);
            continue;
        }

        let text = render_stack(&group.name, &sections, options);
        let words = count_words(&text);
        let path = unique_path(
            &options.output_dir,
            &stack_file_name(&group.name, options),
            &mut used_names,
        );
        fs::write(&path, &text)?;
        info!(
            group = %group.name,
            members = members.len(),
            path = %path.display(),
            "wrote stack"
        );

        stacks.push(StackFile {
            group: group.name.clone(),
            path,
            members,
            words,
            estimated_tokens: estimate_tokens(words),
        });
    }

    let index = options.output_dir.join(index_file_name(options));
    fs::write(&index, render_index(&stacks, &warnings, options))?;

    Ok(StackRun {
        stacks,
        index,
        warnings,
    })
}

/// `dir/file_name`, with `_2`, `_3`, … before the extension when another
/// stack of this run already took the name.
fn unique_path(dir: &Path, file_name: &str, used: &mut HashSet<String>) -> PathBuf {
    if used.insert(file_name.to_string()) {
        return dir.join(file_name);
    }
    let (stem, ext) = file_name.rsplit_once('.').unwrap_or((file_name, ""));
    let mut n = 2;
    loop {
        let candidate = if ext.is_empty() {
            format!("{stem}_{n}")
        } else {
            format!("{stem}_{n}.{ext}")
        };
        if used.insert(candidate.clone()) {
            return dir.join(candidate);
        }
        n += 1;
    }
}
