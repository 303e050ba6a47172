//! Prompt synthesis from aggregated commit statistics.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;

use crate::snapshot::{CommitRecord, StatisticsSnapshot};
use crate::types::ReportKind;

/// Number of modules named in the prompt.
pub const TOP_MODULE_LIMIT: usize = 5;

/// Number of sample commits quoted as evidence.
pub const EVIDENCE_COMMIT_LIMIT: usize = 20;

/// Module name for files at the repository root.
pub const ROOT_MODULE: &str = "(root)";

/// How many sample commits touched a top-level module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMention {
    pub name: String,
    pub mentions: usize,
}

/// Layout the generated report should follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    /// Terse list of outcomes, no narrative.
    ResultBullets { min_items: usize, max_items: usize },
    /// Narrative grouped per repository, optionally closed by a summary.
    GroupedByRepository,
    /// Narrative grouped per module, emphasising measurable outcomes.
    GroupedByModule,
}

impl ReportStyle {
    pub const fn for_kind(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Daily => Self::ResultBullets {
                min_items: 3,
                max_items: 6,
            },
            ReportKind::Weekly => Self::GroupedByRepository,
            ReportKind::Monthly | ReportKind::Quarterly | ReportKind::Yearly => {
                Self::GroupedByModule
            }
        }
    }

    pub const fn has_narrative(&self) -> bool {
        !matches!(self, Self::ResultBullets { .. })
    }

    const fn format_example(&self) -> &'static str {
        match self {
            Self::ResultBullets { .. } => {
                "* Work summary\n\
                 1. Finished the XXX feature\n\
                 2. Fixed the XXX bug\n\
                 3. Improved XXX performance"
            }
            Self::GroupedByRepository => {
                "* Weekly summary\n\
                 \n\
                 1. Project XX\n\
                 1) Feature A: what was delivered and which problem it solves\n\
                 2) Feature B: the effect and value of the change\n\
                 3) Bug fixes: fixed XX, which improved XX\n\
                 \n\
                 2. Project YY\n\
                 1) Finished the XX module\n\
                 2) Optimised XX\n\
                 \n\
                 Key results this week\n\
                 Built XX from scratch covering XX; optimising XX improved XX."
            }
            Self::GroupedByModule => {
                "Grouped by module or project:\n\
                 \n\
                 1. Module XX\n\
                 1) Delivered XX, achieving XX\n\
                 2) Optimised XX, improving XX by XX%\n\
                 \n\
                 2. Module YY\n\
                 1) Added XX\n\
                 2) Fixed XX"
            }
        }
    }

    fn requirements(&self) -> Vec<String> {
        match self {
            Self::ResultBullets {
                min_items,
                max_items,
            } => vec![
                "Keep it short and direct, one sentence per item".to_string(),
                "List results only, do not describe the process".to_string(),
                format!("Write {min_items}-{max_items} items, with no narrative section"),
            ],
            Self::GroupedByRepository => vec![
                "Group the work by project".to_string(),
                "For each item say what was done, what it solved and its effect".to_string(),
                "With a single project, group by feature module instead".to_string(),
                "A closing \"Key results this week\" paragraph is optional".to_string(),
            ],
            Self::GroupedByModule => vec![
                "Group the work by module or feature".to_string(),
                "Highlight the core work and its outcomes".to_string(),
                "Include quantifiable results where possible (features shipped, bugs fixed)"
                    .to_string(),
            ],
        }
    }
}

/// Everything the synthesizer needs to build a prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub snapshot: &'a StatisticsSnapshot,
    pub kind: ReportKind,
    pub word_target: u32,
    pub project_label: &'a str,
    pub period_label: &'a str,
}

/// Counts, per top-level path segment, how many commits touched it.
///
/// A commit counts once per distinct module no matter how many of its files
/// live there. Sorted by mentions descending, then name.
pub fn module_histogram(commits: &[CommitRecord]) -> Vec<ModuleMention> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for commit in commits {
        let modules: BTreeSet<&str> = commit.files.iter().map(|f| module_of(&f.path)).collect();
        for module in modules {
            *counts.entry(module).or_insert(0) += 1;
        }
    }

    let mut histogram: Vec<ModuleMention> = counts
        .into_iter()
        .map(|(name, mentions)| ModuleMention {
            name: name.to_string(),
            mentions,
        })
        .collect();
    histogram.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.name.cmp(&b.name)));
    histogram
}

fn module_of(path: &str) -> &str {
    match path.split_once('/') {
        Some((head, _)) if !head.is_empty() => head,
        _ => ROOT_MODULE,
    }
}

/// Builds the generation prompt. Pure; performs no I/O.
pub fn synthesize(input: &PromptInput<'_>) -> String {
    let snapshot = input.snapshot;
    let style = ReportStyle::for_kind(input.kind);

    let mut modules = module_histogram(&snapshot.sample_commits);
    modules.truncate(TOP_MODULE_LIMIT);
    let module_line = if modules.is_empty() {
        "none".to_string()
    } else {
        modules
            .iter()
            .map(|m| format!("{} ({})", m.name, plural(m.mentions, "commit")))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are a work report assistant. Write a {} based on the git commit records below.",
        input.kind.label()
    );
    prompt.push('\n');
    let _ = writeln!(prompt, "Project: {}", input.project_label);
    let _ = writeln!(prompt, "Period: {}", input.period_label);
    let _ = writeln!(prompt, "Commits: {}", snapshot.total_commits);
    let _ = writeln!(prompt, "Authors: {}", snapshot.authors.len());
    let _ = writeln!(prompt, "Main modules: {module_line}");
    prompt.push('\n');

    prompt.push_str("Commit records (sample):\n");
    for commit in snapshot.sample_commits.iter().take(EVIDENCE_COMMIT_LIMIT) {
        let _ = writeln!(prompt, "- {}", commit.message.lines().next().unwrap_or_default());
    }
    prompt.push('\n');

    prompt.push_str("Reference format:\n");
    prompt.push_str(style.format_example());
    prompt.push_str("\n\n");

    prompt.push_str("Requirements:\n");
    for requirement in style.requirements() {
        let _ = writeln!(prompt, "- {requirement}");
    }
    let _ = writeln!(prompt, "- About {} words in total", input.word_target);
    prompt.push_str("- Merge similar commits and extract the key information\n");
    prompt.push_str("- Do not translate commits one by one; summarise them\n");
    prompt.push_str("- If one feature has several commits, write a single entry for it\n");
    prompt.push_str("- Emphasise results, impact and value rather than process\n");
    prompt.push('\n');

    let _ = write!(
        prompt,
        "Note: there are {} in total; the list above is only a sample.",
        plural(snapshot.total_commits, "commit")
    );
    prompt
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
