//! Prompt rendering — pure functions from bug records and resolved paths to
//! prompt text. No I/O here.

use crate::bug::BugRecord;
use std::path::{Path, PathBuf};

/// The architecture index written into each attached repository root.
pub const ARCH_DOC_FILENAME: &str = "ARCHITECTURE.md";

/// System message for a root-cause analysis session.
///
/// The strict-JSON contract is the only output contract: the assistant must
/// answer with exactly one JSON object matching the findings schema.
pub fn system_prompt() -> String {
    format!(
        r#"You are a root-cause analyst for software defects. You are given a bug report and one or more local repositories to inspect with your tools.

Before digging in, read the {ARCH_DOC_FILENAME} file in each repository root when it is present — it is the module index for that codebase.

Respond with exactly one JSON object and nothing else:

{{
  "probableCause": "<one-sentence statement of the most likely root cause>",
  "reason": "<why you believe this, referencing the code you inspected>",
  "suggestedFixes": ["<concrete fix>", "..."],
  "confidenceScore": <number between 0 and 1>,
  "evidence": ["<file/line references or excerpts supporting the cause>", "..."]
}}

Do not wrap the object in prose. probableCause and reason must be non-empty; suggestedFixes must contain at least one entry; confidenceScore must be between 0 and 1."#
    )
}

/// User prompt for one bug: title, description, status, repo roots, and
/// image paths (or "None").
pub fn bug_prompt(record: &BugRecord, repos: &[PathBuf], images: &[PathBuf]) -> String {
    let repo_list = path_list(repos);
    let image_list = if images.is_empty() {
        "None".to_string()
    } else {
        path_list(images)
    };

    format!(
        "Investigate this bug and produce the findings object.\n\n\
         ## Bug\n\
         Title: {title}\n\
         Status: {status}\n\n\
         {description}\n\n\
         ## Repositories\n\
         {repo_list}\n\n\
         ## Screenshots / images\n\
         {image_list}\n",
        title = record.title,
        status = record.status,
        description = record.description,
    )
}

/// Prompt for generating a repository's architecture index.
pub fn arch_doc_prompt(repo: &Path) -> String {
    format!(
        "Produce a markdown architecture index for the repository at {repo}.\n\n\
         List its top-level directories and modules, each with a one- or \
         two-sentence description of its purpose. No narrative, no analysis, \
         no recommendations — just the index.\n\n\
         Return only the markdown document.",
        repo = repo.display(),
    )
}

fn path_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("- {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
