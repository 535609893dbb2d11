//! The per-bug pipeline: resolve paths → ensure architecture docs → build
//! prompts → run one session → parse findings → persist.
//!
//! Bugs are processed strictly one at a time. The work file is rewritten
//! after every status transition, so an interrupted run leaves the current
//! bug `in-progress` and a rerun resumes from there.

use agent_client::{runner, PermissionMode, QueryOptions, RunConfig};
use anyhow::{Context, Result};
use sleuth_core::bug::{BugFile, BugStatus};
use sleuth_core::config::SleuthConfig;
use sleuth_core::finding::Finding;
use sleuth_core::{paths, prompt};
use std::path::Path;

use crate::arch_doc;
use crate::reporter::StderrReporter;

/// Tools the analyst session may use without prompting. Inspection only —
/// the session never edits the repositories.
pub(crate) const ANALYST_TOOLS: &[&str] = &["Read", "Glob", "Grep", "Bash"];

pub async fn process_file(bug_file: &Path, config: &SleuthConfig) -> Result<()> {
    let mut file = BugFile::load(bug_file)
        .with_context(|| format!("failed to load bug file {}", bug_file.display()))?;
    let base = std::env::current_dir().context("cannot determine working directory")?;

    let total = file.records.len();
    for index in 0..total {
        if file.records[index].status == BugStatus::Done {
            eprintln!(
                "[{}/{}] skipping '{}' (already done)",
                index + 1,
                total,
                file.records[index].title
            );
            continue;
        }

        eprintln!(
            "[{}/{}] investigating '{}'",
            index + 1,
            total,
            file.records[index].title
        );

        file.records[index].transition(BugStatus::InProgress)?;
        file.save()
            .context("failed to persist in-progress transition")?;

        let finding = investigate(&file, index, config, &base).await?;
        println!("{}", serde_json::to_string_pretty(&finding)?);

        file.records[index].bug_details = Some(finding);
        file.records[index].transition(BugStatus::Done)?;
        file.save().context("failed to persist done transition")?;

        eprintln!("[{}/{}] done", index + 1, total);
    }

    Ok(())
}

async fn investigate(
    file: &BugFile,
    index: usize,
    config: &SleuthConfig,
    base: &Path,
) -> Result<Finding> {
    let record = &file.records[index];

    let repos = paths::resolve_repo_dirs(&record.repo_urls(), base)
        .with_context(|| format!("bug[{index}]: repository path"))?;
    let images = paths::resolve_image_files(record.image_paths(), base)
        .with_context(|| format!("bug[{index}]: image path"))?;

    arch_doc::ensure_architecture_docs(&repos, config).await?;

    // The common ancestor is the working directory so relative references in
    // tool use resolve across all attached repos.
    let cwd = paths::common_ancestor(&repos)
        .context("no repository paths after resolution")?;
    tracing::debug!(cwd = %cwd.display(), repos = repos.len(), "session working directory");

    let opts = QueryOptions {
        model: Some(config.model.clone()),
        cwd: Some(cwd),
        additional_directories: repos
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        allowed_tools: ANALYST_TOOLS.iter().map(|t| t.to_string()).collect(),
        permission_mode: PermissionMode::DontAsk,
        path_to_executable: Some(config.agent_bin.clone()),
        ..Default::default()
    };

    let mut reporter = StderrReporter::new(config.show_reasoning);
    let outcome = runner::run(
        RunConfig {
            system_prompt: Some(prompt::system_prompt()),
            prompt: prompt::bug_prompt(record, &repos, &images),
            timeout: config.session_timeout,
            opts,
        },
        &mut reporter,
    )
    .await
    .with_context(|| format!("analysis session failed for '{}'", record.title))?;

    tracing::debug!(
        session_id = %outcome.session_id,
        num_turns = outcome.num_turns,
        duration_ms = outcome.duration_ms,
        "session complete"
    );

    Finding::parse_report(&outcome.report_text)
        .with_context(|| format!("assistant returned an unusable report for '{}'", record.title))
}
