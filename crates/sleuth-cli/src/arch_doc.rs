//! Architecture-doc ensurer — one short assistant session per repository
//! that lacks the index file.

use agent_client::{runner, NullSink, PermissionMode, QueryOptions, RunConfig};
use anyhow::{bail, Context, Result};
use sleuth_core::config::SleuthConfig;
use sleuth_core::{io, prompt};
use std::path::{Path, PathBuf};

use crate::run::ANALYST_TOOLS;

/// Write `ARCHITECTURE.md` into each repo root where it is missing.
///
/// Generation failure is fatal for the bug being processed — an analysis
/// session without the index would silently degrade.
pub async fn ensure_architecture_docs(repos: &[PathBuf], config: &SleuthConfig) -> Result<()> {
    for repo in repos {
        let doc_path = repo.join(prompt::ARCH_DOC_FILENAME);
        if doc_path.exists() {
            tracing::debug!(path = %doc_path.display(), "architecture index present");
            continue;
        }
        eprintln!(
            "generating {} for {}",
            prompt::ARCH_DOC_FILENAME,
            repo.display()
        );
        generate(repo, &doc_path, config).await?;
    }
    Ok(())
}

async fn generate(repo: &Path, doc_path: &Path, config: &SleuthConfig) -> Result<()> {
    let opts = QueryOptions {
        model: Some(config.model.clone()),
        cwd: Some(repo.to_path_buf()),
        allowed_tools: ANALYST_TOOLS.iter().map(|t| t.to_string()).collect(),
        permission_mode: PermissionMode::DontAsk,
        path_to_executable: Some(config.agent_bin.clone()),
        ..Default::default()
    };

    let outcome = runner::run(
        RunConfig {
            system_prompt: None,
            prompt: prompt::arch_doc_prompt(repo),
            timeout: config.doc_timeout,
            opts,
        },
        &mut NullSink,
    )
    .await
    .with_context(|| format!("architecture-doc session failed for {}", repo.display()))?;

    let body = outcome.report_text.trim();
    if body.is_empty() {
        bail!(
            "assistant returned an empty architecture index for {}",
            repo.display()
        );
    }

    io::atomic_write(doc_path, format!("{body}\n").as_bytes())
        .with_context(|| format!("failed to write {}", doc_path.display()))?;
    Ok(())
}
