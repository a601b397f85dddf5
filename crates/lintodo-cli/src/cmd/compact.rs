//! `lintodo compact`: drop cancelled add/remove pairs from `.lint-todo`.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use lintodo_core::store::TodoStore;
use serde::Serialize;

use crate::output::{CliError, OutputMode, render, render_error};

/// Arguments for `lintodo compact`.
#[derive(Args, Debug)]
pub struct CompactArgs {
    /// Report what would be compacted without rewriting the store.
    #[arg(long)]
    pub dry_run: bool,
}

/// Output payload for `lintodo compact`.
#[derive(Debug, Serialize)]
pub struct CompactOutput {
    pub compacted: usize,
    pub orphan_removes: usize,
    pub live: usize,
    pub dry_run: bool,
}

/// Execute `lintodo compact`.
pub fn run_compact(args: &CompactArgs, output: OutputMode, base_dir: &Path) -> Result<()> {
    let store = TodoStore::new(base_dir);

    if !store.exists() {
        render_error(
            output,
            &CliError::with_details(
                format!("no todo store at {}", store.path().display()),
                "run `lintodo check --update` to create todos first",
                "no_store",
            ),
        )?;
        anyhow::bail!("no todo store");
    }

    let result = if args.dry_run {
        let replay = store.replay().context("replay todo store")?;
        CompactOutput {
            compacted: replay.cancelled_pairs,
            orphan_removes: replay.orphan_removes,
            live: replay.live.len(),
            dry_run: true,
        }
    } else {
        let compacted = store.compact().context("compact todo store")?;
        CompactOutput {
            compacted: compacted.compacted,
            orphan_removes: compacted.orphan_removes,
            live: compacted.live,
            dry_run: false,
        }
    };

    render(output, &result, |r| {
        let verb = if r.dry_run { "would compact" } else { "compacted" };
        let mut text = format!(
            "✓ {verb} {} todo pair(s), {} todo(s) remain\n",
            r.compacted, r.live
        );
        if r.orphan_removes > 0 {
            let _ = writeln!(text, "  dropped {} unmatched remove line(s)", r.orphan_removes);
        }
        text
    })
}
