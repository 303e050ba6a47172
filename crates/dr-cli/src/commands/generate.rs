//! Generate command for streaming a report to the terminal.

use std::io::Write;

use anyhow::{Result, bail};
use dr_engine::{ERROR_MARKER_PREFIX, SessionStatus};

use crate::Config;
use crate::cli::SelectionArgs;
use crate::commands::{prepare, refresh, runtime};

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    selection: &SelectionArgs,
    words: Option<u32>,
    prompt_only: bool,
) -> Result<()> {
    runtime()?.block_on(stream_report(writer, config, selection, words, prompt_only))
}

async fn stream_report<W: Write>(
    writer: &mut W,
    config: &Config,
    selection: &SelectionArgs,
    words: Option<u32>,
    prompt_only: bool,
) -> Result<()> {
    let mut orchestrator = prepare(config, selection)?;
    if let Some(words) = words {
        orchestrator.set_word_target(words);
    }

    for failure in refresh(&mut orchestrator).await {
        eprintln!(
            "warning: skipped {}: {}",
            failure.repository_name, failure.message
        );
    }

    if prompt_only {
        writeln!(writer, "{}", orchestrator.prompt()?)?;
        return Ok(());
    }

    let session = orchestrator.generate(&config.llm)?;
    tracing::info!(%session, model = %config.llm.model, "generation started");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut failure = None;
    loop {
        tokio::select! {
            update = orchestrator.next_generation_update() => {
                let Some(update) = update else { break };
                match update.status {
                    SessionStatus::Failed => {
                        let message = update
                            .delta
                            .strip_prefix(ERROR_MARKER_PREFIX)
                            .unwrap_or(&update.delta)
                            .to_string();
                        failure = Some(message);
                    }
                    _ => {
                        write!(writer, "{}", update.delta)?;
                        writer.flush()?;
                    }
                }
            }
            _ = &mut ctrl_c => {
                orchestrator.cancel_generation();
                writeln!(writer)?;
                bail!("generation cancelled");
            }
        }
    }
    writeln!(writer)?;

    if let Some(message) = failure {
        bail!("generation failed: {message}");
    }
    Ok(())
}
