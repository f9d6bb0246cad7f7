use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use sizewatch_core::{
    CircleCiClient, GateOutcome, GithubClient, ServiceConfig, SizeGate, SkipReason, StatusEvent,
};
use tokio::io::AsyncReadExt;

use super::open_artifact_store;
use crate::cli::args::EventArgs;
use crate::exit_codes::SUCCESS;

pub async fn run(args: EventArgs, config: &ServiceConfig) -> anyhow::Result<i32> {
    let payload = read_payload(&args.payload).await?;
    let event: StatusEvent =
        serde_json::from_str(&payload).context("payload is not a status event")?;

    let github = Arc::new(GithubClient::new(
        &config.github_url,
        config.github_token.clone(),
        config.timeout_secs,
    )?);
    let circleci = Arc::new(CircleCiClient::new(
        &config.circleci_url,
        config.circleci_token.clone(),
        config.timeout_secs,
    )?);
    let store = open_artifact_store(config).await?;

    let gate = SizeGate::new(store, circleci, github.clone(), github);
    let outcome = gate.handle_status_event(&event).await?;
    println!("{}", describe(&outcome));
    Ok(SUCCESS)
}

async fn read_payload(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut payload = String::new();
        tokio::io::stdin()
            .read_to_string(&mut payload)
            .await
            .context("failed to read payload from stdin")?;
        return Ok(payload);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read payload {}", path.display()))
}

fn describe(outcome: &GateOutcome) -> String {
    match outcome {
        GateOutcome::Skipped(SkipReason::NotSuccess(state)) => {
            format!("skipped: status is {}", state)
        }
        GateOutcome::Skipped(SkipReason::Disabled) => "skipped: size checks disabled".to_string(),
        GateOutcome::Skipped(SkipReason::ContextMismatch(context)) => {
            format!("skipped: context {} is not watched", context)
        }
        GateOutcome::Ingested { projects, branches } if projects.is_empty() => {
            format!("stored nothing (branches: {})", branches.join(", "))
        }
        GateOutcome::Ingested { projects, branches } => format!(
            "stored {} on {}",
            projects.join(", "),
            branches.join(", ")
        ),
        GateOutcome::Evaluated {
            pull_request,
            verdict,
        } => format!(
            "pull request #{}: {}: {}",
            pull_request, verdict.state, verdict.description
        ),
    }
}
