use serde::Serialize;
use sizewatch_core::tree::decode;
use sizewatch_core::{Artifact, ServiceConfig, SizeError};

use super::open_artifact_store;
use crate::cli::args::ShowArgs;
use crate::exit_codes::SUCCESS;

#[derive(Serialize)]
struct ShowOutput<'a> {
    project: &'a str,
    branch: &'a str,
    sha: &'a str,
    message: &'a str,
    timestamp: i64,
    artifacts: Vec<ShowEntry<'a>>,
}

#[derive(Serialize)]
struct ShowEntry<'a> {
    path: &'a str,
    size_bytes: u64,
}

pub async fn run(args: ShowArgs, config: &ServiceConfig) -> anyhow::Result<i32> {
    let store = open_artifact_store(config).await?;
    let snapshot = store
        .load_snapshot(&args.project, &args.branch, &args.sha)
        .await?
        .ok_or_else(|| SizeError::NotFound {
            project: args.project.clone(),
            branch: args.branch.clone(),
            commit: args.sha.clone(),
        })?;

    let mut artifacts = decode(&snapshot.tree, &args.project);
    artifacts.sort_by(|a, b| a.full_path.cmp(&b.full_path));

    if args.json {
        let output = ShowOutput {
            project: &args.project,
            branch: &args.branch,
            sha: &args.sha,
            message: &snapshot.meta.message,
            timestamp: snapshot.meta.timestamp,
            artifacts: artifacts.iter().map(entry).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let width = artifacts
            .iter()
            .map(|a| a.full_path.len())
            .max()
            .unwrap_or(0);
        for artifact in &artifacts {
            println!("{:<width$}  {:>10}", artifact.full_path, artifact.size_bytes);
        }
    }
    Ok(SUCCESS)
}

fn entry(artifact: &Artifact) -> ShowEntry<'_> {
    ShowEntry {
        path: &artifact.full_path,
        size_bytes: artifact.size_bytes,
    }
}
