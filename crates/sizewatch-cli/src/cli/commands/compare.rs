use sizewatch_core::gate::NO_ARTIFACTS_DESCRIPTION;
use sizewatch_core::{classify, find_largest_increase, ServiceConfig, Verdict};
use tracing::info;

use super::open_artifact_store;
use crate::cli::args::CompareArgs;
use crate::exit_codes::{SIZE_REGRESSION, SUCCESS};

pub async fn run(args: CompareArgs, config: &ServiceConfig) -> anyhow::Result<i32> {
    let store = open_artifact_store(config).await?;
    let baseline = store.load_target_branch(&args.branch, &args.base_sha).await?;
    let candidate = store.load_target_branch(&args.branch, &args.head_sha).await?;

    let verdict = match find_largest_increase(&baseline, &candidate) {
        Some(diff) => {
            info!(path = %diff.artifact.full_path, increase = diff.increase, "largest increase");
            classify(&diff, args.max_increase)
        }
        None => Verdict::success(NO_ARTIFACTS_DESCRIPTION),
    };

    println!("{}: {}", verdict.state, verdict.description);
    Ok(if verdict.is_failure() {
        SIZE_REGRESSION
    } else {
        SUCCESS
    })
}
