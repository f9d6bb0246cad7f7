use sizewatch_core::ServiceConfig;

use super::open_artifact_store;
use crate::exit_codes::SUCCESS;

pub async fn run(config: &ServiceConfig) -> anyhow::Result<i32> {
    let store = open_artifact_store(config).await?;
    for project in store.list_projects().await? {
        println!("{}", project);
    }
    Ok(SUCCESS)
}
