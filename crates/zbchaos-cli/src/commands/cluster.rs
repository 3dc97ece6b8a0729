use tokio::sync::watch;
use zbchaos_client::{ClusterApi, HttpClusterClient};
use zbchaos_core::{ChangeId, ChaosConfig, RegionLayout};
use zbchaos_scale::{
    ChangeWatcher, ForcedFailover, ManualPlatform, NoChangeReason, ScalePlan, ScaleTarget,
    ScalingPlanner, WatchOutcome, WatchSettings,
};

pub async fn status(config: &ChaosConfig) -> anyhow::Result<()> {
    let client = HttpClusterClient::from_config(config)?;
    let topology = client.query_topology().await?;
    println!("{}", serde_json::to_string_pretty(&topology)?);
    Ok(())
}

pub async fn wait(
    config: &ChaosConfig,
    change_id: Option<ChangeId>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let client = HttpClusterClient::from_config(config)?;
    let outcome = ChangeWatcher::new(&client, WatchSettings::from_config(config))
        .with_shutdown(shutdown)
        .wait(change_id)
        .await?;
    println!("{}", describe_outcome(&outcome));
    Ok(())
}

pub async fn scale(
    config: &ChaosConfig,
    target: ScaleTarget,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let client = HttpClusterClient::from_config(config)?;
    let platform = ManualPlatform;
    let report = ScalingPlanner::new(&client, &platform, config)
        .with_shutdown(shutdown)
        .scale(&target)
        .await?;

    match (report.plan, report.outcome) {
        (ScalePlan::NoChange(NoChangeReason::PartitionShrinkUnsupported { current, requested }), _) => {
            println!("partitions can only grow ({current} -> {requested}), nothing requested");
        }
        (ScalePlan::NoChange(NoChangeReason::AlreadyAtTarget), _) => {
            println!("cluster already matches the requested size");
        }
        (plan, Some(outcome)) => {
            println!("{}: {}", describe_plan(&plan), describe_outcome(&outcome));
        }
        (plan, None) => println!("{}", describe_plan(&plan)),
    }
    Ok(())
}

pub async fn force_failover(
    config: &ChaosConfig,
    regions: u32,
    region_id: u32,
    brokers: u32,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let layout = RegionLayout::new(regions, region_id)?;
    let client = HttpClusterClient::from_config(config)?;
    let ready = WatchSettings::from_config(config).with_timeout(config.failover_timeout());

    let report = ForcedFailover::new(&client, ready, WatchSettings::from_config(config))
        .with_shutdown(shutdown)
        .run(brokers, layout)
        .await?;

    if report.removed.is_empty() {
        println!("every broker already lives in region {region_id}, nothing removed");
        return Ok(());
    }
    println!("removed brokers {:?} outside region {region_id}", report.removed);
    if let Some(outcome) = &report.outcome {
        println!("{}", describe_outcome(outcome));
    }
    Ok(())
}

fn describe_plan(plan: &ScalePlan) -> String {
    match *plan {
        ScalePlan::ScaleUpBrokers { from, to } | ScalePlan::ScaleDownBrokers { from, to } => {
            format!("brokers {from} -> {to}")
        }
        ScalePlan::ChangePartitions {
            partitions,
            replication_factor,
        } => match (partitions, replication_factor) {
            (Some(p), Some(rf)) => format!("partitions -> {p}, replication factor -> {rf}"),
            (Some(p), None) => format!("partitions -> {p}"),
            (None, Some(rf)) => format!("replication factor -> {rf}"),
            (None, None) => "partitions unchanged".to_string(),
        },
        ScalePlan::NoChange(_) => "no change".to_string(),
    }
}

fn describe_outcome(outcome: &WatchOutcome) -> String {
    match *outcome {
        WatchOutcome::Completed { change_id } => format!("change {change_id} completed"),
        WatchOutcome::Outdated { change_id, latest } => {
            format!("change {change_id} superseded by completed change {latest}")
        }
        WatchOutcome::NothingToTrack => "cluster has no changes to wait for".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_descriptions() {
        assert_eq!(
            describe_plan(&ScalePlan::ScaleUpBrokers { from: 2, to: 4 }),
            "brokers 2 -> 4"
        );
        assert_eq!(
            describe_plan(&ScalePlan::ChangePartitions {
                partitions: None,
                replication_factor: Some(3)
            }),
            "replication factor -> 3"
        );
    }

    #[test]
    fn outcome_descriptions() {
        assert_eq!(
            describe_outcome(&WatchOutcome::Outdated {
                change_id: 4,
                latest: 6
            }),
            "change 4 superseded by completed change 6"
        );
    }
}
