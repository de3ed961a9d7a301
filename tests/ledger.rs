//! Ledger Integration Tests
//!
//! Bounded history, ordering and persistence of distribution reports.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use solar_fanout::adapters::{ChannelKind, SimulatedChannel, StaticContextProvider};
use solar_fanout::core::{ContentStrategyCatalog, DistributionCoordinator, DistributionLedger};
use solar_fanout::domain::{ContentRequest, ContextData, ContextSource, DistributionReport};
use solar_fanout::error::GenerationError;
use solar_fanout::ContentGenerator;

struct EchoGenerator;

#[async_trait::async_trait]
impl ContentGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: &ContentRequest) -> Result<String, GenerationError> {
        Ok(format!("{} for {}", request.content_type, request.channel_id))
    }
}

fn empty_report() -> DistributionReport {
    let now = Utc::now();
    DistributionReport::new(Uuid::new_v4(), Vec::new(), now, now, ContextSource::Live)
}

fn coordinator(ledger: DistributionLedger) -> DistributionCoordinator {
    DistributionCoordinator::builder(
        ContentStrategyCatalog::builtin(),
        Arc::new(EchoGenerator),
        Arc::new(StaticContextProvider::new(ContextData::solar_defaults())),
    )
    .channel(SimulatedChannel::new("linkedin", ChannelKind::ProfessionalNetwork))
    .channel(SimulatedChannel::new("reddit", ChannelKind::Forum))
    .ledger(ledger)
    .build()
    .unwrap()
}

#[tokio::test]
async fn test_two_runs_are_recorded_in_order() {
    let coordinator = coordinator(DistributionLedger::in_memory(10));

    let first = coordinator.distribute().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    let second = coordinator.distribute().await.unwrap();

    let history = coordinator.history(2).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].run_id, first.run_id);
    assert_eq!(history[1].run_id, second.run_id);
    assert!(history[0].started_at < history[1].started_at);
    assert_eq!(coordinator.runs_recorded().await, 2);
}

#[test]
fn test_cap_keeps_only_most_recent_reports() {
    let mut ledger = DistributionLedger::in_memory(1000);

    let mut run_ids = Vec::new();
    for _ in 0..1001 {
        let report = empty_report();
        run_ids.push(report.run_id);
        ledger.append(report).unwrap();
    }

    assert_eq!(ledger.len(), 1000);
    assert_eq!(ledger.runs_recorded(), 1001);

    let recent: Vec<Uuid> = ledger.recent(1000).iter().map(|r| r.run_id).collect();
    assert_eq!(recent, run_ids[1..].to_vec());

    // Asking for more than is held returns what is held
    assert_eq!(ledger.recent(5000).len(), 1000);
}

#[tokio::test]
async fn test_persisted_history_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.jsonl");

    let (first, second) = {
        let ledger = DistributionLedger::open(&path, 50).await.unwrap();
        let coordinator = coordinator(ledger);
        let first = coordinator.distribute().await.unwrap();
        let second = coordinator.distribute().await.unwrap();
        (first, second)
    };

    let reopened = DistributionLedger::open(&path, 50).await.unwrap();
    assert_eq!(reopened.runs_recorded(), 2);

    let history = reopened.recent(10);
    assert_eq!(history, vec![first, second]);

    // Rotation continues from the recorded run count
    let coordinator = coordinator(reopened);
    let third = coordinator.distribute().await.unwrap();
    let linkedin = third.result_for("linkedin").unwrap();
    assert_eq!(linkedin.body(), Some("industry_trend for linkedin"));
}

#[tokio::test]
async fn test_reopen_respects_smaller_cap() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.jsonl");

    let mut ledger = DistributionLedger::open(&path, 10).await.unwrap();
    let mut run_ids = Vec::new();
    for _ in 0..5 {
        let report = empty_report();
        run_ids.push(report.run_id);
        ledger.append(report).unwrap();
    }

    let reopened = DistributionLedger::open(&path, 3).await.unwrap();
    let recent: Vec<Uuid> = reopened.recent(10).iter().map(|r| r.run_id).collect();
    assert_eq!(recent, run_ids[2..].to_vec());
    assert_eq!(reopened.runs_recorded(), 5);
}
