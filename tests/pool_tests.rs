mod common;

use common::{ScriptedGateway, harness_with, member};
use gymsms::application::dispatcher::DispatchRequest;
use gymsms::application::worker::PoolConfig;
use gymsms::domain::campaign::CampaignStatus;
use gymsms::domain::ports::CampaignStore;
use gymsms::domain::template::{MessageType, Placeholders};
use gymsms::error::DispatchError;
use gymsms::infrastructure::seed::default_templates;
use std::time::Duration;

fn request(id: u64) -> DispatchRequest {
    DispatchRequest::new(
        member(id, &format!("Member{}", id), "0712345678"),
        MessageType::SubscriptionReminder,
        Placeholders::new().with("firstName", format!("Member{}", id)),
    )
}

#[tokio::test]
async fn test_full_queue_runs_on_caller_without_dropping() {
    let config = PoolConfig {
        workers: 1,
        queue_capacity: 1,
    };
    let h = harness_with(
        ScriptedGateway::accepting().with_delay(Duration::from_millis(50)),
        default_templates(),
        config,
    );
    let handle = h.pool.handle();

    let mut tickets = Vec::new();
    for id in 1..=6 {
        tickets.push(handle.submit(request(id)).await.unwrap());
    }
    for ticket in tickets {
        assert!(ticket.outcome().await.unwrap().delivered);
    }

    let campaigns = h.campaigns.get_all().await.unwrap();
    assert_eq!(campaigns.len(), 6);
    assert!(campaigns.iter().all(|c| c.status == CampaignStatus::Sent));
}

#[tokio::test]
async fn test_shutdown_drains_queued_work() {
    let config = PoolConfig {
        workers: 2,
        queue_capacity: 64,
    };
    let h = harness_with(
        ScriptedGateway::accepting().with_delay(Duration::from_millis(20)),
        default_templates(),
        config,
    );
    let handle = h.pool.handle();

    let mut tickets = Vec::new();
    for id in 1..=20 {
        tickets.push(handle.submit(request(id)).await.unwrap());
    }
    h.pool.shutdown().await.unwrap();

    for ticket in tickets {
        assert!(ticket.outcome().await.unwrap().delivered);
    }
    assert_eq!(h.gateway.sent().len(), 20);
    assert_eq!(h.campaigns.get_all().await.unwrap().len(), 20);
}

#[tokio::test]
async fn test_submit_after_shutdown_is_rejected() {
    let h = harness_with(ScriptedGateway::accepting(), default_templates(), PoolConfig::default());
    let handle = h.pool.handle();
    h.pool.shutdown().await.unwrap();

    assert!(matches!(
        handle.submit(request(1)).await,
        Err(DispatchError::PoolClosed)
    ));
    assert!(h.gateway.sent().is_empty());
}

#[tokio::test]
async fn test_engine_errors_travel_through_ticket() {
    let h = harness_with(ScriptedGateway::accepting(), default_templates(), PoolConfig::default());

    let result = h.pool.handle().dispatch(DispatchRequest::default()).await;
    assert!(matches!(result, Err(DispatchError::InvalidInput(_))));
}
