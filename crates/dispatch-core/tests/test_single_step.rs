//! Single-step processor behaviour against in-memory collaborators

mod common;

use common::{processed_count, start_request, HarnessBuilder, MockResolver};
use dispatch_core::campaign::{CampaignStore, LogEntry};
use dispatch_core::dispatch::SingleStepProcessor;
use dispatch_core::error::DispatchError;
use dispatch_core::types::Agent;
use dispatch_core::CampaignId;
use dispatch_types::{CampaignStatus, StepStatus};
use std::time::Duration;

#[tokio::test]
async fn test_three_valid_recipients_are_sent_then_completed() {
    let harness = HarnessBuilder::new().build();
    let campaign = harness.started(&["a@acme.io", "b@acme.io", "c@acme.io"]).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    for expected_index in 1..=3 {
        let step = processor.process(&campaign.id, false).await.unwrap();
        assert_eq!(step.status, StepStatus::Sent);
        assert_eq!(step.current_index, expected_index);
        assert_eq!(step.sent_count, expected_index);
        assert_eq!(step.total, 3);
    }

    let done = processor.process(&campaign.id, false).await.unwrap();
    assert_eq!(done.status, StepStatus::Completed);
    assert_eq!(done.sent_count, 3);

    let stored = harness.reload(&campaign.id).await;
    assert_eq!(stored.status, CampaignStatus::Completed);
    assert_eq!(stored.logs.len(), 3);
    assert_eq!(stored.logs[0].recipient, "c@acme.io");
    assert_eq!(harness.sent().len(), 3);
}

#[tokio::test]
async fn test_generic_address_is_skipped() {
    let harness = HarnessBuilder::new().build();
    let campaign = harness.started(&["info@example.com"]).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    let step = processor.process(&campaign.id, false).await.unwrap();

    assert_eq!(step.status, StepStatus::Skipped);
    assert_eq!(step.current_index, 1);
    let stored = harness.reload(&campaign.id).await;
    assert_eq!(stored.skipped_count, 1);
    assert_eq!(stored.logs[0].status, StepStatus::Skipped);
    assert!(harness.sent().is_empty());
    assert!(harness.resolver.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_domain_is_skipped_with_reason() {
    let harness = HarnessBuilder::new()
        .resolver(MockResolver::with_missing_domain("nowhere.invalid"))
        .build();
    let campaign = harness.started(&["sam@nowhere.invalid"]).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    let step = processor.process(&campaign.id, false).await.unwrap();

    assert_eq!(step.status, StepStatus::Skipped);
    let reason = step.reason.unwrap();
    assert!(reason.contains("MX") && reason.contains("domain"), "reason was {}", reason);
    assert_eq!(harness.reload(&campaign.id).await.skipped_count, 1);
}

#[tokio::test]
async fn test_turbo_flag_bypasses_validator() {
    let harness = HarnessBuilder::new().build();
    let campaign = harness.started(&["info@example.com"]).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    let step = processor.process(&campaign.id, true).await.unwrap();
    assert_eq!(step.status, StepStatus::Sent);
}

#[tokio::test]
async fn test_paused_campaign_is_echoed_without_mutation() {
    let harness = HarnessBuilder::new().build();
    let campaign = harness.started(&["a@acme.io", "b@acme.io"]).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    processor.process(&campaign.id, false).await.unwrap();
    harness.control.pause(&campaign.id).await.unwrap();
    let before = harness.reload(&campaign.id).await;

    let step = processor.process(&campaign.id, false).await.unwrap();

    assert_eq!(step.status, StepStatus::Paused);
    assert_eq!(step.current_index, 1);
    assert_eq!(harness.reload(&campaign.id).await, before);
    assert_eq!(harness.sent().len(), 1);
}

#[tokio::test]
async fn test_draft_campaign_is_echoed() {
    let harness = HarnessBuilder::new().build();
    let campaign = harness.started(&["a@acme.io"]).await;
    harness.control.pause(&campaign.id).await.unwrap();
    harness.control.reset(&campaign.id).await.unwrap();

    let processor = SingleStepProcessor::new(harness.services.clone());
    let step = processor.process(&campaign.id, false).await.unwrap();
    assert_eq!(step.status, StepStatus::Draft);
    assert_eq!(step.current_index, 0);
}

#[tokio::test]
async fn test_delivery_failure_advances_cursor() {
    let harness = HarnessBuilder::new().failing("b@acme.io").build();
    let campaign = harness.started(&["a@acme.io", "b@acme.io", "c@acme.io"]).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    let statuses: Vec<StepStatus> = {
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(processor.process(&campaign.id, false).await.unwrap().status);
        }
        out
    };

    assert_eq!(statuses, vec![StepStatus::Sent, StepStatus::Failed, StepStatus::Sent]);
    let stored = harness.reload(&campaign.id).await;
    assert_eq!((stored.sent_count, stored.failed_count, stored.current_index), (2, 1, 3));
    assert!(stored.logs[1].message.contains("mailbox unavailable"));
}

#[tokio::test]
async fn test_delivery_timeout_counts_as_failure() {
    let harness = HarnessBuilder::new()
        .send_delay(Duration::from_millis(300))
        .configure(|c| c.delivery.timeout_secs = 0)
        .build();
    let campaign = harness.started(&["a@acme.io"]).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    let step = processor.process(&campaign.id, false).await.unwrap();
    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.reason.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_counters_always_match_cursor() {
    let harness = HarnessBuilder::new().failing("d@acme.io").build();
    let emails = ["a@acme.io", "sales@acme.io", "c@acme.io", "d@acme.io", "e@acme.io"];
    let campaign = harness.started(&emails).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    let mut last_index = 0;
    loop {
        let step = processor.process(&campaign.id, false).await.unwrap();
        assert!(step.current_index >= last_index);
        assert!(step.current_index <= emails.len());
        last_index = step.current_index;

        let stored = harness.reload(&campaign.id).await;
        assert_eq!(processed_count(&stored), stored.current_index);

        if !step.status.advanced() {
            break;
        }
    }

    let stored = harness.reload(&campaign.id).await;
    assert_eq!((stored.sent_count, stored.skipped_count, stored.failed_count), (3, 1, 1));
}

#[tokio::test]
async fn test_message_is_rendered_and_signed() {
    let harness = HarnessBuilder::new().build();
    let mut request = start_request();
    request.domains = Some(vec!["one.io".into(), "two.io".into()]);
    request.rotate_domains = Some(true);
    let campaign = harness.started_with(&["a@acme.io", "b@acme.io"], request).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    processor.process(&campaign.id, false).await.unwrap();
    processor.process(&campaign.id, false).await.unwrap();

    let sent = harness.sent();
    assert_eq!(sent[0].message.from, "Ana <hello@one.io>");
    assert_eq!(sent[1].message.from, "Ana <hello@two.io>");
    assert_eq!(sent[0].message.subject, "Hello Sam");
    let text = sent[0].message.text.clone().unwrap();
    assert!(text.starts_with("Hi Sam,") || text.starts_with("Hey Sam,"));
    assert!(text.ends_with("\n\nAna"));
    assert!(sent[0].message.html.as_ref().unwrap().contains("<br>"));
}

#[tokio::test]
async fn test_personalization_replaces_content() {
    let harness = HarnessBuilder::new()
        .completer(r#"{"subject":"Custom subject","content":"Custom body"}"#)
        .build();
    harness
        .store
        .save_agent(Agent {
            id: "closer".into(),
            name: "Closer".into(),
            instructions: "Be brief".into(),
        })
        .await;

    let mut request = start_request();
    request.agent_id = Some("closer".into());
    let campaign = harness.started_with(&["a@acme.io"], request).await;

    let processor = SingleStepProcessor::new(harness.services.clone());
    processor.process(&campaign.id, false).await.unwrap();

    let sent = harness.sent();
    assert_eq!(sent[0].message.subject, "Custom subject");
    assert!(sent[0].message.text.as_ref().unwrap().starts_with("Custom body"));
}

#[tokio::test]
async fn test_unusable_personalization_keeps_template() {
    let harness = HarnessBuilder::new().completer("not json at all").build();
    harness
        .store
        .save_agent(Agent {
            id: "closer".into(),
            name: "Closer".into(),
            instructions: "Be brief".into(),
        })
        .await;

    let mut request = start_request();
    request.agent_id = Some("closer".into());
    let campaign = harness.started_with(&["a@acme.io"], request).await;

    let processor = SingleStepProcessor::new(harness.services.clone());
    let step = processor.process(&campaign.id, false).await.unwrap();

    assert_eq!(step.status, StepStatus::Sent);
    assert_eq!(harness.sent()[0].message.subject, "Hello Sam");
}

#[tokio::test]
async fn test_unknown_campaign_is_not_found() {
    let harness = HarnessBuilder::new().build();
    let processor = SingleStepProcessor::new(harness.services.clone());

    let err = processor.process(&CampaignId::new(), false).await.unwrap_err();
    assert!(matches!(err, DispatchError::NotFound(_)));
}

#[tokio::test]
async fn test_missing_snapshot_is_resolved_and_attached() {
    let harness = HarnessBuilder::new().build();
    let campaign = harness.started(&["a@acme.io", "b@acme.io"]).await;

    let mut legacy = harness.reload(&campaign.id).await;
    legacy.cached_settings = None;
    harness.store.save(&legacy).await.unwrap();

    let processor = SingleStepProcessor::new(harness.services.clone());
    processor.process(&campaign.id, false).await.unwrap();

    let stored = harness.reload(&campaign.id).await;
    assert_eq!(stored.cached_settings.unwrap().settings.default_domain, "default.io");
}

#[tokio::test]
async fn test_concurrent_writer_progress_is_merged() {
    let harness = HarnessBuilder::new().send_delay(Duration::from_millis(100)).build();
    let campaign = harness.started(&["a@acme.io", "b@acme.io", "c@acme.io"]).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    let in_flight = {
        let processor = processor.clone();
        let id = campaign.id.clone();
        tokio::spawn(async move { processor.process(&id, false).await })
    };

    // Another writer records an outcome while the first send is in flight
    tokio::time::sleep(Duration::from_millis(30)).await;
    let mut other = harness.reload(&campaign.id).await;
    other.failed_count += 1;
    other.current_index = 1;
    other.push_log(LogEntry::new(0, "a@acme.io", StepStatus::Failed, "other writer"), 50);
    harness.store.save(&other).await.unwrap();

    let step = in_flight.await.unwrap().unwrap();
    assert_eq!(step.status, StepStatus::Sent);

    let stored = harness.reload(&campaign.id).await;
    assert_eq!(stored.current_index, 1);
    assert_eq!(stored.sent_count, 1);
    assert_eq!(stored.failed_count, 1);
    assert_eq!(stored.logs.len(), 2);
}

#[tokio::test]
async fn test_outcome_from_previous_run_is_discarded_after_reset() {
    let harness = HarnessBuilder::new().send_delay(Duration::from_millis(100)).build();
    let campaign = harness.started(&["a@acme.io", "b@acme.io"]).await;
    let processor = SingleStepProcessor::new(harness.services.clone());

    let in_flight = {
        let processor = processor.clone();
        let id = campaign.id.clone();
        tokio::spawn(async move { processor.process(&id, false).await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    harness.control.pause(&campaign.id).await.unwrap();
    harness.control.reset(&campaign.id).await.unwrap();
    harness.control.start(&campaign.id, start_request()).await.unwrap();

    in_flight.await.unwrap().unwrap();

    let stored = harness.reload(&campaign.id).await;
    assert_eq!(stored.status, CampaignStatus::Processing);
    assert_eq!((stored.current_index, stored.sent_count), (0, 0));
    assert!(stored.logs.is_empty());
}
