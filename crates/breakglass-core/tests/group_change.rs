//! Integration tests for group-change suspicion classification.

mod common;

use uuid::Uuid;

use breakglass_core::{AccessGroup, GroupChange, NotificationCategory, RiskLevel};

use common::TestContext;

fn change(
    old_group: Option<AccessGroup>,
    new_group: Option<AccessGroup>,
) -> GroupChange {
    GroupChange {
        user_id: Uuid::new_v4(),
        ticket_id: "T-100".into(),
        old_group,
        new_group,
        reason: "emergency escalation".into(),
    }
}

#[tokio::test]
async fn joining_financial_from_nothing_is_high_risk() {
    let ctx = TestContext::new();
    ctx.add_admin("admin@example.com").await;

    let risk = ctx
        .classifier
        .evaluate_group_change(&change(None, Some(AccessGroup::Financial)))
        .await;
    assert_eq!(risk, Some(RiskLevel::High));

    let sent = ctx.dispatcher.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].category, NotificationCategory::SuspiciousGroupChange);
    assert!(sent[0].message.contains("none to Financial"));
    assert!(sent[0].message.contains("risk: high"));
    assert!(sent[0].message.contains("emergency escalation"));
}

#[tokio::test]
async fn hr_moves_are_medium_in_both_directions() {
    let ctx = TestContext::new();
    ctx.add_admin("admin@example.com").await;

    let risk = ctx
        .classifier
        .evaluate_group_change(&change(
            Some(AccessGroup::Logistics),
            Some(AccessGroup::Hr),
        ))
        .await;
    assert_eq!(risk, Some(RiskLevel::Medium));

    let risk = ctx
        .classifier
        .evaluate_group_change(&change(
            Some(AccessGroup::Hr),
            Some(AccessGroup::Logistics),
        ))
        .await;
    assert_eq!(risk, Some(RiskLevel::Medium));

    assert_eq!(
        ctx.dispatcher
            .count_for(NotificationCategory::SuspiciousGroupChange)
            .await,
        2
    );
}

#[tokio::test]
async fn leaving_logistics_is_routine() {
    let ctx = TestContext::new();
    ctx.add_admin("admin@example.com").await;

    let risk = ctx
        .classifier
        .evaluate_group_change(&change(Some(AccessGroup::Logistics), None))
        .await;
    assert_eq!(risk, None);
    assert!(ctx.dispatcher.sent().await.is_empty());
}

#[tokio::test]
async fn unchanged_membership_is_never_reported() {
    let ctx = TestContext::new();
    ctx.add_admin("admin@example.com").await;

    let risk = ctx
        .classifier
        .evaluate_group_change(&change(Some(AccessGroup::Hr), Some(AccessGroup::Hr)))
        .await;
    assert_eq!(risk, None);

    let risk = ctx.classifier.evaluate_group_change(&change(None, None)).await;
    assert_eq!(risk, None);

    assert!(ctx.dispatcher.sent().await.is_empty());
}

#[tokio::test]
async fn unrecognized_group_reports_raw_id_at_low_risk() {
    let ctx = TestContext::new();
    ctx.add_admin("admin@example.com").await;

    let risk = ctx
        .classifier
        .evaluate_group_change(&change(None, Some(AccessGroup::from_id(42))))
        .await;
    assert_eq!(risk, Some(RiskLevel::Low));

    let sent = ctx.dispatcher.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("Group ID: 42"));
    assert!(sent[0].message.contains("risk: low"));
}

#[tokio::test]
async fn every_admin_is_notified_with_failure_isolation() {
    let ctx = TestContext::new();
    ctx.add_admin("a@example.com").await;
    ctx.add_admin("b@example.com").await;
    ctx.add_admin("c@example.com").await;
    ctx.dispatcher.fail_for("b@example.com").await;

    ctx.classifier
        .evaluate_group_change(&change(
            Some(AccessGroup::Hr),
            Some(AccessGroup::Management),
        ))
        .await;

    let sent = ctx.dispatcher.sent().await;
    assert_eq!(sent.len(), 2);
    let recipients: Vec<_> = sent.iter().map(|n| n.recipient.as_str()).collect();
    assert!(recipients.contains(&"a@example.com"));
    assert!(recipients.contains(&"c@example.com"));
}

#[tokio::test]
async fn zero_admins_means_zero_sends() {
    let ctx = TestContext::new();

    let risk = ctx
        .classifier
        .evaluate_group_change(&change(None, Some(AccessGroup::Management)))
        .await;
    assert_eq!(risk, Some(RiskLevel::High));
    assert!(ctx.dispatcher.sent().await.is_empty());
}
