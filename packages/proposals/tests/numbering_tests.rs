// ABOUTME: Integration tests for sequential document numbering and prefixes
// ABOUTME: Covers gap handling, template exclusion, and prefix locking

mod common;

use common::{create_input, test_context};
use sowkit_proposals::storage::ProposalStorage;
use sowkit_proposals::ManagerError;

#[tokio::test]
async fn first_proposal_gets_sequence_one() {
    let ctx = test_context().await;
    let proposal = ctx
        .manager
        .create_proposal(create_input("acct-1", "First"))
        .await
        .unwrap();
    assert_eq!(proposal.sow_number, Some(1));
}

#[tokio::test]
async fn sequence_continues_from_max_with_gaps() {
    let ctx = test_context().await;

    let mut ids = Vec::new();
    for n in 1..=5 {
        let proposal = ctx
            .manager
            .create_proposal(create_input("acct-1", &format!("Proposal {n}")))
            .await
            .unwrap();
        assert_eq!(proposal.sow_number, Some(n));
        ids.push(proposal.id);
    }

    // Deleting 2 and 4 leaves numbers {1, 3, 5}; the next is max + 1 = 6
    ctx.manager.delete_proposal(&ids[1]).await.unwrap();
    ctx.manager.delete_proposal(&ids[3]).await.unwrap();

    let next = ctx
        .manager
        .create_proposal(create_input("acct-1", "After gaps"))
        .await
        .unwrap();
    assert_eq!(next.sow_number, Some(6));
}

#[tokio::test]
async fn sequences_are_scoped_per_account() {
    let ctx = test_context().await;
    let a = ctx
        .manager
        .create_proposal(create_input("acct-a", "A1"))
        .await
        .unwrap();
    let b = ctx
        .manager
        .create_proposal(create_input("acct-b", "B1"))
        .await
        .unwrap();
    assert_eq!(a.sow_number, Some(1));
    assert_eq!(b.sow_number, Some(1));
}

#[tokio::test]
async fn templates_never_receive_a_number() {
    let ctx = test_context().await;
    let mut input = create_input("acct-1", "Template");
    input.is_template = true;
    input.client_email = String::new();

    let template = ctx.manager.create_proposal(input).await.unwrap();
    assert_eq!(template.sow_number, None);

    // Template creation does not consume a sequence slot
    let live = ctx
        .manager
        .create_proposal(create_input("acct-1", "Live"))
        .await
        .unwrap();
    assert_eq!(live.sow_number, Some(1));
}

#[tokio::test]
async fn invalid_prefixes_are_rejected() {
    let ctx = test_context().await;
    for candidate in ["", "abc", "12a", "12345678901"] {
        let result = ctx.manager.set_prefix("acct-1", candidate).await;
        assert!(
            matches!(result, Err(ManagerError::InvalidPrefix(_))),
            "candidate {candidate:?} should be rejected"
        );
    }
}

#[tokio::test]
async fn prefix_locks_on_first_use_and_cannot_change() {
    let ctx = test_context().await;

    let prefix = ctx.manager.set_prefix("acct-1", "031").await.unwrap();
    assert_eq!(prefix.prefix, "031");
    assert!(!prefix.locked);

    let proposal = ctx
        .manager
        .create_proposal(create_input("acct-1", "First"))
        .await
        .unwrap();
    assert_eq!(proposal.sow_number, Some(1));

    let locked = ctx.manager.get_prefix("acct-1").await.unwrap().unwrap();
    assert!(locked.locked);

    // A differing candidate is ignored; the original prefix survives
    let after = ctx.manager.set_prefix("acct-1", "099").await.unwrap();
    assert_eq!(after.prefix, "031");
    assert!(after.locked);

    let display = ctx.manager.document_number(&proposal).await.unwrap();
    assert_eq!(display, Some("0311".to_string()));
}

#[tokio::test]
async fn document_number_without_prefix_is_bare_sequence() {
    let ctx = test_context().await;
    let proposal = ctx
        .manager
        .create_proposal(create_input("acct-1", "No prefix yet"))
        .await
        .unwrap();
    let display = ctx.manager.document_number(&proposal).await.unwrap();
    assert_eq!(display, Some("1".to_string()));
}

#[tokio::test]
async fn template_has_no_document_number() {
    let ctx = test_context().await;
    let mut input = create_input("acct-1", "Template");
    input.is_template = true;
    let template = ctx.manager.create_proposal(input).await.unwrap();
    let display = ctx.manager.document_number(&template).await.unwrap();
    assert_eq!(display, None);
}

#[tokio::test]
async fn concurrent_creations_get_distinct_numbers() {
    let ctx = test_context().await;

    let mut handles = Vec::new();
    for n in 0..4 {
        let manager = ctx.manager.clone();
        handles.push(tokio::spawn(async move {
            manager
                .create_proposal(create_input("acct-1", &format!("Concurrent {n}")))
                .await
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        let proposal = handle.await.unwrap().unwrap();
        numbers.push(proposal.sow_number.unwrap());
    }
    numbers.sort_unstable();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn max_sow_number_ignores_templates() {
    let ctx = test_context().await;
    ctx.manager
        .create_proposal(create_input("acct-1", "Live"))
        .await
        .unwrap();
    let mut input = create_input("acct-1", "Template");
    input.is_template = true;
    ctx.manager.create_proposal(input).await.unwrap();

    let max = ctx.storage.max_sow_number("acct-1").await.unwrap();
    assert_eq!(max, Some(1));
}
