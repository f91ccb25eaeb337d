// ABOUTME: Integration tests for post-signature tamper detection
// ABOUTME: Digest verdicts over stored proposals and signatures

mod common;

use common::{create_input, sign_request, test_context};
use sowkit_proposals::storage::ProposalStorage;
use sowkit_proposals::DigestVerdict;

#[tokio::test]
async fn unsigned_proposal_has_no_verification() {
    let ctx = test_context().await;
    let proposal = ctx
        .manager
        .create_proposal(create_input("acct-1", "Job"))
        .await
        .unwrap();
    let verification = ctx.manager.verify_signature(&proposal.id).await.unwrap();
    assert!(verification.is_none());
}

#[tokio::test]
async fn untouched_content_verifies_after_signing() {
    let ctx = test_context().await;
    let proposal = ctx
        .manager
        .create_proposal(create_input("acct-1", "Job"))
        .await
        .unwrap();
    ctx.manager.send_proposal(&proposal.id).await.unwrap();
    ctx.manager
        .sign_proposal(&proposal.token, sign_request())
        .await
        .unwrap();

    let verification = ctx
        .manager
        .verify_signature(&proposal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(verification.verdict, DigestVerdict::Verified);
}

#[tokio::test]
async fn content_edits_after_signing_are_detected() {
    let ctx = test_context().await;
    let proposal = ctx
        .manager
        .create_proposal(create_input("acct-1", "Job"))
        .await
        .unwrap();
    ctx.manager.send_proposal(&proposal.id).await.unwrap();
    ctx.manager
        .sign_proposal(&proposal.token, sign_request())
        .await
        .unwrap();

    // The manager refuses edits after acceptance, so tamper at the storage
    // layer, as a direct database edit would
    let mut tampered = ctx.manager.get_proposal(&proposal.id).await.unwrap();
    tampered.line_items[0].unit_price = 50_000.0;
    ctx.storage.update_content(&tampered).await.unwrap();

    let verification = ctx
        .manager
        .verify_signature(&proposal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(verification.verdict, DigestVerdict::Modified);
}

#[tokio::test]
async fn non_designated_changes_do_not_invalidate() {
    let ctx = test_context().await;
    let proposal = ctx
        .manager
        .create_proposal(create_input("acct-1", "Job"))
        .await
        .unwrap();
    ctx.manager.send_proposal(&proposal.id).await.unwrap();
    ctx.manager
        .sign_proposal(&proposal.token, sign_request())
        .await
        .unwrap();

    // Pricing configuration is outside the signed content
    let mut changed = ctx.manager.get_proposal(&proposal.id).await.unwrap();
    changed.tax_rate = 9.5;
    changed.show_pricing = false;
    ctx.storage.update_content(&changed).await.unwrap();

    let verification = ctx
        .manager
        .verify_signature(&proposal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(verification.verdict, DigestVerdict::Verified);
}

#[tokio::test]
async fn signature_stores_signer_identity_and_image_ref() {
    let ctx = test_context().await;
    let proposal = ctx
        .manager
        .create_proposal(create_input("acct-1", "Job"))
        .await
        .unwrap();
    ctx.manager.send_proposal(&proposal.id).await.unwrap();

    let signature = ctx
        .manager
        .sign_proposal(&proposal.token, sign_request())
        .await
        .unwrap();

    let stored = ctx
        .storage
        .get_signature(&proposal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.signer_name, "Pat Client");
    assert_eq!(stored.signer_email, "pat@client.com");
    assert_eq!(stored.signature_image_ref, Some("img/sig-1.png".to_string()));
    assert!(stored.accepted_terms);
    assert_eq!(stored.document_hash, signature.document_hash);
}
