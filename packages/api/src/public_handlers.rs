// ABOUTME: Recipient-facing endpoints addressed by public token
// ABOUTME: Token read fires the one-time viewed transition; errors stay generic

use crate::response::{public_error, ApiResponse};
use crate::AppState;
use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json as ResponseJson},
};
use serde::Serialize;
use sowkit_proposals::pricing::ProposalTotals;
use sowkit_proposals::types::{Proposal, ProposalSignature, SignatureRequest};
use sowkit_proposals::Viewer;

/// Header set by the session layer when the caller is an authenticated
/// account owner previewing their own proposal. Anonymous requests are
/// recipients. Owner/recipient resolution itself is a session concern.
const ACCOUNT_HEADER: &str = "x-account-id";

#[derive(Serialize)]
pub struct PublicProposalPayload {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub signature: Option<ProposalSignature>,
    pub totals: ProposalTotals,
    #[serde(rename = "documentNumber")]
    pub document_number: Option<String>,
}

fn resolve_viewer(headers: &HeaderMap, proposal_account: &str) -> Viewer {
    match headers.get(ACCOUNT_HEADER).and_then(|v| v.to_str().ok()) {
        Some(account_id) if account_id == proposal_account => Viewer::Owner,
        _ => Viewer::Recipient,
    }
}

/// Read a proposal through its public token. The first recipient open of a
/// sent proposal transitions it to viewed; owner previews never do.
pub async fn get_public_proposal(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    // Resolve the viewer against the stored account before the transition
    let account_id = match state.manager.get_proposal_by_token(&token).await {
        Ok(proposal) => proposal.account_id,
        Err(error) => return public_error(error),
    };
    let viewer = resolve_viewer(&headers, &account_id);

    let view = match state.manager.open_proposal(&token, viewer).await {
        Ok(view) => view,
        Err(error) => return public_error(error),
    };
    let document_number = match state.manager.document_number(&view.proposal).await {
        Ok(document_number) => document_number,
        Err(error) => return public_error(error),
    };

    let totals = view.proposal.totals();
    ResponseJson(ApiResponse::success(PublicProposalPayload {
        proposal: view.proposal,
        signature: view.signature,
        totals,
        document_number,
    }))
    .into_response()
}

/// Sign a proposal: signer identity, an already-durable signature image
/// reference, and terms acceptance.
pub async fn sign_public_proposal(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<SignatureRequest>,
) -> impl IntoResponse {
    match state.manager.sign_proposal(&token, request).await {
        Ok(signature) => (
            StatusCode::CREATED,
            ResponseJson(ApiResponse::success(signature)),
        )
            .into_response(),
        Err(error) => public_error(error),
    }
}
