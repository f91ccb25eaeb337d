use crate::response::{ApiResponse, ManagerErrorResponse};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
};
use serde::{Deserialize, Serialize};
use sowkit_proposals::pricing::ProposalTotals;
use sowkit_proposals::types::{
    Proposal, ProposalCreateInput, ProposalFilter, ProposalStatus, ProposalUpdateInput, SowPrefix,
};
use sowkit_proposals::SignatureVerification;
use tracing::info;

/// A proposal together with its derived display data. Totals are recomputed
/// from current content on every read.
#[derive(Serialize)]
pub struct ProposalDetail {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub totals: ProposalTotals,
    #[serde(rename = "documentNumber")]
    pub document_number: Option<String>,
}

/// Query parameters for listing proposals
#[derive(Deserialize)]
pub struct ListProposalsQuery {
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub status: Option<ProposalStatus>,
    #[serde(rename = "isTemplate")]
    pub is_template: Option<bool>,
}

/// Request body for an explicit status change
#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: ProposalStatus,
}

/// Request body for setting the account SOW prefix
#[derive(Deserialize)]
pub struct SetPrefixRequest {
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub prefix: String,
}

/// List proposals for an account, optionally filtered by status or kind
pub async fn list_proposals(
    State(state): State<AppState>,
    Query(query): Query<ListProposalsQuery>,
) -> impl IntoResponse {
    let filter = ProposalFilter {
        status: query.status,
        is_template: query.is_template,
    };
    match state
        .manager
        .list_proposals(&query.account_id, &filter)
        .await
    {
        Ok(proposals) => ResponseJson(ApiResponse::success(proposals)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Create a proposal or template
pub async fn create_proposal(
    State(state): State<AppState>,
    Json(input): Json<ProposalCreateInput>,
) -> impl IntoResponse {
    match state.manager.create_proposal(input).await {
        Ok(proposal) => {
            info!("Created proposal: {}", proposal.id);
            (
                StatusCode::CREATED,
                ResponseJson(ApiResponse::success(proposal)),
            )
                .into_response()
        }
        Err(error) => error.into_response(),
    }
}

/// Get a proposal with computed totals and its display document number
pub async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let proposal = match state.manager.get_proposal(&id).await {
        Ok(proposal) => proposal,
        Err(error) => return error.into_response(),
    };
    let document_number = match state.manager.document_number(&proposal).await {
        Ok(document_number) => document_number,
        Err(error) => return error.into_response(),
    };
    let totals = proposal.totals();
    ResponseJson(ApiResponse::success(ProposalDetail {
        proposal,
        totals,
        document_number,
    }))
    .into_response()
}

/// Update proposal content; rejected once the status is terminal
pub async fn update_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ProposalUpdateInput>,
) -> impl IntoResponse {
    match state.manager.update_proposal(&id, input).await {
        Ok(proposal) => ResponseJson(ApiResponse::success(proposal)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Delete a template or still-editable proposal
pub async fn delete_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.manager.delete_proposal(&id).await {
        Ok(()) => ResponseJson(ApiResponse::success(())).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Send the proposal to the client
pub async fn send_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.manager.send_proposal(&id).await {
        Ok(proposal) => ResponseJson(ApiResponse::success(proposal)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Explicit status change, restricted to the user-settable subset
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetStatusRequest>,
) -> impl IntoResponse {
    match state.manager.set_status(&id, request.status).await {
        Ok(proposal) => ResponseJson(ApiResponse::success(proposal)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Signature verification view: recomputes the digest and reports whether
/// content changed since signing. Advisory only.
pub async fn get_verification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.manager.verify_signature(&id).await {
        Ok(verification) => {
            ResponseJson(ApiResponse::<Option<SignatureVerification>>::success(
                verification,
            ))
            .into_response()
        }
        Err(error) => error.into_response(),
    }
}

/// Set the account's document number prefix (1-10 digits, set once)
pub async fn set_prefix(
    State(state): State<AppState>,
    Json(request): Json<SetPrefixRequest>,
) -> impl IntoResponse {
    match state
        .manager
        .set_prefix(&request.account_id, &request.prefix)
        .await
    {
        Ok(prefix) => ResponseJson(ApiResponse::success(prefix)).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Get the account's document number prefix, if one has been set
pub async fn get_prefix(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> impl IntoResponse {
    match state.manager.get_prefix(&account_id).await {
        Ok(prefix) => {
            ResponseJson(ApiResponse::<Option<SowPrefix>>::success(prefix)).into_response()
        }
        Err(error) => error.into_response(),
    }
}
