use crate::types::{ProposalCreateInput, ProposalUpdateInput};

/// Validation errors for proposal data
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// Validates proposal data for creation
pub fn validate_proposal_data(data: &ProposalCreateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if data.title.trim().is_empty() {
        errors.push(ValidationError::new("title", "Proposal title is required"));
    }

    if data.account_id.trim().is_empty() {
        errors.push(ValidationError::new("accountId", "Account id is required"));
    }

    // Templates carry no client; live proposals need a reachable signer
    if !data.is_template {
        if data.client_email.trim().is_empty() {
            errors.push(ValidationError::new(
                "clientEmail",
                "Client email is required",
            ));
        } else if !looks_like_email(&data.client_email) {
            errors.push(ValidationError::new(
                "clientEmail",
                format!("Client email is not valid: {}", data.client_email),
            ));
        }
    }

    if let (Some(expires), Some(proposal_date)) = (data.expiration_date, data.proposal_date) {
        if expires < proposal_date {
            errors.push(ValidationError::new(
                "expirationDate",
                "Expiration date cannot precede the proposal date",
            ));
        }
    }

    for item in &data.line_items {
        if item.description.trim().is_empty() {
            errors.push(ValidationError::new(
                "lineItems",
                "Line item descriptions cannot be empty",
            ));
            break;
        }
    }

    for section in &data.sections {
        if section.title.trim().is_empty() {
            errors.push(ValidationError::new(
                "sections",
                "Section titles cannot be empty",
            ));
            break;
        }
    }

    errors
}

/// Validates proposal update data
pub fn validate_proposal_update(data: &ProposalUpdateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(ref title) = data.title {
        if title.trim().is_empty() {
            errors.push(ValidationError::new("title", "Proposal title cannot be empty"));
        }
    }

    if let Some(ref email) = data.client_email {
        if !email.trim().is_empty() && !looks_like_email(email) {
            errors.push(ValidationError::new(
                "clientEmail",
                format!("Client email is not valid: {email}"),
            ));
        }
    }

    if let Some(ref items) = data.line_items {
        for item in items {
            if item.description.trim().is_empty() {
                errors.push(ValidationError::new(
                    "lineItems",
                    "Line item descriptions cannot be empty",
                ));
                break;
            }
        }
    }

    if let Some(ref sections) = data.sections {
        for section in sections {
            if section.title.trim().is_empty() {
                errors.push(ValidationError::new(
                    "sections",
                    "Section titles cannot be empty",
                ));
                break;
            }
        }
    }

    errors
}
