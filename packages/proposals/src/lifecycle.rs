// ABOUTME: Proposal status state machine
// ABOUTME: Single transition function validating (current state, trigger) pairs

use crate::types::ProposalStatus;
use std::fmt;
use thiserror::Error;

/// Events that move a proposal between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Owner sends (or re-sends) the proposal to the client
    Send,
    /// A non-owner opened the public link; fires at most once
    RecipientViewed,
    /// Recipient completed signing
    Sign,
    /// Recipient or owner declined
    Decline,
    /// Expiration date passed; applied lazily on read
    Expire,
    /// Owner assigns a status directly (user-settable subset only)
    SetStatus(ProposalStatus),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Send => write!(f, "send"),
            Trigger::RecipientViewed => write!(f, "recipient_viewed"),
            Trigger::Sign => write!(f, "sign"),
            Trigger::Decline => write!(f, "decline"),
            Trigger::Expire => write!(f, "expire"),
            Trigger::SetStatus(status) => write!(f, "set_status({status})"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid transition: cannot apply '{trigger}' while '{from}'")]
    InvalidTransition {
        from: ProposalStatus,
        trigger: String,
    },
}

impl LifecycleError {
    fn invalid(from: ProposalStatus, trigger: Trigger) -> Self {
        LifecycleError::InvalidTransition {
            from,
            trigger: trigger.to_string(),
        }
    }
}

/// Validate a trigger against the current status and return the new status.
///
/// Every status write in the crate goes through here; a rejected transition
/// leaves the proposal in its prior state.
pub fn transition(
    current: ProposalStatus,
    trigger: Trigger,
) -> Result<ProposalStatus, LifecycleError> {
    use ProposalStatus::*;

    match trigger {
        Trigger::Send => match current {
            Draft | Sent | Viewed | OnHold => Ok(Sent),
            _ => Err(LifecycleError::invalid(current, trigger)),
        },
        Trigger::RecipientViewed => match current {
            Sent => Ok(Viewed),
            _ => Err(LifecycleError::invalid(current, trigger)),
        },
        Trigger::Sign => match current {
            Sent | Viewed | OnHold => Ok(Accepted),
            _ => Err(LifecycleError::invalid(current, trigger)),
        },
        Trigger::Decline => match current {
            Sent | Viewed | OnHold => Ok(Declined),
            _ => Err(LifecycleError::invalid(current, trigger)),
        },
        Trigger::Expire => {
            if current.is_terminal() {
                Err(LifecycleError::invalid(current, trigger))
            } else {
                Ok(Expired)
            }
        }
        Trigger::SetStatus(target) => {
            if !target.is_user_settable() {
                return Err(LifecycleError::invalid(current, trigger));
            }
            match current {
                Draft | Sent | Viewed | OnHold => Ok(target),
                _ => Err(LifecycleError::invalid(current, trigger)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProposalStatus::*;

    #[test]
    fn send_allowed_from_working_states() {
        for from in [Draft, Sent, Viewed, OnHold] {
            assert_eq!(transition(from, Trigger::Send), Ok(Sent));
        }
    }

    #[test]
    fn send_rejected_from_terminal_states() {
        for from in [Accepted, Declined, Expired] {
            assert!(transition(from, Trigger::Send).is_err());
        }
    }

    #[test]
    fn viewed_only_from_sent() {
        assert_eq!(transition(Sent, Trigger::RecipientViewed), Ok(Viewed));
        for from in [Draft, Viewed, OnHold, Accepted, Declined, Expired] {
            assert!(transition(from, Trigger::RecipientViewed).is_err());
        }
    }

    #[test]
    fn sign_from_client_actionable_states() {
        for from in [Sent, Viewed, OnHold] {
            assert_eq!(transition(from, Trigger::Sign), Ok(Accepted));
        }
        assert!(transition(Draft, Trigger::Sign).is_err());
        assert!(transition(Accepted, Trigger::Sign).is_err());
    }

    #[test]
    fn decline_from_client_actionable_states() {
        for from in [Sent, Viewed, OnHold] {
            assert_eq!(transition(from, Trigger::Decline), Ok(Declined));
        }
        assert!(transition(Draft, Trigger::Decline).is_err());
        assert!(transition(Expired, Trigger::Decline).is_err());
    }

    #[test]
    fn expire_from_any_non_terminal() {
        for from in [Draft, Sent, Viewed, OnHold] {
            assert_eq!(transition(from, Trigger::Expire), Ok(Expired));
        }
        for from in [Accepted, Declined, Expired] {
            assert!(transition(from, Trigger::Expire).is_err());
        }
    }

    #[test]
    fn set_status_restricted_to_user_settable_targets() {
        assert_eq!(transition(Draft, Trigger::SetStatus(OnHold)), Ok(OnHold));
        assert_eq!(transition(Viewed, Trigger::SetStatus(Accepted)), Ok(Accepted));
        assert!(transition(Draft, Trigger::SetStatus(Viewed)).is_err());
        assert!(transition(Draft, Trigger::SetStatus(Expired)).is_err());
    }

    #[test]
    fn set_status_rejected_from_terminal_states() {
        assert!(transition(Accepted, Trigger::SetStatus(Draft)).is_err());
        assert!(transition(Declined, Trigger::SetStatus(Sent)).is_err());
        assert!(transition(Expired, Trigger::SetStatus(Draft)).is_err());
    }

    #[test]
    fn rejected_transition_reports_source_state() {
        let err = transition(Accepted, Trigger::Send).unwrap_err();
        match err {
            LifecycleError::InvalidTransition { from, .. } => assert_eq!(from, Accepted),
        }
    }
}
