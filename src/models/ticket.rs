// src/models/ticket.rs
//! Negotiation state kept between rounds.

use crate::models::claims::ClaimSet;
use crate::models::permission::Permission;
use crate::models::requirements::Requirements;
use serde::{Deserialize, Serialize};

/// Working state of one negotiation.
///
/// # Fields
/// - `permissions`: what the requester asked for
/// - `required`: outstanding proof per permission, index-aligned with
///   `permissions`; an empty entry means that permission is granted and a
///   missing entry means no policy can ever grant it
/// - `provided`: claims verified so far, across rounds
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Ticket {
    pub permissions: Vec<Permission>,
    pub required: Vec<Requirements>,
    #[serde(default)]
    pub provided: ClaimSet,
}

impl Ticket {
    pub fn new(permissions: Vec<Permission>, required: Vec<Requirements>) -> Self {
        Self { permissions, required, provided: ClaimSet::new() }
    }

    /// Every permission has a requirements entry and all of them are empty.
    pub fn is_fully_satisfied(&self) -> bool {
        self.required.len() == self.permissions.len() && self.required.iter().all(Requirements::is_empty)
    }
}

/// Outcome of trying to resolve a ticket.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Every requested permission may be granted.
    Success(Vec<Permission>),
    Failure,
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        matches!(self, Resolution::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::WEBID;
    use crate::models::requirements::ClaimPredicate;

    #[test]
    fn test_missing_requirements_are_not_satisfied() {
        let ticket = Ticket::new(vec![Permission::new("R1", ["read"])], vec![]);
        assert!(!ticket.is_fully_satisfied());
    }

    #[test]
    fn test_satisfaction() {
        let open = Ticket::new(vec![Permission::new("R1", ["read"])], vec![Requirements::new()]);
        assert!(open.is_fully_satisfied());

        let pending = Ticket::new(
            vec![Permission::new("R1", ["read"])],
            vec![Requirements::new().with(WEBID, ClaimPredicate::Any)],
        );
        assert!(!pending.is_fully_satisfied());
    }

    #[test]
    fn test_ticket_survives_json() {
        let ticket = Ticket::new(
            vec![Permission::new("R1", ["read"])],
            vec![Requirements::new().with(WEBID, ClaimPredicate::Any)],
        );
        let json = serde_json::to_string(&ticket).unwrap();
        let back: Ticket = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ticket);
    }
}
