//! The canonical transition table.
//!
//! Every role dashboard goes through this one table; there is no
//! per-screen copy of the rules. A transition is legal only when the
//! application's live (stage, status), the acting role, and the requested
//! action exactly match a row.

use std::fmt;

use weir_storage::{Position, Role, Status};

/// Actions a role can request against an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Officer sends a drafted application into the pipeline.
    Submit,
    /// Record a stage review; stage and status do not change.
    Review,
    /// Move a reviewed application to the next stage.
    Advance,
    /// Final decision: grant the permit.
    Approve,
    /// Final decision: reject with a mandatory reason.
    Reject,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Submit => "submit",
            Action::Review => "review",
            Action::Advance => "advance",
            Action::Approve => "approve",
            Action::Reject => "reject",
        })
    }
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub from: Position,
    pub role: Role,
    pub action: Action,
    pub to: Position,
    /// Advance rows require a prior review comment by this role at the
    /// current stage (the derived "reviewed" predicate).
    pub requires_review: bool,
}

pub const TRANSITION_TABLE: &[TransitionRule] = &[
    TransitionRule {
        from: Position::new(1, Status::Unsubmitted),
        role: Role::PermittingOfficer,
        action: Action::Submit,
        to: Position::new(2, Status::Submitted),
        requires_review: false,
    },
    TransitionRule {
        from: Position::new(2, Status::Submitted),
        role: Role::Chairperson,
        action: Action::Review,
        to: Position::new(2, Status::Submitted),
        requires_review: false,
    },
    TransitionRule {
        from: Position::new(2, Status::Submitted),
        role: Role::Chairperson,
        action: Action::Advance,
        to: Position::new(3, Status::UnderReview),
        requires_review: true,
    },
    TransitionRule {
        from: Position::new(3, Status::UnderReview),
        role: Role::CatchmentManager,
        action: Action::Review,
        to: Position::new(3, Status::UnderReview),
        requires_review: false,
    },
    TransitionRule {
        from: Position::new(3, Status::UnderReview),
        role: Role::CatchmentManager,
        action: Action::Advance,
        to: Position::new(4, Status::UnderReview),
        requires_review: true,
    },
    TransitionRule {
        from: Position::new(4, Status::UnderReview),
        role: Role::CatchmentChairperson,
        action: Action::Approve,
        to: Position::new(5, Status::Approved),
        requires_review: false,
    },
    TransitionRule {
        from: Position::new(4, Status::UnderReview),
        role: Role::CatchmentChairperson,
        action: Action::Reject,
        to: Position::new(5, Status::Rejected),
        requires_review: false,
    },
];

/// Look up the table row for a live position, role, and action.
pub fn rule_for(from: Position, role: Role, action: Action) -> Option<&'static TransitionRule> {
    TRANSITION_TABLE
        .iter()
        .find(|r| r.from == from && r.role == role && r.action == action)
}

/// The (stage, status) pair a role acts on, if it owns a stage.
pub fn actionable_position(role: Role) -> Option<Position> {
    match role {
        Role::PermittingOfficer => Some(Position::new(1, Status::Unsubmitted)),
        Role::Chairperson => Some(Position::new(2, Status::Submitted)),
        Role::CatchmentManager => Some(Position::new(3, Status::UnderReview)),
        Role::CatchmentChairperson => Some(Position::new(4, Status::UnderReview)),
        Role::PermitSupervisor | Role::Ict => None,
    }
}

/// The role that owns a stage (stage 5 is terminal and owned by nobody).
pub fn stage_owner(stage: u8) -> Option<Role> {
    match stage {
        1 => Some(Role::PermittingOfficer),
        2 => Some(Role::Chairperson),
        3 => Some(Role::CatchmentManager),
        4 => Some(Role::CatchmentChairperson),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_row_is_reachable_by_lookup() {
        for row in TRANSITION_TABLE {
            let found = rule_for(row.from, row.role, row.action)
                .unwrap_or_else(|| panic!("row {:?} not found by lookup", row));
            assert_eq!(found.to, row.to);
        }
    }

    #[test]
    fn no_row_leaves_a_terminal_position() {
        for row in TRANSITION_TABLE {
            assert!(!row.from.status.is_terminal(), "row out of terminal: {:?}", row);
        }
    }

    #[test]
    fn terminal_targets_are_stage_five() {
        for row in TRANSITION_TABLE {
            if row.to.status.is_terminal() {
                assert_eq!(row.to.stage, 5, "terminal row not at stage 5: {:?}", row);
            }
        }
    }

    #[test]
    fn only_the_owning_role_matches() {
        // A chairperson cannot act on a stage 3 application in any way.
        let pos = Position::new(3, Status::UnderReview);
        for action in [
            Action::Submit,
            Action::Review,
            Action::Advance,
            Action::Approve,
            Action::Reject,
        ] {
            assert!(rule_for(pos, Role::Chairperson, action).is_none());
        }
    }

    #[test]
    fn actionable_positions_follow_stage_ownership() {
        assert_eq!(
            actionable_position(Role::CatchmentManager),
            Some(Position::new(3, Status::UnderReview))
        );
        assert_eq!(actionable_position(Role::PermitSupervisor), None);
        assert_eq!(actionable_position(Role::Ict), None);
    }

    #[test]
    fn advance_rows_require_review() {
        for row in TRANSITION_TABLE {
            assert_eq!(row.requires_review, matches!(row.action, Action::Advance));
        }
    }
}
