//! Transition controller: which step is visible and where "next" and
//! "back" lead for the selected roles.
//!
//! Steps: RoleSelection (0) → Identity (1) → RoleDetails (2) →
//! BusinessDetails (3). Customer-only registrations stop after Identity.

use serde::{Deserialize, Serialize};

use super::role::RoleSet;

/// The screens of the registration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    RoleSelection,
    Identity,
    RoleDetails,
    BusinessDetails,
}

impl Step {
    pub fn from_index(index: usize) -> Option<Step> {
        match index {
            0 => Some(Self::RoleSelection),
            1 => Some(Self::Identity),
            2 => Some(Self::RoleDetails),
            3 => Some(Self::BusinessDetails),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::RoleSelection => 0,
            Self::Identity => 1,
            Self::RoleDetails => 2,
            Self::BusinessDetails => 3,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RoleSelection => "role_selection",
            Self::Identity => "identity",
            Self::RoleDetails => "role_details",
            Self::BusinessDetails => "business_details",
        };
        write!(f, "{s}")
    }
}

/// Direction of the most recent transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    #[default]
    None,
}

/// Where the user currently is in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPosition {
    pub step_index: usize,
    pub total_steps: usize,
    pub direction: Direction,
}

impl WorkflowPosition {
    /// Initial position. A pre-selected role skips role selection.
    pub fn start(roles: &RoleSet, preselected: bool) -> Self {
        let total_steps = compute_total_steps(roles);
        let first = if preselected { 1 } else { 0 };
        Self {
            step_index: first.min(total_steps),
            total_steps,
            direction: Direction::None,
        }
    }

    pub fn step(&self) -> Option<Step> {
        Step::from_index(self.step_index)
    }

    pub fn is_terminal(&self) -> bool {
        self.step_index == self.total_steps
    }
}

/// Outcome of moving forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next step.
    Moved(WorkflowPosition),
    /// Already at the last step; the caller must submit instead.
    Terminal(WorkflowPosition),
}

/// Outcome of moving backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retreat {
    /// Moved to the previous step (or stayed at the first reachable one).
    Moved(WorkflowPosition),
    /// Back from the first step of a pre-selected flow: leave the workflow
    /// for the external role-selection surface.
    ExitToRoleSelection(WorkflowPosition),
}

/// Number of the last step for a role set: 1 for {customer}, else 3.
pub fn compute_total_steps(roles: &RoleSet) -> usize {
    if roles.is_customer_only() { 1 } else { 3 }
}

pub fn advance(position: WorkflowPosition, roles: &RoleSet) -> Advance {
    let total_steps = compute_total_steps(roles);
    let mut next = WorkflowPosition {
        step_index: position.step_index.min(total_steps),
        total_steps,
        direction: Direction::Forward,
    };
    if next.is_terminal() {
        return Advance::Terminal(next);
    }
    next.step_index = (next.step_index + 1).min(total_steps);
    Advance::Moved(next)
}

pub fn retreat(position: WorkflowPosition, has_preselected_role: bool) -> Retreat {
    let mut next = WorkflowPosition {
        direction: Direction::Backward,
        ..position
    };
    if has_preselected_role && position.step_index == 1 {
        return Retreat::ExitToRoleSelection(next);
    }
    let floor = if has_preselected_role { 1 } else { 0 };
    next.step_index = position.step_index.saturating_sub(1).max(floor);
    Retreat::Moved(next)
}

/// Recompute the step count after the role set changed and clamp the
/// current step into range.
pub fn reclamp(position: WorkflowPosition, roles: &RoleSet) -> WorkflowPosition {
    let total_steps = compute_total_steps(roles);
    WorkflowPosition {
        step_index: position.step_index.min(total_steps),
        total_steps,
        direction: position.direction,
    }
}
