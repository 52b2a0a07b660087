//src/permissions.rs
use crate::model::Day;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

/// Effective collaborator rights for the requesting user on one plan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumIter, EnumString,
)]
pub enum PermissionLevel {
    /// Read-only collaborator.
    Viewer,
    /// Content edits (parameters, sets) and structural moves, but no
    /// destructive plan-level actions such as removing a week.
    Editor,
    /// Full structural rights.
    Admin,
    /// Plan creator; full rights.
    Owner,
}

impl PermissionLevel {
    #[must_use]
    pub fn can_edit_structure(self) -> bool {
        self >= Self::Editor
    }

    #[must_use]
    pub fn can_edit_content(self) -> bool {
        self >= Self::Editor
    }

    /// Destructive plan-level actions (remove week).
    #[must_use]
    pub fn can_destroy_structure(self) -> bool {
        self >= Self::Admin
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GateError {
    #[error("{0} rights are not sufficient for this edit")]
    InsufficientRights(PermissionLevel),
    #[error("Day is marked complete and cannot be modified")]
    DayCompleted,
}

/// Rejects structural mutations for insufficient rights. Checked before
/// any state change or persistence call.
///
/// # Errors
/// `GateError::InsufficientRights` below Editor.
pub fn ensure_structural_edit(level: PermissionLevel) -> Result<(), GateError> {
    if level.can_edit_structure() {
        Ok(())
    } else {
        Err(GateError::InsufficientRights(level))
    }
}

/// # Errors
/// `GateError::InsufficientRights` below Admin.
pub fn ensure_destructive_edit(level: PermissionLevel) -> Result<(), GateError> {
    if level.can_destroy_structure() {
        Ok(())
    } else {
        Err(GateError::InsufficientRights(level))
    }
}

/// A completed day is locked for every role: it can be viewed but never
/// targeted by add/remove/move/reorder, as source or destination.
///
/// # Errors
/// `GateError::DayCompleted` if the day carries a completion mark.
pub fn ensure_day_open(day: &Day) -> Result<(), GateError> {
    if day.is_completed() {
        Err(GateError::DayCompleted)
    } else {
        Ok(())
    }
}
