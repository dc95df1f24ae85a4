//! Access guard: read/write eligibility by role, state scope and lock state.
//!
//! Decisions are pure functions of the principal and the scope. The only
//! storage-derived input is the lock flag, which callers read from
//! metadata; the guard itself never touches a store.

use mcr_storage::ReportType;

use crate::principal::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

/// What is being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessScope<'a> {
    pub report_type: ReportType,
    pub state: &'a str,
    pub locked: bool,
}

impl<'a> AccessScope<'a> {
    /// Scope for checks made before any metadata has been read.
    pub fn unlocked(report_type: ReportType, state: &'a str) -> Self {
        Self {
            report_type,
            state,
            locked: false,
        }
    }

    pub fn with_lock(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DenialReason {
    #[error("report type is not permitted for this user")]
    ReportTypeNotPermitted,
    #[error("state is outside the user's scope")]
    StateOutOfScope,
    #[error("role is read-only")]
    ReadOnlyRole,
    #[error("report is locked")]
    ReportLocked,
    #[error("action requires an override role")]
    OverrideRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn into_result(self) -> Result<(), DenialReason> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(reason) => Err(reason),
        }
    }
}

/// Decide whether `principal` may perform `action` on `scope`.
pub fn authorize(principal: &Principal, scope: &AccessScope<'_>, action: Action) -> Decision {
    let role = principal.role;

    if !role.has_blanket_access() {
        if !principal.has_report_type(scope.report_type) {
            return Decision::Denied(DenialReason::ReportTypeNotPermitted);
        }
        if !principal.has_state(scope.state) {
            return Decision::Denied(DenialReason::StateOutOfScope);
        }
    }

    if action == Action::Write {
        if role.is_read_only() {
            return Decision::Denied(DenialReason::ReadOnlyRole);
        }
        if scope.locked && !role.can_override_lock() {
            return Decision::Denied(DenialReason::ReportLocked);
        }
    }

    Decision::Allowed
}

/// Decide whether `principal` may run an override-only action (releasing
/// a locked report) on `scope`.
pub fn authorize_override(principal: &Principal, scope: &AccessScope<'_>) -> Decision {
    match authorize(principal, scope, Action::Write) {
        Decision::Allowed if principal.role.can_override_lock() => Decision::Allowed,
        Decision::Allowed => Decision::Denied(DenialReason::OverrideRequired),
        denied => denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::Role;

    fn state_user() -> Principal {
        Principal::new(Role::StateUser, "Thelonious States").with_states(["AB"])
    }

    fn scope(state: &str) -> AccessScope<'_> {
        AccessScope::unlocked(ReportType::Mcpar, state)
    }

    #[test]
    fn state_user_is_confined_to_their_states() {
        let p = state_user();
        assert!(authorize(&p, &scope("AB"), Action::Read).is_allowed());
        assert!(authorize(&p, &scope("AB"), Action::Write).is_allowed());
        assert_eq!(
            authorize(&p, &scope("CD"), Action::Read),
            Decision::Denied(DenialReason::StateOutOfScope)
        );
        assert_eq!(
            authorize(&p, &scope("CD"), Action::Write),
            Decision::Denied(DenialReason::StateOutOfScope)
        );
    }

    #[test]
    fn state_user_without_claim_for_type_is_denied() {
        let p = state_user().with_report_types([ReportType::Mlr]);
        assert_eq!(
            authorize(&p, &scope("AB"), Action::Read),
            Decision::Denied(DenialReason::ReportTypeNotPermitted)
        );
    }

    #[test]
    fn locked_reports_reject_writes_without_override() {
        let locked = scope("AB").with_lock(true);
        assert!(authorize(&state_user(), &locked, Action::Read).is_allowed());
        assert_eq!(
            authorize(&state_user(), &locked, Action::Write),
            Decision::Denied(DenialReason::ReportLocked)
        );
        let admin = Principal::new(Role::Admin, "Admin User");
        assert!(authorize(&admin, &locked, Action::Write).is_allowed());
    }

    #[test]
    fn blanket_roles_read_everywhere_but_read_only_roles_never_write() {
        for role in [Role::Admin, Role::Approver, Role::HelpDesk, Role::Internal] {
            let p = Principal::new(role, "Someone");
            assert!(authorize(&p, &scope("ZZ"), Action::Read).is_allowed(), "{role}");
        }
        let help = Principal::new(Role::HelpDesk, "Help Desk");
        assert_eq!(
            authorize(&help, &scope("AB"), Action::Write),
            Decision::Denied(DenialReason::ReadOnlyRole)
        );
    }

    #[test]
    fn release_needs_override_role() {
        let locked = scope("AB").with_lock(true);
        assert_eq!(
            authorize_override(&state_user(), &scope("AB")),
            Decision::Denied(DenialReason::OverrideRequired)
        );
        assert_eq!(
            authorize_override(&state_user(), &locked),
            Decision::Denied(DenialReason::ReportLocked)
        );
        assert!(authorize_override(&Principal::new(Role::Approver, "A"), &locked).is_allowed());
        assert_eq!(
            authorize_override(&Principal::new(Role::Internal, "I"), &locked),
            Decision::Denied(DenialReason::ReadOnlyRole)
        );
    }
}
