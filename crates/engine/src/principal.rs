//! The already-authenticated caller, as handed over by the identity layer.

use std::fmt;
use std::str::FromStr;

use mcr_storage::ReportType;
use serde::{Deserialize, Serialize};

/// Role claims issued by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "mdctmcr-state-user")]
    StateUser,
    #[serde(rename = "mdctmcr-state-rep")]
    StateRep,
    #[serde(rename = "mdctmcr-bor")]
    Admin,
    #[serde(rename = "mdctmcr-approver")]
    Approver,
    #[serde(rename = "mdctmcr-help-desk")]
    HelpDesk,
    #[serde(rename = "mdctmcr-internal-user")]
    Internal,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::StateUser,
        Role::StateRep,
        Role::Admin,
        Role::Approver,
        Role::HelpDesk,
        Role::Internal,
    ];

    pub fn claim(&self) -> &'static str {
        match self {
            Role::StateUser => "mdctmcr-state-user",
            Role::StateRep => "mdctmcr-state-rep",
            Role::Admin => "mdctmcr-bor",
            Role::Approver => "mdctmcr-approver",
            Role::HelpDesk => "mdctmcr-help-desk",
            Role::Internal => "mdctmcr-internal-user",
        }
    }

    /// Pick this application's role out of a comma-separated role claim
    /// that may also carry roles for other applications.
    pub fn from_claims(claims: &str) -> Option<Role> {
        claims.split(',').find_map(|c| c.trim().parse().ok())
    }

    /// Roles that see every state's reports.
    pub fn has_blanket_access(&self) -> bool {
        !matches!(self, Role::StateUser | Role::StateRep)
    }

    /// Roles that may never write.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Role::HelpDesk | Role::Internal)
    }

    /// Roles that may write to, or release, a locked report.
    pub fn can_override_lock(&self) -> bool {
        matches!(self, Role::Admin | Role::Approver)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.claim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.claim() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// The caller of an engine operation.
///
/// `states` is the state-scope claim. `report_types` restricts which report
/// programs a state user works on; an empty list means all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub role: Role,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub report_types: Vec<ReportType>,
    #[serde(default)]
    pub full_name: String,
}

impl Principal {
    pub fn new(role: Role, full_name: impl Into<String>) -> Self {
        Self {
            role,
            states: Vec::new(),
            report_types: Vec::new(),
            full_name: full_name.into(),
        }
    }

    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_report_types(mut self, report_types: impl IntoIterator<Item = ReportType>) -> Self {
        self.report_types = report_types.into_iter().collect();
        self
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    pub fn has_report_type(&self, report_type: ReportType) -> bool {
        self.report_types.is_empty() || self.report_types.contains(&report_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_picked_from_mixed_claims() {
        assert_eq!(
            Role::from_claims("mdctseds-state-user,mdctmcr-state-user"),
            Some(Role::StateUser)
        );
        assert_eq!(Role::from_claims("mdctmfp-bor, mdctmcr-bor"), Some(Role::Admin));
        assert_eq!(Role::from_claims("mdctseds-state-user"), None);
    }

    #[test]
    fn empty_report_type_claim_means_all() {
        let p = Principal::new(Role::StateUser, "Thelonious States").with_states(["AB"]);
        assert!(ReportType::ALL.iter().all(|t| p.has_report_type(*t)));
        let p = p.with_report_types([ReportType::Mlr]);
        assert!(p.has_report_type(ReportType::Mlr));
        assert!(!p.has_report_type(ReportType::Mcpar));
    }
}
