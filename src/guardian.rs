//! Role-based dashboard permission checks.

use crate::core::{DashboardGuardian, OrgRole, SignedInUser};
use crate::error::BusError;

/// Grants edit rights to editors and admins of the dashboard's organization.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrgRoleGuardian;

impl DashboardGuardian for OrgRoleGuardian {
    fn can_edit(
        &self,
        _dashboard_id: i64,
        org_id: i64,
        user: &SignedInUser,
    ) -> Result<bool, BusError> {
        Ok(user.org_id == org_id && user.org_role >= OrgRole::Editor)
    }
}
