//! Dashboard search, answered by the search subsystem.

use crate::bus::Message;
use crate::core::SignedInUser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DashboardHitType {
    #[default]
    #[serde(rename = "dash-db")]
    Dashboard,
    #[serde(rename = "dash-folder")]
    Folder,
}

/// The permission a search hit must grant the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Permission {
    #[default]
    View,
    Edit,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardHit {
    pub id: i64,
    pub uid: String,
    pub title: String,
    #[serde(rename = "type")]
    pub hit_type: DashboardHitType,
    pub url: String,
    pub tags: Vec<String>,
    pub folder_id: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchDashboardsQuery {
    pub title: String,
    pub tags: Vec<String>,
    pub org_id: i64,
    pub user: SignedInUser,
    pub limit: usize,
    pub dashboard_ids: Vec<i64>,
    pub folder_ids: Vec<i64>,
    pub hit_type: Option<DashboardHitType>,
    pub permission: Permission,
}

impl Message for SearchDashboardsQuery {
    type Output = Vec<DashboardHit>;
}
