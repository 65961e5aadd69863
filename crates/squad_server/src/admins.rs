//! Admin permission lists.
//!
//! Lists use the server's `Admins.cfg` format:
//!
//! ```text
//! Group=Moderator:kick,ban,chat // comment
//! Admin=76561198000000001:Moderator
//! ```
//!
//! A group is only visible to `Admin=` lines of the list that declares it.
//! Permissions are lowercased and merged per admin across all lists.

use crate::collaborators::AdminSource;
use crate::error::ServerError;
use crate::state::ServerState;
use squad_event_system::SteamId;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type AdminPermissions = BTreeSet<String>;

/// Permissions of every listed admin.
pub type AdminIndex = HashMap<SteamId, AdminPermissions>;

fn strip_comment(line: &str) -> &str {
    line.split_once("//").map_or(line, |(content, _)| content).trim()
}

/// Applies one list to `index` and returns the number of grants it held.
pub fn parse_admin_list(list: &str, index: &mut AdminIndex) -> usize {
    let mut groups: HashMap<&str, Vec<String>> = HashMap::new();
    let mut grants = Vec::new();

    for line in list.lines().map(strip_comment) {
        if let Some(group) = line.strip_prefix("Group=") {
            match group.split_once(':') {
                Some((name, perms)) => {
                    let perms = perms
                        .split(',')
                        .map(|p| p.trim().to_lowercase())
                        .filter(|p| !p.is_empty())
                        .collect();
                    groups.insert(name.trim(), perms);
                }
                None => debug!("🛡️ Group line without permissions: {}", line),
            }
        } else if let Some(admin) = line.strip_prefix("Admin=") {
            grants.push(admin);
        }
    }

    let mut applied = 0;
    for grant in grants {
        let Some((id, group)) = grant.split_once(':') else {
            debug!("🛡️ Admin line without a group: {}", grant);
            continue;
        };
        let Ok(steam_id) = id.parse::<SteamId>() else {
            warn!("⚠️ Admin line with a bad steam id: {}", grant);
            continue;
        };
        let group = group.split_whitespace().next().unwrap_or_default();
        let Some(perms) = groups.get(group) else {
            warn!("⚠️ Admin {} references unknown group {}", steam_id, group);
            continue;
        };
        index.entry(steam_id).or_default().extend(perms.iter().cloned());
        applied += 1;
    }
    applied
}

/// Keeps [`ServerState::admins`] in step with an [`AdminSource`].
pub struct AdminDirectory {
    source: std::sync::RwLock<Option<Arc<dyn AdminSource>>>,
    state: Arc<ServerState>,
}

impl AdminDirectory {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self {
            source: std::sync::RwLock::new(None),
            state,
        }
    }

    pub fn set_source(&self, source: Arc<dyn AdminSource>) {
        if let Ok(mut slot) = self.source.write() {
            *slot = Some(source);
        }
    }

    /// Re-reads every list and swaps in the merged index. A failed fetch
    /// keeps the previous index. Returns the number of admins held.
    pub async fn refresh(&self) -> Result<usize, ServerError> {
        let source = self.source.read().ok().and_then(|slot| slot.clone());
        let Some(source) = source else {
            debug!("🛡️ No admin source configured");
            return Ok(self.state.admins.load().await.value.len());
        };

        let lists = source.fetch().await?;
        let mut index = AdminIndex::new();
        let grants: usize = lists.iter().map(|list| parse_admin_list(list, &mut index)).sum();
        let admins = index.len();
        self.state.admins.replace(index).await;
        info!("🛡️ Loaded {} admins from {} lists ({} grants)", admins, lists.len(), grants);
        Ok(admins)
    }
}
