//! In-memory name↔ID maps for host groups and template groups.
//!
//! Populated by one `hostgroup.get` (plus one `templategroup.get` on ≥6.2)
//! and never refreshed automatically; callers that mutate groups repopulate
//! when they need fresh data. Lookups never touch the network — a miss
//! returns `None` and the caller decides whether to resolve via the API.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;

use crate::client::ZabbixClient;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
struct GroupRef {
    groupid: String,
    name: String,
}

#[derive(Debug, Default)]
pub struct GroupCache {
    hostgroup_by_name: BTreeMap<String, String>,
    hostgroup_by_id: BTreeMap<String, String>,
    templategroup_by_name: BTreeMap<String, String>,
    templategroup_by_id: BTreeMap<String, String>,
}

impl GroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill all maps from the server. Replaces any previous contents.
    pub fn populate(&mut self, client: &ZabbixClient) -> Result<(), ApiError> {
        let hostgroups: Vec<GroupRef> = fetch_refs(client, "hostgroup.get")?;
        self.hostgroup_by_name.clear();
        self.hostgroup_by_id.clear();
        for group in hostgroups {
            self.hostgroup_by_name
                .insert(group.name.clone(), group.groupid.clone());
            self.hostgroup_by_id.insert(group.groupid, group.name);
        }

        self.templategroup_by_name.clear();
        self.templategroup_by_id.clear();
        if client.traits()?.split_template_groups {
            let templategroups: Vec<GroupRef> = fetch_refs(client, "templategroup.get")?;
            for group in templategroups {
                self.templategroup_by_name
                    .insert(group.name.clone(), group.groupid.clone());
                self.templategroup_by_id.insert(group.groupid, group.name);
            }
        } else {
            tracing::debug!("skipping template group cache, server predates 6.2");
        }
        Ok(())
    }

    pub fn hostgroup_id(&self, name: &str) -> Option<&str> {
        self.hostgroup_by_name.get(name).map(String::as_str)
    }

    pub fn hostgroup_name(&self, id: &str) -> Option<&str> {
        self.hostgroup_by_id.get(id).map(String::as_str)
    }

    pub fn templategroup_id(&self, name: &str) -> Option<&str> {
        self.templategroup_by_name.get(name).map(String::as_str)
    }

    pub fn templategroup_name(&self, id: &str) -> Option<&str> {
        self.templategroup_by_id.get(id).map(String::as_str)
    }
}

fn fetch_refs(client: &ZabbixClient, method: &str) -> Result<Vec<GroupRef>, ApiError> {
    let value = client
        .do_request(method, json!({"output": ["groupid", "name"]}))
        .map_err(|e| ApiError::call("Failed to populate group cache", e))?
        .into_result();
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
        .map_err(|e| ApiError::request_other(format!("unexpected result shape from {method}: {e}")))
}
