//! Zabbix API object types.
//!
//! The API returns every ID as a numeric string and changes field names
//! between versions, so these types are deliberately tolerant: unknown
//! fields are ignored, renamed fields are aliased, and numeric codes stay
//! strings unless we actually compute with them.
//!
//! Equality and hashing use IDs, never names — IDs are immutable for the
//! lifetime of an object, names are not.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

pub(crate) mod de {
    //! Deserialization helpers for the API's loose typing.

    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// `proxyid` and friends: `"0"` (and empty) mean "none".
    pub fn zero_id_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) if s.is_empty() || s == "0" => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) if n.as_i64() == Some(0) => None,
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Epoch seconds as string or number.
    pub fn opt_epoch_seconds<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        let seconds = match &value {
            Some(Value::String(s)) if !s.is_empty() => s.parse::<i64>().ok(),
            Some(Value::Number(n)) => n.as_i64(),
            _ => None,
        };
        Ok(seconds.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0)))
    }

    /// `min_online` is documented as a string holding 1–1000; servers have
    /// been seen returning junk. Coerce anything unusable to 1 with a
    /// logged warning.
    pub fn min_online<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        let parsed = match &value {
            Some(Value::String(s)) => s.parse::<u32>().ok(),
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            _ => None,
        };
        Ok(match parsed {
            Some(n) if (1..=1000).contains(&n) => n,
            _ => {
                tracing::warn!(?value, "unusable min_online value from server, assuming 1");
                1
            }
        })
    }

    /// Integers that arrive as either numbers or numeric strings.
    pub fn stringly_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::String(s) => s.parse().map_err(serde::de::Error::custom),
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| serde::de::Error::custom("expected integer")),
            _ => Err(serde::de::Error::custom("expected integer or string")),
        }
    }

    /// Host inventory: an object normally, but an empty array when unset.
    pub fn inventory<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Object(map)) if !map.is_empty() => Some(Value::Object(map)),
            _ => None,
        })
    }
}

/// A permission entry on a user group.
#[derive(Debug, Clone, Deserialize)]
pub struct ZabbixRight {
    pub id: String,
    #[serde(deserialize_with = "de::stringly_i64")]
    pub permission: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Host {
    pub hostid: String,
    pub host: String,
    /// Visible name; falls back to the technical name when unset.
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub maintenance_status: Option<String>,
    /// `"0"` from the server means "no proxy" and is normalised away here;
    /// consumers never see a zero ID.
    #[serde(
        alias = "proxy_hostid",
        deserialize_with = "de::zero_id_as_none"
    )]
    pub proxyid: Option<String>,
    /// Zabbix ≥ 7.0.
    #[serde(deserialize_with = "de::zero_id_as_none")]
    pub proxy_groupid: Option<String>,
    /// Zabbix ≥ 7.0: server|proxy|proxy group.
    pub monitored_by: Option<String>,
    #[serde(alias = "available")]
    pub active_available: Option<String>,
    #[serde(alias = "hostgroups")]
    pub groups: Vec<HostGroup>,
    #[serde(alias = "parentTemplates")]
    pub templates: Vec<Template>,
    pub interfaces: Vec<HostInterface>,
    pub macros: Vec<Macro>,
    #[serde(deserialize_with = "de::inventory")]
    pub inventory: Option<Value>,
}

impl Host {
    /// Preferred human-facing name.
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => &self.host,
        }
    }
}

impl PartialEq for Host {
    fn eq(&self, other: &Self) -> bool {
        self.hostid == other.hostid
    }
}
impl Eq for Host {}
impl Hash for Host {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hostid.hash(state);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostGroup {
    pub groupid: String,
    pub name: String,
    /// `0` plain, `4` discovered.
    pub flags: Option<String>,
    /// <6.2 only.
    pub internal: Option<String>,
    pub hosts: Vec<Host>,
    /// <6.2 only; templates moved to template groups in 6.2.
    pub templates: Vec<Template>,
}

impl PartialEq for HostGroup {
    fn eq(&self, other: &Self) -> bool {
        self.groupid == other.groupid
    }
}
impl Eq for HostGroup {}
impl Hash for HostGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.groupid.hash(state);
    }
}

/// Distinct entity on Zabbix ≥ 6.2; aliases to host groups before that.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateGroup {
    pub groupid: String,
    pub name: String,
    pub uuid: Option<String>,
    pub templates: Vec<Template>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Template {
    pub templateid: String,
    /// Technical name.
    pub host: String,
    /// Visible name.
    pub name: Option<String>,
    pub hosts: Vec<Host>,
    /// Child templates.
    pub templates: Vec<Template>,
    #[serde(alias = "parentTemplates")]
    pub parent_templates: Vec<Template>,
}

impl Template {
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => &self.host,
        }
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.templateid == other.templateid
    }
}
impl Eq for Template {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostInterface {
    pub interfaceid: Option<String>,
    pub hostid: Option<String>,
    /// 1 agent, 2 SNMP, 3 IPMI, 4 JMX.
    #[serde(rename = "type")]
    pub interface_type: String,
    pub ip: Option<String>,
    pub dns: Option<String>,
    pub port: String,
    /// `1` connect via IP, `0` via DNS.
    pub useip: String,
    /// `1` for the default interface of its type.
    pub main: String,
    pub available: Option<String>,
    /// SNMP detail sub-record, present for SNMP interfaces.
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Proxy {
    pub proxyid: String,
    /// Renamed from `host` in 7.0.
    #[serde(alias = "host")]
    pub name: String,
    /// Operating mode; lives under `status` before 7.0 and
    /// `operating_mode` after, with different value sets.
    pub status: Option<String>,
    pub operating_mode: Option<String>,
    #[serde(alias = "proxy_address")]
    pub address: Option<String>,
    /// ≥ 7.0.
    #[serde(deserialize_with = "de::zero_id_as_none")]
    pub proxy_groupid: Option<String>,
    /// ≥ 7.0.
    pub version: Option<String>,
    /// ≥ 7.0.
    pub compatibility: Option<String>,
    pub local_address: Option<String>,
    pub local_port: Option<String>,
    pub hosts: Vec<Host>,
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.proxyid == other.proxyid
    }
}
impl Eq for Proxy {}

/// Zabbix ≥ 7.0.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyGroup {
    pub proxy_groupid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub failover_delay: Option<String>,
    #[serde(default = "default_min_online", deserialize_with = "de::min_online")]
    pub min_online: u32,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub proxies: Vec<Proxy>,
}

fn default_min_online() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct User {
    pub userid: String,
    /// `alias` before 6.0.
    #[serde(alias = "alias")]
    pub username: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    #[serde(alias = "type")]
    pub roleid: Option<String>,
    pub autologin: Option<String>,
    pub autologout: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Role {
    pub roleid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub role_type: Option<String>,
    pub readonly: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Usergroup {
    pub usrgrpid: String,
    pub name: String,
    pub gui_access: Option<String>,
    pub users_status: Option<String>,
    /// <6.2: one combined rights list.
    pub rights: Vec<ZabbixRight>,
    /// ≥6.2: split host/template group rights.
    pub hostgroup_rights: Vec<ZabbixRight>,
    pub templategroup_rights: Vec<ZabbixRight>,
    pub users: Vec<User>,
}

/// Host-scoped user macro.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Macro {
    pub hostmacroid: Option<String>,
    pub hostid: Option<String>,
    /// The `{$NAME}` token.
    #[serde(rename = "macro")]
    pub macro_name: String,
    /// Absent for secret/vault macros.
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub macro_type: Option<String>,
    pub description: Option<String>,
    pub hosts: Vec<Host>,
    pub templates: Vec<Template>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobalMacro {
    pub globalmacroid: String,
    #[serde(rename = "macro")]
    pub macro_name: String,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub macro_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimePeriod {
    pub timeperiod_type: Option<String>,
    pub period: Option<String>,
    #[serde(deserialize_with = "de::opt_epoch_seconds")]
    pub start_date: Option<DateTime<Utc>>,
    pub start_time: Option<String>,
    pub every: Option<String>,
    pub dayofweek: Option<String>,
    pub day: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Maintenance {
    pub maintenanceid: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "de::opt_epoch_seconds")]
    pub active_since: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "de::opt_epoch_seconds")]
    pub active_till: Option<DateTime<Utc>>,
    /// `0` with data collection, `1` without.
    pub maintenance_type: Option<String>,
    pub hosts: Vec<Host>,
    #[serde(alias = "hostgroups")]
    pub groups: Vec<HostGroup>,
    pub timeperiods: Vec<TimePeriod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Event {
    pub eventid: String,
    pub source: Option<String>,
    pub object: Option<String>,
    pub objectid: Option<String>,
    pub name: Option<String>,
    pub severity: Option<String>,
    /// `1` when acknowledged.
    pub acknowledged: Option<String>,
    #[serde(deserialize_with = "de::opt_epoch_seconds")]
    pub clock: Option<DateTime<Utc>>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Trigger {
    pub triggerid: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    #[serde(deserialize_with = "de::opt_epoch_seconds")]
    pub lastchange: Option<DateTime<Utc>>,
    pub value: Option<String>,
    pub hosts: Vec<Host>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Item {
    pub itemid: String,
    #[serde(rename = "key_")]
    pub key: Option<String>,
    pub name: Option<String>,
    pub value_type: Option<String>,
    pub lastvalue: Option<String>,
    pub hosts: Vec<Host>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaType {
    pub mediatypeid: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Image {
    pub imageid: String,
    pub name: String,
    pub imagetype: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Map {
    pub sysmapid: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn host_zero_proxyid_normalises_to_none() {
        let host: Host = serde_json::from_value(json!({
            "hostid": "10084",
            "host": "web-1",
            "proxyid": "0",
        }))
        .expect("host");
        assert_eq!(host.proxyid, None);

        let host: Host = serde_json::from_value(json!({
            "hostid": "10084",
            "host": "web-1",
            "proxyid": "10271",
        }))
        .expect("host");
        assert_eq!(host.proxyid.as_deref(), Some("10271"));
    }

    #[test]
    fn host_accepts_legacy_proxy_field() {
        let host: Host = serde_json::from_value(json!({
            "hostid": "10084",
            "host": "web-1",
            "proxy_hostid": "10271",
        }))
        .expect("host");
        assert_eq!(host.proxyid.as_deref(), Some("10271"));
    }

    #[test]
    fn host_accepts_both_group_spellings() {
        let modern: Host = serde_json::from_value(json!({
            "hostid": "1",
            "host": "a",
            "hostgroups": [{"groupid": "2", "name": "Linux"}],
        }))
        .expect("host");
        assert_eq!(modern.groups.len(), 1);

        let legacy: Host = serde_json::from_value(json!({
            "hostid": "1",
            "host": "a",
            "groups": [{"groupid": "2", "name": "Linux"}],
        }))
        .expect("host");
        assert_eq!(legacy.groups[0].name, "Linux");
    }

    #[test]
    fn host_empty_inventory_array_is_none() {
        let host: Host = serde_json::from_value(json!({
            "hostid": "1",
            "host": "a",
            "inventory": [],
        }))
        .expect("host");
        assert!(host.inventory.is_none());

        let host: Host = serde_json::from_value(json!({
            "hostid": "1",
            "host": "a",
            "inventory": {"os": "linux"},
        }))
        .expect("host");
        assert!(host.inventory.is_some());
    }

    #[test]
    fn host_equality_is_by_id() {
        let a: Host = serde_json::from_value(json!({"hostid": "1", "host": "old-name"})).expect("a");
        let b: Host = serde_json::from_value(json!({"hostid": "1", "host": "new-name"})).expect("b");
        let c: Host = serde_json::from_value(json!({"hostid": "2", "host": "old-name"})).expect("c");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: std::collections::HashSet<Host> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn host_display_name_prefers_visible_name() {
        let host: Host =
            serde_json::from_value(json!({"hostid": "1", "host": "tech", "name": "Visible"}))
                .expect("host");
        assert_eq!(host.display_name(), "Visible");

        let host: Host =
            serde_json::from_value(json!({"hostid": "1", "host": "tech", "name": ""})).expect("host");
        assert_eq!(host.display_name(), "tech");
    }

    #[test]
    fn proxy_accepts_legacy_name_and_address() {
        let proxy: Proxy = serde_json::from_value(json!({
            "proxyid": "10271",
            "host": "proxy-old",
            "proxy_address": "10.0.0.1",
            "status": "5",
        }))
        .expect("proxy");
        assert_eq!(proxy.name, "proxy-old");
        assert_eq!(proxy.address.as_deref(), Some("10.0.0.1"));

        let proxy: Proxy = serde_json::from_value(json!({
            "proxyid": "10271",
            "name": "proxy-new",
            "address": "10.0.0.2",
            "operating_mode": "0",
            "proxy_groupid": "0",
        }))
        .expect("proxy");
        assert_eq!(proxy.name, "proxy-new");
        assert_eq!(proxy.proxy_groupid, None);
    }

    #[test]
    fn proxy_group_min_online_coercion() {
        let group: ProxyGroup = serde_json::from_value(json!({
            "proxy_groupid": "1",
            "name": "pg",
            "min_online": "3",
        }))
        .expect("group");
        assert_eq!(group.min_online, 3);

        // Garbage from the server degrades to 1 instead of failing the fetch.
        let group: ProxyGroup = serde_json::from_value(json!({
            "proxy_groupid": "1",
            "name": "pg",
            "min_online": "unknown",
        }))
        .expect("group");
        assert_eq!(group.min_online, 1);

        let group: ProxyGroup = serde_json::from_value(json!({
            "proxy_groupid": "1",
            "name": "pg",
            "min_online": 5000,
        }))
        .expect("group");
        assert_eq!(group.min_online, 1);
    }

    #[test]
    fn user_accepts_legacy_alias_field() {
        let user: User = serde_json::from_value(json!({
            "userid": "1",
            "alias": "Admin",
            "type": "3",
        }))
        .expect("user");
        assert_eq!(user.username, "Admin");
        assert_eq!(user.roleid.as_deref(), Some("3"));
    }

    #[test]
    fn usergroup_rights_parse_stringly_permissions() {
        let group: Usergroup = serde_json::from_value(json!({
            "usrgrpid": "7",
            "name": "Ops",
            "hostgroup_rights": [{"id": "2", "permission": "3"}],
            "templategroup_rights": [{"id": "4", "permission": 2}],
        }))
        .expect("group");
        assert_eq!(group.hostgroup_rights[0].permission, 3);
        assert_eq!(group.templategroup_rights[0].permission, 2);
    }

    #[test]
    fn macro_token_field_maps_to_macro_name() {
        let macro_: Macro = serde_json::from_value(json!({
            "hostmacroid": "11",
            "hostid": "10084",
            "macro": "{$SNMP_COMMUNITY}",
            "value": "public",
        }))
        .expect("macro");
        assert_eq!(macro_.macro_name, "{$SNMP_COMMUNITY}");

        // Secret macros omit the value.
        let secret: Macro = serde_json::from_value(json!({
            "hostmacroid": "12",
            "macro": "{$SECRET}",
            "type": "1",
        }))
        .expect("macro");
        assert_eq!(secret.value, None);
    }

    #[test]
    fn maintenance_epochs_deserialize_to_instants() {
        let maintenance: Maintenance = serde_json::from_value(json!({
            "maintenanceid": "3",
            "name": "window",
            "active_since": "1704067200",
            "active_till": 1704153600,
            "timeperiods": [{"timeperiod_type": "0", "period": "86400", "start_date": "1704067200"}],
        }))
        .expect("maintenance");
        assert_eq!(
            maintenance.active_since.map(|t| t.timestamp()),
            Some(1_704_067_200)
        );
        assert_eq!(
            maintenance.active_till.map(|t| t.timestamp()),
            Some(1_704_153_600)
        );
        assert_eq!(
            maintenance.timeperiods[0].start_date.map(|t| t.timestamp()),
            Some(1_704_067_200)
        );
    }

    #[test]
    fn template_accepts_parent_templates_alias() {
        let template: Template = serde_json::from_value(json!({
            "templateid": "100",
            "host": "Linux by agent",
            "parentTemplates": [{"templateid": "99", "host": "Base"}],
        }))
        .expect("template");
        assert_eq!(template.parent_templates.len(), 1);
    }

    #[test]
    fn event_clock_is_an_instant() {
        let event: Event = serde_json::from_value(json!({
            "eventid": "555",
            "objectid": "777",
            "severity": "4",
            "acknowledged": "0",
            "clock": "1700000000",
        }))
        .expect("event");
        assert_eq!(event.clock.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn item_key_field_uses_api_spelling() {
        let item: Item = serde_json::from_value(json!({
            "itemid": "42",
            "key_": "agent.ping",
            "name": "Ping",
            "lastvalue": "1",
        }))
        .expect("item");
        assert_eq!(item.key.as_deref(), Some("agent.ping"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let host: Host = serde_json::from_value(json!({
            "hostid": "1",
            "host": "a",
            "some_future_field": {"nested": true},
        }))
        .expect("host");
        assert_eq!(host.hostid, "1");
    }
}
