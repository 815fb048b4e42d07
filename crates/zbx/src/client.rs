//! Typed Zabbix API client.
//!
//! One method per logical action, a closed set — there is no dynamic
//! `object.method` dispatch. All methods take typed arguments, return typed
//! values and wrap transport failures in [`ApiError::Call`] with a short
//! operator-facing context.
//!
//! Name-or-ID arguments treat numeric strings as IDs, everything else as
//! names, and `*` as "match all" (see [`crate::params`]).

use std::cell::OnceCell;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use zbx_version::{ApiVersion, RightsSelect, VersionTraits};

use crate::CancelToken;
use crate::Warning;
use crate::enums::{
    ActiveInterface, DataCollectionMode, ExportFormat, GuiAccess, HostInterfaceType,
    InventoryMode, MaintenanceStatus, MonitoredBy, MonitoringStatus, TriggerPriority, UserRole,
    UsergroupPermission,
};
use crate::error::ApiError;
use crate::import::ImportRules;
use crate::params::{Params, SortOrder, add_common_params, parse_name_or_id_arg, returned_list};
use crate::rpc::{AuthPlacement, RpcResponse, Transport, is_unauthenticated_method};
use crate::types::{
    Event, GlobalMacro, Host, HostGroup, HostInterface, Image, Item, Macro, Maintenance, Map,
    MediaType, Proxy, ProxyGroup, Role, Template, TemplateGroup, Trigger, User, Usergroup,
    ZabbixRight,
};

/// Builds a [`ZabbixClient`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    server: String,
    timeout: Option<Duration>,
    verify_ssl: bool,
    cancel: CancelToken,
}

impl ClientBuilder {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            timeout: Some(Duration::from_secs(30)),
            verify_ssl: true,
            cancel: CancelToken::default(),
        }
    }

    /// Per-request timeout. `None` disables the timeout entirely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Result<ZabbixClient, ApiError> {
        Ok(ZabbixClient {
            transport: Transport::new(&self.server, self.timeout, self.verify_ssl)?,
            auth: None,
            use_api_token: false,
            version: OnceCell::new(),
            cancel: self.cancel,
        })
    }
}

/// Credentials accepted by [`ZabbixClient::login`]. Exactly one of
/// token / session / username+password must be populated.
#[derive(Debug, Clone, Default)]
pub struct LoginCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub session: Option<String>,
}

impl LoginCredentials {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn session(session: impl Into<String>) -> Self {
        Self {
            session: Some(session.into()),
            ..Default::default()
        }
    }

    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }
}

/// A version-aware Zabbix API client.
///
/// Owns its auth state explicitly: one optional session token plus a lazily
/// cached server version. Safe for sequential use from one thread; use one
/// client per thread for parallel work.
#[derive(Debug)]
pub struct ZabbixClient {
    transport: Transport,
    auth: Option<String>,
    use_api_token: bool,
    version: OnceCell<ApiVersion>,
    cancel: CancelToken,
}

impl ZabbixClient {
    pub fn url(&self) -> &str {
        self.transport.url()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub fn uses_api_token(&self) -> bool {
        self.use_api_token
    }

    /// Number of requests issued by this client.
    pub fn request_count(&self) -> u64 {
        self.transport.request_count()
    }

    /// Issue a raw JSON-RPC request with the client's auth state applied.
    ///
    /// Auth is omitted for `apiinfo.version`, `user.login` and
    /// `user.checkauthentication`; otherwise it goes in the header (≥6.4)
    /// or the body (<6.4).
    pub fn do_request(&self, method: &str, params: Value) -> Result<RpcResponse, ApiError> {
        if self.cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let placement = match self.auth.as_deref() {
            Some(token) if !is_unauthenticated_method(method) => {
                if self.traits()?.auth_in_header {
                    Some(AuthPlacement::Header(token))
                } else {
                    Some(AuthPlacement::Body(token))
                }
            }
            _ => None,
        };
        self.transport.post(method, &params, placement)
    }

    fn result_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ApiError> {
        let value = self.do_request(method, params)?.into_result();
        serde_json::from_value(value).map_err(|e| {
            ApiError::request_other(format!("unexpected result shape from {method}: {e}"))
        })
    }

    fn fetch_list<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Vec<T>, ApiError> {
        let value = self.do_request(method, params)?.into_result();
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value).map_err(|e| {
            ApiError::request_other(format!("unexpected result shape from {method}: {e}"))
        })
    }

    // ------------------------------------------------------------------
    // Version

    /// The server version, fetched once and cached for the client lifetime.
    pub fn api_version(&self) -> Result<ApiVersion, ApiError> {
        if let Some(version) = self.version.get() {
            return Ok(*version);
        }
        let reported: String = self.result_as("apiinfo.version", json!({}))?;
        let version: ApiVersion = reported.parse()?;
        let _ = self.version.set(version);
        Ok(version)
    }

    pub fn traits(&self) -> Result<VersionTraits, ApiError> {
        Ok(VersionTraits::for_version(&self.api_version()?))
    }

    // ------------------------------------------------------------------
    // Authentication

    /// Log in with an API token, a stored session ID, or username/password.
    ///
    /// Success is probed with a minimal `host.get`; on probe failure the
    /// client's auth state is cleared so the caller can try another source.
    /// Returns the session token now held by the client.
    pub fn login(&mut self, credentials: &LoginCredentials) -> Result<String, ApiError> {
        // Fetching the version doubles as a reachability check.
        let version = self.api_version().map_err(|e| {
            ApiError::call(format!("Failed to connect to Zabbix API at {}", self.url()), e)
        })?;
        tracing::debug!(%version, url = %self.url(), "logging in");

        let mut use_api_token = false;
        let auth = if let Some(token) = &credentials.token {
            use_api_token = true;
            token.clone()
        } else if let Some(session) = &credentials.session {
            session.clone()
        } else if let (Some(username), Some(password)) =
            (&credentials.username, &credentials.password)
        {
            let traits = self.traits()?;
            let mut params = Params::new();
            params.insert(traits.login_user_param.to_string(), json!(username));
            params.insert("password".to_string(), json!(password));
            let session: String = self
                .result_as("user.login", Value::Object(params))
                .map_err(|e| match e {
                    ApiError::Request { message, .. } => ApiError::Login(message),
                    other => ApiError::call("Failed to log in to Zabbix", other),
                })?;
            session
        } else {
            return Err(ApiError::Login(
                "no authentication method provided; need a token, session or username/password"
                    .to_string(),
            ));
        };

        self.auth = Some(auth);
        self.use_api_token = use_api_token;

        if let Err(e) = self.ensure_authenticated() {
            self.auth = None;
            self.use_api_token = false;
            return Err(e);
        }
        // Guarded by the assignment above.
        Ok(self.auth.clone().unwrap_or_default())
    }

    /// Probe the session with the cheapest possible authenticated call.
    fn ensure_authenticated(&self) -> Result<(), ApiError> {
        self.do_request("host.get", json!({"output": ["hostid"], "limit": 1}))
            .map(|_| ())
    }

    /// End the session.
    ///
    /// API tokens have no server-side session: local state is cleared with
    /// no network call. A token-expired error during `user.logout` is
    /// swallowed — the session is already gone.
    pub fn logout(&mut self) -> Result<(), ApiError> {
        if self.auth.is_none() {
            tracing::debug!("no session to log out of");
            return Ok(());
        }
        if self.use_api_token {
            tracing::debug!("dropping API token without server call");
            self.auth = None;
            self.use_api_token = false;
            return Ok(());
        }
        match self.do_request("user.logout", json!([])) {
            Ok(_) => {}
            Err(e) if e.kind() == Some(crate::ApiErrorKind::TokenExpired) => {
                tracing::debug!("session already expired at logout");
            }
            Err(e) => return Err(ApiError::Logout(Box::new(e))),
        }
        self.auth = None;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Host groups

    pub fn get_hostgroup(
        &self,
        name_or_id: &str,
        options: &GetGroupsOptions,
    ) -> Result<HostGroup, ApiError> {
        let groups = self.get_hostgroups(&[name_or_id.to_string()], options)?;
        groups
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Host group {name_or_id:?}")))
    }

    pub fn get_hostgroups(
        &self,
        names_or_ids: &[String],
        options: &GetGroupsOptions,
    ) -> Result<Vec<HostGroup>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(&mut params, names_or_ids, "name", "groupids", options.search);
        if options.select_hosts {
            params.insert("selectHosts".to_string(), json!("extend"));
        }
        // Templates moved out of host groups in 6.2.
        if options.select_templates && !self.traits()?.split_template_groups {
            params.insert("selectTemplates".to_string(), json!("extend"));
        }
        add_common_params(
            &mut params,
            options.sort_field.as_deref(),
            options.sort_order,
            options.limit,
        );
        self.fetch_list("hostgroup.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch host groups", e))
    }

    pub fn create_hostgroup(&self, name: &str) -> Result<String, ApiError> {
        let result = self
            .do_request("hostgroup.create", json!({"name": name}))
            .map_err(|e| ApiError::call(format!("Failed to create host group {name:?}"), e))?
            .into_result();
        let ids = returned_list(&result, "groupids", "hostgroup.create")
            .map_err(|e| ApiError::call(format!("Failed to create host group {name:?}"), e))?;
        ids.into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("ID of created host group {name:?}")))
    }

    pub fn delete_hostgroup(&self, group_id: &str) -> Result<(), ApiError> {
        self.do_request("hostgroup.delete", json!([group_id]))
            .map(|_| ())
            .map_err(|e| {
                ApiError::call(format!("Failed to delete host group with ID {group_id}"), e)
            })
    }

    pub fn add_hosts_to_hostgroups(
        &self,
        hosts: &[Host],
        groups: &[HostGroup],
    ) -> Result<(), ApiError> {
        let params = json!({
            "groups": groups.iter().map(|g| json!({"groupid": g.groupid})).collect::<Vec<_>>(),
            "hosts": hosts.iter().map(|h| json!({"hostid": h.hostid})).collect::<Vec<_>>(),
        });
        self.do_request("hostgroup.massadd", params)
            .map(|_| ())
            .map_err(|e| {
                let names = group_names(groups);
                ApiError::call(format!("Failed to add hosts to {names}"), e)
            })
    }

    pub fn remove_hosts_from_hostgroups(
        &self,
        hosts: &[Host],
        groups: &[HostGroup],
    ) -> Result<(), ApiError> {
        let params = json!({
            "groupids": groups.iter().map(|g| g.groupid.clone()).collect::<Vec<_>>(),
            "hostids": hosts.iter().map(|h| h.hostid.clone()).collect::<Vec<_>>(),
        });
        self.do_request("hostgroup.massremove", params)
            .map(|_| ())
            .map_err(|e| {
                let names = group_names(groups);
                ApiError::call(format!("Failed to remove hosts from {names}"), e)
            })
    }

    // ------------------------------------------------------------------
    // Template groups
    //
    // Template groups are their own entity from 6.2; before that the same
    // operations run against host groups. Routing is by server version,
    // not configuration.

    fn templategroup_endpoint(&self) -> Result<&'static str, ApiError> {
        Ok(if self.traits()?.split_template_groups {
            "templategroup"
        } else {
            "hostgroup"
        })
    }

    pub fn get_templategroup(
        &self,
        name_or_id: &str,
        options: &GetGroupsOptions,
    ) -> Result<TemplateGroup, ApiError> {
        let groups = self.get_templategroups(&[name_or_id.to_string()], options)?;
        groups
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Template group {name_or_id:?}")))
    }

    pub fn get_templategroups(
        &self,
        names_or_ids: &[String],
        options: &GetGroupsOptions,
    ) -> Result<Vec<TemplateGroup>, ApiError> {
        let endpoint = self.templategroup_endpoint()?;
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(&mut params, names_or_ids, "name", "groupids", options.search);
        if options.select_templates {
            params.insert("selectTemplates".to_string(), json!("extend"));
        }
        add_common_params(
            &mut params,
            options.sort_field.as_deref(),
            options.sort_order,
            options.limit,
        );
        self.fetch_list(&format!("{endpoint}.get"), Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch template groups", e))
    }

    pub fn create_templategroup(&self, name: &str) -> Result<String, ApiError> {
        let endpoint = self.templategroup_endpoint()?;
        let result = self
            .do_request(&format!("{endpoint}.create"), json!({"name": name}))
            .map_err(|e| ApiError::call(format!("Failed to create template group {name:?}"), e))?
            .into_result();
        let ids = returned_list(&result, "groupids", &format!("{endpoint}.create"))
            .map_err(|e| ApiError::call(format!("Failed to create template group {name:?}"), e))?;
        ids.into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("ID of created template group {name:?}")))
    }

    pub fn delete_templategroup(&self, group_id: &str) -> Result<(), ApiError> {
        let endpoint = self.templategroup_endpoint()?;
        self.do_request(&format!("{endpoint}.delete"), json!([group_id]))
            .map(|_| ())
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to delete template group with ID {group_id}"),
                    e,
                )
            })
    }

    // ------------------------------------------------------------------
    // Hosts

    pub fn get_host(&self, name_or_id: &str) -> Result<Host, ApiError> {
        let options = GetHostsOptions {
            limit: Some(1),
            ..Default::default()
        };
        let hosts = self.get_hosts(&[name_or_id.to_string()], &options)?;
        hosts
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Host {name_or_id:?}")))
    }

    pub fn get_hosts(
        &self,
        names_or_ids: &[String],
        options: &GetHostsOptions,
    ) -> Result<Vec<Host>, ApiError> {
        let traits = self.traits()?;
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(&mut params, names_or_ids, "host", "hostids", options.search);

        // Filters narrow with logical AND.
        let mut filter = Params::new();
        if let Some(maintenance) = options.maintenance {
            filter.insert(
                "maintenance_status".to_string(),
                json!(maintenance.as_api_value().to_string()),
            );
        }
        if let Some(monitored) = options.monitored {
            filter.insert(
                "status".to_string(),
                json!(monitored.as_api_value().to_string()),
            );
        }
        if let Some(active) = options.active_interface {
            // The availability filter moved to a top-level parameter in 6.4.
            if self.api_version()?.release() >= (6, 4, 0) {
                params.insert(
                    "active_available".to_string(),
                    json!(active.as_api_value().to_string()),
                );
            } else {
                filter.insert(
                    "active".to_string(),
                    json!(active.as_api_value().to_string()),
                );
            }
        }
        if !filter.is_empty() {
            params.insert("filter".to_string(), Value::Object(filter));
        }

        if !options.hostgroup_ids.is_empty() {
            params.insert("groupids".to_string(), json!(options.hostgroup_ids));
        }
        if let Some(proxy_id) = &options.proxy_id {
            params.insert("proxyids".to_string(), json!(proxy_id));
        }
        if let Some(group_id) = &options.proxy_group_id {
            params.insert("proxy_groupids".to_string(), json!(group_id));
        }
        if options.select_groups {
            // The result still lands under "groups"/"hostgroups"; only the
            // selector is version-dependent.
            params.insert(traits.host_groups_select.to_string(), json!("extend"));
        }
        if options.select_templates {
            params.insert("selectParentTemplates".to_string(), json!("extend"));
        }
        if options.select_inventory {
            params.insert("selectInventory".to_string(), json!("extend"));
        }
        if options.select_macros {
            params.insert("selectMacros".to_string(), json!("extend"));
        }
        if options.select_interfaces {
            params.insert("selectInterfaces".to_string(), json!("extend"));
        }
        add_common_params(
            &mut params,
            options.sort_field.as_deref(),
            options.sort_order,
            options.limit,
        );

        let mut hosts: Vec<Host> = self
            .fetch_list("host.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch hosts", e))?;
        for host in &mut hosts {
            normalize_host(host);
        }
        Ok(hosts)
    }

    pub fn host_exists(&self, name_or_id: &str) -> Result<bool, ApiError> {
        match self.get_host(name_or_id) {
            Ok(_) => Ok(true),
            Err(ApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(ApiError::call(
                format!("Failed to check existence of host {name_or_id:?}"),
                e,
            )),
        }
    }

    pub fn hostgroup_exists(&self, name_or_id: &str) -> Result<bool, ApiError> {
        match self.get_hostgroup(name_or_id, &GetGroupsOptions::default()) {
            Ok(_) => Ok(true),
            Err(ApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(ApiError::call(
                format!("Failed to check existence of host group {name_or_id:?}"),
                e,
            )),
        }
    }

    pub fn host_count(&self) -> Result<u64, ApiError> {
        let result: String = self
            .result_as("host.get", json!({"countOutput": true}))
            .map_err(|e| ApiError::call("Failed to count hosts", e))?;
        result
            .parse()
            .map_err(|_| ApiError::request_other(format!("non-numeric host count {result:?}")))
    }

    pub fn create_host(
        &self,
        host: &str,
        groups: &[HostGroup],
        options: &CreateHostOptions,
    ) -> Result<String, ApiError> {
        let traits = self.traits()?;
        let mut params = Params::new();
        params.insert("host".to_string(), json!(host));
        params.insert(
            "status".to_string(),
            json!(options.status.as_api_value().to_string()),
        );
        params.insert(
            "inventory_mode".to_string(),
            json!(options.inventory_mode.as_api_value()),
        );

        let mut group_ids: Vec<&str> = groups.iter().map(|g| g.groupid.as_str()).collect();
        group_ids.sort_unstable();
        group_ids.dedup();
        params.insert(
            "groups".to_string(),
            json!(group_ids.iter().map(|id| json!({"groupid": id})).collect::<Vec<_>>()),
        );

        if let Some(proxy_id) = &options.proxy_id {
            params.insert(traits.host_proxyid_field.to_string(), json!(proxy_id));
            if traits.proxy_groups {
                params.insert(
                    "monitored_by".to_string(),
                    json!(MonitoredBy::Proxy.as_api_value()),
                );
            }
        }
        if !options.interfaces.is_empty() {
            let interfaces = options
                .interfaces
                .iter()
                .map(NewHostInterface::to_params)
                .collect::<Result<Vec<_>, _>>()?;
            params.insert("interfaces".to_string(), json!(interfaces));
        }
        if let Some(inventory) = &options.inventory {
            params.insert("inventory".to_string(), inventory.clone());
        }
        if let Some(description) = &options.description {
            params.insert("description".to_string(), json!(description));
        }

        let result = self
            .do_request("host.create", Value::Object(params))
            .map_err(|e| ApiError::call(format!("Failed to create host {host:?}"), e))?
            .into_result();
        let ids = returned_list(&result, "hostids", "host.create")
            .map_err(|e| ApiError::call(format!("Failed to create host {host:?}"), e))?;
        ids.into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("ID of created host {host:?}")))
    }

    /// Update basic host information.
    pub fn update_host(
        &self,
        host: &Host,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut params = Params::new();
        params.insert("hostid".to_string(), json!(host.hostid));
        if let Some(name) = name {
            params.insert("host".to_string(), json!(name));
        }
        if let Some(description) = description {
            params.insert("description".to_string(), json!(description));
        }
        self.do_request("host.update", Value::Object(params))
            .map(|_| ())
            .map_err(|e| ApiError::call(format!("Failed to update host {:?}", host.host), e))
    }

    pub fn delete_host(&self, host_id: &str) -> Result<(), ApiError> {
        self.do_request("host.delete", json!([host_id]))
            .map(|_| ())
            .map_err(|e| ApiError::call(format!("Failed to delete host with ID {host_id:?}"), e))
    }

    pub fn update_host_status(
        &self,
        host: &Host,
        status: MonitoringStatus,
    ) -> Result<String, ApiError> {
        let params = json!({
            "hostid": host.hostid,
            "status": status.as_api_value().to_string(),
        });
        let result = self
            .do_request("host.update", params)
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to update monitoring status of host {:?}", host.host),
                    e,
                )
            })?
            .into_result();
        first_id(result, "hostids", "host.update")
    }

    pub fn update_host_inventory(&self, host: &Host, inventory: &Value) -> Result<String, ApiError> {
        let params = json!({
            "hostid": host.hostid,
            "inventory": inventory,
        });
        let result = self
            .do_request("host.update", params)
            .map_err(|e| {
                ApiError::call(format!("Failed to update inventory of host {:?}", host.host), e)
            })?
            .into_result();
        first_id(result, "hostids", "host.update")
    }

    // ------------------------------------------------------------------
    // Host interfaces

    pub fn get_hostinterface(&self, interface_id: &str) -> Result<HostInterface, ApiError> {
        let interfaces = self.get_hostinterfaces(&GetInterfacesOptions {
            interface_ids: vec![interface_id.to_string()],
            ..Default::default()
        })?;
        interfaces
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Host interface with ID {interface_id}")))
    }

    pub fn get_hostinterfaces(
        &self,
        options: &GetInterfacesOptions,
    ) -> Result<Vec<HostInterface>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        if !options.host_ids.is_empty() {
            params.insert("hostids".to_string(), json!(options.host_ids));
        }
        if !options.interface_ids.is_empty() {
            params.insert("interfaceids".to_string(), json!(options.interface_ids));
        }
        if !options.item_ids.is_empty() {
            params.insert("itemids".to_string(), json!(options.item_ids));
        }
        if !options.trigger_ids.is_empty() {
            params.insert("triggerids".to_string(), json!(options.trigger_ids));
        }
        self.fetch_list("hostinterface.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch host interfaces", e))
    }

    pub fn create_host_interface(
        &self,
        host: &Host,
        interface: &NewHostInterface,
    ) -> Result<String, ApiError> {
        let mut params = interface.to_params()?;
        if let Some(obj) = params.as_object_mut() {
            obj.insert("hostid".to_string(), json!(host.hostid));
        }
        let result = self
            .do_request("hostinterface.create", params)
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to create host interface for host {:?}", host.host),
                    e,
                )
            })?
            .into_result();
        first_id(result, "interfaceids", "hostinterface.create")
    }

    pub fn update_host_interface(
        &self,
        interface: &HostInterface,
        changes: &UpdateHostInterface,
    ) -> Result<(), ApiError> {
        let interface_id = interface.interfaceid.as_deref().ok_or_else(|| {
            ApiError::request_other("cannot update a host interface without an ID")
        })?;
        let mut params = Params::new();
        params.insert("interfaceid".to_string(), json!(interface_id));
        if let Some(main) = changes.main {
            params.insert("main".to_string(), json!(u8::from(main)));
        }
        if let Some(interface_type) = changes.interface_type {
            params.insert("type".to_string(), json!(interface_type.as_api_value()));
        }
        if let Some(use_ip) = changes.use_ip {
            params.insert("useip".to_string(), json!(u8::from(use_ip)));
        }
        if let Some(port) = &changes.port {
            params.insert("port".to_string(), json!(port));
        }
        if let Some(ip) = &changes.ip {
            params.insert("ip".to_string(), json!(ip));
        }
        if let Some(dns) = &changes.dns {
            params.insert("dns".to_string(), json!(dns));
        }
        if let Some(details) = &changes.details {
            params.insert("details".to_string(), details.to_params());
        }
        self.do_request("hostinterface.update", Value::Object(params))
            .map(|_| ())
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to update host interface with ID {interface_id}"),
                    e,
                )
            })
    }

    pub fn delete_host_interface(&self, interface_id: &str) -> Result<(), ApiError> {
        self.do_request("hostinterface.delete", json!([interface_id]))
            .map(|_| ())
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to delete host interface with ID {interface_id}"),
                    e,
                )
            })
    }

    // ------------------------------------------------------------------
    // Templates

    pub fn get_template(
        &self,
        name_or_id: &str,
        options: &GetTemplatesOptions,
    ) -> Result<Template, ApiError> {
        let templates = self.get_templates(&[name_or_id.to_string()], options)?;
        templates
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Template {name_or_id:?}")))
    }

    pub fn get_templates(
        &self,
        names_or_ids: &[String],
        options: &GetTemplatesOptions,
    ) -> Result<Vec<Template>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(&mut params, names_or_ids, "host", "templateids", true);
        if options.select_hosts {
            params.insert("selectHosts".to_string(), json!("extend"));
        }
        if options.select_templates {
            params.insert("selectTemplates".to_string(), json!("extend"));
        }
        if options.select_parent_templates {
            params.insert("selectParentTemplates".to_string(), json!("extend"));
        }
        self.fetch_list("template.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch templates", e))
    }

    pub fn link_templates_to_hosts(
        &self,
        templates: &[Template],
        hosts: &[Host],
    ) -> Result<(), ApiError> {
        require_some(templates, "at least one template is required")?;
        require_some(hosts, "at least one host is required")?;
        let params = json!({
            "templates": id_objects(templates.iter().map(|t| &t.templateid), "templateid"),
            "hosts": id_objects(hosts.iter().map(|h| &h.hostid), "hostid"),
        });
        self.do_request("host.massadd", params)
            .map(|_| ())
            .map_err(|e| ApiError::call("Failed to link templates to hosts", e))
    }

    /// Unlink templates from hosts; with `clear` the templated entities are
    /// removed from the hosts as well (`templateids_clear`).
    pub fn unlink_templates_from_hosts(
        &self,
        templates: &[Template],
        hosts: &[Host],
        clear: bool,
    ) -> Result<(), ApiError> {
        require_some(templates, "at least one template is required")?;
        require_some(hosts, "at least one host is required")?;
        let template_ids: Vec<&str> = templates.iter().map(|t| t.templateid.as_str()).collect();
        let mut params = Params::new();
        params.insert(
            "hostids".to_string(),
            json!(hosts.iter().map(|h| h.hostid.as_str()).collect::<Vec<_>>()),
        );
        let key = if clear { "templateids_clear" } else { "templateids" };
        params.insert(key.to_string(), json!(template_ids));
        self.do_request("host.massremove", Value::Object(params))
            .map(|_| ())
            .map_err(|e| ApiError::call("Failed to unlink templates from hosts", e))
    }

    /// Link source templates to destination templates (destinations inherit
    /// the sources' entities).
    pub fn link_templates(
        &self,
        source: &[Template],
        destination: &[Template],
    ) -> Result<(), ApiError> {
        require_some(source, "at least one source template is required")?;
        require_some(destination, "at least one destination template is required")?;
        let params = json!({
            "templates": id_objects(destination.iter().map(|t| &t.templateid), "templateid"),
            "templates_link": id_objects(source.iter().map(|t| &t.templateid), "templateid"),
        });
        self.do_request("template.massadd", params)
            .map(|_| ())
            .map_err(|e| ApiError::call("Failed to link templates", e))
    }

    pub fn unlink_templates(
        &self,
        source: &[Template],
        destination: &[Template],
        clear: bool,
    ) -> Result<(), ApiError> {
        require_some(source, "at least one source template is required")?;
        require_some(destination, "at least one destination template is required")?;
        let source_ids: Vec<&str> = source.iter().map(|t| t.templateid.as_str()).collect();
        let mut params = Params::new();
        params.insert(
            "templateids".to_string(),
            json!(destination.iter().map(|t| t.templateid.as_str()).collect::<Vec<_>>()),
        );
        params.insert("templateids_link".to_string(), json!(source_ids));
        // template.massremove needs templateids_link AND templateids_clear
        // to actually clear; clear alone only unlinks.
        if clear {
            params.insert("templateids_clear".to_string(), json!(source_ids));
        }
        self.do_request("template.massremove", Value::Object(params))
            .map(|_| ())
            .map_err(|e| ApiError::call("Failed to unlink templates", e))
    }

    /// Link templates to host groups (<6.2) or template groups (≥6.2);
    /// callers resolve the right group kind for the server version.
    pub fn link_templates_to_groups(
        &self,
        templates: &[Template],
        group_ids: &[String],
    ) -> Result<(), ApiError> {
        require_some(templates, "at least one template is required")?;
        require_some(group_ids, "at least one group is required")?;
        let params = json!({
            "templates": id_objects(templates.iter().map(|t| &t.templateid), "templateid"),
            "groups": group_ids.iter().map(|id| json!({"groupid": id})).collect::<Vec<_>>(),
        });
        self.do_request("template.massadd", params)
            .map(|_| ())
            .map_err(|e| ApiError::call("Failed to link templates to groups", e))
    }

    pub fn remove_templates_from_groups(
        &self,
        templates: &[Template],
        group_ids: &[String],
    ) -> Result<(), ApiError> {
        require_some(templates, "at least one template is required")?;
        require_some(group_ids, "at least one group is required")?;
        let params = json!({
            "templateids": templates.iter().map(|t| t.templateid.as_str()).collect::<Vec<_>>(),
            "groupids": group_ids,
        });
        self.do_request("template.massremove", params)
            .map(|_| ())
            .map_err(|e| ApiError::call("Failed to remove templates from groups", e))
    }

    // ------------------------------------------------------------------
    // User groups

    pub fn get_usergroup(
        &self,
        name_or_id: &str,
        options: &GetUsergroupsOptions,
    ) -> Result<Usergroup, ApiError> {
        let groups = self.get_usergroups(&[name_or_id.to_string()], options)?;
        groups
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("User group {name_or_id:?}")))
    }

    pub fn get_usergroups(
        &self,
        names_or_ids: &[String],
        options: &GetUsergroupsOptions,
    ) -> Result<Vec<Usergroup>, ApiError> {
        let traits = self.traits()?;
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(&mut params, names_or_ids, "name", "usrgrpids", options.search);
        if options.select_rights {
            match traits.usergroup_rights_select {
                RightsSelect::Unified(param) => {
                    params.insert(param.to_string(), json!("extend"));
                }
                RightsSelect::Split { host, template } => {
                    params.insert(host.to_string(), json!("extend"));
                    params.insert(template.to_string(), json!("extend"));
                }
            }
        }
        if options.select_users {
            params.insert("selectUsers".to_string(), json!("extend"));
        }
        add_common_params(&mut params, None, None, options.limit);
        self.fetch_list("usergroup.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch user groups", e))
    }

    pub fn create_usergroup(
        &self,
        name: &str,
        disabled: bool,
        gui_access: GuiAccess,
    ) -> Result<String, ApiError> {
        let params = json!({
            "name": name,
            "users_status": u8::from(disabled),
            "gui_access": gui_access.as_api_value(),
        });
        let result = self
            .do_request("usergroup.create", params)
            .map_err(|e| ApiError::call(format!("Failed to create user group {name:?}"), e))?
            .into_result();
        first_id(result, "usrgrpids", "usergroup.create")
    }

    /// Add users to a group. Users already in the group are kept.
    pub fn add_usergroup_users(
        &self,
        usergroup_name: &str,
        users: &[User],
    ) -> Result<(), ApiError> {
        self.update_usergroup_users(usergroup_name, users, false)
    }

    /// Remove users from a group. Users not in the group are ignored.
    pub fn remove_usergroup_users(
        &self,
        usergroup_name: &str,
        users: &[User],
    ) -> Result<(), ApiError> {
        self.update_usergroup_users(usergroup_name, users, true)
    }

    fn update_usergroup_users(
        &self,
        usergroup_name: &str,
        users: &[User],
        remove: bool,
    ) -> Result<(), ApiError> {
        let usergroup = self.get_usergroup(
            usergroup_name,
            &GetUsergroupsOptions {
                select_users: true,
                ..Default::default()
            },
        )?;

        let mut user_ids: Vec<String> =
            usergroup.users.iter().map(|u| u.userid.clone()).collect();
        if remove {
            user_ids.retain(|id| !users.iter().any(|u| &u.userid == id));
        } else {
            for user in users {
                if !user_ids.contains(&user.userid) {
                    user_ids.push(user.userid.clone());
                }
            }
        }

        let mut params = Params::new();
        params.insert("usrgrpid".to_string(), json!(usergroup.usrgrpid));
        if self.api_version()?.release() >= (6, 0, 0) {
            params.insert(
                "users".to_string(),
                json!(user_ids.iter().map(|id| json!({"userid": id})).collect::<Vec<_>>()),
            );
        } else {
            params.insert("userids".to_string(), json!(user_ids));
        }
        self.do_request("usergroup.update", Value::Object(params))
            .map(|_| ())
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to update users of user group {usergroup_name:?}"),
                    e,
                )
            })
    }

    /// Grant `permission` on the named host/template groups, merging with
    /// the group's existing rights.
    pub fn update_usergroup_rights(
        &self,
        usergroup_name: &str,
        group_names: &[String],
        permission: UsergroupPermission,
        target: RightsTarget,
    ) -> Result<(), ApiError> {
        let traits = self.traits()?;
        let usergroup = self.get_usergroup(
            usergroup_name,
            &GetUsergroupsOptions {
                select_rights: true,
                ..Default::default()
            },
        )?;

        let mut params = Params::new();
        params.insert("usrgrpid".to_string(), json!(usergroup.usrgrpid));
        match target {
            RightsTarget::HostGroups => {
                let group_ids = group_names
                    .iter()
                    .map(|name| {
                        self.get_hostgroup(name, &GetGroupsOptions::default())
                            .map(|g| g.groupid)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let existing = if traits.split_template_groups {
                    &usergroup.hostgroup_rights
                } else {
                    &usergroup.rights
                };
                let rights = merged_rights(existing, permission, &group_ids);
                let param = if traits.split_template_groups {
                    "hostgroup_rights"
                } else {
                    "rights"
                };
                params.insert(param.to_string(), rights);
            }
            RightsTarget::TemplateGroups => {
                if !traits.split_template_groups {
                    return Err(ApiError::UnsupportedVersion(
                        "template group rights require Zabbix 6.2 or later".to_string(),
                    ));
                }
                let group_ids = group_names
                    .iter()
                    .map(|name| {
                        self.get_templategroup(name, &GetGroupsOptions::default())
                            .map(|g| g.groupid)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let rights = merged_rights(&usergroup.templategroup_rights, permission, &group_ids);
                params.insert("templategroup_rights".to_string(), rights);
            }
        }
        self.do_request("usergroup.update", Value::Object(params))
            .map(|_| ())
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to update rights of user group {usergroup_name:?}"),
                    e,
                )
            })
    }

    // ------------------------------------------------------------------
    // Users and roles

    fn role_id_field(&self) -> Result<&'static str, ApiError> {
        // Roles replaced user types in 5.2.
        Ok(if self.api_version()?.release() < (5, 2, 0) {
            "type"
        } else {
            "roleid"
        })
    }

    pub fn get_user(&self, username: &str) -> Result<User, ApiError> {
        let users = self.get_users(&[username.to_string()], &GetUsersOptions::default())?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("User with username {username:?}")))
    }

    pub fn get_users(
        &self,
        names_or_ids: &[String],
        options: &GetUsersOptions,
    ) -> Result<Vec<User>, ApiError> {
        let traits = self.traits()?;
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(
            &mut params,
            names_or_ids,
            traits.user_name_field,
            "userids",
            options.search,
        );
        if let Some(role) = options.role {
            let field = self.role_id_field()?;
            params.insert(
                "filter".to_string(),
                json!({ field: role.as_api_value().to_string() }),
            );
        }
        add_common_params(
            &mut params,
            options.sort_field.as_deref(),
            options.sort_order,
            options.limit,
        );
        self.fetch_list("user.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch users", e))
    }

    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        options: &CreateUserOptions,
    ) -> Result<String, ApiError> {
        let traits = self.traits()?;
        let mut params = Params::new();
        params.insert(traits.user_name_field.to_string(), json!(username));
        params.insert("passwd".to_string(), json!(password));
        if let Some(first_name) = &options.first_name {
            params.insert("name".to_string(), json!(first_name));
        }
        if let Some(last_name) = &options.last_name {
            params.insert("surname".to_string(), json!(last_name));
        }
        if let Some(role) = options.role {
            params.insert(
                self.role_id_field()?.to_string(),
                json!(role.as_api_value().to_string()),
            );
        }
        if !options.usergroup_ids.is_empty() {
            params.insert(
                "usrgrps".to_string(),
                json!(
                    options
                        .usergroup_ids
                        .iter()
                        .map(|id| json!({"usrgrpid": id}))
                        .collect::<Vec<_>>()
                ),
            );
        }
        if let Some(autologin) = options.autologin {
            params.insert("autologin".to_string(), json!(u8::from(autologin)));
        }
        if let Some(autologout) = &options.autologout {
            params.insert("autologout".to_string(), json!(autologout));
        }
        let result = self
            .do_request("user.create", Value::Object(params))
            .map_err(|e| ApiError::call(format!("Failed to create user {username:?}"), e))?
            .into_result();
        first_id(result, "userids", "user.create")
    }

    pub fn update_user(&self, user: &User, changes: &UpdateUserOptions) -> Result<String, ApiError> {
        let mut params = Params::new();
        params.insert("userid".to_string(), json!(user.userid));
        if let (Some(current), Some(new)) = (&changes.current_password, &changes.new_password) {
            params.insert("current_passwd".to_string(), json!(current));
            params.insert("passwd".to_string(), json!(new));
        }
        if let Some(first_name) = &changes.first_name {
            params.insert("name".to_string(), json!(first_name));
        }
        if let Some(last_name) = &changes.last_name {
            params.insert("surname".to_string(), json!(last_name));
        }
        if let Some(role) = changes.role {
            params.insert(
                self.role_id_field()?.to_string(),
                json!(role.as_api_value().to_string()),
            );
        }
        if let Some(autologin) = changes.autologin {
            params.insert("autologin".to_string(), json!(u8::from(autologin)));
        }
        if let Some(autologout) = &changes.autologout {
            params.insert("autologout".to_string(), json!(autologout));
        }
        let result = self
            .do_request("user.update", Value::Object(params))
            .map_err(|e| {
                ApiError::call(format!("Failed to update user {:?}", user.username), e)
            })?
            .into_result();
        first_id(result, "userids", "user.update")
    }

    pub fn delete_user(&self, user: &User) -> Result<String, ApiError> {
        let result = self
            .do_request("user.delete", json!([user.userid]))
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to delete user {:?} ({})", user.username, user.userid),
                    e,
                )
            })?
            .into_result();
        first_id(result, "userids", "user.delete")
    }

    pub fn get_role(&self, name_or_id: &str) -> Result<Role, ApiError> {
        let roles = self.get_roles(Some(name_or_id))?;
        roles
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Role {name_or_id:?}")))
    }

    pub fn get_roles(&self, name_or_id: Option<&str>) -> Result<Vec<Role>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        if let Some(name_or_id) = name_or_id {
            if name_or_id.chars().all(|c| c.is_ascii_digit()) {
                params.insert("roleids".to_string(), json!(name_or_id));
            } else {
                params.insert("filter".to_string(), json!({"name": name_or_id}));
            }
        }
        self.fetch_list("role.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch roles", e))
    }

    // ------------------------------------------------------------------
    // Macros

    pub fn get_macro(
        &self,
        host: Option<&Host>,
        macro_name: Option<&str>,
        options: &GetMacrosOptions,
    ) -> Result<Macro, ApiError> {
        let macros = self.get_macros(host, macro_name, options)?;
        macros
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found("Macro"))
    }

    pub fn get_macros(
        &self,
        host: Option<&Host>,
        macro_name: Option<&str>,
        options: &GetMacrosOptions,
    ) -> Result<Vec<Macro>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        if let Some(host) = host {
            params.insert("hostids".to_string(), json!(host.hostid));
        }
        if let Some(macro_name) = macro_name {
            params.insert("search".to_string(), json!({"macro": macro_name}));
            params.insert("searchWildcardsEnabled".to_string(), json!(true));
        }
        if options.select_hosts {
            params.insert("selectHosts".to_string(), json!("extend"));
        }
        if options.select_templates {
            params.insert("selectTemplates".to_string(), json!("extend"));
        }
        add_common_params(
            &mut params,
            Some(options.sort_field.as_deref().unwrap_or("macro")),
            options.sort_order,
            options.limit,
        );
        self.fetch_list("usermacro.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch macros", e))
    }

    /// Hosts that carry the given macro.
    pub fn get_hosts_with_macro(&self, macro_name: &str) -> Result<Vec<Host>, ApiError> {
        let macros = self.get_macros(
            None,
            Some(macro_name),
            &GetMacrosOptions {
                select_hosts: true,
                ..Default::default()
            },
        )?;
        let first = macros
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Macro {macro_name:?}")))?;
        Ok(first.hosts)
    }

    pub fn create_macro(&self, host: &Host, macro_name: &str, value: &str) -> Result<String, ApiError> {
        let params = json!({
            "hostid": host.hostid,
            "macro": macro_name,
            "value": value,
        });
        let result = self
            .do_request("usermacro.create", params)
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to create macro {macro_name:?} for host {:?}", host.host),
                    e,
                )
            })?
            .into_result();
        first_id(result, "hostmacroids", "usermacro.create")
    }

    pub fn update_macro(&self, macro_id: &str, value: &str) -> Result<String, ApiError> {
        let params = json!({"hostmacroid": macro_id, "value": value});
        let result = self
            .do_request("usermacro.update", params)
            .map_err(|e| ApiError::call(format!("Failed to update macro with ID {macro_id}"), e))?
            .into_result();
        first_id(result, "hostmacroids", "usermacro.update")
    }

    pub fn get_global_macro(&self, macro_name: &str) -> Result<GlobalMacro, ApiError> {
        let macros = self.get_global_macros(Some(macro_name))?;
        macros
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Global macro {macro_name:?}")))
    }

    pub fn get_global_macros(&self, macro_name: Option<&str>) -> Result<Vec<GlobalMacro>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        params.insert("globalmacro".to_string(), json!(true));
        if let Some(macro_name) = macro_name {
            params.insert("search".to_string(), json!({"macro": macro_name}));
            params.insert("searchWildcardsEnabled".to_string(), json!(true));
        }
        add_common_params(&mut params, Some("macro"), None, None);
        self.fetch_list("usermacro.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch global macros", e))
    }

    pub fn create_global_macro(&self, macro_name: &str, value: &str) -> Result<String, ApiError> {
        let result = self
            .do_request(
                "usermacro.createglobal",
                json!({"macro": macro_name, "value": value}),
            )
            .map_err(|e| {
                ApiError::call(format!("Failed to create global macro {macro_name:?}"), e)
            })?
            .into_result();
        first_id(result, "globalmacroids", "usermacro.createglobal")
    }

    pub fn update_global_macro(&self, macro_id: &str, value: &str) -> Result<String, ApiError> {
        let result = self
            .do_request(
                "usermacro.updateglobal",
                json!({"globalmacroid": macro_id, "value": value}),
            )
            .map_err(|e| {
                ApiError::call(format!("Failed to update global macro with ID {macro_id}"), e)
            })?
            .into_result();
        first_id(result, "globalmacroids", "usermacro.updateglobal")
    }

    pub fn delete_global_macro(&self, macro_id: &str) -> Result<String, ApiError> {
        let result = self
            .do_request("usermacro.deleteglobal", json!([macro_id]))
            .map_err(|e| {
                ApiError::call(format!("Failed to delete global macro with ID {macro_id}"), e)
            })?
            .into_result();
        first_id(result, "globalmacroids", "usermacro.deleteglobal")
    }

    // ------------------------------------------------------------------
    // Maintenances

    pub fn get_maintenance(&self, maintenance_id: &str) -> Result<Maintenance, ApiError> {
        let maintenances = self.get_maintenances(&GetMaintenancesOptions {
            ids: vec![maintenance_id.to_string()],
            ..Default::default()
        })?;
        maintenances
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Maintenance {maintenance_id:?}")))
    }

    pub fn get_maintenances(
        &self,
        options: &GetMaintenancesOptions,
    ) -> Result<Vec<Maintenance>, ApiError> {
        let traits = self.traits()?;
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        params.insert("selectHosts".to_string(), json!("extend"));
        params.insert(traits.host_groups_select.to_string(), json!("extend"));
        params.insert("selectTimeperiods".to_string(), json!("extend"));
        if !options.ids.is_empty() {
            params.insert("maintenanceids".to_string(), json!(options.ids));
        }
        if !options.hostgroup_ids.is_empty() {
            params.insert("groupids".to_string(), json!(options.hostgroup_ids));
        }
        if !options.host_ids.is_empty() {
            params.insert("hostids".to_string(), json!(options.host_ids));
        }
        if let Some(name) = &options.name {
            params.insert("filter".to_string(), json!({"name": name}));
        }
        add_common_params(&mut params, None, None, options.limit);
        self.fetch_list("maintenance.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch maintenances", e))
    }

    /// Create a one-time maintenance window covering `active_since` to
    /// `active_till`.
    pub fn create_maintenance(
        &self,
        name: &str,
        active_since: chrono::DateTime<chrono::Utc>,
        active_till: chrono::DateTime<chrono::Utc>,
        options: &CreateMaintenanceOptions,
    ) -> Result<String, ApiError> {
        if options.hosts.is_empty() && options.hostgroup_ids.is_empty() {
            return Err(ApiError::request_other(
                "at least one host or host group is required",
            ));
        }
        let since = active_since.timestamp();
        let till = active_till.timestamp();
        let mut params = Params::new();
        params.insert("name".to_string(), json!(name));
        params.insert("active_since".to_string(), json!(since));
        params.insert("active_till".to_string(), json!(till));
        params.insert(
            "timeperiods".to_string(),
            json!([{
                "timeperiod_type": 0,
                "start_date": since,
                "period": till - since,
            }]),
        );
        if let Some(description) = &options.description {
            params.insert("description".to_string(), json!(description));
        }
        let modern = self.api_version()?.release() >= (6, 0, 0);
        if !options.hosts.is_empty() {
            if modern {
                params.insert(
                    "hosts".to_string(),
                    json!(id_objects(options.hosts.iter().map(|h| &h.hostid), "hostid")),
                );
            } else {
                params.insert(
                    "hostids".to_string(),
                    json!(options.hosts.iter().map(|h| h.hostid.as_str()).collect::<Vec<_>>()),
                );
            }
        }
        if !options.hostgroup_ids.is_empty() {
            if modern {
                params.insert(
                    "groups".to_string(),
                    json!(
                        options
                            .hostgroup_ids
                            .iter()
                            .map(|id| json!({"groupid": id}))
                            .collect::<Vec<_>>()
                    ),
                );
            } else {
                params.insert("groupids".to_string(), json!(options.hostgroup_ids));
            }
        }
        if let Some(mode) = options.data_collection {
            params.insert("maintenance_type".to_string(), json!(mode.as_api_value()));
        }
        let result = self
            .do_request("maintenance.create", Value::Object(params))
            .map_err(|e| ApiError::call(format!("Failed to create maintenance {name:?}"), e))?
            .into_result();
        first_id(result, "maintenanceids", "maintenance.create")
    }

    pub fn delete_maintenances(&self, maintenance_ids: &[String]) -> Result<Vec<String>, ApiError> {
        let result = self
            .do_request("maintenance.delete", json!(maintenance_ids))
            .map_err(|e| {
                ApiError::call(format!("Failed to delete maintenances {maintenance_ids:?}"), e)
            })?
            .into_result();
        returned_list(&result, "maintenanceids", "maintenance.delete")
    }

    // ------------------------------------------------------------------
    // Events and triggers

    pub fn get_event(&self, event_id: &str) -> Result<Event, ApiError> {
        let events = self.get_events(&GetEventsOptions {
            event_ids: vec![event_id.to_string()],
            ..Default::default()
        })?;
        events
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Event with ID {event_id:?}")))
    }

    pub fn get_events(&self, options: &GetEventsOptions) -> Result<Vec<Event>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        if !options.event_ids.is_empty() {
            params.insert("eventids".to_string(), json!(options.event_ids));
        }
        if !options.group_ids.is_empty() {
            params.insert("groupids".to_string(), json!(options.group_ids));
        }
        if !options.host_ids.is_empty() {
            params.insert("hostids".to_string(), json!(options.host_ids));
        }
        if !options.object_ids.is_empty() {
            params.insert("objectids".to_string(), json!(options.object_ids));
        }
        add_common_params(
            &mut params,
            options.sort_field.as_deref(),
            options.sort_order,
            options.limit,
        );
        self.fetch_list("event.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch events", e))
    }

    /// Acknowledge (or otherwise act on) events. The action bitmask is
    /// composed from the flags; adding a message sets the message bit.
    pub fn acknowledge_events(
        &self,
        event_ids: &[String],
        message: Option<&str>,
        action: AcknowledgeAction,
    ) -> Result<Vec<String>, ApiError> {
        require_some(event_ids, "at least one event is required")?;
        let mut params = Params::new();
        params.insert("eventids".to_string(), json!(event_ids));
        params.insert(
            "action".to_string(),
            json!(action.as_api_value(message.is_some())),
        );
        if let Some(message) = message {
            params.insert("message".to_string(), json!(message));
        }
        let result = self
            .do_request("event.acknowledge", Value::Object(params))
            .map_err(|e| ApiError::call(format!("Failed to acknowledge events {event_ids:?}"), e))?
            .into_result();
        // The API docs promise strings but the server sends integers here.
        returned_list(&result, "eventids", "event.acknowledge")
    }

    pub fn get_triggers(&self, options: &GetTriggersOptions) -> Result<Vec<Trigger>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        if !options.trigger_ids.is_empty() {
            params.insert("triggerids".to_string(), json!(options.trigger_ids));
        }
        if !options.hostgroup_ids.is_empty() {
            params.insert("groupids".to_string(), json!(options.hostgroup_ids));
        }
        if !options.template_ids.is_empty() {
            params.insert("templateids".to_string(), json!(options.template_ids));
        }
        if let Some(description) = &options.description {
            params.insert("search".to_string(), json!({"description": description}));
        }
        let mut filter = Params::new();
        if let Some(priority) = options.priority {
            filter.insert(
                "priority".to_string(),
                json!(priority.as_api_value().to_string()),
            );
        }
        if !filter.is_empty() {
            params.insert("filter".to_string(), Value::Object(filter));
        }
        if options.unacknowledged {
            params.insert("withLastEventUnacknowledged".to_string(), json!(true));
        }
        if let Some(skip) = options.skip_dependent {
            params.insert("skipDependent".to_string(), json!(u8::from(skip)));
        }
        if let Some(monitored) = options.monitored {
            params.insert("monitored".to_string(), json!(u8::from(monitored)));
        }
        if let Some(active) = options.active {
            params.insert("active".to_string(), json!(u8::from(active)));
        }
        if options.expand_description {
            params.insert("expandDescription".to_string(), json!(1));
        }
        if options.select_hosts {
            params.insert("selectHosts".to_string(), json!("extend"));
        }
        add_common_params(
            &mut params,
            Some(options.sort_field.as_deref().unwrap_or("lastchange")),
            Some(options.sort_order.unwrap_or(SortOrder::Desc)),
            options.limit,
        );
        self.fetch_list("trigger.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch triggers", e))
    }

    // ------------------------------------------------------------------
    // Items

    pub fn get_items(
        &self,
        names: &[String],
        options: &GetItemsOptions,
    ) -> Result<Vec<Item>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(&mut params, names, "name", "itemids", options.search);
        if !options.template_ids.is_empty() {
            params.insert("templateids".to_string(), json!(options.template_ids));
        }
        if options.monitored {
            params.insert("monitored".to_string(), json!(true));
        }
        if options.select_hosts {
            params.insert("selectHosts".to_string(), json!("extend"));
        }
        add_common_params(&mut params, None, None, options.limit);
        self.fetch_list("item.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch items", e))
    }

    // ------------------------------------------------------------------
    // Proxies and proxy groups

    pub fn get_proxy(&self, name_or_id: &str, select_hosts: bool) -> Result<Proxy, ApiError> {
        let proxies = self.get_proxies(&[name_or_id.to_string()], select_hosts)?;
        proxies
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Proxy {name_or_id:?}")))
    }

    pub fn get_proxies(
        &self,
        names_or_ids: &[String],
        select_hosts: bool,
    ) -> Result<Vec<Proxy>, ApiError> {
        let traits = self.traits()?;
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(
            &mut params,
            names_or_ids,
            traits.proxy_name_field,
            "proxyids",
            true,
        );
        if select_hosts {
            params.insert("selectHosts".to_string(), json!("extend"));
        }
        self.fetch_list("proxy.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch proxies", e))
    }

    fn require_proxy_groups(&self) -> Result<(), ApiError> {
        if !self.traits()?.proxy_groups {
            return Err(ApiError::UnsupportedVersion(
                "proxy groups require Zabbix 7.0 or later".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_proxy_group(
        &self,
        name_or_id: &str,
        select_proxies: bool,
    ) -> Result<ProxyGroup, ApiError> {
        let groups = self.get_proxy_groups(&[name_or_id.to_string()], select_proxies)?;
        groups
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Proxy group {name_or_id:?}")))
    }

    pub fn get_proxy_groups(
        &self,
        names_or_ids: &[String],
        select_proxies: bool,
    ) -> Result<Vec<ProxyGroup>, ApiError> {
        self.require_proxy_groups()?;
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(&mut params, names_or_ids, "name", "proxy_groupids", true);
        if select_proxies {
            params.insert("selectProxies".to_string(), json!("extend"));
        }
        self.fetch_list("proxygroup.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch proxy groups", e))
    }

    /// Proxy group membership is edited through the proxy, not the group.
    pub fn add_proxy_to_group(
        &self,
        proxy: &Proxy,
        group: &ProxyGroup,
        local_address: &str,
        local_port: &str,
    ) -> Result<(), ApiError> {
        self.require_proxy_groups()?;
        let params = json!({
            "proxyid": proxy.proxyid,
            "proxy_groupid": group.proxy_groupid,
            "local_address": local_address,
            "local_port": local_port,
        });
        self.do_request("proxy.update", params)
            .map(|_| ())
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to add proxy {:?} to group {:?}", proxy.name, group.name),
                    e,
                )
            })
    }

    pub fn remove_proxy_from_group(&self, proxy: &Proxy) -> Result<(), ApiError> {
        self.require_proxy_groups()?;
        let params = json!({
            "proxyid": proxy.proxyid,
            "proxy_groupid": 0,
        });
        self.do_request("proxy.update", params)
            .map(|_| ())
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to remove proxy {:?} from its group", proxy.name),
                    e,
                )
            })
    }

    pub fn add_hosts_to_proxy_group(
        &self,
        hosts: &[Host],
        group: &ProxyGroup,
    ) -> Result<Vec<String>, ApiError> {
        self.require_proxy_groups()?;
        let params = json!({
            "hosts": id_objects(hosts.iter().map(|h| &h.hostid), "hostid"),
            "proxy_groupid": group.proxy_groupid,
            "monitored_by": MonitoredBy::ProxyGroup.as_api_value(),
        });
        let result = self
            .do_request("host.massupdate", params)
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to add hosts to proxy group {:?}", group.name),
                    e,
                )
            })?
            .into_result();
        returned_list(&result, "hostids", "host.massupdate")
    }

    /// Move hosts to a proxy. On ≥7.0 also flips `monitored_by`.
    pub fn update_hosts_proxy(
        &self,
        hosts: &[Host],
        proxy: &Proxy,
    ) -> Result<Vec<String>, ApiError> {
        let traits = self.traits()?;
        let mut params = Params::new();
        params.insert(
            "hosts".to_string(),
            json!(id_objects(hosts.iter().map(|h| &h.hostid), "hostid")),
        );
        params.insert(traits.host_proxyid_field.to_string(), json!(proxy.proxyid));
        if traits.proxy_groups {
            params.insert(
                "monitored_by".to_string(),
                json!(MonitoredBy::Proxy.as_api_value()),
            );
        }
        let result = self
            .do_request("host.massupdate", Value::Object(params))
            .map_err(|e| {
                ApiError::call(
                    format!("Failed to move hosts to proxy {:?}", proxy.name),
                    e,
                )
            })?
            .into_result();
        returned_list(&result, "hostids", "host.massupdate")
    }

    /// Detach hosts from any proxy; they are monitored by the server again.
    pub fn clear_host_proxies(&self, hosts: &[Host]) -> Result<Vec<String>, ApiError> {
        let traits = self.traits()?;
        let mut params = Params::new();
        params.insert(
            "hosts".to_string(),
            json!(id_objects(hosts.iter().map(|h| &h.hostid), "hostid")),
        );
        if traits.proxy_groups {
            params.insert(
                "monitored_by".to_string(),
                json!(MonitoredBy::Server.as_api_value()),
            );
        } else {
            params.insert(traits.host_proxyid_field.to_string(), json!("0"));
        }
        let result = self
            .do_request("host.massupdate", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to clear host proxies", e))?
            .into_result();
        returned_list(&result, "hostids", "host.massupdate")
    }

    // ------------------------------------------------------------------
    // Media types, images, maps

    pub fn get_media_types(&self, names_or_ids: &[String]) -> Result<Vec<MediaType>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(&mut params, names_or_ids, "name", "mediatypeids", true);
        self.fetch_list("mediatype.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch media types", e))
    }

    pub fn get_images(
        &self,
        names_or_ids: &[String],
        select_image: bool,
    ) -> Result<Vec<Image>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(&mut params, names_or_ids, "name", "imageids", true);
        if select_image {
            params.insert("selectImage".to_string(), json!(true));
        }
        self.fetch_list("image.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch images", e))
    }

    pub fn get_maps(&self, names_or_ids: &[String]) -> Result<Vec<Map>, ApiError> {
        let mut params = Params::new();
        params.insert("output".to_string(), json!("extend"));
        parse_name_or_id_arg(&mut params, names_or_ids, "name", "sysmapids", true);
        self.fetch_list("map.get", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to fetch maps", e))
    }

    // ------------------------------------------------------------------
    // Configuration export / import

    /// Serialize objects via `configuration.export`.
    ///
    /// Pretty-printing is not supported for XML, nor before 5.4; in both
    /// cases the request is downgraded and a [`Warning`] attached to the
    /// output for the front-end to display.
    pub fn export_configuration(
        &self,
        selection: &ExportSelection,
        format: ExportFormat,
        pretty: bool,
    ) -> Result<ExportOutput, ApiError> {
        let mut warnings = Vec::new();
        let mut params = Params::new();
        params.insert("format".to_string(), json!(format.as_str()));
        if pretty {
            if !self.traits()?.pretty_export {
                warnings.push(Warning::new(
                    "pretty-printing requires Zabbix 5.4 or later; exporting compact output",
                ));
            } else if format == ExportFormat::Xml {
                warnings.push(Warning::new(
                    "pretty-printing is not supported for XML; exporting compact output",
                ));
            } else {
                params.insert("prettyprint".to_string(), json!(true));
            }
        }

        let mut options = Params::new();
        let mut add = |key: &str, ids: &[String]| {
            if !ids.is_empty() {
                options.insert(key.to_string(), json!(ids));
            }
        };
        add("host_groups", &selection.host_group_ids);
        add("template_groups", &selection.template_group_ids);
        add("hosts", &selection.host_ids);
        add("images", &selection.image_ids);
        add("maps", &selection.map_ids);
        add("templates", &selection.template_ids);
        add("mediaTypes", &selection.media_type_ids);
        if !options.is_empty() {
            params.insert("options".to_string(), Value::Object(options));
        }

        let content: String = self
            .result_as("configuration.export", Value::Object(params))
            .map_err(|e| ApiError::call("Failed to export configuration", e))?;
        Ok(ExportOutput { content, warnings })
    }

    /// Run `configuration.import` for a single serialized document.
    /// Returns the server's success flag.
    pub fn import_configuration(
        &self,
        source: &str,
        format: ExportFormat,
        rules: &ImportRules,
    ) -> Result<bool, ApiError> {
        if !format.importable() {
            return Err(ApiError::request_other(format!(
                "format {format} is export-only and cannot be imported"
            )));
        }
        let params = json!({
            "format": format.as_str(),
            "source": source,
            "rules": rules.to_params(),
        });
        let result = self
            .do_request("configuration.import", params)
            .map_err(|e| ApiError::call("Failed to import configuration", e))?
            .into_result();
        Ok(result.as_bool().unwrap_or(false))
    }
}

// ----------------------------------------------------------------------
// Option types

#[derive(Debug, Clone, Default)]
pub struct GetGroupsOptions {
    pub search: bool,
    pub select_hosts: bool,
    pub select_templates: bool,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<u64>,
}

impl GetGroupsOptions {
    pub fn searching() -> Self {
        Self {
            search: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct GetHostsOptions {
    pub search: bool,
    pub select_groups: bool,
    pub select_templates: bool,
    pub select_interfaces: bool,
    pub select_inventory: bool,
    pub select_macros: bool,
    pub hostgroup_ids: Vec<String>,
    pub proxy_id: Option<String>,
    pub proxy_group_id: Option<String>,
    pub maintenance: Option<MaintenanceStatus>,
    pub monitored: Option<MonitoringStatus>,
    pub active_interface: Option<ActiveInterface>,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<u64>,
}

impl Default for GetHostsOptions {
    fn default() -> Self {
        Self {
            // Searching is the norm when multiple hosts are requested.
            search: true,
            select_groups: false,
            select_templates: false,
            select_interfaces: false,
            select_inventory: false,
            select_macros: false,
            hostgroup_ids: Vec::new(),
            proxy_id: None,
            proxy_group_id: None,
            maintenance: None,
            monitored: None,
            active_interface: None,
            sort_field: None,
            sort_order: None,
            limit: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateHostOptions {
    pub status: MonitoringStatus,
    pub inventory_mode: InventoryMode,
    pub proxy_id: Option<String>,
    pub interfaces: Vec<NewHostInterface>,
    pub inventory: Option<Value>,
    pub description: Option<String>,
}

impl Default for CreateHostOptions {
    fn default() -> Self {
        Self {
            status: MonitoringStatus::On,
            inventory_mode: InventoryMode::Automatic,
            proxy_id: None,
            interfaces: Vec::new(),
            inventory: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetInterfacesOptions {
    pub host_ids: Vec<String>,
    pub interface_ids: Vec<String>,
    pub item_ids: Vec<String>,
    pub trigger_ids: Vec<String>,
}

/// SNMP detail sub-record for interface creation/update.
#[derive(Debug, Clone, Default)]
pub struct SnmpDetails {
    pub version: u8,
    pub bulk: Option<bool>,
    pub community: Option<String>,
    pub max_repetitions: Option<u32>,
    pub security_name: Option<String>,
    pub security_level: Option<u8>,
    pub auth_passphrase: Option<String>,
    pub priv_passphrase: Option<String>,
    pub auth_protocol: Option<u8>,
    pub priv_protocol: Option<u8>,
    pub context_name: Option<String>,
}

impl SnmpDetails {
    fn to_params(&self) -> Value {
        let mut params = Params::new();
        params.insert("version".to_string(), json!(self.version));
        if let Some(bulk) = self.bulk {
            params.insert("bulk".to_string(), json!(u8::from(bulk)));
        }
        if let Some(community) = &self.community {
            params.insert("community".to_string(), json!(community));
        }
        if let Some(max_repetitions) = self.max_repetitions {
            params.insert("max_repetitions".to_string(), json!(max_repetitions));
        }
        if let Some(name) = &self.security_name {
            params.insert("securityname".to_string(), json!(name));
        }
        if let Some(level) = self.security_level {
            params.insert("securitylevel".to_string(), json!(level));
        }
        if let Some(phrase) = &self.auth_passphrase {
            params.insert("authpassphrase".to_string(), json!(phrase));
        }
        if let Some(phrase) = &self.priv_passphrase {
            params.insert("privpassphrase".to_string(), json!(phrase));
        }
        if let Some(protocol) = self.auth_protocol {
            params.insert("authprotocol".to_string(), json!(protocol));
        }
        if let Some(protocol) = self.priv_protocol {
            params.insert("privprotocol".to_string(), json!(protocol));
        }
        if let Some(context) = &self.context_name {
            params.insert("contextname".to_string(), json!(context));
        }
        Value::Object(params)
    }
}

/// Parameters for creating a host interface.
#[derive(Debug, Clone)]
pub struct NewHostInterface {
    pub main: bool,
    pub interface_type: HostInterfaceType,
    pub use_ip: bool,
    pub port: String,
    pub ip: Option<String>,
    pub dns: Option<String>,
    pub details: Option<SnmpDetails>,
}

impl NewHostInterface {
    fn to_params(&self) -> Result<Value, ApiError> {
        if self.ip.is_none() && self.dns.is_none() {
            return Err(ApiError::request_other("either IP or DNS must be provided"));
        }
        if self.use_ip && self.ip.is_none() {
            return Err(ApiError::request_other(
                "IP must be provided when using IP connection mode",
            ));
        }
        if !self.use_ip && self.dns.is_none() {
            return Err(ApiError::request_other(
                "DNS must be provided when using DNS connection mode",
            ));
        }
        let mut params = Params::new();
        params.insert("main".to_string(), json!(u8::from(self.main)));
        params.insert("type".to_string(), json!(self.interface_type.as_api_value()));
        params.insert("useip".to_string(), json!(u8::from(self.use_ip)));
        params.insert("port".to_string(), json!(self.port));
        params.insert("ip".to_string(), json!(self.ip.as_deref().unwrap_or("")));
        params.insert("dns".to_string(), json!(self.dns.as_deref().unwrap_or("")));
        if self.interface_type == HostInterfaceType::Snmp {
            let details = self.details.as_ref().ok_or_else(|| {
                ApiError::request_other("SNMP details must be provided for SNMP interfaces")
            })?;
            params.insert("details".to_string(), details.to_params());
        }
        Ok(Value::Object(params))
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateHostInterface {
    pub main: Option<bool>,
    pub interface_type: Option<HostInterfaceType>,
    pub use_ip: Option<bool>,
    pub port: Option<String>,
    pub ip: Option<String>,
    pub dns: Option<String>,
    pub details: Option<SnmpDetails>,
}

#[derive(Debug, Clone, Default)]
pub struct GetTemplatesOptions {
    pub select_hosts: bool,
    pub select_templates: bool,
    pub select_parent_templates: bool,
}

#[derive(Debug, Clone)]
pub struct GetUsergroupsOptions {
    pub select_users: bool,
    pub select_rights: bool,
    pub search: bool,
    pub limit: Option<u64>,
}

impl Default for GetUsergroupsOptions {
    fn default() -> Self {
        Self {
            select_users: true,
            select_rights: true,
            search: true,
            limit: None,
        }
    }
}

/// Which kind of group a rights update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightsTarget {
    HostGroups,
    TemplateGroups,
}

#[derive(Debug, Clone)]
pub struct GetUsersOptions {
    pub role: Option<UserRole>,
    pub search: bool,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<u64>,
}

impl Default for GetUsersOptions {
    fn default() -> Self {
        Self {
            role: None,
            search: true,
            sort_field: None,
            sort_order: None,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateUserOptions {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub usergroup_ids: Vec<String>,
    pub autologin: Option<bool>,
    pub autologout: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserOptions {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub autologin: Option<bool>,
    pub autologout: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GetMacrosOptions {
    pub select_hosts: bool,
    pub select_templates: bool,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct GetMaintenancesOptions {
    pub ids: Vec<String>,
    pub hostgroup_ids: Vec<String>,
    pub host_ids: Vec<String>,
    pub name: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateMaintenanceOptions {
    pub description: Option<String>,
    pub hosts: Vec<Host>,
    pub hostgroup_ids: Vec<String>,
    pub data_collection: Option<DataCollectionMode>,
}

#[derive(Debug, Clone, Default)]
pub struct GetEventsOptions {
    pub event_ids: Vec<String>,
    pub group_ids: Vec<String>,
    pub host_ids: Vec<String>,
    pub object_ids: Vec<String>,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<u64>,
}

/// Flags composed into the `event.acknowledge` action bitmask.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcknowledgeAction {
    pub close: bool,
    pub acknowledge: bool,
    pub unacknowledge: bool,
    pub change_severity: bool,
    pub suppress: bool,
    pub unsuppress: bool,
    pub rank_to_cause: bool,
    pub rank_to_symptom: bool,
}

impl AcknowledgeAction {
    pub fn as_api_value(self, with_message: bool) -> u32 {
        let mut action = 0;
        if self.close {
            action |= 1;
        }
        if self.acknowledge {
            action |= 2;
        }
        if with_message {
            action |= 4;
        }
        if self.change_severity {
            action |= 8;
        }
        if self.unacknowledge {
            action |= 16;
        }
        if self.suppress {
            action |= 32;
        }
        if self.unsuppress {
            action |= 64;
        }
        if self.rank_to_cause {
            action |= 128;
        }
        if self.rank_to_symptom {
            action |= 256;
        }
        action
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetTriggersOptions {
    pub trigger_ids: Vec<String>,
    pub hostgroup_ids: Vec<String>,
    pub template_ids: Vec<String>,
    pub description: Option<String>,
    pub priority: Option<TriggerPriority>,
    pub unacknowledged: bool,
    pub skip_dependent: Option<bool>,
    pub monitored: Option<bool>,
    pub active: Option<bool>,
    pub expand_description: bool,
    pub select_hosts: bool,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct GetItemsOptions {
    pub template_ids: Vec<String>,
    pub monitored: bool,
    pub select_hosts: bool,
    pub search: bool,
    pub limit: Option<u64>,
}

impl Default for GetItemsOptions {
    fn default() -> Self {
        Self {
            template_ids: Vec::new(),
            monitored: false,
            select_hosts: false,
            search: true,
            limit: None,
        }
    }
}

/// Object IDs handed to `configuration.export`, one list per class.
#[derive(Debug, Clone, Default)]
pub struct ExportSelection {
    pub host_group_ids: Vec<String>,
    pub template_group_ids: Vec<String>,
    pub host_ids: Vec<String>,
    pub image_ids: Vec<String>,
    pub map_ids: Vec<String>,
    pub template_ids: Vec<String>,
    pub media_type_ids: Vec<String>,
}

/// Result of a configuration export: the serialized payload plus any
/// downgrades applied on the way.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub content: String,
    pub warnings: Vec<Warning>,
}

// ----------------------------------------------------------------------
// Helpers

fn id_objects<'a>(ids: impl Iterator<Item = &'a String>, key: &str) -> Vec<Value> {
    ids.map(|id| json!({ key: id })).collect()
}

fn group_names(groups: &[HostGroup]) -> String {
    groups
        .iter()
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn require_some<T>(items: &[T], message: &str) -> Result<(), ApiError> {
    if items.is_empty() {
        return Err(ApiError::request_other(message));
    }
    Ok(())
}

fn first_id(result: Value, key: &str, endpoint: &str) -> Result<String, ApiError> {
    let ids = returned_list(&result, key, endpoint)?;
    ids.into_iter().next().ok_or_else(|| {
        ApiError::request_other(format!("{endpoint} returned an empty {key} list"))
    })
}

/// Merge `permission` for `group_ids` into an existing rights list,
/// overwriting entries for the same group and keeping the rest.
fn merged_rights(
    existing: &[ZabbixRight],
    permission: UsergroupPermission,
    group_ids: &[String],
) -> Value {
    let mut rights: Vec<(String, i64)> = existing
        .iter()
        .map(|r| (r.id.clone(), r.permission))
        .collect();
    for group_id in group_ids {
        match rights.iter_mut().find(|(id, _)| id == group_id) {
            Some((_, permission_slot)) => *permission_slot = permission.as_api_value(),
            None => rights.push((group_id.clone(), permission.as_api_value())),
        }
    }
    json!(
        rights
            .into_iter()
            .map(|(id, permission)| json!({"id": id, "permission": permission}))
            .collect::<Vec<_>>()
    )
}

/// The server can hand back hosts with an empty technical name. That is a
/// data error on the server side; substitute a recognizable marker and say
/// so instead of guessing silently.
fn normalize_host(host: &mut Host) {
    if host.host.is_empty() {
        tracing::warn!(hostid = %host.hostid, "server returned host with empty name");
        host.host = format!("Unknown (ID: {})", host.hostid);
    }
}
