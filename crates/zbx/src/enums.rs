//! API value enums.
//!
//! The Zabbix API encodes most options as small integers (sometimes sent as
//! strings, sometimes as numbers). These enums carry the operator-facing
//! spelling and the wire value; request builders call `as_api_value`.

use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

macro_rules! api_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $value:literal, $label:literal;)+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub fn as_api_value(self) -> i64 {
                match self {
                    $(Self::$variant => $value,)+
                }
            }

            pub fn from_api_value(value: i64) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($label),)+
                }
            }
        }
    };
}

api_enum! {
    /// Host monitoring on/off (`status` on the host object).
    MonitoringStatus {
        On = 0, "monitored";
        Off = 1, "unmonitored";
    }
}

api_enum! {
    /// Whether a host is currently under maintenance.
    MaintenanceStatus {
        Off = 0, "no maintenance";
        On = 1, "in maintenance";
    }
}

api_enum! {
    /// Availability of the host's active interface.
    ActiveInterface {
        Unknown = 0, "unknown";
        Available = 1, "available";
        Unavailable = 2, "unavailable";
    }
}

api_enum! {
    HostInterfaceType {
        Agent = 1, "agent";
        Snmp = 2, "snmp";
        Ipmi = 3, "ipmi";
        Jmx = 4, "jmx";
    }
}

api_enum! {
    InventoryMode {
        Disabled = -1, "disabled";
        Manual = 0, "manual";
        Automatic = 1, "automatic";
    }
}

api_enum! {
    /// What collects data for a host (Zabbix ≥ 7.0).
    MonitoredBy {
        Server = 0, "server";
        Proxy = 1, "proxy";
        ProxyGroup = 2, "proxy group";
    }
}

api_enum! {
    /// Maintenance with or without data collection.
    DataCollectionMode {
        On = 0, "with data collection";
        Off = 1, "without data collection";
    }
}

api_enum! {
    UsergroupPermission {
        Deny = 0, "deny";
        ReadOnly = 2, "ro";
        ReadWrite = 3, "rw";
    }
}

api_enum! {
    GuiAccess {
        Default = 0, "default";
        Internal = 1, "internal";
        Ldap = 2, "ldap";
        Disable = 3, "disable";
    }
}

api_enum! {
    UserRole {
        User = 1, "user";
        Admin = 2, "admin";
        SuperAdmin = 3, "superadmin";
        Guest = 4, "guest";
    }
}

api_enum! {
    TriggerPriority {
        NotClassified = 0, "not classified";
        Information = 1, "information";
        Warning = 2, "warning";
        Average = 3, "average";
        High = 4, "high";
        Disaster = 5, "disaster";
    }
}

api_enum! {
    MacroType {
        Text = 0, "text";
        Secret = 1, "secret";
        Vault = 2, "vault";
    }
}

api_enum! {
    /// Proxy operating mode, Zabbix ≥ 7.0.
    ProxyMode {
        Active = 0, "active";
        Passive = 1, "passive";
    }
}

api_enum! {
    /// Proxy operating mode before 7.0 (`status` property).
    ProxyModePre70 {
        Active = 5, "active";
        Passive = 6, "passive";
    }
}

/// Serialization format for `configuration.export`/`configuration.import`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExportFormat {
    Json,
    Yaml,
    Xml,
    Php,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Xml => "xml",
            ExportFormat::Php => "php",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    /// `php` is export-only; everything else round-trips through
    /// `configuration.import`.
    pub fn importable(self) -> bool {
        !matches!(self, ExportFormat::Php)
    }

    /// Derive the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "yaml" | "yml" => Some(ExportFormat::Yaml),
            "xml" => Some(ExportFormat::Xml),
            "php" => Some(ExportFormat::Php),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            "xml" => Ok(ExportFormat::Xml),
            "php" => Ok(ExportFormat::Php),
            other => Err(ApiError::request_other(format!(
                "unknown export format {other:?} (expected json, yaml, xml or php)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_values_match_wire_protocol() {
        assert_eq!(MonitoringStatus::On.as_api_value(), 0);
        assert_eq!(MonitoringStatus::Off.as_api_value(), 1);
        assert_eq!(HostInterfaceType::Snmp.as_api_value(), 2);
        assert_eq!(InventoryMode::Disabled.as_api_value(), -1);
        assert_eq!(MonitoredBy::ProxyGroup.as_api_value(), 2);
        assert_eq!(UsergroupPermission::ReadWrite.as_api_value(), 3);
        assert_eq!(ProxyModePre70::Active.as_api_value(), 5);
        assert_eq!(ProxyMode::Active.as_api_value(), 0);
        assert_eq!(TriggerPriority::Disaster.as_api_value(), 5);
    }

    #[test]
    fn from_api_value_round_trips() {
        for value in [0, 2, 3] {
            let permission = UsergroupPermission::from_api_value(value).expect("permission");
            assert_eq!(permission.as_api_value(), value);
        }
        assert!(UsergroupPermission::from_api_value(1).is_none());
    }

    #[test]
    fn export_format_extensions() {
        assert_eq!(ExportFormat::from_extension("json"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_extension(".yaml"), Some(ExportFormat::Yaml));
        assert_eq!(ExportFormat::from_extension("YML"), Some(ExportFormat::Yaml));
        assert_eq!(ExportFormat::from_extension("xml"), Some(ExportFormat::Xml));
        assert_eq!(ExportFormat::from_extension("txt"), None);
    }

    #[test]
    fn php_is_export_only() {
        assert!(!ExportFormat::Php.importable());
        assert!(ExportFormat::Json.importable());
        assert!(ExportFormat::Yaml.importable());
        assert!(ExportFormat::Xml.importable());
    }

    #[test]
    fn export_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<ExportFormat>().expect("parse"), ExportFormat::Json);
        assert!("csv".parse::<ExportFormat>().is_err());
    }
}
