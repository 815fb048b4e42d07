//! Bulk configuration export.
//!
//! Each requested object class is enumerated (names are globs against the
//! server's search; empty names mean everything), then every object is
//! exported individually via `configuration.export` and written to
//! `<dir>/<class>/<stem>.<ext>` with a sanitized filename. A single object
//! failure aborts the run unless `ignore_errors` is set, in which case it
//! is reported and skipped; the return value lists the files actually
//! written.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::client::{
    ExportSelection, GetGroupsOptions, GetHostsOptions, GetTemplatesOptions, ZabbixClient,
};
use crate::enums::ExportFormat;
use crate::error::ApiError;
use crate::{CancelToken, Reporter};

/// Object classes `configuration.export` understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExportType {
    HostGroups,
    /// Zabbix ≥ 6.2 only.
    TemplateGroups,
    Hosts,
    Images,
    Maps,
    Templates,
    MediaTypes,
}

impl ExportType {
    pub fn all() -> Vec<ExportType> {
        vec![
            ExportType::HostGroups,
            ExportType::TemplateGroups,
            ExportType::Hosts,
            ExportType::Images,
            ExportType::Maps,
            ExportType::Templates,
            ExportType::MediaTypes,
        ]
    }

    /// Directory name under the export root; matches the API option key.
    pub fn dir_name(self) -> &'static str {
        match self {
            ExportType::HostGroups => "host_groups",
            ExportType::TemplateGroups => "template_groups",
            ExportType::Hosts => "hosts",
            ExportType::Images => "images",
            ExportType::Maps => "maps",
            ExportType::Templates => "templates",
            ExportType::MediaTypes => "mediaTypes",
        }
    }

    pub fn human_readable(self) -> &'static str {
        match self {
            ExportType::HostGroups => "host groups",
            ExportType::TemplateGroups => "template groups",
            ExportType::Hosts => "hosts",
            ExportType::Images => "images",
            ExportType::Maps => "maps",
            ExportType::Templates => "templates",
            ExportType::MediaTypes => "media types",
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for ExportType {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            // "groups" is the historical spelling for host groups.
            "host_groups" | "hostgroups" | "groups" => Ok(ExportType::HostGroups),
            "template_groups" | "templategroups" => Ok(ExportType::TemplateGroups),
            "hosts" => Ok(ExportType::Hosts),
            "images" => Ok(ExportType::Images),
            "maps" => Ok(ExportType::Maps),
            "templates" => Ok(ExportType::Templates),
            "mediatypes" | "media_types" => Ok(ExportType::MediaTypes),
            other => Err(ExportError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to write export file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown export type {0:?}")]
    UnknownType(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("export cancelled")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Classes to export; empty means all of them.
    pub types: Vec<ExportType>,
    /// Name globs; empty means every object of each class.
    pub names: Vec<String>,
    pub directory: PathBuf,
    pub format: ExportFormat,
    /// Use the `zabbix_export_<type>_<name>_<id>` stem instead of
    /// `<name>_<id>`.
    pub legacy_filenames: bool,
    pub pretty: bool,
    /// Append `_YYYY-MM-DDTHHMMSS` to each stem.
    pub timestamps: bool,
    pub ignore_errors: bool,
    pub cancel: CancelToken,
}

impl ExportOptions {
    pub fn new(directory: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            types: Vec::new(),
            names: Vec::new(),
            directory: directory.into(),
            format,
            legacy_filenames: false,
            pretty: false,
            timestamps: false,
            ignore_errors: false,
            cancel: CancelToken::default(),
        }
    }
}

/// One export run over a set of object classes.
pub struct ExportJob<'a> {
    client: &'a ZabbixClient,
    options: ExportOptions,
}

impl<'a> ExportJob<'a> {
    pub fn new(client: &'a ZabbixClient, options: ExportOptions) -> Self {
        Self { client, options }
    }

    /// Run the export. Returns the paths written, in deterministic order
    /// (classes in request order, objects in server order).
    pub fn run(&self, reporter: &mut dyn Reporter) -> Result<Vec<PathBuf>, ExportError> {
        let types = if self.options.types.is_empty() {
            let mut types = ExportType::all();
            // Defaulted types degrade gracefully on old servers; only an
            // explicit request for template groups is an error there.
            if !self.client.traits()?.split_template_groups {
                reporter.warn("skipping template groups, server predates 6.2");
                types.retain(|t| *t != ExportType::TemplateGroups);
            }
            types
        } else {
            let mut types = self.options.types.clone();
            types.sort_unstable();
            types.dedup();
            self.check_type_compatibility(&types)?;
            types
        };

        let mut written = Vec::new();
        for export_type in types {
            reporter.info(&format!("Exporting {}...", export_type.human_readable()));
            let objects = self.enumerate(export_type)?;
            for (name, id) in objects {
                if self.options.cancel.is_cancelled() {
                    return Err(ExportError::Cancelled);
                }
                match self.export_one(export_type, &name, &id, reporter) {
                    Ok(path) => written.push(path),
                    Err(e) if self.options.ignore_errors => {
                        reporter.error(&format!(
                            "Failed to export {} {name:?} (ID {id}): {e}",
                            export_type.human_readable()
                        ));
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(written)
    }

    fn check_type_compatibility(&self, types: &[ExportType]) -> Result<(), ExportError> {
        if types.contains(&ExportType::TemplateGroups)
            && !self.client.traits()?.split_template_groups
        {
            return Err(ExportError::Unsupported(
                "template group exports require Zabbix 6.2 or later".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the (name, id) pairs of one class, honouring name globs.
    fn enumerate(&self, export_type: ExportType) -> Result<Vec<(String, String)>, ExportError> {
        let names = &self.options.names;
        let pairs = match export_type {
            ExportType::HostGroups => self
                .client
                .get_hostgroups(names, &GetGroupsOptions::searching())?
                .into_iter()
                .map(|g| (g.name, g.groupid))
                .collect(),
            ExportType::TemplateGroups => self
                .client
                .get_templategroups(names, &GetGroupsOptions::searching())?
                .into_iter()
                .map(|g| (g.name, g.groupid))
                .collect(),
            ExportType::Hosts => self
                .client
                .get_hosts(names, &GetHostsOptions::default())?
                .into_iter()
                .map(|h| (h.host, h.hostid))
                .collect(),
            ExportType::Images => self
                .client
                .get_images(names, false)?
                .into_iter()
                .map(|i| (i.name, i.imageid))
                .collect(),
            ExportType::Maps => self
                .client
                .get_maps(names)?
                .into_iter()
                .map(|m| (m.name, m.sysmapid))
                .collect(),
            ExportType::Templates => self
                .client
                .get_templates(names, &GetTemplatesOptions::default())?
                .into_iter()
                .map(|t| (t.host, t.templateid))
                .collect(),
            ExportType::MediaTypes => self
                .client
                .get_media_types(names)?
                .into_iter()
                .map(|m| (m.name, m.mediatypeid))
                .collect(),
        };
        Ok(pairs)
    }

    fn export_one(
        &self,
        export_type: ExportType,
        name: &str,
        id: &str,
        reporter: &mut dyn Reporter,
    ) -> Result<PathBuf, ExportError> {
        let mut selection = ExportSelection::default();
        let ids = vec![id.to_string()];
        match export_type {
            ExportType::HostGroups => selection.host_group_ids = ids,
            ExportType::TemplateGroups => selection.template_group_ids = ids,
            ExportType::Hosts => selection.host_ids = ids,
            ExportType::Images => selection.image_ids = ids,
            ExportType::Maps => selection.map_ids = ids,
            ExportType::Templates => selection.template_ids = ids,
            ExportType::MediaTypes => selection.media_type_ids = ids,
        }

        let output =
            self.client
                .export_configuration(&selection, self.options.format, self.options.pretty)?;
        for warning in &output.warnings {
            reporter.warn(&warning.to_string());
        }

        let path = self.file_path(export_type, name, id);
        write_exported(&path, &output.content)?;
        tracing::debug!(path = %path.display(), "wrote export file");
        Ok(path)
    }

    fn file_path(&self, export_type: ExportType, name: &str, id: &str) -> PathBuf {
        let mut stem = if self.options.legacy_filenames {
            format!("zabbix_export_{}_{name}_{id}", export_type.dir_name())
        } else {
            format!("{name}_{id}")
        };
        if self.options.timestamps {
            let ts = chrono::Local::now().format("%Y-%m-%dT%H%M%S");
            stem = format!("{stem}_{ts}");
        }
        self.options
            .directory
            .join(export_type.dir_name())
            .join(format!(
                "{}.{}",
                sanitize_filename(&stem),
                self.options.format.extension()
            ))
    }
}

/// Strip path separators and OS-reserved characters from a filename stem.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control())
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

fn write_exported(path: &Path, content: &str) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let mut file = fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(content.as_bytes())
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn export_type_parses_aliases() {
        assert_eq!("host_groups".parse::<ExportType>().expect("parse"), ExportType::HostGroups);
        assert_eq!("groups".parse::<ExportType>().expect("parse"), ExportType::HostGroups);
        assert_eq!("mediaTypes".parse::<ExportType>().expect("parse"), ExportType::MediaTypes);
        assert_eq!("media_types".parse::<ExportType>().expect("parse"), ExportType::MediaTypes);
        assert!("widgets".parse::<ExportType>().is_err());
    }

    #[test]
    fn export_type_dir_names_are_stable() {
        // These double as the API option keys, so they are part of the
        // on-disk contract.
        assert_eq!(ExportType::HostGroups.dir_name(), "host_groups");
        assert_eq!(ExportType::TemplateGroups.dir_name(), "template_groups");
        assert_eq!(ExportType::MediaTypes.dir_name(), "mediaTypes");
    }

    #[test]
    fn sanitize_strips_reserved_characters() {
        assert_eq!(sanitize_filename("Linux servers"), "Linux servers");
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j"), "abcdefghij");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("web\x01host"), "webhost");
        assert_eq!(sanitize_filename("///"), "_");
    }

    #[test]
    fn sanitize_trims_dots_and_whitespace() {
        assert_eq!(sanitize_filename("  name  "), "name");
        assert_eq!(sanitize_filename("..."), "_");
    }

    #[test]
    fn write_exported_creates_directories() {
        let td = tempdir().expect("tempdir");
        let path = td.path().join("hosts").join("web-1_10084.json");
        write_exported(&path, "{}").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");
    }

    #[test]
    fn all_types_cover_every_directory() {
        let dirs: Vec<&str> = ExportType::all().iter().map(|t| t.dir_name()).collect();
        assert_eq!(
            dirs,
            vec![
                "host_groups",
                "template_groups",
                "hosts",
                "images",
                "maps",
                "templates",
                "mediaTypes"
            ]
        );
    }
}
