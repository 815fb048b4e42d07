//! Bulk configuration import.
//!
//! Inputs are filtered to regular files with an importable extension
//! (`json`, `yaml`, `xml`); each file is read, its format derived from the
//! extension, and pushed through `configuration.import` with a rule set
//! built for the server version. Successes and failures are collected
//! separately; a failure aborts the run unless `ignore_errors` is set.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use thiserror::Error;
use zbx_version::ApiVersion;

use crate::client::ZabbixClient;
use crate::enums::ExportFormat;
use crate::error::ApiError;
use crate::{CancelToken, Reporter};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to read import file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("import cancelled")]
    Cancelled,
}

/// Per-object-class import flags. Only the flags a class supports are
/// serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportRule {
    pub create_missing: bool,
    pub update_existing: Option<bool>,
    pub delete_missing: Option<bool>,
}

impl ImportRule {
    fn to_params(self) -> Value {
        let mut rule = serde_json::Map::new();
        rule.insert("createMissing".to_string(), json!(self.create_missing));
        if let Some(update) = self.update_existing {
            rule.insert("updateExisting".to_string(), json!(update));
        }
        if let Some(delete) = self.delete_missing {
            rule.insert("deleteMissing".to_string(), json!(delete));
        }
        Value::Object(rule)
    }
}

/// The full `configuration.import` rule set.
///
/// Which classes appear, and which flags each supports, depends on the
/// server version: `groups` split into `host_groups`/`template_groups` in
/// 6.2, and `applications`/`screens`/`templateScreens` only exist before
/// 6.0.
#[derive(Debug, Clone, Default)]
pub struct ImportRules {
    classes: Vec<(&'static str, ImportRule)>,
}

impl ImportRules {
    /// Build the rule set for a server version from the three directives.
    pub fn for_version(
        version: &ApiVersion,
        create_missing: bool,
        update_existing: bool,
        delete_missing: bool,
    ) -> Self {
        // Create/delete only.
        let cd = ImportRule {
            create_missing,
            update_existing: None,
            delete_missing: Some(delete_missing),
        };
        // Create/update only.
        let cu = ImportRule {
            create_missing,
            update_existing: Some(update_existing),
            delete_missing: None,
        };
        // All three.
        let cud = ImportRule {
            create_missing,
            update_existing: Some(update_existing),
            delete_missing: Some(delete_missing),
        };

        let mut classes = vec![
            ("discoveryRules", cud),
            ("graphs", cud),
            ("hosts", cu),
            ("httptests", cud),
            ("images", cu),
            ("items", cud),
            ("maps", cu),
            ("mediaTypes", cu),
            ("templateLinkage", cd),
            ("templates", cu),
            ("templateDashboards", cud),
            ("triggers", cud),
            ("valueMaps", cud),
        ];
        if version.release() >= (6, 2, 0) {
            classes.push(("host_groups", cu));
            classes.push(("template_groups", cu));
        } else {
            classes.push((
                "groups",
                ImportRule {
                    create_missing,
                    update_existing: None,
                    delete_missing: None,
                },
            ));
        }
        if version.major < 6 {
            classes.push(("applications", cd));
            classes.push(("screens", cu));
            classes.push(("templateScreens", cud));
        }
        Self { classes }
    }

    pub(crate) fn to_params(&self) -> Value {
        let mut rules = serde_json::Map::new();
        for (class, rule) in &self.classes {
            rules.insert(class.to_string(), rule.to_params());
        }
        Value::Object(rules)
    }

    #[cfg(test)]
    fn rule(&self, class: &str) -> Option<ImportRule> {
        self.classes
            .iter()
            .find(|(name, _)| *name == class)
            .map(|(_, rule)| *rule)
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub create_missing: bool,
    pub update_existing: bool,
    pub delete_missing: bool,
    pub ignore_errors: bool,
    pub cancel: CancelToken,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            create_missing: true,
            update_existing: true,
            delete_missing: false,
            ignore_errors: false,
            cancel: CancelToken::default(),
        }
    }
}

/// Outcome of an import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl ImportReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Keep only regular files whose extension is importable.
pub fn filter_importable_files(files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|f| f.is_file())
        .filter(|f| import_format(f).is_some())
        .cloned()
        .collect()
}

fn import_format(path: &Path) -> Option<ExportFormat> {
    let format = ExportFormat::from_extension(path.extension()?.to_str()?)?;
    format.importable().then_some(format)
}

/// One import run over a set of files.
pub struct ImportJob<'a> {
    client: &'a ZabbixClient,
    files: Vec<PathBuf>,
    options: ImportOptions,
}

impl<'a> ImportJob<'a> {
    /// `files` should already be filtered via [`filter_importable_files`];
    /// anything unimportable left in the list is skipped silently.
    pub fn new(client: &'a ZabbixClient, files: Vec<PathBuf>, options: ImportOptions) -> Self {
        Self {
            client,
            files,
            options,
        }
    }

    pub fn run(&self, reporter: &mut dyn Reporter) -> Result<ImportReport, ImportError> {
        let version = self.client.api_version()?;
        let rules = ImportRules::for_version(
            &version,
            self.options.create_missing,
            self.options.update_existing,
            self.options.delete_missing,
        );

        let mut report = ImportReport::default();
        for file in &self.files {
            if self.options.cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            let Some(format) = import_format(file) else {
                continue;
            };
            match self.import_file(file, format, &rules) {
                Ok(()) => {
                    reporter.info(&format!("Imported {}", file.display()));
                    report.imported.push(file.clone());
                }
                Err(e) => {
                    report.failed.push(file.clone());
                    let message = format!("Failed to import {}: {e}", file.display());
                    if self.options.ignore_errors {
                        reporter.error(&message);
                    } else {
                        return Err(e);
                    }
                }
            }
        }
        Ok(report)
    }

    fn import_file(
        &self,
        file: &Path,
        format: ExportFormat,
        rules: &ImportRules,
    ) -> Result<(), ImportError> {
        let source = std::fs::read_to_string(file).map_err(|source| ImportError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let accepted = self.client.import_configuration(&source, format, rules)?;
        if !accepted {
            return Err(ImportError::Api(ApiError::request_other(format!(
                "server rejected import of {}",
                file.display()
            ))));
        }
        Ok(())
    }
}
