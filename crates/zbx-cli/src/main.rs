use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use zbx::Reporter;
use zbx::client::{ClientBuilder, GetGroupsOptions, GetHostsOptions, ZabbixClient};
use zbx::enums::ExportFormat;
use zbx::export::{ExportJob, ExportOptions, ExportType};
use zbx::import::{ImportJob, ImportOptions, filter_importable_files};
use zbx::session::establish_session;
use zbx_auth::PromptCredentials;
use zbx_config::Config;

#[derive(Parser, Debug)]
#[command(name = "zbx", version)]
#[command(about = "Command-line operator tool for Zabbix")]
struct Cli {
    /// Path to the configuration file (default: the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Zabbix server URL. Overrides the configuration file and ZABBIX_URL.
    #[arg(long, global = true)]
    url: Option<String>,

    /// Per-request timeout (e.g. 30s, 2m). "0s" disables the timeout.
    #[arg(long, global = true)]
    timeout: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Authenticate against the server and store the session.
    Login,
    /// End the current session.
    Logout,
    /// Print the server API version.
    ApiVersion,
    /// Show one host, including its groups and templates.
    ShowHost { name_or_id: String },
    /// Show host groups matching the given names (globs allowed).
    ShowHostgroups {
        #[arg(default_value = "*")]
        names: Vec<String>,
    },
    /// Create a host group.
    CreateHostgroup { name: String },
    /// Delete a host group by name or ID.
    DeleteHostgroup { name_or_id: String },
    /// Export configuration objects to a directory tree.
    Export {
        /// Object type(s) to export; repeatable. Defaults to all types.
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,
        /// Object name glob(s); repeatable. Defaults to all objects.
        #[arg(long = "name", value_name = "GLOB")]
        names: Vec<String>,
        /// Directory to export into. Overrides the configured directory.
        #[arg(long)]
        directory: Option<PathBuf>,
        /// Export format (json, yaml, xml, php). Overrides the configuration.
        #[arg(long)]
        format: Option<String>,
        /// Use the legacy zabbix_export_* filename scheme.
        #[arg(long)]
        legacy_filenames: bool,
        /// Pretty-print output. Not supported for XML.
        #[arg(long)]
        pretty: bool,
        /// Report per-object failures and keep exporting.
        #[arg(long)]
        ignore_errors: bool,
    },
    /// Import configuration from a file, directory or glob pattern.
    Import {
        /// File, directory or glob pattern. Defaults to the export directory.
        path: Option<String>,
        /// List the files that would be imported and stop.
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        no_create_missing: bool,
        #[arg(long)]
        no_update_existing: bool,
        #[arg(long)]
        delete_missing: bool,
        /// Report per-file failures and keep importing.
        #[arg(long)]
        ignore_errors: bool,
    },
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

/// Interactive credential prompt, used only when attached to a terminal.
struct TerminalPrompt {
    default_username: Option<String>,
}

impl PromptCredentials for TerminalPrompt {
    fn prompt(&mut self) -> Option<(String, String)> {
        let mut input = dialoguer::Input::<String>::new().with_prompt("Username");
        if let Some(default) = &self.default_username {
            input = input.default(default.clone());
        }
        let username = input.interact_text().ok()?;
        let password = dialoguer::Password::new()
            .with_prompt("Password")
            .interact()
            .ok()?;
        Some((username, password))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e:#}");
            if is_config_error(&e) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn is_config_error(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        cause.downcast_ref::<zbx_config::ConfigError>().is_some()
            || matches!(cause.downcast_ref::<zbx::Error>(), Some(zbx::Error::Config(_)))
    })
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let mut reporter = CliReporter;

    match &cli.cmd {
        Commands::Login => {
            let mut client = connect(&cli, &config)?;
            let resolved = authenticate(&mut client, &config)?;
            println!(
                "Authenticated against {} with {} from {}",
                client.url(),
                resolved.credential.kind,
                resolved.credential.source
            );
        }
        Commands::Logout => {
            let mut client = connect(&cli, &config)?;
            authenticate(&mut client, &config)?;
            client.logout()?;
            println!("Logged out of {}", client.url());
        }
        Commands::ApiVersion => {
            let client = connect(&cli, &config)?;
            println!("{}", client.api_version()?);
        }
        Commands::ShowHost { name_or_id } => {
            let mut client = connect(&cli, &config)?;
            authenticate(&mut client, &config)?;
            let hosts = client.get_hosts(
                &[name_or_id.clone()],
                &GetHostsOptions {
                    select_groups: true,
                    select_templates: true,
                    limit: Some(1),
                    ..Default::default()
                },
            )?;
            let host = hosts
                .first()
                .with_context(|| format!("host {name_or_id:?} not found"))?;
            print_host(host);
        }
        Commands::ShowHostgroups { names } => {
            let mut client = connect(&cli, &config)?;
            authenticate(&mut client, &config)?;
            let groups = client.get_hostgroups(
                names,
                &GetGroupsOptions {
                    search: true,
                    select_hosts: true,
                    sort_field: Some("name".to_string()),
                    ..Default::default()
                },
            )?;
            for group in &groups {
                println!("{:>8}  {} ({} hosts)", group.groupid, group.name, group.hosts.len());
            }
        }
        Commands::CreateHostgroup { name } => {
            let mut client = connect(&cli, &config)?;
            authenticate(&mut client, &config)?;
            let group_id = client.create_hostgroup(name)?;
            println!("Created host group {name:?} with ID {group_id}");
        }
        Commands::DeleteHostgroup { name_or_id } => {
            let mut client = connect(&cli, &config)?;
            authenticate(&mut client, &config)?;
            let group = client.get_hostgroup(name_or_id, &GetGroupsOptions::default())?;
            client.delete_hostgroup(&group.groupid)?;
            println!("Deleted host group {:?} (ID {})", group.name, group.groupid);
        }
        Commands::Export {
            types,
            names,
            directory,
            format,
            legacy_filenames,
            pretty,
            ignore_errors,
        } => {
            let mut client = connect(&cli, &config)?;
            authenticate(&mut client, &config)?;

            let types = types
                .iter()
                .map(|t| t.parse::<ExportType>())
                .collect::<Result<Vec<_>, _>>()?;
            let format = match format {
                Some(f) => f.parse::<ExportFormat>()?,
                None => config.app.export_format.parse::<ExportFormat>()?,
            };
            let directory = directory
                .clone()
                .unwrap_or_else(|| config.app.export_directory.clone());

            let mut options = ExportOptions::new(&directory, format);
            options.types = types;
            options.names = names.clone();
            options.legacy_filenames = *legacy_filenames || config.app.legacy_filenames;
            options.pretty = *pretty;
            options.timestamps = config.app.export_timestamps;
            options.ignore_errors = *ignore_errors;

            let written = ExportJob::new(&client, options).run(&mut reporter)?;
            println!("Exported {} file(s) to {}", written.len(), directory.display());
        }
        Commands::Import {
            path,
            dry_run,
            no_create_missing,
            no_update_existing,
            delete_missing,
            ignore_errors,
        } => {
            let target = path
                .clone()
                .unwrap_or_else(|| config.app.export_directory.display().to_string());
            let files = collect_import_files(&target)?;

            if *dry_run {
                for file in &files {
                    println!("{}", file.display());
                }
                println!("Found {} file(s) to import", files.len());
                return Ok(());
            }
            anyhow::ensure!(!files.is_empty(), "no files found to import matching: {target}");
            reporter.info(&format!("Found {} file(s) to import", files.len()));

            let mut client = connect(&cli, &config)?;
            authenticate(&mut client, &config)?;

            let options = ImportOptions {
                create_missing: !no_create_missing,
                update_existing: !no_update_existing,
                delete_missing: *delete_missing,
                ignore_errors: *ignore_errors,
                ..Default::default()
            };
            let report = ImportJob::new(&client, files, options).run(&mut reporter)?;
            if report.failed.is_empty() {
                println!("Imported {} file(s)", report.imported.len());
            } else {
                println!(
                    "Imported {} file(s), failed to import {} file(s)",
                    report.imported.len(),
                    report.failed.len()
                );
            }
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = zbx_config::load_config(cli.config.as_deref())?;
    if let Some(url) = &cli.url {
        config.api.url = url.clone();
    }
    Ok(config)
}

fn connect(cli: &Cli, config: &Config) -> Result<ZabbixClient> {
    let url = match &cli.url {
        Some(url) => url.clone(),
        None => config.url()?,
    };
    let timeout = match &cli.timeout {
        Some(raw) => parse_timeout(raw)?,
        None => config.timeout(),
    };
    let client = ClientBuilder::new(url)
        .timeout(timeout)
        .verify_ssl(config.api.verify_ssl)
        .build()?;
    Ok(client)
}

fn authenticate(
    client: &mut ZabbixClient,
    config: &Config,
) -> Result<zbx_auth::Resolved> {
    let mut prompt = TerminalPrompt {
        default_username: config.api.username.clone(),
    };
    // Prompting is the source of last resort and needs a terminal.
    let prompt: Option<&mut dyn PromptCredentials> = if std::io::stdin().is_terminal() {
        Some(&mut prompt)
    } else {
        None
    };
    Ok(establish_session(client, config, prompt)?)
}

/// Zero means "no timeout".
fn parse_timeout(raw: &str) -> Result<Option<Duration>> {
    let duration =
        humantime::parse_duration(raw).with_context(|| format!("invalid duration: {raw}"))?;
    Ok((!duration.is_zero()).then_some(duration))
}

/// Resolve an import target: an existing directory (recursively), a single
/// file, or a glob pattern. Unimportable files are filtered out.
fn collect_import_files(target: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(target);
    let candidates: Vec<PathBuf> = if path.is_dir() {
        let pattern = path.join("**").join("*");
        expand_glob(&pattern.to_string_lossy())?
    } else if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        expand_glob(target)?
    };
    Ok(filter_importable_files(&candidates))
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?
    {
        files.push(entry.context("failed to read globbed path")?);
    }
    files.sort();
    Ok(files)
}

fn print_host(host: &zbx::types::Host) {
    println!("{:>10}  {}", host.hostid, host.host);
    if let Some(name) = &host.name
        && name != &host.host
    {
        println!("{:>10}  visible name: {name}", "");
    }
    if let Some(proxy_id) = &host.proxyid {
        println!("{:>10}  proxy: {proxy_id}", "");
    }
    if !host.groups.is_empty() {
        let groups: Vec<&str> = host.groups.iter().map(|g| g.name.as_str()).collect();
        println!("{:>10}  groups: {}", "", groups.join(", "));
    }
    if !host.templates.is_empty() {
        let templates: Vec<&str> =
            host.templates.iter().map(|t| t.display_name()).collect();
        println!("{:>10}  templates: {}", "", templates.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn parse_timeout_maps_zero_to_unlimited() {
        assert_eq!(parse_timeout("30s").expect("parse"), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout("0s").expect("parse"), None);
        assert!(parse_timeout("nope").is_err());
    }

    #[test]
    fn collect_import_files_from_directory_recurses() {
        let td = tempdir().expect("tempdir");
        fs::create_dir_all(td.path().join("hosts")).expect("mkdir");
        fs::write(td.path().join("hosts").join("a.json"), "{}").expect("write");
        fs::write(td.path().join("top.yaml"), "").expect("write");
        fs::write(td.path().join("notes.txt"), "").expect("write");

        let files =
            collect_import_files(&td.path().display().to_string()).expect("collect");
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.ends_with("a.json")));
        assert!(files.iter().any(|f| f.ends_with("top.yaml")));
    }

    #[test]
    fn collect_import_files_from_glob_pattern() {
        let td = tempdir().expect("tempdir");
        for name in ["one.json", "two.json", "three.yaml", "four.txt"] {
            fs::write(td.path().join(name), "{}").expect("write");
        }

        let pattern = td.path().join("*.json").display().to_string();
        let files = collect_import_files(&pattern).expect("collect");
        assert_eq!(files.len(), 2);

        // A glob matching 4 files keeps only the 3 importable ones.
        let pattern = td.path().join("*").display().to_string();
        let files = collect_import_files(&pattern).expect("collect");
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn collect_import_files_single_file() {
        let td = tempdir().expect("tempdir");
        let file = td.path().join("conf.xml");
        fs::write(&file, "<x/>").expect("write");

        let files = collect_import_files(&file.display().to_string()).expect("collect");
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn cli_reporter_methods_are_callable() {
        let mut reporter = CliReporter;
        reporter.info("info");
        reporter.warn("warn");
        reporter.error("error");
    }

    #[test]
    fn cli_parses_export_command() {
        let cli = Cli::try_parse_from([
            "zbx",
            "export",
            "--type",
            "host_groups",
            "--name",
            "*Linux*",
            "--pretty",
            "--ignore-errors",
        ])
        .expect("parse");
        match cli.cmd {
            Commands::Export {
                types,
                names,
                pretty,
                ignore_errors,
                ..
            } => {
                assert_eq!(types, vec!["host_groups".to_string()]);
                assert_eq!(names, vec!["*Linux*".to_string()]);
                assert!(pretty);
                assert!(ignore_errors);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_import_dry_run() {
        let cli = Cli::try_parse_from(["zbx", "import", "exports/", "--dry-run"]).expect("parse");
        match cli.cmd {
            Commands::Import { path, dry_run, .. } => {
                assert_eq!(path.as_deref(), Some("exports/"));
                assert!(dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
