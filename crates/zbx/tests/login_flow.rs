//! End-to-end flows against a scripted JSON-RPC server.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};
use serial_test::serial;
use tempfile::tempdir;
use tiny_http::{Response, Server};

use zbx::client::{ClientBuilder, LoginCredentials, ZabbixClient};
use zbx::enums::ExportFormat;
use zbx::export::{ExportJob, ExportOptions, ExportType};
use zbx::import::{ImportJob, ImportOptions, filter_importable_files};
use zbx::session::establish_session;
use zbx::{Error, SilentReporter};
use zbx_config::Config;

/// One observed request: method, full envelope, Authorization header.
#[derive(Debug, Clone)]
struct Observed {
    method: String,
    envelope: Value,
    authorization: Option<String>,
}

impl Observed {
    fn body_auth(&self) -> Option<&str> {
        self.envelope.get("auth").and_then(Value::as_str)
    }
}

struct MockServer {
    url: String,
    requests: Arc<Mutex<Vec<Observed>>>,
    handle: thread::JoinHandle<()>,
}

impl MockServer {
    /// Serve until the responder returns `None` for a request or the recv
    /// times out (the test is over by then).
    fn spawn<F>(responder: F) -> Self
    where
        F: Fn(&Observed) -> Option<Value> + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").expect("server");
        let url = format!("http://{}", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            loop {
                let mut request = match server.recv_timeout(Duration::from_secs(5)) {
                    Ok(Some(request)) => request,
                    _ => break,
                };
                let authorization = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_string());
                let mut body = String::new();
                use std::io::Read;
                request
                    .as_reader()
                    .read_to_string(&mut body)
                    .expect("request body");
                let envelope: Value = serde_json::from_str(&body).expect("request json");
                let observed = Observed {
                    method: envelope["method"].as_str().unwrap_or_default().to_string(),
                    envelope,
                    authorization,
                };
                seen.lock().expect("lock").push(observed.clone());
                let Some(result) = responder(&observed) else {
                    break;
                };
                let reply = json!({"jsonrpc": "2.0", "id": observed.envelope["id"], "result": result});
                let response = Response::from_string(reply.to_string()).with_header(
                    tiny_http::Header::from_bytes("Content-Type", "application/json")
                        .expect("header"),
                );
                request.respond(response).expect("respond");
            }
        });
        Self {
            url,
            requests,
            handle,
        }
    }

    fn requests(&self) -> Vec<Observed> {
        self.requests.lock().expect("lock").clone()
    }

    fn finish(self) -> Vec<Observed> {
        let requests = self.requests();
        drop(self.requests);
        // The serving thread exits on recv timeout once the test stops
        // sending; don't block the suite on it.
        drop(self.handle);
        requests
    }
}

fn client_for(server: &MockServer) -> ZabbixClient {
    ClientBuilder::new(&server.url)
        .timeout(Some(Duration::from_secs(5)))
        .build()
        .expect("client")
}

fn clear_auth_env<T>(f: impl FnOnce() -> T) -> T {
    temp_env::with_vars(
        [
            ("ZABBIX_API_TOKEN", None::<String>),
            ("ZABBIX_USERNAME", None),
            ("ZABBIX_PASSWORD", None),
        ],
        f,
    )
}

#[test]
#[serial]
fn token_auth_on_modern_server_uses_bearer_header() {
    let server = MockServer::spawn(|observed| match observed.method.as_str() {
        "apiinfo.version" => Some(json!("6.4.0")),
        "host.get" => Some(json!([])),
        _ => None,
    });

    let mut client = client_for(&server);
    let session = client
        .login(&LoginCredentials::token("AAA"))
        .expect("login");
    assert_eq!(session, "AAA");
    assert!(client.uses_api_token());

    let count_before_logout = client.request_count();
    client.logout().expect("logout");
    // Token logout is local only.
    assert_eq!(client.request_count(), count_before_logout);
    assert!(!client.is_authenticated());

    let requests = server.finish();
    assert_eq!(requests.len(), 2);
    // Version probe never carries auth.
    assert_eq!(requests[0].method, "apiinfo.version");
    assert_eq!(requests[0].authorization, None);
    assert_eq!(requests[0].body_auth(), None);
    // The login probe carries the token in the header only.
    assert_eq!(requests[1].method, "host.get");
    assert_eq!(requests[1].authorization.as_deref(), Some("Bearer AAA"));
    assert_eq!(requests[1].body_auth(), None);
}

#[test]
#[serial]
fn password_login_on_legacy_server_uses_user_param_and_body_auth() {
    let server = MockServer::spawn(|observed| match observed.method.as_str() {
        "apiinfo.version" => Some(json!("5.2.0")),
        "user.login" => {
            let params = &observed.envelope["params"];
            // Pre-5.4 logins use "user", not "username".
            assert_eq!(params["user"], json!("Admin"));
            assert!(params.get("username").is_none());
            assert_eq!(params["password"], json!("zabbix"));
            Some(json!("sess-123"))
        }
        "host.get" => Some(json!([])),
        _ => None,
    });

    let mut client = client_for(&server);
    let session = client
        .login(&LoginCredentials::password("Admin", "zabbix"))
        .expect("login");
    assert_eq!(session, "sess-123");
    assert!(!client.uses_api_token());

    let requests = server.finish();
    assert_eq!(requests.len(), 3);
    // user.login itself is unauthenticated.
    assert_eq!(requests[1].method, "user.login");
    assert_eq!(requests[1].body_auth(), None);
    // Subsequent calls carry the session in the body, not the header.
    assert_eq!(requests[2].method, "host.get");
    assert_eq!(requests[2].body_auth(), Some("sess-123"));
    assert_eq!(requests[2].authorization, None);
}

/// The [`MockServer`] responder can only produce `result` replies, so this
/// scenario (which needs a JSON-RPC error object for the rejected token)
/// drives tiny_http directly.
#[test]
#[serial]
fn invalid_token_falls_through_to_env_password() {
    let server = Server::http("127.0.0.1:0").expect("server");
    let url = format!("http://{}", server.server_addr());
    let requests: Arc<Mutex<Vec<(String, Option<String>)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    let handle = thread::spawn(move || {
        loop {
            let mut request = match server.recv_timeout(Duration::from_secs(5)) {
                Ok(Some(request)) => request,
                _ => break,
            };
            let authorization = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());
            let mut body = String::new();
            use std::io::Read;
            request.as_reader().read_to_string(&mut body).expect("body");
            let envelope: Value = serde_json::from_str(&body).expect("json");
            let method = envelope["method"].as_str().unwrap_or_default().to_string();
            seen.lock()
                .expect("lock")
                .push((method.clone(), authorization.clone()));

            let reply = match method.as_str() {
                "apiinfo.version" => {
                    json!({"jsonrpc": "2.0", "id": envelope["id"], "result": "6.4.0"})
                }
                "host.get" if authorization.as_deref() == Some("Bearer bad-token") => json!({
                    "jsonrpc": "2.0",
                    "id": envelope["id"],
                    "error": {"code": -32602, "message": "Not authorized.", "data": "Invalid token."},
                }),
                "host.get" => json!({"jsonrpc": "2.0", "id": envelope["id"], "result": []}),
                "user.login" => {
                    json!({"jsonrpc": "2.0", "id": envelope["id"], "result": "sess-env"})
                }
                _ => break,
            };
            let response = Response::from_string(reply.to_string()).with_header(
                tiny_http::Header::from_bytes("Content-Type", "application/json").expect("header"),
            );
            request.respond(response).expect("respond");
        }
    });

    let td = tempdir().expect("tempdir");
    let session_file = td.path().join("session.json");

    clear_auth_env(|| {
        temp_env::with_vars(
            [
                ("ZABBIX_API_TOKEN", Some("bad-token")),
                ("ZABBIX_USERNAME", Some("Admin")),
                ("ZABBIX_PASSWORD", Some("env-password")),
            ],
            || {
                let mut config = Config::new();
                config.api.url = url.clone();
                config.app.session_file = Some(session_file.clone());

                let mut client = ClientBuilder::new(&url)
                    .timeout(Some(Duration::from_secs(5)))
                    .build()
                    .expect("client");
                let resolved = establish_session(&mut client, &config, None).expect("resolved");

                // The token was tried first and rejected; the env password won.
                assert_eq!(resolved.credential.kind, zbx_auth::CredentialKind::Password);
                assert_eq!(resolved.credential.source, zbx_auth::CredentialSource::Env);
                assert_eq!(resolved.session, "sess-env");
                assert!(client.is_authenticated());

                // The password session was persisted for (url, username).
                let store =
                    zbx_auth::SessionStore::load(&session_file, false).expect("session store");
                assert_eq!(store.get(client.url(), "Admin"), Some("sess-env"));
            },
        );
    });

    drop(handle);
    let observed = requests.lock().expect("lock").clone();
    let methods: Vec<&str> = observed.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(
        methods,
        vec!["apiinfo.version", "host.get", "user.login", "host.get"]
    );
}

#[test]
#[serial]
fn stored_session_is_reused_without_login() {
    let server = MockServer::spawn(|observed| match observed.method.as_str() {
        "apiinfo.version" => Some(json!("6.4.0")),
        "host.get" => {
            assert_eq!(observed.authorization.as_deref(), Some("Bearer sess-stored"));
            Some(json!([]))
        }
        _ => None,
    });

    let td = tempdir().expect("tempdir");
    let session_file = td.path().join("session.json");

    clear_auth_env(|| {
        let mut client = client_for(&server);

        let mut store = zbx_auth::SessionStore::new(&session_file);
        store.set(client.url(), "Admin", "sess-stored");
        store.save(false).expect("seed session");

        let mut config = Config::new();
        config.api.url = server.url.clone();
        config.api.username = Some("Admin".to_string());
        config.app.session_file = Some(session_file.clone());

        let resolved = establish_session(&mut client, &config, None).expect("resolved");
        assert_eq!(resolved.credential.kind, zbx_auth::CredentialKind::Session);
        assert_eq!(
            resolved.credential.source,
            zbx_auth::CredentialSource::SessionFile
        );
    });

    let requests = server.finish();
    let methods: Vec<&str> = requests.iter().map(|r| r.method.as_str()).collect();
    // No user.login anywhere: the stored session was probed directly.
    assert_eq!(methods, vec!["apiinfo.version", "host.get"]);
}

#[test]
#[serial]
fn no_credentials_and_no_prompt_exhausts() {
    let server = MockServer::spawn(|observed| match observed.method.as_str() {
        "apiinfo.version" => Some(json!("6.4.0")),
        _ => None,
    });

    let td = tempdir().expect("tempdir");
    clear_auth_env(|| {
        let mut config = Config::new();
        config.api.url = server.url.clone();
        config.app.session_file = Some(td.path().join("session.json"));

        let mut client = client_for(&server);
        let err = establish_session(&mut client, &config, None).expect_err("no credentials");
        assert!(matches!(err, Error::CredentialsExhausted { tried: 0 }));
    });
}

#[test]
#[serial]
fn export_then_import_round_trips_a_host_group() {
    let exported_payload = json!({
        "zabbix_export": {
            "version": "6.4",
            "host_groups": [{"uuid": "abc", "name": "Siteops"}],
        }
    })
    .to_string();

    let payload_for_server = exported_payload.clone();
    let imported: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let imported_seen = Arc::clone(&imported);
    let server = MockServer::spawn(move |observed| match observed.method.as_str() {
        "apiinfo.version" => Some(json!("6.4.0")),
        "hostgroup.get" => Some(json!([{"groupid": "2", "name": "Siteops"}])),
        "configuration.export" => {
            let params = &observed.envelope["params"];
            assert_eq!(params["format"], json!("json"));
            assert_eq!(params["options"]["host_groups"], json!(["2"]));
            Some(json!(payload_for_server.clone()))
        }
        "configuration.import" => {
            imported_seen
                .lock()
                .expect("lock")
                .push(observed.envelope["params"].clone());
            Some(json!(true))
        }
        _ => None,
    });

    let td = tempdir().expect("tempdir");
    let export_dir = td.path().join("exports");

    let client = client_for(&server);
    let mut reporter = SilentReporter;

    // Export a single host group as JSON.
    let mut options = ExportOptions::new(&export_dir, ExportFormat::Json);
    options.types = vec![ExportType::HostGroups];
    options.names = vec!["Siteops".to_string()];
    let written = ExportJob::new(&client, options)
        .run(&mut reporter)
        .expect("export");
    assert_eq!(written.len(), 1);
    let exported_file = &written[0];
    assert_eq!(
        exported_file,
        &export_dir.join("host_groups").join("Siteops_2.json")
    );
    assert_eq!(
        std::fs::read_to_string(exported_file).expect("read"),
        exported_payload
    );

    // Import the produced file back.
    let files = filter_importable_files(&[exported_file.clone()]);
    assert_eq!(files.len(), 1);
    let report = ImportJob::new(&client, files, ImportOptions::default())
        .run(&mut reporter)
        .expect("import");
    assert!(report.success());
    assert_eq!(report.imported, vec![exported_file.clone()]);

    let imports = imported.lock().expect("lock");
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0]["format"], json!("json"));
    assert_eq!(imports[0]["source"], json!(exported_payload));
    assert_eq!(imports[0]["rules"]["host_groups"]["createMissing"], json!(true));
    assert_eq!(imports[0]["rules"]["host_groups"]["updateExisting"], json!(true));
}

#[test]
#[serial]
fn dry_run_style_filtering_makes_no_server_calls() {
    let td = tempdir().expect("tempdir");
    for name in ["a.json", "b.json", "c.yaml", "d.txt"] {
        std::fs::write(td.path().join(name), "{}").expect("write");
    }
    let all: Vec<_> = ["a.json", "b.json", "c.yaml", "d.txt"]
        .iter()
        .map(|n| td.path().join(n))
        .collect();

    // Filtering is pure filesystem work; no client or server involved.
    let files = filter_importable_files(&all);
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|f| f.extension().is_some()));
    assert!(!files.iter().any(|f| f.ends_with(Path::new("d.txt"))));
}
