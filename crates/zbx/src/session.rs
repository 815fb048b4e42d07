//! Login orchestration.
//!
//! Connects the credential resolver to the API client: candidates are
//! gathered from environment, configuration and on-disk files, probed in
//! order against the server, and the winning session is persisted to the
//! session store when it came from a password login and persistence is
//! enabled.

use zbx_auth::{
    Credential, CredentialKind, ProbeError, Prober, PromptCredentials, ResolveError, Resolved,
    ResolverInputs, SessionStore, default_auth_file, default_auth_token_file,
    default_session_file, gather_candidates, resolve,
};
use zbx_config::Config;

use crate::client::{LoginCredentials, ZabbixClient};
use crate::error::{ApiError, Error};

impl Prober for ZabbixClient {
    type Error = ApiError;

    fn probe(&mut self, credential: &Credential) -> Result<String, ProbeError<ApiError>> {
        let login = match credential.kind {
            CredentialKind::ApiToken => LoginCredentials::token(&credential.secret),
            // Stored sessions and legacy auth tokens are both server-issued
            // session IDs.
            CredentialKind::Session | CredentialKind::AuthToken => {
                LoginCredentials::session(&credential.secret)
            }
            CredentialKind::Password => {
                let username = credential.username.clone().unwrap_or_default();
                LoginCredentials::password(username, &credential.secret)
            }
        };
        match self.login(&login) {
            Ok(session) => Ok(session),
            Err(e) if e.is_auth_failure() => {
                tracing::debug!("credential rejected: {e}");
                Err(ProbeError::Denied)
            }
            Err(e) => Err(ProbeError::Fatal(e)),
        }
    }
}

/// Resolve credentials against the server and leave the client logged in.
///
/// On success with a password credential, the obtained session ID is
/// written to the session store keyed by `(url, username)` when the
/// configuration opts into persistence.
pub fn establish_session(
    client: &mut ZabbixClient,
    config: &Config,
    prompt: Option<&mut dyn PromptCredentials>,
) -> Result<Resolved, Error> {
    let url = client.url().to_string();
    let session_path = config
        .app
        .session_file
        .clone()
        .unwrap_or_else(default_session_file);
    let allow_insecure = config.app.allow_insecure_auth_file;

    let mut store = if config.app.use_session_file {
        Some(SessionStore::load_or_empty(&session_path, allow_insecure)?)
    } else {
        None
    };

    let inputs = ResolverInputs {
        url: url.clone(),
        username: config.api.username.clone(),
        config_token: config.api.auth_token.clone(),
        config_username: config.api.username.clone(),
        config_password: config.api.password.clone(),
        session_store: store.clone(),
        auth_file: Some(default_auth_file()),
        auth_token_file: Some(default_auth_token_file()),
        allow_insecure_files: allow_insecure,
    };
    let candidates = gather_candidates(&inputs);
    tracing::debug!("gathered {} credential candidate(s)", candidates.len());

    let resolved = resolve(candidates, client, prompt).map_err(|e| match e {
        ResolveError::Exhausted { tried } => Error::CredentialsExhausted { tried },
        ResolveError::Fatal(api) => Error::Api(api),
    })?;
    tracing::debug!(
        "authenticated with {} from {}",
        resolved.credential.kind,
        resolved.credential.source
    );

    if resolved.credential.kind == CredentialKind::Password
        && let Some(store) = store.as_mut()
        && let Some(username) = resolved.credential.username.as_deref()
    {
        store.set(&url, username, &resolved.session);
        store.save(allow_insecure)?;
        tracing::debug!(path = %session_path.display(), "stored session");
    }

    Ok(resolved)
}
