//! Credential resolution.
//!
//! Candidate credentials are gathered in a fixed priority order and folded
//! through a [`Prober`]: the first candidate the server accepts wins. A
//! rejected candidate (expired token, expired session, not authorized) moves
//! the fold along; anything else aborts resolution. The interactive prompt
//! is the source of last resort and only consulted when the caller supplies
//! one.

use std::env;
use std::fmt;

use thiserror::Error;

use crate::store::SessionStore;
use crate::{ENV_API_TOKEN, ENV_PASSWORD, ENV_USERNAME, read_secret_file};

/// What kind of secret a credential carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    ApiToken,
    Session,
    Password,
    AuthToken,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::ApiToken => write!(f, "API token"),
            CredentialKind::Session => write!(f, "session"),
            CredentialKind::Password => write!(f, "password"),
            CredentialKind::AuthToken => write!(f, "auth token"),
        }
    }
}

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Env,
    Config,
    SessionFile,
    AuthFile,
    AuthTokenFile,
    Prompt,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Env => write!(f, "environment"),
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::SessionFile => write!(f, "session file"),
            CredentialSource::AuthFile => write!(f, "auth file"),
            CredentialSource::AuthTokenFile => write!(f, "auth token file"),
            CredentialSource::Prompt => write!(f, "prompt"),
        }
    }
}

/// A single candidate credential.
///
/// `secret` holds the token, session ID or password depending on `kind`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub kind: CredentialKind,
    pub source: CredentialSource,
    pub username: Option<String>,
    pub secret: String,
}

// Manual Debug so secrets never end up in logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credential {
    pub fn api_token(source: CredentialSource, token: impl Into<String>) -> Self {
        Self {
            kind: CredentialKind::ApiToken,
            source,
            username: None,
            secret: token.into(),
        }
    }

    pub fn session(source: CredentialSource, username: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: CredentialKind::Session,
            source,
            username: Some(username.into()),
            secret: id.into(),
        }
    }

    pub fn password(
        source: CredentialSource,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            kind: CredentialKind::Password,
            source,
            username: Some(username.into()),
            secret: password.into(),
        }
    }
}

/// Everything the candidate gathering step needs to know.
#[derive(Debug, Default, Clone)]
pub struct ResolverInputs {
    /// Server URL, used to look up stored sessions.
    pub url: String,
    /// Username the session lookup is keyed on (usually from config or env).
    pub username: Option<String>,
    pub config_token: Option<String>,
    pub config_username: Option<String>,
    pub config_password: Option<String>,
    /// Already-loaded session store, if any.
    pub session_store: Option<SessionStore>,
    pub auth_file: Option<std::path::PathBuf>,
    pub auth_token_file: Option<std::path::PathBuf>,
    pub allow_insecure_files: bool,
}

/// Gather candidate credentials in resolution priority order.
///
/// The order is fixed:
/// 1. API token from the environment
/// 2. API token from configuration
/// 3. Stored session matching (URL, username)
/// 4. Username/password from the environment
/// 5. Username/password from configuration
/// 6. Username/password from the auth file
/// 7. Legacy auth token from the auth-token file
///
/// The interactive prompt is not a gathered candidate; [`resolve`] consults
/// it only after every gathered candidate has been rejected.
pub fn gather_candidates(inputs: &ResolverInputs) -> Vec<Credential> {
    let mut candidates = Vec::new();

    if let Some(token) = non_empty(env::var(ENV_API_TOKEN).ok()) {
        candidates.push(Credential::api_token(CredentialSource::Env, token));
    }
    if let Some(token) = non_empty(inputs.config_token.clone()) {
        candidates.push(Credential::api_token(CredentialSource::Config, token));
    }

    if let (Some(store), Some(username)) = (&inputs.session_store, username_for_session(inputs)) {
        if let Some(session) = store.get(&inputs.url, &username) {
            candidates.push(Credential::session(
                CredentialSource::SessionFile,
                username,
                session,
            ));
        }
    }

    let env_user = non_empty(env::var(ENV_USERNAME).ok());
    let env_password = non_empty(env::var(ENV_PASSWORD).ok());
    if let (Some(user), Some(password)) = (env_user, env_password) {
        candidates.push(Credential::password(CredentialSource::Env, user, password));
    }

    if let (Some(user), Some(password)) = (
        non_empty(inputs.config_username.clone()),
        non_empty(inputs.config_password.clone()),
    ) {
        candidates.push(Credential::password(CredentialSource::Config, user, password));
    }

    if let Some(path) = &inputs.auth_file {
        match read_secret_file(path, inputs.allow_insecure_files) {
            Ok(secret) if !secret.username.is_empty() && !secret.secret.is_empty() => {
                candidates.push(Credential::password(
                    CredentialSource::AuthFile,
                    secret.username,
                    secret.secret,
                ));
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("skipping auth file: {e}"),
        }
    }

    if let Some(path) = &inputs.auth_token_file {
        match read_secret_file(path, inputs.allow_insecure_files) {
            Ok(secret) if !secret.secret.is_empty() => {
                // A stored token for a different user than the configured one
                // must not be used; it would authenticate as somebody else.
                let configured = username_for_session(inputs);
                if configured.is_some() && configured.as_deref() != Some(secret.username.as_str()) {
                    tracing::warn!(
                        "ignoring auth token for {:?}: does not match configured username",
                        secret.username
                    );
                } else {
                    candidates.push(Credential {
                        kind: CredentialKind::AuthToken,
                        source: CredentialSource::AuthTokenFile,
                        username: Some(secret.username),
                        secret: secret.secret,
                    });
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("skipping auth token file: {e}"),
        }
    }

    candidates
}

fn username_for_session(inputs: &ResolverInputs) -> Option<String> {
    non_empty(inputs.username.clone())
        .or_else(|| non_empty(env::var(ENV_USERNAME).ok()))
        .or_else(|| non_empty(inputs.config_username.clone()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Why a probe did not produce a usable session.
#[derive(Debug)]
pub enum ProbeError<E> {
    /// The server rejected the credential (expired/not authorized). The
    /// resolver moves on to the next candidate.
    Denied,
    /// Anything else: network failure, malformed response, server error.
    /// Aborts resolution.
    Fatal(E),
}

/// Validates one candidate against the server.
pub trait Prober {
    type Error;

    /// Attempt to authenticate. On success, returns the session token the
    /// client now holds (for password logins this is the freshly issued
    /// session ID; for tokens it is the token itself).
    fn probe(&mut self, credential: &Credential) -> Result<String, ProbeError<Self::Error>>;
}

/// Last-resort interactive source. Only consulted when every gathered
/// candidate has been rejected; callers should pass `None` when the session
/// is not attached to a terminal.
pub trait PromptCredentials {
    fn prompt(&mut self) -> Option<(String, String)>;
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub credential: Credential,
    /// The session token established by the winning probe.
    pub session: String,
}

#[derive(Debug, Error)]
pub enum ResolveError<E> {
    #[error("no credential accepted by the server ({tried} source(s) tried)")]
    Exhausted { tried: usize },
    #[error("credential resolution aborted")]
    Fatal(#[source] E),
}

/// Fold the candidates through the prober; first accepted candidate wins.
pub fn resolve<P: Prober>(
    candidates: Vec<Credential>,
    prober: &mut P,
    mut prompt: Option<&mut dyn PromptCredentials>,
) -> Result<Resolved, ResolveError<P::Error>> {
    let mut tried = 0usize;
    for credential in candidates {
        tried += 1;
        tracing::debug!(
            "trying {} from {}",
            credential.kind,
            credential.source
        );
        match prober.probe(&credential) {
            Ok(session) => return Ok(Resolved { credential, session }),
            Err(ProbeError::Denied) => {
                tracing::debug!(
                    "{} from {} rejected by server",
                    credential.kind,
                    credential.source
                );
            }
            Err(ProbeError::Fatal(e)) => return Err(ResolveError::Fatal(e)),
        }
    }

    if let Some(prompt) = prompt.as_deref_mut()
        && let Some((username, password)) = prompt.prompt()
    {
        tried += 1;
        let credential = Credential::password(CredentialSource::Prompt, username, password);
        match prober.probe(&credential) {
            Ok(session) => return Ok(Resolved { credential, session }),
            Err(ProbeError::Denied) => {}
            Err(ProbeError::Fatal(e)) => return Err(ResolveError::Fatal(e)),
        }
    }

    Err(ResolveError::Exhausted { tried })
}
