//! Credential resolution and on-disk session storage for zbx.
//!
//! This crate owns everything that happens before the first authenticated
//! API call:
//! - [`store`]: the session file (`url → [{username, session_id}]`), legacy
//!   single-line `user::secret` files, and the 0600 permission policy shared
//!   by both.
//! - [`resolver`]: deterministic ordering of candidate credentials and the
//!   probe fold that picks the first one the server accepts.
//!
//! The resolver never talks HTTP itself; it is generic over a [`Prober`] so
//! the ordering logic is testable without a server.

pub mod resolver;
pub mod store;

pub use resolver::{
    Credential, CredentialKind, CredentialSource, ProbeError, Prober, PromptCredentials,
    ResolveError, Resolved, ResolverInputs, gather_candidates, resolve,
};
pub use store::{
    SessionFileError, SessionStore, UserSecret, default_auth_file, default_auth_token_file,
    default_session_file, read_secret_file, write_secret_file,
};

/// Environment variable holding an API token (highest-precedence source).
pub const ENV_API_TOKEN: &str = "ZABBIX_API_TOKEN";
/// Environment variable holding the username of a username/password pair.
pub const ENV_USERNAME: &str = "ZABBIX_USERNAME";
/// Environment variable holding the password of a username/password pair.
pub const ENV_PASSWORD: &str = "ZABBIX_PASSWORD";
