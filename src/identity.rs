//! Bridge between a third-party identity provider and the session.
//!
//! Sign-in is a two-step protocol: `GoogleSignIn::initialize` loads the
//! provider's client script (at most once) and returns a `CredentialHandle`;
//! the caller then registers a callback with `CredentialHandle::on_credential`.
//! Every side effect of loading goes through the `ScriptLoader` capability.

use crate::api::TodoBackend;
use crate::error::{ClientError, Result};
use crate::session::Session;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

pub const GOOGLE_CLIENT_SCRIPT: &str = "https://accounts.google.com/gsi/client";
pub const PLACEHOLDER_CLIENT_ID: &str = "your-google-client-id-here";

#[async_trait]
pub trait ScriptLoader: Send + Sync {
    async fn load(&self, src: &str) -> Result<()>;
}

/// Fetches the provider script to confirm the provider is reachable.
pub struct HttpScriptLoader {
    http: Client,
}

impl HttpScriptLoader {
    pub fn new() -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ScriptLoader for HttpScriptLoader {
    async fn load(&self, src: &str) -> Result<()> {
        debug!(src = %src, "Loading sign-in provider script");
        let response = self
            .http
            .get(src)
            .send()
            .await
            .map_err(|e| ClientError::ServerUnreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ClientError::NotConfigured(format!(
                "provider script returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProviderConfig {
    pub client_id: Option<String>,
}

impl ProviderConfig {
    /// Client id, unless absent, blank or the placeholder value.
    pub fn usable_client_id(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != PLACEHOLDER_CLIENT_ID)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SignInStatus {
    /// No usable client id; the view shows an informational notice.
    NotConfigured,
    Idle,
    Ready,
    Failed(String),
}

/// Opaque credential issued by the provider.
#[derive(Clone, Debug, PartialEq)]
pub struct Credential(pub String);

type CredentialCallback = Box<dyn FnMut(Credential) + Send>;

pub struct CredentialHandle {
    client_id: String,
    callback: Option<CredentialCallback>,
}

impl CredentialHandle {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn on_credential<F>(&mut self, callback: F)
    where
        F: FnMut(Credential) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Hands a provider credential to the registered callback. Returns
    /// `false` if the credential is blank or nobody is listening.
    pub fn deliver(&mut self, credential: &str) -> bool {
        let credential = credential.trim();
        if credential.is_empty() {
            return false;
        }
        match self.callback.as_mut() {
            Some(callback) => {
                callback(Credential(credential.to_string()));
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for CredentialHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHandle")
            .field("client_id", &self.client_id)
            .field("listening", &self.callback.is_some())
            .finish()
    }
}

pub struct GoogleSignIn<L: ScriptLoader> {
    loader: L,
    script_loaded: bool,
    status: SignInStatus,
}

impl<L: ScriptLoader> GoogleSignIn<L> {
    pub fn new(loader: L) -> Self {
        GoogleSignIn {
            loader,
            script_loaded: false,
            status: SignInStatus::Idle,
        }
    }

    pub fn status(&self) -> &SignInStatus {
        &self.status
    }

    pub async fn initialize(&mut self, config: &ProviderConfig) -> Result<CredentialHandle> {
        let Some(client_id) = config.usable_client_id() else {
            info!("Google sign-in not configured, skipping setup");
            self.status = SignInStatus::NotConfigured;
            return Err(ClientError::NotConfigured(
                "Google OAuth client id is not set".to_string(),
            ));
        };

        if !self.script_loaded {
            if let Err(e) = self.loader.load(GOOGLE_CLIENT_SCRIPT).await {
                error!(error = %e, "Failed to load Google sign-in script");
                self.status = SignInStatus::Failed(e.user_message());
                return Err(e);
            }
            self.script_loaded = true;
        }

        self.status = SignInStatus::Ready;
        Ok(CredentialHandle {
            client_id: client_id.to_string(),
            callback: None,
        })
    }
}

/// Trades a provider credential for a session. The current session is left
/// as it was if the exchange fails.
pub async fn exchange_credential(
    backend: &dyn TodoBackend,
    session: &mut Session,
    credential: &Credential,
) -> Result<()> {
    let auth = backend.google_auth(&credential.0).await?;
    session.login(auth.access_token, auth.user);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{user, FakeBackend};
    use crate::token_store::MemoryTokenStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ScriptLoader for CountingLoader {
        async fn load(&self, _src: &str) -> Result<()> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ClientError::ServerUnreachable("offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn configured() -> ProviderConfig {
        ProviderConfig {
            client_id: Some("1234.apps.googleusercontent.com".to_string()),
        }
    }

    #[tokio::test]
    async fn test_placeholder_client_id_is_not_configured() {
        let loads = Arc::new(AtomicUsize::new(0));
        let mut sign_in = GoogleSignIn::new(CountingLoader {
            loads: loads.clone(),
            fail: false,
        });
        let config = ProviderConfig {
            client_id: Some(PLACEHOLDER_CLIENT_ID.to_string()),
        };

        let result = sign_in.initialize(&config).await;

        assert!(matches!(result, Err(ClientError::NotConfigured(_))));
        assert_eq!(sign_in.status(), &SignInStatus::NotConfigured);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_client_id_is_not_configured() {
        let mut sign_in = GoogleSignIn::new(CountingLoader::default());
        let result = sign_in
            .initialize(&ProviderConfig {
                client_id: Some("   ".to_string()),
            })
            .await;
        assert!(result.is_err());
        assert_eq!(sign_in.status(), &SignInStatus::NotConfigured);
    }

    #[tokio::test]
    async fn test_script_loaded_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let mut sign_in = GoogleSignIn::new(CountingLoader {
            loads: loads.clone(),
            fail: false,
        });

        sign_in.initialize(&configured()).await.unwrap();
        let handle = sign_in.initialize(&configured()).await.unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(handle.client_id(), "1234.apps.googleusercontent.com");
        assert_eq!(sign_in.status(), &SignInStatus::Ready);
    }

    #[tokio::test]
    async fn test_load_failure_reports_failed() {
        let mut sign_in = GoogleSignIn::new(CountingLoader {
            loads: Arc::default(),
            fail: true,
        });

        assert!(sign_in.initialize(&configured()).await.is_err());
        assert!(matches!(sign_in.status(), SignInStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_callback_receives_trimmed_credential() {
        let mut sign_in = GoogleSignIn::new(CountingLoader::default());
        let mut handle = sign_in.initialize(&configured()).await.unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        assert!(!handle.deliver("abc"), "no callback registered yet");
        handle.on_credential(move |c| sink.lock().unwrap().push(c));
        assert!(!handle.deliver("   "));
        assert!(handle.deliver("  abc  "));

        assert_eq!(*seen.lock().unwrap(), vec![Credential("abc".to_string())]);
    }

    #[tokio::test]
    async fn test_exchange_logs_in() {
        let backend = FakeBackend::new();
        let mut session = Session::new(Box::new(MemoryTokenStore::new()));

        exchange_credential(
            &backend,
            &mut session,
            &Credential("valid-credential".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(session.token(), Some("google-token"));
        assert_eq!(session.user().map(|u| u.id), Some(42));
    }

    #[tokio::test]
    async fn test_failed_exchange_keeps_existing_session() {
        let backend = FakeBackend::new();
        let mut session = Session::new(Box::new(MemoryTokenStore::new()));
        session.login("existing".to_string(), user(1));

        let result =
            exchange_credential(&backend, &mut session, &Credential("bogus".to_string())).await;

        assert!(result.is_err());
        assert_eq!(session.token(), Some("existing"));
        assert_eq!(session.user().map(|u| u.id), Some(1));
    }
}
