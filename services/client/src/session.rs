//! services/client/src/session.rs
//!
//! The session store: the only cross-view state in the client. It owns the
//! authenticated user's identity and tokens and keeps them mirrored in the
//! `CredentialStore` under three independent keys.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use studysearch_core::domain::{
    AuthTokens, LoginResults, RefreshedTokens, Role, Session, SessionState, UserProfile,
};
use studysearch_core::ports::{AuthService, CredentialStore, PortError, PortResult, StorageKey};
use tracing::{debug, info, warn};

use crate::adapters::records::string_or_number;

/// The `user` entry as it is persisted.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    #[serde(deserialize_with = "string_or_number")]
    pk: String,
    email: String,
    first_name: String,
    last_name: String,
    full_name: String,
    role: String,
    #[serde(default)]
    role_name: Option<String>,
}

impl StoredUser {
    fn from_domain(user: &UserProfile) -> Self {
        Self {
            pk: user.user_id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name.clone(),
            role: user.role.as_str().to_string(),
            role_name: Some(user.role_name.clone()),
        }
    }

    fn to_domain(self) -> Option<UserProfile> {
        let role = Role::parse(&self.role)?;
        let role_name = self.role_name.unwrap_or_else(|| match role {
            Role::SuperAdmin => Role::ADMIN_ROLE_NAME.to_string(),
            Role::User => Role::DEFAULT_ROLE_NAME.to_string(),
        });
        Some(UserProfile {
            user_id: self.pk,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            full_name: self.full_name,
            role,
            role_name,
        })
    }
}

/// Builds a session from a successful login reply.
pub fn session_from_login(results: LoginResults) -> Session {
    let remote = results.user;
    let role_name = remote
        .role_name
        .unwrap_or_else(|| Role::DEFAULT_ROLE_NAME.to_string());
    let full_name = format!("{} {}", remote.first_name, remote.last_name);
    Session {
        user: UserProfile {
            user_id: remote.user_id,
            email: remote.email,
            first_name: remote.first_name,
            last_name: remote.last_name,
            full_name,
            role: Role::from_role_name(&role_name),
            role_name,
        },
        tokens: results.tokens,
    }
}

//=========================================================================================
// SessionStore
//=========================================================================================

pub struct SessionStore {
    storage: Arc<dyn CredentialStore>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Restores the persisted session. Anything short of three present and
    /// parseable entries resolves to anonymous and clears all of them.
    pub fn hydrate(storage: Arc<dyn CredentialStore>) -> Self {
        let store = Self {
            storage,
            current: RwLock::new(None),
        };
        match store.read_persisted() {
            Some(session) => {
                debug!("Restored session for {}", session.user.email);
                *store.write_guard() = Some(session);
            }
            None => store.clear_storage(),
        }
        store
    }

    fn read_persisted(&self) -> Option<Session> {
        let read = |key: StorageKey| match self.storage.read(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read {} from credential storage: {}", key.as_str(), e);
                None
            }
        };
        let user = read(StorageKey::User)?;
        let access = read(StorageKey::AccessToken)?;
        let refresh = read(StorageKey::RefreshToken)?;

        let user = match serde_json::from_str::<StoredUser>(&user) {
            Ok(stored) => stored.to_domain()?,
            Err(e) => {
                debug!("Discarding unparseable stored user: {}", e);
                return None;
            }
        };
        Some(Session {
            user,
            tokens: AuthTokens { access, refresh },
        })
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<Session> {
        self.read_guard().clone()
    }

    pub fn state(&self) -> SessionState {
        SessionState::of(self.read_guard().as_ref())
    }

    pub fn is_admin(&self) -> bool {
        self.state() == SessionState::AuthenticatedAdmin
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_guard().as_ref().map(|s| s.tokens.access.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_guard().as_ref().map(|s| s.tokens.refresh.clone())
    }

    /// Persists a freshly logged-in session and makes it current.
    pub fn establish(&self, results: LoginResults) -> PortResult<Session> {
        let session = session_from_login(results);
        let user_json = serde_json::to_string(&StoredUser::from_domain(&session.user))
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let persisted = self
            .storage
            .write(StorageKey::AccessToken, &session.tokens.access)
            .and_then(|_| {
                self.storage
                    .write(StorageKey::RefreshToken, &session.tokens.refresh)
            })
            .and_then(|_| self.storage.write(StorageKey::User, &user_json));
        if let Err(e) = persisted {
            warn!("Failed to persist session, discarding it: {}", e);
            self.teardown();
            return Err(e);
        }

        info!(
            "Logged in as {} ({})",
            session.user.email,
            session.user.role.as_str()
        );
        *self.write_guard() = Some(session.clone());
        Ok(session)
    }

    /// Stores tokens handed back by the refresh endpoint.
    pub fn replace_tokens(&self, tokens: RefreshedTokens) -> PortResult<()> {
        let mut guard = self.write_guard();
        let Some(session) = guard.as_mut() else {
            return Err(PortError::SessionExpired);
        };
        self.storage.write(StorageKey::AccessToken, &tokens.access)?;
        session.tokens.access = tokens.access;
        if let Some(refresh) = tokens.refresh {
            self.storage.write(StorageKey::RefreshToken, &refresh)?;
            session.tokens.refresh = refresh;
        }
        Ok(())
    }

    /// Drops the session from memory and storage. Safe to call repeatedly;
    /// returns whether a session was actually present.
    pub fn teardown(&self) -> bool {
        let previous = self.write_guard().take();
        self.clear_storage();
        if let Some(session) = &previous {
            info!("Session for {} torn down", session.user.email);
        }
        previous.is_some()
    }

    /// Explicit logout. The remote call is best-effort.
    pub async fn logout(&self, auth: &dyn AuthService) {
        if self.state() != SessionState::Anonymous {
            if let Err(e) = auth.logout().await {
                warn!("Logout request failed, clearing local session anyway: {}", e);
            }
        }
        self.teardown();
    }

    fn clear_storage(&self) {
        for key in StorageKey::ALL {
            if let Err(e) = self.storage.remove(key) {
                warn!("Failed to clear {} from credential storage: {}", key.as_str(), e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::storage::MemoryCredentialStore;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use studysearch_core::domain::{LoginReply, RemoteUser, SignUpReply, SignUpRequest};

    pub(crate) fn login_results(role_name: Option<&str>) -> LoginResults {
        LoginResults {
            tokens: AuthTokens {
                access: "T1".into(),
                refresh: "T2".into(),
            },
            user: RemoteUser {
                user_id: "1".into(),
                email: "a@b.com".into(),
                first_name: "A".into(),
                last_name: "B".into(),
                role_name: role_name.map(str::to_string),
            },
        }
    }

    fn memory() -> Arc<MemoryCredentialStore> {
        Arc::new(MemoryCredentialStore::new())
    }

    struct CountingAuth {
        logouts: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AuthService for CountingAuth {
        async fn login(&self, _: &str, _: &str) -> PortResult<LoginReply> {
            unreachable!()
        }
        async fn sign_up(&self, _: &SignUpRequest) -> PortResult<SignUpReply> {
            unreachable!()
        }
        async fn logout(&self) -> PortResult<()> {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(PortError::Transport("connection refused".into()))
            } else {
                Ok(())
            }
        }
        async fn refresh(&self, _: &str) -> PortResult<RefreshedTokens> {
            unreachable!()
        }
    }

    #[test]
    fn establish_persists_all_three_keys() {
        let storage = memory();
        let store = SessionStore::hydrate(storage.clone());
        let session = store.establish(login_results(Some("Regular User"))).unwrap();

        assert_eq!(session.user.role, Role::User);
        assert_eq!(session.user.full_name, "A B");
        assert_eq!(store.state(), SessionState::AuthenticatedUser);
        assert_eq!(storage.read(StorageKey::AccessToken).unwrap().as_deref(), Some("T1"));
        assert_eq!(storage.read(StorageKey::RefreshToken).unwrap().as_deref(), Some("T2"));
        assert!(storage.read(StorageKey::User).unwrap().is_some());
    }

    #[test]
    fn hydrate_restores_the_stored_session() {
        let storage = memory();
        let original = SessionStore::hydrate(storage.clone())
            .establish(login_results(Some("Super Admin")))
            .unwrap();

        let restored = SessionStore::hydrate(storage);
        assert_eq!(restored.current(), Some(original));
        assert!(restored.is_admin());
    }

    #[test]
    fn hydrate_clears_partial_sessions() {
        for missing in StorageKey::ALL {
            let storage = memory();
            SessionStore::hydrate(storage.clone())
                .establish(login_results(None))
                .unwrap();
            storage.remove(missing).unwrap();

            let store = SessionStore::hydrate(storage.clone());
            assert_eq!(store.state(), SessionState::Anonymous);
            for key in StorageKey::ALL {
                assert_eq!(storage.read(key).unwrap(), None, "{:?} left behind", key);
            }
        }
    }

    #[test]
    fn hydrate_clears_unparseable_user() {
        let storage = memory();
        storage.write(StorageKey::User, "{not json").unwrap();
        storage.write(StorageKey::AccessToken, "T1").unwrap();
        storage.write(StorageKey::RefreshToken, "T2").unwrap();

        let store = SessionStore::hydrate(storage.clone());
        assert_eq!(store.state(), SessionState::Anonymous);
        assert_eq!(storage.read(StorageKey::AccessToken).unwrap(), None);
    }

    #[test]
    fn hydrate_accepts_numeric_user_ids() {
        let storage = memory();
        storage
            .write(
                StorageKey::User,
                r#"{"pk":7,"email":"a@b.com","firstName":"A","lastName":"B","fullName":"A B","role":"user"}"#,
            )
            .unwrap();
        storage.write(StorageKey::AccessToken, "T1").unwrap();
        storage.write(StorageKey::RefreshToken, "T2").unwrap();

        let session = SessionStore::hydrate(storage).current().unwrap();
        assert_eq!(session.user.user_id, "7");
        assert_eq!(session.user.role_name, "Regular User");
    }

    #[test]
    fn teardown_is_idempotent() {
        let storage = memory();
        let store = SessionStore::hydrate(storage.clone());
        store.establish(login_results(None)).unwrap();

        assert!(store.teardown());
        assert!(!store.teardown());
        assert_eq!(store.state(), SessionState::Anonymous);
        assert_eq!(storage.read(StorageKey::User).unwrap(), None);
    }

    #[test]
    fn replace_tokens_keeps_refresh_unless_rotated() {
        let storage = memory();
        let store = SessionStore::hydrate(storage.clone());
        store.establish(login_results(None)).unwrap();

        store
            .replace_tokens(RefreshedTokens {
                access: "T3".into(),
                refresh: None,
            })
            .unwrap();
        assert_eq!(store.access_token().as_deref(), Some("T3"));
        assert_eq!(store.refresh_token().as_deref(), Some("T2"));
        assert_eq!(storage.read(StorageKey::AccessToken).unwrap().as_deref(), Some("T3"));

        store
            .replace_tokens(RefreshedTokens {
                access: "T4".into(),
                refresh: Some("T5".into()),
            })
            .unwrap();
        assert_eq!(storage.read(StorageKey::RefreshToken).unwrap().as_deref(), Some("T5"));
    }

    #[tokio::test]
    async fn logout_clears_even_when_remote_call_fails() {
        let store = SessionStore::hydrate(memory());
        store.establish(login_results(None)).unwrap();
        let auth = CountingAuth {
            logouts: AtomicUsize::new(0),
            fail: true,
        };

        store.logout(&auth).await;
        assert_eq!(auth.logouts.load(Ordering::SeqCst), 1);
        assert_eq!(store.state(), SessionState::Anonymous);

        // Already anonymous: nothing to tell the server.
        store.logout(&auth).await;
        assert_eq!(auth.logouts.load(Ordering::SeqCst), 1);
    }

    proptest! {
        #[test]
        fn role_is_a_pure_function_of_role_name(name in ".*") {
            let session = session_from_login(login_results(Some(&name)));
            let expected = if name == "Super Admin" { Role::SuperAdmin } else { Role::User };
            prop_assert_eq!(session.user.role, expected);
        }
    }
}
