//! Auth gate — boolean guard in front of the pipeline and analysis
//! workspaces.
//!
//! The credential lives in the durable store and is seeded on first login;
//! the session store carries the auth flag and username so a reload lands
//! back inside the gate. Credential storage semantics beyond these
//! transitions are out of scope.

use tracing::info;

use docpipe_proto::store::{keys, DurableStore, SessionStore, StoreError};

#[derive(Debug, Default)]
pub struct AuthGate {
    pub authenticated: bool,
    pub username: Option<String>,
}

impl AuthGate {
    pub fn restore(session: &SessionStore) -> Self {
        Self {
            authenticated: session.get_or_default(keys::AUTH_FLAG),
            username: session.get(keys::USERNAME),
        }
    }

    /// Check the secret against the stored credential (seeding it on first
    /// run) and persist the authenticated session.
    pub fn login(
        &mut self,
        durable: &mut DurableStore,
        session: &mut SessionStore,
        username: &str,
        secret: &str,
    ) -> Result<(), String> {
        let username = username.trim();
        if username.is_empty() {
            return Err("Enter a username.".to_string());
        }
        if secret.is_empty() {
            return Err("Enter a password.".to_string());
        }

        match durable.get::<String>(keys::CREDENTIAL) {
            Some(stored) if stored != secret => {
                return Err("That password does not match. Try again.".to_string());
            }
            Some(_) => {}
            None => {
                durable
                    .put(keys::CREDENTIAL, &secret)
                    .map_err(save_failed)?;
                info!("auth: credential seeded on first login");
            }
        }

        self.authenticated = true;
        self.username = Some(username.to_string());
        session.put(keys::AUTH_FLAG, &true).map_err(save_failed)?;
        session.put(keys::USERNAME, &username).map_err(save_failed)?;
        info!("auth: '{}' logged in", username);
        Ok(())
    }

    /// Drop the session's task state (auth flag and username excepted, then
    /// the flag is cleared) so logging back in starts from a clean pipeline.
    pub fn logout(&mut self, session: &mut SessionStore) -> Result<(), StoreError> {
        session.reset_task()?;
        session.put(keys::AUTH_FLAG, &false)?;
        self.authenticated = false;
        info!("auth: logged out");
        Ok(())
    }
}

fn save_failed(e: StoreError) -> String {
    tracing::error!("auth: persistence failed: {}", e);
    "Could not save login state. Check disk permissions.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> (tempfile::TempDir, DurableStore, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let durable = DurableStore::open(dir.path().join("durable.json"));
        let session = SessionStore::open(dir.path().join("session.json"));
        (dir, durable, session)
    }

    #[test]
    fn first_login_seeds_credential() {
        let (_dir, mut durable, mut session) = stores();
        let mut gate = AuthGate::default();

        gate.login(&mut durable, &mut session, "ada", "hunter2").unwrap();
        assert!(gate.authenticated);
        assert_eq!(durable.get::<String>(keys::CREDENTIAL).as_deref(), Some("hunter2"));
        assert_eq!(session.get::<bool>(keys::AUTH_FLAG), Some(true));
    }

    #[test]
    fn wrong_credential_is_rejected() {
        let (_dir, mut durable, mut session) = stores();
        let mut gate = AuthGate::default();
        gate.login(&mut durable, &mut session, "ada", "hunter2").unwrap();

        let mut gate = AuthGate::default();
        let err = gate
            .login(&mut durable, &mut session, "ada", "wrong")
            .unwrap_err();
        assert!(!gate.authenticated);
        assert!(err.contains("does not match"));
    }

    #[test]
    fn logout_clears_flag_but_keeps_username() {
        let (_dir, mut durable, mut session) = stores();
        let mut gate = AuthGate::default();
        gate.login(&mut durable, &mut session, "ada", "hunter2").unwrap();
        session.put(keys::STEP, &2u8).unwrap();

        gate.logout(&mut session).unwrap();
        assert!(!gate.authenticated);
        assert_eq!(session.get::<bool>(keys::AUTH_FLAG), Some(false));
        assert_eq!(session.get::<String>(keys::USERNAME).as_deref(), Some("ada"));
        assert!(session.get::<u8>(keys::STEP).is_none());
    }

    #[test]
    fn restore_reads_session_flag() {
        let (_dir, mut durable, mut session) = stores();
        let mut gate = AuthGate::default();
        gate.login(&mut durable, &mut session, "ada", "hunter2").unwrap();

        let restored = AuthGate::restore(&session);
        assert!(restored.authenticated);
        assert_eq!(restored.username.as_deref(), Some("ada"));
    }
}
