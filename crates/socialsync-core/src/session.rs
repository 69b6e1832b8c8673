use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

pub const SESSION_FILE: &str = "session.json";
pub const DEMO_USER_ID: &str = "demo-user-1";
pub const DEMO_EMAIL: &str = "john@demo.fr";
pub const DEMO_PASSWORD: &str = "demo";
const DEMO_NAME: &str = "John Demo";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub is_demo: bool,
}

impl User {
    pub fn demo() -> Self {
        Self {
            id: DEMO_USER_ID.to_string(),
            email: DEMO_EMAIL.to_string(),
            name: DEMO_NAME.to_string(),
            is_demo: true,
        }
    }
}

/// The two persisted session flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionFlags {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub demo_mode: bool,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    pub path: PathBuf,
}

impl SessionStore {
    pub fn open(session_dir: &Path) -> Self {
        Self {
            path: session_dir.join(SESSION_FILE),
        }
    }

    #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
    pub fn load(&self) -> anyhow::Result<SessionFlags> {
        if !self.path.exists() {
            debug!("no session file; starting signed out");
            return Ok(SessionFlags::default());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(SessionFlags::default());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", self.path.display()))
    }

    #[tracing::instrument(skip(self, flags), fields(file = %self.path.display()))]
    pub fn save(&self, flags: &SessionFlags) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, flags)?;
        writeln!(temp)?;
        temp.flush()?;

        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        debug!(
            signed_in = flags.user.is_some(),
            demo_mode = flags.demo_mode,
            "saved session"
        );
        Ok(())
    }
}

/// Who is signed in and whether demo mode is on.
///
/// Every mutation is written back to the store immediately; `teardown`
/// flushes once more on exit.
#[derive(Debug)]
pub struct Session {
    store: SessionStore,
    flags: SessionFlags,
    directory: Vec<User>,
}

impl Session {
    #[tracing::instrument(skip(store))]
    pub fn init(store: SessionStore) -> anyhow::Result<Self> {
        let mut flags = store.load()?;
        if flags.user.is_none() && flags.demo_mode {
            info!("demo mode active without a user; signing in demo user");
            flags.user = Some(User::demo());
        }

        Ok(Self {
            store,
            flags,
            directory: vec![User::demo()],
        })
    }

    pub fn user(&self) -> Option<&User> {
        self.flags.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.flags.user.is_some()
    }

    pub fn is_demo_mode(&self) -> bool {
        self.flags.demo_mode
    }

    pub fn can_view_dashboard(&self) -> bool {
        self.is_authenticated() || self.is_demo_mode()
    }

    /// Signs in a known user. The password is only checked for the demo
    /// account, whose credentials also switch demo mode on.
    #[tracing::instrument(skip(self, password))]
    pub fn login(&mut self, email: &str, password: &str) -> anyhow::Result<bool> {
        let email = email.trim();
        if email == DEMO_EMAIL && password == DEMO_PASSWORD {
            self.flags.user = Some(User::demo());
            self.flags.demo_mode = true;
            self.persist()?;
            info!("signed in demo user");
            return Ok(true);
        }

        let Some(found) = self.directory.iter().find(|user| user.email == email).cloned() else {
            debug!("unknown email");
            return Ok(false);
        };
        info!(id = %found.id, "signed in");
        self.flags.user = Some(found);
        self.persist()?;
        Ok(true)
    }

    #[tracing::instrument(skip(self, _password))]
    pub fn signup(&mut self, name: &str, email: &str, _password: &str) -> anyhow::Result<bool> {
        let email = email.trim();
        if email.is_empty() {
            return Err(anyhow!("email cannot be empty"));
        }
        if self.directory.iter().any(|user| user.email == email) {
            debug!("email already registered");
            return Ok(false);
        }

        let user = User {
            id: format!("user-{}", Uuid::new_v4()),
            email: email.to_string(),
            name: name.trim().to_string(),
            is_demo: false,
        };
        info!(id = %user.id, "registered user");
        self.directory.push(user.clone());
        self.flags.user = Some(user);
        self.persist()?;
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.flags.user = None;
        self.flags.demo_mode = false;
        self.persist()
    }

    #[tracing::instrument(skip(self))]
    pub fn set_demo_mode(&mut self, enabled: bool) -> anyhow::Result<()> {
        self.flags.demo_mode = enabled;
        if enabled && self.flags.user.is_none() {
            self.flags.user = Some(User::demo());
        }
        self.persist()
    }

    pub fn teardown(self) -> anyhow::Result<()> {
        self.persist()
    }

    fn persist(&self) -> anyhow::Result<()> {
        self.store.save(&self.flags)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn fresh(dir: &Path) -> Session {
        Session::init(SessionStore::open(dir)).expect("init session")
    }

    #[test]
    fn empty_store_is_signed_out() {
        let temp = tempdir().expect("tempdir");
        let session = fresh(temp.path());
        assert!(session.user().is_none());
        assert!(!session.can_view_dashboard());
    }

    #[test]
    fn demo_credentials_enable_demo_mode_and_persist() {
        let temp = tempdir().expect("tempdir");
        let mut session = fresh(temp.path());
        assert!(session.login(DEMO_EMAIL, DEMO_PASSWORD).expect("login"));
        assert!(session.is_demo_mode());

        let reloaded = fresh(temp.path());
        assert_eq!(reloaded.user().map(|u| u.id.as_str()), Some(DEMO_USER_ID));
        assert!(reloaded.is_demo_mode());
    }

    #[test]
    fn known_email_skips_password_and_unknown_fails() {
        let temp = tempdir().expect("tempdir");
        let mut session = fresh(temp.path());
        assert!(!session.login("nobody@demo.fr", "x").expect("login"));
        assert!(session.login(DEMO_EMAIL, "wrong").expect("login"));
        assert!(!session.is_demo_mode());
        assert!(session.can_view_dashboard());
    }

    #[test]
    fn signup_rejects_existing_email_and_signs_in_new_user() {
        let temp = tempdir().expect("tempdir");
        let mut session = fresh(temp.path());
        assert!(!session.signup("John", DEMO_EMAIL, "pw").expect("signup"));

        assert!(session.signup("Ada", "ada@example.org", "pw").expect("signup"));
        let user = session.user().expect("signed in");
        assert!(user.id.starts_with("user-"));
        assert!(!user.is_demo);
        assert!(session.login("ada@example.org", "").expect("login"));
    }

    #[test]
    fn logout_clears_user_and_demo_mode() {
        let temp = tempdir().expect("tempdir");
        let mut session = fresh(temp.path());
        session.login(DEMO_EMAIL, DEMO_PASSWORD).expect("login");
        session.logout().expect("logout");
        session.teardown().expect("teardown");

        let flags = SessionStore::open(temp.path()).load().expect("load");
        assert_eq!(flags, SessionFlags::default());
    }

    #[test]
    fn stored_demo_mode_signs_in_demo_user() {
        let temp = tempdir().expect("tempdir");
        let store = SessionStore::open(temp.path());
        store
            .save(&SessionFlags {
                user: None,
                demo_mode: true,
            })
            .expect("save");

        let session = fresh(temp.path());
        assert_eq!(session.user(), Some(&User::demo()));
    }

    #[test]
    fn session_file_uses_camel_case_flags() {
        let temp = tempdir().expect("tempdir");
        let mut session = fresh(temp.path());
        session.set_demo_mode(true).expect("demo on");

        let raw = fs::read_to_string(temp.path().join(SESSION_FILE)).expect("read");
        assert!(raw.contains("\"demoMode\": true"));
        assert!(raw.contains("\"isDemo\": true"));
    }
}
