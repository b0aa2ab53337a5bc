use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Session, User};

const DEFAULT_EMAIL: &str = "user";

/// Small key-value store for the signed-in user, kept next to the config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub remember_me: bool,
    pub user_email: Option<String>,
    pub user_id: Option<i64>,
    pub user_image: Option<String>,
    pub session: Option<Session>,

    #[serde(skip)]
    path: PathBuf,
}

impl Preferences {
    pub fn load(path: &Path) -> Result<Self> {
        let mut prefs = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Preferences>(&content)?
        } else {
            Preferences::default()
        };
        prefs.path = path.to_path_buf();
        Ok(prefs)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// The profile as last remembered; falls back to id 0 and a placeholder email.
    pub fn profile(&self) -> User {
        User {
            id: self.user_id.unwrap_or(0),
            email: self
                .user_email
                .clone()
                .unwrap_or_else(|| DEFAULT_EMAIL.to_string()),
            image_url: self.user_image.clone().filter(|url| !url.is_empty()),
        }
    }

    pub fn remember_login(&mut self, session: Session, user: &User, remember_me: bool) {
        self.remember_me = remember_me;
        self.session = remember_me.then_some(session);
        self.set_user(user);
    }

    pub fn set_user(&mut self, user: &User) {
        self.user_id = Some(user.id);
        self.user_email = Some(user.email.clone());
        self.user_image = user.image_url.clone();
    }

    pub fn logout(&mut self) {
        self.remember_me = false;
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            access_token: "tok".to_string(),
            client: "cli".to_string(),
            uid: "me@example.com".to_string(),
        }
    }

    #[test]
    fn missing_file_gives_placeholder_profile() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load(&dir.path().join("prefs.toml")).unwrap();

        let profile = prefs.profile();
        assert_eq!(profile.id, 0);
        assert_eq!(profile.email, "user");
        assert_eq!(profile.image_url, None);
    }

    #[test]
    fn remembered_login_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.toml");
        let user = User {
            id: 7,
            email: "me@example.com".to_string(),
            image_url: Some("https://img.example/me.png".to_string()),
        };

        let mut prefs = Preferences::load(&path).unwrap();
        prefs.remember_login(session(), &user, true);
        prefs.save().unwrap();

        let reloaded = Preferences::load(&path).unwrap();
        assert!(reloaded.remember_me);
        assert_eq!(reloaded.session, Some(session()));
        assert_eq!(reloaded.profile(), user);
    }

    #[test]
    fn login_without_remember_me_keeps_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = Preferences::load(&dir.path().join("prefs.toml")).unwrap();
        let user = User {
            id: 1,
            email: "a@b.com".to_string(),
            image_url: None,
        };

        prefs.remember_login(session(), &user, false);
        assert!(prefs.session.is_none());
        assert_eq!(prefs.profile().email, "a@b.com");
    }

    #[test]
    fn logout_forgets_session_but_keeps_profile() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = Preferences::load(&dir.path().join("prefs.toml")).unwrap();
        let user = User {
            id: 1,
            email: "a@b.com".to_string(),
            image_url: Some(String::new()),
        };
        prefs.remember_login(session(), &user, true);

        prefs.logout();
        assert!(!prefs.remember_me);
        assert!(prefs.session.is_none());
        assert_eq!(prefs.profile().id, 1);
        // an empty stored URL counts as no avatar
        assert_eq!(prefs.profile().image_url, None);
    }
}
