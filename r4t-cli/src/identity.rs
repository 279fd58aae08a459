use anyhow::{Context, Result};
use log::debug;

use r4t_core::{DatabaseBackend, IdentityProvider, Session, User};

/// The user the CLI acts as, looked up in the store's user table
pub struct CliIdentity {
    user: Option<User>,
}

impl CliIdentity {
    /// Resolves `login` (email or UUID). No login means an anonymous session,
    /// which the guard denies everything.
    pub fn resolve(backend: &dyn DatabaseBackend, login: Option<&str>) -> Result<Self> {
        let user = match login {
            Some(login) => {
                let user = backend
                    .find_user(login)?
                    .with_context(|| format!("Unknown user '{}'. Add one with 'r4t user add'", login))?;
                debug!("acting as {} ({})", user.email, user.role.as_str());
                Some(user)
            }
            None => None,
        };
        Ok(Self { user })
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

impl IdentityProvider for CliIdentity {
    fn current_session(&self) -> Option<Session> {
        self.user.as_ref().map(Session::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use r4t_core::db::YamlBackend;
    use r4t_core::Role;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_by_email_and_id() {
        let temp_dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(temp_dir.path().join("requirements.yaml"));
        let user = backend
            .add_user(User::new("Grace Hopper", "grace@example.com", Role::TestManager))
            .unwrap();

        let by_email = CliIdentity::resolve(&backend, Some("Grace@Example.com")).unwrap();
        assert_eq!(by_email.current_role(), Some(Role::TestManager));

        let by_id = CliIdentity::resolve(&backend, Some(&user.id.to_string())).unwrap();
        assert_eq!(by_id.current_session().map(|s| s.user_id), Some(user.id));
    }

    #[test]
    fn test_missing_login_is_anonymous() {
        let temp_dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(temp_dir.path().join("requirements.yaml"));

        let anonymous = CliIdentity::resolve(&backend, None).unwrap();
        assert!(anonymous.current_session().is_none());
        assert!(CliIdentity::resolve(&backend, Some("nobody@example.com")).is_err());
    }
}
