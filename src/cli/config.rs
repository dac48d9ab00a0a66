use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER: &str = "http://localhost:3000";
const SESSION_FILE: &str = "session.json";

/// Session persisted between CLI invocations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub server: Option<String>,
    pub token: Option<String>,
    pub email: Option<String>,
    pub saved_at: Option<DateTime<Utc>>,
}

impl SessionConfig {
    pub fn signed_in(server: String, token: String, email: String) -> Self {
        Self {
            server: Some(server),
            token: Some(token),
            email: Some(email),
            saved_at: Some(Utc::now()),
        }
    }

    /// `--server` wins, then the server this session was saved for, then the default
    pub fn resolve_server(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.server.clone())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string())
    }

    /// Forget the token but keep the server
    pub fn signed_out(self) -> Self {
        Self {
            server: self.server,
            token: None,
            email: None,
            saved_at: Some(Utc::now()),
        }
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("JOURNAL_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("journal")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<SessionConfig> {
    load_session_from(&get_config_dir()?)
}

pub fn save_session(session: &SessionConfig) -> anyhow::Result<()> {
    save_session_to(&get_config_dir()?, session)
}

pub fn load_session_from(dir: &Path) -> anyhow::Result<SessionConfig> {
    let session_file = dir.join(SESSION_FILE);

    if !session_file.exists() {
        return Ok(SessionConfig::default());
    }

    let content = fs::read_to_string(session_file)?;
    let session: SessionConfig = serde_json::from_str(&content)?;
    Ok(session)
}

/// The file holds a bearer token, so on unix it is readable by the owner only
pub fn save_session_to(dir: &Path, session: &SessionConfig) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(session)?;
    let session_file = dir.join(SESSION_FILE);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&session_file)?;

    // `mode` only applies on create; tighten a file left by an older version
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("journal-cli-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_session_file_is_signed_out() {
        let dir = temp_dir();
        assert_eq!(load_session_from(&dir).unwrap(), SessionConfig::default());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn saved_session_loads_back() {
        let dir = temp_dir();
        let session = SessionConfig::signed_in(
            "http://journal.local:8080".into(),
            "tok".into(),
            "ada@example.com".into(),
        );
        save_session_to(&dir, &session).unwrap();
        assert_eq!(load_session_from(&dir).unwrap(), session);

        let out = session.signed_out();
        assert_eq!(out.server.as_deref(), Some("http://journal.local:8080"));
        assert!(out.token.is_none());
        fs::remove_dir_all(dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_dir();
        fs::write(dir.join(SESSION_FILE), "{}").unwrap();
        fs::set_permissions(dir.join(SESSION_FILE), fs::Permissions::from_mode(0o644)).unwrap();

        let session = SessionConfig::signed_in("http://h".into(), "tok".into(), "ada@example.com".into());
        save_session_to(&dir, &session).unwrap();

        let mode = fs::metadata(dir.join(SESSION_FILE)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(load_session_from(&dir).unwrap(), session);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn server_flag_overrides_saved_server() {
        let session = SessionConfig {
            server: Some("http://saved:1".into()),
            ..Default::default()
        };
        assert_eq!(session.resolve_server(Some("http://flag:2")), "http://flag:2");
        assert_eq!(session.resolve_server(None), "http://saved:1");
        assert_eq!(SessionConfig::default().resolve_server(None), DEFAULT_SERVER);
    }
}
