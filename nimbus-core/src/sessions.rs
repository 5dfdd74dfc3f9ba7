//! Ephemeral remote-command sessions.
//!
//! Sessions are an in-process transport concern: they are keyed by opaque
//! ids, never reused, and deliberately not foreign-keyed to the instance
//! lifecycle. Command output is produced by an ordered substring-rule table
//! so the simulated terminal is trivially extensible.

use chrono::Utc;
use nimbus_common::{CommandSession, NimbusError, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Ordered (substring, canned output) rules, evaluated top to bottom. The
/// first match wins; an unmatched command is echoed back verbatim.
const COMMAND_RULES: &[(&str, &str)] = &[
    (
        "ls",
        "total 32\n\
         drwxr-xr-x 5 admin admin 4096 Jan 14 09:21 .\n\
         drwxr-xr-x 3 root  root  4096 Jan 12 18:02 ..\n\
         -rw-r--r-- 1 admin admin  220 Jan 12 18:02 .bash_logout\n\
         -rw-r--r-- 1 admin admin 3771 Jan 12 18:02 .bashrc\n\
         drwxr-xr-x 2 admin admin 4096 Jan 14 09:21 app\n\
         drwxr-xr-x 2 admin admin 4096 Jan 13 11:47 logs\n\
         -rw-r--r-- 1 admin admin  807 Jan 12 18:02 .profile",
    ),
    (
        "ps",
        "  PID TTY          TIME CMD\n\
         \x20   1 ?        00:00:04 systemd\n\
         \x20 412 ?        00:01:13 node\n\
         \x20 413 ?        00:00:38 nginx\n\
         \x20 981 pts/0    00:00:00 bash\n\
         \x20 997 pts/0    00:00:00 ps",
    ),
    (
        "df",
        "Filesystem     1K-blocks    Used Available Use% Mounted on\n\
         /dev/root       20508240 6911272  13580584  34% /\n\
         tmpfs            2017780       0   2017780   0% /dev/shm\n\
         /dev/sda15        106858    6186    100673   6% /boot/efi",
    ),
    (
        "free",
        "               total        used        free      shared  buff/cache   available\n\
         Mem:         4035560     1422184      981040        1104     1632336     2342876\n\
         Swap:              0           0           0",
    ),
    (
        "uptime",
        " 09:21:44 up 2 days,  3:14,  1 user,  load average: 0.18, 0.24, 0.21",
    ),
    ("whoami", "admin"),
    ("uname", "Linux nimbus 6.1.0-18-cloud-amd64 x86_64 GNU/Linux"),
];

/// Render the canned output for a command, falling through to an echo of the
/// command itself.
pub fn render_output(command: &str) -> String {
    for (needle, output) in COMMAND_RULES {
        if command.contains(needle) {
            return (*output).to_string();
        }
    }
    command.to_string()
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, CommandSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session against an instance. Ids are opaque and never reused.
    pub async fn connect(&self, instance_id: &str) -> CommandSession {
        let session = CommandSession {
            session_id: format!("sess-{}", Uuid::new_v4()),
            instance_id: instance_id.to_string(),
            opened_at: Utc::now(),
            commands_run: 0,
        };
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session.clone());
        session
    }

    /// Run a command in an open session and return its simulated output.
    pub async fn exec(&self, session_id: &str, command: &str) -> Result<String> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| NimbusError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        session.commands_run += 1;
        Ok(render_output(command))
    }

    /// Discard a session. Discarding an unknown id is a no-op; returns
    /// whether a session was actually removed.
    pub async fn disconnect(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn get(&self, session_id: &str) -> Option<CommandSession> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_command_renders_multi_line_output() {
        let output = render_output("ls -la");
        assert!(output.lines().count() > 1);
        assert!(output.contains(".bashrc"));
    }

    #[test]
    fn process_and_disk_commands_match_rules() {
        assert!(render_output("ps aux").contains("PID"));
        assert!(render_output("df -h").contains("Filesystem"));
        assert!(render_output("free -m").contains("Mem:"));
    }

    #[test]
    fn unmatched_command_is_echoed_verbatim() {
        assert_eq!(render_output("unknown_cmd --flag"), "unknown_cmd --flag");
    }

    #[tokio::test]
    async fn exec_requires_a_known_session() {
        let registry = SessionRegistry::new();
        let err = registry.exec("sess-missing", "ls").await.unwrap_err();
        assert!(matches!(err, NimbusError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn connect_exec_disconnect_lifecycle() {
        let registry = SessionRegistry::new();
        let session = registry.connect("inst-1").await;
        assert!(session.session_id.starts_with("sess-"));

        let output = registry.exec(&session.session_id, "whoami").await.unwrap();
        assert_eq!(output, "admin");

        let tracked = registry.get(&session.session_id).await.unwrap();
        assert_eq!(tracked.commands_run, 1);

        assert!(registry.disconnect(&session.session_id).await);
        assert!(!registry.disconnect(&session.session_id).await);
        let err = registry.exec(&session.session_id, "ls").await.unwrap_err();
        assert!(matches!(err, NimbusError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn session_ids_are_unique() {
        let registry = SessionRegistry::new();
        let a = registry.connect("inst-1").await;
        let b = registry.connect("inst-1").await;
        assert_ne!(a.session_id, b.session_id);
    }
}
