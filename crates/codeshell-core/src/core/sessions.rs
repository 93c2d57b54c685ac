//! Set of open terminal sessions.

use crate::config::ShellConfig;
use crate::core::commands::{ExecOutcome, execute};
use crate::core::error::{ShellError, ShellResult};
use crate::core::session::TerminalSession;
use crate::core::store::PersistenceStore;
use crate::core::workspace::Workspace;
use crate::models::{RecallDirection, new_id};

/// Owns independent sessions in creation order.
#[derive(Debug, Default)]
pub struct SessionManager {
    config: ShellConfig,
    sessions: Vec<TerminalSession>,
    /// Number used for the next default `Terminal N` name
    counter: usize,
}

impl SessionManager {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config,
            sessions: Vec::new(),
            counter: 0,
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Open a fresh session and return its id.
    pub fn create_session(&mut self, name: Option<&str>) -> String {
        let name = self.next_name(name);
        let session = TerminalSession::new(new_id(), name, &self.config);
        let id = session.id().to_string();
        tracing::info!(session = %id, name = %session.name(), "session created");
        self.sessions.push(session);
        id
    }

    /// Reopen session `id` with its persisted command log.
    ///
    /// A session with that id already open is returned as is.
    pub async fn restore_session<S: PersistenceStore>(
        &mut self,
        id: &str,
        name: &str,
        store: &S,
    ) -> ShellResult<&mut TerminalSession> {
        if let Some(index) = self.position(id) {
            return Ok(&mut self.sessions[index]);
        }
        let log = store.load_command_log(id).await?;
        self.counter += 1;
        tracing::info!(session = %id, entries = log.len(), "session restored");
        self.sessions
            .push(TerminalSession::new(id, name, &self.config).with_command_log(log));
        let last = self.sessions.len() - 1;
        Ok(&mut self.sessions[last])
    }

    /// Close session `id`, dropping any streaming job and purging its
    /// persisted command log.
    ///
    /// The session stays open when the purge fails.
    pub async fn close_session<S: PersistenceStore>(
        &mut self,
        id: &str,
        store: &S,
    ) -> ShellResult<()> {
        let index = self
            .position(id)
            .ok_or_else(|| ShellError::SessionNotFound(id.to_string()))?;
        if let Err(e) = store.delete_command_log(id).await {
            tracing::warn!(session = %id, error = %e, "failed to purge command log");
            return Err(e.into());
        }
        let mut session = self.sessions.remove(index);
        session.interrupt();
        tracing::info!(session = %id, "session closed");
        Ok(())
    }

    pub fn rename_session(&mut self, id: &str, name: &str) -> ShellResult<()> {
        let session = self.get_mut(id)?;
        session.set_name(name);
        Ok(())
    }

    /// Open sessions in creation order.
    pub fn list_sessions(&self) -> &[TerminalSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &str) -> ShellResult<&TerminalSession> {
        self.sessions
            .iter()
            .find(|s| s.id() == id)
            .ok_or_else(|| ShellError::SessionNotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> ShellResult<&mut TerminalSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| ShellError::SessionNotFound(id.to_string()))
    }

    /// Arrow-key recall in session `id`.
    pub fn recall(&mut self, id: &str, direction: RecallDirection) -> ShellResult<Option<String>> {
        Ok(self.get_mut(id)?.recall(direction))
    }

    /// Execute `line` in session `id`.
    pub async fn submit<S: PersistenceStore>(
        &mut self,
        id: &str,
        workspace: &mut Workspace<S>,
        line: &str,
    ) -> ShellResult<ExecOutcome> {
        let session = self.get_mut(id)?;
        Ok(execute(session, workspace, line).await)
    }

    /// Emit the next streamed line of session `id`, if any.
    pub fn tick(&mut self, id: &str) -> ShellResult<Option<String>> {
        Ok(self.get_mut(id)?.tick())
    }

    /// Run the streaming job of session `id` to completion, sleeping the
    /// configured interval before each line.
    pub async fn drive(&mut self, id: &str, mut on_line: impl FnMut(&str)) -> ShellResult<()> {
        loop {
            let Some(interval) = self.get(id)?.stream_interval() else {
                return Ok(());
            };
            tokio::time::sleep(interval).await;
            if let Some(line) = self.tick(id)? {
                on_line(&line);
            }
        }
    }

    /// Cancel the running job of session `id`.
    pub fn interrupt(&mut self, id: &str) -> ShellResult<bool> {
        let interrupted = self.get_mut(id)?.interrupt();
        if interrupted {
            tracing::debug!(session = %id, "interrupted");
        }
        Ok(interrupted)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id() == id)
    }

    fn next_name(&mut self, name: Option<&str>) -> String {
        self.counter += 1;
        match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Terminal {}", self.counter),
        }
    }
}
