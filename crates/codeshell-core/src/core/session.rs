//! State of one terminal session.

use std::collections::VecDeque;
use std::time::Duration;

use crate::config::ShellConfig;
use crate::core::env::{self, Environment};
use crate::models::{ExecState, HistoryEntry, RecallDirection};
use crate::utils::BoundedLog;

/// Lines still to be emitted by a streaming command.
#[derive(Clone, Debug)]
struct StreamJob {
    lines: VecDeque<String>,
    interval: Duration,
}

/// One terminal: working directory, environment, history, recall log and
/// run state.
#[derive(Clone, Debug)]
pub struct TerminalSession {
    id: String,
    name: String,
    current_dir: String,
    env: Environment,
    history: BoundedLog<HistoryEntry>,
    /// Submitted lines, newest last
    command_log: BoundedLog<String>,
    /// Current position of arrow-key recall in `command_log`
    recall_index: Option<usize>,
    state: ExecState,
    active_command: Option<String>,
    stream: Option<StreamJob>,
    stream_interval: Duration,
}

impl TerminalSession {
    /// Create a session in the configured working directory with the
    /// welcome line as its only history entry.
    pub fn new(id: impl Into<String>, name: impl Into<String>, config: &ShellConfig) -> Self {
        let current_dir = config.default_cwd.clone();
        let mut history = BoundedLog::new(config.max_history.max(1));
        if !config.welcome.is_empty() {
            history.push(HistoryEntry::output(config.welcome.clone()));
        }
        Self {
            id: id.into(),
            name: name.into(),
            env: env::default_env(config, &current_dir),
            current_dir,
            history,
            command_log: BoundedLog::new(config.max_command_log.max(1)),
            recall_index: None,
            state: ExecState::Idle,
            active_command: None,
            stream: None,
            stream_interval: config.stream_interval(),
        }
    }

    /// Replace the recall log with previously persisted lines.
    pub fn with_command_log(mut self, log: Vec<String>) -> Self {
        let capacity = self.command_log.capacity();
        self.command_log = BoundedLog::from_vec(log, capacity);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn current_dir(&self) -> &str {
        &self.current_dir
    }

    /// Change directory and keep `$PWD` in sync.
    pub(crate) fn set_current_dir(&mut self, path: String) {
        self.env.insert("PWD".to_string(), path.clone());
        self.current_dir = path;
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub(crate) fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn history(&self) -> &BoundedLog<HistoryEntry> {
        &self.history
    }

    pub fn command_log(&self) -> &BoundedLog<String> {
        &self.command_log
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ExecState::Running
    }

    pub fn active_command(&self) -> Option<&str> {
        self.active_command.as_deref()
    }

    /// Prompt shown before the input line.
    pub fn prompt(&self) -> String {
        let user = self.env.get("USER").map(String::as_str).unwrap_or("user");
        format!("{}:{}$", user, self.current_dir)
    }

    // =========================================================================
    // History
    // =========================================================================

    pub(crate) fn push_entry(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    /// Empty the visible history and drop any streaming job.
    /// The recall log is kept.
    pub fn clear_history(&mut self) {
        self.history.clear();
        if self.stream.take().is_some() {
            self.finish(ExecState::Failed);
        }
    }

    /// Append a submitted line to the recall log, collapsing a repeat of the
    /// previous line. Resets the recall cursor.
    pub(crate) fn record_command(&mut self, line: &str) {
        self.recall_index = None;
        if self.command_log.last().map(String::as_str) != Some(line) {
            self.command_log.push(line.to_string());
        }
    }

    /// Move the recall cursor and return the line under it.
    ///
    /// `Up` walks toward the oldest line and stops there. `Down` walks back
    /// toward the newest and past it returns `None` (empty input).
    pub fn recall(&mut self, direction: RecallDirection) -> Option<String> {
        if self.command_log.is_empty() {
            return None;
        }
        let last = self.command_log.len() - 1;
        let next = match (self.recall_index, direction) {
            (None, RecallDirection::Up) => Some(last),
            (Some(i), RecallDirection::Up) => Some(i.saturating_sub(1)),
            (Some(i), RecallDirection::Down) if i < last => Some(i + 1),
            (_, RecallDirection::Down) => None,
        };
        self.recall_index = next;
        next.and_then(|i| self.command_log.get(i).cloned())
    }

    // =========================================================================
    // Run State
    // =========================================================================

    pub(crate) fn begin(&mut self, command: &str) {
        self.state = ExecState::Running;
        self.active_command = Some(command.to_string());
    }

    pub(crate) fn finish(&mut self, state: ExecState) {
        self.state = state;
        self.active_command = None;
    }

    /// Keep the session `Running` and emit `lines` one per tick.
    pub(crate) fn start_stream(&mut self, lines: Vec<String>) {
        self.stream = Some(StreamJob {
            lines: lines.into(),
            interval: self.stream_interval,
        });
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Delay the host should wait before the next [`tick`](Self::tick).
    pub fn stream_interval(&self) -> Option<Duration> {
        self.stream.as_ref().map(|job| job.interval)
    }

    /// Emit the next streamed line into history. The job finishes (state
    /// `Succeeded`) once the last line is out.
    pub fn tick(&mut self) -> Option<String> {
        let job = self.stream.as_mut()?;
        let line = job.lines.pop_front();
        let drained = job.lines.is_empty();
        if let Some(line) = &line {
            self.history.push(HistoryEntry::output(line.clone()));
        }
        if drained {
            self.stream = None;
            self.finish(ExecState::Succeeded);
        }
        line
    }

    /// Cancel a running job. Returns whether anything was running.
    pub fn interrupt(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.stream = None;
        self.history.push(HistoryEntry::output("^C"));
        self.finish(ExecState::Failed);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;

    fn session() -> TerminalSession {
        TerminalSession::new("t1", "Terminal 1", &ShellConfig::default())
    }

    #[test]
    fn test_new_session() {
        let s = session();
        assert_eq!(s.current_dir(), "/src");
        assert_eq!(s.env()["PWD"], "/src");
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history().get(0).unwrap().kind, EntryKind::Output);
        assert_eq!(s.state(), ExecState::Idle);
        assert_eq!(s.prompt(), "developer:/src$");
    }

    #[test]
    fn test_record_collapses_repeats() {
        let mut s = session();
        s.record_command("ls");
        s.record_command("ls");
        s.record_command("pwd");
        s.record_command("ls");
        assert_eq!(s.command_log().to_vec(), vec!["ls", "pwd", "ls"]);
    }

    #[test]
    fn test_command_log_capped() {
        let mut s = session();
        for i in 0..60 {
            s.record_command(&format!("echo {}", i));
        }
        assert_eq!(s.command_log().len(), 50);
        assert_eq!(s.command_log().get(0).unwrap(), "echo 10");
    }

    #[test]
    fn test_recall_walks_log() {
        let mut s = session().with_command_log(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(s.recall(RecallDirection::Up).as_deref(), Some("c"));
        assert_eq!(s.recall(RecallDirection::Up).as_deref(), Some("b"));
        assert_eq!(s.recall(RecallDirection::Up).as_deref(), Some("a"));
        assert_eq!(s.recall(RecallDirection::Up).as_deref(), Some("a"));
        assert_eq!(s.recall(RecallDirection::Down).as_deref(), Some("b"));
        assert_eq!(s.recall(RecallDirection::Down).as_deref(), Some("c"));
        assert_eq!(s.recall(RecallDirection::Down), None);
        assert_eq!(s.recall(RecallDirection::Down), None);
        assert_eq!(s.command_log().to_vec(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_recall_empty_log() {
        let mut s = session();
        assert_eq!(s.recall(RecallDirection::Up), None);
        assert_eq!(s.recall(RecallDirection::Down), None);
    }

    #[test]
    fn test_stream_ticks_until_drained() {
        let mut s = session();
        s.begin("npm start");
        s.start_stream(vec!["one".into(), "two".into()]);
        assert!(s.is_running());
        assert_eq!(s.stream_interval(), Some(Duration::from_millis(250)));

        assert_eq!(s.tick().as_deref(), Some("one"));
        assert!(s.is_running());
        assert_eq!(s.tick().as_deref(), Some("two"));
        assert_eq!(s.state(), ExecState::Succeeded);
        assert_eq!(s.active_command(), None);
        assert_eq!(s.tick(), None);
    }

    #[test]
    fn test_interrupt() {
        let mut s = session();
        assert!(!s.interrupt());
        s.begin("npm start");
        s.start_stream(vec!["one".into()]);
        assert!(s.interrupt());
        assert_eq!(s.state(), ExecState::Failed);
        assert!(!s.is_streaming());
        assert_eq!(s.history().last().unwrap().content, "^C");
        assert_eq!(s.tick(), None);
    }

    #[test]
    fn test_clear_keeps_command_log() {
        let mut s = session();
        s.record_command("ls");
        s.begin("npm start");
        s.start_stream(vec!["one".into()]);
        s.clear_history();
        assert!(s.history().is_empty());
        assert!(!s.is_running());
        assert_eq!(s.command_log().len(), 1);
    }
}
