//! Interactive loop over several terminal sessions.
//!
//! Lines starting with `:` manage sessions; everything else is submitted to
//! the active session.

use codeshell_core::config::ShellConfig;
use codeshell_core::core::{
    AutocompleteResult, PersistenceStore, SessionManager, Workspace, autocomplete, get_hint,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const META_HELP: &str = "\
:new [name]     open a new session
:sessions       list sessions
:switch <n>     make session n active
:rename <name>  rename the active session
:close          close the active session
:complete <text> show completions for text
:quit           leave";

/// What the loop should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The active session streams output and wants to be driven
    Stream,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
enum Meta<'a> {
    New(Option<&'a str>),
    Sessions,
    Switch(&'a str),
    Rename(&'a str),
    Close,
    Complete(&'a str),
    Help,
    Quit,
    Unknown(&'a str),
}

impl<'a> Meta<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let rest = line.strip_prefix(':')?;
        let (name, arg) = match rest.split_once(' ') {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let meta = match name {
            "new" => Meta::New(Some(arg).filter(|a| !a.is_empty())),
            "sessions" | "ls" => Meta::Sessions,
            "switch" => Meta::Switch(arg),
            "rename" => Meta::Rename(arg),
            "close" => Meta::Close,
            "complete" => Meta::Complete(rest.get(name.len() + 1..).unwrap_or("")),
            "help" => Meta::Help,
            "quit" | "q" | "exit" => Meta::Quit,
            other => Meta::Unknown(other),
        };
        Some(meta)
    }
}

pub struct Repl<S> {
    manager: SessionManager,
    workspace: Workspace<S>,
    active: String,
}

impl<S: PersistenceStore> Repl<S> {
    /// Restore `session_ids` (or open one fresh session when empty).
    pub async fn start(
        config: ShellConfig,
        workspace: Workspace<S>,
        session_ids: Vec<String>,
    ) -> anyhow::Result<Self> {
        let mut manager = SessionManager::new(config);
        for (i, id) in session_ids.iter().enumerate() {
            let name = format!("Terminal {}", i + 1);
            manager
                .restore_session(id, &name, workspace.store())
                .await?;
        }
        let active = match manager.list_sessions().first() {
            Some(session) => session.id().to_string(),
            None => manager.create_session(None),
        };
        Ok(Self {
            manager,
            workspace,
            active,
        })
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn workspace(&self) -> &Workspace<S> {
        &self.workspace
    }

    pub fn active_id(&self) -> &str {
        &self.active
    }

    pub fn prompt(&self) -> String {
        match self.manager.get(&self.active) {
            Ok(session) => format!("[{}] {} ", session.name(), session.prompt()),
            Err(_) => "> ".to_string(),
        }
    }

    /// Handle one input line, pushing what should be printed to `out`.
    pub async fn handle_line(
        &mut self,
        line: &str,
        out: &mut Vec<String>,
    ) -> anyhow::Result<Flow> {
        if let Some(meta) = Meta::parse(line.trim_start()) {
            return self.handle_meta(meta, out).await;
        }

        let outcome = self
            .manager
            .submit(&self.active, &mut self.workspace, line)
            .await?;
        out.extend(outcome.output_lines);
        if outcome.error.is_some() {
            let session = self.manager.get(&self.active)?;
            if let Some(entry) = session.history().last() {
                out.push(entry.content.clone());
            }
        }
        Ok(if outcome.streaming {
            Flow::Stream
        } else {
            Flow::Continue
        })
    }

    async fn handle_meta(&mut self, meta: Meta<'_>, out: &mut Vec<String>) -> anyhow::Result<Flow> {
        match meta {
            Meta::New(name) => {
                self.active = self.manager.create_session(name);
                let session = self.manager.get(&self.active)?;
                out.push(format!("opened {}", session.name()));
                out.extend(session.history().iter().map(|e| e.content.clone()));
            }
            Meta::Sessions => {
                for (i, session) in self.manager.list_sessions().iter().enumerate() {
                    let marker = if session.id() == self.active { '*' } else { ' ' };
                    out.push(format!(
                        "{} {}  {}  {}",
                        marker,
                        i + 1,
                        session.name(),
                        session.current_dir()
                    ));
                }
            }
            Meta::Switch(arg) => {
                let index = arg.parse::<usize>().ok().filter(|n| *n >= 1);
                match index.and_then(|n| self.manager.list_sessions().get(n - 1)) {
                    Some(session) => {
                        self.active = session.id().to_string();
                        out.push(format!("switched to {}", session.name()));
                    }
                    None => out.push(format!(":switch: no session '{}'", arg)),
                }
            }
            Meta::Rename(name) if name.is_empty() => out.push(":rename: missing name".into()),
            Meta::Rename(name) => {
                self.manager.rename_session(&self.active, name)?;
            }
            Meta::Close => {
                let closing = self.active.clone();
                self.manager
                    .close_session(&closing, self.workspace.store())
                    .await?;
                self.active = match self.manager.list_sessions().last() {
                    Some(session) => session.id().to_string(),
                    None => self.manager.create_session(None),
                };
                let session = self.manager.get(&self.active)?;
                out.push(format!("now in {}", session.name()));
            }
            Meta::Complete(text) => {
                let session = self.manager.get(&self.active)?;
                let tree = self.workspace.tree();
                match autocomplete(text, session.current_dir(), tree) {
                    AutocompleteResult::Single(line) => out.push(line),
                    AutocompleteResult::Multiple(line, options) => {
                        out.push(line);
                        out.push(options.join("  "));
                    }
                    AutocompleteResult::None => {
                        if let Some(hint) = get_hint(text, session.current_dir(), tree) {
                            out.push(format!("{}{}", text, hint));
                        }
                    }
                }
            }
            Meta::Help => out.extend(META_HELP.lines().map(str::to_string)),
            Meta::Quit => return Ok(Flow::Quit),
            Meta::Unknown(name) => {
                out.push(format!("unknown meta-command ':{}' (try :help)", name))
            }
        }
        Ok(Flow::Continue)
    }

    /// Drive the active session's stream until it ends or Ctrl+C.
    pub async fn drive_active(&mut self) -> anyhow::Result<()> {
        let id = self.active.clone();
        let finished = tokio::select! {
            result = self.manager.drive(&id, |line| println!("{}", line)) => {
                result?;
                true
            }
            _ = tokio::signal::ctrl_c() => false,
        };
        if !finished {
            self.manager.interrupt(&id)?;
            println!("^C");
        }
        Ok(())
    }

    /// Read lines from stdin until EOF or `:quit`.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        let session = self.manager.get(&self.active)?;
        for entry in session.history().iter() {
            stdout.write_all(format!("{}\n", entry.content).as_bytes()).await?;
        }

        loop {
            stdout.write_all(self.prompt().as_bytes()).await?;
            stdout.flush().await?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let mut out = Vec::new();
            let flow = self.handle_line(&line, &mut out).await?;
            for text in out {
                stdout.write_all(format!("{}\n", text).as_bytes()).await?;
            }
            match flow {
                Flow::Continue => {}
                Flow::Stream => {
                    stdout.flush().await?;
                    self.drive_active().await?;
                }
                Flow::Quit => break,
            }
        }
        stdout.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeshell_core::core::MemoryStore;

    async fn repl() -> Repl<MemoryStore> {
        let workspace = Workspace::load_or_seed(MemoryStore::new()).await.unwrap();
        Repl::start(ShellConfig::default(), workspace, Vec::new())
            .await
            .unwrap()
    }

    async fn lines(repl: &mut Repl<MemoryStore>, line: &str) -> Vec<String> {
        let mut out = Vec::new();
        repl.handle_line(line, &mut out).await.unwrap();
        out
    }

    #[test]
    fn test_meta_parse() {
        assert_eq!(Meta::parse("ls"), None);
        assert_eq!(Meta::parse(":new build"), Some(Meta::New(Some("build"))));
        assert_eq!(Meta::parse(":new"), Some(Meta::New(None)));
        assert_eq!(Meta::parse(":switch 2"), Some(Meta::Switch("2")));
        assert_eq!(Meta::parse(":complete cd co"), Some(Meta::Complete("cd co")));
        assert_eq!(Meta::parse(":bogus"), Some(Meta::Unknown("bogus")));
    }

    #[tokio::test]
    async fn test_commands_and_errors() {
        let mut repl = repl().await;
        assert_eq!(lines(&mut repl, "pwd").await, vec!["/src"]);
        assert_eq!(
            lines(&mut repl, "cat nope.txt").await,
            vec!["cat: no such file or directory: /src/nope.txt"]
        );
    }

    #[tokio::test]
    async fn test_session_meta_commands() {
        let mut repl = repl().await;
        let first = repl.active_id().to_string();
        lines(&mut repl, ":new build").await;
        lines(&mut repl, "cd /").await;
        assert_eq!(repl.manager().len(), 2);

        let listing = lines(&mut repl, ":sessions").await;
        assert_eq!(listing, vec!["  1  Terminal 1  /src", "* 2  build  /"]);

        lines(&mut repl, ":switch 1").await;
        assert_eq!(repl.active_id(), first);
        lines(&mut repl, ":rename main").await;
        assert!(repl.prompt().starts_with("[main] developer:/src$"));

        lines(&mut repl, ":close").await;
        assert_eq!(repl.manager().len(), 1);
        assert!(repl.prompt().starts_with("[build]"));
        assert_eq!(
            lines(&mut repl, ":switch 9").await,
            vec![":switch: no session '9'"]
        );
    }

    #[tokio::test]
    async fn test_complete_meta() {
        let mut repl = repl().await;
        assert_eq!(lines(&mut repl, ":complete cat App").await, vec!["cat App.jsx "]);
        assert_eq!(lines(&mut repl, ":quit").await, Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_stream_flow() {
        let mut repl = repl().await;
        let mut out = Vec::new();
        let flow = repl.handle_line("npm start", &mut out).await.unwrap();
        assert_eq!(flow, Flow::Stream);
        let flow = repl.handle_line(":quit", &mut out).await.unwrap();
        assert_eq!(flow, Flow::Quit);
    }
}
