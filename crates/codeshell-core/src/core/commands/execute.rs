//! Command execution against a session and a workspace.

use chrono::Local;

use super::filters;
use super::{Command, CommandResult, ExecOutcome, PathArg};
use crate::config::{DEFAULT_HOME, GIT_STATUS_TEXT, HELP_TEXT, NPM_START_BANNER};
use crate::core::env;
use crate::core::error::{ShellError, ShellResult};
use crate::core::parser::{ParsedCommand, parse_with_env};
use crate::core::path;
use crate::core::session::TerminalSession;
use crate::core::store::PersistenceStore;
use crate::core::workspace::Workspace;
use crate::models::{ExecState, HistoryEntry, NodeType};

/// A failure together with the command that produced it.
struct StageError {
    command: String,
    error: ShellError,
}

impl StageError {
    fn new(stage: &ParsedCommand, error: ShellError) -> Self {
        Self {
            command: stage.command.to_lowercase(),
            error,
        }
    }

    /// Terminal text: `cmd: message`, unless the message names its origin.
    fn render(&self) -> String {
        if self.command.is_empty() || self.error.is_self_describing() {
            self.error.to_string()
        } else {
            format!("{}: {}", self.command, self.error)
        }
    }
}

/// Execute one command line in `session`.
///
/// The line is echoed into history and appended to the recall log, then
/// parsed with the session environment and run stage by stage. Output and
/// errors are appended to history; nothing is returned as `Err`.
///
/// A session that is still streaming rejects the line with `Busy` and only
/// records the error.
pub async fn execute<S: PersistenceStore>(
    session: &mut TerminalSession,
    workspace: &mut Workspace<S>,
    line: &str,
) -> ExecOutcome {
    let line = line.trim();
    if line.is_empty() {
        return ExecOutcome::default();
    }

    if session.is_running() {
        let error = ShellError::Busy {
            active: session.active_command().unwrap_or_default().to_string(),
        };
        session.push_entry(HistoryEntry::error(error.to_string()));
        return ExecOutcome::failed(error.kind());
    }

    session.push_entry(HistoryEntry::command(line));
    session.record_command(line);
    persist_command_log(session, workspace.store()).await;

    tracing::debug!(session = %session.id(), command = %line, "executing");
    session.begin(line);

    let result = match parse_with_env(line, session.env()) {
        Ok(parsed) => run_chain(&parsed, session, workspace).await,
        Err(e) => Err(StageError {
            command: String::new(),
            error: e.into(),
        }),
    };

    match result {
        Ok(result) => {
            for output in &result.output {
                session.push_entry(HistoryEntry::output(output.clone()));
            }
            let streaming = match result.stream {
                Some(lines) if !lines.is_empty() => {
                    session.start_stream(lines);
                    true
                }
                _ => {
                    session.finish(ExecState::Succeeded);
                    false
                }
            };
            ExecOutcome {
                output_lines: result.output,
                error: None,
                streaming,
            }
        }
        Err(failure) => {
            let message = failure.render();
            tracing::debug!(session = %session.id(), error = %message, "command failed");
            session.push_entry(HistoryEntry::error(message));
            session.finish(ExecState::Failed);
            ExecOutcome::failed(failure.error.kind())
        }
    }
}

async fn persist_command_log<S: PersistenceStore>(session: &TerminalSession, store: &S) {
    let log = session.command_log().to_vec();
    if let Err(e) = store.save_command_log(session.id(), &log).await {
        tracing::warn!(session = %session.id(), error = %e, "failed to persist command log");
    }
}

/// Run every stage of a pipe chain, left to right.
///
/// Each stage's output text is the next stage's piped input. A stage with a
/// redirect writes its output and passes nothing on. Streaming output is
/// only kept for a lone, unredirected command.
async fn run_chain<S: PersistenceStore>(
    parsed: &ParsedCommand,
    session: &mut TerminalSession,
    workspace: &mut Workspace<S>,
) -> Result<CommandResult, StageError> {
    let stages: Vec<&ParsedCommand> = parsed.stages().collect();
    let single = stages.len() == 1;
    let mut input: Option<String> = None;
    let mut last = CommandResult::empty();

    for stage in stages {
        let command =
            Command::parse(&stage.command, &stage.args).map_err(|e| StageError::new(stage, e))?;
        let mut result = run_command(command, session, workspace, input.as_deref())
            .await
            .map_err(|e| StageError::new(stage, e))?;

        if !single {
            if let Some(lines) = result.stream.take() {
                result.output = lines;
            }
        }

        if let Some(redirect) = &stage.redirect {
            let write = async {
                let target = resolve_arg(session, &redirect.target)?;
                workspace
                    .write_file(&target, &result.text(), redirect.mode)
                    .await
            };
            write.await.map_err(|e| StageError::new(stage, e))?;
            result = CommandResult::empty();
        }

        input = Some(result.text());
        last = result;
    }

    Ok(last)
}

async fn run_command<S: PersistenceStore>(
    command: Command,
    session: &mut TerminalSession,
    workspace: &mut Workspace<S>,
    input: Option<&str>,
) -> ShellResult<CommandResult> {
    match command {
        Command::Help => Ok(lines_of(HELP_TEXT)),
        Command::Clear => {
            session.clear_history();
            Ok(CommandResult::empty())
        }
        Command::Ls(dir) => {
            let target = match dir {
                Some(dir) => resolve_arg(session, dir.as_str())?,
                None => session.current_dir().to_string(),
            };
            let names = workspace
                .tree()
                .children_of(&target)?
                .iter()
                .map(|node| node.name.clone())
                .collect();
            Ok(CommandResult::output(names))
        }
        Command::Pwd => Ok(CommandResult::line(session.current_dir())),
        Command::Echo(text) => Ok(CommandResult::line(text)),
        Command::Date => Ok(CommandResult::line(
            Local::now().format("%a %b %e %H:%M:%S %Y").to_string(),
        )),
        Command::Mkdir { paths, parents } => {
            for dir in &paths {
                let target = resolve_arg(session, dir.as_str())?;
                if parents {
                    create_parents(workspace, &target).await?;
                } else {
                    create(workspace, &target, NodeType::Folder).await?;
                }
            }
            Ok(CommandResult::empty())
        }
        Command::Touch(paths) => {
            for file in &paths {
                let target = resolve_arg(session, file.as_str())?;
                create(workspace, &target, NodeType::File).await?;
            }
            Ok(CommandResult::empty())
        }
        Command::Cd(dir) => {
            let target = match dir {
                Some(dir) => resolve_arg(session, dir.as_str())?,
                None => home(session),
            };
            let tree = workspace.tree();
            if !tree.exists(&target) {
                return Err(ShellError::PathNotFound(target));
            }
            if !tree.is_folder(&target) {
                return Err(ShellError::NotADirectory(target));
            }
            session.set_current_dir(target);
            Ok(CommandResult::empty())
        }
        Command::Rm { paths, recursive } => {
            for target in &paths {
                let target = resolve_arg(session, target.as_str())?;
                workspace.remove_node(&target, recursive).await?;
            }
            Ok(CommandResult::empty())
        }
        Command::Mv {
            sources,
            destination,
        } => {
            let destination = resolve_destination(session, workspace, &sources, &destination)?;
            for source in &sources {
                let source = resolve_arg(session, source.as_str())?;
                if workspace.tree().is_folder(&destination) {
                    workspace.move_node(&source, &destination).await?;
                } else {
                    workspace.relocate_node(&source, &destination).await?;
                }
            }
            Ok(CommandResult::empty())
        }
        Command::Cp {
            sources,
            destination,
        } => {
            let destination = resolve_destination(session, workspace, &sources, &destination)?;
            for source in &sources {
                let source = resolve_arg(session, source.as_str())?;
                if workspace.tree().is_folder(&destination) {
                    workspace.copy_node(&source, &destination).await?;
                } else {
                    workspace.copy_to(&source, &destination).await?;
                }
            }
            Ok(CommandResult::empty())
        }
        Command::Cat(file) => {
            let text = read_source(session, workspace, file.as_ref(), input, "cat")?;
            Ok(lines_of(&text))
        }
        Command::Grep {
            pattern,
            file,
            ignore_case,
        } => {
            let regex = filters::compile_pattern(&pattern, ignore_case)?;
            let text = read_source(session, workspace, file.as_ref(), input, "grep")?;
            Ok(CommandResult::output(filters::grep(&regex, &text)))
        }
        Command::Head { lines, file } => {
            let text = read_source(session, workspace, file.as_ref(), input, "head")?;
            Ok(CommandResult::output(filters::head(&text, lines)))
        }
        Command::Tail { lines, file } => {
            let text = read_source(session, workspace, file.as_ref(), input, "tail")?;
            Ok(CommandResult::output(filters::tail(&text, lines)))
        }
        Command::Wc(file) => {
            let text = read_source(session, workspace, file.as_ref(), input, "wc")?;
            let (lines, words, bytes) = filters::word_count(&text);
            let line = match &file {
                Some(file) => format!("{} {} {} {}", lines, words, bytes, file),
                None => format!("{} {} {}", lines, words, bytes),
            };
            Ok(CommandResult::line(line))
        }
        Command::Export(operands) => {
            if operands.is_empty() {
                return Ok(CommandResult::output(env::format_export_output(session.env())));
            }
            for operand in &operands {
                let (name, value) = env::parse_assignment(operand, session.env())?;
                session.env_mut().insert(name, value);
            }
            Ok(CommandResult::empty())
        }
        Command::Unset(names) => {
            for name in &names {
                if !env::is_valid_var_name(name) {
                    return Err(ShellError::InvalidVariableName(name.clone()));
                }
                session.env_mut().remove(name);
            }
            Ok(CommandResult::empty())
        }
        Command::Env => Ok(CommandResult::output(env::format_env_output(session.env()))),
        Command::History => {
            let lines = session
                .command_log()
                .iter()
                .enumerate()
                .map(|(i, line)| format!("{:>4}  {}", i + 1, line))
                .collect();
            Ok(CommandResult::output(lines))
        }
        Command::NpmStart => Ok(CommandResult::stream(
            NPM_START_BANNER.lines().map(str::to_string).collect(),
        )),
        Command::GitStatus => Ok(lines_of(GIT_STATUS_TEXT)),
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn lines_of(text: &str) -> CommandResult {
    CommandResult::output(text.lines().map(str::to_string).collect())
}

fn home(session: &TerminalSession) -> String {
    session
        .env()
        .get("HOME")
        .cloned()
        .unwrap_or_else(|| DEFAULT_HOME.to_string())
}

/// Resolve a path operand against the session: `~` expansion, then the
/// working directory.
fn resolve_arg(session: &TerminalSession, arg: &str) -> ShellResult<String> {
    let expanded = if arg == "~" {
        home(session)
    } else if let Some(rest) = arg.strip_prefix("~/") {
        path::join(&home(session), rest)
    } else {
        arg.to_string()
    };
    if !path::is_supported(&expanded) {
        return Err(ShellError::UnsupportedPath(arg.to_string()));
    }
    Ok(path::resolve(session.current_dir(), &expanded))
}

/// Resolve the `mv`/`cp` destination. Several sources need a folder.
fn resolve_destination<S: PersistenceStore>(
    session: &TerminalSession,
    workspace: &Workspace<S>,
    sources: &[PathArg],
    destination: &PathArg,
) -> ShellResult<String> {
    let destination = resolve_arg(session, destination.as_str())?;
    if sources.len() > 1 && !workspace.tree().is_folder(&destination) {
        return Err(ShellError::NotADirectory(destination));
    }
    Ok(destination)
}

async fn create<S: PersistenceStore>(
    workspace: &mut Workspace<S>,
    target: &str,
    node_type: NodeType,
) -> ShellResult<String> {
    let parent = path::parent(target);
    workspace
        .create_node(&parent, path::file_name(target), node_type)
        .await
}

/// `mkdir -p`: create every missing folder on the way to `target`.
async fn create_parents<S: PersistenceStore>(
    workspace: &mut Workspace<S>,
    target: &str,
) -> ShellResult<()> {
    let mut current = path::ROOT.to_string();
    for segment in target.split('/').filter(|s| !s.is_empty()) {
        let next = path::join(&current, segment);
        if !workspace.tree().exists(&next) {
            workspace
                .create_node(&current, segment, NodeType::Folder)
                .await?;
        } else if !workspace.tree().is_folder(&next) {
            return Err(ShellError::NotADirectory(next));
        }
        current = next;
    }
    Ok(())
}

/// Text a filter reads: the file operand if given, else the piped input.
fn read_source<S: PersistenceStore>(
    session: &TerminalSession,
    workspace: &Workspace<S>,
    file: Option<&PathArg>,
    input: Option<&str>,
    command: &'static str,
) -> ShellResult<String> {
    match (file, input) {
        (Some(file), _) => {
            let target = resolve_arg(session, file.as_str())?;
            let node = workspace
                .tree()
                .lookup(&target)
                .ok_or_else(|| ShellError::PathNotFound(target.clone()))?;
            node.content()
                .map(str::to_string)
                .ok_or(ShellError::NotAFile(target))
        }
        (None, Some(input)) => Ok(input.to_string()),
        (None, None) => Err(ShellError::MissingArgument {
            command,
            operand: "file",
        }),
    }
}
