//! Tab autocomplete for command names and tree paths.
//!
//! The word under the cursor (the last word of the input) is completed:
//! - the first word against the command names
//! - later words against the children of the folder they point into
//!
//! The autocomplete system supports:
//! - Single match: Complete immediately
//! - Multiple matches: Show common prefix and all options
//! - Ghost text hints while typing

use crate::core::commands::Command;
use crate::core::filesystem::VirtualFileTree;
use crate::core::path::{self, ROOT};

// ============================================================================
// Public Types
// ============================================================================

/// Result of an autocomplete attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AutocompleteResult {
    /// Single match: the full replacement input line.
    Single(String),
    /// Multiple matches: (input extended to the common prefix, display names).
    Multiple(String, Vec<String>),
    /// No matches found.
    None,
}

// ============================================================================
// Configuration
// ============================================================================

/// Commands whose operands are folders.
const DIR_COMMANDS: &[&str] = &["cd", "ls", "mkdir"];

/// Commands whose operands are files or folders.
const PATH_COMMANDS: &[&str] = &[
    "cat", "cp", "grep", "head", "mv", "rm", "tail", "touch", "wc",
];

// ============================================================================
// Completion Context
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompletionMode {
    Command,
    DirectoryPath,
    AnyPath,
    None,
}

/// Input split around the word being completed.
struct Context<'a> {
    mode: CompletionMode,
    /// Everything before the word, including the separating space
    head: &'a str,
    word: &'a str,
}

impl<'a> Context<'a> {
    fn from_input(input: &'a str) -> Self {
        let Some(idx) = input.rfind(' ') else {
            return Self {
                mode: CompletionMode::Command,
                head: "",
                word: input,
            };
        };
        let (head, word) = (&input[..=idx], &input[idx + 1..]);
        let command = input.split_whitespace().next().unwrap_or("").to_lowercase();
        let mode = if DIR_COMMANDS.contains(&command.as_str()) {
            CompletionMode::DirectoryPath
        } else if PATH_COMMANDS.contains(&command.as_str()) {
            CompletionMode::AnyPath
        } else {
            CompletionMode::None
        };
        Self { mode, head, word }
    }
}

// ============================================================================
// Path Parsing
// ============================================================================

/// Partial path split into the folder to search and the name being typed.
struct ParsedPath<'a> {
    /// Directory prefix as typed (e.g., "components/" or "")
    dir_part: &'a str,
    name_part: &'a str,
    search_dir: String,
}

impl<'a> ParsedPath<'a> {
    fn parse(partial: &'a str, cwd: &str) -> Option<Self> {
        let (dir_part, name_part) = match partial.rfind('/') {
            Some(idx) => (&partial[..=idx], &partial[idx + 1..]),
            None => ("", partial),
        };

        let search_dir = if dir_part.is_empty() {
            cwd.to_string()
        } else {
            let dir = dir_part.trim_end_matches('/');
            if dir.is_empty() {
                ROOT.to_string()
            } else if path::is_supported(dir) {
                path::resolve(cwd, dir)
            } else {
                return None;
            }
        };

        Some(Self {
            dir_part,
            name_part,
            search_dir,
        })
    }

    /// Children of the search folder matching the typed name.
    fn matches(&self, tree: &VirtualFileTree, dirs_only: bool) -> Vec<(String, bool)> {
        let Ok(children) = tree.children_of(&self.search_dir) else {
            return Vec::new();
        };
        let name_lower = self.name_part.to_lowercase();
        children
            .iter()
            .filter(|node| !dirs_only || node.is_folder())
            .filter(|node| node.name.to_lowercase().starts_with(&name_lower))
            .map(|node| (node.name.clone(), node.is_folder()))
            .collect()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Perform autocomplete on Tab press.
pub fn autocomplete(input: &str, cwd: &str, tree: &VirtualFileTree) -> AutocompleteResult {
    let input = input.trim_start();
    if input.is_empty() {
        return AutocompleteResult::None;
    }

    let ctx = Context::from_input(input);
    match ctx.mode {
        CompletionMode::Command => complete_command(ctx.word),
        CompletionMode::DirectoryPath | CompletionMode::AnyPath => {
            let dirs_only = ctx.mode == CompletionMode::DirectoryPath;
            complete_path(&ctx, cwd, tree, dirs_only)
        }
        CompletionMode::None => AutocompleteResult::None,
    }
}

/// Ghost text hint while typing: the suffix that would complete the input.
pub fn hint(input: &str, cwd: &str, tree: &VirtualFileTree) -> Option<String> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }

    let ctx = Context::from_input(input);
    match ctx.mode {
        CompletionMode::Command => command_hint(ctx.word),
        CompletionMode::DirectoryPath | CompletionMode::AnyPath => {
            let parsed = ParsedPath::parse(ctx.word, cwd)?;
            let dirs_only = ctx.mode == CompletionMode::DirectoryPath;
            let name_lower = parsed.name_part.to_lowercase();
            parsed
                .matches(tree, dirs_only)
                .into_iter()
                .find(|(name, _)| name.to_lowercase() != name_lower)
                .and_then(|(name, is_dir)| {
                    let rest = name.get(parsed.name_part.len()..)?;
                    let suffix = if is_dir { "/" } else { "" };
                    Some(format!("{}{}", rest, suffix))
                })
        }
        CompletionMode::None => None,
    }
}

// ============================================================================
// Command Completion
// ============================================================================

fn complete_command(partial: &str) -> AutocompleteResult {
    let partial_lower = partial.to_lowercase();
    let matches: Vec<String> = Command::names()
        .iter()
        .filter(|cmd| cmd.starts_with(&partial_lower))
        .map(|s| s.to_string())
        .collect();

    match matches.len() {
        0 => AutocompleteResult::None,
        1 => AutocompleteResult::Single(format!("{} ", matches[0])),
        _ => {
            let common = find_common_prefix(&matches);
            AutocompleteResult::Multiple(common, matches)
        }
    }
}

fn command_hint(partial: &str) -> Option<String> {
    let partial_lower = partial.to_lowercase();
    Command::names()
        .iter()
        .find(|cmd| cmd.starts_with(&partial_lower) && **cmd != partial_lower)
        .and_then(|cmd| cmd.get(partial.len()..))
        .map(str::to_string)
}

// ============================================================================
// Path Completion
// ============================================================================

fn complete_path(
    ctx: &Context<'_>,
    cwd: &str,
    tree: &VirtualFileTree,
    dirs_only: bool,
) -> AutocompleteResult {
    let Some(parsed) = ParsedPath::parse(ctx.word, cwd) else {
        return AutocompleteResult::None;
    };
    let matches = parsed.matches(tree, dirs_only);

    match matches.as_slice() {
        [] => AutocompleteResult::None,
        [(name, is_dir)] => {
            let suffix = if *is_dir { "/" } else { " " };
            AutocompleteResult::Single(format!(
                "{}{}{}{}",
                ctx.head, parsed.dir_part, name, suffix
            ))
        }
        _ => {
            let names: Vec<String> = matches.iter().map(|(name, _)| name.clone()).collect();
            let common = find_common_prefix(&names);
            let display = matches
                .iter()
                .map(|(name, is_dir)| {
                    if *is_dir {
                        format!("{}/", name)
                    } else {
                        name.clone()
                    }
                })
                .collect();
            AutocompleteResult::Multiple(
                format!("{}{}{}", ctx.head, parsed.dir_part, common),
                display,
            )
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Find the common prefix of multiple strings (case-insensitive).
fn find_common_prefix(strings: &[String]) -> String {
    let Some(first) = strings.first() else {
        return String::new();
    };

    let mut prefix_chars = first.chars().count();
    for s in &strings[1..] {
        prefix_chars = first
            .chars()
            .zip(s.chars())
            .take(prefix_chars)
            .take_while(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
            .count();
    }

    first.chars().take(prefix_chars).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileNode;

    fn create_test_tree() -> VirtualFileTree {
        let mut tree = VirtualFileTree::new();
        tree.insert("/", FileNode::folder("src", "/")).unwrap();
        tree.insert("/src", FileNode::folder("components", "/")).unwrap();
        tree.insert("/src", FileNode::file("App.jsx", "/")).unwrap();
        tree.insert("/src", FileNode::file("app.test.js", "/")).unwrap();
        tree.insert("/", FileNode::folder("public", "/")).unwrap();
        tree.insert("/", FileNode::file("package.json", "/")).unwrap();
        tree
    }

    #[test]
    fn test_command_completion_single() {
        assert_eq!(complete_command("cle"), AutocompleteResult::Single("clear ".into()));
    }

    #[test]
    fn test_command_completion_multiple() {
        match complete_command("c") {
            AutocompleteResult::Multiple(common, matches) => {
                assert_eq!(common, "c");
                assert!(matches.contains(&"cat".to_string()));
                assert!(matches.contains(&"cp".to_string()));
                assert!(matches.contains(&"clear".to_string()));
            }
            other => panic!("Expected multiple matches, got {:?}", other),
        }
    }

    #[test]
    fn test_no_match() {
        assert_eq!(complete_command("xyz"), AutocompleteResult::None);
    }

    #[test]
    fn test_directory_completion() {
        let tree = create_test_tree();
        assert_eq!(
            autocomplete("cd com", "/src", &tree),
            AutocompleteResult::Single("cd components/".into())
        );
        assert_eq!(
            autocomplete("cd /p", "/src", &tree),
            AutocompleteResult::Single("cd /public/".into())
        );
    }

    #[test]
    fn test_file_completion_keeps_earlier_words() {
        let tree = create_test_tree();
        match autocomplete("grep -i use ap", "/src", &tree) {
            AutocompleteResult::Multiple(line, names) => {
                assert_eq!(line, "grep -i use App.");
                assert_eq!(names, vec!["App.jsx", "app.test.js"]);
            }
            other => panic!("Expected multiple matches, got {:?}", other),
        }
        assert_eq!(
            autocomplete("cat ../pack", "/src/components", &tree),
            AutocompleteResult::None
        );
        assert_eq!(
            autocomplete("cat /pack", "/src", &tree),
            AutocompleteResult::Single("cat /package.json ".into())
        );
    }

    #[test]
    fn test_hints() {
        let tree = create_test_tree();
        assert_eq!(hint("hist", "/src", &tree).as_deref(), Some("ory"));
        assert_eq!(hint("cd comp", "/src", &tree).as_deref(), Some("onents/"));
        assert_eq!(hint("echo x", "/src", &tree), None);
    }

    #[test]
    fn test_common_prefix() {
        let strings = vec![
            "hello".to_string(),
            "help".to_string(),
            "helicopter".to_string(),
        ];
        assert_eq!(find_common_prefix(&strings), "hel");
    }
}
