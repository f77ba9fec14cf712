//! Parsing sub-commands for the document and todo tools.

use crate::error::{MultitoolError, Result};
use regex::Regex;

/// A command for the document reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocCommand {
    /// Load and index the PDF at this path.
    Load(String),
    /// Ask a question about the loaded document.
    Ask(String),
}

/// A command for the todo list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoCommand {
    Add(String),
    List,
    /// 1-based task number, not yet range checked.
    Remove(i64),
}

const TODO_USAGE: &str = "add:<task>, list or remove:<number>";

/// Turns one line of tool input into a structured command.
pub struct CommandParser {
    load_regex: Regex,
    add_regex: Regex,
    list_regex: Regex,
    remove_regex: Regex,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandParser {
    pub fn new() -> Self {
        Self {
            // Accepts both "load:<path>" and "load <path>"
            load_regex: Regex::new(r"(?is)^load[:\s]\s*(.+)$").expect("Invalid regex"),
            add_regex: Regex::new(r"(?is)^add:(.*)$").expect("Invalid regex"),
            list_regex: Regex::new(r"(?i)^list$").expect("Invalid regex"),
            remove_regex: Regex::new(r"(?is)^remove:(.*)$").expect("Invalid regex"),
        }
    }

    /// Parse document tool input. Anything that is not a load is a question.
    pub fn parse_doc(&self, input: &str) -> DocCommand {
        let input = input.trim();
        match self.load_regex.captures(input).and_then(|c| c.get(1)) {
            Some(path) => DocCommand::Load(path.as_str().trim().to_string()),
            None => DocCommand::Ask(input.to_string()),
        }
    }

    /// Parse todo tool input.
    pub fn parse_todo(&self, input: &str) -> Result<TodoCommand> {
        let input = input.trim();

        if let Some(task) = self.add_regex.captures(input).and_then(|c| c.get(1)) {
            let task = task.as_str().trim();
            if task.is_empty() {
                return Err(MultitoolError::InvalidInput(
                    "a task description is required after 'add:'".to_string(),
                ));
            }
            return Ok(TodoCommand::Add(task.to_string()));
        }

        if self.list_regex.is_match(input) {
            return Ok(TodoCommand::List);
        }

        if let Some(number) = self.remove_regex.captures(input).and_then(|c| c.get(1)) {
            let number = number.as_str().trim();
            return number
                .parse::<i64>()
                .map(TodoCommand::Remove)
                .map_err(|_| MultitoolError::InvalidIndex(number.to_string()));
        }

        Err(MultitoolError::UnrecognizedCommand {
            input: input.to_string(),
            expected: TODO_USAGE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_forms() {
        let parser = CommandParser::new();
        assert_eq!(
            parser.parse_doc("load:/tmp/report.pdf"),
            DocCommand::Load("/tmp/report.pdf".to_string())
        );
        assert_eq!(
            parser.parse_doc("LOAD  ~/docs/my file.pdf "),
            DocCommand::Load("~/docs/my file.pdf".to_string())
        );
        assert_eq!(
            parser.parse_doc("Load: C:\\docs\\a.pdf"),
            DocCommand::Load("C:\\docs\\a.pdf".to_string())
        );
    }

    #[test]
    fn test_anything_else_is_a_question() {
        let parser = CommandParser::new();
        assert_eq!(
            parser.parse_doc("What does chapter 2 say?"),
            DocCommand::Ask("What does chapter 2 say?".to_string())
        );
        assert_eq!(
            parser.parse_doc("loader settings?"),
            DocCommand::Ask("loader settings?".to_string())
        );
        assert_eq!(parser.parse_doc("load:"), DocCommand::Ask("load:".to_string()));
    }

    #[test]
    fn test_todo_commands() {
        let parser = CommandParser::new();
        assert_eq!(
            parser.parse_todo("add: buy milk ").unwrap(),
            TodoCommand::Add("buy milk".to_string())
        );
        assert_eq!(parser.parse_todo("List").unwrap(), TodoCommand::List);
        assert_eq!(parser.parse_todo("remove: 2").unwrap(), TodoCommand::Remove(2));
        assert_eq!(parser.parse_todo("REMOVE:-1").unwrap(), TodoCommand::Remove(-1));
    }

    #[test]
    fn test_todo_errors() {
        let parser = CommandParser::new();
        assert!(matches!(
            parser.parse_todo("add:   "),
            Err(MultitoolError::InvalidInput(_))
        ));
        assert!(matches!(
            parser.parse_todo("remove:first"),
            Err(MultitoolError::InvalidIndex(n)) if n == "first"
        ));
        assert!(matches!(
            parser.parse_todo("list everything"),
            Err(MultitoolError::UnrecognizedCommand { .. })
        ));

        let message = parser.parse_todo("delete:1").unwrap_err().to_string();
        assert!(message.contains("add:"));
        assert!(message.contains("remove:"));
    }
}
