//! Per-session task list.

use super::command::TodoCommand;
use crate::error::{MultitoolError, Result};
use serde::{Deserialize, Serialize};

/// Ordered list of tasks. Numbered from 1 for users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    items: Vec<String>,
}

impl TodoList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add(&mut self, task: impl Into<String>) -> &str {
        self.items.push(task.into());
        self.items.last().map(String::as_str).unwrap_or_default()
    }

    /// Remove the task with the given 1-based number. Later tasks shift down.
    pub fn remove(&mut self, number: i64) -> Result<String> {
        let index = usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|&i| i < self.items.len())
            .ok_or_else(|| MultitoolError::InvalidIndex(number.to_string()))?;
        Ok(self.items.remove(index))
    }

    /// Render as numbered lines.
    pub fn render(&self) -> String {
        if self.items.is_empty() {
            return "Your task list is empty.".to_string();
        }
        self.items
            .iter()
            .enumerate()
            .map(|(i, task)| format!("{}. {}", i + 1, task))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Apply a parsed command and describe the outcome.
    pub fn execute(&mut self, command: TodoCommand) -> Result<String> {
        match command {
            TodoCommand::Add(task) => Ok(format!("Task added: \"{}\"", self.add(task))),
            TodoCommand::List => Ok(self.render()),
            TodoCommand::Remove(number) => {
                let removed = self.remove(number)?;
                Ok(format!("Task removed: \"{}\"", removed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_list_remove() {
        let mut todo = TodoList::new();
        assert_eq!(
            todo.execute(TodoCommand::Add("buy milk".to_string())).unwrap(),
            "Task added: \"buy milk\""
        );
        assert_eq!(todo.execute(TodoCommand::List).unwrap(), "1. buy milk");

        assert_eq!(
            todo.execute(TodoCommand::Remove(1)).unwrap(),
            "Task removed: \"buy milk\""
        );
        assert_eq!(
            todo.execute(TodoCommand::List).unwrap(),
            "Your task list is empty."
        );
    }

    #[test]
    fn test_remove_shifts_later_tasks() {
        let mut todo = TodoList::new();
        todo.add("one");
        todo.add("two");
        todo.add("three");

        assert_eq!(todo.remove(2).unwrap(), "two");
        assert_eq!(todo.render(), "1. one\n2. three");
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut todo = TodoList::new();
        assert!(matches!(todo.remove(1), Err(MultitoolError::InvalidIndex(_))));

        todo.add("only");
        for number in [0, -3, 2] {
            assert!(matches!(
                todo.remove(number),
                Err(MultitoolError::InvalidIndex(_))
            ));
        }
        assert_eq!(todo.len(), 1);
    }
}
