//! Searchable message command index.
//!
//! Two matching modes:
//!
//! - **Strict** — an exact map keyed by the content's first token. Names may
//!   not contain spaces and must be case-insensitively unique; conflicts fail
//!   at registration time, before any traffic is matched. Lookup is O(1).
//! - **Loose** — a word-segment search tree over every registered name.
//!   Multi-word names are supported and candidates are yielded longest match
//!   first. A name only matches whole word segments, so `"addendum"` never
//!   matches a command named `"add"`.
//!
//! The tree is kept casefolded; the exact registered spelling is stored
//! alongside each entry so case-sensitive lookups can filter on it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::commands::message::MessageCommand;
use crate::errors::SchemaError;

#[derive(Clone, Default)]
struct TreeNode {
    children: HashMap<String, TreeNode>,
    /// Commands terminating at this node, with their exact name split into
    /// segments for case-sensitive filtering.
    entries: Vec<(Vec<String>, Arc<MessageCommand>)>,
}

/// A searchable collection of message commands.
#[derive(Clone, Default)]
pub struct MessageCommandIndex {
    strict: bool,
    commands: Vec<Arc<MessageCommand>>,
    /// Strict mode: casefolded name → (exact name, command).
    names_to_commands: HashMap<String, (String, Arc<MessageCommand>)>,
    /// Loose mode: casefolded word-segment tree.
    search_tree: TreeNode,
}

impl MessageCommandIndex {
    /// Creates an index.
    ///
    /// A strict index trades multi-word names for guaranteed O(1) dispatch
    /// and registration-time uniqueness errors.
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Self::default()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn commands(&self) -> &[Arc<MessageCommand>] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Adds a command to the index.
    ///
    /// In strict mode this fails synchronously when any of the command's
    /// names contains a space or case-insensitively collides with an already
    /// registered name.
    pub fn add(&mut self, command: MessageCommand) -> Result<(), SchemaError> {
        self.validate(&command)?;
        self.insert_validated(Arc::new(command));
        Ok(())
    }

    fn validate(&self, command: &MessageCommand) -> Result<(), SchemaError> {
        if !self.strict {
            return Ok(());
        }

        if command.names().iter().any(|name| name.contains(' ')) {
            return Err(SchemaError::SpacedNameInStrict);
        }

        let conflicts: Vec<String> = command
            .names()
            .iter()
            .map(|name| name.to_lowercase())
            .filter(|key| self.names_to_commands.contains_key(key))
            .collect();
        if !conflicts.is_empty() {
            return Err(SchemaError::DuplicateNames { names: conflicts });
        }

        Ok(())
    }

    /// Inserts a command whose names have already passed [`Self::validate`].
    fn insert_validated(&mut self, command: Arc<MessageCommand>) {
        if self.strict {
            for name in command.names().iter().filter(|name| !name.is_empty()) {
                self.names_to_commands
                    .insert(name.to_lowercase(), (name.clone(), Arc::clone(&command)));
            }
        } else {
            for name in command.names().iter().filter(|name| !name.is_empty()) {
                let mut node = &mut self.search_tree;
                for segment in name.to_lowercase().split(' ') {
                    node = node.children.entry(segment.to_owned()).or_default();
                }
                let exact: Vec<String> = name.split(' ').map(str::to_owned).collect();
                node.entries.push((exact, Arc::clone(&command)));
            }
        }

        self.commands.push(command);
    }

    /// Removes a command from the index, matching by pointer identity.
    pub fn remove(&mut self, command: &Arc<MessageCommand>) {
        self.commands.retain(|entry| !Arc::ptr_eq(entry, command));

        if self.strict {
            self.names_to_commands
                .retain(|_, (_, entry)| !Arc::ptr_eq(entry, command));
            return;
        }

        for name in command.names().iter().filter(|name| !name.is_empty()) {
            let segments: Vec<String> = name.to_lowercase().split(' ').map(str::to_owned).collect();
            remove_from_tree(&mut self.search_tree, &segments, command);
        }
    }

    /// Finds the commands matching the front of `content`, longest name
    /// first. The yielded name is the matched slice of the content itself, so
    /// its length can be trimmed off for group recursion.
    pub fn find(
        &self,
        content: &str,
        case_sensitive: bool,
    ) -> Vec<(String, Arc<MessageCommand>)> {
        if content.is_empty() {
            return Vec::new();
        }

        if self.strict {
            let name = content.split(' ').next().unwrap_or(content);
            let mut found = Vec::new();
            if let Some((exact, command)) = self.names_to_commands.get(&name.to_lowercase())
                && (!case_sensitive || exact == name)
            {
                found.push((name.to_owned(), Arc::clone(command)));
            }
            trace!(name, matches = found.len(), "strict index lookup");
            return found;
        }

        let split: Vec<&str> = content.split(' ').collect();
        let mut matched: Vec<(usize, &[(Vec<String>, Arc<MessageCommand>)])> = Vec::new();
        let mut node = &self.search_tree;
        for (depth, segment) in split.iter().enumerate() {
            match node.children.get(&segment.to_lowercase()) {
                Some(child) => {
                    node = child;
                    if !child.entries.is_empty() {
                        matched.push((depth, &child.entries));
                    }
                }
                None => break,
            }
        }

        let mut found = Vec::new();
        for (depth, entries) in matched.into_iter().rev() {
            let name = split[..=depth].join(" ");
            for (exact, command) in entries {
                if !case_sensitive || exact == &split[..=depth] {
                    found.push((name.clone(), Arc::clone(command)));
                }
            }
        }
        trace!(matches = found.len(), "loose index lookup");
        found
    }

    /// Deep-copies the index, cloning every contained command into fresh
    /// containers.
    pub fn copy(&self) -> Self {
        let mut copied = Self::new(self.strict);
        for command in &self.commands {
            copied.insert_validated(Arc::new((**command).clone()));
        }
        copied
    }
}

fn remove_from_tree(node: &mut TreeNode, segments: &[String], command: &Arc<MessageCommand>) {
    match segments {
        [] => node.entries.retain(|(_, entry)| !Arc::ptr_eq(entry, command)),
        [head, rest @ ..] => {
            if let Some(child) = node.children.get_mut(head) {
                remove_from_tree(child, rest, command);
                if child.entries.is_empty() && child.children.is_empty() {
                    node.children.remove(head);
                }
            }
        }
    }
}

impl std::fmt::Debug for MessageCommandIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCommandIndex")
            .field("strict", &self.strict)
            .field("commands", &self.commands.len())
            .finish()
    }
}
