//! Bulk - a flushed batch of commands in its rendered form

use std::fmt;
use std::sync::Arc;

use crate::Command;

/// Prefix of every rendered bulk.
pub const BULK_PREFIX: &str = "bulk: ";

/// Separator between commands in a rendered bulk.
pub const BULK_SEPARATOR: &str = ", ";

/// A rendered, non-empty bulk.
///
/// Cloning is cheap: every sink gets the same shared text.
#[derive(Clone, PartialEq, Eq)]
pub struct Bulk {
    rendered: Arc<str>,
    len: usize,
}

impl Bulk {
    /// Render commands as `"bulk: a, b, c"`.
    ///
    /// Returns `None` for an empty slice: empty bulks are never flushed.
    pub fn render(commands: &[Command]) -> Option<Self> {
        if commands.is_empty() {
            return None;
        }

        let body_len: usize = commands.iter().map(|c| c.len()).sum::<usize>()
            + BULK_SEPARATOR.len() * (commands.len() - 1);
        let mut rendered = String::with_capacity(BULK_PREFIX.len() + body_len);
        rendered.push_str(BULK_PREFIX);
        for (idx, cmd) in commands.iter().enumerate() {
            if idx > 0 {
                rendered.push_str(BULK_SEPARATOR);
            }
            rendered.push_str(cmd.as_str());
        }

        Some(Self {
            rendered: Arc::from(rendered),
            len: commands.len(),
        })
    }

    /// Rendered text, without trailing newline.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Exact number of commands the bulk was built from.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Command count as re-derived from the rendered text: separators + 1.
    ///
    /// A comma inside a command is counted as an extra command. Worker
    /// statistics report this figure.
    pub fn approx_command_count(&self) -> u64 {
        self.rendered.bytes().filter(|b| *b == b',').count() as u64 + 1
    }
}

impl fmt::Debug for Bulk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bulk")
            .field("rendered", &self.as_str())
            .field("len", &self.len)
            .finish()
    }
}

impl fmt::Display for Bulk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
