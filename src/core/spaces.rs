//! Space enumeration and selection
//!
//! Lists every space visible to the configured account, page by page, and
//! narrows the list down to the spaces a run should export.

use crate::adapters::confluence::ExportService;
use crate::core::cancel::CancelSignal;
use crate::core::retry::RetryPolicy;
use crate::domain::{ExportError, Space, SpaceKey};
use std::collections::BTreeSet;

/// Spaces requested per listing call
pub const SPACE_PAGE_SIZE: u32 = 50;

/// Fetches every space, following pagination until a short page
///
/// Each page request is retried independently under `policy`.
pub async fn list_all_spaces(
    service: &dyn ExportService,
    policy: &RetryPolicy,
    cancel: &CancelSignal,
) -> Result<Vec<Space>, ExportError> {
    let mut spaces = Vec::new();
    let mut start = 0;

    loop {
        let page = policy
            .run("list_spaces", cancel, || service.list_spaces(start, SPACE_PAGE_SIZE))
            .await?;

        tracing::debug!(start = start, returned = page.spaces.len(), "Fetched space page");
        spaces.extend(page.spaces);

        match page.next_start {
            Some(next) if next > start => start = next,
            _ => break,
        }
    }

    tracing::info!(count = spaces.len(), "Listed spaces");
    Ok(spaces)
}

/// Selection rules applied to the listed spaces
#[derive(Debug, Clone, Default)]
pub struct SpaceFilter {
    /// Explicit keys; when non-empty the other rules are ignored
    pub keys: Vec<SpaceKey>,
    pub include_personal: bool,
    pub include_archived: bool,
}

/// Result of applying a [`SpaceFilter`]
#[derive(Debug, Clone, Default)]
pub struct SpaceSelection {
    /// Spaces to export, in listing order
    pub selected: Vec<Space>,
    /// Requested keys the service did not list
    pub missing: Vec<SpaceKey>,
    /// Number of listed spaces left out
    pub skipped: usize,
}

impl SpaceFilter {
    pub fn new(keys: Vec<SpaceKey>, include_personal: bool, include_archived: bool) -> Self {
        Self {
            keys,
            include_personal,
            include_archived,
        }
    }

    /// Whether a listed space passes the personal/archived rules
    pub fn admits(&self, space: &Space) -> bool {
        if space.is_personal() && !self.include_personal {
            return false;
        }
        if space.is_archived() && !self.include_archived {
            return false;
        }
        true
    }

    /// Selects spaces from `spaces`
    ///
    /// Duplicate keys in the listing are kept once.
    pub fn apply(&self, spaces: Vec<Space>) -> SpaceSelection {
        let total = spaces.len();
        let mut seen = BTreeSet::new();
        let mut selection = SpaceSelection::default();

        if self.keys.is_empty() {
            for space in spaces {
                if self.admits(&space) && seen.insert(space.key.clone()) {
                    selection.selected.push(space);
                }
            }
        } else {
            let wanted: BTreeSet<&SpaceKey> = self.keys.iter().collect();
            for space in spaces {
                if wanted.contains(&space.key) && seen.insert(space.key.clone()) {
                    selection.selected.push(space);
                }
            }
            selection.missing = self
                .keys
                .iter()
                .filter(|key| !seen.contains(*key))
                .cloned()
                .collect();

            for key in &selection.missing {
                tracing::warn!(space_key = %key, "Requested space was not found");
            }
        }

        selection.skipped = total - selection.selected.len();
        selection
    }
}
