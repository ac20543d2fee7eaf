// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upward walk from a folder to the root, producing a root-first breadcrumb.

use crate::error::AppError;
use crate::models::{BreadcrumbItem, DriveItem};
use std::collections::HashSet;
use std::future::Future;

/// Default maximum number of breadcrumb entries.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Why a walk stopped before reaching an item without parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruncationReason {
    /// Fetching the given folder failed.
    FetchFailed { folder_id: String, error: String },
    /// The parent chain looped back to an already visited folder.
    Cycle { folder_id: String },
    /// The depth bound was reached with parents still remaining.
    DepthLimit(usize),
}

/// Outcome of a breadcrumb walk. Neither variant is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreadcrumbWalk {
    /// Reached a folder with no parent.
    Completed(Vec<BreadcrumbItem>),
    /// Stopped early; `items` holds what was collected, still root-first.
    Truncated {
        items: Vec<BreadcrumbItem>,
        reason: TruncationReason,
    },
}

impl BreadcrumbWalk {
    pub fn items(&self) -> &[BreadcrumbItem] {
        match self {
            BreadcrumbWalk::Completed(items) => items,
            BreadcrumbWalk::Truncated { items, .. } => items,
        }
    }

    pub fn into_items(self) -> Vec<BreadcrumbItem> {
        match self {
            BreadcrumbWalk::Completed(items) => items,
            BreadcrumbWalk::Truncated { items, .. } => items,
        }
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, BreadcrumbWalk::Truncated { .. })
    }
}

/// Walk parent links from `start`, calling `fetch` once per folder.
///
/// Collects at most `max_depth` entries and never visits a folder twice.
pub async fn walk_breadcrumb<F, Fut>(start: &str, max_depth: usize, mut fetch: F) -> BreadcrumbWalk
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<DriveItem, AppError>>,
{
    // Collected target-first, reversed on return.
    let mut items: Vec<BreadcrumbItem> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = start.to_string();

    let reason = loop {
        if items.len() >= max_depth {
            break TruncationReason::DepthLimit(max_depth);
        }

        if !visited.insert(current.clone()) {
            break TruncationReason::Cycle { folder_id: current };
        }

        let folder = match fetch(current.clone()).await {
            Ok(folder) => folder,
            Err(e) => {
                break TruncationReason::FetchFailed {
                    folder_id: current,
                    error: e.to_string(),
                }
            }
        };

        let parent = folder.first_parent().map(str::to_string);
        items.push(BreadcrumbItem {
            id: folder.id,
            name: folder.name,
        });

        match parent {
            Some(parent) => current = parent,
            None => {
                items.reverse();
                return BreadcrumbWalk::Completed(items);
            }
        }
    };

    tracing::warn!(start = %start, collected = items.len(), reason = ?reason, "Breadcrumb walk truncated");

    items.reverse();
    BreadcrumbWalk::Truncated { items, reason }
}
