// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - Google auth and Drive access.

pub mod assertion;
pub mod breadcrumb;
pub mod drive;
pub mod retry;
pub mod token_cache;

pub use assertion::{Assertion, AssertionSigner};
pub use breadcrumb::{BreadcrumbWalk, TruncationReason};
pub use drive::{DriveClient, DriveService};
pub use token_cache::{Clock, SystemClock, TokenCache};
