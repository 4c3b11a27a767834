// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod circle;
pub mod user;
pub mod vocabulary;

pub use circle::{
    CircleDocument, CircleDraft, CommitOutcome, Confirmation, DraftMode, MemberRole,
    MembershipEntry, OwnershipState, ValidCircle,
};
pub use user::{Identity, ProfileFields, ProfileUpdate, UserProfile};

/// Version stamped on every document this crate writes.
///
/// Documents written by the original web client carry no version and read
/// back as 0.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;
