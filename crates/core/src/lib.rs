// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sy-core: Core types for the Switchyard event hub
//!
//! This crate provides:
//! - The immutable `Event` model and its builder
//! - Reserved event types/sources and wildcard matching
//! - Deterministic history fingerprints and history requests
//! - The versioned shared-state table
//! - Clock and id abstractions for deterministic tests

pub mod clock;
pub mod event;
pub mod fingerprint;
pub mod history;
pub mod id;
pub mod names;
pub mod shared_state;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{flatten, value_at, Event, EventBuilder, EventData};
pub use fingerprint::fingerprint;
pub use history::{HistoryRequest, HistorySearch};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use names::{event_source, event_type, EVENT_HUB_STATE_OWNER, STATE_OWNER_KEY};
pub use shared_state::{
    SharedStateError, SharedStateKind, SharedStateResolution, SharedStateResult,
    SharedStateStatus, SharedStateTable,
};
