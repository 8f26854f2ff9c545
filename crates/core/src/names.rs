// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reserved event types, sources and state owners

/// Event types used by the core
pub mod event_type {
    /// Matches every event type when used in a listener registration
    pub const WILDCARD: &str = "com.switchyard.eventType._wildcard_";
    pub const HUB: &str = "com.switchyard.eventType.hub";
    pub const RULES_ENGINE: &str = "com.switchyard.eventType.rulesEngine";
    pub const LIFECYCLE: &str = "com.switchyard.eventType.lifecycle";
}

/// Event sources used by the core
pub mod event_source {
    /// Matches every event source when used in a listener registration
    pub const WILDCARD: &str = "com.switchyard.eventSource._wildcard_";
    pub const SHARED_STATE: &str = "com.switchyard.eventSource.sharedState";
    pub const BOOTED: &str = "com.switchyard.eventSource.booted";
    pub const REQUEST_CONTENT: &str = "com.switchyard.eventSource.requestContent";
    pub const RESPONSE_CONTENT: &str = "com.switchyard.eventSource.responseContent";
    pub const REQUEST_RESET: &str = "com.switchyard.eventSource.requestReset";
    pub const OS: &str = "com.switchyard.eventSource.os";
}

/// Shared-state owner name under which the hub publishes its registry
pub const EVENT_HUB_STATE_OWNER: &str = "com.switchyard.eventhub";

/// Data key naming the owner in shared-state change events
pub const STATE_OWNER_KEY: &str = "stateowner";
