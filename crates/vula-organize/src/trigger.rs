// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ipnet::IpNet;

/// Deferred side-effects of a committed event. Triggers carry plain
/// values, never references into organizer state, and run after the
/// event's state has been persisted, before the next event is dequeued.
#[derive(Clone, Debug, PartialEq)]
pub enum Trigger {
	/// Reconcile one peer's WireGuard config and routes.
	SyncPeer(String),
	/// Delete kernel routes for these prefixes on the vula interface.
	RemoveRoutes(Vec<IpNet>),
	/// Delete one WireGuard peer by public key.
	RemoveWgPeer(Vec<u8>),
	/// Re-sample system state and enqueue a NewSystemState event.
	GetNewSystemState,
	/// Reconcile WireGuard peers and routes against the expected set.
	RemoveUnknown,
}

impl Trigger {
	pub fn name(&self) -> &'static str {
		match self {
			Trigger::SyncPeer(_) => "SyncPeer",
			Trigger::RemoveRoutes(_) => "RemoveRoutes",
			Trigger::RemoveWgPeer(_) => "RemoveWgPeer",
			Trigger::GetNewSystemState => "GetNewSystemState",
			Trigger::RemoveUnknown => "RemoveUnknown",
		}
	}
}
