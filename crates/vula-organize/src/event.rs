// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use crate::transaction::Transaction;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use vula_core::SystemState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOp {
	Add,
	Remove,
	Set,
}

impl fmt::Display for EditOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			EditOp::Add => "ADD",
			EditOp::Remove => "REMOVE",
			EditOp::Set => "SET",
		})
	}
}

pub type CustomHandler = Arc<dyn Fn(&mut Transaction) -> Result<()> + Send + Sync>;

/// Everything that can mutate organizer state. Dispatch is by variant;
/// handlers live on [`Transaction`].
#[derive(Clone)]
pub enum Event {
	IncomingDescriptor(String),
	VerifyAndPinPeer { vk: String, hostname: String },
	UserRemovePeer { query: String },
	UserPeerAddrAdd { vk: String, ip: String },
	UserPeerAddrDel { vk: String, ip: String },
	UserEdit { op: EditOp, path: Vec<String>, value: String },
	ReleaseGateway,
	NewSystemState(Box<SystemState>),
	Custom { name: String, args: Vec<String>, handler: CustomHandler },
}

impl fmt::Debug for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (name, args) = self.text();
		write!(f, "{name} {args:?}")
	}
}

impl Event {
	pub fn text(&self) -> (String, Vec<String>) {
		match self {
			Event::IncomingDescriptor(s) => ("INCOMING_DESCRIPTOR".into(), vec![s.clone()]),
			Event::VerifyAndPinPeer { vk, hostname } => {
				("VERIFY_AND_PIN_PEER".into(), vec![vk.clone(), hostname.clone()])
			}
			Event::UserRemovePeer { query } => ("USER_REMOVE_PEER".into(), vec![query.clone()]),
			Event::UserPeerAddrAdd { vk, ip } => {
				("USER_PEER_ADDR_ADD".into(), vec![vk.clone(), ip.clone()])
			}
			Event::UserPeerAddrDel { vk, ip } => {
				("USER_PEER_ADDR_DEL".into(), vec![vk.clone(), ip.clone()])
			}
			Event::UserEdit { op, path, value } => (
				"USER_EDIT".into(),
				vec![op.to_string(), path.join(", "), value.clone()],
			),
			Event::ReleaseGateway => ("RELEASE_GATEWAY".into(), vec![]),
			Event::NewSystemState(state) => {
				("NEW_SYSTEM_STATE".into(), vec![format!("{state:?}")])
			}
			Event::Custom { name, args, .. } => (name.clone(), args.clone()),
		}
	}

	/// Runs this event's handler against the transaction.
	pub fn apply(&self, t: &mut Transaction) -> Result<()> {
		match self {
			Event::IncomingDescriptor(text) => {
				let descriptor = vula_codec::parse_descriptor(text)?;
				if !vula_crypto::verify_descriptor(&descriptor) {
					debug!("incoming descriptor failed signature verification");
					return Ok(());
				}
				t.incoming_descriptor(descriptor, now_epoch())
			}
			Event::VerifyAndPinPeer { vk, hostname } => t.verify_and_pin_peer(vk, hostname),
			Event::UserRemovePeer { query } => t.user_remove_peer(query),
			Event::UserPeerAddrAdd { vk, ip } => {
				let addr = parse_addr(ip)?;
				t.peer_addr_add(vk, addr)
			}
			Event::UserPeerAddrDel { vk, ip } => {
				let addr = parse_addr(ip)?;
				t.peer_addr_del(vk, addr)
			}
			Event::UserEdit { op, path, value } => t.edit(*op, path, value),
			Event::ReleaseGateway => t.release_gateway(),
			Event::NewSystemState(state) => t.adjust_to_new_system_state((**state).clone()),
			Event::Custom { handler, .. } => handler(t),
		}
	}
}

fn parse_addr(value: &str) -> Result<std::net::IpAddr> {
	value
		.parse()
		.map_err(|_| crate::error::OrganizeError::InvalidValue(format!("not an IP address: {value}")))
}

pub fn now_epoch() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs() as i64)
		.unwrap_or(0)
}

/// The result document returned to an event's submitter: the event text,
/// the applied action log, and the (reserved) write log.
#[derive(Clone, Debug, Default, Serialize)]
pub struct EventOutcome {
	pub event: String,
	pub actions: Vec<String>,
	pub writes: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl EventOutcome {
	pub fn to_yaml(&self) -> String {
		serde_yaml::to_string(self).unwrap_or_else(|_| "event: <unserializable>\n".to_string())
	}

	pub fn ok(&self) -> bool {
		self.error.is_none()
	}
}
