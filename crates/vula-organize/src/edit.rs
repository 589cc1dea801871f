// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Path-addressable structural edits over the state tree.
//!
//! The state is projected onto a YAML value tree, the dotted path is
//! walked by plain map lookup, the operation is applied, and the tree is
//! deserialized back into the strongly typed state. Type errors and
//! unknown keys surface as edit failures; prefs edits are re-validated
//! before they can commit.

use crate::error::{OrganizeError, Result};
use crate::event::EditOp;
use crate::prefs::validate_prefs;
use serde_yaml::{Mapping, Value};
use vula_core::OrganizeState;

/// Applies one edit and returns the resulting state. The input state is
/// untouched on failure.
pub fn apply(state: &OrganizeState, op: EditOp, path: &[String], value: &str) -> Result<OrganizeState> {
	if path.is_empty() {
		return Err(OrganizeError::UnknownKey("<empty path>".to_string()));
	}

	let mut tree = serde_yaml::to_value(state)?;
	let parsed = parse_scalar(value);

	let target = walk_to_parent(&mut tree, path)?;
	let leaf = path.last().unwrap().as_str();
	match op {
		EditOp::Set => set(target, leaf, parsed)?,
		EditOp::Add => add(target, leaf, parsed)?,
		EditOp::Remove => remove(target, leaf, parsed)?,
	}

	let next: OrganizeState = serde_yaml::from_value(tree)
		.map_err(|e| OrganizeError::InvalidValue(e.to_string()))?;

	let violations = validate_prefs(&next.prefs);
	if !violations.is_empty() {
		return Err(OrganizeError::InvalidPrefs(violations.join(", ")));
	}
	Ok(next)
}

/// YAML-parses the scalar so booleans and numbers keep their types;
/// anything unparsable stays a string.
fn parse_scalar(value: &str) -> Value {
	serde_yaml::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn walk_to_parent<'a>(tree: &'a mut Value, path: &[String]) -> Result<&'a mut Mapping> {
	let mut node = tree;
	for key in &path[..path.len() - 1] {
		let mapping = node
			.as_mapping_mut()
			.ok_or_else(|| OrganizeError::UnknownKey(key.clone()))?;
		node = mapping
			.get_mut(key.as_str())
			.ok_or_else(|| OrganizeError::UnknownKey(key.clone()))?;
	}
	node.as_mapping_mut()
		.ok_or_else(|| OrganizeError::UnknownKey(path.join(".")))
}

fn set(parent: &mut Mapping, key: &str, value: Value) -> Result<()> {
	parent.insert(Value::String(key.to_string()), value);
	Ok(())
}

fn add(parent: &mut Mapping, key: &str, value: Value) -> Result<()> {
	let node = parent
		.get_mut(key)
		.ok_or_else(|| OrganizeError::UnknownKey(key.to_string()))?;
	match node {
		// lists are treated as sorted sets: drop an equal element first
		Value::Sequence(items) => {
			items.retain(|item| *item != value);
			items.push(value);
			Ok(())
		}
		Value::Mapping(map) => {
			match value {
				Value::Mapping(new_entries) => {
					for (k, v) in new_entries {
						map.insert(k, v);
					}
				}
				other => {
					map.insert(other, Value::Bool(true));
				}
			}
			Ok(())
		}
		_ => Err(OrganizeError::InvalidValue(format!(
			"can't add to scalar key {key}"
		))),
	}
}

fn remove(parent: &mut Mapping, key: &str, value: Value) -> Result<()> {
	let node = parent
		.get_mut(key)
		.ok_or_else(|| OrganizeError::UnknownKey(key.to_string()))?;
	match node {
		Value::Sequence(items) => {
			items.retain(|item| *item != value);
			Ok(())
		}
		Value::Mapping(map) => {
			map.remove(&value);
			Ok(())
		}
		_ => Err(OrganizeError::InvalidValue(format!(
			"can't remove from scalar key {key}"
		))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use vula_core::{Descriptor, Peer};

	fn path(parts: &[&str]) -> Vec<String> {
		parts.iter().map(|s| s.to_string()).collect()
	}

	fn state_with_peer() -> (OrganizeState, String) {
		let mut state = OrganizeState::new();
		let mut descriptor = Descriptor::default();
		descriptor.hostname = "a.local.".into();
		descriptor.verify_key = vec![1; 32];
		let peer = Peer::from_descriptor(descriptor);
		let id = peer.id();
		state.peers.insert(id.clone(), peer);
		(state, id)
	}

	#[test]
	fn set_bool_pref() {
		let state = OrganizeState::new();
		let next = apply(&state, EditOp::Set, &path(&["prefs", "pin_new_peers"]), "true").unwrap();
		assert!(next.prefs.pin_new_peers);
	}

	#[test]
	fn set_numeric_pref() {
		let state = OrganizeState::new();
		let next = apply(&state, EditOp::Set, &path(&["prefs", "expire_time"]), "7200").unwrap();
		assert_eq!(next.prefs.expire_time, 7200);
	}

	#[test]
	fn unknown_pref_is_rejected() {
		let state = OrganizeState::new();
		let err = apply(&state, EditOp::Set, &path(&["prefs", "some_other_pref"]), "x").unwrap_err();
		assert!(matches!(err, OrganizeError::InvalidValue(_)));
	}

	#[test]
	fn add_to_list_pref_is_set_like() {
		let state = OrganizeState::new();
		let next = apply(
			&state,
			EditOp::Add,
			&path(&["prefs", "local_domains"]),
			"vula.local.",
		)
		.unwrap();
		assert!(next.prefs.local_domains.contains(&"vula.local.".to_string()));

		// adding again does not duplicate
		let again = apply(
			&next,
			EditOp::Add,
			&path(&["prefs", "local_domains"]),
			"vula.local.",
		)
		.unwrap();
		assert_eq!(
			again.prefs.local_domains.iter().filter(|d| *d == "vula.local.").count(),
			1
		);
	}

	#[test]
	fn remove_from_list_pref() {
		let state = OrganizeState::new();
		let next = apply(
			&state,
			EditOp::Remove,
			&path(&["prefs", "iface_prefix_allowed"]),
			"thunderbolt",
		)
		.unwrap();
		assert!(!next.prefs.iface_prefix_allowed.contains(&"thunderbolt".to_string()));
	}

	#[test]
	fn forbidden_then_allowed_conflict_is_rejected() {
		let state = OrganizeState::new();
		let mid = apply(
			&state,
			EditOp::Add,
			&path(&["prefs", "subnets_forbidden"]),
			"198.51.100.0/24",
		)
		.unwrap();
		let err = apply(
			&mid,
			EditOp::Add,
			&path(&["prefs", "subnets_allowed"]),
			"198.51.100.0/24",
		)
		.unwrap_err();
		assert!(matches!(err, OrganizeError::InvalidPrefs(msg) if msg.contains("conflict")));
	}

	#[test]
	fn invalid_domain_and_prefix_are_rejected() {
		let state = OrganizeState::new();
		assert!(apply(
			&state,
			EditOp::Add,
			&path(&["prefs", "local_domains"]),
			"my%local.domain"
		)
		.is_err());
		assert!(apply(
			&state,
			EditOp::Add,
			&path(&["prefs", "iface_prefix_allowed"]),
			"my%prefix"
		)
		.is_err());
	}

	#[test]
	fn set_peer_petname_by_path() {
		let (state, id) = state_with_peer();
		let next = apply(
			&state,
			EditOp::Set,
			&path(&["peers", &id, "petname"]),
			"george",
		)
		.unwrap();
		assert_eq!(next.peers[&id].petname, "george");
	}

	#[test]
	fn disable_peer_nickname_by_path() {
		let (state, id) = state_with_peer();
		let next = apply(
			&state,
			EditOp::Set,
			&path(&["peers", &id, "nicknames", "a.local."]),
			"false",
		)
		.unwrap();
		assert!(!next.peers[&id].nicknames["a.local."]);
	}

	#[test]
	fn add_nickname_sets_bool_true() {
		let (state, id) = state_with_peer();
		let next = apply(
			&state,
			EditOp::Add,
			&path(&["peers", &id, "nicknames"]),
			"alias.local.",
		)
		.unwrap();
		assert!(next.peers[&id].nicknames["alias.local."]);
	}

	#[test]
	fn remove_nickname_by_path() {
		let (state, id) = state_with_peer();
		let next = apply(
			&state,
			EditOp::Remove,
			&path(&["peers", &id, "nicknames"]),
			"a.local.",
		)
		.unwrap();
		assert!(!next.peers[&id].nicknames.contains_key("a.local."));
	}

	#[test]
	fn missing_intermediate_key_fails() {
		let state = OrganizeState::new();
		let err = apply(&state, EditOp::Set, &path(&["peers", "nope", "petname"]), "x").unwrap_err();
		assert!(matches!(err, OrganizeError::UnknownKey(k) if k == "nope"));
	}

	#[test]
	fn type_mismatch_fails() {
		let state = OrganizeState::new();
		let err = apply(
			&state,
			EditOp::Set,
			&path(&["prefs", "expire_time"]),
			"not-a-number",
		)
		.unwrap_err();
		assert!(matches!(err, OrganizeError::InvalidValue(_)));
	}
}
