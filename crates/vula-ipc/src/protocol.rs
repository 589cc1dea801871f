// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Request from a client. One JSON object per line.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
	pub id: u64,
	pub method: String,
	#[serde(default)]
	pub params: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
	pub id: u64,
	pub result: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub id: u64,
	pub error: RpcErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcErrorBody {
	pub code: String,
	pub message: String,
}

// Error codes
pub const INVALID_PARAMS: &str = "invalid_params";
pub const UNKNOWN_METHOD: &str = "unknown_method";
pub const OPERATION_FAILED: &str = "operation_failed";

// Organizer methods
pub const METHOD_SYNC: &str = "sync";
pub const METHOD_SHOW_PEER: &str = "show_peer";
pub const METHOD_PEER_DESCRIPTOR: &str = "peer_descriptor";
pub const METHOD_PEER_IDS: &str = "peer_ids";
pub const METHOD_REDISCOVER: &str = "rediscover";
pub const METHOD_SET_PEER: &str = "set_peer";
pub const METHOD_REMOVE_PEER: &str = "remove_peer";
pub const METHOD_PEER_ADDR_ADD: &str = "peer_addr_add";
pub const METHOD_PEER_ADDR_DEL: &str = "peer_addr_del";
pub const METHOD_OUR_LATEST_DESCRIPTORS: &str = "our_latest_descriptors";
pub const METHOD_GET_VK_BY_NAME: &str = "get_vk_by_name";
pub const METHOD_VERIFY_AND_PIN_PEER: &str = "verify_and_pin_peer";
pub const METHOD_PROCESS_DESCRIPTOR_STRING: &str = "process_descriptor_string";
pub const METHOD_SHOW_PREFS: &str = "show_prefs";
pub const METHOD_SET_PREF: &str = "set_pref";
pub const METHOD_ADD_PREF: &str = "add_pref";
pub const METHOD_REMOVE_PREF: &str = "remove_pref";
pub const METHOD_RELEASE_GATEWAY: &str = "release_gateway";

// Discover and publish daemon methods
pub const METHOD_LISTEN: &str = "listen";

// --- Request params ---

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncParams {
	pub dry_run: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryParams {
	pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeerIdsParams {
	pub which: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetPeerParams {
	pub vk: String,
	pub path: Vec<String>,
	pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VkParams {
	pub vk: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeerAddrParams {
	pub vk: String,
	pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HostnameParams {
	pub hostname: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyAndPinParams {
	pub vk: String,
	pub hostname: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DescriptorParams {
	pub descriptor: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrefParams {
	pub pref: String,
	pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiscoverListenParams {
	pub ip_addrs: Vec<String>,
	#[serde(default)]
	pub our_wg_pk: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublishListenParams {
	/// Interface name to signed canonical descriptor string.
	pub announcements: BTreeMap<String, String>,
}

// --- Helpers ---

impl SuccessResponse {
	pub fn new<T: Serialize>(id: u64, result: T) -> Self {
		Self {
			id,
			result: serde_json::to_value(result).unwrap_or(Value::Null),
		}
	}
}

impl ErrorResponse {
	pub fn new(id: u64, code: &str, message: impl Into<String>) -> Self {
		Self {
			id,
			error: RpcErrorBody {
				code: code.to_string(),
				message: message.into(),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn request_defaults_params_to_null() {
		let request: Request =
			serde_json::from_str(r#"{"id":1,"method":"show_prefs"}"#).unwrap();
		assert_eq!(request.id, 1);
		assert_eq!(request.method, "show_prefs");
		assert_eq!(request.params, json!(null));
	}

	#[test]
	fn success_response_serializes_result() {
		let response = SuccessResponse::new(2, json!({"ok": true}));
		let value = serde_json::to_value(response).unwrap();
		assert_eq!(value.get("id"), Some(&json!(2)));
		assert_eq!(value.get("result"), Some(&json!({"ok": true})));
	}

	#[test]
	fn error_response_carries_code_and_message() {
		let response = ErrorResponse::new(3, OPERATION_FAILED, "nope");
		let value = serde_json::to_value(response).unwrap();
		let error = value.get("error").unwrap();
		assert_eq!(error.get("code"), Some(&json!(OPERATION_FAILED)));
		assert_eq!(error.get("message"), Some(&json!("nope")));
	}

	#[test]
	fn listen_params_round_trip() {
		let params = DiscoverListenParams {
			ip_addrs: vec!["10.0.0.1".into()],
			our_wg_pk: "abc".into(),
		};
		let value = serde_json::to_value(&params).unwrap();
		let back: DiscoverListenParams = serde_json::from_value(value).unwrap();
		assert_eq!(back.ip_addrs, vec!["10.0.0.1".to_string()]);
		assert_eq!(back.our_wg_pk, "abc");
	}
}
