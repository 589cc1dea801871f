// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{CodecError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt::Write as _;
use vula_core::Descriptor;

/// The descriptor field keys, in their canonical (lexicographic) order.
const KEYS: [&str; 13] = [
	"c", "dt", "e", "hostname", "p", "pk", "port", "r", "s", "v4a", "v6a", "vf", "vk",
];

fn field_value(descriptor: &Descriptor, key: &str) -> Option<String> {
	match key {
		"c" => Some(STANDARD.encode(&descriptor.pq_pk)),
		"dt" => Some(descriptor.valid_duration.to_string()),
		"e" => Some(if descriptor.ephemeral { "1" } else { "0" }.to_string()),
		"hostname" => Some(descriptor.hostname.clone()),
		"p" => descriptor.primary_ip.map(|ip| ip.to_string()),
		"pk" => Some(STANDARD.encode(&descriptor.wg_pk)),
		"port" => Some(descriptor.port.to_string()),
		"r" => Some(join(descriptor.routes.iter())),
		"s" => {
			if descriptor.signature.is_empty() {
				None
			} else {
				Some(STANDARD.encode(&descriptor.signature))
			}
		}
		"v4a" => {
			if descriptor.v4_addrs.is_empty() {
				None
			} else {
				Some(join(descriptor.v4_addrs.iter()))
			}
		}
		"v6a" => {
			if descriptor.v6_addrs.is_empty() {
				None
			} else {
				Some(join(descriptor.v6_addrs.iter()))
			}
		}
		"vf" => Some(descriptor.valid_start.to_string()),
		"vk" => Some(STANDARD.encode(&descriptor.verify_key)),
		_ => None,
	}
}

fn join<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
	let mut out = String::new();
	for (i, item) in items.enumerate() {
		if i > 0 {
			out.push(',');
		}
		let _ = write!(out, "{item}");
	}
	out
}

fn render(descriptor: &Descriptor, skip_signature: bool) -> String {
	let mut out = String::new();
	for key in KEYS {
		if skip_signature && key == "s" {
			continue;
		}
		let Some(value) = field_value(descriptor, key) else {
			continue;
		};
		if !out.is_empty() {
			out.push(' ');
		}
		let _ = write!(out, "{key}={value};");
	}
	out
}

/// Canonical text form: `key=value;` fields sorted by key, joined with
/// `"; "`, trailing `;`.
pub fn serialize_descriptor(descriptor: &Descriptor) -> String {
	render(descriptor, false)
}

/// The byte buffer signatures are computed over: the canonical form with
/// the `s` field omitted.
pub fn signing_buffer(descriptor: &Descriptor) -> Vec<u8> {
	render(descriptor, true).into_bytes()
}

fn decode_b64(key: &'static str, value: &str) -> Result<Vec<u8>> {
	STANDARD
		.decode(value.as_bytes())
		.map_err(|e| CodecError::InvalidValue { key, reason: e.to_string() })
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
	value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Assigns one `key=value` field onto the descriptor under construction.
/// Shared by the canonical and TXT parsers. Unknown keys fail the parse.
pub(crate) fn apply_field(
	descriptor: &mut Descriptor,
	seen: &mut Vec<&'static str>,
	key: &str,
	value: &str,
) -> Result<()> {
	match key {
		"c" => {
			descriptor.pq_pk = decode_b64("c", value)?;
			seen.push("c");
		}
		"dt" => {
			descriptor.valid_duration = value
				.parse()
				.map_err(|_| CodecError::InvalidValue { key: "dt", reason: value.into() })?;
			seen.push("dt");
		}
		"e" => {
			descriptor.ephemeral = match value {
				"0" | "false" => false,
				"1" | "true" => true,
				other => {
					return Err(CodecError::InvalidValue { key: "e", reason: other.into() })
				}
			};
		}
		"hostname" => {
			descriptor.hostname = value.to_string();
			seen.push("hostname");
		}
		"p" => {
			if !value.is_empty() {
				descriptor.primary_ip = Some(value.parse().map_err(|_| {
					CodecError::InvalidValue { key: "p", reason: value.into() }
				})?);
			}
		}
		"pk" => {
			descriptor.wg_pk = decode_b64("pk", value)?;
			seen.push("pk");
		}
		"port" => {
			descriptor.port = value
				.parse()
				.map_err(|_| CodecError::InvalidValue { key: "port", reason: value.into() })?;
			seen.push("port");
		}
		"r" => {
			descriptor.routes = split_list(value)
				.map(|item| {
					item.parse()
						.map_err(|_| CodecError::InvalidValue { key: "r", reason: item.into() })
				})
				.collect::<Result<_>>()?;
		}
		"s" => {
			descriptor.signature = decode_b64("s", value)?;
		}
		"v4a" => {
			descriptor.v4_addrs = split_list(value)
				.map(|item| {
					item.parse().map_err(|_| CodecError::InvalidValue {
						key: "v4a",
						reason: item.into(),
					})
				})
				.collect::<Result<_>>()?;
		}
		"v6a" => {
			descriptor.v6_addrs = split_list(value)
				.map(|item| {
					item.parse().map_err(|_| CodecError::InvalidValue {
						key: "v6a",
						reason: item.into(),
					})
				})
				.collect::<Result<_>>()?;
		}
		"vf" => {
			descriptor.valid_start = value
				.parse()
				.map_err(|_| CodecError::InvalidValue { key: "vf", reason: value.into() })?;
			seen.push("vf");
		}
		"vk" => {
			descriptor.verify_key = decode_b64("vk", value)?;
			seen.push("vk");
		}
		other => return Err(CodecError::UnknownKey(other.to_string())),
	}
	Ok(())
}

pub(crate) fn check_required(seen: &[&'static str]) -> Result<()> {
	for required in ["c", "dt", "hostname", "pk", "port", "vf", "vk"] {
		if !seen.contains(&required) {
			return Err(CodecError::MissingField(required));
		}
	}
	Ok(())
}

/// Parses the canonical text form. Whitespace around `=` and `;` is
/// tolerated; unknown keys are rejected.
pub fn parse_descriptor(input: &str) -> Result<Descriptor> {
	let mut descriptor = Descriptor::default();
	let mut seen = Vec::new();

	for field in input.split(';') {
		let field = field.trim();
		if field.is_empty() {
			continue;
		}
		let Some(sep) = field.find('=') else {
			return Err(CodecError::MissingSeparator(field.to_string()));
		};
		let key = field[..sep].trim();
		let value = field[sep + 1..].trim();
		apply_field(&mut descriptor, &mut seen, key, value)?;
	}

	check_required(&seen)?;
	Ok(descriptor)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const UNSIGNED: &str = "c=NnoGEZ4W+d6TE22+Qyau0LF513FM43EagOP9aiSX9KhTCS1Gryt7qDoM04j7p0KQRJxwkcPEO/MpIJE5/bJKYQ==; dt=86400; e=0; hostname=vula-bookworm-test1.local.; p=fdff::1; pk=3w5/xje5jsdUCX30JfS/L/bMuwZRniK69dAVprN7t3c=; port=5354; r=; v4a=10.89.0.2; v6a=fdff:ffff:ffdf:989f:24cf:bda:1262:cfc6,fe80::bc92:4dff:fe82:30d,fd54:f27a:17c1:3a61::2; vf=1743974365; vk=afToKyN29ubu4DkhUMLoGIt5WjbsgEHYuccNtxvbjmA=;";

	#[test]
	fn parse_extracts_all_fields() {
		let d = parse_descriptor(UNSIGNED).unwrap();
		assert_eq!(d.valid_duration, 86400);
		assert_eq!(d.valid_start, 1743974365);
		assert!(!d.ephemeral);
		assert_eq!(d.hostname, "vula-bookworm-test1.local.");
		assert_eq!(d.primary_ip, Some("fdff::1".parse().unwrap()));
		assert_eq!(d.port, 5354);
		assert!(d.routes.is_empty());
		assert_eq!(d.v4_addrs, vec!["10.89.0.2".parse::<std::net::Ipv4Addr>().unwrap()]);
		assert_eq!(d.v6_addrs.len(), 3);
		assert_eq!(d.v6_addrs[1], "fe80::bc92:4dff:fe82:30d".parse::<std::net::Ipv6Addr>().unwrap());
		assert_eq!(d.wg_pk.len(), 32);
		assert_eq!(d.pq_pk.len(), 64);
		assert_eq!(d.verify_key.len(), 32);
		assert!(d.signature.is_empty());
	}

	#[test]
	fn serialize_round_trips_the_exact_string() {
		let d = parse_descriptor(UNSIGNED).unwrap();
		assert_eq!(serialize_descriptor(&d), UNSIGNED);
	}

	#[test]
	fn parse_tolerates_whitespace() {
		let loose = UNSIGNED.replace("; ", " ;  ").replace("dt=", "dt = ");
		let d = parse_descriptor(&loose).unwrap();
		assert_eq!(serialize_descriptor(&d), UNSIGNED);
	}

	#[test]
	fn unknown_key_fails_parse() {
		let input = format!("{UNSIGNED} bogus=1;");
		assert!(matches!(
			parse_descriptor(&input),
			Err(CodecError::UnknownKey(k)) if k == "bogus"
		));
	}

	#[test]
	fn missing_required_field_fails_parse() {
		let input = "hostname=a.local.; port=1; vf=1; dt=1; vk=YQ==; pk=YQ==;";
		assert!(matches!(
			parse_descriptor(input),
			Err(CodecError::MissingField("c"))
		));
	}

	#[test]
	fn field_without_separator_fails_parse() {
		assert!(matches!(
			parse_descriptor("hostname"),
			Err(CodecError::MissingSeparator(_))
		));
	}

	#[test]
	fn signing_buffer_omits_signature() {
		let mut d = parse_descriptor(UNSIGNED).unwrap();
		d.signature = vec![0u8; 64];
		let buffer = String::from_utf8(signing_buffer(&d)).unwrap();
		assert!(!buffer.contains("s="));
		assert_eq!(buffer, UNSIGNED);
	}

	proptest! {
		#[test]
		fn serialize_parse_is_identity(
			vf in 0i64..=4102444800,
			dt in 1i64..=864000,
			port in 1u16..=65535,
			ephemeral in any::<bool>(),
			v4 in proptest::collection::vec(any::<[u8; 4]>(), 0..4),
			v6 in proptest::collection::vec(any::<[u8; 16]>(), 0..4),
		) {
			let mut d = Descriptor::default();
			d.valid_start = vf;
			d.valid_duration = dt;
			d.port = port;
			d.ephemeral = ephemeral;
			d.hostname = "proptest.local.".into();
			d.wg_pk = vec![1; 32];
			d.pq_pk = vec![2; 64];
			d.verify_key = vec![3; 32];
			d.v4_addrs = v4.into_iter().map(std::net::Ipv4Addr::from).collect();
			d.v6_addrs = v6.into_iter().map(std::net::Ipv6Addr::from).collect();

			let s = serialize_descriptor(&d);
			let back = parse_descriptor(&s).unwrap();
			prop_assert_eq!(d, back);
		}
	}
}
