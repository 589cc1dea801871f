// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::canonical::{apply_field, check_required, serialize_descriptor};
use crate::error::{CodecError, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use vula_core::Descriptor;

/// Renders a descriptor as mDNS TXT records, one `(key, value)` per field.
/// The `v4a`, `v6a`, and `p` fields carry raw network-order address bytes;
/// everything else is the canonical ASCII value.
pub fn descriptor_to_txt(descriptor: &Descriptor) -> Vec<(String, Vec<u8>)> {
	let canonical = serialize_descriptor(descriptor);
	let mut records = Vec::new();

	for field in canonical.split(';') {
		let field = field.trim();
		if field.is_empty() {
			continue;
		}
		// canonical output is well-formed, the separator is always present
		let sep = match field.find('=') {
			Some(i) => i,
			None => continue,
		};
		let key = &field[..sep];
		let value: Vec<u8> = match key {
			"v4a" => descriptor
				.v4_addrs
				.iter()
				.flat_map(|a| a.octets())
				.collect(),
			"v6a" => descriptor
				.v6_addrs
				.iter()
				.flat_map(|a| a.octets())
				.collect(),
			"p" => match descriptor.primary_ip {
				Some(IpAddr::V4(a)) => a.octets().to_vec(),
				Some(IpAddr::V6(a)) => a.octets().to_vec(),
				None => continue,
			},
			_ => field[sep + 1..].as_bytes().to_vec(),
		};
		records.push((key.to_string(), value));
	}
	records
}

fn addrs_from_bytes(bytes: &[u8], size: usize) -> Result<Vec<IpAddr>> {
	if bytes.len() % size != 0 {
		return Err(CodecError::BadAddressBytes { len: bytes.len(), size });
	}
	Ok(bytes
		.chunks(size)
		.map(|chunk| match size {
			4 => IpAddr::V4(Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3])),
			_ => {
				let mut octets = [0u8; 16];
				octets.copy_from_slice(chunk);
				IpAddr::V6(Ipv6Addr::from(octets))
			}
		})
		.collect())
}

fn join_addrs(addrs: &[IpAddr]) -> String {
	addrs
		.iter()
		.map(|a| a.to_string())
		.collect::<Vec<_>>()
		.join(",")
}

/// Rebuilds a descriptor from TXT records. Values arrive as raw bytes; the
/// binary address fields are decoded directly, everything else must be
/// ASCII field text.
pub fn descriptor_from_txt(records: &[(String, Vec<u8>)]) -> Result<Descriptor> {
	let mut descriptor = Descriptor::default();
	let mut seen = Vec::new();

	for (key, raw) in records {
		let value = match key.as_str() {
			"v4a" => join_addrs(&addrs_from_bytes(raw, 4)?),
			"v6a" => join_addrs(&addrs_from_bytes(raw, 16)?),
			"p" => {
				match raw.len() {
					0 => continue,
					4 | 16 => join_addrs(&addrs_from_bytes(raw, raw.len())?),
					len => return Err(CodecError::BadAddressBytes { len, size: 16 }),
				}
			}
			_ => String::from_utf8(raw.clone()).map_err(|_| CodecError::InvalidValue {
				key: "txt",
				reason: format!("non-utf8 value for {key}"),
			})?,
		};
		apply_field(&mut descriptor, &mut seen, key, &value)?;
	}

	check_required(&seen)?;
	Ok(descriptor)
}

/// Decodes the `\DDD` decimal byte-escape syntax used when TXT record
/// values pass through a textual presentation. Plain bytes pass through.
pub fn decode_txt_escapes(input: &str) -> Result<Vec<u8>> {
	let mut out = Vec::with_capacity(input.len());
	let bytes = input.as_bytes();
	let mut i = 0;

	while i < bytes.len() {
		if bytes[i] != b'\\' {
			out.push(bytes[i]);
			i += 1;
			continue;
		}
		if i + 3 >= bytes.len() {
			return Err(CodecError::OpenEscape);
		}
		let mut value: u32 = 0;
		for j in 1..=3 {
			let digit = bytes[i + j];
			if !digit.is_ascii_digit() {
				return Err(CodecError::BadEscapeDigit(digit as char));
			}
			value = value * 10 + u32::from(digit - b'0');
		}
		if value > 255 {
			return Err(CodecError::EscapeOutOfRange(value));
		}
		out.push(value as u8);
		i += 4;
	}
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::canonical::parse_descriptor;

	const UNSIGNED: &str = "c=NnoGEZ4W+d6TE22+Qyau0LF513FM43EagOP9aiSX9KhTCS1Gryt7qDoM04j7p0KQRJxwkcPEO/MpIJE5/bJKYQ==; dt=86400; e=0; hostname=vula-bookworm-test1.local.; p=fdff::1; pk=3w5/xje5jsdUCX30JfS/L/bMuwZRniK69dAVprN7t3c=; port=5354; r=; v4a=10.89.0.2; v6a=fdff:ffff:ffdf:989f:24cf:bda:1262:cfc6,fe80::bc92:4dff:fe82:30d,fd54:f27a:17c1:3a61::2; vf=1743974365; vk=afToKyN29ubu4DkhUMLoGIt5WjbsgEHYuccNtxvbjmA=;";

	#[test]
	fn txt_round_trip_preserves_descriptor() {
		let d = parse_descriptor(UNSIGNED).unwrap();
		let records = descriptor_to_txt(&d);
		let back = descriptor_from_txt(&records).unwrap();
		assert_eq!(d, back);
	}

	#[test]
	fn address_fields_are_raw_bytes() {
		let d = parse_descriptor(UNSIGNED).unwrap();
		let records = descriptor_to_txt(&d);
		let v4a = &records.iter().find(|(k, _)| k == "v4a").unwrap().1;
		assert_eq!(v4a, &vec![10, 89, 0, 2]);
		let v6a = &records.iter().find(|(k, _)| k == "v6a").unwrap().1;
		assert_eq!(v6a.len(), 3 * 16);
		let p = &records.iter().find(|(k, _)| k == "p").unwrap().1;
		assert_eq!(p.len(), 16);
		assert_eq!(&p[..2], &[0xfd, 0xff]);
	}

	#[test]
	fn concatenated_bytes_split_into_addresses() {
		let addrs = addrs_from_bytes(&[10, 0, 0, 1, 10, 0, 0, 2], 4).unwrap();
		assert_eq!(
			addrs,
			vec!["10.0.0.1".parse::<IpAddr>().unwrap(), "10.0.0.2".parse().unwrap()]
		);
	}

	#[test]
	fn ragged_byte_count_is_rejected() {
		assert!(matches!(
			addrs_from_bytes(&[1, 2, 3], 4),
			Err(CodecError::BadAddressBytes { len: 3, size: 4 })
		));
	}

	#[test]
	fn escapes_decode_to_raw_bytes() {
		assert_eq!(decode_txt_escapes(r"\010\089\000\002").unwrap(), vec![10, 89, 0, 2]);
		assert_eq!(decode_txt_escapes("plain").unwrap(), b"plain".to_vec());
		assert_eq!(decode_txt_escapes(r"a\032b").unwrap(), b"a b".to_vec());
	}

	#[test]
	fn bad_escapes_are_rejected() {
		assert!(matches!(decode_txt_escapes(r"\25"), Err(CodecError::OpenEscape)));
		assert!(matches!(
			decode_txt_escapes(r"\2x5"),
			Err(CodecError::BadEscapeDigit('x'))
		));
		assert!(matches!(
			decode_txt_escapes(r"\999"),
			Err(CodecError::EscapeOutOfRange(999))
		));
	}

	#[test]
	fn unset_primary_ip_is_omitted_from_txt() {
		let mut d = parse_descriptor(UNSIGNED).unwrap();
		d.primary_ip = None;
		let records = descriptor_to_txt(&d);
		assert!(!records.iter().any(|(k, _)| k == "p"));
		let back = descriptor_from_txt(&records).unwrap();
		assert_eq!(back.primary_ip, None);
	}
}