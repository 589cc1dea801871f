// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ipnet::IpNet;
use regex::Regex;
use std::sync::LazyLock;
use vula_core::Prefs;

static LOCAL_DOMAIN_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.-]+\.$").unwrap());
static IFACE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());

fn overlaps(a: &IpNet, b: &IpNet) -> bool {
	// CIDR blocks either nest or are disjoint
	a.contains(&b.network()) || b.contains(&a.network())
}

/// Validates operator policy. Returns every violation, not just the first.
pub fn validate_prefs(prefs: &Prefs) -> Vec<String> {
	let mut errors = Vec::new();

	for allowed in &prefs.subnets_allowed {
		for forbidden in &prefs.subnets_forbidden {
			if overlaps(&allowed.trunc(), &forbidden.trunc()) {
				errors.push(format!("allow / forbidden conflict: {allowed} / {forbidden}"));
			}
		}
	}

	for domain in &prefs.local_domains {
		if !LOCAL_DOMAIN_RE.is_match(domain) {
			errors.push(format!("invalid local domain: {domain}"));
		}
	}

	for prefix in &prefs.iface_prefix_allowed {
		if !IFACE_PREFIX_RE.is_match(prefix) {
			errors.push(format!("invalid interface prefix: {prefix}"));
		}
	}

	errors
}
