// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use crate::ip::{run_ip, run_ip_json};
use crate::model::RuleEntry;
use tracing::debug;

/// Installs the `not fwmark <m> lookup <table>` policy rule for both
/// address families if it is absent.
pub async fn sync_rules(table: u32, fwmark: u32, priority: u32, dry_run: bool) -> Result<Vec<String>> {
	let mut log = Vec::new();

	for family in ["4", "6"] {
		let family_flag = format!("-{family}");
		let rules: Vec<RuleEntry> = run_ip_json(&[&family_flag, "rule", "show"]).await?;

		let present = rules.iter().any(|rule| {
			rule.inverted
				&& rule.priority == priority
				&& rule.fwmark_value() == Some(fwmark)
				&& rule.table_id() == Some(table)
		});
		if present {
			debug!(family, "expected rule already present");
			continue;
		}

		let fwmark_hex = format!("0x{fwmark:x}");
		let table_str = table.to_string();
		let priority_str = priority.to_string();
		if !dry_run {
			run_ip(&[
				&family_flag,
				"rule",
				"add",
				"not",
				"fwmark",
				&fwmark_hex,
				"lookup",
				&table_str,
				"priority",
				&priority_str,
			])
			.await?;
		}
		log.push(format!(
			"ip -{family} rule add not from all fwmark {fwmark_hex} lookup {table}"
		));
	}
	Ok(log)
}
