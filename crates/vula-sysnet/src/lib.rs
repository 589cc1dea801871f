// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kernel adapters: the iproute2-backed [`NetworkSystem`] implementation
//! and the WireGuard control surface.
//!
//! Addressing, routing, and policy rules go through `ip -json`, which is
//! a stable machine-readable interface across iproute2 releases; address
//! and route change notifications come from a long-lived `ip monitor`.
//! WireGuard device and peer configuration uses the kernel netlink
//! interface via `wireguard-control`.

mod error;
mod ip;
mod links;
mod model;
mod monitor;
mod network;
mod routes;
mod rules;
mod system_state;
mod wg;

pub use error::{Result, SysnetError};
pub use network::IprouteNetwork;
pub use wg::KernelWgDevice;
