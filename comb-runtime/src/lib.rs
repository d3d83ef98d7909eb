// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Runtime components of the comb node: a typed event bus and a daemon that
//! hands every worker a shutdown signal to pull its work through and tears
//! the workers down in a defined order.

/// A module that provides a daemon running prioritized background workers.
pub mod daemon;
/// A module that provides a typed event bus.
pub mod event;
