// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0
//! Tether agent core
//!
//! Bootstrap and supervision for the agent that runs inside a child cluster.
//!
//! # Architecture
//!
//! - **Domain:** registration and controller options, feature gates,
//!   the agent collaborator contract and the bootstrap error taxonomy
//! - **Application:** the option set typestate and the lifecycle controller
//! - **Infrastructure:** the default heartbeat agent

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
