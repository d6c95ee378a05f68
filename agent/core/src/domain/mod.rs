// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0
//! Domain types shared by the option set, the lifecycle controller and the
//! agent collaborator.

pub mod agent;
pub mod cluster_registration;
pub mod controller_options;
pub mod error;
pub mod feature_gate;
pub mod flag;
pub mod validation;
