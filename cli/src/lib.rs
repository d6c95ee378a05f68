// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0
//! tether-agent CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Command surface, version output, logging setup and OS signal wiring

pub mod app;
pub mod logging;
pub mod signals;
pub mod version;
