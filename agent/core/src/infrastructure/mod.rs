// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

pub mod heartbeat_agent;
