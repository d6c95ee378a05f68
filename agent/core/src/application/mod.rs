// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

pub mod lifecycle;
pub mod options;

// Re-export for convenience
pub use lifecycle::{
    ExecutionScope, LifecycleController, LifecycleObserver, LifecycleState, Termination,
    TracingObserver,
};
pub use options::{AgentFlags, AgentOptions, CompletedOptions, ValidatedOptions};
