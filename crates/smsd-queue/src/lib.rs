// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send queue for the smsd gateway.
//!
//! Accepted messages wait in a FIFO queue until the scheduler hands them to
//! the modem. Failures retry from the front of the queue; sent and failed
//! messages end up in a bounded completed log.

pub mod scheduler;

pub use scheduler::{DrainSummary, QueueEvent, QueueSettings, Scheduler};
