// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Processing pipeline: the `Processor` contract and the context it mutates
//! while the repository brings a source file under management.

pub mod context;
pub mod processor;

pub use context::{BufferingPolicy, ProcessingContext};
pub use processor::{Processor, ProcessorChain};
