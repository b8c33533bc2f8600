// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Repo Domain
//!
//! The pure business-logic layer of the file repository: value objects,
//! the `FileRepository` and `Processor` contracts, the processing
//! pipeline's context, the transaction coordinator, and the error model.
//! Nothing here touches a filesystem, a clock wall-time source beyond what
//! `FileId` generation needs, or an async runtime beyond the `async-trait`
//! signatures infrastructure is expected to implement.
//!
//! ## Module structure
//!
//! - [`value_objects`]: `FileId`, `VariantId`, `Extension`
//! - [`cancellation`]: `CancellationToken`, polled at pipeline and cleanup
//!   suspension points
//! - [`pipeline`]: `Processor`, `ProcessorChain`, `ProcessingContext`
//! - [`repository`]: the `FileRepository` storage contract and `Resolution`
//! - [`transaction`]: batches adds/deletes into one committed unit
//! - [`error`]: `RepoError` and `ErrorAggregate`

pub mod cancellation;
pub mod error;
pub mod pipeline;
pub mod repository;
pub mod transaction;
pub mod value_objects;

pub use cancellation::CancellationToken;
pub use error::{ErrorAggregate, RepoError};
pub use pipeline::{BufferingPolicy, ProcessingContext, Processor, ProcessorChain};
pub use repository::{CleanupResolver, DeleteMode, FileRepository, ProcessorRegistry, Resolution, VariantOutcome};
pub use transaction::Transaction;
pub use value_objects::{Extension, FileId, FileIdGenerator, VariantId};
