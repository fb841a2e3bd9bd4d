// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! evoseal-adapters: the component adapter contract and its two
//! concrete families — in-process `LocalAdapter` and HTTP `RemoteAdapter` —
//! over the closed set of recognized `(componentType, operation)` pairs
//! (`dgm`, `openevolve`, `seal`). Neither the worker logic itself nor the
//! orchestrator that registers these adapters lives here; this
//! crate only owns the uniform lifecycle + request/response boundary.

pub mod adapter;
pub mod error;
pub mod local;
pub mod operation;
pub mod remote;
pub mod transport;

pub use adapter::ComponentAdapter;
pub use error::AdapterError;
pub use local::{ComponentWorker, LocalAdapter};
pub use operation::{ArchiveUpdate, DgmOperation, EvolveRequest, Operation, OpenEvolveOperation, SealOperation};
pub use remote::RemoteAdapter;
pub use transport::{JobStatus, JobTransport, RemoteConfig, ReqwestTransport};

#[cfg(any(test, feature = "test-support"))]
pub use transport::fake::FakeTransport;
