// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The stages of one reconciliation, in execution order:
//! projection, storage, authentication, source, collection, packaging and upload.

pub mod auth;
pub mod collect;
pub mod package;
pub mod projector;
pub mod source;
pub mod storage;
pub mod upload;
