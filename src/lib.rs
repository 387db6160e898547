// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod collaborators;
pub mod collector;
pub mod config;
pub mod constants;
pub mod dirconfig;
pub mod error;
pub mod kubernetes;
pub mod packaging;
pub mod pipeline;
pub mod reconcilers;
pub mod scheduler;
pub mod sources;
pub mod stages;
pub mod transport;
pub mod types;

#[cfg(test)]
pub mod test_utils;
