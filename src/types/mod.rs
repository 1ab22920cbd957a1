// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resources observed by the wait helpers.

pub mod driver;

pub use driver::NvidiaDriver;
