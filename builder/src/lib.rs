// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The engine's build driver: keeps itself fresh via the self-rebuild
//! bootstrapper, compiles stale shaders, links the engine, and orchestrates
//! the child processes doing the actual work. All operating-system access
//! goes through [`host_abstraction_layer::Host`], so everything here can be
//! exercised against the in-memory [`test_host::TestHost`].

pub mod arena;
pub mod batch;
pub mod cli;
pub mod command;
pub mod driver;
pub mod fsops;
pub mod rebuild;
pub mod test_host;
pub mod text;
