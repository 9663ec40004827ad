// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the position simulator
//!
//! Provides the common data types that are used across every modul.

pub mod position;
pub mod serde;
pub mod test_helper;
pub mod wall_clock;
