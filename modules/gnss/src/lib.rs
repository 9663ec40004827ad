// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! GNSS Modul for the position simulator
//!
//! Provides the positioning source interface and a simulated source whose
//! position is set by a simulation driver.

use common::position::PositionReading;

pub mod simulated_source;

/// The set of positioning methods a [`PositionSource`] is able to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositioningMethods(u8);

impl PositioningMethods {
    pub const NONE: PositioningMethods = PositioningMethods(0);
    pub const SATELLITE: PositioningMethods = PositioningMethods(0b01);
    pub const NON_SATELLITE: PositioningMethods = PositioningMethods(0b10);
    pub const ALL: PositioningMethods = PositioningMethods(0b11);

    /// Returns `true` if every method of `other` is part of this set.
    pub fn contains(&self, other: PositioningMethods) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Error state reported by a [`PositionSource`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PositionSourceError {
    // The source works as expected
    #[default]
    NoError,
    // The source is not allowed to access the positioning backend
    AccessError,
    // The connection to the positioning backend got closed
    ClosedError,
    // The source failed for a reason that isn't covered by the other errors
    UnknownSourceError,
    // A requested update wasn't answered in time
    UpdateTimeoutError,
}

/// Common interface that every position source must support.
///
/// Positions are pushed to consumers as
/// [`PositionUpdatedEvent`](module_core::EventKind::PositionUpdatedEvent)s on the
/// event bus the source was created with.
pub trait PositionSource {
    /// Name of the source, mainly used for logging.
    fn source_name(&self) -> &str;

    /// Requests an interval between two position updates in milliseconds.
    ///
    /// Requests below [`minimum_update_interval`](Self::minimum_update_interval)
    /// are ignored.
    fn set_update_interval(&self, msec: i32);

    /// Returns the configured interval between two position updates in milliseconds.
    fn update_interval(&self) -> i32;

    /// Returns the last position the source knows of.
    ///
    /// # Arguments
    ///
    /// * `from_satellite_positioning_methods_only` - Only consider fixes from satellite
    ///   positioning. Sources that only use one method may ignore it.
    fn last_known_position(
        &self,
        from_satellite_positioning_methods_only: bool,
    ) -> PositionReading;

    fn supported_positioning_methods(&self) -> PositioningMethods;

    /// Returns the smallest update interval in milliseconds the source supports.
    fn minimum_update_interval(&self) -> i32;

    fn error(&self) -> PositionSourceError;

    /// Starts pushing position updates to the consumers. Calling it while the
    /// updates are already running has no effect.
    fn start_updates(&self);

    /// Stops pushing position updates. Calling it while the updates are
    /// stopped has no effect.
    fn stop_updates(&self);

    /// Requests a single position update, independent of the running updates.
    ///
    /// # Arguments
    ///
    /// * `timeout_ms` - Time in milliseconds the source may take to provide the update.
    fn request_update(&self, timeout_ms: i32);
}
