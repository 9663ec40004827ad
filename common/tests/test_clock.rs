// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{TimeDelta, Utc};
use common::test_helper::test_clock::TestClock;
use common::wall_clock::{SystemClock, WallClock};

#[test]
pub fn test_clock_is_shared_between_clones() {
    let clock = TestClock::default();
    let moved_clock: Box<dyn WallClock> = Box::new(clock.clone());
    let time = Utc::now() + TimeDelta::hours(2);

    clock.set_time(time);

    assert_eq!(moved_clock.now(), time);
}

#[test]
pub fn system_clock_reports_current_time() {
    let before = Utc::now();
    let now = SystemClock::new().now();
    assert!(now >= before);
}
