// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Time-based access policy.
//!
//! Filtered content is blocked during working hours and allowed during the
//! weekday lunch window, from midday on Saturday, and all day Sunday.

use crate::models::PolicyState;
use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};

/// Local-time windows during which filtered content is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicySchedule {
    /// Weekday window start (inclusive)
    pub lunch_start: NaiveTime,
    /// Weekday window end (exclusive)
    pub lunch_end: NaiveTime,
    /// Saturday: allowed from this time until midnight
    pub saturday_free_from: NaiveTime,
}

impl Default for PolicySchedule {
    fn default() -> Self {
        Self {
            lunch_start: NaiveTime::from_hms_opt(11, 0, 0).unwrap_or_default(),
            lunch_end: NaiveTime::from_hms_opt(13, 0, 0).unwrap_or_default(),
            saturday_free_from: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
        }
    }
}

impl PolicySchedule {
    /// Desired policy state at the given local time.
    pub fn desired_state(&self, now: NaiveDateTime) -> PolicyState {
        let time = now.time();

        let allowed = match now.weekday() {
            Weekday::Sun => true,
            Weekday::Sat => time >= self.saturday_free_from,
            _ => self.lunch_start <= time && time < self.lunch_end,
        };

        if allowed {
            PolicyState::Allowed
        } else {
            PolicyState::Blocked
        }
    }
}
