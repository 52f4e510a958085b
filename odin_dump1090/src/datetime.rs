/*
 * Copyright © 2025, United States Government, as represented by the Administrator of 
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License"); 
 * you may not use this file except in compliance with the License. You may obtain a copy 
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::{fmt, time::Duration};
use chrono::{DateTime, Utc};
use serde::{Serialize,Deserialize};

/// UTC epoch milliseconds. This is what we store for liveness and freshness timestamps since it fits
/// into an `AtomicI64`
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq,PartialOrd,Ord,Hash)]
pub struct EpochMillis(i64);

impl EpochMillis {
    pub fn now ()->Self { EpochMillis( Utc::now().timestamp_millis()) }

    pub fn new (millis: i64)->Self { EpochMillis(millis) }

    pub fn millis (&self)->i64 { self.0 }

    /// the instant `age` seconds before self (feeds report age as fractional seconds)
    pub fn minus_secs_f64 (&self, age: f64)->Self {
        EpochMillis( self.0.saturating_sub( (age * 1000.0) as i64)) // float->int casts saturate
    }

    pub fn elapsed_since (&self, earlier: EpochMillis)->Duration {
        if self.0 > earlier.0 { millis( (self.0 - earlier.0) as u64) } else { Duration::ZERO }
    }
}

impl fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp_millis(self.0) {
            Some(date) => write!(f, "{}", date.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.0)
        }
    }
}

impl From<DateTime<Utc>> for EpochMillis {
    fn from (date: DateTime<Utc>)->Self { EpochMillis( date.timestamp_millis()) }
}

impl std::ops::Add<Duration> for EpochMillis {
    type Output = EpochMillis;
    fn add (self, dur: Duration)->Self { EpochMillis( self.0.saturating_add( duration_millis(dur))) }
}

impl std::ops::Sub<Duration> for EpochMillis {
    type Output = EpochMillis;
    fn sub (self, dur: Duration)->Self { EpochMillis( self.0.saturating_sub( duration_millis(dur))) }
}

fn duration_millis (dur: Duration)->i64 {
    i64::try_from( dur.as_millis()).unwrap_or( i64::MAX)
}

#[inline] pub const fn millis (n: u64)->Duration { Duration::from_millis(n) }
#[inline] pub const fn secs (n: u64)->Duration { Duration::from_secs(n) }
