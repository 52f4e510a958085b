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

//! mapping of loosely typed dump1090/readsb `aircraft.json` entries into normalized aircraft updates.
//!
//! Feed producers populate different subsets of near-synonymous fields. Each attribute therefore has an
//! ordered list of source fields of which the first one that is present (and readable) wins. Absence of a
//! source field is never an error - only an entry without a usable `hex` key is rejected.

use std::fmt;
use serde_json::{Map, Value};
use uom::si::{
    f64::{Angle,Velocity},
    angle::degree, velocity::{foot_per_second,knot}
};
use crate::{datetime::EpochMillis, track::{Position,normalize_key}};
use crate::errors::{Result,parse_error};

/// the altitude value feeds use to report aircraft on the ground
pub const GROUND: &str = "ground";

/// fixed conversion factor feeds use for Mach numbers (speed of sound at standard ISA altitude) 
pub const MACH_TO_KNOTS: f64 = 666.739;

pub const KEY_FIELD: &str = "hex";
pub const CALLSIGN_FIELD: &str = "flight";
pub const SQUAWK_FIELD: &str = "squawk";
pub const CATEGORY_FIELD: &str = "category";
pub const LAT_FIELD: &str = "lat";
pub const LON_FIELD: &str = "lon";
pub const MACH_FIELD: &str = "mach";

// the fallback chains (ordered, first present wins)
pub const AGE_SOURCES: [&str;2] = ["pos_seen", "seen"]; // seconds
pub const ALTITUDE_SOURCES: [&str;4] = ["altitude", "alt_baro", "alt_geom", "nav_altitude_mcp"]; // feet or GROUND
pub const VERTICAL_RATE_SOURCES: [&str;3] = ["vert_rate", "baro_rate", "geom_rate"]; // feet per minute
pub const COURSE_SOURCES: [&str;4] = ["track", "true_heading", "mag_heading", "nav_heading"]; // degrees
pub const HEADING_SOURCES: [&str;4] = ["true_heading", "mag_heading", "nav_heading", "track"]; // degrees
pub const SPEED_SOURCES: [&str;3] = ["gs", "tas", "ias"]; // knots, followed by MACH_FIELD

/// ages beyond this (in either direction) are not plausible for a live feed and count as absent
pub const MAX_AGE_SECS: f64 = 86_400.0;

/// a single raw feed entry with typed accessors that treat `null` and unreadable values as absent
#[derive(Debug,Clone,Copy)]
pub struct FeedEntry<'a> {
    fields: &'a Map<String,Value>
}

impl<'a> FeedEntry<'a> {
    pub fn new (fields: &'a Map<String,Value>)->Self { FeedEntry { fields } }

    pub fn from_value (value: &'a Value)->Result<Self> {
        value.as_object()
            .map( FeedEntry::new)
            .ok_or_else( || parse_error!( "aircraft entry is not an object: {value}"))
    }

    /// the key exists in the entry, regardless of its value
    pub fn has_key (&self, name: &str)->bool { self.fields.contains_key(name) }

    pub fn value (&self, name: &str)->Option<&'a Value> {
        self.fields.get(name).filter( |v| !v.is_null())
    }

    pub fn is_present (&self, name: &str)->bool { self.value(name).is_some() }

    pub fn str_field (&self, name: &str)->Option<&'a str> {
        self.value(name).and_then( Value::as_str)
    }

    /// numeric strings are accepted since some feeds quote numbers
    pub fn f64_field (&self, name: &str)->Option<f64> {
        match self.value(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter( |v| v.is_finite()),
            _ => None
        }
    }

    /// squawk codes are usually reported as strings ("7000")
    pub fn u32_field (&self, name: &str)->Option<u32> {
        match self.value(name)? {
            Value::Number(n) => n.as_u64().and_then( |v| u32::try_from(v).ok()),
            Value::String(s) => s.trim().parse::<u32>().ok(),
            _ => None
        }
    }

    pub fn first_f64 (&self, names: &[&str])->Option<f64> {
        names.iter().find_map( |name| self.f64_field(name))
    }

    /// the first altitude source that is either the GROUND sentinel or a number
    pub fn first_altitude (&self, names: &[&str])->Option<AltitudeReport> {
        names.iter().find_map( |name| {
            if self.str_field(name).is_some_and( |s| s.trim() == GROUND) {
                Some(AltitudeReport::OnGround)
            } else {
                self.f64_field(name).map( AltitudeReport::Airborne)
            }
        })
    }

    /// absolute time derived from the first age (seconds) source
    pub fn time_from_age (&self, now: EpochMillis)->Option<EpochMillis> {
        AGE_SOURCES.iter()
            .filter_map( |name| self.f64_field(name))
            .find( |age| age.abs() <= MAX_AGE_SECS)
            .map( |age| now.minus_secs_f64(age))
    }
}

impl<'a> fmt::Display for FeedEntry<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_string( self.fields).map_err( |_| fmt::Error)?;
        write!( f, "{s}")
    }
}

#[derive(Debug,Clone,Copy,PartialEq)]
pub enum AltitudeReport {
    OnGround,
    Airborne(f64) // feet
}

/// the normalized attribute set of one feed entry. `None` means the feed did not have the attribute, i.e. the
/// respective aircraft field is left unchanged. The outer Option of callsign, squawk and category reflects
/// if the key was in the entry at all - if it was, the aircraft field is overwritten even if the value is null
#[derive(Debug,Clone,PartialEq)]
pub struct AircraftUpdate {
    pub icao24: String,

    pub callsign: Option<Option<String>>,
    pub squawk: Option<Option<u32>>,
    pub category: Option<Option<String>>,

    pub position: Option<Position>,
    pub altitude: Option<AltitudeReport>,
    pub vertical_rate: Option<Velocity>,
    pub course: Option<Angle>,
    pub heading: Option<Angle>,
    pub speed: Option<Velocity>,

    pub metadata_time: EpochMillis,
}

/// extract the normalized attribute set from a feed entry that was received at `now`
pub fn extract_update (entry: &FeedEntry, now: EpochMillis)->Result<AircraftUpdate> {
    let icao24 = match entry.str_field( KEY_FIELD).map( normalize_key) {
        Some(key) if !key.is_empty() => key,
        _ => return Err( parse_error!( "no valid \"{KEY_FIELD}\" in aircraft entry: {entry}"))
    };

    let callsign = optional_text( entry, CALLSIGN_FIELD);
    let squawk = entry.has_key( SQUAWK_FIELD).then( || entry.u32_field( SQUAWK_FIELD));
    let category = optional_text( entry, CATEGORY_FIELD);

    let position = match (entry.f64_field( LAT_FIELD), entry.f64_field( LON_FIELD)) {
        (Some(lat), Some(lon)) => Some( Position::new( lat, lon, entry.time_from_age( now))),
        _ => None
    };

    let altitude = entry.first_altitude( &ALTITUDE_SOURCES);

    let vertical_rate = entry.first_f64( &VERTICAL_RATE_SOURCES)
        .map( |fpm| Velocity::new::<foot_per_second>( fpm / 60.0));

    let course = entry.first_f64( &COURSE_SOURCES).map( Angle::new::<degree>);
    let heading = entry.first_f64( &HEADING_SOURCES).map( Angle::new::<degree>);

    let speed = entry.first_f64( &SPEED_SOURCES)
        .or_else( || entry.f64_field( MACH_FIELD).map( |mach| mach * MACH_TO_KNOTS))
        .map( Velocity::new::<knot>);

    // entries without any age information count as fresh at the time we received them
    let metadata_time = entry.time_from_age( now).unwrap_or( now);

    Ok( AircraftUpdate { icao24, callsign, squawk, category, position, altitude, vertical_rate, course, heading, speed, metadata_time })
}

fn optional_text (entry: &FeedEntry, name: &str)->Option<Option<String>> {
    entry.has_key(name).then( || {
        entry.str_field(name)
            .map( str::trim)
            .filter( |s| !s.is_empty())
            .map( str::to_string)
    })
}
