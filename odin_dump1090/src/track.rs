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

use std::{collections::VecDeque, fmt, sync::Arc, time::Duration};
use dashmap::{DashMap, mapref::one::Ref};
use uom::si::{
    f64::{Angle,Length,Velocity},
    angle::degree, length::foot, velocity::{foot_per_second,knot}
};
use crate::datetime::EpochMillis;

/// max interval in which we consider two fixes to be the same report (and hence replace instead of append)
const SAME_FIX_MILLIS: i64 = 800;

#[derive(Debug,Clone,PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub time: Option<EpochMillis>, // None if the feed did not tell us how old the fix is
}

impl Position {
    pub fn new (latitude: f64, longitude: f64, time: Option<EpochMillis>)->Self {
        Position { latitude, longitude, time }
    }

    fn is_same_fix (&self, other: &Position)->bool {
        match (self.time, other.time) {
            (Some(t0), Some(t1)) => (t1.millis() - t0.millis()).abs() < SAME_FIX_MILLIS,
            _ => self.latitude == other.latitude && self.longitude == other.longitude
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "({:.5},{:.5})", self.latitude, self.longitude)?;
        if let Some(t) = self.time { write!( f, "@{t}")?; }
        Ok(())
    }
}

/// the data model for a tracked aircraft. All attributes besides the key are optional since feeds only report
/// what they have seen so far
#[derive(Debug,Clone)]
pub struct Aircraft {
    pub icao24: Arc<String>, // we keep that in an Arc so that we can clone without heap allocation
    pub callsign: Option<String>,
    pub squawk: Option<u32>,
    pub category: Option<String>,

    pub positions: VecDeque<Position>, // used as a ringbuffer to keep the trace
    max_trace: usize,

    pub altitude: Option<Length>,
    pub on_ground: Option<bool>,
    pub vertical_rate: Option<Velocity>,
    pub course: Option<Angle>,
    pub heading: Option<Angle>,
    pub speed: Option<Velocity>,

    pub metadata_time: Option<EpochMillis>,
}

impl Aircraft {
    pub fn new (icao24: String, max_trace: usize)->Self {
        let max_trace = max_trace.max(1);
        Aircraft {
            icao24: Arc::new(icao24),
            callsign: None,
            squawk: None,
            category: None,
            positions: VecDeque::with_capacity(max_trace),
            max_trace,
            altitude: None,
            on_ground: None,
            vertical_rate: None,
            course: None,
            heading: None,
            speed: None,
            metadata_time: None,
        }
    }

    pub fn last_position (&self)->Option<&Position> { self.positions.back() }

    /// the time of our last information about this aircraft, which is either the metadata or the last position time
    pub fn last_update (&self)->Option<EpochMillis> {
        let pos_time = self.last_position().and_then( |p| p.time);
        match (self.metadata_time, pos_time) {
            (Some(t0), Some(t1)) => Some( t0.max(t1)),
            (t0, t1) => t0.or(t1)
        }
    }

    pub fn set_callsign (&mut self, callsign: Option<String>) { self.callsign = callsign; }
    pub fn set_squawk (&mut self, squawk: Option<u32>) { self.squawk = squawk; }
    pub fn set_category (&mut self, category: Option<String>) { self.category = category; }

    pub fn set_altitude (&mut self, altitude: Length, on_ground: bool) {
        self.altitude = Some(altitude);
        self.on_ground = Some(on_ground);
    }

    pub fn set_vertical_rate (&mut self, vertical_rate: Velocity) { self.vertical_rate = Some(vertical_rate); }
    pub fn set_course (&mut self, course: Angle) { self.course = Some(course); }
    pub fn set_heading (&mut self, heading: Angle) { self.heading = Some(heading); }
    pub fn set_speed (&mut self, speed: Velocity) { self.speed = Some(speed); }

    /// append to the trace, replacing the last entry if this is (almost) the same report so that we don't fill up
    /// the ringbuffer with duplicates of a snapshot we have already seen
    pub fn add_position (&mut self, pos: Position) {
        if let Some(last) = self.positions.back() {
            if last.is_same_fix( &pos) {
                self.positions.pop_back();
            }
        }
        if self.positions.len() >= self.max_trace {
            self.positions.pop_front();
        }
        self.positions.push_back(pos);
    }

    /// freshness only moves forward
    pub fn update_metadata_time (&mut self, time: EpochMillis) {
        if self.metadata_time.map_or( true, |t| time > t) {
            self.metadata_time = Some(time);
        }
    }
}

impl fmt::Display for Aircraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Aircraft( icao24: {}", self.icao24)?;
        if let Some(cs) = &self.callsign { write!( f, ", cs: \"{cs}\"")?; }
        if let Some(sq) = self.squawk { write!( f, ", squawk: {sq:04}")?; }
        if let Some(cat) = &self.category { write!( f, ", cat: {cat}")?; }
        if let Some(p) = self.last_position() { write!( f, ", pos: {p}")?; }
        if self.positions.len() > 1 { write!( f, ", n_pos: {}", self.positions.len())?; }
        if let Some(alt) = self.altitude { write!( f, ", alt: {:.0}", alt.get::<foot>())?; }
        if self.on_ground == Some(true) { write!( f, ", on_ground")?; }
        if let Some(vr) = self.vertical_rate { write!( f, ", vr: {:.1}", vr.get::<foot_per_second>())?; }
        if let Some(crs) = self.course { write!( f, ", crs: {:.0}", crs.get::<degree>())?; }
        if let Some(hdg) = self.heading { write!( f, ", hdg: {:.0}", hdg.get::<degree>())?; }
        if let Some(spd) = self.speed { write!( f, ", spd: {:.1}", spd.get::<knot>())?; }
        if let Some(t) = self.metadata_time { write!( f, ", time: {t}")?; }
        write!( f, ")")
    }
}

/// normalized entity key - feeds are not consistent in their use of upper/lower case hex digits
pub fn normalize_key (key: &str)->String {
    key.trim().to_ascii_lowercase()
}

/// the shared table of tracked aircraft. Clones are cheap and refer to the same table, which is written
/// concurrently by all feed clients of an application. Locking is per shard of the underlying map, i.e.
/// updates of different keys don't block each other and updates of the same key are serialized
#[derive(Debug,Clone,Default)]
pub struct TrackTable {
    aircraft: Arc<DashMap<String,Aircraft>>,
}

impl TrackTable {
    pub fn new ()->Self { TrackTable { aircraft: Arc::new( DashMap::new()) } }

    pub fn exists (&self, key: &str)->bool {
        self.aircraft.contains_key( normalize_key(key).as_str())
    }

    /// note the returned ref holds a read lock on the respective shard - don't keep it around
    pub fn get (&self, key: &str)->Option<Ref<'_,String,Aircraft>> {
        self.aircraft.get( normalize_key(key).as_str())
    }

    /// insert if absent. Existing entities are never replaced, in which case this returns false
    pub fn insert (&self, key: &str, aircraft: Aircraft)->bool {
        let mut inserted = false;
        self.aircraft.entry( normalize_key(key)).or_insert_with( || { inserted = true; aircraft });
        inserted
    }

    /// atomically (for the given key) look up or create the entity and then run `f` on it
    pub fn update_or_insert<C,F,R> (&self, key: &str, create: C, f: F)->R
        where C: FnOnce(String)->Aircraft, F: FnOnce(&mut Aircraft)->R
    {
        let key = normalize_key(key);
        let mut e = self.aircraft.entry( key.clone()).or_insert_with( || create(key));
        f( e.value_mut())
    }

    pub fn len (&self)->usize { self.aircraft.len() }
    pub fn is_empty (&self)->bool { self.aircraft.is_empty() }

    pub fn keys (&self)->Vec<String> {
        let mut keys: Vec<String> = self.aircraft.iter().map( |e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn for_each<F> (&self, mut f: F) where F: FnMut(&Aircraft) {
        for e in self.aircraft.iter() {
            f( e.value())
        }
    }

    /// drop all aircraft we haven't heard about within `drop_after`, returning the dropped keys.
    /// Aircraft without any timestamp are kept
    pub fn remove_stale (&self, drop_after: Duration)->Vec<Arc<String>> {
        let cutoff = EpochMillis::now() - drop_after;
        let mut dropped = Vec::new();

        self.aircraft.retain( |_,ac| {
            match ac.last_update() {
                Some(t) if t < cutoff => { dropped.push( ac.icao24.clone()); false }
                _ => true
            }
        });

        dropped
    }
}
