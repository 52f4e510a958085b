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

use uom::si::{f64::Length, length::foot};
use crate::{
    extract::{AircraftUpdate,AltitudeReport},
    track::{Aircraft,TrackTable}
};

impl AircraftUpdate {

    /// sparse update - only attributes that were in the feed entry are set
    pub fn apply_to (&self, ac: &mut Aircraft) {
        if let Some(callsign) = &self.callsign { ac.set_callsign( callsign.clone()); }
        if let Some(squawk) = self.squawk { ac.set_squawk( squawk); }
        if let Some(category) = &self.category { ac.set_category( category.clone()); }

        if let Some(pos) = &self.position { ac.add_position( pos.clone()); }

        match self.altitude {
            Some(AltitudeReport::OnGround) => ac.set_altitude( Length::new::<foot>(0.0), true),
            Some(AltitudeReport::Airborne(alt)) => ac.set_altitude( Length::new::<foot>(alt), false),
            None => {}
        }

        if let Some(vr) = self.vertical_rate { ac.set_vertical_rate( vr); }
        if let Some(course) = self.course { ac.set_course( course); }
        if let Some(heading) = self.heading { ac.set_heading( heading); }
        if let Some(speed) = self.speed { ac.set_speed( speed); }

        ac.update_metadata_time( self.metadata_time);
    }
}

/// look up or create the aircraft for this update and apply it. Returns true if the aircraft was new.
/// Existing entries are never removed or replaced
pub fn merge_update (table: &TrackTable, update: &AircraftUpdate, max_trace: usize)->bool {
    let mut created = false;
    table.update_or_insert( 
        update.icao24.as_str(),
        |icao24| { created = true; Aircraft::new( icao24, max_trace) },
        |ac| update.apply_to( ac)
    );
    created
}
