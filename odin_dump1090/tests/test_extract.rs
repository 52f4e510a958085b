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

use std::time::Duration;
use serde_json::{json, Value};
use uom::si::{angle::degree, velocity::{foot_per_second,knot}};
use odin_dump1090::{AltitudeReport, EpochMillis, FeedEntry, TrackTable, errors::OdinDump1090Error, extract_update, process_snapshot};

const NOW: i64 = 1_753_227_400_000;

fn extract (value: &Value)->odin_dump1090::AircraftUpdate {
    let entry = FeedEntry::from_value( value).expect("entry is not an object");
    extract_update( &entry, EpochMillis::new(NOW)).expect("failed to extract update")
}

fn assert_close (a: f64, b: f64) {
    assert!( (a - b).abs() < 1e-6, "{a} != {b}");
}

// run with "cargo test test_full_entry -- --nocapture"
#[test]
fn test_full_entry () {
    let v = json!({
        "hex": "A12E80", "flight": "UAL814  ", "squawk": "3611", "category": " A3 ",
        "lat": 37.758, "lon": -119.932, "pos_seen": 1.5, "seen": 0.2,
        "alt_baro": 34000, "alt_geom": 35525, "baro_rate": -640, "gs": 439.9, "track": 170.6, "true_heading": 168.0
    });
    let update = extract( &v);
    println!("{update:?}");

    assert_eq!( update.icao24, "a12e80");
    assert_eq!( update.callsign, Some(Some("UAL814".to_string())));
    assert_eq!( update.squawk, Some(Some(3611)));
    assert_eq!( update.category, Some(Some("A3".to_string())));

    let pos = update.position.expect("no position");
    assert_close( pos.latitude, 37.758);
    assert_close( pos.longitude, -119.932);
    assert_eq!( pos.time, Some( EpochMillis::new( NOW - 1500)));

    assert_eq!( update.altitude, Some( AltitudeReport::Airborne(34000.0)));
    assert_close( update.vertical_rate.unwrap().get::<foot_per_second>(), -640.0 / 60.0);
    assert_close( update.speed.unwrap().get::<knot>(), 439.9);
    assert_close( update.course.unwrap().get::<degree>(), 170.6);
    assert_close( update.heading.unwrap().get::<degree>(), 168.0);
    assert_eq!( update.metadata_time, EpochMillis::new( NOW - 1500));
}

#[test]
fn test_altitude_fallback () {
    let update = extract( &json!({ "hex": "abc123", "alt_geom": "ground" }));
    assert_eq!( update.altitude, Some( AltitudeReport::OnGround));

    let update = extract( &json!({ "hex": "abc123", "alt_geom": 1000 }));
    assert_eq!( update.altitude, Some( AltitudeReport::Airborne(1000.0)));

    // higher priority source wins, even if it is the ground sentinel
    let update = extract( &json!({ "hex": "abc123", "alt_baro": "ground", "alt_geom": 1000 }));
    assert_eq!( update.altitude, Some( AltitudeReport::OnGround));

    let update = extract( &json!({ "hex": "abc123", "altitude": 5000, "alt_baro": 5100, "nav_altitude_mcp": 12000 }));
    assert_eq!( update.altitude, Some( AltitudeReport::Airborne(5000.0)));

    let update = extract( &json!({ "hex": "abc123", "nav_altitude_mcp": 12000 }));
    assert_eq!( update.altitude, Some( AltitudeReport::Airborne(12000.0)));

    let update = extract( &json!({ "hex": "abc123" }));
    assert_eq!( update.altitude, None);
}

#[test]
fn test_vertical_rate () {
    let update = extract( &json!({ "hex": "abc123", "baro_rate": 600 }));
    assert_close( update.vertical_rate.unwrap().get::<foot_per_second>(), 10.0);

    let update = extract( &json!({ "hex": "abc123", "vert_rate": 120, "baro_rate": 600, "geom_rate": 900 }));
    assert_close( update.vertical_rate.unwrap().get::<foot_per_second>(), 2.0);

    let update = extract( &json!({ "hex": "abc123", "geom_rate": -1200 }));
    assert_close( update.vertical_rate.unwrap().get::<foot_per_second>(), -20.0);

    assert!( extract( &json!({ "hex": "abc123" })).vertical_rate.is_none());
}

#[test]
fn test_speed_fallback () {
    let update = extract( &json!({ "hex": "abc123", "mach": 0.8 }));
    let spd = update.speed.unwrap().get::<knot>();
    println!("mach 0.8 = {spd} kn");
    assert_close( spd, 533.3912);

    let update = extract( &json!({ "hex": "abc123", "ias": 250, "mach": 0.8 }));
    assert_close( update.speed.unwrap().get::<knot>(), 250.0);

    let update = extract( &json!({ "hex": "abc123", "gs": 300, "tas": 280, "ias": 250 }));
    assert_close( update.speed.unwrap().get::<knot>(), 300.0);
}

#[test]
fn test_course_and_heading_diverge () {
    let v = json!({ "hex": "abc123", "track": 90.0, "mag_heading": 85.0 });
    let update = extract( &v);
    assert_close( update.course.unwrap().get::<degree>(), 90.0);
    assert_close( update.heading.unwrap().get::<degree>(), 85.0);

    // only a track: both are derived from it
    let update = extract( &json!({ "hex": "abc123", "track": 45.0 }));
    assert_close( update.course.unwrap().get::<degree>(), 45.0);
    assert_close( update.heading.unwrap().get::<degree>(), 45.0);

    let update = extract( &json!({ "hex": "abc123", "nav_heading": 270.0, "mag_heading": 265.0 }));
    assert_close( update.course.unwrap().get::<degree>(), 265.0);
    assert_close( update.heading.unwrap().get::<degree>(), 265.0);
}

#[test]
fn test_position () {
    // no age fields: position without timestamp, freshness is the receipt time
    let update = extract( &json!({ "hex": "abc123", "lat": 10.0, "lon": 20.0 }));
    let pos = update.position.unwrap();
    assert_eq!( pos.time, None);
    assert_eq!( update.metadata_time, EpochMillis::new(NOW));

    // seen is the fallback age
    let update = extract( &json!({ "hex": "abc123", "lat": 10.0, "lon": 20.0, "seen": 3 }));
    assert_eq!( update.position.unwrap().time, Some( EpochMillis::new( NOW - 3000)));
    assert_eq!( update.metadata_time, EpochMillis::new( NOW - 3000));

    // we need both coordinates
    assert!( extract( &json!({ "hex": "abc123", "lat": 10.0, "seen": 3 })).position.is_none());
    assert!( extract( &json!({ "hex": "abc123", "lon": 20.0 })).position.is_none());
    assert!( extract( &json!({ "hex": "abc123", "lat": 10.0, "lon": null })).position.is_none());
}

#[test]
fn test_present_keys_with_null_values () {
    let update = extract( &json!({ "hex": "abc123", "flight": null, "squawk": null, "category": "  " }));
    assert_eq!( update.callsign, Some(None));
    assert_eq!( update.squawk, Some(None));
    assert_eq!( update.category, Some(None));

    let update = extract( &json!({ "hex": "abc123" }));
    assert_eq!( update.callsign, None);
    assert_eq!( update.squawk, None);
    assert_eq!( update.category, None);
}

#[test]
fn test_unreadable_fields_are_absent () {
    let v = json!({ "hex": "abc123", "gs": "fast", "tas": 280, "alt_baro": true, "alt_geom": 3300, "squawk": "7x00" });
    let update = extract( &v);
    assert_close( update.speed.unwrap().get::<knot>(), 280.0);
    assert_eq!( update.altitude, Some( AltitudeReport::Airborne(3300.0)));
    assert_eq!( update.squawk, Some(None));
}

#[test]
fn test_invalid_entries () {
    let now = EpochMillis::new(NOW);

    for v in [json!({ "flight": "UAL814" }), json!({ "hex": 42 }), json!({ "hex": "  " }), json!({ "hex": null })] {
        let entry = FeedEntry::from_value( &v).unwrap();
        match extract_update( &entry, now) {
            Err(OdinDump1090Error::ParseError(msg)) => println!("rejected: {msg}"),
            other => panic!("entry should have been rejected: {other:?}")
        }
    }

    assert!( FeedEntry::from_value( &json!([1,2,3])).is_err());
}

#[test]
fn test_implausible_ages () {
    // out of range ages count as absent, the chain continues with the next source
    let update = extract( &json!({ "hex": "abc123", "lat": 10.0, "lon": 20.0, "pos_seen": -1e17, "seen": 2 }));
    assert_eq!( update.position.unwrap().time, Some( EpochMillis::new( NOW - 2000)));
    assert_eq!( update.metadata_time, EpochMillis::new( NOW - 2000));

    let update = extract( &json!({ "hex": "abc123", "seen": 1e300 }));
    assert_eq!( update.metadata_time, EpochMillis::new( NOW));

    let update = extract( &json!({ "hex": "abc123", "seen": "-1e17" }));
    assert_eq!( update.metadata_time, EpochMillis::new( NOW));

    // neither entry may take down the cycle
    let json = json!({ "aircraft": [ { "hex": "abc123", "seen": -1e17 }, { "hex": "def456", "gs": 100 } ] });
    let table = TrackTable::new();
    let stats = process_snapshot( &json, &table, EpochMillis::new(NOW), 16).unwrap();
    assert_eq!( stats.merged, 2);
    assert!( table.exists("abc123") && table.exists("def456"));
}

#[test]
fn test_epoch_arithmetic_saturates () {
    let t = EpochMillis::new( NOW);
    assert_eq!( t + Duration::MAX, EpochMillis::new( i64::MAX));
    assert_eq!( t - Duration::MAX, EpochMillis::new( NOW - i64::MAX));
    assert_eq!( EpochMillis::new( i64::MIN + 1) - Duration::from_millis(10), EpochMillis::new( i64::MIN));
    assert_eq!( t.minus_secs_f64( -1e17), EpochMillis::new( i64::MAX));
    assert_eq!( t.minus_secs_f64( 1.5), EpochMillis::new( NOW - 1500));
}
