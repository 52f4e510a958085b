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

//! ingestion of ADS-B aircraft data from the JSON HTTP endpoint of dump1090 / readsb receivers into a
//! [track::TrackTable] that is shared with other feed clients of the application.
//!
//! Data flows one way: HTTP snapshot -> [extract] (normalized attributes) -> [merge] (sparse update of the
//! aircraft in the table). [dump1090::Dump1090JsonReader] owns the background poll task and implements the
//! [client::FeedClient] lifecycle.

use std::path::Path;

pub mod datetime;
pub mod errors;
pub mod track;
pub mod extract;
pub mod merge;
pub mod client;
pub mod dump1090;

pub use datetime::EpochMillis;
pub use track::{Aircraft,Position,TrackTable};
pub use extract::{AircraftUpdate,AltitudeReport,FeedEntry,extract_update};
pub use merge::merge_update;
pub use client::{ClientStatus,ClientType,FeedClient};
pub use dump1090::{CycleStats,Dump1090Config,Dump1090JsonReader,fetch_cycle,process_snapshot};

use crate::errors::Result;

/// load a RON config (e.g. a [Dump1090Config]) from the given path
pub fn load_config_path<C,P> (path: P)->Result<C> where C: for <'a> serde::Deserialize<'a>, P: AsRef<Path> {
    let data = std::fs::read( path.as_ref())?;
    Ok( ron::de::from_bytes( data.as_slice())? )
}
