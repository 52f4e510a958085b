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

use std::{fmt, sync::atomic::{AtomicBool,AtomicI64,Ordering}, time::Duration};
use async_trait::async_trait;
use serde::{Serialize,Deserialize};
use tracing::Span;
use crate::{datetime::EpochMillis, errors::Result};

/// the kind of feed a client reads. This is what the application uses to group clients
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum ClientType {
    Adsb,
    Mlat,
    Ais,
    Aprs,
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClientType::Adsb => "ADS-B",
            ClientType::Mlat => "MLAT",
            ClientType::Ais => "AIS",
            ClientType::Aprs => "APRS",
        };
        write!( f, "{s}")
    }
}

/// liveness state of a client. This is shared between the client and its background task, hence the atomics.
/// Note that `online` only means the client was started - if it actually delivers data is `is_healthy()`
#[derive(Debug)]
pub struct ClientStatus {
    name: String,
    client_type: ClientType,
    timeout: Duration,
    online: AtomicBool,
    last_packet: AtomicI64, // epoch millis, 0 if we never received anything
}

impl ClientStatus {
    pub fn new (name: impl ToString, client_type: ClientType, timeout: Duration)->Self {
        ClientStatus {
            name: name.to_string(),
            client_type,
            timeout,
            online: AtomicBool::new(false),
            last_packet: AtomicI64::new(0),
        }
    }

    pub fn name (&self)->&str { self.name.as_str() }
    pub fn client_type (&self)->ClientType { self.client_type }
    pub fn timeout (&self)->Duration { self.timeout }

    pub fn is_online (&self)->bool { self.online.load( Ordering::Relaxed) }
    pub fn set_online (&self, online: bool) { self.online.store( online, Ordering::Relaxed); }

    /// called once per successful fetch. Returns the receipt time that was recorded
    pub fn update_packet_received_time (&self)->EpochMillis {
        let now = EpochMillis::now();
        self.set_packet_received_time( now);
        now
    }

    pub fn set_packet_received_time (&self, time: EpochMillis) {
        self.last_packet.store( time.millis(), Ordering::Relaxed);
    }

    pub fn last_packet_received (&self)->Option<EpochMillis> {
        match self.last_packet.load( Ordering::Relaxed) {
            0 => None,
            millis => Some( EpochMillis::new(millis))
        }
    }

    pub fn is_healthy_at (&self, now: EpochMillis)->bool {
        self.is_online() && self.last_packet_received().is_some_and( |t| now.elapsed_since(t) <= self.timeout)
    }

    pub fn is_healthy (&self)->bool { self.is_healthy_at( EpochMillis::now()) }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "{} [{}]: ", self.name, self.client_type)?;
        if !self.is_online() {
            write!( f, "offline")
        } else if self.is_healthy() {
            write!( f, "healthy")
        } else {
            match self.last_packet_received() {
                Some(t) => write!( f, "stale since {t}"),
                None => write!( f, "no data yet")
            }
        }
    }
}

/// the uniform interface of all feed clients that write into a shared [crate::TrackTable].
/// External health monitors use `timeout()` together with `last_packet_received()` to detect stalled feeds
#[async_trait]
pub trait FeedClient: Send {
    fn name (&self)->&str;
    fn client_type (&self)->ClientType;

    /// begin reading the feed. This does not wait for the first data
    async fn start (&mut self)->Result<()>;

    /// signal termination and wait until the background task has finished
    async fn stop (&mut self)->Result<()>;

    fn timeout (&self)->Duration;

    fn status (&self)->&ClientStatus;

    /// the logging context of this client (all logging of its background task happens within this span)
    fn span (&self)->&Span;

    fn is_online (&self)->bool { self.status().is_online() }
    fn is_healthy (&self)->bool { self.status().is_healthy() }
    fn last_packet_received (&self)->Option<EpochMillis> { self.status().last_packet_received() }
}
