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

//! client for the `aircraft.json` HTTP endpoint of dump1090 / readsb / tar1090 ADS-B receivers.
//! Each poll returns a full snapshot of all currently seen aircraft as `{"now": .., "aircraft": [{..},..]}`

use std::{sync::Arc, time::Duration};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Serialize,Deserialize};
use serde_json::Value;
use tokio::{task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::{
    client::{ClientStatus,ClientType,FeedClient},
    datetime::{EpochMillis,millis,secs},
    errors::{Result,config_error,op_failed,parse_error},
    extract::{FeedEntry,extract_update},
    merge::merge_update,
    track::TrackTable,
};

/// the top level snapshot field that holds the aircraft entries
pub const AIRCRAFT_FIELD: &str = "aircraft";

pub const DEFAULT_POLL_INTERVAL: Duration = millis(5000);

fn default_poll_interval ()->Duration { DEFAULT_POLL_INTERVAL }
fn default_request_timeout ()->Duration { secs(5) }
fn default_max_trace ()->usize { 64 }

#[derive(Deserialize,Serialize,Debug,Clone)]
pub struct Dump1090Config {
    pub name: String, // human readable client name used in logs
    pub url: String, // of the aircraft.json endpoint, e.g. "http://localhost:8080/data/aircraft.json"

    #[serde(default="default_poll_interval")]
    pub poll_interval: Duration,

    #[serde(default="default_request_timeout")]
    pub request_timeout: Duration, // so that a hanging receiver can't stall the loop (and stop) indefinitely

    #[serde(default="default_max_trace")]
    pub max_trace: usize, // max number of trace (last trajectory) points to keep per aircraft
}

impl Dump1090Config {
    pub fn new (name: impl ToString, url: impl ToString)->Self {
        Dump1090Config {
            name: name.to_string(),
            url: url.to_string(),
            poll_interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
            max_trace: default_max_trace(),
        }
    }

    /// the max age of the last successful fetch before we consider the feed stalled
    pub fn health_timeout (&self)->Duration { self.poll_interval * 2 }
}

/// outcome of processing one snapshot
#[derive(Debug,Default,Clone,Copy,PartialEq,Eq)]
pub struct CycleStats {
    pub merged: usize,
    pub failed: usize,
}

/// the feed client. Constructed with a config and the shared track table, polling starts with `start()`
pub struct Dump1090JsonReader {
    config: Arc<Dump1090Config>,
    url: Option<Url>, // None if the configured url is invalid
    table: TrackTable,
    status: Arc<ClientStatus>,
    span: Span,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Dump1090JsonReader {
    pub fn new (config: Dump1090Config, table: TrackTable)->Self {
        let span = info_span!( "dump1090", client = %config.name);

        let url = match parse_url( &config.url) {
            Ok(url) => Some(url),
            Err(e) => {
                span.in_scope( || error!("{} client could not be configured: {e}", config.name));
                None
            }
        };

        let status = Arc::new( ClientStatus::new( &config.name, ClientType::Adsb, config.health_timeout()));
        let config = Arc::new( config);

        Dump1090JsonReader { config, url, table, status, span, cancel: CancellationToken::new(), task: None }
    }

    pub fn config (&self)->&Dump1090Config { &self.config }
    pub fn url (&self)->Option<&Url> { self.url.as_ref() }
    pub fn table (&self)->&TrackTable { &self.table }

    pub fn is_running (&self)->bool {
        self.task.as_ref().is_some_and( |task| !task.is_finished())
    }
}

#[async_trait]
impl FeedClient for Dump1090JsonReader {
    fn name (&self)->&str { self.config.name.as_str() }
    fn client_type (&self)->ClientType { ClientType::Adsb }
    fn timeout (&self)->Duration { self.status.timeout() }
    fn status (&self)->&ClientStatus { &self.status }
    fn span (&self)->&Span { &self.span }

    async fn start (&mut self)->Result<()> {
        if self.is_running() {
            return Ok(())
        }
        if let Some(task) = self.task.take() { // poll task ended without a stop, reap it before restarting
            if let Err(e) = task.await {
                self.span.in_scope( || warn!("previous poll task of {} failed: {e}", self.config.name));
            }
        }

        let Some(url) = self.url.clone() else {
            let e = config_error!( "{} has no valid URL, not starting", self.config.name);
            self.span.in_scope( || error!("{e}"));
            return Err(e)
        };

        let http = Client::builder().timeout( self.config.request_timeout).build()?;
        self.cancel = CancellationToken::new(); // we might get restarted after a stop

        let poll_loop = run_poll_loop( 
            http, url, self.table.clone(), self.status.clone(), self.config.clone(), self.cancel.clone()
        );

        self.status.set_online( true);
        self.task = Some( tokio::spawn( poll_loop.instrument( self.span.clone())));
        Ok(())
    }

    async fn stop (&mut self)->Result<()> {
        self.status.set_online( false);
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            task.await.map_err( |e| op_failed!( "poll task of {} did not terminate cleanly: {e}", self.config.name))?;
        }
        Ok(())
    }
}

impl Drop for Dump1090JsonReader {
    fn drop (&mut self) {
        self.cancel.cancel(); // the task must not outlive its client
    }
}

fn parse_url (url: &str)->Result<Url> {
    let parsed = Url::parse( url).map_err( |e| config_error!( "{url} is an invalid URL: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err( config_error!( "{url} is not an http(s) URL (scheme {scheme})"))
    }
}

/// the background task. Cycles never overlap and the wait is the only point where we check for cancellation.
/// There is no backoff - a failed cycle is just retried after the normal interval
async fn run_poll_loop (http: Client, url: Url, table: TrackTable, status: Arc<ClientStatus>, config: Arc<Dump1090Config>, cancel: CancellationToken) {
    info!("start polling {url} every {:?}", config.poll_interval);

    loop {
        match fetch_cycle( &http, &url, &table, &status, config.max_trace).await {
            Ok(stats) => debug!( merged = stats.merged, failed = stats.failed, "processed snapshot"),
            Err(e) => warn!("exception reading dump1090 JSON data from {url}: {e}")
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = sleep( config.poll_interval) => {}
        }
    }

    info!("stopped polling {url}");
}

/// one fetch from the receiver. Liveness is updated as soon as we have a parsed response, i.e. independent of
/// whether individual entries can be processed
pub async fn fetch_cycle (http: &Client, url: &Url, table: &TrackTable, status: &ClientStatus, max_trace: usize)->Result<CycleStats> {
    let response = http.get( url.clone()).send().await?.error_for_status()?;
    let body = response.bytes().await?;
    let json: Value = serde_json::from_slice( &body)?;

    let now = status.update_packet_received_time();
    process_snapshot( &json, table, now, max_trace)
}

/// merge all entries of a parsed snapshot that was received at `now`. Entries that can't be processed are
/// logged and skipped, they never abort the cycle
pub fn process_snapshot (json: &Value, table: &TrackTable, now: EpochMillis, max_trace: usize)->Result<CycleStats> {
    let mut stats = CycleStats::default();

    match json.get( AIRCRAFT_FIELD) {
        None | Some(Value::Null) => Ok(stats),
        Some(Value::Array(entries)) => {
            for value in entries {
                match process_entry( value, table, now, max_trace) {
                    Ok(_) => stats.merged += 1,
                    Err(e) => {
                        stats.failed += 1;
                        error!("exception reading data for an aircraft: {e}");
                    }
                }
            }
            Ok(stats)
        }
        Some(_) => Err( parse_error!( "\"{AIRCRAFT_FIELD}\" is not an array"))
    }
}

fn process_entry (value: &Value, table: &TrackTable, now: EpochMillis, max_trace: usize)->Result<()> {
    let entry = FeedEntry::from_value( value)?;
    let update = extract_update( &entry, now)?;
    merge_update( table, &update, max_trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::{millis, secs};

    // run with "cargo test test_restart_after_task_ended -- --nocapture"
    #[tokio::test]
    async fn test_restart_after_task_ended () {
        let mut config = Dump1090Config::new( "restart", "http://127.0.0.1:9/data/aircraft.json");
        config.poll_interval = secs(30);
        config.request_timeout = millis(200);
        let mut reader = Dump1090JsonReader::new( config, TrackTable::new());

        reader.start().await.unwrap();
        assert!( reader.is_running());

        // end the poll task behind the reader's back
        reader.cancel.cancel();
        for _ in 0..50 {
            if !reader.is_running() { break }
            sleep( millis(20)).await;
        }
        assert!( !reader.is_running());
        assert!( reader.task.is_some());

        reader.start().await.unwrap();
        assert!( reader.is_running());
        assert!( reader.is_online());

        reader.stop().await.unwrap();
        assert!( !reader.is_running());
    }
}
