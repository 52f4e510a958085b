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
use anyhow::Result;
use clap::Parser;
use lazy_static::lazy_static;
use tokio::time::interval;
use tracing::{error,info};
use tracing_subscriber::EnvFilter;
use odin_dump1090::{load_config_path, Dump1090Config, Dump1090JsonReader, FeedClient, TrackTable};

/// poll dump1090/readsb aircraft.json endpoints and periodically print the merged track table
#[derive(Parser)]
#[command(about="ADS-B JSON feed monitoring tool")]
struct CliOpts {
    /// RON config file(s) of the feeds to poll
    #[arg(short, long)]
    config: Vec<String>,

    /// poll this aircraft.json URL (in addition to configured feeds)
    #[arg(short, long)]
    url: Option<String>,

    /// seconds between track table reports
    #[arg(long, default_value_t = 10)]
    report_interval: u64,

    /// seconds after which aircraft without updates are dropped from the table
    #[arg(long, default_value_t = 300)]
    drop_after: u64,

    /// only report the number of tracks, not the tracks themselves
    #[arg(short, long)]
    quiet: bool,
}

lazy_static! { static ref ARGS: CliOpts = CliOpts::parse(); }

#[tokio::main]
async fn main()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new("info")))  // use RUST_LOG to set level
        .init();

    let mut configs: Vec<Dump1090Config> = Vec::new();
    for path in &ARGS.config {
        configs.push( load_config_path( path)?);
    }
    if let Some(url) = &ARGS.url {
        configs.push( Dump1090Config::new( "cli", url));
    }
    if configs.is_empty() {
        anyhow::bail!("no feeds configured (use --config or --url)");
    }

    let table = TrackTable::new();
    let mut clients: Vec<Dump1090JsonReader> = configs.into_iter().map( |c| Dump1090JsonReader::new( c, table.clone())).collect();

    for client in clients.iter_mut() {
        if let Err(e) = client.start().await {
            error!("failed to start {}: {e}", client.name());
        }
    }

    let mut report_timer = interval( Duration::from_secs( ARGS.report_interval));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = report_timer.tick() => report( &table, &clients)
        }
    }

    for client in clients.iter_mut() {
        client.stop().await?;
    }
    info!("all clients stopped");
    Ok(())
}

fn report (table: &TrackTable, clients: &[Dump1090JsonReader]) {
    let dropped = table.remove_stale( Duration::from_secs( ARGS.drop_after));
    if !dropped.is_empty() {
        info!("dropped {} stale aircraft", dropped.len());
    }

    println!("------------------ {} aircraft", table.len());
    for client in clients {
        println!("  {}", client.status());
    }

    if !ARGS.quiet {
        for key in table.keys() {
            if let Some(ac) = table.get( &key) {
                println!("{}", *ac);
            }
        }
    }
}
