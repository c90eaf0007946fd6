// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod daemon;
pub mod job;

use anyhow::Result;

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

/// `pj ping`
pub async fn ping(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    client.ping().await?;
    let obj = serde_json::json!({ "pong": true });
    format_or_json(format, &obj, || println!("pong"))
}
