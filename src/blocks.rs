// src/blocks.rs
//! Starting block for "today" (UTC), looked up once per day.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use rusqlite::Connection;
use tokio::task;
use tracing::{info, warn};

use crate::db::{self, DailyBlock};
use crate::explorer::ExplorerClient;

/// UTC day string and midnight timestamp for `now`.
pub fn utc_midnight(now: DateTime<Utc>) -> (String, i64) {
    let day = now.date_naive();
    let midnight = day.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp()).unwrap_or(0);
    (day.format("%Y-%m-%d").to_string(), midnight)
}

pub struct BlockService {
    explorer: Arc<ExplorerClient>,
    conn: Arc<Mutex<Connection>>,
}

impl BlockService {
    pub fn new(explorer: Arc<ExplorerClient>, conn: Arc<Mutex<Connection>>) -> Self {
        Self { explorer, conn }
    }

    /// Today's block: cached row, else a fresh lookup; a stale row is the
    /// fallback when the lookup fails.
    pub async fn current(&self) -> Result<DailyBlock> {
        let (utc_day, midnight) = utc_midnight(Utc::now());

        let day = utc_day.clone();
        if let Some(hit) = self.with_db(move |c| db::block_for_day(c, &day)).await? {
            info!("Using cached block {} for {}", hit.block_number, hit.utc_day);
            return Ok(hit);
        }

        match self.explorer.block_by_time(midnight).await {
            Ok(n) => {
                let block = DailyBlock {
                    block_number: n.to_string(),
                    timestamp: midnight,
                    utc_day: utc_day.clone(),
                };
                let stored = block.clone();
                self.with_db(move |c| {
                    db::store_block(c, &stored)?;
                    db::clear_expired(c, &stored.utc_day)?;
                    Ok(())
                })
                .await?;
                info!("Cached new block {} for {}", block.block_number, utc_day);
                Ok(block)
            }
            Err(e) => {
                warn!("Block lookup failed: {}", e);
                match self.with_db(db::latest_block).await? {
                    Some(stale) => {
                        warn!("Using expired cached block {} from {}", stale.block_number, stale.utc_day);
                        Ok(stale)
                    }
                    None => Err(eyre!("failed to fetch block number: {}", e)),
                }
            }
        }
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let db = conn.lock().map_err(|_| eyre!("database lock poisoned"))?;
            f(&db)
        })
        .await?
    }
}
