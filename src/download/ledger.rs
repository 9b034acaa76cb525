// ChapterFetch - Segmented Audiobook Chapter Downloader
// Copyright (C) 2026 ChapterFetch Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Completion ledger
//!
//! Records which final outputs finished during this process's lifetime.
//! Keyed by output path — the path is already deterministic per chapter,
//! so the ledger doubles as the in-memory half of the idempotence check
//! (the on-disk half is a plain existence test in the scheduler).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// One completed chapter output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub output_path: PathBuf,
    pub completed_at: DateTime<Utc>,
}

/// Shared set of outputs known to be complete
#[derive(Debug, Default)]
pub struct RunLedger {
    entries: RwLock<HashMap<PathBuf, LedgerEntry>>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_done(&self, output_path: &Path) -> bool {
        self.entries.read().await.contains_key(output_path)
    }

    pub async fn mark_done(&self, output_path: &Path) {
        let entry = LedgerEntry {
            output_path: output_path.to_path_buf(),
            completed_at: Utc::now(),
        };
        self.entries
            .write()
            .await
            .insert(output_path.to_path_buf(), entry);
    }

    /// Snapshot of completed entries, ordered by path for stable output
    pub async fn completed(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self.entries.read().await.values().cloned().collect();
        entries.sort_by(|a, b| a.output_path.cmp(&b.output_path));
        entries
    }
}
