//! Acquisition coordinator - main run orchestration logic
//!
//! This module drives one acquisition run through its phases:
//! - Bootstrapping: deciding between an index-driven and a linked-list run
//! - IndexDriven: fetching a resolved chapter list with a bounded worker pool
//! - LinkedList: following "next chapter" references one page at a time
//! - Draining: merging with resumed records and writing the final snapshot
//! - Finalized: re-ordering the merged records and exporting them
//!
//! The coordinator owns every accumulated record and the set of seen
//! locations. Workers only return values; nothing is shared mutably.
//! Snapshots are serialized on the blocking pool, and a resource monitor
//! samples system load from the start of acquisition until draining ends.

use crate::chapter::{ChapterCandidate, ChapterIndexResolver, NovelIndex, UNKNOWN};
use crate::config::Config;
use crate::crawler::parser::parse_chapter_page;
use crate::crawler::{FetchLimiter, Pacing, PageFetcher, ResourceMonitor};
use crate::output::{write_export, RunReport};
use crate::state::{EntryKind, RunPhase};
use crate::storage::{order_records, ChapterRecord, ProgressSnapshot, ProgressStore, Storage};
use crate::url::{canonical_key, classify_page};
use crate::{ConfigResult, Result, ShioriError};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Parameters of one run, merged from configuration and command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Starting location
    pub entry: Url,

    /// Forced entry kind; None auto-detects from the location
    pub entry_kind: Option<EntryKind>,

    /// Maximum chapters to acquire (0 = unbounded)
    pub chapter_budget: usize,

    /// Worker pool size in index-driven mode
    pub concurrency: usize,

    pub pacing: Pacing,

    /// Load the progress snapshot and skip chapters it already holds
    pub resume: bool,

    /// Write a snapshot every N newly acquired chapters in linked-list mode
    pub checkpoint_interval: usize,

    /// Write a snapshot every N newly acquired chapters in index-driven mode
    pub index_checkpoint_interval: usize,

    /// Load sampling interval; None disables the monitor
    pub monitor_interval: Option<Duration>,

    pub minimum_content_length: usize,

    /// Directory receiving the merged export
    pub output_dir: PathBuf,
}

impl RunOptions {
    /// Creates options for `entry` with every other value taken from `config`
    pub fn from_config(entry: Url, config: &Config) -> ConfigResult<Self> {
        Ok(Self {
            entry,
            entry_kind: None,
            chapter_budget: config.crawler.chapter_budget,
            concurrency: config.crawler.concurrency as usize,
            pacing: Pacing::from_config(&config.crawler)?,
            resume: false,
            checkpoint_interval: config.crawler.checkpoint_interval,
            index_checkpoint_interval: config.crawler.index_checkpoint_interval,
            monitor_interval: (config.crawler.monitor_interval_secs > 0)
                .then(|| Duration::from_secs(config.crawler.monitor_interval_secs)),
            minimum_content_length: config.crawler.minimum_content_length,
            output_dir: PathBuf::from(&config.output.directory),
        })
    }

    fn budget_reached(&self, acquired: usize) -> bool {
        self.chapter_budget > 0 && acquired >= self.chapter_budget
    }

    /// Acquisitions between snapshots in the given mode
    fn snapshot_interval(&self, phase: RunPhase) -> usize {
        match phase {
            RunPhase::IndexDriven => self.index_checkpoint_interval.max(1),
            _ => self.checkpoint_interval.max(1),
        }
    }
}

/// One chapter fetch, run on the worker pool
struct ChapterJob {
    fetcher: Arc<dyn PageFetcher>,
    limiter: FetchLimiter,
    pacing: Pacing,
    candidate: ChapterCandidate,
    minimum_content_length: usize,
    novel_name: String,
    author: String,
}

impl ChapterJob {
    /// Fetches and validates the chapter while holding a limiter slot
    ///
    /// A failed fetch pauses before the slot is released. There is no retry;
    /// the failure is returned to the coordinator for logging.
    async fn run(self) -> (ChapterCandidate, Result<ChapterRecord>) {
        let _permit = self.limiter.acquire().await;

        let result = self.fetch().await;
        if result.is_err() {
            self.pacing.pause().await;
        }

        (self.candidate, result)
    }

    async fn fetch(&self) -> Result<ChapterRecord> {
        let url = Url::parse(&self.candidate.location)?;
        tracing::debug!("Fetching {} ({})", self.candidate.title, url);

        let markup = self.fetcher.fetch(&url).await?;
        let record = parse_chapter_page(
            &markup,
            &url,
            self.minimum_content_length,
            Some(self.novel_name.as_str()),
            Some(self.author.as_str()),
        )?;
        Ok(record)
    }
}

/// Main acquisition coordinator structure
pub struct Coordinator {
    fetcher: Arc<dyn PageFetcher>,
    storage: Box<dyn Storage + Send>,
    progress: ProgressStore,
    options: RunOptions,
    phase: RunPhase,

    novel_name: String,
    author: String,

    /// Records loaded from a prior snapshot
    resumed: Vec<ChapterRecord>,

    /// Records acquired by this run
    emitted: Vec<ChapterRecord>,

    /// Canonical keys of every resumed or emitted location
    seen: HashSet<String>,

    resume_from: Option<String>,
    last_location: Option<String>,
    failed: usize,
    since_checkpoint: usize,
    checkpoints: usize,

    /// Cancellation token of the current run's resource monitor
    monitor_token: Option<CancellationToken>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Source of page markup
    /// * `storage` - Sink receiving each acquired chapter
    /// * `progress` - Snapshot store used for checkpoints and resume
    /// * `options` - Run parameters
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        storage: Box<dyn Storage + Send>,
        progress: ProgressStore,
        options: RunOptions,
    ) -> Self {
        Self {
            fetcher,
            storage,
            progress,
            options,
            phase: RunPhase::Bootstrapping,
            novel_name: UNKNOWN.to_string(),
            author: UNKNOWN.to_string(),
            resumed: Vec::new(),
            emitted: Vec::new(),
            seen: HashSet::new(),
            resume_from: None,
            last_location: None,
            failed: 0,
            since_checkpoint: 0,
            checkpoints: 0,
            monitor_token: None,
        }
    }

    /// Current run phase
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Runs the acquisition to completion
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - The run finished, possibly with some chapters failed
    /// * `Err(ShioriError::Entry)` - No index and no fetchable entry chapter
    /// * `Err(ShioriError::InvalidTransition)` - The coordinator was already used
    pub async fn run(&mut self) -> Result<RunReport> {
        if self.phase != RunPhase::Bootstrapping {
            return Err(ShioriError::InvalidTransition {
                from: self.phase,
                to: RunPhase::Bootstrapping,
            });
        }

        tracing::info!("Starting run from {}", self.options.entry);
        tracing::info!(
            "Budget: {}, concurrency: {}, pacing: {:.1}-{:.1}s, resume: {}",
            if self.options.chapter_budget == 0 {
                "unbounded".to_string()
            } else {
                self.options.chapter_budget.to_string()
            },
            self.options.concurrency,
            self.options.pacing.min_secs(),
            self.options.pacing.max_secs(),
            self.options.resume
        );

        if self.options.resume {
            self.load_resume_state();
        }

        let (entry_record, index) = self.bootstrap().await?;

        // An early return drops the monitor, which cancels it as well
        let monitor = self.options.monitor_interval.map(ResourceMonitor::spawn);
        self.monitor_token = monitor.as_ref().map(ResourceMonitor::token);

        let mode = self.acquire(entry_record, index).await?;

        self.transition(RunPhase::Draining)?;
        let merged = self.drain().await;
        if let Some(monitor) = monitor {
            monitor.stop().await;
        }

        self.transition(RunPhase::Finalized)?;
        self.finalize(mode, merged)
    }

    /// Resolves the index the run would use, without acquiring anything
    ///
    /// # Errors
    ///
    /// * `ShioriError::Entry` - A chapter entry could not be fetched
    /// * `ShioriError::Resolution` - No chapter index could be resolved
    pub async fn preview(&self) -> Result<NovelIndex> {
        let (_, index) = self.bootstrap().await?;
        index.ok_or_else(|| ShioriError::Resolution {
            url: self.options.entry.to_string(),
            reason: "no chapter index reachable from the entry".to_string(),
        })
    }

    /// Runs the acquisition mode chosen by bootstrapping and returns it
    async fn acquire(
        &mut self,
        entry_record: Option<ChapterRecord>,
        index: Option<NovelIndex>,
    ) -> Result<RunPhase> {
        match index {
            Some(index) => {
                self.transition(RunPhase::IndexDriven)?;
                self.acquire_index(index, entry_record).await;
            }
            None => {
                self.transition(RunPhase::LinkedList)?;
                let start = self.linked_list_start();
                self.walk_linked_list(start, entry_record).await?;
            }
        }
        Ok(self.phase)
    }

    fn transition(&mut self, next: RunPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(ShioriError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Run phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Loads the prior snapshot; an unreadable snapshot starts a fresh run
    fn load_resume_state(&mut self) {
        match self.progress.load() {
            Ok(Some(snapshot)) => {
                self.adopt_identity(&snapshot.novel_name, &snapshot.author);
                self.seen = snapshot.seen_locations();
                self.resume_from = snapshot.last_location;
                self.resumed = snapshot.chapters;

                for record in self.resumed.iter().take(3) {
                    tracing::debug!("Resumed chapter: {}", record.title);
                }
                if let Some(last) = self.resumed.last() {
                    tracing::debug!("Last resumed chapter: {}", last.title);
                }
            }
            Ok(None) => {
                tracing::info!(
                    "No progress snapshot at {}, starting fresh",
                    self.progress.path().display()
                );
            }
            Err(e) => {
                tracing::error!("Failed to load progress snapshot: {}", e);
            }
        }
    }

    /// Determines the entry mode
    ///
    /// A listing entry is resolved directly. A chapter entry is fetched first
    /// for its identity and index reference, and the index is then resolved.
    /// Resolution failures yield no index rather than an error.
    async fn bootstrap(&self) -> Result<(Option<ChapterRecord>, Option<NovelIndex>)> {
        let entry = &self.options.entry;
        let kind = self
            .options
            .entry_kind
            .unwrap_or_else(|| classify_page(entry).into());
        tracing::info!("Entry {} treated as a {} page", entry, kind);

        let (entry_record, index_location) = match kind {
            EntryKind::Listing => (None, Some(entry.clone())),
            EntryKind::Chapter => {
                let record = self
                    .fetch_record(entry)
                    .await
                    .map_err(|e| ShioriError::Entry {
                        url: entry.to_string(),
                        reason: e.to_string(),
                    })?;
                let index_location = record
                    .index_location
                    .as_deref()
                    .and_then(|location| Url::parse(location).ok());
                (Some(record), index_location)
            }
        };

        let index = match index_location {
            Some(location) => match self.resolve_index(&location).await {
                Ok(index) => Some(index),
                Err(e) => {
                    tracing::warn!("{}; following next-chapter links instead", e);
                    None
                }
            },
            None => {
                tracing::info!("Entry chapter exposes no index reference");
                None
            }
        };

        Ok((entry_record, index))
    }

    async fn resolve_index(&self, location: &Url) -> Result<NovelIndex> {
        tracing::info!("Resolving chapter index from {}", location);

        let markup = self
            .fetcher
            .fetch(location)
            .await
            .map_err(|e| ShioriError::Resolution {
                url: location.to_string(),
                reason: e.to_string(),
            })?;

        let resolver = ChapterIndexResolver::new(
            Arc::clone(&self.fetcher),
            self.options.minimum_content_length,
        );
        resolver
            .resolve(&markup, location)
            .await
            .ok_or_else(|| ShioriError::Resolution {
                url: location.to_string(),
                reason: "no chapter links found".to_string(),
            })
    }

    /// Fetches and validates one chapter page
    async fn fetch_record(&self, url: &Url) -> Result<ChapterRecord> {
        let markup = self.fetcher.fetch(url).await?;
        let record = parse_chapter_page(
            &markup,
            url,
            self.options.minimum_content_length,
            Some(self.novel_name.as_str()),
            Some(self.author.as_str()),
        )?;
        Ok(record)
    }

    /// Takes a novel identity unless one is already known
    fn adopt_identity(&mut self, novel_name: &str, author: &str) {
        if self.novel_name == UNKNOWN && !novel_name.is_empty() && novel_name != UNKNOWN {
            self.novel_name = novel_name.to_string();
        }
        if self.author == UNKNOWN && !author.is_empty() && author != UNKNOWN {
            self.author = author.to_string();
        }
    }

    /// Index-driven acquisition
    ///
    /// The ordered list is sliced at the entry chapter (never re-sorted),
    /// capped by the budget, and stripped of already-seen locations before
    /// the remaining chapters are dispatched to the worker pool.
    async fn acquire_index(&mut self, index: NovelIndex, mut entry_record: Option<ChapterRecord>) {
        self.adopt_identity(&index.novel_name, &index.author);

        let mut listed = index.ordered_chapters;
        if entry_record.is_some() {
            match listed
                .iter()
                .position(|chapter| chapter.location == self.options.entry.as_str())
            {
                Some(position) => {
                    tracing::info!(
                        "Entry chapter is number {} in the index, starting there",
                        position + 1
                    );
                    listed = listed.split_off(position);
                }
                None => tracing::warn!("Entry chapter not found in the index, using the full list"),
            }
        }

        if self.options.chapter_budget > 0 {
            listed.truncate(self.options.chapter_budget);
        }
        tracing::info!("Acquiring up to {} chapters", listed.len());
        if let Some(first) = listed.first() {
            tracing::info!("First chapter: {} ({})", first.title, first.location);
        }
        let final_location = listed.last().map(|chapter| chapter.location.clone());

        let mut work = Vec::with_capacity(listed.len());
        for candidate in listed {
            let key = canonical_key(&candidate.location);
            if self.seen.contains(&key) {
                tracing::debug!("Already acquired {}, skipping", candidate.title);
                continue;
            }
            match entry_record.take() {
                Some(record) if canonical_key(&record.source_location) == key => {
                    self.accept(record).await;
                }
                other => {
                    entry_record = other;
                    work.push(candidate);
                }
            }
        }

        tracing::info!(
            "{} chapters to fetch with {} workers",
            work.len(),
            self.options.concurrency.max(1)
        );

        let limiter = FetchLimiter::new(self.options.concurrency);
        let mut workers = JoinSet::new();
        for candidate in work {
            let job = ChapterJob {
                fetcher: Arc::clone(&self.fetcher),
                limiter: limiter.clone(),
                pacing: self.options.pacing,
                candidate,
                minimum_content_length: self.options.minimum_content_length,
                novel_name: self.novel_name.clone(),
                author: self.author.clone(),
            };
            workers.spawn(job.run());
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((_, Ok(record))) => self.accept(record).await,
                Ok((candidate, Err(e))) => {
                    self.failed += 1;
                    tracing::warn!(
                        "Failed to acquire {} ({}): {}",
                        candidate.title,
                        candidate.location,
                        e
                    );
                }
                Err(e) => {
                    self.failed += 1;
                    tracing::error!("Chapter worker did not complete: {}", e);
                }
            }
        }

        self.last_location = final_location;
    }

    /// Where a linked-list walk begins: the resume point, else the entry
    fn linked_list_start(&self) -> Url {
        self.resume_from
            .as_deref()
            .and_then(|location| Url::parse(location).ok())
            .unwrap_or_else(|| self.options.entry.clone())
    }

    /// Next reference recorded on an already-acquired chapter
    fn known_next(&self, key: &str) -> Option<String> {
        self.resumed
            .iter()
            .chain(&self.emitted)
            .find(|record| canonical_key(&record.source_location) == key)
            .and_then(|record| record.next_location.clone())
    }

    /// Linked-list acquisition
    ///
    /// Walks "next" references strictly sequentially. The walk stops when a
    /// page has no next reference, points at itself or at a listing page,
    /// revisits a location, fails to fetch, or the budget is spent.
    async fn walk_linked_list(
        &mut self,
        start: Url,
        mut prefetched: Option<ChapterRecord>,
    ) -> Result<()> {
        let mut walked: HashSet<String> = HashSet::new();
        let mut current = start;
        let mut acquired = 0;

        tracing::info!("Following next-chapter links from {}", current);

        // A resumed walk may start away from the already-fetched entry chapter
        if let Some(record) = prefetched.take() {
            let key = canonical_key(&record.source_location);
            if key == canonical_key(current.as_str()) {
                prefetched = Some(record);
            } else if self.seen.contains(&key) {
                tracing::debug!(
                    "Entry chapter {} was already acquired, not storing it again",
                    record.source_location
                );
            } else {
                tracing::debug!(
                    "Keeping entry chapter {} fetched before resuming at {}",
                    record.source_location,
                    current
                );
                self.accept(record).await;
                acquired += 1;
            }
        }

        loop {
            if self.options.budget_reached(acquired) {
                tracing::info!("Chapter budget of {} reached", self.options.chapter_budget);
                break;
            }

            let key = canonical_key(current.as_str());
            if !walked.insert(key.clone()) {
                tracing::info!("{} was already visited in this walk, stopping", current);
                break;
            }

            let mut fetched = false;
            let next_location = if self.seen.contains(&key) {
                tracing::debug!("Already acquired {}, following its next reference", current);
                self.known_next(&key)
            } else {
                let record = match prefetched.take() {
                    Some(record) if canonical_key(&record.source_location) == key => record,
                    _ => {
                        fetched = true;
                        match self.fetch_record(&current).await {
                            Ok(record) => record,
                            Err(e) => {
                                self.failed += 1;
                                tracing::error!("Failed to acquire {}: {}", current, e);
                                if self.emitted.is_empty() && self.resumed.is_empty() {
                                    return Err(ShioriError::Entry {
                                        url: current.to_string(),
                                        reason: e.to_string(),
                                    });
                                }
                                break;
                            }
                        }
                    }
                };

                let next = record.next_location.clone();
                self.accept(record).await;
                acquired += 1;
                next
            };
            self.last_location = Some(current.to_string());

            let Some(next) = next_location else {
                tracing::info!("No next chapter after {}, stopping", current);
                break;
            };
            let next = match Url::parse(&next) {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!("Unusable next reference {}: {}", next, e);
                    break;
                }
            };
            if canonical_key(next.as_str()) == key {
                tracing::info!("Next chapter of {} points to itself, stopping", current);
                break;
            }
            if classify_page(&next).is_listing() {
                tracing::info!("Next reference {} is a listing page, stopping", next);
                break;
            }

            current = next;
            if fetched {
                self.options.pacing.pause().await;
            }
        }

        tracing::info!("Linked-list walk acquired {} chapters", acquired);
        Ok(())
    }

    /// Stores a newly acquired record and checkpoints on schedule
    async fn accept(&mut self, mut record: ChapterRecord) {
        self.adopt_identity(&record.novel_name, &record.author);

        if let Err(e) = self.storage.store_chapter(&mut record) {
            tracing::warn!("Failed to store {}: {}", record.title, e);
        }

        tracing::info!(
            "Acquired {} ({} so far): {}",
            record.source_location,
            self.emitted.len() + 1,
            record.title
        );

        self.seen.insert(canonical_key(&record.source_location));
        self.last_location = Some(record.source_location.clone());
        self.emitted.push(record);

        self.since_checkpoint += 1;
        if self.since_checkpoint >= self.options.snapshot_interval(self.phase) {
            self.checkpoint().await;
        }
    }

    /// Resumed records followed by emitted ones, ordered
    ///
    /// Resumed records win for locations present in both.
    fn merged_records(&self) -> Vec<ChapterRecord> {
        order_records(self.resumed.iter().chain(&self.emitted).cloned().collect())
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(
            &self.novel_name,
            &self.author,
            self.merged_records(),
            self.last_location.clone(),
        )
    }

    /// Writes a snapshot on the blocking pool
    ///
    /// Failures are logged and otherwise ignored.
    async fn save_snapshot(&mut self, snapshot: ProgressSnapshot) {
        let progress = self.progress.clone();
        let chapters = snapshot.chapters.len();

        let written = tokio::task::spawn_blocking(move || progress.save(&snapshot)).await;
        match written {
            Ok(Ok(())) => {
                self.checkpoints += 1;
                tracing::info!(
                    "Checkpoint: {} chapters saved to {}",
                    chapters,
                    self.progress.path().display()
                );
            }
            Ok(Err(e)) => tracing::warn!("Failed to write progress snapshot: {}", e),
            Err(e) => tracing::warn!("Progress snapshot task did not complete: {}", e),
        }
    }

    async fn checkpoint(&mut self) {
        self.since_checkpoint = 0;
        let snapshot = self.snapshot();
        self.save_snapshot(snapshot).await;
    }

    async fn drain(&mut self) -> Vec<ChapterRecord> {
        let snapshot = self.snapshot();
        let merged = snapshot.chapters.clone();
        self.save_snapshot(snapshot).await;
        merged
    }

    fn finalize(&self, mode: RunPhase, merged: Vec<ChapterRecord>) -> Result<RunReport> {
        let ordered = order_records(merged);

        let export_path = if ordered.is_empty() {
            tracing::warn!("No chapters acquired, nothing to export");
            None
        } else {
            let path = write_export(&self.options.output_dir, &self.novel_name, &self.author, &ordered)?;
            tracing::info!("Merged {} chapters into {}", ordered.len(), path.display());
            Some(path)
        };

        tracing::info!("Run finished with {} chapters in total", ordered.len());

        Ok(RunReport {
            novel_name: self.novel_name.clone(),
            author: self.author.clone(),
            mode,
            resumed: self.resumed.len(),
            acquired: self.emitted.len(),
            failed: self.failed,
            total: ordered.len(),
            checkpoints: self.checkpoints,
            export_path,
        })
    }
}
