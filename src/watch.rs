//! Watch mode: the rebuild coordinator.
//!
//! ```text
//! notify ─▶ Debouncer ─▶ Coordinator::handle_batch
//!                           │
//!                           ├─ Classifying: path ─▶ SourceKind (or ignored)
//!                           ├─ Dispatching: invalidate caches, then one
//!                           │  full build or single-image reprocessing
//!                           └─ notify reload listeners ─▶ Idle
//! ```
//!
//! | Change                      | Caches cleared | Action            |
//! |-----------------------------|----------------|-------------------|
//! | any tracked file removed    | all            | full build        |
//! | style or script             | templates      | full build        |
//! | image added/modified        | none           | reprocess image   |
//! | structured data             | data           | full build        |
//! | page, layout, fragment, config, site template | structural | full build |
//!
//! Batches are handled one at a time on the watch thread. Events that arrive
//! while a batch is dispatching wait in the channel and form the next batch.

use crate::imaging::ImageBackend;
use crate::paths::SitePaths;
use crate::site::{BuildError, Site};
use crate::template::CacheScope;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}

// =============================================================================
// Classification
// =============================================================================

/// Coordinator state. Observable for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Classifying,
    Dispatching,
}

/// Which part of the source tree a changed path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Style,
    Script,
    Image,
    Data,
    /// Pages, layouts, fragments, configuration and the site template.
    Structural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl ChangeKind {
    /// Combine two events for the same path inside one debounce window.
    fn merge(self, next: ChangeKind) -> ChangeKind {
        match (self, next) {
            (ChangeKind::Added, ChangeKind::Modified) => ChangeKind::Added,
            (ChangeKind::Removed, ChangeKind::Added) => ChangeKind::Modified,
            (_, next) => next,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl Change {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ReprocessImage(PathBuf),
    Rebuild(CacheScope),
}

/// Editor backups, swap files and hidden files.
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Map a changed path to its source kind. `None` means the change is ignored.
pub fn classify(paths: &SitePaths, path: &Path) -> Option<SourceKind> {
    if path.starts_with(&paths.output) || is_temp_file(path) {
        return None;
    }
    if path.starts_with(&paths.css) {
        Some(SourceKind::Style)
    } else if path.starts_with(&paths.js) {
        Some(SourceKind::Script)
    } else if path.starts_with(&paths.images) {
        (!path.is_dir()).then_some(SourceKind::Image)
    } else if path.starts_with(&paths.data) {
        Some(SourceKind::Data)
    } else if path.starts_with(&paths.pages)
        || path.starts_with(&paths.layouts)
        || path.starts_with(&paths.partials)
        || path == paths.template
        || paths.is_site_config(path)
    {
        Some(SourceKind::Structural)
    } else {
        None
    }
}

/// The action for one classified change.
pub fn plan(kind: SourceKind, change: &Change) -> Action {
    if change.kind == ChangeKind::Removed {
        return Action::Rebuild(CacheScope::All);
    }
    match kind {
        SourceKind::Style | SourceKind::Script => Action::Rebuild(CacheScope::Templates),
        SourceKind::Image => Action::ReprocessImage(change.path.clone()),
        SourceKind::Data => Action::Rebuild(CacheScope::Data),
        SourceKind::Structural => Action::Rebuild(CacheScope::Structural),
    }
}

// =============================================================================
// Seams
// =============================================================================

/// The build operations the coordinator dispatches to.
pub trait Pipeline {
    fn invalidate(&self, scope: CacheScope);
    fn full_build(&self) -> Result<(), BuildError>;
    fn reprocess_image(&self, path: &Path) -> Result<(), BuildError>;
}

impl<B: ImageBackend> Pipeline for Site<B> {
    fn invalidate(&self, scope: CacheScope) {
        Site::invalidate(self, scope);
    }

    fn full_build(&self) -> Result<(), BuildError> {
        self.build().map(|_| ())
    }

    fn reprocess_image(&self, path: &Path) -> Result<(), BuildError> {
        self.process_image(path).map(|_| ())
    }
}

/// Receives a signal after every dispatched batch.
pub trait ReloadNotifier {
    fn reload(&self);
}

impl<T: ReloadNotifier + ?Sized> ReloadNotifier for Arc<T> {
    fn reload(&self) {
        (**self).reload();
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// What one batch did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub ignored: usize,
    pub invalidated: Vec<CacheScope>,
    pub full_build: bool,
    pub images: usize,
    pub failures: usize,
}

impl BatchOutcome {
    pub fn dispatched(&self) -> bool {
        self.full_build || self.images > 0
    }
}

pub struct Coordinator<P, N> {
    paths: SitePaths,
    pipeline: P,
    notifier: N,
    state: WatchState,
}

impl<P: Pipeline, N: ReloadNotifier> Coordinator<P, N> {
    pub fn new(paths: SitePaths, pipeline: P, notifier: N) -> Self {
        Self {
            paths,
            pipeline,
            notifier,
            state: WatchState::Idle,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Classify and dispatch one settled batch of changes.
    ///
    /// Any removal or non-image change produces exactly one full build after
    /// the union of required cache invalidations; image reprocessing is
    /// skipped in that case because the build covers it. Failures are logged
    /// and the coordinator always returns to idle.
    pub fn handle_batch(&mut self, changes: &[Change]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        self.transition(WatchState::Classifying);
        let mut actions: Vec<Action> = Vec::new();
        for change in changes {
            match classify(&self.paths, &change.path) {
                Some(kind) => {
                    let action = plan(kind, change);
                    debug!(path = %change.path.display(), ?kind, change = ?change.kind, ?action, "Classified change");
                    if !actions.contains(&action) {
                        actions.push(action);
                    }
                }
                None => outcome.ignored += 1,
            }
        }

        if actions.is_empty() {
            self.transition(WatchState::Idle);
            return outcome;
        }

        self.transition(WatchState::Dispatching);
        for action in &actions {
            if let Action::Rebuild(scope) = action
                && !outcome.invalidated.contains(scope)
            {
                self.pipeline.invalidate(*scope);
                outcome.invalidated.push(*scope);
            }
        }

        if outcome.invalidated.is_empty() {
            for action in &actions {
                if let Action::ReprocessImage(path) = action {
                    outcome.images += 1;
                    if let Err(e) = self.pipeline.reprocess_image(path) {
                        error!(image = %path.display(), error = %e, "Image reprocessing failed");
                        outcome.failures += 1;
                    }
                }
            }
        } else {
            outcome.full_build = true;
            info!(changes = changes.len(), "Rebuilding site");
            if let Err(e) = self.pipeline.full_build() {
                error!(error = %e, "Rebuild failed");
                outcome.failures += 1;
            }
        }

        self.notifier.reload();
        self.transition(WatchState::Idle);
        outcome
    }

    fn transition(&mut self, next: WatchState) {
        debug!(from = ?self.state, to = ?next, "Watch state");
        self.state = next;
    }
}

// =============================================================================
// Debounce
// =============================================================================

/// Collects events until the source tree has been quiet for `delay`.
pub struct Debouncer {
    pending: HashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    delay: Duration,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            last_event: None,
            delay,
        }
    }

    pub fn add(&mut self, change: Change) {
        self.pending
            .entry(change.path)
            .and_modify(|kind| *kind = kind.merge(change.kind))
            .or_insert(change.kind);
        self.last_event = Some(Instant::now());
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn ready(&self) -> bool {
        !self.pending.is_empty() && self.last_event.is_some_and(|t| t.elapsed() >= self.delay)
    }

    /// Drain the pending batch, sorted by path.
    pub fn take(&mut self) -> Vec<Change> {
        self.last_event = None;
        let mut changes: Vec<Change> = self
            .pending
            .drain()
            .map(|(path, kind)| Change { path, kind })
            .collect();
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        changes
    }

    pub fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            self.delay
        }
    }
}

/// Translate a notify event into per-path changes. Access events yield nothing.
pub fn changes_from_event(event: Event) -> Vec<Change> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Added,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            return paths
                .next()
                .map(|from| Change::new(from, ChangeKind::Removed))
                .into_iter()
                .chain(paths.map(|to| Change::new(to, ChangeKind::Added)))
                .collect();
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            return event
                .paths
                .into_iter()
                .map(|path| {
                    let kind = if path.exists() { ChangeKind::Added } else { ChangeKind::Removed };
                    Change::new(path, kind)
                })
                .collect();
        }
        EventKind::Modify(_) => ChangeKind::Modified,
        _ => return Vec::new(),
    };
    event.paths.into_iter().map(|path| Change::new(path, kind)).collect()
}

// =============================================================================
// Event loop
// =============================================================================

/// Whether a raw change concerns a source at all.
///
/// The whole project root is watched, so source roots created after startup
/// are seen too; everything else (output, VCS metadata, editor droppings) is
/// dropped here before it can keep the debouncer from settling.
fn is_relevant(paths: &SitePaths, change: &Change) -> bool {
    classify(paths, &change.path).is_some()
}

/// Watch the source tree and feed settled batches to the coordinator.
///
/// Blocks until the notify channel closes.
pub fn run<P: Pipeline, N: ReloadNotifier>(
    coordinator: &mut Coordinator<P, N>,
    delay: Duration,
) -> Result<(), WatchError> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(&coordinator.paths().root, RecursiveMode::Recursive)?;
    info!(root = %coordinator.paths().root.display(), "Watching for changes");

    let mut debouncer = Debouncer::new(delay);
    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) => {
                for change in changes_from_event(event) {
                    if is_relevant(coordinator.paths(), &change) {
                        debouncer.add(change);
                    } else {
                        debug!(path = %change.path.display(), "Ignoring change");
                    }
                }
            }
            Ok(Err(e)) => warn!(error = %e, "Watcher error"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                let outcome = coordinator.handle_batch(&debouncer.take());
                if outcome.dispatched() {
                    info!(
                        full_build = outcome.full_build,
                        images = outcome.images,
                        failures = outcome.failures,
                        "Change handled"
                    );
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }
    Ok(())
}
