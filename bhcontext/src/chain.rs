// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Extraction of [`Context`] from a causal chain of errors.
//!
//! The chain is walked through [`std::error::Error::source`], starting at the outermost error.
//! Each link is checked for the [`ContextualError`] capability with type-safe downcasts, called
//! probes.  The [`Inspector`] holds the probes along with the maximum number of links visited,
//! which keeps the traversal finite even for malformed, cyclic source chains.
//!
//! ```
//! use bhcontext::{chain::Inspector, Context, ContextualError};
//!
//! #[derive(Debug)]
//! struct Timeout {
//!     context: Context,
//! }
//!
//! impl std::fmt::Display for Timeout {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "timed out")
//!     }
//! }
//!
//! impl std::error::Error for Timeout {}
//!
//! impl ContextualError for Timeout {
//!     fn context(&self) -> &Context {
//!         &self.context
//!     }
//! }
//!
//! let mut context = Context::new();
//! context.insert("elapsedMs".to_owned(), 5000.into());
//! let error = Timeout { context };
//!
//! let inspector = Inspector::default().with_capability::<Timeout>();
//! let chain = inspector.collect(&error);
//!
//! assert_eq!(chain.len(), 1);
//! assert_eq!(chain[0].error_name(), "Timeout");
//! assert_eq!(chain[0].context()["elapsedMs"], 5000);
//! ```

use std::{
    ops::Deref,
    panic::{catch_unwind, AssertUnwindSafe},
};

use crate::{Context, ContextualError, ErrorDyn};

/// Maximum number of links visited by the default [`Inspector`].
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Checks whether a link of the chain has the [`ContextualError`] capability.
type Probe =
    for<'a> fn(&'a (dyn std::error::Error + 'static)) -> Option<&'a dyn ContextualError>;

fn probe<'a, T>(link: &'a (dyn std::error::Error + 'static)) -> Option<&'a dyn ContextualError>
where
    T: ContextualError + std::error::Error + 'static,
{
    link.downcast_ref::<T>().map(|error| error as &dyn ContextualError)
}

/// Configuration of the causal chain traversal.
///
/// The default inspector recognizes every [`crate::Error`] in the chain and visits at most
/// [`DEFAULT_MAX_DEPTH`] links.  Foreign error types implementing [`ContextualError`] have to be
/// registered with [`Inspector::with_capability`] to be recognized.
#[derive(Clone)]
pub struct Inspector {
    max_depth: usize,
    probes: Vec<Probe>,
}

impl std::fmt::Debug for Inspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inspector")
            .field("max_depth", &self.max_depth)
            .field("probes", &self.probes.len())
            .finish()
    }
}

impl Default for Inspector {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            probes: vec![probe::<ErrorDyn> as Probe],
        }
    }
}

impl Inspector {
    /// Sets the maximum number of links visited during the traversal.
    ///
    /// Once the limit is reached, the traversal stops and the context collected so far is
    /// returned.  A limit of `0` visits nothing.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Registers the foreign error type `T` as a contextual error.
    ///
    /// Links of type `T` found anywhere in the chain will have their context collected.  This is
    /// also the way to recognize a concrete [`crate::Error<E>`] embedded as the source of a
    /// foreign error without erasing it first.
    pub fn with_capability<T>(mut self) -> Self
    where
        T: ContextualError + std::error::Error + 'static,
    {
        self.probes.push(probe::<T>);
        self
    }

    /// Returns the maximum number of links visited during the traversal.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Extracts the context of `error` and of every error in its causal chain.
    ///
    /// The entries are ordered from the outermost error to the root cause.  Links without the
    /// [`ContextualError`] capability are passed over.
    pub fn collect<'a>(&self, error: &'a (dyn std::error::Error + 'static)) -> ContextChain<'a> {
        let mut chain = ContextChain::default();
        self.walk(&mut chain, Some(error), 0);
        chain
    }

    /// Collects the context of `first`, which is known to be contextual, followed by its causal
    /// chain starting at `source`.
    pub(crate) fn collect_after<'a>(
        &self,
        first: &'a dyn ContextualError,
        source: Option<&'a (dyn std::error::Error + 'static)>,
    ) -> ContextChain<'a> {
        let mut chain = ContextChain::default();
        if self.max_depth == 0 {
            chain.stop_at_limit(0);
            return chain;
        }

        chain.entries.push(ContextEntry::of(first));
        self.walk(&mut chain, source, 1);
        chain
    }

    fn walk<'a>(
        &self,
        chain: &mut ContextChain<'a>,
        mut current: Option<&'a (dyn std::error::Error + 'static)>,
        mut depth: usize,
    ) {
        while let Some(link) = current {
            if depth >= self.max_depth {
                chain.stop_at_limit(self.max_depth);
                return;
            }

            match catch_unwind(AssertUnwindSafe(move || self.inspect(link))) {
                Ok(Some(entry)) => chain.entries.push(entry),
                Ok(None) => {}
                Err(_) => {
                    log::warn!("Reading the context of the error at link {depth} panicked");
                    chain.skipped += 1;
                }
            }

            current = match catch_unwind(AssertUnwindSafe(move || link.source())) {
                Ok(source) => source,
                Err(_) => {
                    log::warn!("Reading the source of the error at link {depth} panicked");
                    chain.stop = Some(StopReason::SourcePanicked(depth));
                    return;
                }
            };
            depth += 1;
        }
    }

    fn inspect<'a>(&self, link: &'a (dyn std::error::Error + 'static)) -> Option<ContextEntry<'a>> {
        self.probes
            .iter()
            .find_map(|probe| probe(link))
            .map(ContextEntry::of)
    }
}

/// Extracts the context of `error` and of every error in its causal chain, using the default
/// [`Inspector`].
///
/// If `error` is a [`crate::Error`], prefer [`crate::Error::collect_context`], which also
/// collects the context of the outermost error itself.
pub fn collect_context<'a>(error: &'a (dyn std::error::Error + 'static)) -> ContextChain<'a> {
    Inspector::default().collect(error)
}

/// The context of a single contextual error found in the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextEntry<'a> {
    error_name: &'static str,
    context: &'a Context,
}

impl<'a> ContextEntry<'a> {
    fn of(error: &'a dyn ContextualError) -> Self {
        Self {
            error_name: error.error_name(),
            context: error.context(),
        }
    }

    /// Name of the error type which exposed the context.
    pub fn error_name(&self) -> &'static str {
        self.error_name
    }

    /// The context exposed by the error.
    pub fn context(&self) -> &'a Context {
        self.context
    }
}

/// Reason why the traversal ended before reaching the root cause.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The maximum number of links was visited.
    #[strum(to_string = "Traversal stopped after visiting {0} links")]
    DepthLimitReached(usize),
    /// The `source` of the error at the given link panicked.
    #[strum(to_string = "Reading the source of the error at link {0} panicked")]
    SourcePanicked(usize),
}

/// How [`ContextChain::merged`] combines the contexts of the chain into a single mapping.
#[derive(strum_macros::Display, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Each context is nested under the name of its error.
    ///
    /// When the same error name appears more than once, the later ones get their position in
    /// the chain appended, e.g. `"DbError#3"`, so no context is lost.
    #[default]
    #[strum(to_string = "namespaced")]
    Namespaced,
    /// All keys share one namespace and the outermost error wins a collision.
    ///
    /// Every dropped value is logged at the debug level.
    #[strum(to_string = "outer-wins")]
    OuterWins,
}

/// Context collected from a causal chain, ordered from the outermost error to the root cause.
///
/// Dereferences to the slice of collected [`ContextEntry`] values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextChain<'a> {
    entries: Vec<ContextEntry<'a>>,
    skipped: usize,
    stop: Option<StopReason>,
}

impl<'a> ContextChain<'a> {
    fn stop_at_limit(&mut self, max_depth: usize) {
        log::warn!("Error chain is longer than {max_depth} links, returning partial context");
        self.stop = Some(StopReason::DepthLimitReached(max_depth));
    }

    /// Returns `true` when the whole chain was traversed and the context of every contextual
    /// error was read.
    pub fn is_complete(&self) -> bool {
        self.stop.is_none() && self.skipped == 0
    }

    /// Returns the reason the traversal ended early, if it did.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Number of links whose context could not be read.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Merges the collected contexts into a single mapping according to `policy`.
    pub fn merged(&self, policy: MergePolicy) -> Context {
        let mut merged = Context::new();

        for (position, entry) in self.entries.iter().enumerate() {
            match policy {
                MergePolicy::Namespaced => {
                    let mut key = entry.error_name.to_owned();
                    if merged.contains_key(&key) {
                        key = format!("{}#{position}", entry.error_name);
                    }
                    merged.insert(key, serde_json::Value::Object(entry.context.clone()));
                }
                MergePolicy::OuterWins => {
                    for (key, value) in entry.context {
                        if merged.contains_key(key) {
                            log::debug!(
                                "Dropping `{key}` of {} while merging context ({policy})",
                                entry.error_name
                            );
                        } else {
                            merged.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }

        merged
    }

    /// Converts the chain to a JSON array of `{"error": <name>, "context": {...}}` objects.
    pub fn to_value(&self) -> serde_json::Value {
        self.entries
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "error": entry.error_name,
                    "context": entry.context,
                })
            })
            .collect()
    }
}

impl<'a> Deref for ContextChain<'a> {
    type Target = [ContextEntry<'a>];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl<'a, 'b> IntoIterator for &'b ContextChain<'a> {
    type Item = &'b ContextEntry<'a>;
    type IntoIter = std::slice::Iter<'b, ContextEntry<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
