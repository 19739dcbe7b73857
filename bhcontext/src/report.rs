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

//! Hand-off of errors and their context to the [`log`] facade.
//!
//! A [`Report`] is what a top-level error handler builds from a caught error: the messages of
//! the whole causal chain plus the context extracted from it.  [`Report::log`] forwards the
//! messages as the log message and the context as the structured `context` key-value, a JSON
//! array of the collected entries (see [`ContextChain::to_value`]) handed over through
//! `log`'s serde support.  Sinks receive the nested mapping as is.

use crate::{
    chain::{ContextChain, Inspector},
    BhError,
};

/// An error prepared for the operator-facing logs.
#[derive(Debug, Clone)]
pub struct Report<'a> {
    message: String,
    chain: ContextChain<'a>,
}

impl<'a> Report<'a> {
    /// Creates a report of any error, recognizing contextual errors with `inspector`.
    ///
    /// A concrete [`crate::Error<E>`] passed in here is not recognized as contextual, so its own
    /// context is missing from the report; only its sources are.  Use [`Report::from_error`] for
    /// it, or [erase][crate::Error::erased] it first.
    pub fn new(error: &'a (dyn std::error::Error + 'static), inspector: &Inspector) -> Self {
        Self {
            message: chain_message(error, inspector.max_depth()),
            chain: inspector.collect(error),
        }
    }

    /// Creates a report of a [`crate::Error`], including the context of the error itself.
    pub fn from_error<E>(error: &'a crate::Error<E>, inspector: &Inspector) -> Self
    where
        E: BhError,
    {
        Self {
            message: chain_message(error, inspector.max_depth()),
            chain: error.collect_context_with(inspector),
        }
    }

    /// Messages of the errors in the chain, outermost first, separated by `": "`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The context extracted from the chain.
    pub fn chain(&self) -> &ContextChain<'a> {
        &self.chain
    }

    /// Logs the report with the given `target` and `level`.
    pub fn log(&self, target: &str, level: log::Level) {
        log::log!(target: target, level, context:serde = self.chain.to_value(); "{}", self.message);
    }
}

fn chain_message(error: &(dyn std::error::Error + 'static), max_depth: usize) -> String {
    std::iter::successors(Some(error), |&error| error.source())
        .take(max_depth.max(1))
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::traits::{ForeignError, PropagateError};

    #[derive(Debug, PartialEq)]
    enum LookupError {
        MissingUser,
    }

    impl std::fmt::Display for LookupError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::MissingUser => write!(f, "user not found"),
            }
        }
    }

    impl BhError for LookupError {}

    struct RequestError;

    impl std::fmt::Display for RequestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "request failed")
        }
    }

    impl BhError for RequestError {}

    fn failing_request() -> crate::Error<RequestError> {
        Err::<(), _>(std::io::Error::other("connection reset"))
            .foreign_err(|| LookupError::MissingUser)
            .map_err(|error| error.ctx("userId", 42))
            .with_err(|| RequestError)
            .map_err(|error| error.ctx("requestId", "abc"))
            .unwrap_err()
    }

    struct CapturingLogger {
        records: Mutex<Vec<(log::Level, String, serde_json::Value)>>,
    }

    impl log::Log for CapturingLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if record.target() != "report-test" {
                return;
            }
            let context = record
                .key_values()
                .get(log::kv::Key::from_str("context"))
                .and_then(|value| serde_json::to_value(&value).ok())
                .unwrap_or_default();
            self.records.lock().unwrap().push((
                record.level(),
                record.args().to_string(),
                context,
            ));
        }

        fn flush(&self) {}
    }

    static LOGGER: CapturingLogger = CapturingLogger {
        records: Mutex::new(Vec::new()),
    };

    #[test]
    fn test_from_error() {
        let error = failing_request();
        let report = Report::from_error(&error, &Inspector::default());

        assert_eq!(
            report.message(),
            "request failed: user not found: connection reset"
        );
        assert_eq!(
            report.chain().to_value(),
            json!([
                {"error": "RequestError", "context": {"requestId": "abc"}},
                {"error": "LookupError", "context": {"userId": 42}},
            ])
        );
    }

    #[test]
    fn test_new_needs_erased_outermost_error() {
        let error = failing_request();

        // Only the sources of a concrete `Error<E>` are recognized.
        let report = Report::new(&error, &Inspector::default());
        assert_eq!(report.chain().len(), 1);
        assert_eq!(report.chain()[0].error_name(), "LookupError");

        let erased = error.erased();
        let report = Report::new(&erased, &Inspector::default());
        let names: Vec<_> = report.chain().iter().map(|entry| entry.error_name()).collect();
        assert_eq!(names, ["RequestError", "LookupError"]);
        assert_eq!(report.chain().to_value(), Report::from_error(&erased, &Inspector::default()).chain().to_value());
    }

    #[test]
    fn test_log() {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Trace);

        let error = failing_request();
        Report::from_error(&error, &Inspector::default()).log("report-test", log::Level::Error);

        let records = LOGGER.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let (level, message, context) = &records[0];
        assert_eq!(*level, log::Level::Error);
        assert_eq!(message, "request failed: user not found: connection reset");
        assert_eq!(
            context,
            &json!([
                {"error": "RequestError", "context": {"requestId": "abc"}},
                {"error": "LookupError", "context": {"userId": 42}},
            ])
        );
    }
}
