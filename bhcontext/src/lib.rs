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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides structured error context used across all of the TBTL's Rust code.
//!
//! Errors carry a [`Context`], a mapping of string keys to arbitrary JSON values describing the
//! failure, along with the chain of source errors they were raised from.  Generic handlers and
//! loggers can then extract the context of every error in a chain without knowing the concrete
//! error types involved.
//!
//! # Details
//!
//! Use `std::result::Result<T, bhcontext::Error<E>>`, or equivalently `bhcontext::Result<T, E>`
//! as the return type for functions which may return an error.
//!
//! The error type `E` in `bhcontext::Error<E>` must implement the [`BhError`] trait.  Therefore,
//! all of our concrete error types must implement [`BhError`].
//!
//! Constructing the initial, root error is done via the [`Error::root`] method, which also logs a
//! warning.  Context is attached where the failure is detected, using [`Error::ctx`] or the
//! [`ErrorContext`][traits::ErrorContext] extension trait on [`Result`].
//!
//! Wrapping is the only way to add a new layer of context without losing the inner one.  Errors
//! already in our system are wrapped via the [`PropagateError`][traits::PropagateError] trait,
//! while "foreign errors", i.e. types implementing [`std::error::Error`] but not [`BhError`], are
//! wrapped via the [`ForeignError`][traits::ForeignError] trait.
//!
//! Any error type may expose context by implementing the [`ContextualError`] capability.  The
//! context of a whole causal chain is extracted, outermost error first and root cause last, with
//! [`Error::collect_context`] or [`collect_context`][chain::collect_context].  The traversal is
//! configured through an [`Inspector`][chain::Inspector].
//!
//! Context is meant for operators, not end users.  The [`std::fmt::Display`] implementation of
//! [`Error`] writes the top-level error only, while the [`std::fmt::Debug`] implementation, the
//! [`Report`][report::Report] and the [`Loggable`][traits::Loggable] trait include the context.
//!
//! # Examples
//!
//! ```
//! use bhcontext::traits::{ErrorContext, ForeignError, PropagateError};
//!
//! enum ParseErrors {
//!     NumberIsNegativeError,
//!     NumberParseError,
//! }
//!
//! impl std::fmt::Display for ParseErrors {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         match self {
//!             ParseErrors::NumberIsNegativeError => write!(f, "number is negative"),
//!             ParseErrors::NumberParseError => write!(f, "not a number"),
//!         }
//!     }
//! }
//!
//! impl bhcontext::BhError for ParseErrors {}
//!
//! fn parse(s: &str) -> bhcontext::Result<i32, ParseErrors> {
//!     let num = s
//!         .parse()
//!         // Wrap a "foreign error" and log it as a warning.
//!         .foreign_err(|| ParseErrors::NumberParseError)
//!         // Describe the failure.
//!         .ctx("input", || s)?;
//!     if num < 0 {
//!         Err(bhcontext::Error::root(ParseErrors::NumberIsNegativeError).ctx("number", num))
//!     } else {
//!         Ok(num)
//!     }
//! }
//!
//! struct RequestError;
//!
//! impl std::fmt::Display for RequestError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "invalid request")
//!     }
//! }
//!
//! impl bhcontext::BhError for RequestError {}
//!
//! fn handle(request_id: &str) -> bhcontext::Result<i32, RequestError> {
//!     parse("-3")
//!         .with_err(|| RequestError)
//!         .ctx("requestId", || request_id.to_owned())
//! }
//!
//! let error = handle("abc").unwrap_err();
//! let chain = error.collect_context();
//!
//! assert_eq!(chain.len(), 2);
//! assert_eq!(chain[0].error_name(), "RequestError");
//! assert_eq!(chain[0].context()["requestId"], "abc");
//! assert_eq!(chain[1].error_name(), "ParseErrors");
//! assert_eq!(chain[1].context()["number"], -3);
//! ```

use std::{any::Any, ops::Deref};

use crate::{
    chain::{ContextChain, Inspector},
    context::short_type_name,
    traits::loggable::Warnable,
};

pub mod adapters;
pub mod chain;
pub mod context;
mod display;
pub mod report;
pub mod traits;

pub use context::{Context, ContextualError};

/// The trait needed for compatibility with the [`Error`] functionality.
pub trait BhError: std::fmt::Display + Send + Sync + 'static {}

/// Hacky trait to enable downcasting from trait objects of it.
///
/// See: <https://lucumr.pocoo.org/2022/1/7/as-any-hack/>
pub trait BhErrorAny: BhError + Any {
    /// Return `self` as [Any] type.
    fn as_any(&self) -> &dyn Any;
}

impl<E: BhError> BhErrorAny for E {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// This impl covers all boxed error types, including `dyn BhError`
impl<E: BhError + ?Sized> BhError for Box<E> {}

/// Error containing type-erased [`BhError`].
///
/// Every [`Error`] stored as the source of another [`Error`] is kept in this form, which lets
/// chain traversal recognize it with a plain downcast.
pub type ErrorDyn = Error<Box<dyn BhErrorAny>>;

enum ErrorSource {
    KnownError(Box<ErrorDyn>),
    ForeignError(Box<dyn std::error::Error + Send + Sync>),
}

/// A struct that should be used for all errors in our projects.
///
/// It wraps specific errors created to model different error groups. Those errors should all
/// implement the [`BhError`] trait in order to be compatible. They should not implement the
/// [`std::error::Error`] trait themselves, it will be handled by this [`Error`] struct.
///
/// Alongside the concrete error it keeps the [`Context`] describing the failure and the source
/// error it was raised from, if any.  The context can only be extended while the error is owned,
/// through the consuming [`Error::ctx`] and [`Error::ctx_all`] methods, so it never changes while
/// someone is reading it.
pub struct Error<E>
where
    E: BhError,
{
    /// The concrete error variant.
    pub error: E,
    /// Name of the concrete error type, reported along with the context.
    name: &'static str,
    /// The structured context of the error.
    context: Context,
    /// The error source, to be able to backtrace errors.
    source: Option<ErrorSource>,
}

/// The [`std::result::Result`] wrapper that wraps the error object into [`Error`].
pub type Result<T, E> = std::result::Result<T, Error<E>>;

impl<E> Error<E>
where
    E: BhError,
{
    /// Create a root error (i.e. it does not have a source) and log a warning.
    ///
    /// It should be used in places where an error happened for the first time.  E.g. within `if`
    /// or `if let` constructs.
    ///
    /// Do *not* use this method to propagate another error, because the whole error chain will be
    /// lost.  If you want to propagate an error (i.e. track the source error), use either a method
    /// from the [traits::ForeignError] or the [traits::PropagateError].
    #[track_caller]
    pub fn root(error: E) -> Self {
        Self::new(error, None).log_warn(*std::panic::Location::caller())
    }

    fn new(error: E, source: Option<ErrorSource>) -> Self {
        Self {
            error,
            name: short_type_name(std::any::type_name::<E>()),
            context: Context::new(),
            source,
        }
    }

    /// Creates an error from its source, which is a foreign (unknown) error.
    ///
    /// The method should stay private, as it should not be used from the library/service code.
    fn from_foreign_source<S>(error: E, source: S) -> Self
    where
        S: std::error::Error + Send + Sync + 'static,
    {
        Self::new(error, Some(ErrorSource::ForeignError(Box::new(source))))
    }

    /// Creates an error from its source, which is a known error.
    ///
    /// The source is type-erased, keeping its name and context intact.
    fn from_known_source<S>(error: E, source: Error<S>) -> Self
    where
        S: BhError,
    {
        Self::new(error, Some(ErrorSource::KnownError(Box::new(source.erased()))))
    }

    /// Creates an error from its source, which is a foreign (unknown) error.  Here, a concrete
    /// error type is not known at compile time.
    ///
    /// The method should stay private, as it should not be used from the library/service code.
    fn from_foreign_boxed_source(
        error: E,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::new(error, Some(ErrorSource::ForeignError(source)))
    }

    /// Adds a context entry to the error and returns it.  It should be used to describe the
    /// failure with data available where it was detected.
    ///
    /// The method takes ownership of `self` so that the method can be chained.  Adding a `key`
    /// which is already present replaces its value.
    pub fn ctx<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Adds all the entries of `context` to the error and returns it.
    ///
    /// Entries with keys already present replace the existing values.
    pub fn ctx_all(mut self, context: Context) -> Self {
        self.context.extend(context);
        self
    }

    /// Extracts the context of this error and of every error in its causal chain, using the
    /// default [`Inspector`].
    ///
    /// The outermost error, i.e. `self`, comes first and the root cause comes last.
    pub fn collect_context(&self) -> ContextChain<'_> {
        self.collect_context_with(&Inspector::default())
    }

    /// Extracts the context of this error and of every error in its causal chain, recognizing
    /// contextual errors and bounding the traversal as configured by `inspector`.
    pub fn collect_context_with(&self, inspector: &Inspector) -> ContextChain<'_> {
        let source = std::error::Error::source(self);
        inspector.collect_after(self, source)
    }

    /// Type-erases the error, making it wrap a `dyn BhError` trait object.
    ///
    /// This is mostly useful when implementing traits which must be object-safe but the type of
    /// possible errors is not statically known; in such cases, [ErrorDyn] can be used instead of
    /// associated error types.
    pub fn erased(self) -> ErrorDyn {
        Error {
            error: Box::new(self.error),
            name: self.name,
            context: self.context,
            source: self.source,
        }
    }
}

impl ErrorDyn {
    /// Tries downcasting the contained `dyn BhErrorAny` to `E`.
    ///
    /// This is mostly useful when trying to recover the concrete error type to match on after it
    /// had been erased previously.
    pub fn downcast_ref_inner<E: BhError>(&self) -> Option<&E> {
        // The `.deref()` is important, since we want to call `.as_any()` with
        // `&dyn BhErrorAny`, not `&Box<dyn BhErrorAny>`, which would compile
        // but give `None` when downcasting to
        // https://lucumr.pocoo.org/2022/1/7/as-any-hack/
        self.error.deref().as_any().downcast_ref()
    }
}

impl<E> ContextualError for Error<E>
where
    E: BhError,
{
    fn context(&self) -> &Context {
        &self.context
    }

    fn error_name(&self) -> &'static str {
        self.name
    }
}

// Make the Error a std::error::Error type.
impl<E> std::error::Error for Error<E>
where
    E: BhError,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|source| match source {
            ErrorSource::KnownError(source) => &**source as _,
            // "as _" here denotes casting to the output type, i.e. from
            // (Error + Send + Sync) to (Error + 'static). It is the same as
            // using "as &(dyn std::error::Error + 'static)".
            ErrorSource::ForeignError(source) => source.as_ref() as _,
        })
    }
}
