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

use crate::traits::loggable::Warnable;

/// Trait for wrapping foreign errors into our [`crate::Error`] types.
///
/// This trait is implemented for the [`std::result::Result`] type, to provide functionality for
/// converting the received error to the [`crate::Error`], keeping the received error as its
/// source.
///
/// A foreign error which exposes context through [`ContextualError`][crate::ContextualError]
/// keeps it, but its type has to be registered with an
/// [`Inspector`][crate::chain::Inspector] to be recognized during traversal.
///
/// This should only be used when propagating from an error that is outside our system,
/// i.e. foreign.
///
/// Do *not* use this to propagate the errors that are already in our system, i.e. are already
/// [`crate::Error`].  For those, use the [`PropagateError`][crate::traits::PropagateError] trait.
pub trait ForeignError<T, S, E>
where
    S: std::error::Error + Send + Sync + 'static,
    E: crate::BhError,
{
    /// Maps a `Result<T, S>` to `Result<T, crate::Error<E>>`.
    ///
    /// The [Ok] variant is left untouched.
    ///
    /// An error `E` is wrapped inside a [crate::Error], with an [Err] variant value as its source.
    ///
    /// Note that the [Err] value can be any [std::error::Error] type, not only the [crate::Error].
    /// Furthermore, do *not* use this to propagate something that is already `Result<T,
    /// crate::Error<E>>`.  Use [PropagateError][crate::traits::PropagateError] instead.
    fn foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E;

    /// Maps a `Result<T, S>` to `Result<T, Error<E>>`.
    ///
    /// The [`Ok`] variant is left untouched.
    ///
    /// An error is created by applying a function `F` to the type `S` from the contained [Err]
    /// variant.
    fn match_foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E;
}

impl<T, S, E> ForeignError<T, S, E> for std::result::Result<T, S>
where
    S: std::error::Error + Send + Sync + 'static,
    E: crate::BhError,
{
    #[track_caller]
    fn foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E,
    {
        self.map_err(|source| crate::Error::from_foreign_source(f(), source))
            .log_warn(*std::panic::Location::caller())
    }

    #[track_caller]
    fn match_foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E,
    {
        self.map_err(|source| crate::Error::from_foreign_source(f(&source), source))
            .log_warn(*std::panic::Location::caller())
    }
}

/// Trait for wrapping boxed foreign errors into our [`crate::Error`] types.
///
/// This trait is essentially the [`ForeignError`] trait but implemented for
/// `std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>`.
pub trait ForeignBoxed<T, E>
where
    E: crate::BhError,
{
    /// Maps a `Result<T, Box<dyn std::error::Error + Send + Sync>>>` to `Result<T, Error<E>>`.
    ///
    /// The [Ok] variant is left untouched.
    ///
    /// An error `E` is wrapped inside a [crate::Error], with an [Err] value as its source.
    fn foreign_boxed_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E;
}

impl<T, E> ForeignBoxed<T, E> for std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>
where
    E: crate::BhError,
{
    #[track_caller]
    fn foreign_boxed_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E,
    {
        self.map_err(|source| crate::Error::from_foreign_boxed_source(f(), source))
            .log_warn(*std::panic::Location::caller())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ForeignError as _;
    use crate::{chain::Inspector, traits::ForeignBoxed, Context, ContextualError};

    // A third-party error exposing its own context.
    #[derive(Debug)]
    struct HttpError {
        status: u16,
        context: Context,
    }

    impl HttpError {
        fn new(status: u16) -> Self {
            let serde_json::Value::Object(context) = json!({
                "headers": {"Content-Type": "application/json"},
                "statusCode": status,
            }) else {
                unreachable!()
            };
            Self { status, context }
        }
    }

    impl std::error::Error for HttpError {}

    impl std::fmt::Display for HttpError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "HTTP status {}", self.status)
        }
    }

    impl ContextualError for HttpError {
        fn context(&self) -> &Context {
            &self.context
        }
    }

    #[derive(Debug, PartialEq)]
    enum ClientError {
        Retryable,
        Rejected,
    }

    impl std::fmt::Display for ClientError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Retryable => write!(f, "Retryable"),
                Self::Rejected => write!(f, "Rejected"),
            }
        }
    }

    impl crate::BhError for ClientError {}

    fn classify(error: &HttpError) -> ClientError {
        if error.status >= 500 {
            ClientError::Retryable
        } else {
            ClientError::Rejected
        }
    }

    fn non_failing_function() -> std::result::Result<(), HttpError> {
        Ok(())
    }

    fn failing_function(status: u16) -> std::result::Result<(), HttpError> {
        Err(HttpError::new(status))
    }

    fn non_failing_function_boxed(
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn failing_function_boxed(
        status: u16,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(HttpError::new(status)))
    }

    #[test]
    fn test_foreign_err() {
        assert!(non_failing_function()
            .foreign_err(|| ClientError::Rejected)
            .is_ok());

        let error = failing_function(503)
            .foreign_err(|| ClientError::Retryable)
            .unwrap_err();

        assert_eq!(error.error, ClientError::Retryable);
        assert!(matches!(
            error.source,
            Some(crate::ErrorSource::ForeignError(_))
        ));
    }

    #[test]
    fn test_foreign_context_needs_registration() {
        let error = failing_function(503)
            .foreign_err(|| ClientError::Retryable)
            .map_err(|error| error.ctx("attempt", 2))
            .unwrap_err();

        let chain = error.collect_context();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].error_name(), "ClientError");

        let chain = error.collect_context_with(&Inspector::default().with_capability::<HttpError>());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].error_name(), "HttpError");
        assert_eq!(
            serde_json::Value::Object(chain[1].context().clone()),
            json!({
                "headers": {"Content-Type": "application/json"},
                "statusCode": 503,
            })
        );
    }

    #[test]
    fn test_match_foreign_err() {
        assert!(non_failing_function().match_foreign_err(classify).is_ok());

        let error = failing_function(404)
            .match_foreign_err(classify)
            .unwrap_err();
        assert_eq!(error.error, ClientError::Rejected);

        let error = failing_function(502)
            .match_foreign_err(classify)
            .unwrap_err();
        assert_eq!(error.error, ClientError::Retryable);
        assert!(matches!(
            error.source,
            Some(crate::ErrorSource::ForeignError(_))
        ));
    }

    #[test]
    fn test_foreign_boxed_err() {
        assert!(non_failing_function_boxed()
            .foreign_boxed_err(|| ClientError::Rejected)
            .is_ok());

        let error = failing_function_boxed(500)
            .foreign_boxed_err(|| ClientError::Retryable)
            .unwrap_err();

        assert_eq!(error.error, ClientError::Retryable);
        let chain = error.collect_context_with(&Inspector::default().with_capability::<HttpError>());
        assert_eq!(chain[1].context()["statusCode"], 500);
    }
}
