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

/// Trait for propagating received errors within our [`crate::Error`] system.
///
/// This trait is implemented for the [`crate::Result`] type, to provide functionality for
/// wrapping received errors into the return-type errors.  The received error becomes the source
/// of the new one, keeping its context, so the context of both can be collected afterwards.
///
/// This should always be used when propagating from the errors that are already in our system,
/// i.e. the [`crate::Result`] type.
///
/// To wrap errors that aren't part of our [`crate::Error`] system, use the
/// [`ForeignError`][crate::traits::ForeignError] trait.
pub trait PropagateError<T, S, E>
where
    S: crate::BhError,
    E: crate::BhError,
{
    /// Maps a `Result<T, Error<S>>` to `Result<T, Error<E>>`.
    ///
    /// The [Ok] variant is left untouched.
    ///
    /// An error `E` is wrapped inside a [crate::Error], with an [Err] value as its source.  The
    /// new error starts with an empty context of its own.
    fn with_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E;

    /// Maps a `Result<T, Error<S>>` to `Result<T, Error<E>>`.
    ///
    /// The [Ok] value is left untouched.
    ///
    /// An error is created by applying a function `F` to the type `S` from the contained [Err]
    /// variant.
    ///
    /// Use this method to return a different error type `E` by matching on the received error
    /// value `S`.
    fn match_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E;
}

impl<T, S, E> PropagateError<T, S, E> for crate::Result<T, S>
where
    S: crate::BhError,
    E: crate::BhError,
{
    fn with_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E,
    {
        self.map_err(|source| crate::Error::from_known_source(f(), source))
    }

    fn match_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E,
    {
        self.map_err(|source| crate::Error::from_known_source(f(&source.error), source))
    }
}
