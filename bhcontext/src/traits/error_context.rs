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

/// Extension trait for attaching [`crate::Context`] to errors within [`crate::Result`].
///
/// This trait is implemented for the [`crate::Result`] type, to provide functionality for adding
/// context entries to the [`crate::Error`].  The errors stay the same, but carry the data
/// describing the failure.
pub trait ErrorContext<T, E>
where
    E: crate::BhError,
{
    /// A context entry is added to the [Err] variant, while the rest remains untouched.
    ///
    /// The value is lazily evaluated.
    fn ctx<K, V, F>(self, key: K, f: F) -> crate::Result<T, E>
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
        F: FnOnce() -> V;

    /// All the entries of the lazily evaluated context are added to the [Err] variant, while the
    /// rest remains untouched.
    fn ctx_all<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> crate::Context;
}

impl<T, E> ErrorContext<T, E> for crate::Result<T, E>
where
    E: crate::BhError,
{
    fn ctx<K, V, F>(self, key: K, f: F) -> crate::Result<T, E>
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
        F: FnOnce() -> V,
    {
        self.map_err(|error| error.ctx(key, f()))
    }

    fn ctx_all<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> crate::Context,
    {
        self.map_err(|error| error.ctx_all(f()))
    }
}
