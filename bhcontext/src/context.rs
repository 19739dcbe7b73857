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

//! The context capability shared by all errors which carry structured diagnostic data.

/// Structured diagnostic data attached to an error at the place it was raised.
///
/// Keys are plain strings and values are arbitrary JSON values, so scalars, sequences and nested
/// mappings can all be stored.  Key order carries no meaning.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Capability of an error to expose its [`Context`].
///
/// Generic error handling code uses this trait to discover context without knowing the concrete
/// error type.  How the context gets populated is up to the implementer: a constructor argument,
/// a builder or a factory function are all fine.
///
/// The [`crate::Error`] wrapper implements this trait already.  Foreign error types may implement
/// it directly and register themselves with an [`Inspector`][crate::chain::Inspector] so they are
/// recognized anywhere in a causal chain.
pub trait ContextualError {
    /// Returns the context of this error.
    ///
    /// Implementations must be total and free of side effects: the context is read from already
    /// constructed state and should never change once the error has propagated.
    fn context(&self) -> &Context;

    /// Returns the name under which the context of this error is reported.
    ///
    /// Defaults to the type name of the implementer, without its module path.
    fn error_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Strips the module path and generic arguments off a type name returned by
/// [`std::any::type_name`].
///
/// Tuple, array and slice type names have no single path to strip and are returned unchanged.
///
/// ```
/// assert_eq!(bhcontext::context::short_type_name("app::errors::DbError"), "DbError");
/// assert_eq!(bhcontext::context::short_type_name("bhcontext::Error<app::E>"), "Error");
/// assert_eq!(bhcontext::context::short_type_name("(a::B, c::D)"), "(a::B, c::D)");
/// ```
pub fn short_type_name(full: &'static str) -> &'static str {
    if full.starts_with(|c: char| matches!(c, '(' | '[')) {
        return full;
    }

    let base = match full.find('<') {
        Some(generics) => &full[..generics],
        None => full,
    };
    base.rsplit("::").next().unwrap_or(base)
}
