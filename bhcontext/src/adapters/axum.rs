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

//! [BhError] adapter for the [axum] web framework.
//!
//! This module provides a trait [`IntoAxumResponse`] for easy conversion from [`Error<BhError>`]
//! types to [`axum::response::Response`].
//!
//! The response only carries the status code and the [`std::fmt::Display`] output of the
//! top-level error.  The context of the error chain is meant for operators, so it is logged via
//! a [`Report`] instead of being sent to the client.
//!
//! To use this facility, implement [`IntoAxumResponse`] for all concrete [`BhError`] types you
//! wish to return as an [axum] framework [HTTP response][axum::response::Response].

pub use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::{chain::Inspector, report::Report, BhError, Error};

/// Trait for converting [`BhError`] types to [`axum::response::Response`].
pub trait IntoAxumResponse: BhError {
    /// Get the [HTTP Status Code][StatusCode] for this instance of [`BhError`].
    fn http_status_code(&self) -> StatusCode;

    /// Convert this instance of [`BhError`] to [`axum::response::Response`].
    ///
    /// The default implementation will do the conversion by using [`Self::http_status_code`] and
    /// the [`std::fmt::Display`] implementation of [`BhError`].
    fn into_axum_response(self) -> axum::response::Response
    where
        Self: Sized,
    {
        (self.http_status_code(), self.to_string()).into_response()
    }
}

impl<E: IntoAxumResponse> axum::response::IntoResponse for Error<E> {
    fn into_response(self) -> axum::response::Response {
        let level = if self.error.http_status_code().is_server_error() {
            log::Level::Error
        } else {
            log::Level::Warn
        };
        Report::from_error(&self, &Inspector::default()).log(module_path!(), level);

        self.error.into_axum_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NotFound;

    impl std::fmt::Display for NotFound {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "resource not found")
        }
    }

    impl BhError for NotFound {}

    impl IntoAxumResponse for NotFound {
        fn http_status_code(&self) -> StatusCode {
            StatusCode::NOT_FOUND
        }
    }

    #[tokio::test]
    async fn test_into_response() {
        let response = Error::root(NotFound)
            .ctx("apiKey", "sk-live-1234")
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(body, "resource not found");
        assert!(!body.contains("sk-live-1234"));
        assert!(!body.contains("apiKey"));
    }
}
