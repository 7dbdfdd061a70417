// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Every 2xx body is `{"data": ...}`; every error body is
/// `{"error": {...}}` via [`crate::ApiError::envelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiResponseEnvelope<T> {
    pub data: T,
}

impl<T> ApiResponseEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
