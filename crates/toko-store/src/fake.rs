// SPDX-License-Identifier: Apache-2.0

use crate::orders::{PaymentGateway, PaymentGatewayError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use toko_model::PaymentRequest;

/// In-process gateway double for tests: hands out a fixed token or fails
/// every call, and records what it was asked to charge.
#[derive(Debug, Default)]
pub struct FakePaymentGateway {
    token: Option<String>,
    calls: AtomicU64,
    last_request: Mutex<Option<PaymentRequest>>,
}

impl FakePaymentGateway {
    #[must_use]
    pub fn succeeding(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            calls: AtomicU64::new(0),
            last_request: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            token: None,
            calls: AtomicU64::new(0),
            last_request: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_request(&self) -> Option<PaymentRequest> {
        self.last_request
            .lock()
            .map(|req| req.clone())
            .unwrap_or_default()
    }
}

impl PaymentGateway for FakePaymentGateway {
    fn create_transaction(&self, request: &PaymentRequest) -> Result<String, PaymentGatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => Err(PaymentGatewayError("gateway unavailable".to_string())),
        }
    }
}
