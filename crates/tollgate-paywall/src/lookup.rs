//! Entitlement classification collaborator.

use std::{
    collections::HashSet,
    convert::Infallible,
    sync::{Arc, PoisonError, RwLock},
};

use serde::Serialize;
use tollgate_core::session::normalize_email;

/// Access tier reported by the lookup store for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Free,
    Paid,
    None,
}

/// Entitlement lookup interface, consulted once per login.
///
/// Implementations own how the free/paid sets are stored and populated;
/// the gate only ever asks for the classification of one email.
pub trait EntitlementLookup {
    type Error: std::error::Error;

    fn classify(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Classification, Self::Error>> + Send;
}

/// In-memory lookup: a fixed free allow-list plus a paid set written out of
/// band by the payment-completion path.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntitlements {
    free: Arc<HashSet<String>>,
    paid: Arc<RwLock<HashSet<String>>>,
}

impl MemoryEntitlements {
    pub fn new(free_emails: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        MemoryEntitlements {
            free: Arc::new(
                free_emails
                    .into_iter()
                    .map(|email| normalize_email(email.as_ref()))
                    .collect(),
            ),
            paid: Arc::default(),
        }
    }

    /// Marks an identity as paid. Called by the payment-completion handler,
    /// asynchronously and out of band from the gate's request path.
    pub fn mark_paid(&self, email: &str) {
        self.paid
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_email(email));
    }
}

impl EntitlementLookup for MemoryEntitlements {
    type Error = Infallible;

    async fn classify(&self, email: &str) -> Result<Classification, Infallible> {
        let email = normalize_email(email);
        if self.free.contains(&email) {
            return Ok(Classification::Free);
        }
        let paid = self.paid.read().unwrap_or_else(PoisonError::into_inner);
        Ok(if paid.contains(&email) {
            Classification::Paid
        } else {
            Classification::None
        })
    }
}
