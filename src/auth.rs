use actix_web::{dev, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::{consts::ADMIN_PIN_HEADER, error::{Error, Result}};

/// Shared admin PIN check
///
/// Only the digest of the configured PIN is kept around.
pub struct Authority {
    pin_digest: Vec<u8>,
}

impl Authority {
    pub fn new(pin: impl AsRef<[u8]>) -> Self {
        Self {
            pin_digest: Sha256::digest(pin.as_ref()).to_vec(),
        }
    }

    fn verify(&self, pin: &str) -> bool {
        Sha256::digest(pin.as_bytes()).as_slice() == self.pin_digest.as_slice()
    }

    pub fn authorize(&self, operation: Operation, pin: &AdminPin) -> Result<()> {
        if !operation.is_privileged() {
            return Ok(());
        }

        match pin.0.as_deref() {
            Some(pin) if self.verify(pin) => Ok(()),
            _ => {
                warn!(?operation, "rejected privileged operation");

                Err(Error::Unauthorized)
            }
        }
    }
}

/// Everything the service can be asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListGroups,
    CreateGroup,
    UpdateGroup,
    DeleteGroup,
    ViewGroupWorkers,
    AddGroupMember,
    RemoveGroupMember,
    ListWorkers,
    ViewWorker,
    CreateWorker,
    UpdateWorker,
    DeleteWorker,
    ClockIn,
    ClockOut,
    ViewSessions,
    ListAdvances,
    GiveAdvance,
    MarkAdvancePaid,
    ListLoans,
    GiveLoan,
    RecordLoanPayment,
    ViewPaymentSummary,
}

impl Operation {
    /// Whether the admin PIN must accompany the operation
    pub fn is_privileged(self) -> bool {
        matches!(
            self,
            Operation::CreateGroup
                | Operation::UpdateGroup
                | Operation::DeleteGroup
                | Operation::AddGroupMember
                | Operation::RemoveGroupMember
                | Operation::CreateWorker
                | Operation::UpdateWorker
                | Operation::DeleteWorker
                | Operation::GiveAdvance
                | Operation::MarkAdvancePaid
                | Operation::GiveLoan
                | Operation::RecordLoanPayment
        )
    }
}

/// PIN presented with a request through the `X-Admin-Pin` header
///
/// Extraction never fails, a missing PIN is rejected by [`Authority::authorize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPin(pub Option<String>);

impl AdminPin {
    /// Falls back to a PIN sent in the request body when the header is absent
    pub fn or(self, body_pin: Option<String>) -> Self {
        Self(self.0.or(body_pin))
    }
}

impl FromRequest for AdminPin {
    type Error = actix_web::Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let pin = req.headers()
            .get(ADMIN_PIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());

        ready(Ok(Self(pin)))
    }
}
