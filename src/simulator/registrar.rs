use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Gate;
use crate::ProvisioningError;
use crate::RegistrationClient;
use crate::RegistrationRequest;
use crate::RegistrationResult;
use crate::RegistrationStatus;

/// Registration service answering every request with a scripted result.
#[derive(Debug)]
pub struct SimulatedRegistrar {
    answer: Mutex<Result<RegistrationResult, ProvisioningError>>,
    requests: Mutex<Vec<RegistrationRequest>>,
    gate: Gate,
}

impl SimulatedRegistrar {
    pub fn new(answer: Result<RegistrationResult, ProvisioningError>) -> Self {
        Self {
            answer: Mutex::new(answer),
            requests: Mutex::new(Vec::new()),
            gate: Gate::open(),
        }
    }

    /// Assigns every device to `hub` under `device_id`
    pub fn assigning(
        hub: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self::new(Ok(RegistrationResult::assigned(hub, device_id)))
    }

    pub fn rejecting(
        status: RegistrationStatus,
        code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Ok(RegistrationResult::rejected(status, code, message)))
    }

    pub fn set_answer(
        &self,
        answer: Result<RegistrationResult, ProvisioningError>,
    ) {
        *self.answer.lock() = answer;
    }

    /// Blocks registrations until [`SimulatedRegistrar::release`]
    pub fn hold(&self) {
        self.gate.hold();
    }

    pub fn release(&self) {
        self.gate.release();
    }

    pub fn requests(&self) -> Vec<RegistrationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RegistrationClient for SimulatedRegistrar {
    async fn register(
        &self,
        request: RegistrationRequest,
        cancel: CancellationToken,
    ) -> Result<RegistrationResult, ProvisioningError> {
        debug!(registration_id = %request.identity.registration_id, "simulated registration");
        self.requests.lock().push(request);

        if !self.gate.pass(&cancel).await {
            return Err(ProvisioningError::Unreachable("registration canceled".into()));
        }
        self.answer.lock().clone()
    }
}
