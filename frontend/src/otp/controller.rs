use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use crate::{
    api::MessagingService,
    error::{ClientError, Notice},
    utils::time::format_countdown,
};

use super::{
    countdown::Countdown,
    utils::{mask_phone, validate_code, validate_phone_number, CodeBuffer, CODE_LENGTH},
};

pub const DEFAULT_COUNTDOWN_SECS: u64 = 10;
pub const RESEND_SUCCESS_MESSAGE: &str = "OTP resent successfully!";
pub const VERIFIED_MESSAGE: &str = "Phone number verified successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpState {
    AwaitingPhone,
    CodeSent,
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    /// Resend refused locally; no request was made.
    NotYet { remaining_secs: u64 },
}

#[derive(Debug)]
struct Attempt {
    state: OtpState,
    phone_number: Option<String>,
    code: CodeBuffer,
    countdown: Countdown,
    notice: Option<Notice>,
}

impl Default for Attempt {
    fn default() -> Self {
        Self {
            state: OtpState::AwaitingPhone,
            phone_number: None,
            code: CodeBuffer::new(),
            countdown: Countdown::default(),
            notice: None,
        }
    }
}

/// Phone verification flow: send a code, enter it, verify it, with a rate-limited resend.
///
/// All operations take `&self`. A second network operation started while one is pending is
/// rejected with [`ClientError::InFlight`]; reads stay available throughout.
pub struct OtpController {
    service: Arc<dyn MessagingService>,
    countdown_secs: u64,
    auto_tick: bool,
    attempt: Mutex<Attempt>,
    in_flight: AtomicBool,
    // Bumped by `reset`; responses that arrive for an older attempt are dropped.
    epoch: AtomicU64,
}

struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl OtpController {
    pub fn new(service: Arc<dyn MessagingService>, countdown_secs: u64) -> Self {
        Self {
            service,
            countdown_secs,
            auto_tick: true,
            attempt: Mutex::new(Attempt::default()),
            in_flight: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        }
    }

    /// Do not spawn a ticker; the host calls [`OtpController::tick`] itself.
    pub fn with_manual_ticks(mut self) -> Self {
        self.auto_tick = false;
        self
    }

    fn attempt(&self) -> MutexGuard<'_, Attempt> {
        self.attempt.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_flight(&self) -> Result<FlightGuard<'_>, ClientError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ClientError::InFlight);
        }
        Ok(FlightGuard(&self.in_flight))
    }

    fn fail(&self, err: ClientError) -> ClientError {
        self.attempt().notice = Some(Notice::from(&err));
        err
    }

    fn require_state(&self, expected: OtpState) -> Result<(), ClientError> {
        let state = self.attempt().state;
        if state == expected {
            return Ok(());
        }
        let message = match state {
            OtpState::AwaitingPhone => "Request a code before continuing",
            OtpState::CodeSent => "A code has already been sent to this number",
            OtpState::Verified => "This phone number is already verified",
        };
        Err(ClientError::validation(message))
    }

    pub fn state(&self) -> OtpState {
        self.attempt().state
    }

    pub fn phone_number(&self) -> Option<String> {
        self.attempt().phone_number.clone()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.attempt().countdown.remaining()
    }

    /// Remaining wait as shown next to the resend action, e.g. `0:07`.
    pub fn countdown_label(&self) -> String {
        format_countdown(self.remaining_secs())
    }

    pub fn can_resend(&self) -> bool {
        let attempt = self.attempt();
        attempt.state == OtpState::CodeSent && attempt.countdown.remaining() == 0
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn notice(&self) -> Option<Notice> {
        self.attempt().notice.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.attempt()
            .notice
            .as_ref()
            .filter(|n| n.is_error())
            .map(|n| n.message().to_string())
    }

    pub fn code(&self) -> CodeBuffer {
        self.attempt().code.clone()
    }

    pub fn enter_digit(&self, index: usize, input: &str) -> Result<(), ClientError> {
        self.attempt().code.enter(index, input)
    }

    pub fn backspace(&self, index: usize) {
        self.attempt().code.backspace(index);
    }

    pub fn paste_code(&self, text: &str) -> bool {
        self.attempt().code.paste(text)
    }

    /// Send a code to `phone`. On success the flow moves to `CodeSent` and the resend
    /// countdown starts; on failure the state is unchanged and the error is recorded.
    pub async fn submit_phone(&self, phone: &str) -> Result<(), ClientError> {
        self.require_state(OtpState::AwaitingPhone)?;
        let phone = validate_phone_number(phone).map_err(|e| self.fail(e))?;
        let _flight = self.begin_flight()?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.attempt().notice = None;

        let result = self.service.send_code(&phone).await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("Discarding send result for an abandoned attempt");
            return Ok(());
        }
        match result {
            Ok(_) => {
                tracing::info!(phone = %mask_phone(&phone), "Verification code sent");
                let mut attempt = self.attempt();
                attempt.state = OtpState::CodeSent;
                attempt.phone_number = Some(phone);
                attempt.code.clear();
                attempt.countdown.restart(self.countdown_secs, self.auto_tick);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Sending verification code failed");
                Err(self.fail(err))
            }
        }
    }

    /// Verify a six-digit code against the phone number the code was sent to.
    pub async fn submit_code(&self, digits: &str) -> Result<(), ClientError> {
        self.require_state(OtpState::CodeSent)?;
        let code = validate_code(digits).map_err(|e| self.fail(e))?;
        let _flight = self.begin_flight()?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        let phone = {
            let mut attempt = self.attempt();
            attempt.code.paste(&code);
            attempt.notice = None;
            attempt.phone_number.clone().unwrap_or_default()
        };

        let result = self.service.verify_code(&phone, &code).await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("Discarding verify result for an abandoned attempt");
            return Ok(());
        }
        match result {
            Ok(_) => {
                tracing::info!(phone = %mask_phone(&phone), "Phone number verified");
                let mut attempt = self.attempt();
                attempt.state = OtpState::Verified;
                attempt.countdown.clear();
                attempt.notice = Some(Notice::info(VERIFIED_MESSAGE));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Code verification failed");
                Err(self.fail(err))
            }
        }
    }

    /// Submit whatever has been typed into the six input positions.
    pub async fn submit_entered_code(&self) -> Result<(), ClientError> {
        let entered = self.attempt().code.value();
        match entered {
            Some(code) => self.submit_code(&code).await,
            None => {
                self.require_state(OtpState::CodeSent)?;
                Err(self.fail(ClientError::validation(format!(
                    "Please enter a valid {}-digit OTP",
                    CODE_LENGTH
                ))))
            }
        }
    }

    /// Request a fresh code. While the countdown is running this is a no-op that reports the
    /// remaining wait.
    pub async fn request_resend(&self) -> Result<ResendOutcome, ClientError> {
        self.require_state(OtpState::CodeSent)?;
        let remaining = self.remaining_secs();
        if remaining > 0 {
            return Ok(ResendOutcome::NotYet {
                remaining_secs: remaining,
            });
        }
        let _flight = self.begin_flight()?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        let phone = {
            let mut attempt = self.attempt();
            attempt.notice = None;
            attempt.phone_number.clone().unwrap_or_default()
        };

        let result = self.service.send_code(&phone).await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("Discarding resend result for an abandoned attempt");
            return Ok(ResendOutcome::Sent);
        }
        match result {
            Ok(_) => {
                tracing::info!(phone = %mask_phone(&phone), "Verification code resent");
                let mut attempt = self.attempt();
                attempt.code.clear();
                attempt.countdown.restart(self.countdown_secs, self.auto_tick);
                attempt.notice = Some(Notice::info(RESEND_SUCCESS_MESSAGE));
                Ok(ResendOutcome::Sent)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Resending verification code failed");
                Err(self.fail(err))
            }
        }
    }

    /// Resend from the phone step: send a fresh code to `phone` without leaving
    /// `AwaitingPhone` or starting the countdown.
    pub async fn resend_to(&self, phone: &str) -> Result<(), ClientError> {
        self.require_state(OtpState::AwaitingPhone)?;
        let phone = validate_phone_number(phone).map_err(|e| self.fail(e))?;
        let _flight = self.begin_flight()?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.attempt().notice = None;

        let result = self.service.send_code(&phone).await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("Discarding resend result for an abandoned attempt");
            return Ok(());
        }
        match result {
            Ok(_) => {
                tracing::info!(phone = %mask_phone(&phone), "Verification code resent");
                self.attempt().notice = Some(Notice::info(RESEND_SUCCESS_MESSAGE));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Resending verification code failed");
                Err(self.fail(err))
            }
        }
    }

    /// One second of countdown. Only counts while a code is outstanding.
    pub fn tick(&self) -> u64 {
        let attempt = self.attempt();
        if attempt.state == OtpState::CodeSent {
            attempt.countdown.tick()
        } else {
            attempt.countdown.remaining()
        }
    }

    /// Abandon the current attempt (e.g. to use a different number).
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        // Replacing the attempt drops its countdown, which aborts the ticker.
        *self.attempt() = Attempt::default();
    }
}
