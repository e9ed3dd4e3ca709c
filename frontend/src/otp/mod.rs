mod controller;
mod countdown;
mod utils;

pub use controller::{
    OtpController, OtpState, ResendOutcome, DEFAULT_COUNTDOWN_SECS, RESEND_SUCCESS_MESSAGE,
    VERIFIED_MESSAGE,
};
pub use countdown::Countdown;
pub use utils::{validate_code, validate_phone_number, CodeBuffer, CODE_LENGTH, MIN_PHONE_LENGTH};
