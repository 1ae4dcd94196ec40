use rand::{rngs::OsRng, Rng};
use time::Duration;

/// Codes are entered through a 4-cell input on the verification page.
pub const OTP_LENGTH: u32 = 4;

/// Advertised in the verification email and enforced at verify time.
pub const OTP_TTL: Duration = Duration::minutes(10);

/// Draws a zero-padded numeric code from the OS entropy source.
pub fn generate() -> String {
    let code: u32 = OsRng.gen_range(0..10u32.pow(OTP_LENGTH));
    format!("{code:0width$}", width = OTP_LENGTH as usize)
}
