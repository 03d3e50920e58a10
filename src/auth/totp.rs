// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time-based one-time passwords (RFC 6238) answering `Verification code:`
//! challenges from PAM modules such as google-authenticator.

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Length of one TOTP window in seconds.
pub const TIME_STEP_SECS: u64 = 30;

/// Number of decimal digits in a generated code.
pub const CODE_DIGITS: u32 = 6;

type HmacSha1 = Hmac<Sha1>;

/// Decode a base32 shared secret as printed by `google-authenticator`.
///
/// Whitespace, dashes and padding are ignored and the alphabet is
/// case-insensitive.
pub fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if normalized.is_empty() {
        return Err(Error::InvalidArgument("OTP secret is empty".to_string()));
    }

    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|e| Error::InvalidArgument(format!("OTP secret is not valid base32: {e}")))
}

/// HOTP value (RFC 4226) for a raw key and counter.
pub fn code_for_counter(key: &[u8], counter: u64) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| Error::InvalidArgument(format!("unusable OTP key: {e}")))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    let code = binary % 10u32.pow(CODE_DIGITS);
    Ok(format!("{code:0width$}", width = CODE_DIGITS as usize))
}

/// Code for the window containing `unix_time`.
pub fn generate_at(secret: &str, unix_time: u64) -> Result<String> {
    let key = decode_secret(secret)?;
    code_for_counter(&key, unix_time / TIME_STEP_SECS)
}

/// Code for the current window.
pub fn generate(secret: &str) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    generate_at(secret, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    // base32("12345678901234567890"), the RFC 6238 SHA-1 seed
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn test_rfc6238_vectors() {
        let vectors = [
            (59, "287082"),
            (1_111_111_109, "081804"),
            (1_111_111_111, "050471"),
            (1_234_567_890, "005924"),
            (2_000_000_000, "279037"),
            (20_000_000_000, "353130"),
        ];
        for (time, expected) in vectors {
            assert_eq!(generate_at(RFC_SECRET, time).unwrap(), expected, "t={time}");
        }
    }

    #[test]
    fn test_same_window_same_code() {
        let a = generate_at(RFC_SECRET, 1_234_567_890).unwrap();
        let b = generate_at(RFC_SECRET, 1_234_567_890 + 9).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
        assert!(a.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_secret_normalization() {
        let spaced = "gezd gnbv gy3t qojq gezd gnbv gy3t qojq";
        assert_eq!(
            generate_at(spaced, 59).unwrap(),
            generate_at(RFC_SECRET, 59).unwrap()
        );
    }

    #[test]
    fn test_invalid_secret() {
        assert!(decode_secret("").is_err());
        assert!(decode_secret("not base32!").is_err());
        assert!(generate("1111").is_err());
    }

    #[test]
    fn test_generate_now() {
        let code = generate(RFC_SECRET).unwrap();
        assert_eq!(code.len(), CODE_DIGITS as usize);
    }
}
