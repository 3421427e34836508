//! 256-bit unsigned integer
//!
//! Wei amounts, gas prices and ABI words all need more than 128 bits of
//! headroom. Limbs are little-endian `u64`s; every arithmetic operation is
//! checked.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{EngineError, EngineResult};

/// 256-bit unsigned integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256(pub [u64; 4]);

impl U256 {
    pub const ZERO: U256 = U256([0, 0, 0, 0]);
    pub const ONE: U256 = U256([1, 0, 0, 0]);
    pub const MAX: U256 = U256([u64::MAX, u64::MAX, u64::MAX, u64::MAX]);

    pub const fn from_u64(value: u64) -> Self {
        U256([value, 0, 0, 0])
    }

    pub const fn from_u128(value: u128) -> Self {
        U256([value as u64, (value >> 64) as u64, 0, 0])
    }

    /// Parse big-endian bytes; leading zeros beyond 32 bytes are allowed
    pub fn from_be_bytes(bytes: &[u8]) -> EngineResult<Self> {
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        let significant = &bytes[first..];
        if significant.len() > 32 {
            return Err(EngineError::decode(format!(
                "{} significant bytes exceed 256 bits",
                significant.len()
            )));
        }

        let mut padded = [0u8; 32];
        padded[32 - significant.len()..].copy_from_slice(significant);
        Ok(Self::from_word(&padded))
    }

    /// Interpret a 32-byte big-endian word
    pub fn from_word(word: &[u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let offset = (3 - i) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&word[offset..offset + 8]);
            *limb = u64::from_be_bytes(chunk);
        }
        U256(limbs)
    }

    /// Big-endian, always 32 bytes
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for i in 0..4 {
            let offset = (3 - i) * 8;
            bytes[offset..offset + 8].copy_from_slice(&self.0[i].to_be_bytes());
        }
        bytes
    }

    /// Big-endian without leading zeros; zero is the empty slice
    pub fn to_be_bytes_trimmed(&self) -> Vec<u8> {
        let bytes = self.to_be_bytes();
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(32);
        bytes[first..].to_vec()
    }

    /// Parse hex digits with an optional `0x` prefix; odd length is allowed
    pub fn from_hex(s: &str) -> EngineResult<Self> {
        let digits = crate::encoding::hex::strip_prefix(s.trim());
        if digits.is_empty() {
            return Err(EngineError::decode("empty hex number"));
        }
        let normalized = if digits.len() % 2 == 1 {
            format!("0{}", digits)
        } else {
            digits.to_string()
        };
        let bytes = ::hex::decode(normalized)?;
        Self::from_be_bytes(&bytes)
    }

    /// Parse a base-10 string
    pub fn from_dec(s: &str) -> EngineResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EngineError::decode("empty decimal number"));
        }
        let mut result = U256::ZERO;
        for c in s.chars() {
            let digit = c
                .to_digit(10)
                .ok_or_else(|| EngineError::decode(format!("invalid decimal digit: {}", c)))?;
            result = result
                .checked_mul_u64(10)
                .and_then(|r| r.checked_add(U256::from_u64(digit as u64)))
                .ok_or_else(|| EngineError::decode(format!("{} overflows 256 bits", s)))?;
        }
        Ok(result)
    }

    /// Hex when prefixed with `0x`, decimal otherwise
    pub fn parse(s: &str) -> EngineResult<Self> {
        let t = s.trim();
        if t.starts_with("0x") || t.starts_with("0X") {
            Self::from_hex(t)
        } else {
            Self::from_dec(t)
        }
    }

    /// `10^exp`, `None` past 10^77
    pub fn pow10(exp: u32) -> Option<U256> {
        let mut result = U256::ONE;
        for _ in 0..exp {
            result = result.checked_mul_u64(10)?;
        }
        Some(result)
    }

    pub fn checked_add(&self, other: U256) -> Option<U256> {
        let mut result = [0u64; 4];
        let mut carry = 0u64;

        for i in 0..4 {
            let (sum1, c1) = self.0[i].overflowing_add(other.0[i]);
            let (sum2, c2) = sum1.overflowing_add(carry);
            result[i] = sum2;
            carry = (c1 as u64) + (c2 as u64);
        }

        if carry != 0 {
            None
        } else {
            Some(U256(result))
        }
    }

    /// Two's complement negation modulo 2^256
    pub fn wrapping_neg(&self) -> U256 {
        let inverted = U256([!self.0[0], !self.0[1], !self.0[2], !self.0[3]]);
        // only !0 + 1 overflows, and -0 is 0
        inverted.checked_add(U256::ONE).unwrap_or(U256::ZERO)
    }

    /// `2^exp`, for `exp < 256`
    pub fn pow2(exp: u32) -> Option<U256> {
        if exp >= 256 {
            return None;
        }
        let mut limbs = [0u64; 4];
        limbs[(exp / 64) as usize] = 1 << (exp % 64);
        Some(U256(limbs))
    }

    pub fn checked_sub(&self, other: U256) -> Option<U256> {
        let mut result = [0u64; 4];
        let mut borrow = 0u64;

        for i in 0..4 {
            let (d1, b1) = self.0[i].overflowing_sub(other.0[i]);
            let (d2, b2) = d1.overflowing_sub(borrow);
            result[i] = d2;
            borrow = (b1 as u64) + (b2 as u64);
        }

        if borrow != 0 {
            None
        } else {
            Some(U256(result))
        }
    }

    pub fn checked_mul_u64(&self, other: u64) -> Option<U256> {
        let mut result = [0u64; 4];
        let mut carry = 0u128;

        for i in 0..4 {
            let prod = (self.0[i] as u128) * (other as u128) + carry;
            result[i] = prod as u64;
            carry = prod >> 64;
        }

        if carry != 0 {
            None
        } else {
            Some(U256(result))
        }
    }

    pub fn checked_mul(&self, other: U256) -> Option<U256> {
        let mut wide = [0u64; 8];
        for i in 0..4 {
            let mut carry = 0u128;
            for j in 0..4 {
                let t = (self.0[i] as u128) * (other.0[j] as u128) + wide[i + j] as u128 + carry;
                wide[i + j] = t as u64;
                carry = t >> 64;
            }
            wide[i + 4] = carry as u64;
        }

        if wide[4..].iter().any(|limb| *limb != 0) {
            None
        } else {
            Some(U256([wide[0], wide[1], wide[2], wide[3]]))
        }
    }

    /// Quotient and remainder by a small divisor, `None` when dividing by zero
    pub fn div_rem_u64(&self, divisor: u64) -> Option<(U256, u64)> {
        if divisor == 0 {
            return None;
        }
        let mut quotient = [0u64; 4];
        let mut rem = 0u128;
        for i in (0..4).rev() {
            let cur = (rem << 64) | self.0[i] as u128;
            quotient[i] = (cur / divisor as u128) as u64;
            rem = cur % divisor as u128;
        }
        Some((U256(quotient), rem as u64))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    pub fn to_u64(&self) -> Option<u64> {
        if self.0[1..].iter().all(|limb| *limb == 0) {
            Some(self.0[0])
        } else {
            None
        }
    }

    pub fn to_u128(&self) -> Option<u128> {
        if self.0[2..].iter().all(|limb| *limb == 0) {
            Some((self.0[1] as u128) << 64 | self.0[0] as u128)
        } else {
            None
        }
    }

    /// Full-width lowercase hex, 64 digits
    pub fn to_hex(&self) -> String {
        ::hex::encode(self.to_be_bytes())
    }

    pub fn to_dec_string(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let mut digits = Vec::new();
        let mut n = *self;
        while !n.is_zero() {
            // divisor is non-zero
            let (q, r) = match n.div_rem_u64(10) {
                Some(qr) => qr,
                None => break,
            };
            digits.push(b'0' + r as u8);
            n = q;
        }
        digits.reverse();
        String::from_utf8_lossy(&digits).into_owned()
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        U256::from_u64(value)
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        U256::from_u128(value)
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in (0..4).rev() {
            match self.0[i].cmp(&other.0[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dec_string())
    }
}

impl std::str::FromStr for U256 {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::parse(s)
    }
}

impl Serialize for U256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_dec_string())
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(u64),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Ok(U256::from_u64(n)),
            Repr::Str(s) => U256::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// `value × 10^decimals`, truncating any excess precision
pub fn to_minor_units(value: &Decimal, decimals: u32) -> EngineResult<U256> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(EngineError::invalid_request(format!(
            "negative amount: {}",
            value
        )));
    }

    let mantissa = value.mantissa().unsigned_abs();
    let scale = value.scale();
    let overflow = || EngineError::invalid_request(format!("{} overflows 256 bits", value));

    if decimals >= scale {
        let factor = U256::pow10(decimals - scale).ok_or_else(overflow)?;
        U256::from_u128(mantissa)
            .checked_mul(factor)
            .ok_or_else(overflow)
    } else {
        // scale is at most 28, so the divisor fits in u128
        let divisor = 10u128.pow(scale - decimals);
        Ok(U256::from_u128(mantissa / divisor))
    }
}

/// Minor units back to a decimal with `decimals` fractional digits
pub fn from_minor_units(units: U256, decimals: u32) -> EngineResult<Decimal> {
    let too_large = || {
        EngineError::invalid_request(format!(
            "{} minor units with {} decimals cannot be represented",
            units, decimals
        ))
    };
    let raw = units.to_u128().ok_or_else(too_large)?;
    let raw = i128::try_from(raw).map_err(|_| too_large())?;
    Decimal::try_from_i128_with_scale(raw, decimals)
        .map(|d| d.normalize())
        .map_err(|_| too_large())
}
