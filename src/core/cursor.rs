use std::cmp::Ordering;
use std::fmt;

use crate::error::MatchError;
use crate::models::UserId;

/// Position in the (distance, identity) candidate order
///
/// Encoded as `<distance bits as 16 hex digits>.<user id>` so the distance
/// survives the round trip bit for bit.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub distance_m: f64,
    pub user_id: UserId,
}

impl Cursor {
    pub fn new(distance_m: f64, user_id: impl Into<UserId>) -> Self {
        Self {
            distance_m,
            user_id: user_id.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{:016x}.{}", self.distance_m.to_bits(), self.user_id)
    }

    pub fn decode(raw: &str) -> Result<Self, MatchError> {
        let (bits, user_id) = raw
            .split_once('.')
            .ok_or_else(|| MatchError::InvalidCursor(raw.to_string()))?;

        if bits.len() != 16 || user_id.is_empty() {
            return Err(MatchError::InvalidCursor(raw.to_string()));
        }

        let bits = u64::from_str_radix(bits, 16)
            .map_err(|_| MatchError::InvalidCursor(raw.to_string()))?;
        let distance_m = f64::from_bits(bits);
        if !distance_m.is_finite() || distance_m < 0.0 {
            return Err(MatchError::InvalidCursor(raw.to_string()));
        }

        Ok(Self::new(distance_m, user_id))
    }

    /// True when `(distance_m, user_id)` sorts strictly after this cursor
    #[inline]
    pub fn precedes(&self, distance_m: f64, user_id: &str) -> bool {
        compare_positions(self.distance_m, &self.user_id, distance_m, user_id) == Ordering::Less
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Total order used for candidate pages: ascending distance, then identity
#[inline]
pub fn compare_positions(a_distance: f64, a_id: &str, b_distance: f64, b_id: &str) -> Ordering {
    a_distance
        .total_cmp(&b_distance)
        .then_with(|| a_id.cmp(b_id))
}
