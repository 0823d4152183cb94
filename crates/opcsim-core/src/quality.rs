// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! 16-bit OPC quality codec.
//!
//! A quality code packs three parts:
//!
//! ```text
//!  15            8 7         2 1   0
//! +---------------+-----------+-----+
//! |  vendor bits  |  quality  |limit|
//! +---------------+-----------+-----+
//! ```
//!
//! Only the enumerated quality and limit patterns are representable;
//! [`Quality::decode`] rejects any other bit pattern.
//!
//! # Examples
//!
//! ```
//! use opcsim_core::quality::{LimitBits, Quality, QualityBits};
//!
//! let quality = Quality::new(QualityBits::Good, LimitBits::High, 0x12);
//! assert_eq!(quality.encode(), 0x12C2);
//! assert_eq!(Quality::decode(0x12C2).unwrap(), quality);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OpcError, OpcResult};

/// Mask selecting the quality class bits.
pub const QUALITY_MASK: u16 = 0x00FC;

/// Mask selecting the limit bits.
pub const LIMIT_MASK: u16 = 0x0003;

/// Shift applied to the vendor byte.
pub const VENDOR_SHIFT: u16 = 8;

// =============================================================================
// QualityBits
// =============================================================================

/// Quality class and sub-status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum QualityBits {
    /// Value is good.
    Good = 0xC0,
    /// Value has been overridden locally.
    GoodLocalOverride = 0xD8,
    /// Value is bad, no reason given.
    Bad = 0x00,
    /// Server specific configuration problem.
    BadConfigurationError = 0x04,
    /// Input is not logically connected.
    BadNotConnected = 0x08,
    /// Device failure detected.
    BadDeviceFailure = 0x0C,
    /// Sensor failure detected.
    BadSensorFailure = 0x10,
    /// Communication failed, last known value available.
    BadLastKnownValue = 0x14,
    /// Communication failed, no last known value.
    BadCommFailure = 0x18,
    /// Block is off scan or locked.
    BadOutOfService = 0x1C,
    /// No value has been delivered yet.
    BadWaitingForInitialData = 0x20,
    /// Value is uncertain, no reason given.
    Uncertain = 0x40,
    /// Value is stale.
    UncertainLastUsableValue = 0x44,
    /// Sensor is out of calibration or at a limit.
    UncertainSensorNotAccurate = 0x50,
    /// Value is outside the engineering unit range.
    UncertainEUExceeded = 0x54,
    /// Value derived from fewer sources than required.
    UncertainSubNormal = 0x58,
}

impl QualityBits {
    /// All representable quality patterns.
    pub const ALL: [QualityBits; 16] = [
        QualityBits::Good,
        QualityBits::GoodLocalOverride,
        QualityBits::Bad,
        QualityBits::BadConfigurationError,
        QualityBits::BadNotConnected,
        QualityBits::BadDeviceFailure,
        QualityBits::BadSensorFailure,
        QualityBits::BadLastKnownValue,
        QualityBits::BadCommFailure,
        QualityBits::BadOutOfService,
        QualityBits::BadWaitingForInitialData,
        QualityBits::Uncertain,
        QualityBits::UncertainLastUsableValue,
        QualityBits::UncertainSensorNotAccurate,
        QualityBits::UncertainEUExceeded,
        QualityBits::UncertainSubNormal,
    ];

    /// Returns the raw bit pattern.
    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Looks up a quality pattern from raw bits.
    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|q| q.bits() == bits)
    }

    /// Returns `true` for the good class.
    #[inline]
    pub fn is_good(self) -> bool {
        self.bits() & 0xC0 == 0xC0
    }

    /// Returns `true` for the uncertain class.
    #[inline]
    pub fn is_uncertain(self) -> bool {
        self.bits() & 0xC0 == 0x40
    }

    /// Returns `true` for the bad class.
    #[inline]
    pub fn is_bad(self) -> bool {
        self.bits() & 0xC0 == 0x00
    }

    /// Returns the name of the pattern.
    pub fn as_str(self) -> &'static str {
        match self {
            QualityBits::Good => "good",
            QualityBits::GoodLocalOverride => "good_local_override",
            QualityBits::Bad => "bad",
            QualityBits::BadConfigurationError => "bad_configuration_error",
            QualityBits::BadNotConnected => "bad_not_connected",
            QualityBits::BadDeviceFailure => "bad_device_failure",
            QualityBits::BadSensorFailure => "bad_sensor_failure",
            QualityBits::BadLastKnownValue => "bad_last_known_value",
            QualityBits::BadCommFailure => "bad_comm_failure",
            QualityBits::BadOutOfService => "bad_out_of_service",
            QualityBits::BadWaitingForInitialData => "bad_waiting_for_initial_data",
            QualityBits::Uncertain => "uncertain",
            QualityBits::UncertainLastUsableValue => "uncertain_last_usable_value",
            QualityBits::UncertainSensorNotAccurate => "uncertain_sensor_not_accurate",
            QualityBits::UncertainEUExceeded => "uncertain_eu_exceeded",
            QualityBits::UncertainSubNormal => "uncertain_sub_normal",
        }
    }
}

// =============================================================================
// LimitBits
// =============================================================================

/// Limit status of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum LimitBits {
    /// Value is free to move.
    #[default]
    None = 0,
    /// Value is pinned at a low limit.
    Low = 1,
    /// Value is pinned at a high limit.
    High = 2,
    /// Value is constant and cannot move.
    Constant = 3,
}

impl LimitBits {
    /// All limit patterns.
    pub const ALL: [LimitBits; 4] = [
        LimitBits::None,
        LimitBits::Low,
        LimitBits::High,
        LimitBits::Constant,
    ];

    /// Returns the raw bit pattern.
    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Converts the two low bits into a limit pattern.
    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        match bits & LIMIT_MASK as u8 {
            1 => LimitBits::Low,
            2 => LimitBits::High,
            3 => LimitBits::Constant,
            _ => LimitBits::None,
        }
    }
}

// =============================================================================
// Quality
// =============================================================================

/// A decoded quality code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quality {
    /// Quality class and sub-status.
    pub quality: QualityBits,
    /// Limit status.
    pub limit: LimitBits,
    /// Vendor specific byte.
    pub vendor: u8,
}

impl Quality {
    /// Good quality, not limited.
    pub const GOOD: Quality = Quality::new(QualityBits::Good, LimitBits::None, 0);

    /// Bad quality, not limited.
    pub const BAD: Quality = Quality::new(QualityBits::Bad, LimitBits::None, 0);

    /// Uncertain quality, not limited.
    pub const UNCERTAIN: Quality = Quality::new(QualityBits::Uncertain, LimitBits::None, 0);

    /// Bad quality reported before the first update.
    pub const WAITING_FOR_INITIAL_DATA: Quality =
        Quality::new(QualityBits::BadWaitingForInitialData, LimitBits::None, 0);

    /// Creates a quality from its three parts.
    #[inline]
    pub const fn new(quality: QualityBits, limit: LimitBits, vendor: u8) -> Self {
        Self {
            quality,
            limit,
            vendor,
        }
    }

    /// Returns a copy with the given limit bits.
    #[inline]
    pub fn with_limit(mut self, limit: LimitBits) -> Self {
        self.limit = limit;
        self
    }

    /// Returns a copy with the given vendor byte.
    #[inline]
    pub fn with_vendor(mut self, vendor: u8) -> Self {
        self.vendor = vendor;
        self
    }

    /// Packs the quality into its 16-bit wire form.
    #[inline]
    pub fn encode(&self) -> u16 {
        ((self.vendor as u16) << VENDOR_SHIFT)
            | self.quality.bits() as u16
            | self.limit.bits() as u16
    }

    /// Unpacks a 16-bit quality code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the quality bits are not one of the
    /// enumerated patterns.
    pub fn decode(code: u16) -> OpcResult<Self> {
        let quality_bits = (code & QUALITY_MASK) as u8;
        let quality = QualityBits::from_bits(quality_bits).ok_or_else(|| {
            OpcError::invalid_argument(
                "quality",
                format!("undefined quality bits 0x{:02X} in code 0x{:04X}", quality_bits, code),
            )
        })?;

        Ok(Self {
            quality,
            limit: LimitBits::from_bits((code & LIMIT_MASK) as u8),
            vendor: (code >> VENDOR_SHIFT) as u8,
        })
    }

    /// Returns `true` for the good class.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.quality.is_good()
    }

    /// Returns `true` for the uncertain class.
    #[inline]
    pub fn is_uncertain(&self) -> bool {
        self.quality.is_uncertain()
    }

    /// Returns `true` for the bad class.
    #[inline]
    pub fn is_bad(&self) -> bool {
        self.quality.is_bad()
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::WAITING_FOR_INITIAL_DATA
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X} ({})", self.encode(), self.quality.as_str())
    }
}

impl TryFrom<u16> for Quality {
    type Error = OpcError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Quality::decode(code)
    }
}

impl From<Quality> for u16 {
    fn from(quality: Quality) -> Self {
        quality.encode()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_valid_triples() {
        for quality in QualityBits::ALL {
            for limit in LimitBits::ALL {
                for vendor in [0u8, 1, 0x7F, 0x80, 0xFF] {
                    let q = Quality::new(quality, limit, vendor);
                    assert_eq!(Quality::decode(q.encode()).unwrap(), q);
                }
            }
        }
    }

    #[test]
    fn test_encode_layout() {
        assert_eq!(Quality::GOOD.encode(), 0x00C0);
        assert_eq!(
            Quality::new(QualityBits::Uncertain, LimitBits::Constant, 0xAB).encode(),
            0xAB43
        );
        assert_eq!(Quality::BAD.with_limit(LimitBits::Low).encode(), 0x0001);
    }

    #[test]
    fn test_decode_rejects_undefined_bits() {
        // 0x24 is not an enumerated quality pattern
        assert!(Quality::decode(0x0024).is_err());
        assert!(Quality::decode(0x00FC).is_err());
    }

    #[test]
    fn test_quality_class() {
        assert!(Quality::GOOD.is_good());
        assert!(Quality::new(QualityBits::GoodLocalOverride, LimitBits::None, 0).is_good());
        assert!(Quality::UNCERTAIN.is_uncertain());
        assert!(Quality::new(QualityBits::UncertainSubNormal, LimitBits::None, 0).is_uncertain());
        assert!(Quality::BAD.is_bad());
        assert!(Quality::WAITING_FOR_INITIAL_DATA.is_bad());
    }

    #[test]
    fn test_display() {
        assert_eq!(Quality::GOOD.to_string(), "0x00C0 (good)");
    }
}
