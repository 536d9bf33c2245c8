//! Vendor profiles for multi-vendor support.
//!
//! A closed set of variants, each carrying the command strings that differ
//! between vendors: the full-configuration show used for backups and the
//! save sequence run after configuration changes. The profile is resolved
//! once per session from the request's hint; an unrecognized or absent hint
//! falls back to Cisco IOS, the most common dialect in the field.

use serde::{Deserialize, Serialize};

/// A supported device vendor dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorProfile {
    /// Cisco IOS and IOS-like CLIs.
    CiscoIos,

    /// Fortinet FortiOS / FortiSwitch.
    Fortios,

    /// Huawei VRP.
    HuaweiVrp,
}

impl VendorProfile {
    /// Resolve a profile from a free-form hint (inventory field, hostname
    /// convention, request parameter). Unknown hints map to Cisco IOS.
    pub fn from_hint(hint: Option<&str>) -> Self {
        let Some(hint) = hint else {
            return Self::CiscoIos;
        };
        let hint = hint.to_lowercase();
        if hint.contains("forti") {
            Self::Fortios
        } else if hint.contains("huawei") || hint.contains("vrp") {
            Self::HuaweiVrp
        } else {
            Self::CiscoIos
        }
    }

    /// Canonical device-type label, as the structured session collaborator
    /// expects it.
    pub fn device_type(self) -> &'static str {
        match self {
            Self::CiscoIos => "cisco_ios",
            Self::Fortios => "fortios",
            Self::HuaweiVrp => "huawei",
        }
    }

    /// The command that dumps the full running configuration.
    pub fn backup_command(self) -> &'static str {
        match self {
            Self::CiscoIos => "show running-config",
            Self::Fortios => "show full-configuration",
            Self::HuaweiVrp => "display current-configuration",
        }
    }

    /// Commands that persist the running configuration, in order.
    ///
    /// Huawei's `save` asks for confirmation; the `Y` entry is the answer,
    /// absorbed by collaborators that negotiate the prompt themselves.
    pub fn save_sequence(self) -> &'static [&'static str] {
        match self {
            Self::CiscoIos => &["write memory"],
            Self::Fortios => &["execute config-save"],
            Self::HuaweiVrp => &["save", "Y"],
        }
    }
}
