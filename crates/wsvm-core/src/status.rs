//! Result codes returned to the guest by every host capability.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of results a capability hands back to the guest as an `i32`.
///
/// The numeric values are part of the ABI and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    UnexportedHandler = 1,
    ResourceNotFound = 2,
    ImportNotFound = 3,
    ImportCallFailed = 4,
    TransDataToVMFailed = 5,
    TransDataFromVMFailed = 6,
    HostInternal = 7,
    EnvKeyNotFound = 8,
    NoDBContext = 9,
    /// Generic failure, reserved for calls without a more specific code.
    Failed = -1,
}

impl StatusCode {
    pub const ALL: [StatusCode; 11] = [
        StatusCode::Ok,
        StatusCode::UnexportedHandler,
        StatusCode::ResourceNotFound,
        StatusCode::ImportNotFound,
        StatusCode::ImportCallFailed,
        StatusCode::TransDataToVMFailed,
        StatusCode::TransDataFromVMFailed,
        StatusCode::HostInternal,
        StatusCode::EnvKeyNotFound,
        StatusCode::NoDBContext,
        StatusCode::Failed,
    ];

    /// Wire value written into the guest's result slot.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|code| code.as_i32() == value)
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Ok => "OK",
            StatusCode::UnexportedHandler => "UnexportedHandler",
            StatusCode::ResourceNotFound => "ResourceNotFound",
            StatusCode::ImportNotFound => "ImportNotFound",
            StatusCode::ImportCallFailed => "ImportCallFailed",
            StatusCode::TransDataToVMFailed => "TransDataToVMFailed",
            StatusCode::TransDataFromVMFailed => "TransDataFromVMFailed",
            StatusCode::HostInternal => "HostInternal",
            StatusCode::EnvKeyNotFound => "EnvKeyNotFound",
            StatusCode::NoDBContext => "NoDBContext",
            StatusCode::Failed => "Failed",
        };
        write!(f, "{} ({})", name, self.as_i32())
    }
}

impl From<StatusCode> for i32 {
    fn from(code: StatusCode) -> Self {
        code.as_i32()
    }
}
