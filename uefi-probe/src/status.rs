// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt::{self, Display, Formatter};
use uefi::Status;

/// Human-readable rendering of a [`Status`].
///
/// Uses the wording of the firmware's own status printer, e.g. `Unsupported`
/// or `Not Found`. Codes without a name are printed as hexadecimal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StatusText(pub Status);

impl StatusText {
    /// The name of the status code, if it has one.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        let s = match self.0 {
            Status::SUCCESS => "Success",

            Status::WARN_UNKNOWN_GLYPH => "Warning Unknown Glyph",
            Status::WARN_DELETE_FAILURE => "Warning Delete Failure",
            Status::WARN_WRITE_FAILURE => "Warning Write Failure",
            Status::WARN_BUFFER_TOO_SMALL => "Warning Buffer Too Small",
            Status::WARN_STALE_DATA => "Warning Stale Data",
            Status::WARN_FILE_SYSTEM => "Warning File System",
            Status::WARN_RESET_REQUIRED => "Warning Reset Required",

            Status::LOAD_ERROR => "Load Error",
            Status::INVALID_PARAMETER => "Invalid Parameter",
            Status::UNSUPPORTED => "Unsupported",
            Status::BAD_BUFFER_SIZE => "Bad Buffer Size",
            Status::BUFFER_TOO_SMALL => "Buffer Too Small",
            Status::NOT_READY => "Not Ready",
            Status::DEVICE_ERROR => "Device Error",
            Status::WRITE_PROTECTED => "Write Protected",
            Status::OUT_OF_RESOURCES => "Out of Resources",
            Status::VOLUME_CORRUPTED => "Volume Corrupt",
            Status::VOLUME_FULL => "Volume Full",
            Status::NO_MEDIA => "No Media",
            Status::MEDIA_CHANGED => "Media changed",
            Status::NOT_FOUND => "Not Found",
            Status::ACCESS_DENIED => "Access Denied",
            Status::NO_RESPONSE => "No Response",
            Status::NO_MAPPING => "No mapping",
            Status::TIMEOUT => "Time out",
            Status::NOT_STARTED => "Not started",
            Status::ALREADY_STARTED => "Already started",
            Status::ABORTED => "Aborted",
            Status::ICMP_ERROR => "ICMP Error",
            Status::TFTP_ERROR => "TFTP Error",
            Status::PROTOCOL_ERROR => "Protocol Error",
            Status::INCOMPATIBLE_VERSION => "Incompatible Version",
            Status::SECURITY_VIOLATION => "Security Violation",
            Status::CRC_ERROR => "CRC Error",
            Status::END_OF_MEDIA => "End of Media",
            Status::END_OF_FILE => "End of File",
            Status::INVALID_LANGUAGE => "Invalid Language",
            Status::COMPROMISED_DATA => "Compromised Data",
            Status::IP_ADDRESS_CONFLICT => "IP Address Conflict",
            Status::HTTP_ERROR => "HTTP Error",

            _ => return None,
        };
        Some(s)
    }
}

impl Display for StatusText {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:X}", self.0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_statuses() {
        assert_eq!(StatusText(Status::SUCCESS).to_string(), "Success");
        assert_eq!(StatusText(Status::UNSUPPORTED).to_string(), "Unsupported");
        assert_eq!(StatusText(Status::NOT_FOUND).to_string(), "Not Found");
        assert_eq!(
            StatusText(Status::WARN_BUFFER_TOO_SMALL).to_string(),
            "Warning Buffer Too Small"
        );
    }

    #[test]
    fn test_unknown_status_is_hex() {
        let status = Status(Status::ERROR_BIT | 0x1d);
        assert_eq!(StatusText(status).name(), None);
        assert_eq!(
            StatusText(status).to_string(),
            format!("{:X}", Status::ERROR_BIT | 0x1d)
        );

        assert_eq!(StatusText(Status(0x42)).to_string(), "42");
    }

    #[test]
    fn test_error_statuses_are_named() {
        // Every error code from LOAD_ERROR to HTTP_ERROR except the two
        // reserved slots.
        for code in (1..=35).filter(|code| !matches!(code, 29 | 30)) {
            let status = Status(Status::ERROR_BIT | code);
            let text = StatusText(status).name();
            assert!(text.is_some_and(|text| !text.is_empty()), "{status:?}");
        }
    }
}
