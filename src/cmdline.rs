//! Provider lookup on the kernel command line.

use std::fs;
use std::path::Path;

use crate::error::Error;

/// Default location of the kernel command line.
pub const CMDLINE_PATH: &str = "/proc/cmdline";

/// Kernel parameter naming the OEM platform.
pub const CMDLINE_OEM_FLAG: &str = "coreos.oem.id";

/// Extract the value of `coreos.oem.id` from a kernel command line.
///
/// The last occurrence wins. A bare `coreos.oem.id` without `=` records an
/// empty value. Returns an empty string when the flag is absent; tokens that
/// don't match are ignored.
pub fn parse_cmdline(cmdline: &str) -> String {
    let mut oem = String::new();

    for arg in cmdline.split(' ') {
        let (key, value) = match arg.trim().split_once('=') {
            Some((key, value)) => (key, value),
            None => (arg.trim(), ""),
        };

        if key == CMDLINE_OEM_FLAG {
            oem = value.to_string();
        }
    }

    oem
}

/// Read the kernel command line at `path` and extract the OEM id.
pub fn read_cmdline(path: &Path) -> Result<String, Error> {
    let bytes = fs::read(path).map_err(|source| Error::Cmdline {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(parse_cmdline(&String::from_utf8_lossy(&bytes)))
}
