//! Shell-sourceable attribute file output.

use std::fs::{DirBuilder, File};
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use tracing::{debug, info};

use crate::metadata::Metadata;

/// Prefix prepended to every attribute name in the output file.
pub const ATTRIBUTE_PREFIX: &str = "COREOS_";

/// Write `metadata`'s attributes to `path` as `COREOS_<KEY>=<value>` lines.
///
/// Does nothing when `path` is `None`. Parent directories are created as
/// needed. The file is truncated and rewritten in place on every call; a
/// failure mid-write can leave a partial file behind. Attributes with empty
/// values are omitted and the rest are written in key order.
pub fn write_attributes(path: Option<&Path>, metadata: &Metadata) -> io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        DirBuilder::new().recursive(true).mode(0o755).create(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for (key, value) in metadata.attributes() {
        if value.is_empty() {
            debug!(%key, "skipping empty attribute");
            continue;
        }
        writeln!(out, "{}{}={}", ATTRIBUTE_PREFIX, key, value)?;
        written += 1;
    }
    out.flush()?;

    info!(path = %path.display(), attributes = written, "wrote metadata attributes");
    Ok(())
}
