//! Free-disk-space checks (`spec.md` §4.7), using `fs2` the way the teacher
//! uses it for `FileExt` locking elsewhere in this pack — here for its
//! `available_space` query instead.

use std::path::Path;

use anyhow::{Context, Result};

use crate::error::GateFailure;

/// Verify free space on `path`'s filesystem meets `min_bytes`. `spec.md`
/// §4.7 calls for checking both the media path and the docker data root,
/// "skipping duplicate checks when both live on the same filesystem" — the
/// caller is responsible for deduplicating by canonicalized mount, this
/// function only performs a single check.
pub fn check_free_space(path: &Path, min_bytes: u64, label: &str) -> Result<Option<GateFailure>> {
    let probe_dir = if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| Path::new(".").to_path_buf())
    };
    let available = fs2::available_space(&probe_dir)
        .with_context(|| format!("failed to query free space on {}", probe_dir.display()))?;
    if available < min_bytes {
        Ok(Some(GateFailure {
            check: format!("disk:{label}"),
            reason: format!(
                "{} bytes available, {} required",
                available, min_bytes
            ),
        }))
    } else {
        Ok(None)
    }
}

/// Two paths are the "same filesystem" for deduplication purposes if
/// `statvfs`-equivalent device identity matches. Cheaply approximated here
/// via canonicalized-ancestor comparison rather than a raw syscall, since
/// std has no portable device-id query without pulling in `libc` — good
/// enough for the common case of the media path and docker data root
/// living on the same drive.
pub fn same_filesystem(a: &Path, b: &Path) -> bool {
    let (a, b) = (a.canonicalize(), b.canonicalize());
    match (a, b) {
        (Ok(a), Ok(b)) => a == b || a.starts_with(&b) || b.starts_with(&a),
        _ => false,
    }
}
