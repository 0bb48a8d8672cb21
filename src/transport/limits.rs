//! Process file-descriptor limit.
//!
//! Every unmatched point-to-point message keeps its connection open, so
//! the soft limit is raised to the hard limit when a session starts.

/// Raise the `RLIMIT_NOFILE` soft limit to the hard limit and return the
/// resulting soft limit.
#[cfg(unix)]
pub fn raise_fd_limit() -> std::io::Result<u64> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid, writable rlimit for the duration of the call.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    if limit.rlim_cur < limit.rlim_max {
        limit.rlim_cur = limit.rlim_max;
        // SAFETY: `limit` is a valid rlimit; the soft limit does not exceed the hard limit.
        if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &limit) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(limit.rlim_cur as u64)
}

#[cfg(not(unix))]
pub fn raise_fd_limit() -> std::io::Result<u64> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "file-descriptor limits are not adjustable on this platform",
    ))
}

/// `raise_fd_limit`, logging instead of failing.
pub(crate) fn try_raise_fd_limit() {
    match raise_fd_limit() {
        Ok(limit) => tracing::debug!(limit, "raised file-descriptor soft limit"),
        Err(e) => tracing::warn!("could not raise file-descriptor limit: {e}"),
    }
}
