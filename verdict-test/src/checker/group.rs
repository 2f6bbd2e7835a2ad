/// Kills a checker's whole process group when dropped.
///
/// The checker is spawned as the leader of a new group, so anything it forks (a JVM, a
/// solver) shares its group id and goes down with it.
#[cfg(unix)]
pub(crate) struct ProcessGroup {
    pgid: libc::pid_t,
}

#[cfg(unix)]
impl ProcessGroup {
    pub(crate) fn new(leader: Option<u32>) -> Option<Self> {
        let pgid = libc::pid_t::try_from(leader?).ok()?;
        // Never signal group 0 (our own) or 1.
        (pgid > 1).then_some(Self { pgid })
    }

    pub(crate) fn kill(&self) {
        let rc = unsafe { libc::kill(-self.pgid, libc::SIGKILL) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            // ESRCH: the group is already gone.
            if err.raw_os_error() != Some(libc::ESRCH) {
                tracing::warn!("failed to kill process group {}: {}", self.pgid, err);
            }
        }
    }
}

#[cfg(unix)]
impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(not(unix))]
pub(crate) struct ProcessGroup;

#[cfg(not(unix))]
impl ProcessGroup {
    pub(crate) fn new(_leader: Option<u32>) -> Option<Self> {
        None
    }

    pub(crate) fn kill(&self) {}
}
