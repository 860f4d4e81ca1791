//! Secret hygiene helpers: overwriting secret buffers before they are
//! dropped, and hardening the process and the files it writes.

use zeroize::Zeroize;

/// Zero `buf` in place. Safe to call on a buffer that is about to be
/// dropped or reused for unrelated data.
pub fn wipe(buf: &mut [u8]) {
    buf.zeroize();
}

/// Best-effort: disable core dumps for this process so a crash cannot
/// leave secret material in a core file. No-op on non-Unix targets.
pub fn disable_core_dumps() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlim) };
        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
    #[cfg(not(unix))]
    {
        Ok(())
    }
}

/// Restrict a freshly written store or export file to owner-only
/// access (`0600` on Unix). No-op on non-Unix targets beyond clearing
/// the readonly bit.
pub fn set_secure_permissions(path: &std::path::Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
    }
    #[cfg(not(unix))]
    {
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_readonly(false);
        std::fs::set_permissions(path, perms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wipe_zeroes_buffer_contents() {
        let mut buf = [0xABu8; 64];
        wipe(&mut buf);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn set_secure_permissions_applies_owner_only_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.bin");
        std::fs::write(&path, b"shh").unwrap();
        set_secure_permissions(&path).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }
}
