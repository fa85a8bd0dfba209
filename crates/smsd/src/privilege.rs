// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dropping root privileges once the serial device is open.

use smsd_core::SmsdError;
use tracing::info;

/// Target identity for [`drop_privileges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

/// Switch to `user` if the process runs as root.
///
/// Returns `Ok(true)` when the switch happened, `Ok(false)` when nothing was
/// configured or the process was not root to begin with.
#[cfg(unix)]
pub fn drop_privileges(user: Option<&str>) -> Result<bool, SmsdError> {
    let Some(user) = user else {
        return Ok(false);
    };

    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } != 0 {
        info!(user, "not running as root, keeping current user");
        return Ok(false);
    }

    let identity = resolve_user(user)?;
    switch_to(identity)?;
    info!(user, uid = identity.uid, gid = identity.gid, "dropped privileges");
    Ok(true)
}

#[cfg(not(unix))]
pub fn drop_privileges(user: Option<&str>) -> Result<bool, SmsdError> {
    if user.is_some() {
        tracing::warn!("daemon.user is only supported on unix, ignoring");
    }
    Ok(false)
}

/// Look up a user by name or numeric uid.
///
/// A numeric uid with no passwd entry uses the same number as its gid.
#[cfg(unix)]
pub fn resolve_user(user: &str) -> Result<Identity, SmsdError> {
    if let Ok(uid) = user.parse::<u32>() {
        return Ok(lookup_uid(uid)?.unwrap_or(Identity { uid, gid: uid }));
    }
    lookup_name(user)?.ok_or_else(|| SmsdError::Config(format!("unknown user `{user}`")))
}

#[cfg(unix)]
fn lookup_name(name: &str) -> Result<Option<Identity>, SmsdError> {
    let c_name = std::ffi::CString::new(name)
        .map_err(|_| SmsdError::Config(format!("invalid user name `{name}`")))?;
    passwd_lookup(|pwd, buf, len, result| {
        // SAFETY: all pointers come from live locals in passwd_lookup and
        // `len` is the size of `buf`.
        unsafe { libc::getpwnam_r(c_name.as_ptr(), pwd, buf, len, result) }
    })
}

#[cfg(unix)]
fn lookup_uid(uid: u32) -> Result<Option<Identity>, SmsdError> {
    passwd_lookup(|pwd, buf, len, result| {
        // SAFETY: as in lookup_name.
        unsafe { libc::getpwuid_r(uid as libc::uid_t, pwd, buf, len, result) }
    })
}

/// Run a reentrant passwd lookup, growing the scratch buffer on `ERANGE`.
#[cfg(unix)]
fn passwd_lookup<F>(mut lookup: F) -> Result<Option<Identity>, SmsdError>
where
    F: FnMut(
        *mut libc::passwd,
        *mut libc::c_char,
        libc::size_t,
        *mut *mut libc::passwd,
    ) -> libc::c_int,
{
    let mut buf_len = 1024;
    loop {
        let mut buf = vec![0 as libc::c_char; buf_len];
        // SAFETY: passwd is plain old data; an all-zero value is valid.
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        let rc = lookup(
            &mut pwd as *mut libc::passwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result as *mut *mut libc::passwd,
        );
        match rc {
            0 if result.is_null() => return Ok(None),
            0 => {
                return Ok(Some(Identity {
                    uid: pwd.pw_uid as u32,
                    gid: pwd.pw_gid as u32,
                }));
            }
            libc::ERANGE if buf_len < 1 << 20 => buf_len *= 4,
            code => {
                return Err(SmsdError::transport(
                    "user lookup failed",
                    std::io::Error::from_raw_os_error(code),
                ));
            }
        }
    }
}

/// Supplementary groups first, then gid, then uid; uid last so the earlier
/// calls still have permission.
#[cfg(unix)]
fn switch_to(identity: Identity) -> Result<(), SmsdError> {
    let gid = identity.gid as libc::gid_t;
    let check = |rc: libc::c_int, call: &str| {
        if rc == 0 {
            Ok(())
        } else {
            Err(SmsdError::transport(
                format!("{call} failed"),
                std::io::Error::last_os_error(),
            ))
        }
    };

    // SAFETY: plain syscalls with a single valid gid/uid; `&gid` outlives the call.
    unsafe {
        check(libc::setgroups(1, &gid), "setgroups")?;
        check(libc::setgid(gid), "setgid")?;
        check(libc::setuid(identity.uid as libc::uid_t), "setuid")?;
    }
    Ok(())
}
