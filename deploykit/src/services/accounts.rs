//! User and group resolution through the system name service

use std::ffi::{CStr, CString};
use std::mem::MaybeUninit;
use std::ptr;

use crate::errors::DeployError;
use crate::services::Accounts;

const INITIAL_BUFFER: usize = 1024;
const MAX_BUFFER: usize = 1 << 20;

/// Resolves names with `getpwnam_r` and friends, so every NSS source
/// configured on the host (files, LDAP, sssd) is consulted
///
/// Purely numeric names are taken as ids without a lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAccounts;

impl SystemAccounts {
    pub fn new() -> Self {
        Self
    }
}

/// Run one reentrant lookup, growing the scratch buffer on `ERANGE`
///
/// `extract` reads the entry while the buffer its strings point into is
/// still alive.
fn lookup<T, R>(
    mut call: impl FnMut(*mut T, *mut libc::c_char, libc::size_t, *mut *mut T) -> libc::c_int,
    extract: impl FnOnce(&T) -> R,
) -> Result<Option<R>, DeployError> {
    let mut buffer: Vec<libc::c_char> = vec![0; INITIAL_BUFFER];
    loop {
        let mut entry = MaybeUninit::<T>::uninit();
        let mut result: *mut T = ptr::null_mut();
        let code = call(entry.as_mut_ptr(), buffer.as_mut_ptr(), buffer.len(), &mut result as *mut _);

        match code {
            libc::ERANGE if buffer.len() < MAX_BUFFER => {
                let grown = buffer.len() * 2;
                buffer.resize(grown, 0);
            }
            // Not found is reported as 0 with a null result, or as one of these
            0 | libc::ENOENT | libc::ESRCH | libc::EBADF | libc::EPERM if result.is_null() => {
                return Ok(None);
            }
            0 => {
                // SAFETY: a zero return with a non-null result means the
                // entry was filled in, with strings pointing into `buffer`
                let entry = unsafe { entry.assume_init_ref() };
                return Ok(Some(extract(entry)));
            }
            code => return Err(std::io::Error::from_raw_os_error(code).into()),
        }
    }
}

fn c_name(name: &str, kind: &str) -> Result<CString, DeployError> {
    CString::new(name)
        .map_err(|_| DeployError::Accounts(format!("Invalid {} name {:?}", kind, name)))
}

impl Accounts for SystemAccounts {
    fn user_to_uid(&self, user: &str) -> Result<u32, DeployError> {
        if let Ok(uid) = user.parse() {
            return Ok(uid);
        }
        let name = c_name(user, "user")?;
        lookup(
            |pwd, buf, len, result| unsafe {
                libc::getpwnam_r(name.as_ptr(), pwd, buf, len, result)
            },
            |pwd: &libc::passwd| pwd.pw_uid,
        )?
        .ok_or_else(|| DeployError::Accounts(format!("Unknown user {:?}", user)))
    }

    fn group_to_gid(&self, group: &str) -> Result<u32, DeployError> {
        if let Ok(gid) = group.parse() {
            return Ok(gid);
        }
        let name = c_name(group, "group")?;
        lookup(
            |grp, buf, len, result| unsafe {
                libc::getgrnam_r(name.as_ptr(), grp, buf, len, result)
            },
            |grp: &libc::group| grp.gr_gid,
        )?
        .ok_or_else(|| DeployError::Accounts(format!("Unknown group {:?}", group)))
    }

    fn uid_to_user(&self, uid: u32) -> Result<String, DeployError> {
        lookup(
            |pwd, buf, len, result| unsafe { libc::getpwuid_r(uid, pwd, buf, len, result) },
            |pwd: &libc::passwd| {
                unsafe { CStr::from_ptr(pwd.pw_name) }
                    .to_string_lossy()
                    .into_owned()
            },
        )?
        .ok_or_else(|| DeployError::Accounts(format!("No user with id {}", uid)))
    }

    fn gid_to_group(&self, gid: u32) -> Result<String, DeployError> {
        lookup(
            |grp, buf, len, result| unsafe { libc::getgrgid_r(gid, grp, buf, len, result) },
            |grp: &libc::group| {
                unsafe { CStr::from_ptr(grp.gr_name) }
                    .to_string_lossy()
                    .into_owned()
            },
        )?
        .ok_or_else(|| DeployError::Accounts(format!("No group with id {}", gid)))
    }
}

/// Effective uid of this process
pub fn effective_uid() -> u32 {
    unsafe { libc::geteuid() }
}
