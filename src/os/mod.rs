use std::ffi::CStr;
use std::io::Error;
use std::mem;
use std::ptr;
use anyhow::Result;
use libc::c_char;

pub fn hostname() -> Result<String> {
    let mut buf = [0u8; 256];
    unsafe {
        match libc::gethostname(buf.as_mut_ptr() as *mut c_char, buf.len()) {
            0 => (),
            _ => Err(Error::last_os_error())?,
        }
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

pub fn username(uid: u32) -> Option<String> {
    let mut pwd: libc::passwd = unsafe { mem::zeroed() };
    let mut buf = vec![0 as c_char; 4096];
    let mut res = ptr::null_mut();

    unsafe {
        let rc = libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut res);
        if rc != 0 || res.is_null() || pwd.pw_name.is_null() {
            return None;
        }
        Some(CStr::from_ptr(pwd.pw_name).to_string_lossy().into_owned())
    }
}
