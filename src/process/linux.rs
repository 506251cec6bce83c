use std::path::Path;
use anyhow::Result;
use libc::pid_t;
use log::trace;
use procfs::process::Process;
use crate::os::username;
use super::{Info, Lookup};

// Length of a truncated /proc/<pid>/comm (TASK_COMM_LEN - 1).
const COMM_LEN: usize = 15;

#[derive(Clone, Copy, Debug, Default)]
pub struct Procs;

impl Lookup for Procs {
    fn lookup(&self, pid: pid_t) -> Result<Info> {
        let proc    = Process::new(pid)?;
        let stat    = proc.stat()?;
        let status  = proc.status()?;
        let cmdline = proc.cmdline()?;

        let name = name(stat.comm, &cmdline);
        let user = username(status.ruid).unwrap_or_else(|| status.ruid.to_string());

        trace!("pid {} is '{}' ({}), parent {}", pid, name, user, stat.ppid);

        Ok(Info {
            pid:     pid,
            ppid:    stat.ppid,
            name:    name,
            cmdline: cmdline.join(" "),
            user:    user,
        })
    }
}

// The kernel truncates comm, so recover the full name from argv[0] when
// it is an extension of the truncated one.
fn name(comm: String, cmdline: &[String]) -> String {
    if comm.len() < COMM_LEN {
        return comm;
    }

    let exe = cmdline.first().map(Path::new).and_then(Path::file_name);
    match exe.and_then(|s| s.to_str()) {
        Some(exe) if exe.starts_with(&comm) => exe.to_owned(),
        _                                   => comm,
    }
}
