use anyhow::Result;
use libc::pid_t;
use log::trace;
use procfs::net::{tcp, tcp6};
use procfs::process::{all_processes, FDTarget};
use super::{Family, Socket, Table};

#[derive(Clone, Copy, Debug, Default)]
pub struct Sockets;

impl Table for Sockets {
    fn sockets(&self, family: Family) -> Result<Vec<Socket>> {
        let entries = match family {
            Family::V4 => tcp()?,
            Family::V6 => tcp6()?,
        };

        Ok(entries.into_iter().map(|e| Socket {
            local:  e.local_address,
            remote: e.remote_address,
            inode:  e.inode,
        }).collect())
    }

    // Processes may exit mid-scan; unreadable ones are skipped.
    fn owner(&self, inode: u64) -> Result<Option<pid_t>> {
        if inode == 0 {
            return Ok(None);
        }

        for proc in all_processes()?.flatten() {
            let fds = match proc.fd() {
                Ok(fds) => fds,
                Err(_)  => continue,
            };

            for fd in fds.flatten() {
                if let FDTarget::Socket(n) = fd.target {
                    if n == inode {
                        trace!("socket {} owned by pid {}", inode, proc.pid);
                        return Ok(Some(proc.pid));
                    }
                }
            }
        }

        Ok(None)
    }
}
