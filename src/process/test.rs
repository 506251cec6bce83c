use std::collections::HashMap;
use std::net::SocketAddr;
use anyhow::{anyhow, Result};
use libc::pid_t;
use crate::sockets::{Family, Socket, Table};
use super::{Error, Info, Lookup, Parent, Process, Resolver, UNKNOWN};

#[derive(Default)]
struct Sockets {
    v4:     Vec<Socket>,
    v6:     Vec<Socket>,
    owners: HashMap<u64, pid_t>,
}

#[derive(Default)]
struct Procs {
    procs: HashMap<pid_t, Info>,
}

impl Table for Sockets {
    fn sockets(&self, family: Family) -> Result<Vec<Socket>> {
        Ok(match family {
            Family::V4 => self.v4.clone(),
            Family::V6 => self.v6.clone(),
        })
    }

    fn owner(&self, inode: u64) -> Result<Option<pid_t>> {
        Ok(self.owners.get(&inode).copied())
    }
}

impl Lookup for Procs {
    fn lookup(&self, pid: pid_t) -> Result<Info> {
        self.procs.get(&pid).cloned().ok_or_else(|| anyhow!("no such process {}", pid))
    }
}

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

fn socket(local: &str, remote: &str, inode: u64) -> Socket {
    Socket {
        local:  addr(local),
        remote: addr(remote),
        inode:  inode,
    }
}

fn info(pid: pid_t, ppid: pid_t, name: &str, cmdline: &str, user: &str) -> Info {
    Info {
        pid:     pid,
        ppid:    ppid,
        name:    name.to_owned(),
        cmdline: cmdline.to_owned(),
        user:    user.to_owned(),
    }
}

fn procs() -> Procs {
    let mut procs = HashMap::new();
    procs.insert(4242, info(4242, 100, "curl", "curl https://example.com", "alice"));
    procs.insert(100,  info(100,  1,   "bash", "-bash",                    "alice"));
    procs.insert(1,    info(1,    0,   "init", "/sbin/init",               "root"));
    Procs { procs }
}

const SRC: &str = "10.0.0.2:50000";
const DST: &str = "93.184.216.34:443";

#[test]
fn resolve_owner_and_parent() -> Result<()> {
    let mut table = Sockets::default();
    table.v4.push(socket("10.0.0.2:50001", DST, 1));
    table.v4.push(socket(SRC, DST, 2));
    table.owners.insert(2, 4242);

    let proc = Resolver::new(table, procs()).resolve(addr(SRC), addr(DST))?;

    assert_eq!(4242,                       proc.pid);
    assert_eq!("curl",                     proc.name);
    assert_eq!("curl https://example.com", proc.cmdline);
    assert_eq!("alice",                    proc.user);
    assert_eq!(100,                        proc.parent.pid);
    assert_eq!("bash",                     proc.parent.name);
    assert_eq!("alice",                    proc.parent.user);

    Ok(())
}

#[test]
fn no_match_is_unknown() -> Result<()> {
    let mut table = Sockets::default();
    table.v4.push(socket(SRC, "93.184.216.34:80", 1));
    table.owners.insert(1, 4242);

    let proc = Resolver::new(table, procs()).resolve(addr(SRC), addr(DST))?;
    assert_eq!(Process::unknown(), proc);
    assert_eq!(Parent::unknown(), proc.parent);

    Ok(())
}

#[test]
fn vanished_owner_is_unknown() -> Result<()> {
    let mut table = Sockets::default();
    table.v4.push(socket(SRC, DST, 7));

    let proc = Resolver::new(table, procs()).resolve(addr(SRC), addr(DST))?;
    assert_eq!(Process::unknown(), proc);

    Ok(())
}

#[test]
fn ambiguous_match_fails() {
    let mut table = Sockets::default();
    table.v4.push(socket(SRC, DST, 1));
    table.v4.push(socket(SRC, DST, 2));
    table.owners.insert(1, 4242);
    table.owners.insert(2, 100);

    match Resolver::new(table, procs()).resolve(addr(SRC), addr(DST)) {
        Err(Error::Ambiguous(2)) => (),
        other                    => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn failed_lookup_surfaces() {
    let mut table = Sockets::default();
    table.v4.push(socket(SRC, DST, 1));
    table.owners.insert(1, 999);

    match Resolver::new(table, procs()).resolve(addr(SRC), addr(DST)) {
        Err(Error::Lookup(999, _)) => (),
        other                      => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn failed_parent_lookup_surfaces() {
    let mut procs = procs();
    procs.procs.insert(77, info(77, 78, "orphan", "orphan", "bob"));

    let mut table = Sockets::default();
    table.v4.push(socket(SRC, DST, 1));
    table.owners.insert(1, 77);

    match Resolver::new(table, procs).resolve(addr(SRC), addr(DST)) {
        Err(Error::Lookup(78, _)) => (),
        other                     => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn root_parent_is_unknown() -> Result<()> {
    let mut table = Sockets::default();
    table.v4.push(socket(SRC, DST, 1));
    table.owners.insert(1, 1);

    let proc = Resolver::new(table, procs()).resolve(addr(SRC), addr(DST))?;
    assert_eq!("init",            proc.name);
    assert_eq!(Parent::unknown(), proc.parent);

    Ok(())
}

#[test]
fn ipv6_table_for_ipv6_destination() -> Result<()> {
    let src = "[2001:db8::2]:50000";
    let dst = "[2606:2800:220:1:248:1893:25c8:1946]:443";

    let mut table = Sockets::default();
    table.v4.push(socket(SRC, DST, 1));
    table.v6.push(socket(src, dst, 2));
    table.owners.insert(2, 4242);

    let proc = Resolver::new(table, procs()).resolve(addr(src), addr(dst))?;
    assert_eq!("curl", proc.name);

    Ok(())
}

#[test]
fn dual_stack_socket_for_ipv4_destination() -> Result<()> {
    let mut table = Sockets::default();
    table.v6.push(socket("[::ffff:10.0.0.2]:50000", "[::ffff:93.184.216.34]:443", 3));
    table.owners.insert(3, 4242);

    let proc = Resolver::new(table, procs()).resolve(addr(SRC), addr(DST))?;
    assert_eq!("curl", proc.name);

    Ok(())
}

#[test]
fn sentinel_has_parent() {
    let proc = Process::unknown();
    assert_eq!(UNKNOWN, proc.parent.name);
    assert_eq!(UNKNOWN, proc.parent.cmdline);
    assert_eq!(UNKNOWN, proc.parent.user);
    assert_eq!(proc, Process::default());
}
