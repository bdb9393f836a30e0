//! Host service trap.
//!
//! Programs built against the bundled C runtime request host services
//! through software interrupt 255.  The call number rides in `r5`,
//! arguments in `r1`..`r4`, and the result comes back in `r1` (`-1`
//! on failure).  This module provides:
//! 1. **Dispatch:** [`dispatch`] decodes the call number and performs
//!    the request against the host OS.
//! 2. **File table:** [`HostIo`] maps guest descriptors to host files;
//!    descriptors 0..2 alias the host standard streams.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::common::{Fault, StopResult};
use crate::core::Cpu;

const SYS_EXIT: u32 = 1;
const SYS_OPEN: u32 = 2;
const SYS_CLOSE: u32 = 3;
const SYS_READ: u32 = 4;
const SYS_WRITE: u32 = 5;
const SYS_LSEEK: u32 = 6;
const SYS_UNLINK: u32 = 7;
const SYS_GETPID: u32 = 8;
const SYS_KILL: u32 = 9;
const SYS_FSTAT: u32 = 10;
const SYS_GETTIMEOFDAY: u32 = 19;
const SYS_TIMES: u32 = 20;

// Guest open(2) flag bits, following the newlib encoding.
const O_WRONLY: u32 = 0x0001;
const O_RDWR: u32 = 0x0002;
const O_APPEND: u32 = 0x0008;
const O_CREAT: u32 = 0x0200;
const O_TRUNC: u32 = 0x0400;

/// Upper bound on a single host-side read buffer; longer guest
/// requests are served in pieces.
const READ_CHUNK: usize = 4096;

/// Host-side state backing the service trap: the guest descriptor
/// table.  Descriptors 0..2 are reserved for the standard streams and
/// never appear in the map.
#[derive(Debug, Default)]
pub struct HostIo {
    files: HashMap<i32, File>,
    next_fd: i32,
}

impl HostIo {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            next_fd: 3,
        }
    }
}

/// Performs one host service call on behalf of the guest.
///
/// Returns `Stepped` for calls that let execution continue; `exit` and
/// `kill` translate into run-loop stop results.
///
/// # Errors
///
/// Propagates memory faults raised while reading call arguments (path
/// strings, I/O buffers) from guest memory.
pub(crate) fn dispatch(cpu: &mut Cpu) -> Result<StopResult, Fault> {
    let call = cpu.regs.gpr(5);
    let a1 = cpu.regs.gpr(1);
    let a2 = cpu.regs.gpr(2);
    let a3 = cpu.regs.gpr(3);
    trace!(call, a1, a2, a3, "host service");

    let result: i32 = match call {
        SYS_EXIT => return Ok(StopResult::Exited(a1 as i32)),
        SYS_KILL => return Ok(StopResult::Stopped(a2 as i32)),

        SYS_OPEN => {
            let path = read_path(cpu, a1)?;
            match open_host(&path, a2) {
                Ok(file) => {
                    let fd = cpu.host.next_fd;
                    cpu.host.next_fd += 1;
                    cpu.host.files.insert(fd, file);
                    fd
                }
                Err(_) => -1,
            }
        }
        SYS_CLOSE => {
            let fd = a1 as i32;
            if fd < 3 {
                // Closing a standard stream succeeds without touching
                // the host's copy.
                0
            } else if cpu.host.files.remove(&fd).is_some() {
                0
            } else {
                -1
            }
        }
        SYS_READ => {
            // The guest picks the length; buffer host-side in bounded
            // chunks so a wild r3 cannot force a giant allocation.
            let len = a3 as usize;
            let mut chunk = [0u8; READ_CHUNK];
            let mut total = 0usize;
            let mut failed = false;
            while total < len {
                let want = (len - total).min(READ_CHUNK);
                let n = match a1 as i32 {
                    0 => io::stdin().read(&mut chunk[..want]),
                    fd => match cpu.host.files.get_mut(&fd) {
                        Some(file) => file.read(&mut chunk[..want]),
                        None => Err(io::ErrorKind::NotFound.into()),
                    },
                };
                match n {
                    Ok(0) => break,
                    Ok(n) => {
                        for (i, &b) in chunk[..n].iter().enumerate() {
                            cpu.mem.write_u8(a2.wrapping_add((total + i) as u32), b)?;
                        }
                        total += n;
                        if n < want {
                            break;
                        }
                    }
                    Err(_) => {
                        failed = true;
                        break;
                    }
                }
            }
            if failed && total == 0 {
                -1
            } else {
                total as i32
            }
        }
        SYS_WRITE => {
            let mut buf = Vec::with_capacity(a3 as usize);
            for i in 0..a3 {
                buf.push(cpu.mem.read_u8(a2.wrapping_add(i))?);
            }
            let n = match a1 as i32 {
                1 => io::stdout().write(&buf).and_then(|n| {
                    io::stdout().flush()?;
                    Ok(n)
                }),
                2 => io::stderr().write(&buf),
                fd => match cpu.host.files.get_mut(&fd) {
                    Some(file) => file.write(&buf),
                    None => Err(io::ErrorKind::NotFound.into()),
                },
            };
            match n {
                Ok(n) => n as i32,
                Err(_) => -1,
            }
        }
        SYS_LSEEK => {
            let whence = match a3 {
                0 => Some(SeekFrom::Start(a2 as u64)),
                1 => Some(SeekFrom::Current(a2 as i32 as i64)),
                2 => Some(SeekFrom::End(a2 as i32 as i64)),
                _ => None,
            };
            match (whence, cpu.host.files.get_mut(&(a1 as i32))) {
                (Some(pos), Some(file)) => match file.seek(pos) {
                    Ok(off) => off as i32,
                    Err(_) => -1,
                },
                _ => -1,
            }
        }
        SYS_UNLINK => {
            let path = read_path(cpu, a1)?;
            match std::fs::remove_file(&path) {
                Ok(()) => 0,
                Err(_) => -1,
            }
        }
        SYS_GETPID => 42,
        SYS_FSTAT => {
            // Minimal stub: zero the stat buffer and report a character
            // device, which keeps newlib's isatty-style probes happy.
            for i in 0..64 {
                cpu.mem.write_u8(a2.wrapping_add(i), 0)?;
            }
            cpu.mem.write_u32(a2.wrapping_add(4), 0x2000)?;
            0
        }
        SYS_GETTIMEOFDAY => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            cpu.mem.write_u32(a1, now.as_secs() as u32)?;
            cpu.mem.write_u32(a1.wrapping_add(4), now.subsec_micros())?;
            0
        }
        SYS_TIMES => {
            let ticks = cpu.stats.cycles as u32;
            cpu.mem.write_u32(a1, ticks)?;
            for off in [4, 8, 12] {
                cpu.mem.write_u32(a1.wrapping_add(off), 0)?;
            }
            ticks as i32
        }

        other => {
            trace!(call = other, "unknown host service");
            -1
        }
    };

    cpu.regs.set_gpr(1, result as u32);
    Ok(StopResult::Stepped)
}

/// Reads a NUL-terminated path string out of guest memory.
fn read_path(cpu: &mut Cpu, mut addr: u32) -> Result<String, Fault> {
    let mut bytes = Vec::new();
    loop {
        let b = cpu.mem.read_u8(addr)?;
        if b == 0 {
            break;
        }
        bytes.push(b);
        addr = addr.wrapping_add(1);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn open_host(path: &str, flags: u32) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    if flags & O_RDWR != 0 {
        opts.read(true).write(true);
    } else if flags & O_WRONLY != 0 {
        opts.write(true);
    } else {
        opts.read(true);
    }
    opts.create(flags & O_CREAT != 0)
        .truncate(flags & O_TRUNC != 0)
        .append(flags & O_APPEND != 0);
    opts.open(path)
}
