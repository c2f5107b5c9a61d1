//! Security Objects
//!
//! Object classes, object references and the permission bitmask used by
//! MAC rules

use super::mac::SecurityId;

/// Object class categorization
///
/// Closed set: MAC rules are keyed on it and the AVC never sees anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ObjectClass {
    Process = 0,
    File = 1,
    Directory = 2,
    Socket = 3,
    Ipc = 4,
    Device = 5,
    Memory = 6,
    Namespace = 7,
    Capability = 8,
    System = 9,
}

impl ObjectClass {
    pub const COUNT: usize = 10;

    pub const ALL: [ObjectClass; Self::COUNT] = [
        Self::Process,
        Self::File,
        Self::Directory,
        Self::Socket,
        Self::Ipc,
        Self::Device,
        Self::Memory,
        Self::Namespace,
        Self::Capability,
        Self::System,
    ];

    /// Class from its raw index
    ///
    /// # Panics
    /// An out-of-range index is a broken caller contract, not a security event.
    pub fn from_index(index: u8) -> Self {
        match Self::ALL.get(index as usize) {
            Some(class) => *class,
            None => panic!("object class index {} out of range", index),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::File => "file",
            Self::Directory => "dir",
            Self::Socket => "socket",
            Self::Ipc => "ipc",
            Self::Device => "device",
            Self::Memory => "memory",
            Self::Namespace => "namespace",
            Self::Capability => "capability",
            Self::System => "system",
        }
    }
}

bitflags::bitflags! {
    /// Access vector - permissions requested of / granted on an object
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessVector: u32 {
        const READ       = 1 << 0;
        const WRITE      = 1 << 1;
        const EXECUTE    = 1 << 2;
        const APPEND     = 1 << 3;
        const CREATE     = 1 << 4;
        const UNLINK     = 1 << 5;
        const IOCTL      = 1 << 6;
        const MOUNT      = 1 << 7;
        const CONNECT    = 1 << 8;
        const BIND       = 1 << 9;
        const LISTEN     = 1 << 10;
        const SIGNAL     = 1 << 11;
        const PTRACE     = 1 << 12;
        const TRANSITION = 1 << 13;
        const SETATTR    = 1 << 14;
        const GETATTR    = 1 << 15;
    }
}

impl AccessVector {
    /// Read-write convenience set
    pub const READ_WRITE: Self = Self::READ.union(Self::WRITE);
}

/// Reference to the object of an access check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Label of the object
    pub sid: SecurityId,
    /// Class of the object
    pub class: ObjectClass,
}

impl ObjectRef {
    pub const fn new(sid: SecurityId, class: ObjectClass) -> Self {
        Self { sid, class }
    }
}
