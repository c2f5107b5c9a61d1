//! Capability presets and helpers
//!
//! Common capability masks for context creation and log rendering

use super::{CapMask, Capability};
use alloc::string::String;
use alloc::vec::Vec;

/// Predefined common capability masks
pub mod presets {
    use super::*;

    /// Nothing
    pub fn none() -> CapMask {
        CapMask::empty()
    }

    /// Default set granted to container workloads
    pub fn container_default() -> CapMask {
        CapMask::from_caps(&[
            Capability::Chown,
            Capability::DacOverride,
            Capability::Fowner,
            Capability::Fsetid,
            Capability::Kill,
            Capability::Setgid,
            Capability::Setuid,
            Capability::Setpcap,
            Capability::NetBindService,
            Capability::SysChroot,
            Capability::Mknod,
            Capability::AuditWrite,
            Capability::Setfcap,
        ])
    }

    /// Network administration
    pub fn network_admin() -> CapMask {
        CapMask::from_caps(&[
            Capability::NetAdmin,
            Capability::NetRaw,
            Capability::NetBindService,
            Capability::NetBroadcast,
        ])
    }

    /// MAC policy management
    pub fn mac_admin() -> CapMask {
        CapMask::from_caps(&[Capability::MacAdmin, Capability::MacOverride])
    }

    /// Everything except the capabilities that can rewrite the kernel itself
    pub fn system_service() -> CapMask {
        CapMask::all().difference(&CapMask::from_caps(&[
            Capability::SysModule,
            Capability::SysRawio,
            Capability::SysBoot,
            Capability::MacAdmin,
            Capability::Bpf,
        ]))
    }
}

/// Canonical lower-case name of a capability
pub fn name(cap: Capability) -> &'static str {
    match cap {
        Capability::Chown => "chown",
        Capability::DacOverride => "dac_override",
        Capability::DacReadSearch => "dac_read_search",
        Capability::Fowner => "fowner",
        Capability::Fsetid => "fsetid",
        Capability::Kill => "kill",
        Capability::Setgid => "setgid",
        Capability::Setuid => "setuid",
        Capability::Setpcap => "setpcap",
        Capability::LinuxImmutable => "linux_immutable",
        Capability::NetBindService => "net_bind_service",
        Capability::NetBroadcast => "net_broadcast",
        Capability::NetAdmin => "net_admin",
        Capability::NetRaw => "net_raw",
        Capability::IpcLock => "ipc_lock",
        Capability::IpcOwner => "ipc_owner",
        Capability::SysModule => "sys_module",
        Capability::SysRawio => "sys_rawio",
        Capability::SysChroot => "sys_chroot",
        Capability::SysPtrace => "sys_ptrace",
        Capability::SysPacct => "sys_pacct",
        Capability::SysAdmin => "sys_admin",
        Capability::SysBoot => "sys_boot",
        Capability::SysNice => "sys_nice",
        Capability::SysResource => "sys_resource",
        Capability::SysTime => "sys_time",
        Capability::SysTtyConfig => "sys_tty_config",
        Capability::Mknod => "mknod",
        Capability::Lease => "lease",
        Capability::AuditWrite => "audit_write",
        Capability::AuditControl => "audit_control",
        Capability::Setfcap => "setfcap",
        Capability::MacOverride => "mac_override",
        Capability::MacAdmin => "mac_admin",
        Capability::Syslog => "syslog",
        Capability::WakeAlarm => "wake_alarm",
        Capability::BlockSuspend => "block_suspend",
        Capability::AuditRead => "audit_read",
        Capability::Perfmon => "perfmon",
        Capability::Bpf => "bpf",
        Capability::CheckpointRestore => "checkpoint_restore",
    }
}

/// Get human-readable description of a mask
pub fn describe(mask: &CapMask) -> String {
    if mask.is_empty() {
        return String::from("no capabilities");
    }
    if *mask == CapMask::all() {
        return String::from("all capabilities");
    }

    let names: Vec<&str> = mask.iter().map(name).collect();
    names.join(", ")
}
