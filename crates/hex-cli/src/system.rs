//! Probing the host for the first-turn context line

use hex_agent::SystemInfo;
use std::process::{Command, Stdio};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Gather host facts. Runs once at startup.
pub fn probe() -> SystemInfo {
    let info = SystemInfo {
        platform: platform_name(std::env::consts::OS).to_string(),
        arch: arch_name(std::env::consts::ARCH).to_string(),
        core_count: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        memory_gb: total_memory_bytes().map(bytes_to_gb).unwrap_or(0),
        elevated: can_sudo(),
    };
    tracing::debug!(?info, "probed system");
    info
}

/// Platform names as the agent ecosystem spells them
fn platform_name(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

fn arch_name(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        other => other,
    }
}

fn bytes_to_gb(bytes: u64) -> u64 {
    (bytes as f64 / BYTES_PER_GB).round() as u64
}

/// `MemTotal` from a `/proc/meminfo` dump, in bytes
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_meminfo(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

#[cfg(target_os = "linux")]
fn total_memory_bytes() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo(&meminfo)
}

#[cfg(target_os = "macos")]
fn total_memory_bytes() -> Option<u64> {
    let output = Command::new("sysctl")
        .args(["-n", "hw.memsize"])
        .stderr(Stdio::null())
        .output()
        .ok()?;
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn total_memory_bytes() -> Option<u64> {
    None
}

/// Whether `sudo` works without prompting for a password
fn can_sudo() -> bool {
    Command::new("sudo")
        .args(["-n", "true"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Best-effort host name for `hex info`
pub fn hostname() -> String {
    if let Ok(name) = std::fs::read_to_string("/proc/sys/kernel/hostname") {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    Command::new("hostname")
        .stderr(Stdio::null())
        .output()
        .ok()
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_names() {
        assert_eq!(platform_name("linux"), "linux");
        assert_eq!(platform_name("macos"), "darwin");
        assert_eq!(platform_name("windows"), "win32");
        assert_eq!(platform_name("freebsd"), "freebsd");
    }

    #[test]
    fn test_arch_names() {
        assert_eq!(arch_name("x86_64"), "x64");
        assert_eq!(arch_name("aarch64"), "arm64");
        assert_eq!(arch_name("x86"), "ia32");
        assert_eq!(arch_name("riscv64"), "riscv64");
    }

    #[test]
    fn test_parse_meminfo() {
        let dump = "MemTotal:       16314216 kB\nMemFree:         1234567 kB\n";
        let bytes = parse_meminfo(dump).unwrap();
        assert_eq!(bytes, 16314216 * 1024);
        assert_eq!(bytes_to_gb(bytes), 16);
        assert_eq!(parse_meminfo("MemFree: 12 kB"), None);
    }

    #[test]
    fn test_bytes_to_gb_rounds() {
        assert_eq!(bytes_to_gb(0), 0);
        assert_eq!(bytes_to_gb(1536 * 1024 * 1024), 2);
        assert_eq!(bytes_to_gb(1400 * 1024 * 1024), 1);
    }

    #[test]
    fn test_probe_is_sane() {
        let info = probe();
        assert!(info.core_count >= 1);
        assert!(!info.platform.is_empty());
        assert!(info.context_line().starts_with("[System: "));
    }
}
