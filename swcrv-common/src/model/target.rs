// swcrv-common/src/model/target.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwcrvError};

/// Operating system component of a platform triple, spelled the way Node's
/// `process.platform` reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Win32,
    Freebsd,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Win32 => "win32",
            Platform::Freebsd => "freebsd",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Abi {
    Gnu,
    Musl,
    None,
}

impl Abi {
    /// Suffix appended directly after the architecture key, e.g. `-gnu`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Abi::Gnu => "-gnu",
            Abi::Musl => "-musl",
            Abi::None => "",
        }
    }

    /// Value of the `libc` field npm uses to filter platform packages.
    pub fn libc(&self) -> Option<&'static str> {
        match self {
            Abi::Gnu => Some("glibc"),
            Abi::Musl => Some("musl"),
            Abi::None => None,
        }
    }
}

impl FromStr for Abi {
    type Err = SwcrvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gnu" => Ok(Abi::Gnu),
            "musl" => Ok(Abi::Musl),
            "none" | "" => Ok(Abi::None),
            other => Err(SwcrvError::ValidationError(format!(
                "Unknown ABI '{other}' (expected gnu, musl or none)"
            ))),
        }
    }
}

/// A platform triple: (platform, architecture key, ABI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub platform: Platform,
    pub arch: String,
    pub abi: Abi,
}

impl Target {
    pub fn linux(arch: &str, abi: Abi) -> Result<Self> {
        validate_arch_key(arch)?;
        Ok(Self {
            platform: Platform::Linux,
            arch: arch.to_string(),
            abi,
        })
    }

    /// `linux-riscv64-gnu`
    pub fn platform_arch_abi(&self) -> String {
        format!("{}-{}{}", self.platform, self.arch, self.abi.suffix())
    }

    /// Rust target triple the binding has to be compiled for.
    pub fn rust_triple(&self) -> Result<String> {
        let cpu = match self.arch.as_str() {
            "x64" => "x86_64",
            "arm64" => "aarch64",
            "riscv64" => "riscv64gc",
            "ppc64" => "powerpc64le",
            "s390x" => "s390x",
            "loong64" => "loongarch64",
            other => {
                return Err(SwcrvError::ValidationError(format!(
                    "No Rust target known for architecture '{other}'"
                )))
            }
        };
        match (self.platform, self.abi) {
            (Platform::Linux, Abi::Gnu) => Ok(format!("{cpu}-unknown-linux-gnu")),
            (Platform::Linux, Abi::Musl) => Ok(format!("{cpu}-unknown-linux-musl")),
            (Platform::Darwin, _) => Ok(format!("{cpu}-apple-darwin")),
            (Platform::Freebsd, _) => Ok(format!("{cpu}-unknown-freebsd")),
            (platform, abi) => Err(SwcrvError::ValidationError(format!(
                "No Rust target known for {platform} with ABI {abi:?}"
            ))),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.platform_arch_abi())
    }
}

/// Architecture key a Node process running this binary would report.
pub fn host_arch() -> &'static str {
    node_arch_for(std::env::consts::ARCH)
}

pub fn node_arch_for(rust_arch: &str) -> &str {
    match rust_arch {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

fn validate_arch_key(arch: &str) -> Result<()> {
    let valid = !arch.is_empty()
        && arch
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(SwcrvError::ValidationError(format!(
            "Architecture key '{arch}' must be lowercase alphanumeric"
        )))
    }
}
