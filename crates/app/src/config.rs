//! Command-line configuration.
//!
//! Flags: `--assets=DIR`, `--device=headless|wgpu`,
//! `--gpu-backend=auto|vulkan|dx12|metal|gl`, `--cycles=N`.

use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceKind {
    #[default]
    Headless,
    Wgpu,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub assets: PathBuf,
    pub device: DeviceKind,
    pub backends: wgpu::Backends,
    /// Extra unload/load rounds after the first load.
    pub cycles: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assets: PathBuf::from("assets"),
            device: DeviceKind::Headless,
            backends: wgpu::Backends::all(),
            cycles: 0,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    /// Unknown values fall back to the default with a warning; the last
    /// occurrence of a flag wins.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            if let Some(val) = arg.strip_prefix("--assets=") {
                config.assets = PathBuf::from(val);
            } else if let Some(val) = arg.strip_prefix("--device=") {
                config.device = parse_device(val);
            } else if let Some(val) = arg.strip_prefix("--gpu-backend=") {
                config.backends = parse_backend(val);
            } else if let Some(val) = arg.strip_prefix("--cycles=") {
                match val.parse::<u32>() {
                    Ok(n) => config.cycles = n,
                    Err(_) => log::warn!("Invalid --cycles value '{}', using 0.", val),
                }
            } else {
                log::warn!("Ignoring unknown argument '{}'", arg);
            }
        }
        config
    }
}

fn parse_device(val: &str) -> DeviceKind {
    match val.to_ascii_lowercase().as_str() {
        "headless" | "none" => DeviceKind::Headless,
        "wgpu" | "gpu" => DeviceKind::Wgpu,
        other => {
            log::warn!("Unknown device '{}', falling back to headless.", other);
            DeviceKind::Headless
        }
    }
}

fn parse_backend(val: &str) -> wgpu::Backends {
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        assert_eq!(AppConfig::from_args(Vec::<String>::new()), AppConfig::default());
    }

    #[test]
    fn parses_every_flag() {
        let config = AppConfig::from_args([
            "--assets=/srv/baum",
            "--device=WGPU",
            "--gpu-backend=vk",
            "--cycles=3",
        ]);
        assert_eq!(config.assets, PathBuf::from("/srv/baum"));
        assert_eq!(config.device, DeviceKind::Wgpu);
        assert_eq!(config.backends, wgpu::Backends::VULKAN);
        assert_eq!(config.cycles, 3);
    }

    #[test]
    fn bad_values_fall_back() {
        let config = AppConfig::from_args([
            "--device=vulkan",
            "--gpu-backend=glide",
            "--cycles=-1",
            "--size=1x1",
        ]);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn last_flag_wins() {
        let config = AppConfig::from_args(["--cycles=2", "--cycles=5"]);
        assert_eq!(config.cycles, 5);
    }
}
