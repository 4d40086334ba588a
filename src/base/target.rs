use std::fmt;

/// A native target architecture a klib can be compiled for.
///
/// Names follow the native toolchain spelling (`linux_x64`). Lookup is
/// insensitive to case and underscores, so build-script spellings such
/// as `linuxX64` resolve to the same target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NativeTarget {
    AndroidX86,
    AndroidX64,
    AndroidArm32,
    AndroidArm64,
    IosArm32,
    IosArm64,
    IosX64,
    IosSimulatorArm64,
    WatchosArm32,
    WatchosArm64,
    WatchosX86,
    WatchosX64,
    WatchosSimulatorArm64,
    WatchosDeviceArm64,
    TvosArm64,
    TvosX64,
    TvosSimulatorArm64,
    LinuxX64,
    LinuxArm32Hfp,
    LinuxArm64,
    LinuxMips32,
    LinuxMipsel32,
    MingwX86,
    MingwX64,
    MacosX64,
    MacosArm64,
    Wasm32,
}

impl NativeTarget {
    pub const ALL: &'static [NativeTarget] = &[
        Self::AndroidX86,
        Self::AndroidX64,
        Self::AndroidArm32,
        Self::AndroidArm64,
        Self::IosArm32,
        Self::IosArm64,
        Self::IosX64,
        Self::IosSimulatorArm64,
        Self::WatchosArm32,
        Self::WatchosArm64,
        Self::WatchosX86,
        Self::WatchosX64,
        Self::WatchosSimulatorArm64,
        Self::WatchosDeviceArm64,
        Self::TvosArm64,
        Self::TvosX64,
        Self::TvosSimulatorArm64,
        Self::LinuxX64,
        Self::LinuxArm32Hfp,
        Self::LinuxArm64,
        Self::LinuxMips32,
        Self::LinuxMipsel32,
        Self::MingwX86,
        Self::MingwX64,
        Self::MacosX64,
        Self::MacosArm64,
        Self::Wasm32,
    ];

    /// Canonical toolchain name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AndroidX86 => "android_x86",
            Self::AndroidX64 => "android_x64",
            Self::AndroidArm32 => "android_arm32",
            Self::AndroidArm64 => "android_arm64",
            Self::IosArm32 => "ios_arm32",
            Self::IosArm64 => "ios_arm64",
            Self::IosX64 => "ios_x64",
            Self::IosSimulatorArm64 => "ios_simulator_arm64",
            Self::WatchosArm32 => "watchos_arm32",
            Self::WatchosArm64 => "watchos_arm64",
            Self::WatchosX86 => "watchos_x86",
            Self::WatchosX64 => "watchos_x64",
            Self::WatchosSimulatorArm64 => "watchos_simulator_arm64",
            Self::WatchosDeviceArm64 => "watchos_device_arm64",
            Self::TvosArm64 => "tvos_arm64",
            Self::TvosX64 => "tvos_x64",
            Self::TvosSimulatorArm64 => "tvos_simulator_arm64",
            Self::LinuxX64 => "linux_x64",
            Self::LinuxArm32Hfp => "linux_arm32_hfp",
            Self::LinuxArm64 => "linux_arm64",
            Self::LinuxMips32 => "linux_mips32",
            Self::LinuxMipsel32 => "linux_mipsel32",
            Self::MingwX86 => "mingw_x86",
            Self::MingwX64 => "mingw_x64",
            Self::MacosX64 => "macos_x64",
            Self::MacosArm64 => "macos_arm64",
            Self::Wasm32 => "wasm32",
        }
    }

    /// Look a target up by name; `None` for empty or unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|target| normalize(target.name()) == wanted)
    }
}

impl fmt::Display for NativeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
