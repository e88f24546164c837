use serde::Serialize;
use strum_macros::IntoStaticStr;

/// GPT partition types written by the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GptPartitionType {
    /// EFI System Partition
    Esp,

    /// BIOS boot partition holding the stage-2 loader on GPT disks
    BiosBoot,

    /// Generic Linux filesystem data
    LinuxFilesystem,

    /// LVM physical volume
    LinuxLvm,

    /// LUKS container
    LinuxLuks,
}

impl GptPartitionType {
    /// Type GUID as understood by `sfdisk`.
    pub fn guid(self) -> &'static str {
        match self {
            GptPartitionType::Esp => "C12A7328-F81F-11D2-BA4B-00A0C93EC93B",
            GptPartitionType::BiosBoot => "21686148-6449-6E6F-744E-656564454649",
            GptPartitionType::LinuxFilesystem => "0FC63DAF-8483-4772-8E79-3D69D8477DE4",
            GptPartitionType::LinuxLvm => "E6D6D379-F507-44C2-A23C-238F2A3DF928",
            GptPartitionType::LinuxLuks => "CA7D7CCB-63ED-4C53-861C-1742536059CC",
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}
