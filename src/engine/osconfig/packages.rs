use std::path::Path;

use anyhow::Error;

use osutils::{files, path::join_relative, xbps::XbpsInstall};
use sysdefs::arch::SystemArchitecture;
use voidstrap_api::{
    config::{repository_packages, Gpu, InstallConfiguration},
    constants::XBPS_REPOSITORY_CONFIG_PATH,
};

/// Points the installed system's main repository at `repository`.
pub(super) fn write_repository_config(root: &Path, repository: &str) -> Result<(), Error> {
    files::write_file(
        join_relative(root, XBPS_REPOSITORY_CONFIG_PATH),
        0o644,
        format!("repository={repository}\n").as_bytes(),
    )
}

pub(super) fn self_update() -> Result<(), Error> {
    XbpsInstall::new(["xbps"]).update().run()
}

/// Installs the nonfree (and on glibc x86_64, multilib) repository packages
/// and synchronizes the new repositories.
pub(super) fn enable_repositories(config: &InstallConfiguration) -> Result<(), Error> {
    let multilib_capable = config.architecture() == SystemArchitecture::X86_64;
    XbpsInstall::new(repository_packages(config.libc, multilib_capable)).run()?;
    XbpsInstall::new(Vec::<String>::new()).run()
}

/// Kernels, plus their headers when an out-of-tree driver gets built.
pub(super) fn kernel_packages(config: &InstallConfiguration) -> Vec<&'static str> {
    let mut packages = config.kernel.packages().to_vec();
    if config.gpu == Gpu::Nvidia {
        packages.extend(config.kernel.header_packages());
    }
    packages
}

pub(super) fn gpu_packages(gpu: Gpu) -> &'static [&'static str] {
    match gpu {
        Gpu::Generic => &[],
        Gpu::Nvidia => &["nvidia"],
    }
}

pub(super) fn install(packages: &[&'static str]) -> Result<(), Error> {
    XbpsInstall::new(packages.iter().copied()).run()
}

#[cfg(test)]
mod tests {
    use voidstrap_api::config::{Filesystem, Kernel};

    use super::*;
    use crate::engine::context::tests::config;

    #[test]
    fn test_kernel_packages() {
        let mut config = config("/dev/sda", Filesystem::Ext4);
        assert_eq!(kernel_packages(&config), vec!["linux"]);

        config.kernel = Kernel::Both;
        config.gpu = Gpu::Nvidia;
        assert_eq!(
            kernel_packages(&config),
            vec!["linux", "linux-lts", "linux-headers", "linux-lts-headers"]
        );
        assert_eq!(gpu_packages(config.gpu), ["nvidia"]);
        assert!(gpu_packages(Gpu::Generic).is_empty());
    }

    #[test]
    fn test_write_repository_config() {
        let root = tempfile::tempdir().unwrap();
        write_repository_config(root.path(), "https://mirror.example.org/current").unwrap();
        assert_eq!(
            std::fs::read_to_string(root.path().join("etc/xbps.d/00-repository-main.conf"))
                .unwrap(),
            "repository=https://mirror.example.org/current\n"
        );
    }
}
