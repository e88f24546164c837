use std::path::Path;

use anyhow::Error;
use log::info;

use osutils::xbps;
use voidstrap_api::{
    config::Libc,
    error::{InstallError, ReportError, VoidstrapError},
};

use crate::engine::{EngineContext, Subsystem};

mod hostname;
mod initramfs;
mod locale;
mod packages;
mod services;
mod users;

use initramfs::DracutConfig;

/// Runs one configuration step, reporting a failure under `step`.
fn run_step(step: &'static str, f: impl FnOnce() -> Result<(), Error>) -> Result<(), VoidstrapError> {
    info!("Configuring {step}");
    f().structured(InstallError::Configure { step })
}

#[derive(Default, Debug)]
pub(super) struct OsConfigSubsystem;

impl Subsystem for OsConfigSubsystem {
    fn name(&self) -> &'static str {
        "os-config"
    }

    fn configure(&mut self, ctx: &EngineContext, exec_root: &Path) -> Result<(), VoidstrapError> {
        let config = &ctx.config;

        run_step("package manager", || {
            packages::write_repository_config(exec_root, &config.repository)?;
            packages::self_update()
        })?;
        run_step("repositories", || packages::enable_repositories(config))?;
        run_step("kernel", || {
            packages::install(&packages::kernel_packages(config))
        })?;
        let gpu_packages = packages::gpu_packages(config.gpu);
        if !gpu_packages.is_empty() {
            run_step("graphics driver", || packages::install(gpu_packages))?;
        }

        run_step("timezone", || {
            locale::set_timezone(exec_root, &config.timezone)
        })?;
        run_step("locale", || {
            locale::write_locale(exec_root, &config.locale, config.libc)?;
            if config.libc == Libc::Glibc {
                xbps::reconfigure(Some("glibc-locales"))?;
            }
            Ok(())
        })?;
        run_step("keymap", || locale::set_keymap(exec_root, &config.keymap))?;
        run_step("hostname", || {
            hostname::set_up_hostname(exec_root, &config.hostname)
        })?;

        run_step("privilege escalation", || {
            users::configure_privilege_tool(exec_root, config.privilege_tool)
        })?;
        run_step("user", || users::create_user(&config.username))?;
        run_step("passwords", || {
            users::set_passwords(&config.username, &ctx.credentials)
        })?;

        run_step("initramfs", || {
            DracutConfig::for_storage(&config.storage).write(exec_root)
        })?;
        run_step("services", || {
            services::enable_services(exec_root, &services::services(&config.storage))
        })?;

        run_step("packages", || xbps::reconfigure(None))
    }
}
