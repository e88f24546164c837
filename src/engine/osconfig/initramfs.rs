use std::{
    fmt::{self, Display},
    path::Path,
};

use anyhow::Error;

use osutils::{files, path::join_relative};
use voidstrap_api::{config::StorageStack, constants::DRACUT_CONFIG_PATH};

/// Dracut configuration fragment for the installed storage stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct DracutConfig {
    pub hostonly: bool,
    pub modules: Vec<&'static str>,
}

impl DracutConfig {
    pub fn for_storage(storage: &StorageStack) -> Self {
        let mut modules = Vec::new();
        if storage.is_encrypted() {
            modules.push("crypt");
        }
        if storage.lvm().is_some() {
            modules.push("lvm");
        }
        Self {
            hostonly: true,
            modules,
        }
    }

    pub fn write(&self, root: &Path) -> Result<(), Error> {
        files::write_file(
            join_relative(root, DRACUT_CONFIG_PATH),
            0o644,
            self.to_string().as_bytes(),
        )
    }
}

impl Display for DracutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "hostonly=\"{}\"", if self.hostonly { "yes" } else { "no" })?;
        for module in &self.modules {
            writeln!(f, "add_dracutmodules+=\" {module} \"")?;
        }
        Ok(())
    }
}
