use std::path::Path;

use anyhow::Error;
use log::debug;

use osutils::{files, path::join_relative, users};
use voidstrap_api::{
    config::PrivilegeTool,
    constants::{DOAS_CONFIG_PATH, PRIVILEGED_GROUP, SUDOERS_DROPIN_PATH, USER_GROUPS},
    primitives::secret::Credentials,
};

const USER_SHELL: &str = "/bin/bash";

pub(super) fn create_user(username: &str) -> Result<(), Error> {
    debug!("Creating user '{username}' in groups {}", USER_GROUPS.join(","));
    users::useradd(username, USER_SHELL, &USER_GROUPS)
}

pub(super) fn set_passwords(username: &str, credentials: &Credentials) -> Result<(), Error> {
    users::chpasswd(&[
        ("root", &credentials.root_password),
        (username, &credentials.user_password),
    ])
}

/// Grants members of the privileged group elevated access through the
/// selected tool. Everyone else is denied.
pub(super) fn configure_privilege_tool(root: &Path, tool: PrivilegeTool) -> Result<(), Error> {
    let (path, mode, contents) = match tool {
        PrivilegeTool::Sudo => (
            SUDOERS_DROPIN_PATH,
            0o440,
            format!("%{PRIVILEGED_GROUP} ALL=(ALL:ALL) ALL\n"),
        ),
        PrivilegeTool::Doas => (
            DOAS_CONFIG_PATH,
            0o400,
            format!("permit persist :{PRIVILEGED_GROUP}\n"),
        ),
    };
    debug!("Writing '{path}'");
    files::write_file(join_relative(root, path), mode, contents.as_bytes())
}
