use std::path::Path;

use anyhow::Error;
use log::debug;

use osutils::{files, path::join_relative};
use voidstrap_api::constants::{HOSTNAME_PATH, HOSTS_PATH};

fn render_hosts(hostname: &str) -> String {
    let (fqdn, short) = match hostname.split_once('.') {
        Some((short, _)) => (hostname.to_string(), short),
        None => (format!("{hostname}.localdomain"), hostname),
    };
    format!("127.0.0.1\tlocalhost\n::1\t\tlocalhost\n127.0.1.1\t{fqdn}\t{short}\n")
}

pub(super) fn set_up_hostname(root: &Path, hostname: &str) -> Result<(), Error> {
    debug!("Setting up hostname '{hostname}'");
    files::write_file(
        join_relative(root, HOSTNAME_PATH),
        0o644,
        format!("{hostname}\n").as_bytes(),
    )?;
    files::write_file(
        join_relative(root, HOSTS_PATH),
        0o644,
        render_hosts(hostname).as_bytes(),
    )
}
