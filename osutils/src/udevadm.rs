use anyhow::{Context, Error};

use crate::dependencies::Dependency;

pub fn settle() -> Result<(), Error> {
    Dependency::Udevadm
        .cmd()
        .arg("settle")
        .run_and_check()
        .context("Failed to settle udev")
}
