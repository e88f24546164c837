use anyhow::{Context, Error};

use voidstrap_api::primitives::secret::Secret;

use crate::dependencies::{Command, Dependency};

fn useradd_command(name: &str, shell: &str, groups: &[&str]) -> Command {
    let mut cmd = Dependency::Useradd.cmd();
    cmd.arg("-m").arg("-s").arg(shell);
    if !groups.is_empty() {
        cmd.arg("-G").arg(groups.join(","));
    }
    cmd.arg(name);
    cmd
}

/// Creates user `name` with a home directory.
pub fn useradd(name: &str, shell: &str, groups: &[&str]) -> Result<(), Error> {
    useradd_command(name, shell, groups)
        .run_and_check()
        .with_context(|| format!("Failed to create user '{name}'"))
}

fn chpasswd_input(passwords: &[(&str, &Secret)]) -> String {
    passwords
        .iter()
        .map(|(user, password)| format!("{user}:{}\n", password.expose()))
        .collect()
}

/// Sets passwords through `chpasswd`, which reads them from stdin.
pub fn chpasswd(passwords: &[(&str, &Secret)]) -> Result<(), Error> {
    Dependency::Chpasswd
        .cmd()
        .stdin(chpasswd_input(passwords))
        .run_and_check()
        .context("Failed to set passwords")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_useradd_command() {
        assert_eq!(
            useradd_command("alice", "/bin/bash", &["wheel", "audio"]).render_command(),
            "useradd -m -s /bin/bash -G wheel,audio alice"
        );
    }

    #[test]
    fn test_chpasswd_input() {
        let root = Secret::new("r00t");
        let user = Secret::new("us3r pass");
        assert_eq!(
            chpasswd_input(&[("root", &root), ("alice", &user)]),
            "root:r00t\nalice:us3r pass\n"
        );
    }
}
