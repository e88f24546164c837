use std::{fs, path::Path};

use anyhow::{bail, Context, Error};
use log::debug;

use osutils::{files, path::join_relative};
use voidstrap_api::{
    config::Libc,
    constants::{LIBC_LOCALES_PATH, LOCALE_CONF_PATH, LOCALTIME_PATH, RC_CONF_PATH, ZONEINFO_PATH},
};

pub(super) fn set_timezone(root: &Path, timezone: &str) -> Result<(), Error> {
    let zone = Path::new(ZONEINFO_PATH).join(timezone);
    debug!("Linking '{LOCALTIME_PATH}' to '{}'", zone.display());
    files::replace_symlink(zone, join_relative(root, LOCALTIME_PATH))
}

/// Uncomments `locale` in a `libc-locales` file.
fn enable_locale(contents: &str, locale: &str) -> Result<String, Error> {
    let mut found = false;
    let mut enabled: String = contents
        .lines()
        .map(|line| {
            let candidate = line.trim_start_matches('#').trim_start();
            if candidate.split_whitespace().next() == Some(locale) {
                found = true;
                candidate
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    if !found {
        bail!("Locale '{locale}' is not listed in '{LIBC_LOCALES_PATH}'");
    }
    if contents.ends_with('\n') {
        enabled.push('\n');
    }
    Ok(enabled)
}

/// Writes the locale configuration. On glibc the locale also gets enabled
/// for generation, which the caller triggers by reconfiguring
/// `glibc-locales`.
pub(super) fn write_locale(root: &Path, locale: &str, libc: Libc) -> Result<(), Error> {
    if libc == Libc::Glibc {
        let path = join_relative(root, LIBC_LOCALES_PATH);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        files::write_file(&path, 0o644, enable_locale(&contents, locale)?.as_bytes())?;
    }

    files::write_file(
        join_relative(root, LOCALE_CONF_PATH),
        0o644,
        format!("LANG={locale}\nLC_COLLATE=C\n").as_bytes(),
    )
}

/// Sets `key` in an rc.conf style file, replacing an existing or
/// commented-out assignment, or appending one.
fn set_rc_variable(contents: &str, key: &str, value: &str) -> String {
    let assignment = format!("{key}=\"{value}\"");
    let prefix = format!("{key}=");

    let mut replaced = false;
    let mut lines: Vec<_> = contents
        .lines()
        .map(|line| {
            if !replaced && line.trim_start_matches('#').trim_start().starts_with(&prefix) {
                replaced = true;
                assignment.clone()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(assignment);
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}

pub(super) fn set_keymap(root: &Path, keymap: &str) -> Result<(), Error> {
    let path = join_relative(root, RC_CONF_PATH);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read '{}'", path.display()))
        }
    };
    files::write_file(&path, 0o644, set_rc_variable(&contents, "KEYMAP", keymap).as_bytes())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    const LIBC_LOCALES: &str = indoc! {"
        #de_DE.UTF-8 UTF-8
        #en_GB.UTF-8 UTF-8
        #en_US ISO-8859-1
        #en_US.UTF-8 UTF-8
    "};

    #[test]
    fn test_enable_locale() {
        assert_eq!(
            enable_locale(LIBC_LOCALES, "en_US.UTF-8").unwrap(),
            indoc! {"
                #de_DE.UTF-8 UTF-8
                #en_GB.UTF-8 UTF-8
                #en_US ISO-8859-1
                en_US.UTF-8 UTF-8
            "}
        );

        let error = enable_locale(LIBC_LOCALES, "xx_XX.UTF-8").unwrap_err();
        assert!(error.to_string().contains("'xx_XX.UTF-8' is not listed"));
    }

    #[test]
    fn test_write_locale() {
        let root = tempfile::tempdir().unwrap();
        let locales = root.path().join("etc/default/libc-locales");
        fs::create_dir_all(locales.parent().unwrap()).unwrap();
        fs::write(&locales, LIBC_LOCALES).unwrap();

        write_locale(root.path(), "de_DE.UTF-8", Libc::Glibc).unwrap();
        assert!(fs::read_to_string(&locales)
            .unwrap()
            .starts_with("de_DE.UTF-8 UTF-8\n"));
        assert_eq!(
            fs::read_to_string(root.path().join("etc/locale.conf")).unwrap(),
            "LANG=de_DE.UTF-8\nLC_COLLATE=C\n"
        );

        // musl has no locale list
        let root = tempfile::tempdir().unwrap();
        write_locale(root.path(), "en_US.UTF-8", Libc::Musl).unwrap();
        assert!(root.path().join("etc/locale.conf").is_file());
    }

    #[test]
    fn test_set_rc_variable() {
        let rc_conf = indoc! {r#"
            # /etc/rc.conf
            #HARDWARECLOCK="UTC"
            #KEYMAP="es"
        "#};
        assert_eq!(
            set_rc_variable(rc_conf, "KEYMAP", "de"),
            indoc! {r#"
                # /etc/rc.conf
                #HARDWARECLOCK="UTC"
                KEYMAP="de"
            "#}
        );
        assert_eq!(set_rc_variable("", "KEYMAP", "us"), "KEYMAP=\"us\"\n");
    }

    #[test]
    fn test_set_timezone_and_keymap() {
        let root = tempfile::tempdir().unwrap();
        set_timezone(root.path(), "Europe/Berlin").unwrap();
        assert_eq!(
            fs::read_link(root.path().join("etc/localtime")).unwrap(),
            Path::new("/usr/share/zoneinfo/Europe/Berlin")
        );

        set_keymap(root.path(), "fr").unwrap();
        assert_eq!(
            fs::read_to_string(root.path().join("etc/rc.conf")).unwrap(),
            "KEYMAP=\"fr\"\n"
        );
    }
}
