use std::path::Path;

use log::{debug, info};

use voidstrap_api::{config::InstallConfiguration, error::VoidstrapError};

/// Loads and validates an install configuration file.
pub fn validate_config_file(
    path: impl AsRef<Path>,
) -> Result<InstallConfiguration, VoidstrapError> {
    info!(
        "Validating install configuration file: {}",
        path.as_ref().display()
    );

    let config = InstallConfiguration::load_from_file(path.as_ref())?;

    info!("Install configuration is valid");
    match serde_yaml::to_string(&config) {
        Ok(contents) => debug!("Parsed contents:\n{contents}"),
        Err(e) => debug!("Failed to serialize install configuration: {e}"),
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{io::Write, path::PathBuf};

    use voidstrap_api::error::{ErrorKind, InvalidInputError};

    #[test]
    fn test_validate_shipped_configurations() {
        let configs = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs");
        for name in ["nvme-luks-lvm.yaml", "sda-bcachefs-bios.yaml"] {
            validate_config_file(configs.join(name))
                .unwrap_or_else(|e| panic!("Failed to validate {name}: {e:?}"));
        }
    }

    #[test]
    fn test_validate_invalid_file() {
        let error = validate_config_file("/does/not/exist.yaml").unwrap_err();
        assert_eq!(
            error.kind(),
            &ErrorKind::InvalidInput(InvalidInputError::LoadConfiguration {
                path: "/does/not/exist.yaml".into()
            })
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "disk: /dev/sda\nhostname: void\nbogus: true").unwrap();
        let error = validate_config_file(file.path()).unwrap_err();
        assert_eq!(
            error.kind(),
            &ErrorKind::InvalidInput(InvalidInputError::ParseConfiguration)
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "disk: /dev/sda\nhostname: -void\ntimezone: UTC\nusername: alice\nstorage:\n  filesystem: xfs"
        )
        .unwrap();
        let error = validate_config_file(file.path()).unwrap_err();
        assert!(matches!(
            error.kind(),
            ErrorKind::InvalidInput(InvalidInputError::InvalidConfiguration(_))
        ));
    }
}
