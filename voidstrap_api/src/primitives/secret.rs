use std::fmt::{self, Debug};

/// A password or passphrase collected for the duration of one install.
///
/// The value is never serialized and its `Debug` output is redacted; use
/// [`Secret::expose`] only at the point where it is handed to a tool's stdin.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// The secrets needed for one install.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub root_password: Secret,
    pub user_password: Secret,

    /// Present only when the storage stack is encrypted.
    pub luks_passphrase: Option<Secret>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let creds = Credentials {
            root_password: Secret::new("hunter2"),
            user_password: Secret::new("correct horse"),
            luks_passphrase: Some(Secret::new("battery staple")),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("horse"));
        assert!(!rendered.contains("staple"));
        assert_eq!(creds.root_password.expose(), "hunter2");
    }
}
