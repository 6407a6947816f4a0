//! Privilege escalation for mount commands.
//!
//! `mount` and `umount` need root. An unprivileged caller picks `sudo` or
//! `doas` with `--privilege` and every mount command is run through it.

use clap::ValueEnum;

/// Privilege escalation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrivilegeMethod {
    /// Use `sudo` for privilege escalation.
    Sudo,
    /// Use `doas` for privilege escalation.
    Doas,
}

impl PrivilegeMethod {
    /// Returns the command name for this privilege method.
    pub fn command_name(&self) -> &'static str {
        match self {
            Self::Sudo => "sudo",
            Self::Doas => "doas",
        }
    }

    /// Turns `command args...` into the argument list of the wrapper.
    pub fn wrap(&self, command: &str, args: &[String]) -> Vec<String> {
        std::iter::once(command.to_string())
            .chain(args.iter().cloned())
            .collect()
    }
}

impl std::fmt::Display for PrivilegeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names() {
        assert_eq!(PrivilegeMethod::Sudo.command_name(), "sudo");
        assert_eq!(PrivilegeMethod::Doas.to_string(), "doas");
    }

    #[test]
    fn wrap_puts_command_first() {
        let args = vec!["-l".to_string(), "/mnt/src".to_string()];
        assert_eq!(PrivilegeMethod::Doas.wrap("umount", &args), vec!["umount", "-l", "/mnt/src"]);
    }

    #[test]
    fn parses_from_command_line_value() {
        assert_eq!(PrivilegeMethod::from_str("sudo", false).unwrap(), PrivilegeMethod::Sudo);
        assert!(PrivilegeMethod::from_str("su", false).is_err());
    }
}
