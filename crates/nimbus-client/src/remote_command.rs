use std::fmt;

pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[derive(Debug, Clone)]
struct Part {
    text: String,
    secret: bool,
}

/// A shell command line for the control node. Arguments are quoted; parts
/// marked secret are masked when the command is displayed or logged.
#[derive(Debug, Clone)]
pub struct RemoteCommand {
    parts: Vec<Part>,
}

impl RemoteCommand {
    pub fn new(program: &str) -> Self {
        Self {
            parts: vec![Part {
                text: program.to_string(),
                secret: false,
            }],
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.parts.push(Part {
            text: shell_quote(arg),
            secret: false,
        });
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self = self.arg(arg.as_ref());
        }
        self
    }

    pub fn secret_arg(mut self, arg: &str) -> Self {
        self.parts.push(Part {
            text: shell_quote(arg),
            secret: true,
        });
        self
    }

    fn append_raw(mut self, s: &str) -> Self {
        self.parts.push(Part {
            text: s.to_string(),
            secret: false,
        });
        self
    }

    pub fn and(self, other: RemoteCommand) -> Self {
        self.append_raw("&&").merge(other)
    }

    fn merge(mut self, other: RemoteCommand) -> Self {
        self.parts.extend(other.parts);
        self
    }

    pub fn to_shell_string(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Vec<&str> = self
            .parts
            .iter()
            .map(|p| if p.secret { "'***'" } else { p.text.as_str() })
            .collect();
        write!(f, "{}", shown.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_command() {
        let cmd = RemoteCommand::new("qconf").arg("-sp").arg("orte");
        assert_eq!(cmd.to_shell_string(), "qconf '-sp' 'orte'");
    }

    #[test]
    fn test_args_are_quoted_in_order() {
        let cmd = RemoteCommand::new("python")
            .arg("helper.py")
            .args(["--dir", "j1/x", "--folder", "123"]);
        assert_eq!(
            cmd.to_shell_string(),
            "python 'helper.py' '--dir' 'j1/x' '--folder' '123'"
        );
    }

    #[test]
    fn test_quoting() {
        let cmd = RemoteCommand::new("echo").arg("hello world").arg("it's me");
        assert_eq!(cmd.to_shell_string(), "echo 'hello world' 'it'\\''s me'");
    }

    #[test]
    fn test_chaining() {
        let cmd = RemoteCommand::new("cd")
            .arg("job/dir")
            .and(RemoteCommand::new("qsub").arg("./run.sh"));
        assert_eq!(cmd.to_shell_string(), "cd 'job/dir' && qsub './run.sh'");
    }

    #[test]
    fn test_secret_is_masked_in_display_only() {
        let cmd = RemoteCommand::new("python")
            .arg("upload.py")
            .arg("--token")
            .secret_arg("abc");
        assert_eq!(cmd.to_string(), "python 'upload.py' '--token' '***'");
        assert_eq!(cmd.to_shell_string(), "python 'upload.py' '--token' 'abc'");
    }
}
