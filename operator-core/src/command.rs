//! Subprocess argument vectors.

use std::fmt;

/// Program name of the build-service command-line client.
pub const OSC_PROGRAM: &str = "osc";

/// One subprocess invocation: program name followed by its arguments.
///
/// Tokens are passed to the process as-is; nothing here is ever joined and
/// re-split by a shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    argv: Vec<String>,
}

impl Command {
    /// Starts an `osc` invocation with the given leading arguments.
    pub fn osc<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec![OSC_PROGRAM.to_owned()];
        argv.extend(args.into_iter().map(Into::into));
        Self { argv }
    }

    #[must_use]
    pub fn from_argv(argv: Vec<String>) -> Self {
        Self { argv }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends `flag` only when `enabled`.
    pub fn flag_if(&mut self, enabled: bool, flag: &str) -> &mut Self {
        if enabled {
            self.argv.push(flag.to_owned());
        }
        self
    }

    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Everything after the program name.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

/// Space-joined argv, used for the `$ ...` echo lines. Not shell-quoted.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

/// Ordered, lazily produced commands for one POST request.
///
/// The executor pulls commands one at a time and stops pulling at the first
/// failure, so later commands are never built.
pub struct CommandBatch {
    commands: Box<dyn Iterator<Item = Command> + Send>,
}

impl CommandBatch {
    #[must_use]
    pub fn single(command: Command) -> Self {
        Self::lazy(std::iter::once(command))
    }

    pub fn lazy<I>(commands: I) -> Self
    where
        I: IntoIterator<Item = Command>,
        I::IntoIter: Send + 'static,
    {
        Self { commands: Box::new(commands.into_iter()) }
    }
}

impl Iterator for CommandBatch {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        self.commands.next()
    }
}

impl fmt::Debug for CommandBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBatch").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osc_command_starts_with_program() {
        let mut cmd = Command::osc(["origin", "projects"]);
        cmd.flag_if(false, "--debug").flag_if(true, "--force-refresh");
        assert_eq!(cmd.program(), Some("osc"));
        assert_eq!(cmd.arguments(), ["origin", "projects", "--force-refresh"]);
        assert_eq!(cmd.to_string(), "osc origin projects --force-refresh");
    }

    #[test]
    fn batch_is_pulled_lazily() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut batch = CommandBatch::lazy((0..3).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            Command::osc([i.to_string()])
        }));

        assert_eq!(built.load(Ordering::SeqCst), 0, "nothing built before first pull");
        let first = batch.next();
        assert_eq!(first.as_ref().map(ToString::to_string).as_deref(), Some("osc 0"));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }
}
