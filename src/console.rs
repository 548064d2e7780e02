use std::{
    fmt::Display,
    io::{self, Stdout, Write},
};

/// Where the human readable output of a run goes. This is the output of the
/// program, diagnostics go through `tracing` instead.
pub struct Console<W: Write> {
    out: W,
}

impl Console<Stdout> {
    pub fn stdout() -> Console<Stdout> {
        Console { out: io::stdout() }
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Console<W> {
        Console { out }
    }

    pub fn line(&mut self, msg: impl Display) {
        // A closed stdout shouldn't stop invitations from being accepted
        if let Err(e) = writeln!(self.out, "{}", msg) {
            tracing::debug!("failed to write to the console: {}", e);
        }
    }

    pub fn blank(&mut self) {
        self.line("");
    }
}

impl Console<Vec<u8>> {
    pub fn buffered() -> Console<Vec<u8>> {
        Console::new(Vec::new())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }
}
