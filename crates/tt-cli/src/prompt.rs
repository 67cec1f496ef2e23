//! Yes/no confirmations and interactive conflict resolution.

use std::io::{self, BufRead, Write};

use tt_core::{Conflict, ConflictKind, Decision, Frame, Resolver};

use crate::commands::util::{format_tags, local_datetime};

/// Asks a yes/no question. Anything but `y`/`yes` means no, and so does end
/// of input.
pub fn confirm<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, question: &str) -> io::Result<bool> {
    write!(writer, "{question} [y/N] ")?;
    writer.flush()?;
    let mut answer = String::new();
    reader.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Asks on the terminal how to settle each merge conflict.
///
/// The [`Resolver`] interface cannot fail, so the first IO error is kept and
/// every later conflict keeps the local frame. Check [`Self::finish`] after
/// the merge.
pub struct InteractiveResolver<R, W> {
    reader: R,
    writer: W,
    error: Option<io::Error>,
}

impl<R: BufRead, W: Write> InteractiveResolver<R, W> {
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            error: None,
        }
    }

    /// Returns the IO error that interrupted the prompts, if any.
    pub fn finish(self) -> io::Result<()> {
        self.error.map_or(Ok(()), Err)
    }

    fn ask(&mut self, conflict: &Conflict) -> io::Result<Decision> {
        let heading = match conflict.kind {
            ConflictKind::Diverged => format!("Frame {} was edited on both sides:", conflict.local.id.short()),
            ConflictKind::Overlap => "Incoming frame overlaps a local one:".to_string(),
        };
        writeln!(self.writer, "{heading}")?;
        writeln!(self.writer, "  local:    {}", describe(&conflict.local))?;
        writeln!(self.writer, "  incoming: {}", describe(&conflict.incoming))?;

        loop {
            write!(self.writer, "Keep [L]ocal, [r]emote or [b]oth? ")?;
            self.writer.flush()?;
            let mut answer = String::new();
            if self.reader.read_line(&mut answer)? == 0 {
                return Ok(Decision::KeepLocal);
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "" | "l" | "local" => return Ok(Decision::KeepLocal),
                "r" | "remote" => return Ok(Decision::KeepIncoming),
                "b" | "both" => return Ok(Decision::KeepBoth),
                other => writeln!(self.writer, "Unknown answer: {other}")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Resolver for InteractiveResolver<R, W> {
    fn resolve(&mut self, conflict: &Conflict) -> Decision {
        if self.error.is_some() {
            return Decision::KeepLocal;
        }
        match self.ask(conflict) {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(error = %err, "conflict prompt failed, keeping local frame");
                self.error = Some(err);
                Decision::KeepLocal
            }
        }
    }
}

fn describe(frame: &Frame) -> String {
    let stop = frame.stop.map_or_else(|| "now".to_string(), local_datetime);
    format!(
        "{} {}{} from {} to {}",
        frame.id.short(),
        frame.project,
        format_tags(&frame.tags),
        local_datetime(frame.start),
        stop
    )
}
