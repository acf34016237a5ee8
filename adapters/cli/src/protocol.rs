//! Blocking line I/O for the game protocol.
//!
//! The engine speaks newline-delimited text over stdin/stdout: an init
//! handshake (player id, dimensions, production grid, initial frame), then
//! one frame line per turn answered with one move line. Parsing is pure and
//! lives in the world crate; this module only moves lines.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use fieldbot_core::{MoveSet, OwnerId};
use fieldbot_world::{frame, GameMap};

/// Static game parameters received during the init handshake.
pub(crate) struct Handshake {
    /// Our player id for the whole game.
    pub(crate) my_id: OwnerId,
    /// Grid width in cells.
    pub(crate) width: u16,
    /// Grid height in cells.
    pub(crate) height: u16,
    /// Row-major production grid, constant for the whole game.
    pub(crate) production: Vec<u8>,
}

/// Buffered connection to the game engine.
pub(crate) struct GameConnection<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> GameConnection<R, W> {
    pub(crate) fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context("reading protocol line")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn expect_line(&mut self, what: &str) -> Result<String> {
        self.read_line()?
            .with_context(|| format!("connection closed before {what}"))
    }

    /// Reads the init handshake.
    ///
    /// The engine sends an initial frame as part of init and a fresh one
    /// after the name announcement, so the init frame is consumed and
    /// discarded here.
    pub(crate) fn handshake(&mut self) -> Result<Handshake> {
        let my_id = frame::parse_player_id(&self.expect_line("player id")?)?;
        let (width, height) = frame::parse_dimensions(&self.expect_line("grid dimensions")?)?;
        let production = frame::parse_production(&self.expect_line("production grid")?, width, height)?;
        let _ = frame::parse_frame(&self.expect_line("initial frame")?, width, height, &production)?;
        Ok(Handshake {
            my_id,
            width,
            height,
            production,
        })
    }

    /// Announces the bot name, ending the init handshake.
    pub(crate) fn announce(&mut self, name: &str) -> Result<()> {
        writeln!(self.writer, "{name}").context("announcing bot name")?;
        self.writer.flush().context("flushing announcement")
    }

    /// Reads the next turn's frame; `None` once the engine hangs up.
    pub(crate) fn next_frame(
        &mut self,
        width: u16,
        height: u16,
        production: &[u8],
    ) -> Result<Option<GameMap>> {
        match self.read_line()? {
            Some(line) => Ok(Some(frame::parse_frame(&line, width, height, production)?)),
            None => Ok(None),
        }
    }

    /// Submits the turn's moves as `x y code` triples on a single line.
    pub(crate) fn submit(&mut self, moves: &MoveSet) -> Result<()> {
        let mut line = String::new();
        for decided in moves.iter() {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&format!(
                "{} {} {}",
                decided.cell.x(),
                decided.cell.y(),
                decided.direction.wire_code()
            ));
        }
        writeln!(self.writer, "{line}").context("submitting moves")?;
        self.writer.flush().context("flushing move submission")
    }
}
