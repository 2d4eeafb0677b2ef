//! Line input for a session: capped, lossy line reading and lazily opened sources.
//!
//! Bytes are read up to the configured cap per line and decoded lossily, so a
//! stray non-UTF-8 byte degrades one line instead of ending the source, and an
//! unterminated multi-gigabyte line never sits in memory whole.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;

/// One input line, already cut to the configured cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
  pub text: String,
  /// Bytes past the cap were dropped.
  pub truncated: bool,
}

impl From<String> for Line {
  fn from(text: String) -> Self {
    Self { text, truncated: false }
  }
}

impl From<&str> for Line {
  fn from(text: &str) -> Self {
    Self::from(text.to_string())
  }
}

/// An item a source yields: owned text, or the result of a read.
pub trait SourceLine {
  fn into_line(self) -> io::Result<Line>;
}

impl SourceLine for Line {
  fn into_line(self) -> io::Result<Line> {
    Ok(self)
  }
}

impl SourceLine for String {
  fn into_line(self) -> io::Result<Line> {
    Ok(Line::from(self))
  }
}

impl SourceLine for &str {
  fn into_line(self) -> io::Result<Line> {
    Ok(Line::from(self))
  }
}

impl SourceLine for io::Result<Line> {
  fn into_line(self) -> io::Result<Line> {
    self
  }
}

/// A source that is opened only once a worker picks it up.
pub trait OpenSource: Send {
  type Line: SourceLine;
  type Lines: IntoIterator<Item = Self::Line>;

  fn open(self, max_line_bytes: usize) -> io::Result<Self::Lines>;
}

/// In-memory lines; the cap is applied later by the session.
impl<L: SourceLine + Send> OpenSource for Vec<L> {
  type Line = L;
  type Lines = Self;

  fn open(self, _max_line_bytes: usize) -> io::Result<Self> {
    Ok(self)
  }
}

/// Where the binary reads a source from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
  Stdin,
  File(PathBuf),
}

impl OpenSource for Input {
  type Line = io::Result<Line>;
  type Lines = LineReader<Box<dyn BufRead>>;

  fn open(self, max_line_bytes: usize) -> io::Result<Self::Lines> {
    let reader: Box<dyn BufRead> = match self {
      Input::Stdin => Box::new(BufReader::new(io::stdin())),
      Input::File(path) => Box::new(BufReader::new(File::open(path)?)),
    };
    Ok(LineReader::new(reader, max_line_bytes))
  }
}

/// Splits a byte stream into [`Line`]s of at most `max_bytes` bytes each.
///
/// The read buffer never grows past `max_bytes + 1`; the rest of an
/// oversized line is skipped straight out of the reader's own buffer.
pub struct LineReader<R> {
  reader: R,
  max_bytes: usize,
  buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
  pub fn new(reader: R, max_bytes: usize) -> Self {
    Self {
      reader,
      max_bytes: max_bytes.max(1),
      buf: Vec::new(),
    }
  }

  fn read_line(&mut self) -> io::Result<Option<Line>> {
    self.buf.clear();
    let limit = (self.max_bytes as u64).saturating_add(1);
    let n = (&mut self.reader).take(limit).read_until(b'\n', &mut self.buf)?;
    if n == 0 {
      return Ok(None);
    }

    let mut truncated = false;
    if self.buf.last() == Some(&b'\n') {
      self.buf.pop();
    } else if self.buf.len() > self.max_bytes {
      self.buf.truncate(self.max_bytes);
      self.skip_rest_of_line()?;
      truncated = true;
    }
    if self.buf.last() == Some(&b'\r') {
      self.buf.pop();
    }

    Ok(Some(Line {
      text: String::from_utf8_lossy(&self.buf).into_owned(),
      truncated,
    }))
  }

  fn skip_rest_of_line(&mut self) -> io::Result<()> {
    loop {
      let (used, done) = {
        let available = match self.reader.fill_buf() {
          Ok(b) => b,
          Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
          Err(e) => return Err(e),
        };
        match available.iter().position(|&b| b == b'\n') {
          Some(i) => (i + 1, true),
          None => (available.len(), available.is_empty()),
        }
      };
      self.reader.consume(used);
      if done {
        return Ok(());
      }
    }
  }
}

impl<R: BufRead> Iterator for LineReader<R> {
  type Item = io::Result<Line>;

  fn next(&mut self) -> Option<Self::Item> {
    self.read_line().transpose()
  }
}
