use std::{fmt, ops::{Deref, Range}, slice, vec};

/// A contiguous run of units inside the managed buffer.
///
/// Spans are plain offsets, not pointers: they can be copied, compared and
/// stored freely, and every use is validated against the buffer bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
  start: usize,
  len: usize,
}

impl Span {
  pub const fn new(
    start: usize,
    len: usize,
  ) -> Self {
    Self { start, len }
  }

  pub const fn start(&self) -> usize {
    self.start
  }

  pub const fn len(&self) -> usize {
    self.len
  }

  pub const fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// One past the last unit, or `None` if a hand-built span overflows.
  pub const fn end(&self) -> Option<usize> {
    self.start.checked_add(self.len)
  }

  pub fn range(&self) -> Option<Range<usize>> {
    self.end().map(|end| self.start..end)
  }
}

impl fmt::Display for Span {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self.end() {
      Some(end) => write!(f, "[{}, {})", self.start, end),
      None => write!(f, "[{}, +{})", self.start, self.len),
    }
  }
}

/// The spans granted by one successful allocation, in the order the scan
/// discovered them. Their lengths always add up to the requested size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
  spans: Vec<Span>,
}

impl Allocation {
  pub(crate) fn new(spans: Vec<Span>) -> Self {
    Self { spans }
  }

  pub fn spans(&self) -> &[Span] {
    &self.spans
  }

  pub fn total_len(&self) -> usize {
    self.spans.iter().map(Span::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.spans.is_empty()
  }

  pub fn into_spans(self) -> Vec<Span> {
    self.spans
  }
}

impl Deref for Allocation {
  type Target = [Span];

  fn deref(&self) -> &Self::Target {
    &self.spans
  }
}

impl IntoIterator for Allocation {
  type Item = Span;
  type IntoIter = vec::IntoIter<Span>;

  fn into_iter(self) -> Self::IntoIter {
    self.spans.into_iter()
  }
}

impl<'a> IntoIterator for &'a Allocation {
  type Item = &'a Span;
  type IntoIter = slice::Iter<'a, Span>;

  fn into_iter(self) -> Self::IntoIter {
    self.spans.iter()
  }
}
