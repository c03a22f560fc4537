use std::fmt;

use log::{debug, trace, warn};

use crate::{
  bitmap::OccupancyBitmap,
  error::{AllocError, Result},
  occupancy::Occupancy,
  span::{Allocation, Span},
};

/// Next-fit allocator over a fixed, caller-owned buffer.
///
/// The buffer is borrowed for the allocator's whole life and is never grown,
/// moved or touched by the allocator itself: it only hands out [`Span`]s,
/// offsets into the buffer, and tracks which units they cover.
///
/// Placement is next-fit with wraparound. Each scan starts at the cursor left
/// by the previous allocation and stitches together as many free runs as it
/// needs, wrapping from the last unit back to the first. Compared to
/// first-fit from zero this spreads allocations across the whole buffer and
/// keeps repeated calls cheap, at the cost of more fragmentation than a
/// best-fit search. Best-fit, worst-fit, segregated free lists or a buddy
/// scheme would slot in behind the same `allocate`/`free` surface.
pub struct NextFitAllocator<'buf> {
  buffer: &'buf mut [u8],
  bitmap: OccupancyBitmap,
  cursor: usize,
}

impl<'buf> NextFitAllocator<'buf> {
  pub fn new(buffer: &'buf mut [u8]) -> Self {
    let bitmap = OccupancyBitmap::new(buffer.len());

    Self {
      buffer,
      bitmap,
      cursor: 0,
    }
  }

  /// Number of units in the managed buffer.
  pub fn len(&self) -> usize {
    self.bitmap.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bitmap.is_empty()
  }

  pub fn available(&self) -> usize {
    self.bitmap.available()
  }

  pub fn occupied(&self) -> usize {
    self.bitmap.occupied()
  }

  /// Where the next allocation scan starts.
  pub fn cursor(&self) -> usize {
    self.cursor
  }

  pub fn bitmap(&self) -> &OccupancyBitmap {
    &self.bitmap
  }

  /// # Panics
  ///
  /// Panics if `index` is not below [`len`](Self::len).
  pub fn is_free(
    &self,
    index: usize,
  ) -> bool {
    self.bitmap.is_free(index)
  }

  /// Reserves `size` units, split over as many spans as fragmentation
  /// requires.
  ///
  /// Fails with [`AllocError::OutOfMemory`] when no unit is free and with
  /// [`AllocError::InsufficientMemory`] when fewer than `size` are. Both
  /// failures leave the allocator untouched. A `size` of 0 succeeds with an
  /// empty allocation unless the buffer is full.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Allocation> {
    let available = self.bitmap.available();

    if available == 0 {
      debug!("allocate({size}): out of memory");
      return Err(AllocError::OutOfMemory { requested: size });
    }

    if size > available {
      debug!("allocate({size}): only {available} units free");
      return Err(AllocError::InsufficientMemory {
        requested: size,
        available,
      });
    }

    let mut spans = Vec::new();
    let mut granted = 0;
    let mut index = self.cursor;

    while granted < size {
      let Some(start) = self.bitmap.next_free(index) else {
        break;
      };

      let run = self.bitmap.free_run_len(start, size - granted);
      self.bitmap.occupy_range(start, run);
      granted += run;

      let span = Span::new(start, run);
      trace!("allocate({size}): granted {span}");
      spans.push(span);

      index = start + run;
      if index == self.len() {
        index = 0;
      }
    }

    debug_assert_eq!(granted, size);

    if let Some(next) = self.bitmap.next_free(index) {
      self.cursor = next;
    }

    self.check_counter();
    debug!(
      "allocate({size}): {} span(s), {} units left, cursor at {}",
      spans.len(),
      self.available(),
      self.cursor
    );

    Ok(Allocation::new(spans))
  }

  /// Releases every unit covered by `spans`.
  ///
  /// Each span is handled on its own: one outside the buffer is skipped and
  /// counted, the rest are still released. The call then reports
  /// [`AllocError::InvalidMemoryLocations`] even though it partly took
  /// effect. Releasing a unit that is already free is a no-op.
  ///
  /// When the buffer was full before the call, every span was valid and at
  /// least one was given, the cursor moves to the first span's start so the
  /// next scan begins in the region just released.
  pub fn free(
    &mut self,
    spans: &[Span],
  ) -> Result<()> {
    let was_full = self.bitmap.available() == 0;
    let mut rejected = 0;
    let mut released = 0;

    for span in spans {
      if !self.contains(span) {
        warn!(
          "free: span {span} lies outside buffer of {} units",
          self.len()
        );
        rejected += 1;
        continue;
      }

      released += self.bitmap.release_range(span.start(), span.len());
    }

    if was_full && rejected == 0 {
      if let Some(first) = spans.first() {
        self.cursor = first.start();
      }
    }

    self.check_counter();
    debug!(
      "free: {} span(s), {released} units released, {rejected} rejected, {} units free",
      spans.len(),
      self.available()
    );

    if rejected > 0 {
      return Err(AllocError::InvalidMemoryLocations { rejected });
    }

    Ok(())
  }

  /// Whether `span` starts inside the buffer and ends at or before its end.
  pub fn contains(
    &self,
    span: &Span,
  ) -> bool {
    span.start() < self.len() && span.end().is_some_and(|end| end <= self.len())
  }

  fn is_granted(
    &self,
    span: &Span,
  ) -> bool {
    self.contains(span)
      && (span.start()..span.start() + span.len()).all(|index| !self.bitmap.is_free(index))
  }

  /// The buffer bytes behind a currently occupied span.
  pub fn span(
    &self,
    span: &Span,
  ) -> Option<&[u8]> {
    let range = span.range()?;
    self.is_granted(span).then(|| &self.buffer[range])
  }

  /// Mutable access to the buffer bytes behind a currently occupied span.
  pub fn span_mut(
    &mut self,
    span: &Span,
  ) -> Option<&mut [u8]> {
    let range = span.range()?;
    if !self.is_granted(span) {
      return None;
    }
    Some(&mut self.buffer[range])
  }

  /// Maximal free runs in index order.
  pub fn free_spans(&self) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut index = 0;

    while index < self.len() {
      let run = self.bitmap.free_run_len(index, usize::MAX);
      if run == 0 {
        index += 1;
        continue;
      }
      spans.push(Span::new(index, run));
      index += run;
    }

    spans
  }

  /// The longest free run, the earliest one on ties.
  pub fn largest_free_span(&self) -> Option<Span> {
    self
      .free_spans()
      .into_iter()
      .reduce(|best, span| if span.len() > best.len() { span } else { best })
  }

  pub fn occupancy(&self) -> Occupancy<'_> {
    Occupancy::new(&self.bitmap)
  }

  pub fn render_occupancy(&self) -> String {
    self.occupancy().to_string()
  }

  fn check_counter(&self) {
    debug_assert_eq!(self.bitmap.count_set_bits(), self.bitmap.occupied());
  }
}

impl fmt::Debug for NextFitAllocator<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("NextFitAllocator")
      .field("len", &self.len())
      .field("available", &self.available())
      .field("cursor", &self.cursor)
      .field("occupancy", &self.render_occupancy())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BUFFER_SIZE: usize = 50;

  fn occupied_units(allocator: &NextFitAllocator) -> Vec<usize> {
    (0..allocator.len())
      .filter(|&index| !allocator.is_free(index))
      .collect()
  }

  fn block_sum(allocation: &Allocation) -> usize {
    for span in allocation {
      assert!(span.len() > 0, "zero-length span {span} in {allocation:?}");
    }
    allocation.total_len()
  }

  #[test]
  fn test_nothing_is_occupied() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let allocator = NextFitAllocator::new(&mut buffer);

    assert!(occupied_units(&allocator).is_empty());
    assert_eq!(allocator.available(), BUFFER_SIZE);
    assert_eq!(allocator.bitmap().as_bytes().len(), 7);
    assert_eq!(allocator.cursor(), 0);
  }

  #[test]
  fn test_cannot_alloc_out_of_memory() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.bitmap.occupy_range(0, 50);

    assert_eq!(
      allocator.allocate(10),
      Err(AllocError::OutOfMemory { requested: 10 })
    );
    assert_eq!(allocator.available(), 0);
  }

  #[test]
  fn test_cannot_meet_alloc_request() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.bitmap.occupy_range(10, 40);

    assert_eq!(
      allocator.allocate(11),
      Err(AllocError::InsufficientMemory {
        requested: 11,
        available: 10
      })
    );
    assert_eq!(allocator.available(), 10);
    assert_eq!(occupied_units(&allocator), (10..50).collect::<Vec<_>>());
  }

  #[test]
  fn test_alloc_continuous() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.bitmap.occupy_range(10, 10);
    allocator.bitmap.occupy_range(30, 10);

    let allocation = allocator.allocate(5).unwrap();

    assert_eq!(allocation.spans(), &[Span::new(0, 5)]);
    assert_eq!(block_sum(&allocation), 5);
    assert_eq!(
      occupied_units(&allocator),
      (0..5).chain(10..20).chain(30..40).collect::<Vec<_>>()
    );
    assert_eq!(allocator.available(), 25);
    assert_eq!(allocator.cursor(), 5);
  }

  #[test]
  fn test_alloc_discontinuous() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.bitmap.occupy_range(10, 10);
    allocator.bitmap.occupy_range(30, 10);

    let allocation = allocator.allocate(20).unwrap();

    assert_eq!(allocation.spans(), &[Span::new(0, 10), Span::new(20, 10)]);
    assert_eq!(block_sum(&allocation), 20);
    assert_eq!(occupied_units(&allocator), (0..40).collect::<Vec<_>>());
    assert_eq!(allocator.available(), 10);
    assert_eq!(allocator.cursor(), 40);
  }

  #[test]
  fn test_alloc_discontinuous_with_wraparound() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.bitmap.occupy_range(10, 10);
    allocator.bitmap.occupy_range(30, 10);
    allocator.cursor = 25;

    let allocation = allocator.allocate(20).unwrap();

    assert_eq!(
      allocation.spans(),
      &[Span::new(25, 5), Span::new(40, 10), Span::new(0, 5)]
    );
    assert_eq!(block_sum(&allocation), 20);
    assert_eq!(
      occupied_units(&allocator),
      (0..5).chain(10..20).chain(25..50).collect::<Vec<_>>()
    );
    assert_eq!(allocator.available(), 10);
    assert_eq!(allocator.cursor(), 5);
  }

  #[test]
  fn test_alloc_skips_occupied_cursor() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.bitmap.occupy_range(0, 20);
    allocator.cursor = 3;

    let allocation = allocator.allocate(4).unwrap();

    assert_eq!(allocation.spans(), &[Span::new(20, 4)]);
    assert_eq!(allocator.cursor(), 24);
  }

  #[test]
  fn test_free_invalid_locations() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);

    for span in [Span::new(50, 2), Span::new(usize::MAX, 1), Span::new(40, 11)] {
      assert_eq!(
        allocator.free(&[span]),
        Err(AllocError::InvalidMemoryLocations { rejected: 1 })
      );
    }
    assert_eq!(allocator.available(), BUFFER_SIZE);
  }

  #[test]
  fn test_free_already_free_locations() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);

    assert_eq!(allocator.free(&[Span::new(0, 5)]), Ok(()));
    assert!(occupied_units(&allocator).is_empty());
    assert_eq!(allocator.available(), BUFFER_SIZE);
  }

  #[test]
  fn test_free_the_alloc() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.bitmap.occupy_range(10, 10);
    allocator.bitmap.occupy_range(30, 10);

    let allocation = allocator.allocate(5).unwrap();

    assert_eq!(allocator.free(&allocation), Ok(()));
    assert_eq!(
      occupied_units(&allocator),
      (10..20).chain(30..40).collect::<Vec<_>>()
    );
    assert_eq!(allocator.available(), 30);
    assert_eq!(allocator.cursor(), 5);
  }

  #[test]
  fn test_free_discontinuous() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.bitmap.occupy_range(10, 10);
    allocator.bitmap.occupy_range(30, 10);

    assert_eq!(
      allocator.free(&[Span::new(18, 14), Span::new(36, 2)]),
      Ok(())
    );
    assert_eq!(
      occupied_units(&allocator),
      (10..18).chain(32..36).chain(38..40).collect::<Vec<_>>()
    );
    assert_eq!(allocator.available(), 36);
  }

  #[test]
  fn test_alloc_then_free_some() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);

    allocator.allocate(30).unwrap();

    assert_eq!(allocator.free(&[Span::new(7, 5), Span::new(19, 5)]), Ok(()));
    assert_eq!(
      occupied_units(&allocator),
      (0..7).chain(12..19).chain(24..30).collect::<Vec<_>>()
    );
    assert_eq!(allocator.available(), 30);
    assert_eq!(allocator.cursor(), 30);
  }

  #[test]
  fn test_alloc_it_all_then_give_some_back() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);

    allocator.allocate(50).unwrap();
    assert_eq!(
      allocator.allocate(1),
      Err(AllocError::OutOfMemory { requested: 1 })
    );

    assert_eq!(
      allocator.free(&[Span::new(10, 15), Span::new(30, 5)]),
      Ok(())
    );
    assert_eq!(
      occupied_units(&allocator),
      (0..10).chain(25..30).chain(35..50).collect::<Vec<_>>()
    );
    assert_eq!(allocator.available(), 20);
    assert_eq!(allocator.cursor(), 10);
  }

  #[test]
  fn test_alloc_after_free_discontinuous() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);

    allocator.allocate(50).unwrap();
    assert_eq!(
      allocator.free(&[Span::new(10, 10), Span::new(30, 10)]),
      Ok(())
    );

    let allocation = allocator.allocate(15).unwrap();

    assert_eq!(allocation.spans(), &[Span::new(10, 10), Span::new(30, 5)]);
    assert_eq!(block_sum(&allocation), 15);
    assert_eq!(
      occupied_units(&allocator),
      (0..35).chain(40..50).collect::<Vec<_>>()
    );
    assert_eq!(allocator.available(), 5);
    assert_eq!(allocator.cursor(), 35);

    assert_eq!(
      allocator.allocate(7),
      Err(AllocError::InsufficientMemory {
        requested: 7,
        available: 5
      })
    );

    allocator.allocate(2).unwrap();
    assert_eq!(allocator.available(), 3);
    assert_eq!(allocator.cursor(), 37);
  }

  #[test]
  fn test_free_when_full_with_invalid_span_keeps_cursor() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.bitmap.occupy_range(0, 50);
    allocator.cursor = 7;

    assert_eq!(
      allocator.free(&[Span::new(20, 5), Span::new(48, 5)]),
      Err(AllocError::InvalidMemoryLocations { rejected: 1 })
    );
    assert_eq!(allocator.available(), 5);
    assert_eq!(allocator.cursor(), 7);
  }

  #[test]
  fn test_free_when_not_full_keeps_cursor() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.allocate(20).unwrap();

    assert_eq!(allocator.free(&[Span::new(5, 5)]), Ok(()));
    assert_eq!(allocator.cursor(), 20);
  }

  #[test]
  fn test_allocate_zero() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);

    let allocation = allocator.allocate(0).unwrap();

    assert!(allocation.is_empty());
    assert_eq!(allocator.available(), BUFFER_SIZE);
    assert_eq!(allocator.cursor(), 0);

    allocator.bitmap.occupy_range(0, 50);
    assert_eq!(
      allocator.allocate(0),
      Err(AllocError::OutOfMemory { requested: 0 })
    );
  }

  #[test]
  fn test_empty_buffer() {
    let mut buffer = [0u8; 0];
    let mut allocator = NextFitAllocator::new(&mut buffer);

    assert!(allocator.is_empty());
    assert_eq!(allocator.render_occupancy(), "");
    assert_eq!(
      allocator.allocate(1),
      Err(AllocError::OutOfMemory { requested: 1 })
    );
    assert_eq!(
      allocator.free(&[Span::new(0, 0)]),
      Err(AllocError::InvalidMemoryLocations { rejected: 1 })
    );
    assert_eq!(allocator.free(&[]), Ok(()));
  }

  #[test]
  fn test_free_spans() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.bitmap.occupy_range(10, 10);
    allocator.bitmap.occupy_range(30, 10);
    allocator.bitmap.occupy_range(45, 1);

    assert_eq!(
      allocator.free_spans(),
      vec![
        Span::new(0, 10),
        Span::new(20, 10),
        Span::new(40, 5),
        Span::new(46, 4),
      ]
    );
    assert_eq!(allocator.largest_free_span(), Some(Span::new(0, 10)));

    allocator.bitmap.occupy_range(0, 50);
    assert!(allocator.free_spans().is_empty());
    assert_eq!(allocator.largest_free_span(), None);
  }

  #[test]
  fn test_span_access() {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut allocator = NextFitAllocator::new(&mut buffer);

    let allocation = allocator.allocate(4).unwrap();
    let span = allocation[0];

    allocator.span_mut(&span).unwrap().copy_from_slice(b"abcd");
    assert_eq!(allocator.span(&span), Some(&b"abcd"[..]));

    assert_eq!(allocator.span(&Span::new(2, 4)), None);
    assert_eq!(allocator.span(&Span::new(48, 4)), None);

    allocator.free(&allocation).unwrap();
    assert_eq!(allocator.span_mut(&span), None);
  }

  #[test]
  fn test_debug_output() {
    let mut buffer = [0u8; 5];
    let mut allocator = NextFitAllocator::new(&mut buffer);
    allocator.allocate(2).unwrap();

    assert_eq!(
      format!("{allocator:?}"),
      "NextFitAllocator { len: 5, available: 3, cursor: 2, occupancy: \"XX---\" }"
    );
  }
}
