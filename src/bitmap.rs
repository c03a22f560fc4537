use crate::bitmap_len;

/// One bit per unit of the managed buffer, in index order.
///
/// ```text
///   unit:    0 1 2 3 4 5 6 7 | 8 9 ...
///   byte:    ------ 0 ------ | -- 1 --
///   bit:     0 1 2 3 4 5 6 7 | 0 1 ...
/// ```
///
/// A clear bit is a free unit, a set bit an occupied one. The count of free
/// units is kept next to the bits and only moves when a bit actually flips,
/// so it always equals the number of clear bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyBitmap {
  bits: Vec<u8>,
  len: usize,
  available: usize,
}

impl OccupancyBitmap {
  pub fn new(len: usize) -> Self {
    Self {
      bits: vec![0; bitmap_len!(len)],
      len,
      available: len,
    }
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn available(&self) -> usize {
    self.available
  }

  pub fn occupied(&self) -> usize {
    self.len - self.available
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.bits
  }

  fn locate(
    &self,
    index: usize,
  ) -> (usize, u8) {
    assert!(
      index < self.len,
      "unit index {index} out of range for buffer of {} units",
      self.len
    );
    (index / 8, 1 << (index % 8))
  }

  /// # Panics
  ///
  /// Panics if `index` is not below [`len`](Self::len).
  pub fn is_free(
    &self,
    index: usize,
  ) -> bool {
    let (byte, mask) = self.locate(index);
    self.bits[byte] & mask == 0
  }

  /// Marks `index` occupied. Returns `false` if it already was.
  pub fn set_occupied(
    &mut self,
    index: usize,
  ) -> bool {
    let (byte, mask) = self.locate(index);
    if self.bits[byte] & mask != 0 {
      return false;
    }
    self.bits[byte] |= mask;
    self.available -= 1;
    true
  }

  /// Marks `index` free. Returns `false` if it already was.
  pub fn set_free(
    &mut self,
    index: usize,
  ) -> bool {
    let (byte, mask) = self.locate(index);
    if self.bits[byte] & mask == 0 {
      return false;
    }
    self.bits[byte] &= !mask;
    self.available += 1;
    true
  }

  /// Occupies `count` units from `start`, returning how many flipped.
  pub fn occupy_range(
    &mut self,
    start: usize,
    count: usize,
  ) -> usize {
    (start..start + count).filter(|&index| self.set_occupied(index)).count()
  }

  /// Frees `count` units from `start`, returning how many flipped.
  pub fn release_range(
    &mut self,
    start: usize,
    count: usize,
  ) -> usize {
    (start..start + count).filter(|&index| self.set_free(index)).count()
  }

  /// Length of the free run beginning at `start`, stopping at the first
  /// occupied unit, the end of the buffer, or after `limit` units.
  pub fn free_run_len(
    &self,
    start: usize,
    limit: usize,
  ) -> usize {
    (start..self.len)
      .take(limit)
      .take_while(|&index| self.is_free(index))
      .count()
  }

  /// First free unit at or after `from`, wrapping past the end to 0.
  pub fn next_free(
    &self,
    from: usize,
  ) -> Option<usize> {
    if self.available == 0 {
      return None;
    }
    (0..self.len)
      .map(|step| (from + step) % self.len)
      .find(|&index| self.is_free(index))
  }

  pub(crate) fn count_set_bits(&self) -> usize {
    self.bits.iter().map(|byte| byte.count_ones() as usize).sum()
  }
}
