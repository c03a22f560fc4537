use std::fmt;

use crate::bitmap::OccupancyBitmap;

/// Symbol printed for a free unit.
pub const FREE_SYMBOL: char = '-';
/// Symbol printed for an occupied unit.
pub const OCCUPIED_SYMBOL: char = 'X';

/// Text view of the whole buffer, one symbol per unit.
///
/// ```text
///   X-X-X   units 1 and 3 free, 0, 2 and 4 occupied
/// ```
pub struct Occupancy<'a> {
  bitmap: &'a OccupancyBitmap,
}

impl<'a> Occupancy<'a> {
  pub(crate) fn new(bitmap: &'a OccupancyBitmap) -> Self {
    Self { bitmap }
  }

  pub fn symbols(&self) -> impl Iterator<Item = char> + '_ {
    (0..self.bitmap.len()).map(|index| {
      if self.bitmap.is_free(index) {
        FREE_SYMBOL
      } else {
        OCCUPIED_SYMBOL
      }
    })
  }
}

impl fmt::Display for Occupancy<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    self.symbols().try_for_each(|symbol| fmt::Write::write_char(f, symbol))
  }
}
