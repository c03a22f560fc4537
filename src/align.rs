/// Calculates how many bitmap bytes are needed to hold one bit per unit,
/// rounding a partial trailing byte up to a whole one.
///
/// # Examples
///
/// ```rust
/// use spanalloc::bitmap_len;
///
/// assert_eq!(bitmap_len!(0), 0);
/// assert_eq!(bitmap_len!(8), 1);
/// assert_eq!(bitmap_len!(50), 7);
/// ```
#[macro_export]
macro_rules! bitmap_len {
  ($units:expr) => {
    ($units as usize).div_ceil(u8::BITS as usize)
  };
}
