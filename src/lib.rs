//! # spanalloc - A Fixed-Buffer Span Allocator
//!
//! This crate manages allocation and deallocation over a single contiguous
//! buffer that the caller already owns. The buffer is never grown, moved or
//! freed by the allocator. Requests that no single free run can satisfy are
//! served with several non-contiguous **spans**.
//!
//! ## Overview
//!
//! ```text
//!   Occupancy of a 50-unit buffer:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │  0         10        20        30        40        50                │
//!   │  ┌─────────┬─────────┬─────────┬─────────┬─────────┐                 │
//!   │  │  free   │ in use  │  free   │ in use  │  free   │                 │
//!   │  └─────────┴─────────┴─────────┴─────────┴─────────┘                 │
//!   │                           ▲                                          │
//!   │                           │                                          │
//!   │                        Cursor                                        │
//!   │                     (next scan)                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   allocate(20) starting at 25 → [25, 30) [40, 50) [0, 5)
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   spanalloc
//!   ├── align      - bitmap_len! macro (units → bitmap bytes)
//!   ├── bitmap     - OccupancyBitmap, one bit per unit + free counter
//!   ├── error      - AllocError, MemoryStatus
//!   ├── next_fit   - NextFitAllocator implementation
//!   ├── occupancy  - Text rendering of the bitmap
//!   └── span       - Span and Allocation value types
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use spanalloc::{NextFitAllocator, Span};
//!
//! let mut buffer = [0u8; 5];
//! let mut allocator = NextFitAllocator::new(&mut buffer);
//!
//! let all = allocator.allocate(5).unwrap();
//! assert_eq!(allocator.render_occupancy(), "XXXXX");
//!
//! allocator.free(&[Span::new(1, 1), Span::new(3, 1)]).unwrap();
//! assert_eq!(allocator.render_occupancy(), "X-X-X");
//!
//! let two = allocator.allocate(2).unwrap();
//! assert_eq!(two.spans(), &[Span::new(1, 1), Span::new(3, 1)]);
//! assert_eq!(allocator.available(), 0);
//! # let _ = all;
//! ```
//!
//! ## How It Works
//!
//! Occupancy is a packed bitmap, one bit per unit, so the bookkeeping costs
//! ⌈N/8⌉ bytes for an N-unit buffer:
//!
//! ```text
//!   Bitmap (LSB first):
//!
//!   buffer   │ 0 │ 1 │ 2 │ 3 │ 4 │
//!   state    │ X │ - │ X │ - │ X │
//!   bits     │ 1 │ 0 │ 1 │ 0 │ 1 │   → byte 0 = 0b0001_0101
//! ```
//!
//! Allocation is **next-fit with wraparound**:
//!
//! ```text
//!   1. start at the cursor
//!   2. skip occupied units (wrapping N-1 → 0) to the next free unit
//!   3. take the free run from there, up to what is still missing,
//!      stopping at an occupied unit or the buffer end
//!   4. mark the run occupied and record it as a span
//!   5. repeat from the end of the run until the request is met
//!   6. park the cursor on the next free unit
//! ```
//!
//! The request is checked against the free counter before anything moves,
//! so a failed allocation never reserves anything.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no internal locking. Shared use needs one
//!   external lock around every call.
//! - **Unit granularity**: no alignment beyond a single unit.
//! - **No compaction**: fragmented spans are handed out as they are.
//! - **Fixed size**: the buffer never grows or shrinks.

pub mod align;
mod bitmap;
mod error;
mod next_fit;
mod occupancy;
mod span;

pub use bitmap::OccupancyBitmap;
pub use error::{AllocError, MemoryStatus, Result};
pub use next_fit::NextFitAllocator;
pub use occupancy::{FREE_SYMBOL, OCCUPIED_SYMBOL, Occupancy};
pub use span::{Allocation, Span};
