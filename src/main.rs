use std::{process::ExitCode, slice};

use log::{error, info};
use spanalloc::{NextFitAllocator, Span};

const BUFFER_LEN: usize = 5;

/// A zeroed buffer taken from the C heap, standing in for memory the
/// program already owns before any allocator exists.
struct HeapBuffer {
  ptr: *mut u8,
  len: usize,
}

impl HeapBuffer {
  fn calloc(len: usize) -> Option<Self> {
    let ptr = unsafe { libc::calloc(len, 1) } as *mut u8;

    if ptr.is_null() {
      return None;
    }

    Some(Self { ptr, len })
  }

  fn as_mut_slice(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.ptr, self.len) }
  }
}

impl Drop for HeapBuffer {
  fn drop(&mut self) {
    unsafe { libc::free(self.ptr as *mut libc::c_void) };
  }
}

fn print_step(
  label: &str,
  allocator: &NextFitAllocator,
) {
  println!("{label}");
  println!("{}", allocator.occupancy());
}

fn main() -> ExitCode {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  println!("Memory Allocation Program\n");

  let Some(mut heap) = HeapBuffer::calloc(BUFFER_LEN) else {
    error!("could not obtain a {BUFFER_LEN}-byte buffer");
    return ExitCode::from(1);
  };

  let mut allocator = NextFitAllocator::new(heap.as_mut_slice());
  print_step(&format!("Init buffer of {BUFFER_LEN} chars"), &allocator);

  let first = match allocator.allocate(5) {
    Ok(allocation) => allocation,
    Err(err) => {
      print_step("Alloc 5 blocks", &allocator);
      error!("alloc failed: {err}");
      return ExitCode::from(2);
    }
  };
  print_step("Alloc 5 blocks", &allocator);

  // Free the 2nd and 4th unit of the first allocation.
  let base = first[0].start();
  let holes = [Span::new(base + 1, 1), Span::new(base + 3, 1)];
  let freed = allocator.free(&holes);
  print_step("Free 2nd and 4th blocks", &allocator);

  if let Err(err) = freed {
    error!("free failed: {err}");
    return ExitCode::from(3);
  }

  let second = match allocator.allocate(2) {
    Ok(allocation) => allocation,
    Err(err) => {
      print_step("Alloc 2 blocks", &allocator);
      error!("alloc failed: {err}");
      return ExitCode::from(4);
    }
  };
  print_step("Alloc 2 blocks", &allocator);

  for span in &second {
    if let Some(bytes) = allocator.span_mut(span) {
      bytes.fill(b'*');
    }
    info!("granted {span}");
  }

  drop(allocator);
  info!("buffer contents: {:?}", String::from_utf8_lossy(heap.as_mut_slice()));

  ExitCode::SUCCESS
}
