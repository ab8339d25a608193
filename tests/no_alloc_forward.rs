use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use margin_heads::{ArcFaceHeader, LinearHeader, MagFaceHeader, MagFaceParams, Scratch};

struct CountingAlloc {
    allocs: AtomicUsize,
    reallocs: AtomicUsize,
}

impl CountingAlloc {
    const fn new() -> Self {
        Self {
            allocs: AtomicUsize::new(0),
            reallocs: AtomicUsize::new(0),
        }
    }

    fn reset(&self) {
        self.allocs.store(0, Ordering::Relaxed);
        self.reallocs.store(0, Ordering::Relaxed);
    }

    fn alloc_events(&self) -> usize {
        self.allocs.load(Ordering::Relaxed) + self.reallocs.load(Ordering::Relaxed)
    }
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.reallocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static ALLOC: CountingAlloc = CountingAlloc::new();

const IN_FEATURES: usize = 32;
const OUT_FEATURES: usize = 64;
const BATCH: usize = 16;

fn make_inputs() -> (Vec<f32>, Vec<usize>) {
    let features = (0..BATCH * IN_FEATURES)
        .map(|i| ((i % 13) as f32 - 6.0) * 0.1)
        .collect();
    let labels = (0..BATCH).map(|i| (i * 7) % OUT_FEATURES).collect();
    (features, labels)
}

#[test]
fn forward_into_does_not_allocate_after_warmup() {
    if cfg!(feature = "matrixmultiply") {
        // The `matrixmultiply` backend may allocate internal scratch buffers.
        // This test focuses on the crate's own forward-pass behavior.
        return;
    }

    let linear = LinearHeader::new_with_seed(IN_FEATURES, OUT_FEATURES, 0).unwrap();
    let mut arcface = ArcFaceHeader::new_with_seed(IN_FEATURES, OUT_FEATURES, 64.0, 0.5, 0).unwrap();
    let mut magface =
        MagFaceHeader::new_with_seed(IN_FEATURES, OUT_FEATURES, MagFaceParams::default(), 0)
            .unwrap();

    let (features, labels) = make_inputs();
    let mut scratch = Scratch::new();
    let mut out = vec![0.0_f32; BATCH * OUT_FEATURES];

    // Warm up so `scratch` has grown to this batch size.
    linear.forward_into(&features, &labels, &mut out);
    arcface.forward_into(&features, &labels, &mut scratch, &mut out);
    magface.forward_into(&features, &labels, &mut scratch, &mut out);

    ALLOC.reset();
    for _ in 0..8 {
        linear.forward_into(&features, &labels, &mut out);
        arcface.forward_into(&features, &labels, &mut scratch, &mut out);
        magface.forward_into(&features, &labels, &mut scratch, &mut out);
    }

    assert_eq!(
        ALLOC.alloc_events(),
        0,
        "expected the warmed-up hot path to be allocation-free"
    );
}
