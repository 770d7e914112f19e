//! Stop-the-world mark-sweep collection for the shared heap.
//!
//! ## Protocol
//!
//! Every allocation checks the soft heap limit. The first thread to trip it
//! wins a CAS on `need_gc` and becomes the collector; everyone else parks at
//! the next safepoint. The collector waits until all *other* registered
//! threads are parked, marks from every shadow stack, sweeps, maybe doubles
//! the limit, clears `need_gc`, and wakes the world.
//!
//! ## Object layout
//!
//! Allocations carry an [`ObjectHeader`] `(size, mark, type_tag)`; the
//! pointer handed to compiled code is one header past the base. Mark states
//! move `Unscanned → Incomplete → Marked` within a collection, with a CAS on
//! the first edge so a pointer reached twice is scanned once.
//!
//! ## Conservative scanning
//!
//! The payload of a live object is treated as an array of word-sized
//! candidate pointers. A candidate counts only if it is the payload address
//! of an object in the heap set, so junk words can never corrupt a header or
//! keep memory that was never allocated.
//!
//! ## Shadow stacks
//!
//! Compiled code registers the address of every GC-visible slot
//! (`__gc_register`) and pops on scope exit (`__gc_pop`). Stacks are
//! thread-local and unlocked; the collector reads them only while their
//! owners are parked.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;
use std::alloc::{alloc as heap_alloc, dealloc, Layout};
use std::cell::Cell;
use std::ffi::c_void;
use std::mem::{align_of, size_of};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

const UNSCANNED: u8 = 0;
const INCOMPLETE: u8 = 1;
const MARKED: u8 = 2;

/// Initial soft heap limit; doubles when the live set crowds it.
pub const DEFAULT_HEAP_LIMIT: usize = 1 << 20;

/// Header prefixed to every GC allocation.
#[repr(C)]
pub struct ObjectHeader {
    size: usize,
    mark: AtomicU8,
    type_tag: u32,
}

struct ShadowStack {
    slots: Vec<*mut *mut c_void>,
}

struct GcShared {
    /// Header addresses of every live allocation.
    heap: FxHashSet<usize>,
    /// Raw `*mut ShadowStack` of every registered thread.
    stacks: Vec<usize>,
    /// Threads currently parked at a safepoint.
    safepoints: usize,
    /// Registered mutator threads.
    total_active: usize,
}

static SHARED: Lazy<Mutex<GcShared>> = Lazy::new(|| {
    Mutex::new(GcShared {
        heap: FxHashSet::default(),
        stacks: Vec::new(),
        safepoints: 0,
        total_active: 0,
    })
});
static GC_CV: Condvar = Condvar::new();
static RESUME_CV: Condvar = Condvar::new();
static NEED_GC: AtomicBool = AtomicBool::new(false);
static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static LIMIT: AtomicUsize = AtomicUsize::new(DEFAULT_HEAP_LIMIT);

thread_local! {
    static SHADOW: Cell<*mut ShadowStack> = const { Cell::new(std::ptr::null_mut()) };
}

fn shared_lock() -> MutexGuard<'static, GcShared> {
    SHARED.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn object_layout(size: usize) -> Layout {
    let align = align_of::<ObjectHeader>().max(align_of::<*mut c_void>());
    match Layout::from_size_align(size_of::<ObjectHeader>() + size, align) {
        Ok(layout) => layout,
        Err(_) => oom(size),
    }
}

fn oom(size: usize) -> ! {
    eprintln!("[Runtime Error] Out of memory allocating {} bytes", size);
    std::process::exit(1);
}

/// Registers the calling thread as a mutator. Idempotent.
pub extern "C" fn __gc_create_thread() {
    SHADOW.with(|cell| {
        if !cell.get().is_null() {
            return;
        }
        let stack = Box::into_raw(Box::new(ShadowStack { slots: Vec::new() }));
        cell.set(stack);
        let mut shared = shared_lock();
        shared.stacks.push(stack as usize);
        shared.total_active += 1;
    });
}

/// Deregisters the calling thread and frees its shadow stack.
///
/// Must be called before a registered thread terminates, or collections will
/// wait forever for it to park.
pub extern "C" fn __gc_exit_thread() {
    SHADOW.with(|cell| {
        let stack = cell.get();
        if stack.is_null() {
            return;
        }
        cell.set(std::ptr::null_mut());
        {
            let mut shared = shared_lock();
            shared.stacks.retain(|&addr| addr != stack as usize);
            shared.total_active -= 1;
            // A collector may be waiting for this thread to park.
            GC_CV.notify_one();
        }
        // SAFETY: the pointer came from Box::into_raw in __gc_create_thread
        // and was just unlinked from the global list.
        unsafe { drop(Box::from_raw(stack)) };
    });
}

/// Pushes a root slot address onto the calling thread's shadow stack.
///
/// # Safety
///
/// `slot` must stay valid until the matching `__gc_pop`.
pub unsafe extern "C" fn __gc_register(slot: *mut *mut c_void) {
    __gc_create_thread();
    SHADOW.with(|cell| {
        let stack = cell.get();
        // SAFETY: the stack is owned by this thread; the collector only
        // touches it while this thread is parked.
        unsafe { (*stack).slots.push(slot) };
    });
}

/// Pops `times` root slots from the calling thread's shadow stack.
pub extern "C" fn __gc_pop(times: u32) {
    SHADOW.with(|cell| {
        let stack = cell.get();
        if stack.is_null() {
            return;
        }
        // SAFETY: thread-local stack, see __gc_register.
        unsafe {
            let slots = &mut (*stack).slots;
            for _ in 0..times {
                if slots.pop().is_none() {
                    break;
                }
            }
        }
    });
}

/// Parks the calling thread while a collection is pending.
pub extern "C" fn __gc_safe_point() {
    if !NEED_GC.load(Ordering::Acquire) {
        return;
    }
    let mut shared = shared_lock();
    shared.safepoints += 1;
    GC_CV.notify_one();
    while NEED_GC.load(Ordering::Acquire) {
        shared = RESUME_CV
            .wait(shared)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
    }
    shared.safepoints -= 1;
}

/// Allocates `size` payload bytes with a fresh header.
///
/// Crossing the soft limit arbitrates a collection: the CAS winner collects,
/// losers park. Allocation failure is fatal.
pub extern "C" fn __gc_alloc(size: usize, type_tag: u32) -> *mut c_void {
    if ALLOCATED.load(Ordering::Relaxed) + size > LIMIT.load(Ordering::Relaxed) {
        if NEED_GC
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            collect();
        } else {
            __gc_safe_point();
        }
    }

    let layout = object_layout(size);
    // SAFETY: layout has non-zero size (it includes the header).
    let base = unsafe { heap_alloc(layout) } as *mut ObjectHeader;
    if base.is_null() {
        oom(size);
    }
    // SAFETY: base is freshly allocated and properly aligned for the header.
    unsafe {
        base.write(ObjectHeader {
            size,
            mark: AtomicU8::new(UNSCANNED),
            type_tag,
        });
    }

    let mut shared = shared_lock();
    shared.heap.insert(base as usize);
    ALLOCATED.fetch_add(size, Ordering::Relaxed);
    drop(shared);

    // SAFETY: the payload begins one header past the base.
    unsafe { base.add(1) as *mut c_void }
}

/// Marks everything reachable from `ptr`.
///
/// # Safety
///
/// Must only run while mutators cannot free or resize the heap (the STW
/// window, or single-threaded use).
pub unsafe extern "C" fn __gc_scan(ptr: *mut c_void) {
    let shared = shared_lock();
    scan_with(&shared.heap, ptr);
}

/// Iterative mark with an explicit work stack. Candidates not in the heap
/// set are ignored, so conservative misidentification is harmless.
fn scan_with(heap: &FxHashSet<usize>, ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    let mut work = vec![ptr];
    while let Some(p) = work.pop() {
        let header_addr = (p as usize).wrapping_sub(size_of::<ObjectHeader>());
        if !heap.contains(&header_addr) {
            continue;
        }
        let header = header_addr as *mut ObjectHeader;
        // SAFETY: header_addr is in the heap set, so it is a live header we
        // allocated; the payload holds `size` readable bytes.
        unsafe {
            if (*header)
                .mark
                .compare_exchange(UNSCANNED, INCOMPLETE, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let words = (*header).size / size_of::<*mut c_void>();
                let data = p as *const *mut c_void;
                for i in 0..words {
                    let child = *data.add(i);
                    if !child.is_null() {
                        work.push(child);
                    }
                }
                (*header).mark.store(MARKED, Ordering::Release);
            }
        }
    }
}

/// Runs a full collection from the calling thread.
pub extern "C" fn __gc_collect() {
    NEED_GC.store(true, Ordering::Release);
    collect();
}

fn collect() {
    let mut shared = shared_lock();
    while shared.safepoints != shared.total_active.saturating_sub(1) {
        shared = GC_CV
            .wait(shared)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
    }

    // Mark phase: every slot of every shadow stack is a root.
    let stacks = shared.stacks.clone();
    for stack_addr in stacks {
        let stack = stack_addr as *const ShadowStack;
        // SAFETY: all other mutators are parked; stack owners cannot mutate.
        unsafe {
            for &slot in (*stack).slots.iter() {
                if !slot.is_null() {
                    let target = *slot;
                    scan_with(&shared.heap, target);
                }
            }
        }
    }

    // Sweep phase: free the unreached, reset the survivors.
    let mut freed = 0usize;
    let mut live = 0usize;
    shared.heap.retain(|&addr| {
        let header = addr as *mut ObjectHeader;
        // SAFETY: every address in the heap set is a header we allocated.
        unsafe {
            if (*header).mark.load(Ordering::Acquire) == UNSCANNED {
                let size = (*header).size;
                freed += size;
                dealloc(header as *mut u8, object_layout(size));
                false
            } else {
                (*header).mark.store(UNSCANNED, Ordering::Release);
                live += (*header).size;
                true
            }
        }
    });
    ALLOCATED.fetch_sub(freed, Ordering::Relaxed);

    let limit = LIMIT.load(Ordering::Relaxed);
    if live * 10 > limit * 7 {
        LIMIT.store(limit * 2, Ordering::Relaxed);
    }
    log::debug!(
        "gc: freed {} bytes, {} bytes live, limit {}",
        freed,
        live,
        LIMIT.load(Ordering::Relaxed)
    );

    NEED_GC.store(false, Ordering::Release);
    RESUME_CV.notify_all();
}

/// Frees every remaining heap object. Runs at process shutdown.
pub fn shutdown() {
    let mut shared = shared_lock();
    for &addr in shared.heap.iter() {
        let header = addr as *mut ObjectHeader;
        // SAFETY: heap set addresses are live headers.
        unsafe {
            let size = (*header).size;
            dealloc(header as *mut u8, object_layout(size));
        }
    }
    shared.heap.clear();
    ALLOCATED.store(0, Ordering::Relaxed);
}

/// Point-in-time heap counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub allocated: usize,
    pub limit: usize,
    pub objects: usize,
}

pub fn heap_stats() -> GcStats {
    let shared = shared_lock();
    GcStats {
        allocated: ALLOCATED.load(Ordering::Relaxed),
        limit: LIMIT.load(Ordering::Relaxed),
        objects: shared.heap.len(),
    }
}

/// Sets the soft heap limit (configuration and tests).
pub fn set_heap_limit(bytes: usize) {
    LIMIT.store(bytes, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    // The GC state is process-global; tests serialize on this lock and
    // restore a clean heap before running.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn fresh() -> MutexGuard<'static, ()> {
        let guard = TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        shutdown();
        set_heap_limit(DEFAULT_HEAP_LIMIT);
        guard
    }

    #[test]
    fn collect_on_an_empty_heap_is_a_noop() {
        let _guard = fresh();
        __gc_collect();
        let stats = heap_stats();
        assert_eq!(stats.allocated, 0);
        assert_eq!(stats.objects, 0);
    }

    #[test]
    fn unrooted_objects_are_freed() {
        let _guard = fresh();
        __gc_create_thread();
        for _ in 0..4 {
            __gc_alloc(64, 0);
        }
        assert_eq!(heap_stats().objects, 4);

        __gc_collect();
        let stats = heap_stats();
        assert_eq!(stats.objects, 0);
        assert_eq!(stats.allocated, 0);
        __gc_exit_thread();
    }

    #[test]
    fn rooted_objects_survive_collections() {
        let _guard = fresh();
        __gc_create_thread();

        let mut slot: *mut c_void = __gc_alloc(32, 7);
        unsafe {
            (slot as *mut u64).write(0xDEAD_BEEF);
            __gc_register(&mut slot as *mut *mut c_void);
        }
        __gc_alloc(32, 0);

        __gc_collect();
        let stats = heap_stats();
        assert_eq!(stats.objects, 1);
        assert_eq!(stats.allocated, 32);
        // The payload is still ours after the sweep.
        unsafe { assert_eq!((slot as *mut u64).read(), 0xDEAD_BEEF) };

        // Mark state was reset: a second collection still keeps it.
        __gc_collect();
        assert_eq!(heap_stats().objects, 1);

        __gc_pop(1);
        __gc_collect();
        assert_eq!(heap_stats().objects, 0);
        __gc_exit_thread();
    }

    #[test]
    fn objects_reachable_through_the_heap_survive() {
        let _guard = fresh();
        __gc_create_thread();

        let child = __gc_alloc(16, 0);
        let mut parent: *mut c_void = __gc_alloc(size_of::<*mut c_void>() * 2, 0);
        unsafe {
            (parent as *mut *mut c_void).write(child);
            // Second word is junk; the heap-set check must ignore it.
            (parent as *mut *mut c_void).add(1).write(0x1234 as *mut c_void);
            __gc_register(&mut parent as *mut *mut c_void);
        }

        __gc_collect();
        assert_eq!(heap_stats().objects, 2);

        __gc_pop(1);
        __gc_collect();
        assert_eq!(heap_stats().objects, 0);
        __gc_exit_thread();
    }

    #[test]
    fn crossing_the_limit_triggers_a_collection() {
        let _guard = fresh();
        __gc_create_thread();
        set_heap_limit(256);

        for _ in 0..32 {
            __gc_alloc(64, 0);
        }
        // Unrooted garbage cannot pile up past a few allocations.
        assert!(heap_stats().objects < 32);

        __gc_collect();
        assert_eq!(heap_stats().objects, 0);
        set_heap_limit(DEFAULT_HEAP_LIMIT);
        __gc_exit_thread();
    }

    #[test]
    fn limit_doubles_when_the_live_set_crowds_it() {
        let _guard = fresh();
        __gc_create_thread();
        set_heap_limit(1024);

        let mut roots: Vec<*mut c_void> = (0..8).map(|_| __gc_alloc(100, 0)).collect();
        for slot in roots.iter_mut() {
            unsafe { __gc_register(slot as *mut *mut c_void) };
        }

        __gc_collect();
        assert_eq!(heap_stats().objects, 8);
        assert_eq!(heap_stats().limit, 2048);

        __gc_pop(8);
        __gc_collect();
        set_heap_limit(DEFAULT_HEAP_LIMIT);
        __gc_exit_thread();
    }

    #[test]
    fn threads_park_while_a_winner_collects() {
        let _guard = fresh();
        set_heap_limit(512);

        let workers: Vec<_> = (0..2)
            .map(|_| {
                std::thread::spawn(|| {
                    __gc_create_thread();
                    for _ in 0..200 {
                        __gc_alloc(64, 0);
                        __gc_safe_point();
                    }
                    __gc_exit_thread();
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker");
        }

        __gc_collect();
        assert_eq!(heap_stats().objects, 0);
        set_heap_limit(DEFAULT_HEAP_LIMIT);
    }

    #[test]
    fn shutdown_frees_everything() {
        let _guard = fresh();
        __gc_create_thread();
        for _ in 0..5 {
            __gc_alloc(128, 0);
        }
        shutdown();
        let stats = heap_stats();
        assert_eq!(stats.objects, 0);
        assert_eq!(stats.allocated, 0);
        __gc_exit_thread();
    }
}
