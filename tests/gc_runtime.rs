//! End-to-end GC runtime exercise: several mutator threads allocating and
//! linking objects under a tight heap limit, with rooted data surviving.
//!
//! The GC state is process-global, so this file keeps to a single test.

use sakura_runtime::gc::{self, __gc_alloc, __gc_collect, __gc_create_thread, __gc_exit_thread,
    __gc_pop, __gc_register, __gc_safe_point};
use std::ffi::c_void;

#[test]
fn mutator_threads_collect_and_rooted_data_survives() {
    gc::set_heap_limit(2048);

    let workers: Vec<_> = (0..3)
        .map(|seed| {
            std::thread::spawn(move || {
                __gc_create_thread();

                // A rooted linked chain: head -> next -> next. Every object
                // is linked (hence reachable) before the next allocation,
                // which is the next point this thread could be parked at.
                let mut head: *mut c_void = __gc_alloc(32, 1);
                unsafe {
                    __gc_register(&mut head as *mut *mut c_void);
                    let second = __gc_alloc(32, 1);
                    (head as *mut *mut c_void).write(second);
                    let third = __gc_alloc(32, 1);
                    (second as *mut *mut c_void).write(third);
                    (third as *mut u64).write(seed as u64);
                }

                // Allocation pressure forces collections while the chain is
                // rooted; the chain must keep its contents throughout.
                for _ in 0..100 {
                    __gc_alloc(64, 0);
                    __gc_safe_point();
                }

                let value = unsafe {
                    let second = (head as *mut *mut c_void).read();
                    let third = (second as *mut *mut c_void).read();
                    (third as *mut u64).read()
                };
                assert_eq!(value, seed as u64);

                __gc_pop(1);
                __gc_exit_thread();
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker thread");
    }

    // All roots are gone; a final collection drains the heap.
    __gc_collect();
    let stats = gc::heap_stats();
    assert_eq!(stats.objects, 0);
    assert_eq!(stats.allocated, 0);

    gc::shutdown();
}
