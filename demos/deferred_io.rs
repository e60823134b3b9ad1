//! Deferred file I/O across a parallel evaluation pass.
//!
//! Worker threads stand in for the scheduler: each one is stamped with a
//! task id, writes a line through the runtime's virtual file table as a
//! deferred side effect, and flushes its outbox at the pass boundary. The
//! main thread then drains the pass inbox and the lines come out in task
//! order, no matter how the threads actually interleaved.

use std::sync::Arc;
use std::thread;

use simrt::{task, EvalQueue, ScopeDesc, SimRuntime, NO_TASK};

const TASKS: u32 = 6;
const LOG_NAME: &str = "deferred_io_demo.log";

fn main() {
    simrt::init_logging("info");

    let rt = Arc::new(SimRuntime::new());
    rt.args().set(std::env::args());

    // -------------------------------------------------------------------------
    // Model construction: a tiny two-level hierarchy
    // -------------------------------------------------------------------------

    let top = Arc::new(ScopeDesc::new(1, "top"));
    rt.scopes().register(Arc::clone(&top));
    for n in 0..TASKS as u64 {
        let child = Arc::new(ScopeDesc::new(2 + n, format!("top.unit{}", n)));
        rt.scopes().register(Arc::clone(&child));
        rt.hierarchy().add_edge(top.id(), child);
    }

    let log_path = std::env::temp_dir().join(LOG_NAME);
    let log = rt.files().open_multi(log_path.to_str().unwrap());
    if log == 0 {
        eprintln!("could not open {}", log_path.display());
        std::process::exit(1);
    }

    // -------------------------------------------------------------------------
    // One evaluation pass: parallel producers, ordered consumer
    // -------------------------------------------------------------------------

    let inbox = Arc::new(EvalQueue::new());

    let mut workers = Vec::new();
    for id in (1..=TASKS).rev() {
        let rt = Arc::clone(&rt);
        let inbox = Arc::clone(&inbox);
        workers.push(thread::spawn(move || {
            let prev = task::set_current_task(id);

            let rt2 = Arc::clone(&rt);
            rt.defer(move || {
                let line = format!("task {} reporting\n", id);
                rt2.files().write(log, line.as_bytes());
            });

            task::set_current_task(prev);
            rt.flush_outbox(&inbox);
        }));
    }
    for w in workers {
        w.join().expect("worker panicked");
    }

    assert!(!rt.pending_flush().any());
    inbox.drain();

    rt.files().flush(log);
    rt.files().close(log);

    // -------------------------------------------------------------------------
    // Show what happened
    // -------------------------------------------------------------------------

    let written = std::fs::read_to_string(&log_path).expect("demo log readable");
    println!("--- {} ---", log_path.display());
    print!("{}", written);

    let mut dump = Vec::new();
    rt.internals_dump(&mut dump).expect("dump never fails on Vec");
    println!("{}", String::from_utf8_lossy(&dump));

    let _ = std::fs::remove_file(&log_path);
}
