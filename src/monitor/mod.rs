pub mod install;
pub mod resources;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const STOP_CHECK_STEP: Duration = Duration::from_millis(100);

/// Sleep for `dur`, waking early when `stop` is raised.
/// Returns `false` if the sleep was cut short.
pub fn sleep_unless_stopped(dur: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + dur;
    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(STOP_CHECK_STEP.min(deadline - now));
    }
}
