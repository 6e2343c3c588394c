//! A current-thread executor for actor threads. Each actor gets its own
//! thread and drives its event loop to completion here.

use std::future::Future;

pub struct Executor;

impl Executor {
    pub fn run(task: impl Future<Output = ()>) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("failed to build actor runtime");
        rt.block_on(task);
    }
}
