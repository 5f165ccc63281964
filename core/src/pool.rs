//! Context freelist.
//!
//! Contexts are exclusively owned by one dispatch at a time, so the pool
//! only needs a lock around the idle list. Objects re-enter the list fully
//! recycled; map capacity survives the round trip.

use std::sync::Mutex;

use crate::context::Context;

pub(crate) struct ContextPool {
    idle: Mutex<Vec<Context>>,
}

impl ContextPool {
    pub(crate) fn new() -> Self {
        ContextPool {
            idle: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn acquire(&self) -> Context {
        let recycled = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        recycled.unwrap_or_else(Context::detached)
    }

    pub(crate) fn release(&self, mut ctx: Context) {
        ctx.recycle();
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_reuses_released_contexts() {
        let pool = ContextPool::new();
        let ctx = pool.acquire();
        pool.release(ctx);
        assert_eq!(pool.idle.lock().unwrap().len(), 1);

        let _ctx = pool.acquire();
        assert_eq!(pool.idle.lock().unwrap().len(), 0);
    }

    #[test]
    fn test_release_clears_request_state() {
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        ctx.params_mut().insert("id".to_string(), "1".to_string());
        ctx.set("k", true);
        pool.release(ctx);

        let ctx = pool.acquire();
        assert_eq!(ctx.param("id"), "");
        assert!(!ctx.get_bool("k"));
    }
}
