use eventhandler_core::{EventTag, HandlerRegistry};
use eventhandler_macros::event_handlers;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Counter {
    hits: AtomicUsize,
}

#[event_handlers]
impl Counter {
    #[event("counter.bump")]
    fn bump(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    #[event("counter.label")]
    fn label(&self, text: String) {
        let _ = text;
    }

    // 未标记的方法保持原样
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn main() {
    let counter = Arc::new(Counter::default());
    let registry = HandlerRegistry::<EventTag>::build(counter.clone()).unwrap();
    assert_eq!(registry.len(), 2);

    registry.get("counter.bump").unwrap().invoke(None).unwrap();
    registry
        .get("counter.label")
        .unwrap()
        .invoke(Some(Box::new(String::from("x"))))
        .unwrap();
    assert_eq!(counter.hits(), 1);
}
