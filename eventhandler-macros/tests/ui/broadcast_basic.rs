use eventhandler_core::{Arity, BroadcastTag, HandlerRegistry, PayloadBag};
use eventhandler_macros::event_handlers;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inbox {
    received: Mutex<Vec<String>>,
}

#[event_handlers]
impl Inbox {
    #[broadcast("inbox.message")]
    fn on_message(&self, bag: PayloadBag) {
        if let Some(text) = bag.get_str("text") {
            self.received.lock().unwrap().push(text.to_string());
        }
    }

    #[broadcast("inbox.clear")]
    fn on_clear(&self) {
        self.received.lock().unwrap().clear();
    }
}

fn main() {
    let inbox = Arc::new(Inbox::default());
    let registry = HandlerRegistry::<BroadcastTag>::build(inbox.clone()).unwrap();
    assert_eq!(registry.get("inbox.message").unwrap().arity(), Arity::UnaryPayload);
    assert_eq!(registry.get("inbox.clear").unwrap().arity(), Arity::Nullary);

    let bag = PayloadBag::new().with("text", "hello");
    registry
        .get("inbox.message")
        .unwrap()
        .invoke(Some(Box::new(bag)))
        .unwrap();
    assert_eq!(*inbox.received.lock().unwrap(), vec!["hello".to_string()]);
}
