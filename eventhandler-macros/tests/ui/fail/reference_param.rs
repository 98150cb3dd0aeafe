use eventhandler_macros::event_handlers;

struct Clock;

#[event_handlers]
impl Clock {
    #[event("clock.say")]
    fn say(&self, text: &str) {}
}

fn main() {
    let _ = Clock;
}
