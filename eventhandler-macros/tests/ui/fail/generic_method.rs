use eventhandler_macros::event_handlers;

struct Clock;

#[event_handlers]
impl Clock {
    #[event("clock.say")]
    fn say<T>(&self, value: T) {}
}

fn main() {
    let _ = Clock;
}
