use eventhandler_macros::event_handlers;

struct Clock;

#[event_handlers]
impl Clock {
    #[event("clock.tick")]
    fn tick(&mut self) {}
}

fn main() {
    let _ = Clock;
}
