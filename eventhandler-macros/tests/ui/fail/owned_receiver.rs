use eventhandler_macros::event_handlers;

struct Clock;

#[event_handlers]
impl Clock {
    #[broadcast("clock.tick")]
    fn tick(self) {}
}

fn main() {
    let _ = Clock;
}
