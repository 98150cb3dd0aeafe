use eventhandler_macros::event_handlers;

struct Clock;

#[event_handlers]
impl Clock {
    #[event("clock.tick")]
    async fn tick(&self) {}
}

fn main() {
    let _ = Clock;
}
