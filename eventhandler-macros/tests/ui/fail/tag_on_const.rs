use eventhandler_macros::event_handlers;

struct Clock;

#[event_handlers]
impl Clock {
    #[event("clock.limit")]
    const LIMIT: u32 = 3;
}

fn main() {
    let _ = Clock;
}
