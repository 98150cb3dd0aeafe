use eventhandler_core::{BroadcastTag, EventTag, HandlerRegistry, PayloadBag};
use eventhandler_macros::event_handlers;
use std::sync::Arc;

struct Jobs;

#[event_handlers]
impl Jobs {
    #[event("jobs.ping")]
    fn ping() {}

    #[event("jobs.run")]
    fn run(&self, name: String) -> anyhow::Result<()> {
        if name.is_empty() {
            anyhow::bail!("empty job name");
        }
        Ok(())
    }

    #[event("jobs.io")]
    #[broadcast("jobs.io")]
    fn io(&self) -> std::io::Result<()> {
        Ok(())
    }

    #[event("jobs.render")]
    fn render(&self, text: String) -> std::fmt::Result {
        if text.is_empty() {
            return Err(std::fmt::Error);
        }
        Ok(())
    }

    #[broadcast("jobs.report")]
    fn report(_bag: PayloadBag) -> Result<(), std::fmt::Error> {
        Ok(())
    }
}

fn main() {
    let jobs = Arc::new(Jobs);
    let events = HandlerRegistry::<EventTag>::build(jobs.clone()).unwrap();
    let broadcasts = HandlerRegistry::<BroadcastTag>::build(jobs).unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(broadcasts.len(), 2);

    let run = events.get("jobs.run").unwrap();
    assert!(run.invoke(Some(Box::new(String::new()))).is_err());
    assert!(run.invoke(Some(Box::new(String::from("build")))).is_ok());

    let render = events.get("jobs.render").unwrap();
    assert!(render.invoke(Some(Box::new(String::new()))).is_err());
    assert!(render.invoke(Some(Box::new(String::from("ok")))).is_ok());
}
