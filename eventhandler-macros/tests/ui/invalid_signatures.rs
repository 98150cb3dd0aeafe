use eventhandler_core::{EventTag, HandlerRegistry, SignatureErrorKind};
use eventhandler_macros::event_handlers;
use std::sync::Arc;

struct Returns;

#[event_handlers]
impl Returns {
    #[event("returns.count")]
    fn count(&self) -> usize {
        0
    }
}

struct TwoParams;

#[event_handlers]
impl TwoParams {
    #[event("two.params")]
    fn pair(&self, _a: String, _b: String) {}
}

struct Scalar;

#[event_handlers]
impl Scalar {
    #[event("scalar")]
    fn scalar(&self, _n: u32) {}
}

fn main() {
    let err = HandlerRegistry::<EventTag>::build(Arc::new(Returns)).unwrap_err();
    assert_eq!(err.signature_kind(), Some(SignatureErrorKind::NonVoidReturn));

    let err = HandlerRegistry::<EventTag>::build(Arc::new(TwoParams)).unwrap_err();
    assert_eq!(err.signature_kind(), Some(SignatureErrorKind::TooManyParameters));

    let err = HandlerRegistry::<EventTag>::build(Arc::new(Scalar)).unwrap_err();
    assert_eq!(err.signature_kind(), Some(SignatureErrorKind::InvalidParameterType));
}
