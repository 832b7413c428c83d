use biometrics::{Collector, Counter, Moments};

pub(crate) static SESSION_SENDS: Counter = Counter::new("phoenix.session.sends");
pub(crate) static SESSION_SENDS_IGNORED: Counter = Counter::new("phoenix.session.sends_ignored");
pub(crate) static SESSION_SENDS_FAILED: Counter = Counter::new("phoenix.session.sends_failed");
pub(crate) static SESSION_RESET_FAILURES: Counter =
    Counter::new("phoenix.session.reset_failures");

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("phoenix.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("phoenix.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("phoenix.client.request_duration_seconds");

pub(crate) static STORE_EVICTIONS: Counter = Counter::new("phoenix.store.evictions");
pub(crate) static STORE_PERSIST_ERRORS: Counter = Counter::new("phoenix.store.persist_errors");
pub(crate) static STORE_MALFORMED_LOADS: Counter = Counter::new("phoenix.store.malformed_loads");

pub(crate) static RENDER_UPDATES: Counter = Counter::new("phoenix.render.updates");
pub(crate) static RENDER_INTERRUPTS: Counter = Counter::new("phoenix.render.interrupts");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&SESSION_SENDS);
    collector.register_counter(&SESSION_SENDS_IGNORED);
    collector.register_counter(&SESSION_SENDS_FAILED);
    collector.register_counter(&SESSION_RESET_FAILURES);

    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STORE_EVICTIONS);
    collector.register_counter(&STORE_PERSIST_ERRORS);
    collector.register_counter(&STORE_MALFORMED_LOADS);

    collector.register_counter(&RENDER_UPDATES);
    collector.register_counter(&RENDER_INTERRUPTS);
}
