use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("talkhand.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("talkhand.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("talkhand.client.request_duration_seconds");

pub(crate) static STREAM_LINES: Counter = Counter::new("talkhand.stream.lines");
pub(crate) static STREAM_SKIPPED_LINES: Counter = Counter::new("talkhand.stream.skipped_lines");
pub(crate) static STREAM_DELTAS: Counter = Counter::new("talkhand.stream.deltas");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("talkhand.stream.errors");
pub(crate) static STREAM_CANCELLATIONS: Counter = Counter::new("talkhand.stream.cancellations");
pub(crate) static STREAM_TTFT: Moments = Moments::new("talkhand.stream.ttft_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("talkhand.stream.duration_seconds");

pub(crate) static CONVERSATION_SENDS: Counter = Counter::new("talkhand.conversation.sends");
pub(crate) static CONVERSATION_FAILURES: Counter =
    Counter::new("talkhand.conversation.failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_LINES);
    collector.register_counter(&STREAM_SKIPPED_LINES);
    collector.register_counter(&STREAM_DELTAS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_CANCELLATIONS);
    collector.register_moments(&STREAM_TTFT);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&CONVERSATION_SENDS);
    collector.register_counter(&CONVERSATION_FAILURES);
}
