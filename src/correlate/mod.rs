//! Span correlation seam.
//!
//! The interception logic decides *when* context moves in or out of a message;
//! this module owns *how* that context relates to the application's live
//! spans. [`SpanCorrelator`] is the seam: the real implementation talks to the
//! tracing machinery, and [`NoopCorrelator`] stands in when the embedding
//! application has no tracing configured, so the exit still runs (and still
//! copies inbound headers forward) without it.

pub mod otel;

pub use otel::OtelCorrelator;

/// Context captured from the application's current span, ready to be written
/// into an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundContext {
    /// W3C traceparent value.
    pub traceparent: String,
    /// W3C tracestate value, when the span carries one.
    pub tracestate: Option<String>,
}

/// Bridges between message-borne trace context and live spans.
pub trait SpanCorrelator: Send + Sync {
    /// Captures the propagation context of the application span that was
    /// current when the intercepted call was made.
    ///
    /// Returns `None` when there is no recording span to propagate from; the
    /// caller then leaves the message untouched.
    fn current_outbound(&self, span: &tracing::Span) -> Option<OutboundContext>;

    /// Links the given span to the remote context carried by an inbound
    /// message.
    ///
    /// Returns `true` when a valid remote context was extracted and linked.
    /// A missing or malformed traceparent returns `false`; a tracestate
    /// without a traceparent carries no span identity and also returns
    /// `false`.
    fn link_inbound(
        &self,
        span: &tracing::Span,
        traceparent: Option<&str>,
        tracestate: Option<&str>,
    ) -> bool;
}

/// Correlator that never captures or links anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCorrelator;

impl SpanCorrelator for NoopCorrelator {
    fn current_outbound(&self, _span: &tracing::Span) -> Option<OutboundContext> {
        None
    }

    fn link_inbound(
        &self,
        _span: &tracing::Span,
        _traceparent: Option<&str>,
        _tracestate: Option<&str>,
    ) -> bool {
        false
    }
}
