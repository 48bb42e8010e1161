//! OpenTelemetry-backed span correlation.

use crate::codec::PropertyCarrier;
use crate::correlate::{OutboundContext, SpanCorrelator};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Correlator backed by the W3C trace-context propagator.
///
/// Reading goes through [`OpenTelemetrySpanExt`], so the application's spans
/// must be bridged into OpenTelemetry (a `tracing-opentelemetry` layer on the
/// subscriber). Without that bridge the span context is never valid and this
/// correlator degrades to the no-op behavior.
#[derive(Debug, Default)]
pub struct OtelCorrelator {
    propagator: TraceContextPropagator,
}

impl OtelCorrelator {
    /// Creates a correlator with a fresh W3C propagator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpanCorrelator for OtelCorrelator {
    fn current_outbound(&self, span: &tracing::Span) -> Option<OutboundContext> {
        let mut carrier = PropertyCarrier::new();
        // The propagator injects nothing when the span context is invalid,
        // which covers the unbridged-subscriber case.
        self.propagator.inject_context(&span.context(), &mut carrier);
        let traceparent = carrier.traceparent()?.to_string();
        Some(OutboundContext {
            traceparent,
            tracestate: carrier.tracestate().map(str::to_string),
        })
    }

    fn link_inbound(
        &self,
        span: &tracing::Span,
        traceparent: Option<&str>,
        tracestate: Option<&str>,
    ) -> bool {
        let carrier = PropertyCarrier::from_inbound(traceparent, tracestate);
        if carrier.is_empty() {
            return false;
        }
        // Extract against an empty context so the ambient one cannot leak in
        // as a fake remote parent.
        let extracted = self.propagator.extract_with_context(&Context::new(), &carrier);
        let remote = extracted.span().span_context().clone();
        if !remote.is_valid() || !remote.is_remote() {
            return false;
        }
        span.add_link(remote);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TraceParent;
    use crate::correlate::NoopCorrelator;
    use opentelemetry::trace::TracerProvider as _;
    use tracing_subscriber::layer::SubscriberExt;

    const TP: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

    fn with_otel_subscriber(f: impl FnOnce()) {
        let provider = opentelemetry_sdk::trace::TracerProvider::builder().build();
        let tracer = provider.tracer("mqotel-test");
        let subscriber =
            tracing_subscriber::registry().with(tracing_opentelemetry::layer().with_tracer(tracer));
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn outbound_context_from_live_span() {
        with_otel_subscriber(|| {
            let span = tracing::info_span!("app_put");
            let out = OtelCorrelator::new().current_outbound(&span).unwrap();
            let parsed = TraceParent::parse(&out.traceparent).unwrap();
            assert!(parsed.sampled());
        });
    }

    #[test]
    fn no_outbound_without_otel_bridge() {
        // A plain subscriber records spans but never gives them otel identity.
        let subscriber = tracing_subscriber::registry();
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("app_put");
            assert!(OtelCorrelator::new().current_outbound(&span).is_none());
        });
    }

    #[test]
    fn links_valid_inbound_context() {
        with_otel_subscriber(|| {
            let span = tracing::info_span!("app_get");
            let correlator = OtelCorrelator::new();
            assert!(correlator.link_inbound(&span, Some(TP), None));
            assert!(correlator.link_inbound(&span, Some(TP), Some("acme=1")));
        });
    }

    #[test]
    fn rejects_missing_or_malformed_inbound() {
        let span = tracing::Span::none();
        let correlator = OtelCorrelator::new();
        assert!(!correlator.link_inbound(&span, None, None));
        assert!(!correlator.link_inbound(&span, Some("not-a-traceparent"), None));
        // A tracestate alone carries no span identity.
        assert!(!correlator.link_inbound(&span, None, Some("acme=1")));
    }

    #[test]
    fn noop_correlator_does_nothing() {
        let span = tracing::Span::none();
        assert!(NoopCorrelator.current_outbound(&span).is_none());
        assert!(!NoopCorrelator.link_inbound(&span, Some(TP), None));
    }
}
