//! Tests for diagnostic sinks

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_memory_sink_records_in_order() {
    let sink = MemorySink::new();
    sink.emit(DiagnosticEvent::info("a", "first"));
    sink.emit(DiagnosticEvent::warning("b", "second").with_field("table", "dbo.Orders"));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].code, "a");
    assert_eq!(events[1].field("table"), Some("dbo.Orders"));
    assert_eq!(sink.warnings().len(), 1);
    assert!(sink.has_code("b"));
    assert!(!sink.has_code("c"));

    sink.clear();
    assert!(sink.events().is_empty());
}

#[test]
fn test_trait_object_dispatch() {
    let memory = MemorySink::new();
    let sinks: [&dyn DiagnosticSink; 3] = [&memory, &NullSink, &TracingSink];
    for sink in sinks {
        sink.emit(DiagnosticEvent::debug("sink.check", "hello"));
    }
    assert_eq!(memory.events().len(), 1);
}
