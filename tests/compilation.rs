use fieldwire::prelude::*;

fn source(id: &str, outputs: &[&str]) -> BeanSource {
    BeanSource::new("Feed", "poll()", outputs.iter().copied())
        .unwrap()
        .with_id(id)
}

fn processor(id: &str, invocation: &str, outputs: &[&str]) -> BeanProcessor {
    BeanProcessor::new("Step", invocation, outputs.iter().copied())
        .unwrap()
        .with_id(id)
}

fn pass_through<'a>(compilation: &'a PipelineCompilation, id: &str) -> &'a [String] {
    compilation.processor(id).unwrap().pass_through_fields()
}

#[test]
fn test_follow() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s", &["feed"]));
    subject.add_processor(processor("b1", "f(feed)", &["out"]));
    subject.compile().unwrap();
    subject.verify().unwrap();

    assert_eq!(subject.chain("s"), Some(vec!["b1"]));
    assert!(pass_through(&subject, "b1").is_empty());
}

#[test]
fn test_join() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s", &["a", "b"]));
    subject.add_processor(processor("b3", "join(y, z)", &[]));
    subject.add_processor(processor("b2", "g(b)", &["z"]));
    subject.add_processor(processor("b1", "f(a)", &["y"]));
    subject.compile().unwrap();
    subject.verify().unwrap();

    assert_eq!(subject.chain("s"), Some(vec!["b2", "b1", "b3"]));
    assert_eq!(pass_through(&subject, "b2"), &["a"]);
    assert_eq!(pass_through(&subject, "b1"), &["z"]);
    assert!(pass_through(&subject, "b3").is_empty());
}

#[test]
fn test_join_in_declaration_order() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s", &["a", "b"]));
    subject.add_processor(processor("b1", "f(a)", &["y"]));
    subject.add_processor(processor("b2", "g(b)", &["z"]));
    subject.add_processor(processor("b3", "join(y, z)", &[]));
    subject.compile().unwrap();

    assert_eq!(subject.chain("s"), Some(vec!["b1", "b2", "b3"]));
    assert_eq!(pass_through(&subject, "b1"), &["b"]);
    assert_eq!(pass_through(&subject, "b2"), &["y"]);
    assert!(pass_through(&subject, "b3").is_empty());
}

#[test]
fn test_split_up() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s1", &["feed"]));
    subject.add_processor(processor("b1", "f(feed)", &["a"]));
    subject.add_processor(processor("b2", "g(a)", &["b"]));
    subject.add_processor(processor("b3", "h(feed)", &["c"]));
    subject.add_processor(processor("b4", "i(b, c)", &[]));
    subject.compile().unwrap();
    subject.verify().unwrap();

    assert_eq!(subject.chain("s1"), Some(vec!["b1", "b2", "b3", "b4"]));
    assert_eq!(pass_through(&subject, "b1"), &["feed"]);
    assert_eq!(pass_through(&subject, "b2"), &["feed"]);
    assert_eq!(pass_through(&subject, "b3"), &["b"]);
    assert!(pass_through(&subject, "b4").is_empty());
}

#[test]
fn test_order_follows_field_availability() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s1", &["feed"]));
    subject.add_processor(processor("b1", "f(a, b, feed)", &[]));
    subject.add_processor(processor("b2", "g(a, feed)", &["b"]));
    subject.add_processor(processor("b3", "h(feed)", &["a"]));
    subject.compile().unwrap();
    subject.verify().unwrap();

    assert_eq!(subject.chain("s1"), Some(vec!["b3", "b2", "b1"]));
    assert_eq!(pass_through(&subject, "b3"), &["feed"]);
    assert_eq!(pass_through(&subject, "b2"), &["a", "feed"]);
    assert!(pass_through(&subject, "b1").is_empty());
}

#[test]
fn test_void_processor_passes_through() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s1", &["x", "y"]));
    subject.add_processor(processor("b1", "log(x)", &[]));
    subject.add_processor(processor("b2", "store(y)", &[]));
    subject.compile().unwrap();

    assert_eq!(subject.chain("s1"), Some(vec!["b1", "b2"]));
    assert_eq!(pass_through(&subject, "b1"), &["y"]);
}

#[test]
fn test_sources_claim_in_id_order() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s3", &["feed", "c"]));
    subject.add_source(source("s1", &["feed", "a"]));
    subject.add_source(source("s2", &["feed", "b"]));
    subject.add_processor(processor("b1", "f(b)", &[]));
    subject.add_processor(processor("b2", "g(c)", &[]));
    subject.add_processor(processor("b3", "h(feed)", &[]));
    subject.compile().unwrap();
    subject.verify().unwrap();

    assert_eq!(subject.chain("s1"), Some(vec!["b3"]));
    assert_eq!(subject.chain("s2"), Some(vec!["b1"]));
    assert_eq!(subject.chain("s3"), Some(vec!["b2"]));
    assert_eq!(subject.to_string(), "{s1 -> b3}, {s2 -> b1}, {s3 -> b2}");
}

#[test]
fn test_incomplete() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s1", &["feed"]));
    subject.add_processor(processor("b1", "f(other)", &["out"]));
    subject.add_processor(processor("b2", "g(feed)", &["x"]));
    subject.compile().unwrap();

    assert_eq!(subject.chain("s1"), Some(vec!["b2"]));
    let error = subject.verify().unwrap_err();
    assert!(matches!(&error, WireError::UnresolvedPipeline(ids) if ids == &["b1"]));
    assert_eq!(error.to_string(), "Can't resolve all input fields for: b1");
}

#[test]
fn test_compile_twice_does_not_double_bind() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s1", &["feed"]));
    subject.add_source(source("s2", &["feed"]));
    subject.add_processor(processor("b1", "f(feed)", &[]));
    subject.compile().unwrap();
    assert!(matches!(subject.compile(), Err(WireError::AlreadyCompiled)));

    let bound: usize = subject.lines().map(|line| line.len()).sum();
    assert_eq!(bound, 1);

    subject.reset().unwrap();
    subject.compile().unwrap();
    assert_eq!(subject.chain("s1"), Some(vec!["b1"]));
    assert_eq!(subject.chain("s2"), Some(vec![]));
}

#[test]
fn test_clear() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s1", &["feed"]));
    subject.add_processor(processor("b1", "f(feed)", &[]));
    subject.compile().unwrap();
    subject.clear();

    assert_eq!(subject.lines().count(), 0);
    assert!(subject.processor("b1").is_none());
    subject.compile().unwrap();
    assert_eq!(subject.to_string(), "");
}

#[test]
fn test_rpc_round_trip() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(RpcRequest::new("lookup(key)").unwrap());
    subject.add_processor(processor("fetch", "fetch(key)", &["value"]));
    subject.add_processor(RpcResponse::new("lookup(key)", &["value"]).unwrap());
    subject.compile().unwrap();
    subject.verify().unwrap();

    assert_eq!(subject.chain("lookup-rpc-req"), Some(vec!["fetch", "lookup-rpc-rsp"]));
    assert_eq!(pass_through(&subject, "fetch"), &["lookup-rpc-ctx"]);
    assert!(pass_through(&subject, "lookup-rpc-rsp").is_empty());
    assert!(subject.processor_as::<RpcResponse>("lookup-rpc-rsp").is_some());
}

#[derive(Default)]
struct Wiring {
    sources: Vec<String>,
    processors: Vec<(String, String, String)>,
}

impl TopologyBuilder for Wiring {
    fn set_source(&mut self, source: &dyn ConfiguredSource) {
        self.sources.push(source.id().to_string());
    }

    fn set_processor(&mut self, processor: &dyn ConfiguredProcessor, upstream_id: &str, upstream_stream: &str) {
        self.processors.push((
            processor.id().to_string(),
            upstream_id.to_string(),
            upstream_stream.to_string(),
        ));
    }
}

#[test]
fn test_build_wires_predecessors() {
    let mut first = processor("b1", "f(feed)", &["a"]);
    first.component_mut().set_output_stream_id("parsed");

    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s1", &["feed"]));
    subject.add_processor(processor("b2", "g(a)", &[]));
    subject.add_processor(first);

    let mut wiring = Wiring::default();
    subject.build(&mut wiring).unwrap();
    assert!(subject.is_compiled());
    assert_eq!(wiring.sources, vec!["s1"]);
    assert_eq!(
        wiring.processors,
        vec![
            ("b1".to_string(), "s1".to_string(), "default".to_string()),
            ("b2".to_string(), "b1".to_string(), "parsed".to_string()),
        ]
    );
}

#[test]
fn test_build_rejects_unresolved() {
    let mut subject = PipelineCompilation::new();
    subject.add_source(source("s1", &["feed"]));
    subject.add_processor(processor("b1", "f(missing)", &[]));

    let mut wiring = Wiring::default();
    assert!(matches!(
        subject.build(&mut wiring),
        Err(WireError::UnresolvedPipeline(_))
    ));
    assert!(wiring.sources.is_empty());
}

#[test]
fn test_declared_topology() {
    let topology = TopologyDeclaration::from_value(serde_json::json!({
        "sources": [{"id": "s1", "beanType": "Feed", "signature": "poll()", "outputFields": "feed"}],
        "processors": [
            {"id": "b2", "beanType": "Step", "signature": "g(a, feed)", "outputFields": ""},
            {"id": "b1", "beanType": "Step", "signature": "f(feed)", "outputFields": "a"}
        ],
        "anchor": false
    }))
    .unwrap();
    assert!(!topology.anchor);

    let mut subject = topology.into_compilation(None).unwrap();
    subject.compile().unwrap();
    subject.verify().unwrap();
    assert_eq!(subject.chain("s1"), Some(vec!["b1", "b2"]));
    assert_eq!(pass_through(&subject, "b1"), &["feed"]);
}
