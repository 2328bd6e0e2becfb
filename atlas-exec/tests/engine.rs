use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use atlas_core::{parse_workflow_str, DocumentFormat, JinjaQueryEvaluator, Value};
use atlas_exec::executor::{
    AuthError, EngineConfig, ExecutionContext, HttpClient, HttpError, HttpRequestParts,
    HttpResponseParts, OperationContext, TokenProvider, TokenRequest, WorkflowEngine,
    WorkflowError,
};
use atlas_exec::values::ValuesError;
use atlas_exec::{
    AuditLog, Console, DirectoryBlueprintManager, DirectoryBlueprintPackage, GlobPatternMatcher,
    PatternMatcher, SecretTracker, SecretValue, TemplateError, TemplateRenderer, ValuesEngine,
};
use serde_json::json;

// Captures console output.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// Mock HTTP client: replays queued responses, then answers 200 with an empty object.
#[derive(Default)]
struct MockHttpClient {
    responses: Mutex<VecDeque<HttpResponseParts>>,
    requests: Mutex<Vec<HttpRequestParts>>,
}

impl MockHttpClient {
    fn with_responses(responses: Vec<(u16, Value)>) -> Self {
        let responses = responses
            .into_iter()
            .map(|(status, body)| HttpResponseParts {
                status,
                headers: BTreeMap::new(),
                body: serde_json::to_vec(&body).unwrap(),
            })
            .collect();
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<HttpRequestParts> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(
        &self,
        req: HttpRequestParts,
        _timeout: Duration,
        _max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError> {
        self.requests.lock().unwrap().push(req);
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(HttpResponseParts {
                status: 200,
                headers: BTreeMap::new(),
                body: b"{}".to_vec(),
            }))
    }
}

#[derive(Default)]
struct MockTokenProvider {
    requests: Mutex<Vec<TokenRequest>>,
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn acquire_token(&self, request: &TokenRequest) -> Result<SecretValue, AuthError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(SecretValue::from_string("tok-123".to_string()))
    }
}

// Templates keyed by name; values are ignored.
#[derive(Default)]
struct StaticTemplates(HashMap<String, String>);

impl StaticTemplates {
    fn with(mut self, name: &str, text: &str) -> Self {
        self.0.insert(name.to_string(), text.to_string());
        self
    }
}

impl TemplateRenderer for StaticTemplates {
    fn render(&self, name: &str, _values: &Value) -> Result<String, TemplateError> {
        self.0.get(name).cloned().ok_or_else(|| TemplateError::Render {
            name: name.to_string(),
            message: "not found".to_string(),
        })
    }
}

struct Harness {
    engine: WorkflowEngine,
    exec: Arc<ExecutionContext>,
    console: SharedBuffer,
    http: Arc<MockHttpClient>,
    tokens: Arc<MockTokenProvider>,
    secrets: Arc<SecretTracker>,
    dir: tempfile::TempDir,
}

struct Options {
    templates: StaticTemplates,
    http: MockHttpClient,
    patterns: Option<GlobPatternMatcher>,
    dry_run: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            templates: StaticTemplates::default(),
            http: MockHttpClient::default(),
            patterns: None,
            dry_run: false,
        }
    }
}

fn harness(options: Options) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let secrets = Arc::new(SecretTracker::new());
    let console = SharedBuffer::default();
    let http = Arc::new(options.http);
    let tokens = Arc::new(MockTokenProvider::default());
    let patterns: Arc<dyn PatternMatcher> =
        Arc::new(options.patterns.unwrap_or_else(GlobPatternMatcher::match_all));

    let exec = Arc::new(ExecutionContext {
        templates: Arc::new(options.templates),
        patterns,
        blueprint: Arc::new(DirectoryBlueprintPackage::new(dir.path())),
        secrets: Arc::clone(&secrets),
        console: Arc::new(Console::new(Box::new(console.clone()), &secrets, false)),
        audit: Arc::new(AuditLog::new(Some(dir.path().join("logs")), Arc::clone(&secrets))),
        dry_run: options.dry_run,
        interactive: false,
        output_directory: dir.path().join("out"),
    });

    let engine = WorkflowEngine::new(
        ValuesEngine::new(Arc::new(JinjaQueryEvaluator::new())),
        http.clone(),
        tokens.clone(),
        Arc::new(DirectoryBlueprintManager::new()),
        EngineConfig::default(),
    );

    Harness {
        engine,
        exec,
        console,
        http,
        tokens,
        secrets,
        dir,
    }
}

impl Harness {
    async fn run(&self, yaml: &str) -> Result<Value, WorkflowError> {
        self.run_with(yaml, json!({})).await
    }

    async fn run_with(&self, yaml: &str, values: Value) -> Result<Value, WorkflowError> {
        let workflow = parse_workflow_str(yaml, DocumentFormat::Yaml).unwrap().workflow;
        let context = OperationContext::root(Arc::clone(&self.exec), values);
        self.engine.execute_workflow(&context, &workflow).await
    }

    fn log_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path().join("logs"))
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[tokio::test]
async fn caught_throw_lets_later_siblings_run() {
    let h = harness(Options::default());
    let result = h
        .run(
            r#"
operations:
- message: Catching
  operations:
  - message: Throwing
    throw:
      message: boom
  catch: {}
- message: Still Running
"#,
        )
        .await
        .unwrap();

    assert_eq!(result, Value::Null);
    assert_eq!(h.console.text(), "Catching\n  Throwing\n    boom\nStill Running\n");
}

#[tokio::test]
async fn catch_condition_matching_the_error_absorbs_it() {
    let h = harness(Options::default());
    let result = h
        .run(
            r#"
operations:
- operations:
  - throw:
      message: boom
      details: {code: 7}
  catch:
    condition: "error.message == 'boom'"
    output:
      code: (error.details.code)
      kind: (error.type.name)
- output: {after: true}
"#,
        )
        .await
        .unwrap();

    assert_eq!(result, json!({"after": true, "code": 7, "kind": "OperationError"}));
}

#[tokio::test]
async fn catch_condition_not_matching_propagates_the_original_error() {
    let h = harness(Options::default());
    let err = h
        .run(
            r#"
operations:
- operations:
  - throw: {message: boom}
  catch:
    condition: "error.message == 'different'"
- message: Never
"#,
        )
        .await
        .unwrap_err();

    match err {
        WorkflowError::Operation(e) => assert_eq!(e.message, "boom"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!h.console.text().contains("Never"));
}

#[tokio::test]
async fn failing_catch_condition_does_not_catch() {
    let h = harness(Options::default());
    let err = h
        .run(
            r#"
operations:
- throw: {message: boom}
  catch:
    condition: "error.message =="
"#,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Operation(_)));
}

#[tokio::test]
async fn foreach_structural_errors_bypass_catch() {
    let h = harness(Options::default());
    let err = h
        .run(
            r#"
operations:
- catch: {}
  operations:
  - foreach:
      values:
        x: [1, 2]
        y: [1, 2, 3]
"#,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Values(ValuesError::ForeachSizeMismatch { .. })
    ));
}

#[tokio::test]
async fn output_replaces_values_in() {
    let h = harness(Options::default());
    let result = h
        .run(
            r#"
operations:
- values: {x1: 1}
  output: {x2: (x1)}
"#,
        )
        .await
        .unwrap();
    assert_eq!(result, json!({"x2": 1}));
}

#[tokio::test]
async fn siblings_see_earlier_outputs() {
    let h = harness(Options::default());
    let result = h
        .run(
            r#"
operations:
- output: {a: 1, shared: first}
- output: {b: (a), shared: second}
output:
  final: (shared)
  b: (b)
"#,
        )
        .await
        .unwrap();
    assert_eq!(result, json!({"final": "second", "b": 1}));
}

#[tokio::test]
async fn nested_results_bypass_or_feed_output() {
    let h = harness(Options::default());
    let result = h
        .run(
            r#"
operations:
- operations:
  - output: {a: 1}
  - output: {b: (a)}
- operations:
  - output: {inner: 5}
  output: {outer: (inner)}
"#,
        )
        .await
        .unwrap();
    assert_eq!(result, json!({"outer": 5, "a": 1, "b": 1}));
}

#[tokio::test]
async fn condition_and_patterns_gate_operations() {
    let h = harness(Options {
        patterns: Some(GlobPatternMatcher::new(["apps/web"], Vec::<String>::new()).unwrap()),
        ..Options::default()
    });
    let result = h
        .run_with(
            r#"
operations:
- condition: enabled
  output: {disabled_ran: true}
- target: apps
  operations:
  - target: web
    output: {web: true}
  - target: api
    output: {api: true}
"#,
            json!({"enabled": false}),
        )
        .await
        .unwrap();
    assert_eq!(result, json!({"web": true}));
}

#[tokio::test]
async fn foreach_runs_each_item_in_order() {
    let h = harness(Options::default());
    let result = h
        .run_with(
            r#"
operations:
- message: (x)
  foreach:
    values: {x: (items)}
    output: {names: "([x])"}
- foreach:
    values: {y: (items)}
  output: {last: (y)}
"#,
            json!({"items": ["a", "b", "c"]}),
        )
        .await
        .unwrap();

    assert_eq!(h.console.text(), "a\nb\nc\n");
    assert_eq!(result, json!({"last": "c", "names": ["a", "b", "c"]}));
}

#[tokio::test]
async fn dry_run_skips_non_get_requests() {
    let h = harness(Options {
        templates: StaticTemplates::default()
            .with("create.yaml", "method: POST\nurl: https://api.test/items\nbody: {name: x}\n")
            .with("read.yaml", "url: https://api.test/items\n"),
        dry_run: true,
        ..Options::default()
    });
    let result = h
        .run(
            r#"
operations:
- request: create.yaml
  output: {created: (result.status)}
- request: read.yaml
  output: {read: (result.status)}
"#,
        )
        .await
        .unwrap();

    let requests = h.http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(result["read"], json!(200));
    assert_eq!(result["created"], Value::Null);
}

#[tokio::test]
async fn failed_requests_are_catchable_by_status() {
    let h = harness(Options {
        templates: StaticTemplates::default().with("get.yaml", "url: https://api.test/missing\n"),
        http: MockHttpClient::with_responses(vec![(404, json!({"error": "not found"}))]),
        ..Options::default()
    });
    let result = h
        .run(
            r#"
operations:
- request: get.yaml
  catch:
    condition: result.status == 404
    output:
      missing: true
      kind: (error.type.name)
      reason: (result.body.error)
"#,
        )
        .await
        .unwrap();
    assert_eq!(
        result,
        json!({"missing": true, "kind": "RequestError", "reason": "not found"})
    );
}

#[tokio::test]
async fn parent_catch_sees_the_response_of_a_nested_failed_request() {
    let h = harness(Options {
        templates: StaticTemplates::default().with("get.yaml", "url: https://api.test/a\n"),
        http: MockHttpClient::with_responses(vec![(404, json!({"error": "gone"}))]),
        ..Options::default()
    });
    let result = h
        .run(
            r#"
operations:
- operations:
  - request: get.yaml
  catch:
    condition: result.status == 404
    output:
      missing: true
      reason: (result.body.error)
- output: {after: true}
"#,
        )
        .await
        .unwrap();
    assert_eq!(result, json!({"after": true, "missing": true, "reason": "gone"}));
}

#[tokio::test]
async fn composed_actions_run_in_a_fixed_order() {
    let h = harness(Options {
        templates: StaticTemplates::default()
            .with("parent.yaml", "url: https://api.test/parent\n")
            .with("child.yaml", "url: https://api.test/child\n")
            .with("tpl.yaml", "rendered: true\n"),
        http: MockHttpClient::with_responses(vec![(200, json!({"id": 7}))]),
        ..Options::default()
    });
    let result = h
        .run(
            r#"
operations:
- request: parent.yaml
  template: tpl.yaml
  operations:
  - request: child.yaml
    output: {childStatus: (result.status)}
  output:
    id: (result.body.id)
    status: (result.status)
    rendered: (result.rendered)
    child: (childStatus)
"#,
        )
        .await
        .unwrap();
    assert_eq!(
        result,
        json!({"id": 7, "status": 200, "rendered": true, "child": 200})
    );

    let urls: Vec<String> = h
        .http
        .requests()
        .iter()
        .map(|r| r.url.as_str().to_string())
        .collect();
    assert_eq!(urls, ["https://api.test/parent", "https://api.test/child"]);
}

#[tokio::test]
async fn uncaught_request_failures_carry_the_response() {
    let h = harness(Options {
        templates: StaticTemplates::default().with("get.yaml", "url: https://api.test/broken\n"),
        http: MockHttpClient::with_responses(vec![(500, json!({"error": "down"}))]),
        ..Options::default()
    });
    let err = h.run("operations:\n- request: get.yaml\n").await.unwrap_err();
    match err {
        WorkflowError::Request(e) => {
            assert_eq!(e.status, 500);
            assert_eq!(e.response["body"]["error"], json!("down"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn auth_tokens_are_sent_and_redacted() {
    let h = harness(Options {
        templates: StaticTemplates::default().with(
            "get.yaml",
            "url: https://api.test/items?sig=tok-123\nauth: {tenant: contoso}\n",
        ),
        ..Options::default()
    });
    h.run("operations:\n- request: get.yaml\n").await.unwrap();

    let requests = h.http.requests();
    assert_eq!(requests[0].headers["Authorization"], "Bearer tok-123");
    let token_requests = h.tokens.requests.lock().unwrap().clone();
    assert_eq!(token_requests[0].tenant, "contoso");
    assert_eq!(token_requests[0].resource, "https://management.azure.com/");

    let console = h.console.text();
    assert!(console.contains("sig=***"));
    assert!(!console.contains("tok-123"));
}

#[tokio::test(start_paused = true)]
async fn repeat_polls_until_the_condition_clears() {
    let h = harness(Options {
        templates: StaticTemplates::default().with("poll.yaml", "url: https://api.test/op\n"),
        http: MockHttpClient::with_responses(vec![
            (200, json!({"state": "running"})),
            (200, json!({"state": "running"})),
            (200, json!({"state": "done"})),
        ]),
        ..Options::default()
    });
    let result = h
        .run(
            r#"
operations:
- message: poll
  request: poll.yaml
  output: {state: (result.body.state)}
  repeat:
    condition: "state != 'done'"
    delay: 5
"#,
        )
        .await
        .unwrap();

    assert_eq!(result, json!({"state": "done"}));
    assert_eq!(h.http.requests().len(), 3);
    assert_eq!(h.console.text().matches("poll\n").count(), 1);
    assert_eq!(
        h.log_files(),
        vec!["001-poll.yaml", "002-poll.yaml", "003-poll.yaml"]
    );
}

#[tokio::test(start_paused = true)]
async fn repeat_stops_once_the_timeout_has_passed() {
    let h = harness(Options {
        templates: StaticTemplates::default().with("poll.yaml", "url: https://api.test/op\n"),
        ..Options::default()
    });
    h.run(
        r#"
operations:
- request: poll.yaml
  repeat:
    condition: "true"
    delay: 1
    timeout: 2.5
"#,
    )
    .await
    .unwrap();

    assert_eq!(h.http.requests().len(), 4);
}

#[tokio::test]
async fn templates_write_files_or_produce_results() {
    let h = harness(Options {
        templates: StaticTemplates::default().with("config.yaml", "key: value\n"),
        ..Options::default()
    });
    let result = h
        .run(
            r#"
operations:
- values: {env: dev}
  template: config.yaml
  write: (env ~ '/config.yaml')
- template: config.yaml
  output: {rendered: (result.key)}
"#,
        )
        .await
        .unwrap();

    let written = std::fs::read_to_string(h.dir.path().join("out/dev/config.yaml")).unwrap();
    assert_eq!(written, "key: value\n");
    assert_eq!(result, json!({"rendered": "value"}));
}

#[tokio::test]
async fn sub_workflows_run_with_their_own_values() {
    let h = harness(Options::default());
    let child = h.dir.path().join("child");
    std::fs::create_dir_all(&child).unwrap();
    std::fs::write(child.join("values.yaml"), "greeting: hello\n").unwrap();
    std::fs::write(
        child.join("workflow.yaml"),
        "operations:\n- message: \"{{ greeting }} from child\"\n  output: {text: \"(greeting)\", who: \"(who)\"}\n",
    )
    .unwrap();

    let result = h
        .run(
            r#"
operations:
- message: Parent
  workflow: child
  values: {who: world}
  output:
    child: (result.text)
    who: (result.who)
"#,
        )
        .await
        .unwrap();

    assert_eq!(result, json!({"child": "hello", "who": "world"}));
    assert_eq!(h.console.text(), "Parent\n  hello from child\n");
}

#[tokio::test]
async fn audit_logs_are_numbered_and_redacted() {
    let h = harness(Options::default());
    h.secrets.add_secret("p@ssw0rd");
    h.run(
        r#"
operations:
- message: Outer step
  values: {password: p@ssw0rd}
  operations:
  - message: Inner
    output: {done: true}
- condition: "false"
  message: Skipped
"#,
    )
    .await
    .unwrap();

    let files = h.log_files();
    assert_eq!(files, vec!["001---Inner.yaml", "002-Outer-step.yaml"]);
    let outer = std::fs::read_to_string(h.dir.path().join("logs").join(&files[1])).unwrap();
    assert!(outer.contains("valuesIn"));
    assert!(outer.contains("***"));
    assert!(!outer.contains("p@ssw0rd"));
}
