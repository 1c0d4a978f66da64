//! Render state machine
//!
//! `Idle -> Loading -> Success | Error`, and back to `Loading` on retry or a
//! new source. Each call to [`RenderEngine::render`] stamps a generation; a
//! result is only applied if its generation is still the latest when it
//! resolves, so the last issued render always wins.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{self, FutureExt, LocalBoxFuture};
use serde::{Serialize, Serializer};
use tracing::{debug, info, span, warn, Instrument, Level};

use crate::core::{DiagramError, DiagramSource, ErrorKind};
use crate::repair::Validator;
use crate::service::RenderService;

static DIAGRAM_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A process-unique element id for the next compiled diagram
pub fn next_diagram_id() -> String {
    let n = DIAGRAM_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("spyglass-diagram-{}", n)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Observable render state
///
/// Each variant carries exactly the data its status allows: a payload only
/// on success, an error detail only on failure.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RenderResult {
    #[default]
    Idle,
    Loading,
    Success {
        validated_text: String,
        vector_payload: String,
    },
    Error {
        /// Diagnostic text, when there is text to show
        validated_text: Option<String>,
        error_detail: String,
        kind: ErrorKind,
    },
}

impl RenderResult {
    fn failure(validated_text: Option<String>, error_detail: String, kind: ErrorKind) -> Self {
        RenderResult::Error {
            validated_text: validated_text.filter(|t| !t.is_empty()),
            error_detail,
            kind,
        }
    }

    pub fn status(&self) -> RenderStatus {
        match self {
            RenderResult::Idle => RenderStatus::Idle,
            RenderResult::Loading => RenderStatus::Loading,
            RenderResult::Success { .. } => RenderStatus::Success,
            RenderResult::Error { .. } => RenderStatus::Error,
        }
    }

    pub fn validated_text(&self) -> Option<&str> {
        match self {
            RenderResult::Success { validated_text, .. } => Some(validated_text),
            RenderResult::Error { validated_text, .. } => validated_text.as_deref(),
            _ => None,
        }
    }

    pub fn vector_payload(&self) -> Option<&str> {
        match self {
            RenderResult::Success { vector_payload, .. } => Some(vector_payload),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            RenderResult::Error { error_detail, .. } => Some(error_detail),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            RenderResult::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RenderResult::Success { .. })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderResultView<'a> {
    status: RenderStatus,
    validated_text: Option<&'a str>,
    vector_payload: Option<&'a str>,
    error_detail: Option<&'a str>,
    error_kind: Option<ErrorKind>,
}

impl Serialize for RenderResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RenderResultView {
            status: self.status(),
            validated_text: self.validated_text(),
            vector_payload: self.vector_payload(),
            error_detail: self.error_detail(),
            error_kind: self.error_kind(),
        }
        .serialize(serializer)
    }
}

/// Yields once the host has painted the next frame
pub trait FrameClock {
    fn next_frame(&self) -> LocalBoxFuture<'static, ()>;
}

/// Resolves immediately; for hosts without a paint cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateFrame;

impl FrameClock for ImmediateFrame {
    fn next_frame(&self) -> LocalBoxFuture<'static, ()> {
        future::ready(()).boxed_local()
    }
}

type ErrorCallback = Rc<dyn Fn(&str)>;
type ReadyCallback = Rc<dyn Fn()>;

#[derive(Default)]
struct EngineState {
    result: RenderResult,
    source: Option<DiagramSource>,
    generation: u64,
    attempts: u32,
}

struct EngineInner {
    service: Rc<dyn RenderService>,
    validator: Validator,
    clock: Rc<dyn FrameClock>,
    state: RefCell<EngineState>,
    on_error: RefCell<Option<ErrorCallback>>,
    on_ready: RefCell<Option<ReadyCallback>>,
}

/// Drives validation and compilation, exposing a [`RenderResult`]
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RenderEngine {
    inner: Rc<EngineInner>,
}

impl RenderEngine {
    pub fn new(service: Rc<dyn RenderService>) -> Self {
        Self::with_clock(service, Rc::new(ImmediateFrame))
    }

    pub fn with_clock(service: Rc<dyn RenderService>, clock: Rc<dyn FrameClock>) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                validator: Validator::new(service.clone()),
                service,
                clock,
                state: RefCell::new(EngineState::default()),
                on_error: RefCell::new(None),
                on_ready: RefCell::new(None),
            }),
        }
    }

    /// Called with the error detail whenever a render ends in `Error`
    pub fn set_on_error(&self, callback: impl Fn(&str) + 'static) {
        *self.inner.on_error.borrow_mut() = Some(Rc::new(callback));
    }

    /// Called one frame after a render ends in `Success`
    pub fn set_on_ready(&self, callback: impl Fn() + 'static) {
        *self.inner.on_ready.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn result(&self) -> RenderResult {
        self.inner.state.borrow().result.clone()
    }

    pub fn status(&self) -> RenderStatus {
        self.inner.state.borrow().result.status()
    }

    /// Retries since the last new source
    pub fn attempts(&self) -> u32 {
        self.inner.state.borrow().attempts
    }

    pub fn source(&self) -> Option<DiagramSource> {
        self.inner.state.borrow().source.clone()
    }

    /// Start rendering `source`
    ///
    /// The state moves to `Loading` before this returns. The returned future
    /// does the work and resolves to the engine's result once it settles,
    /// which is a newer render's result if this one was superseded.
    pub fn render(&self, source: DiagramSource) -> LocalBoxFuture<'static, RenderResult> {
        self.inner.state.borrow_mut().attempts = 0;
        self.start(source)
    }

    /// Render the stored source again
    pub fn retry(&self) -> LocalBoxFuture<'static, RenderResult> {
        let source = {
            let mut state = self.inner.state.borrow_mut();
            state.attempts += 1;
            state.source.clone()
        };
        match source {
            Some(source) => {
                info!(attempt = self.attempts(), "Retrying render");
                self.start(source)
            }
            None => {
                let generation = self.bump_generation(None);
                let engine = self.clone();
                async move {
                    let detail = DiagramError::MissingSource.to_string();
                    engine.finish_error(generation, None, &detail, ErrorKind::MissingSource);
                    engine.result()
                }
                .boxed_local()
            }
        }
    }

    fn bump_generation(&self, source: Option<DiagramSource>) -> u64 {
        let mut state = self.inner.state.borrow_mut();
        state.generation += 1;
        state.result = RenderResult::Loading;
        if source.is_some() {
            state.source = source;
        }
        state.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.state.borrow().generation == generation
    }

    fn start(&self, source: DiagramSource) -> LocalBoxFuture<'static, RenderResult> {
        let generation = self.bump_generation(Some(source.clone()));
        let id = next_diagram_id();
        let span = span!(Level::INFO, "render", %id, generation, kind = %source.kind);
        let engine = self.clone();

        async move {
            engine.run(generation, id, source).await;
            engine.result()
        }
        .instrument(span)
        .boxed_local()
    }

    async fn run(&self, generation: u64, id: String, source: DiagramSource) {
        let validation = self.inner.validator.validate(&source).await;
        if !self.is_current(generation) {
            debug!("Discarding superseded validation");
            return;
        }

        if !validation.is_valid {
            let kind = validation.error_kind.unwrap_or(ErrorKind::ParseError);
            let detail = validation.error.unwrap_or_default();
            self.finish_error(generation, Some(validation.code), &detail, kind);
            return;
        }

        let compiled = self
            .inner
            .service
            .compile(&id, source.kind, &validation.code)
            .await;
        if !self.is_current(generation) {
            debug!("Discarding superseded render result");
            return;
        }

        let payload = match compiled {
            Ok(payload) => payload,
            Err(err) => {
                let error = match err {
                    DiagramError::RenderFailure { .. } => err,
                    other => DiagramError::render_failure(other.to_string()),
                };
                self.finish_error(
                    generation,
                    Some(validation.code),
                    &error.to_string(),
                    ErrorKind::RenderFailure,
                );
                return;
            }
        };

        info!(payload_len = payload.len(), "Render succeeded");
        self.inner.state.borrow_mut().result = RenderResult::Success {
            validated_text: validation.code,
            vector_payload: payload,
        };

        self.inner.clock.next_frame().await;
        if !self.is_current(generation) {
            debug!("Skipping ready callback for superseded render");
            return;
        }
        let on_ready = self.inner.on_ready.borrow().clone();
        if let Some(callback) = on_ready {
            callback();
        }
    }

    fn finish_error(
        &self,
        generation: u64,
        validated_text: Option<String>,
        detail: &str,
        kind: ErrorKind,
    ) {
        if !self.is_current(generation) {
            return;
        }
        warn!(%kind, error = detail, "Render failed");
        self.inner.state.borrow_mut().result =
            RenderResult::failure(validated_text, detail.to_string(), kind);

        let on_error = self.inner.on_error.borrow().clone();
        if let Some(callback) = on_error {
            callback(detail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DiagramKind;
    use crate::service::FlowchartService;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::task::noop_waker_ref;
    use std::cell::Cell;
    use std::task::Context;

    /// Counts calls and fails compilation on demand
    #[derive(Default)]
    struct MockService {
        parses: Cell<usize>,
        compiles: Cell<usize>,
        fail_compile: bool,
    }

    impl RenderService for MockService {
        fn parse<'a>(&'a self, text: &'a str) -> LocalBoxFuture<'a, Result<(), DiagramError>> {
            self.parses.set(self.parses.get() + 1);
            let result = if text.contains("bad") {
                Err(DiagramError::parse_error("unexpected `bad`", 2))
            } else {
                Ok(())
            };
            future::ready(result).boxed_local()
        }

        fn compile<'a>(
            &'a self,
            id: &'a str,
            _kind: DiagramKind,
            text: &'a str,
        ) -> LocalBoxFuture<'a, Result<String, DiagramError>> {
            self.compiles.set(self.compiles.get() + 1);
            let result = if self.fail_compile {
                Err(DiagramError::render_failure("layout exploded"))
            } else {
                Ok(format!("<svg id=\"{}\"><!-- {} --></svg>", id, text.len()))
            };
            future::ready(result).boxed_local()
        }
    }

    fn engine_with(service: Rc<MockService>) -> RenderEngine {
        RenderEngine::new(service)
    }

    #[test]
    fn test_initial_state_is_idle() {
        let engine = engine_with(Rc::new(MockService::default()));
        assert_eq!(engine.status(), RenderStatus::Idle);
        assert_eq!(engine.attempts(), 0);
    }

    #[test]
    fn test_render_moves_to_loading_synchronously() {
        let engine = engine_with(Rc::new(MockService::default()));
        let pending = engine.render(DiagramSource::graph("A-->B"));
        assert_eq!(engine.status(), RenderStatus::Loading);
        let result = block_on(pending);
        assert_eq!(result.status(), RenderStatus::Success);
    }

    #[test]
    fn test_success_carries_payload_only() {
        let engine = engine_with(Rc::new(MockService::default()));
        let result = block_on(engine.render(DiagramSource::graph("A-->B")));
        assert_eq!(result.validated_text(), Some("graph TD\nA-->B"));
        assert!(result.vector_payload().unwrap().contains("spyglass-diagram-"));
        assert_eq!(result.error_detail(), None);
    }

    #[test]
    fn test_empty_source_skips_service() {
        let service = Rc::new(MockService::default());
        let engine = engine_with(service.clone());
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        engine.set_on_error(move |msg| sink.borrow_mut().push(msg.to_string()));

        let result = block_on(engine.render(DiagramSource::graph("  ")));
        assert_eq!(result.status(), RenderStatus::Error);
        assert_eq!(result.error_kind(), Some(ErrorKind::MissingSource));
        assert_eq!(result.error_detail(), Some("No diagram source provided"));
        assert_eq!(result.vector_payload(), None);
        assert_eq!(service.parses.get(), 0);
        assert_eq!(service.compiles.get(), 0);
        assert_eq!(*errors.borrow(), vec!["No diagram source provided".to_string()]);
    }

    #[test]
    fn test_parse_failure_does_not_compile() {
        let service = Rc::new(MockService::default());
        let engine = engine_with(service.clone());
        let result = block_on(engine.render(DiagramSource::graph("graph TD\nbad")));
        assert_eq!(result.error_kind(), Some(ErrorKind::ParseError));
        assert!(result.error_detail().unwrap().contains("unexpected `bad`"));
        assert_eq!(result.validated_text(), Some("graph TD\nbad"));
        assert_eq!(service.compiles.get(), 0);
    }

    #[test]
    fn test_compile_failure_is_render_failure() {
        let service = Rc::new(MockService {
            fail_compile: true,
            ..Default::default()
        });
        let engine = engine_with(service);
        let result = block_on(engine.render(DiagramSource::graph("A-->B")));
        assert_eq!(result.error_kind(), Some(ErrorKind::RenderFailure));
        assert!(result
            .error_detail()
            .unwrap()
            .starts_with("Diagram render failed"));
    }

    #[test]
    fn test_on_ready_fires_after_success() {
        let engine = engine_with(Rc::new(MockService::default()));
        let ready = Rc::new(Cell::new(0));
        let counter = ready.clone();
        engine.set_on_ready(move || counter.set(counter.get() + 1));

        block_on(engine.render(DiagramSource::graph("A-->B")));
        assert_eq!(ready.get(), 1);
        block_on(engine.render(DiagramSource::graph("graph TD\nbad")));
        assert_eq!(ready.get(), 1);
    }

    #[test]
    fn test_retry_counts_attempts() {
        let service = Rc::new(MockService::default());
        let engine = engine_with(service.clone());
        block_on(engine.render(DiagramSource::graph("graph TD\nbad")));
        block_on(engine.retry());
        block_on(engine.retry());
        assert_eq!(engine.attempts(), 2);
        assert_eq!(engine.status(), RenderStatus::Error);

        block_on(engine.render(DiagramSource::graph("A-->B")));
        assert_eq!(engine.attempts(), 0);
    }

    #[test]
    fn test_retry_without_source() {
        let engine = engine_with(Rc::new(MockService::default()));
        let result = block_on(engine.retry());
        assert_eq!(result.error_kind(), Some(ErrorKind::MissingSource));
    }

    #[test]
    fn test_last_issued_render_wins() {
        let engine = engine_with(Rc::new(MockService::default()));
        let first = engine.render(DiagramSource::graph("A-->B"));
        let second = engine.render(DiagramSource::graph("A-->B\nB-->C"));

        let newest = block_on(second);
        assert_eq!(newest.validated_text(), Some("graph TD\nA-->B\nB-->C"));

        // The older render resolves late and must not overwrite
        let after_stale = block_on(first);
        assert_eq!(after_stale, newest);
        assert_eq!(engine.result(), newest);
    }

    /// Holds back the compile of any source mentioning `Old` until released
    #[derive(Default)]
    struct GatedService {
        gate: RefCell<Option<oneshot::Receiver<()>>>,
    }

    impl RenderService for GatedService {
        fn parse<'a>(&'a self, _text: &'a str) -> LocalBoxFuture<'a, Result<(), DiagramError>> {
            future::ready(Ok(())).boxed_local()
        }

        fn compile<'a>(
            &'a self,
            id: &'a str,
            _kind: DiagramKind,
            text: &'a str,
        ) -> LocalBoxFuture<'a, Result<String, DiagramError>> {
            let gate = if text.contains("Old") {
                self.gate.borrow_mut().take()
            } else {
                None
            };
            async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(format!("<svg id=\"{}\"><text>{}</text></svg>", id, text))
            }
            .boxed_local()
        }
    }

    /// Holds back the first frame until released; later frames are immediate
    #[derive(Default)]
    struct GatedFrame {
        gate: RefCell<Option<oneshot::Receiver<()>>>,
    }

    impl FrameClock for GatedFrame {
        fn next_frame(&self) -> LocalBoxFuture<'static, ()> {
            let gate = self.gate.borrow_mut().take();
            async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
            }
            .boxed_local()
        }
    }

    fn ready_counter(engine: &RenderEngine) -> Rc<Cell<usize>> {
        let ready = Rc::new(Cell::new(0));
        let counter = ready.clone();
        engine.set_on_ready(move || counter.set(counter.get() + 1));
        ready
    }

    #[test]
    fn test_compile_finishing_after_newer_render_is_dropped() {
        let (release, gate) = oneshot::channel();
        let service = Rc::new(GatedService {
            gate: RefCell::new(Some(gate)),
        });
        let engine = RenderEngine::new(service);
        let ready = ready_counter(&engine);
        let mut cx = Context::from_waker(noop_waker_ref());

        let mut old = engine.render(DiagramSource::graph("A-->Old"));
        assert!(old.poll_unpin(&mut cx).is_pending());

        let newest = block_on(engine.render(DiagramSource::graph("A-->New")));
        assert!(newest.vector_payload().unwrap().contains("A-->New"));
        assert_eq!(ready.get(), 1);

        release.send(()).unwrap();
        let settled = block_on(old);
        assert_eq!(settled, newest);
        assert_eq!(engine.result(), newest);
        assert_eq!(ready.get(), 1);
    }

    #[test]
    fn test_frame_finishing_after_newer_render_skips_ready() {
        let (release, gate) = oneshot::channel();
        let clock = Rc::new(GatedFrame {
            gate: RefCell::new(Some(gate)),
        });
        let engine = RenderEngine::with_clock(Rc::new(MockService::default()), clock);
        let ready = ready_counter(&engine);
        let mut cx = Context::from_waker(noop_waker_ref());

        let mut old = engine.render(DiagramSource::graph("A-->Old"));
        assert!(old.poll_unpin(&mut cx).is_pending());
        assert_eq!(engine.status(), RenderStatus::Success);
        assert_eq!(ready.get(), 0);

        let newest = block_on(engine.render(DiagramSource::graph("A-->New\nNew-->C")));
        assert_eq!(ready.get(), 1);

        release.send(()).unwrap();
        block_on(old);
        assert_eq!(engine.result(), newest);
        assert_eq!(ready.get(), 1);
    }

    #[test]
    fn test_diagram_ids_are_unique() {
        let a = next_diagram_id();
        let b = next_diagram_id();
        assert_ne!(a, b);
        assert!(a.starts_with("spyglass-diagram-"));
    }

    #[test]
    fn test_result_serialization() {
        let result = RenderResult::Success {
            validated_text: "graph TD\nA-->B".to_string(),
            vector_payload: "<svg/>".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["vectorPayload"], "<svg/>");
        assert!(json["errorDetail"].is_null());

        let json = serde_json::to_value(RenderResult::Idle).unwrap();
        assert_eq!(json["status"], "idle");
        assert!(json["vectorPayload"].is_null());
    }

    #[test]
    fn test_end_to_end_with_flowchart_service() {
        let engine = RenderEngine::new(Rc::new(FlowchartService::new()));
        let result = block_on(engine.render(DiagramSource::graph("A[src/index.js]-->B")));
        assert!(result.is_success());
        assert!(result.vector_payload().unwrap().contains("src/index.js"));
    }
}
