use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use http::{Request, Response, StatusCode};
use http_body::Body;
use pin_project::pin_project;
use tokio::sync::Notify;
use tower::{Layer, Service};
use tracing::debug;

struct Inner {
    is_shutting_down: AtomicBool,
    in_flight_count: AtomicUsize,
    drained: Notify,
}

/// Shared state for tracking shutdown status and in-flight requests
#[derive(Clone)]
pub struct ShutdownState {
    inner: Arc<Inner>,
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                is_shutting_down: AtomicBool::new(false),
                in_flight_count: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    /// Signal that shutdown has started
    pub fn start_shutdown(&self) {
        self.inner.is_shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.is_shutting_down.load(Ordering::SeqCst)
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight_count.load(Ordering::SeqCst)
    }

    /// Resolves once no request is in flight. Call [`start_shutdown`] first,
    /// otherwise new requests can keep the count above zero.
    ///
    /// [`start_shutdown`]: ShutdownState::start_shutdown
    pub fn completed(&self) -> impl Future<Output = ()> + Send + 'static {
        let inner = self.inner.clone();
        async move {
            loop {
                // Register before checking so a wakeup between the two is not lost.
                let notified = inner.drained.notified();
                if inner.in_flight_count.load(Ordering::SeqCst) == 0 {
                    return;
                }
                notified.await;
            }
        }
    }

    fn enter(&self) -> InFlightGuard {
        self.inner.in_flight_count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            inner: self.inner.clone(),
        }
    }
}

/// Counts one request as in flight until dropped, including when the request
/// future is cancelled.
struct InFlightGuard {
    inner: Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.in_flight_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}

/// Tower layer that adds graceful shutdown capability
#[derive(Clone)]
pub struct GracefulShutdownLayer {
    state: ShutdownState,
}

impl GracefulShutdownLayer {
    pub fn new(state: ShutdownState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for GracefulShutdownLayer {
    type Service = GracefulShutdownService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GracefulShutdownService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GracefulShutdownService<S> {
    inner: S,
    state: ShutdownState,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for GracefulShutdownService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Body + Default,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = GracefulShutdownFuture<S::Future, ResBody, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if self.state.is_shutting_down() {
            debug!(method = %req.method(), uri = %req.uri(), "Rejecting request during shutdown");

            let mut response = Response::new(ResBody::default());
            *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;

            return GracefulShutdownFuture {
                kind: FutureKind::Immediate(Some(Ok(response))),
                guard: None,
            };
        }

        let guard = self.state.enter();
        GracefulShutdownFuture {
            kind: FutureKind::Inner(self.inner.call(req)),
            guard: Some(guard),
        }
    }
}

#[pin_project]
pub struct GracefulShutdownFuture<F, B, E> {
    #[pin]
    kind: FutureKind<F, B, E>,
    guard: Option<InFlightGuard>,
}

#[pin_project(project = FutureKindProj)]
enum FutureKind<F, B, E> {
    Inner(#[pin] F),
    Immediate(Option<Result<Response<B>, E>>),
}

impl<F, B, E> Future for GracefulShutdownFuture<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: Body,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.kind.project() {
            FutureKindProj::Inner(fut) => {
                let result = fut.poll(cx);
                if result.is_ready() {
                    this.guard.take();
                }
                result
            }
            FutureKindProj::Immediate(response) => Poll::Ready(
                response
                    .take()
                    .expect("GracefulShutdownFuture polled after completion"),
            ),
        }
    }
}
