use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::parser::Request;
use crate::response::ResponseWriter;

/// Something that turns a parsed request into a response.
///
/// Closures of the right shape are handlers too:
///
/// ```rust
/// use wirestream::{Handler, Request, ResponseWriter};
///
/// fn assert_handler<H: Handler>(_: H) {}
///
/// assert_handler(|w: &mut dyn ResponseWriter, _req: &Request| {
///     w.write(b"pong").map(|_| ())
/// });
/// ```
pub trait Handler: Send + Sync {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()>;
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &Request) -> io::Result<()> + Send + Sync,
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        self(w, req)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    method: Option<String>,
    path: String,
}

/// Route table keyed by path, optionally narrowed to one method.
///
/// The table sits behind a read-write lock, so routes may be added through a
/// shared `Arc<Router>` while connections are being served. Handlers are
/// cloned out before they run; the lock is never held across a handler.
#[derive(Default)]
pub struct Router {
    routes: RwLock<HashMap<RouteKey, Arc<dyn Handler>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `path` under any method.
    pub fn handle<H: Handler + 'static>(&self, path: &str, handler: H) {
        self.insert(None, path, handler);
    }

    /// Register `handler` for `method` + `path`. Method-specific routes win
    /// over [`handle`](Self::handle) routes for the same path.
    pub fn route<H: Handler + 'static>(&self, method: &str, path: &str, handler: H) {
        self.insert(Some(method.to_string()), path, handler);
    }

    fn insert<H: Handler + 'static>(&self, method: Option<String>, path: &str, handler: H) {
        let key = RouteKey {
            method,
            path: path.to_string(),
        };
        self.routes.write().insert(key, Arc::new(handler));
    }

    /// Find the handler for a method and path.
    pub fn lookup(&self, method: &str, path: &str) -> Option<Arc<dyn Handler>> {
        let routes = self.routes.read();
        let exact = RouteKey {
            method: Some(method.to_string()),
            path: path.to_string(),
        };
        if let Some(handler) = routes.get(&exact) {
            return Some(Arc::clone(handler));
        }
        let any = RouteKey {
            method: None,
            path: exact.path,
        };
        routes.get(&any).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }

    /// Run the matching handler, or answer `404 Not Found`.
    pub fn dispatch(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        match self.lookup(req.method(), req.path()) {
            Some(handler) => handler.serve(w, req),
            None => {
                debug!(method = req.method(), target = req.target(), "no route");
                not_found(w)
            }
        }
    }
}

impl Handler for Router {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
        self.dispatch(w, req)
    }
}

fn not_found(w: &mut dyn ResponseWriter) -> io::Result<()> {
    w.headers_mut().replace("Content-Type", "text/plain");
    w.write_header(404)?;
    w.write(b"404 Not Found\n")?;
    Ok(())
}
