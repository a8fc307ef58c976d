//! Route-variable injection.
//!
//! Functions have no parameter names at runtime, so a route variable is bound
//! by position: `with_var("id", 1)` feeds the `{id}` segment to the second
//! parameter and leaves every other position to the rest of the chain.
//!
//! ```rust
//! use jsonfn::{Json, wrap};
//! use std::collections::HashMap;
//!
//! async fn get_user(id: u64) -> Json<HashMap<&'static str, u64>> {
//!     Json(HashMap::from([("id", id)]))
//! }
//!
//! let handler = wrap(get_user).with_var("id", 0);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::param::{Arg, ParamType};
use crate::request::Request;
use crate::resolver::ArgumentResolver;

/// Where route variables come from: a lookup from request to key/value map.
pub type VarSource = Arc<dyn Fn(&Request) -> HashMap<String, String> + Send + Sync>;

/// The path parameters captured by [`Router`](crate::Router).
pub fn route_params(req: &Request) -> HashMap<String, String> {
    req.params().clone()
}

/// Injects one route variable into one parameter position.
pub struct VarInjector {
    key: String,
    pos: usize,
    source: VarSource,
}

impl VarInjector {
    /// Reads `key` from the router's path parameters.
    pub fn new(key: impl Into<String>, pos: usize) -> Self {
        Self::with_source(key, pos, Arc::new(route_params))
    }

    pub fn with_source(key: impl Into<String>, pos: usize, source: VarSource) -> Self {
        Self { key: key.into(), pos, source }
    }
}

impl ArgumentResolver for VarInjector {
    fn resolve(&self, req: &Request, ty: &ParamType, pos: usize) -> Result<Option<Arg>, ResolveError> {
        if pos != self.pos {
            return Ok(None);
        }

        let vars = (self.source)(req);
        let raw = vars.get(&self.key).ok_or_else(|| {
            ResolveError::resolution(pos, ty.name(), format!("key '{}' does not exist in route vars", self.key))
        })?;

        match ty.parse_text(raw) {
            Some(Ok(arg)) => Ok(Some(arg)),
            Some(Err(e)) => Err(ResolveError::resolution(pos, ty.name(), format!("route var '{}': {e}", self.key))),
            None => Err(ResolveError::resolution(pos, ty.name(), "route var cannot be assigned to the declared type")),
        }
    }
}
