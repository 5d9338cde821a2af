//! Fan-out of HAL parameter traffic to optional audio extensions.
//!
//! Every `set_parameters` / `get_parameters` call the HAL receives is offered
//! to each registered extension in registration order; an extension picks
//! out the keys it owns and ignores the rest.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::params::StrParms;

pub trait AudioExtension: Send {
    fn name(&self) -> &'static str;

    fn set_parameters(&mut self, parms: &StrParms);

    /// Append any keys this extension answers for `query` to `reply`.
    fn get_parameters(&self, query: &StrParms, reply: &mut StrParms);
}

pub type SharedExtension = Arc<Mutex<dyn AudioExtension>>;

#[derive(Default, Clone)]
pub struct ExtensionSet {
    extensions: Vec<SharedExtension>,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E>(&mut self, extension: Arc<Mutex<E>>)
    where
        E: AudioExtension + 'static,
    {
        debug!("registering audio extension {}", extension.lock().name());
        self.extensions.push(extension);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.extensions.iter().map(|e| e.lock().name()).collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn set_parameters(&self, parms: &StrParms) {
        for extension in &self.extensions {
            extension.lock().set_parameters(parms);
        }
    }

    pub fn get_parameters(&self, query: &StrParms) -> StrParms {
        let mut reply = StrParms::new();
        for extension in &self.extensions {
            extension.lock().get_parameters(query, &mut reply);
        }
        reply
    }
}
