//! In-process chaincode routing for tests and embedding

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::traits::*;
use crate::types::*;

type Route = (String, String);

/// Routes invocations to components registered under `(name, channel)`
///
/// Each registered component owns its own world state, so a call made
/// through the invoker shares no transaction context with the caller.
#[derive(Clone, Default)]
pub struct LocalInvoker {
    components: Arc<RwLock<HashMap<Route, Arc<dyn Chaincode>>>>,
    offline: Arc<RwLock<Vec<Route>>>,
}

impl LocalInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `chaincode` reachable as `name` on `channel`
    pub fn register(
        &self,
        name: &str,
        channel: &str,
        chaincode: Arc<dyn Chaincode>,
    ) -> LedgerResult<()> {
        self.components
            .write()
            .map_err(|_| LedgerError::Store("invoker registry lock poisoned".to_string()))?
            .insert((name.to_string(), channel.to_string()), chaincode);
        Ok(())
    }

    /// Simulate a transport failure for calls to `name` on `channel`
    pub fn set_offline(&self, name: &str, channel: &str, offline: bool) -> LedgerResult<()> {
        let route = (name.to_string(), channel.to_string());
        let mut routes = self
            .offline
            .write()
            .map_err(|_| LedgerError::Store("invoker registry lock poisoned".to_string()))?;
        routes.retain(|r| *r != route);
        if offline {
            routes.push(route);
        }
        Ok(())
    }

    fn lookup(&self, component: &str, channel: &str) -> LedgerResult<Arc<dyn Chaincode>> {
        let route = (component.to_string(), channel.to_string());
        let offline = self
            .offline
            .read()
            .map_err(|_| LedgerError::Store("invoker registry lock poisoned".to_string()))?;
        if offline.contains(&route) {
            return Err(LedgerError::InvocationFailed {
                payload: format!("chaincode {component} on {channel} is unreachable"),
            });
        }
        drop(offline);

        self.components
            .read()
            .map_err(|_| LedgerError::Store("invoker registry lock poisoned".to_string()))?
            .get(&route)
            .cloned()
            .ok_or_else(|| LedgerError::InvocationFailed {
                payload: format!("chaincode {component} is not installed on {channel}"),
            })
    }
}

#[async_trait]
impl ChaincodeInvoker for LocalInvoker {
    async fn invoke_chaincode(
        &self,
        component: &str,
        args: Vec<Vec<u8>>,
        channel: &str,
    ) -> LedgerResult<Response> {
        let chaincode = self.lookup(component, channel)?;
        debug!(component, channel, args = args.len(), "invoking chaincode");
        let response = chaincode.invoke(&args).await;
        debug!(component, status = response.status, "chaincode returned");
        Ok(response)
    }
}

impl std::fmt::Debug for LocalInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.components.read().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("LocalInvoker")
            .field("component_count", &count)
            .finish()
    }
}
