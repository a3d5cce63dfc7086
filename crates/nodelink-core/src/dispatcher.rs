//! Command-code to handler registry.
//!
//! Ported from the embedded runtime's `Dispatcher`: looks up the schema
//! definition for a command code, decodes the payload, and invokes the
//! registered handler with the decoded fields plus an opaque context.
//! Handlers must not block on I/O; anything long-running is the handler's
//! responsibility to defer to a separate task.

use std::collections::HashMap;

use nodelink_proto::{DecodedPayload, SchemaStore, schema::decode_payload};

use crate::error::DispatchError;

/// A handler invoked with a decoded payload and caller-supplied context.
pub type Handler<Ctx> = Box<dyn Fn(&mut Ctx, &DecodedPayload) + Send + Sync>;

/// Routes decoded frames to registered per-command handlers.
pub struct Dispatcher<Ctx> {
    schema_store: SchemaStore,
    handlers: HashMap<u16, Handler<Ctx>>,
}

impl<Ctx> Dispatcher<Ctx> {
    /// Build a dispatcher backed by `schema_store`.
    #[must_use]
    pub fn new(schema_store: SchemaStore) -> Self {
        Self { schema_store, handlers: HashMap::new() }
    }

    /// Register `handler` to be invoked for `code`.
    pub fn on(&mut self, code: u16, handler: Handler<Ctx>) {
        self.handlers.insert(code, handler);
    }

    /// Decode `payload` against `code`'s schema and invoke its handler.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownCommand`] if no schema is registered
    /// for `code`, [`DispatchError::Schema`] if the payload fails to decode,
    /// or [`DispatchError::NoHandler`] if the schema exists but no handler
    /// was registered for it.
    pub fn dispatch(&self, code: u16, payload: &[u8], ctx: &mut Ctx) -> Result<(), DispatchError> {
        let Some(def) = self.schema_store.get(code) else {
            tracing::debug!(command = format!("{code:#06x}"), "dispatch: unknown command (schema not loaded)");
            return Err(DispatchError::UnknownCommand(code));
        };
        let decoded = decode_payload(&def, payload)?;
        let Some(handler) = self.handlers.get(&code) else {
            tracing::debug!(command = format!("{code:#06x}"), name = %def.name, "dispatch: unhandled command");
            return Err(DispatchError::NoHandler(code, def.name.clone()));
        };
        handler(ctx, &decoded);
        Ok(())
    }

    /// The schema store backing this dispatcher.
    #[must_use]
    pub fn schema_store(&self) -> &SchemaStore {
        &self.schema_store
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use nodelink_proto::commands;

    use super::*;

    #[test]
    fn dispatches_to_registered_handler() {
        let mut dispatcher: Dispatcher<Vec<String>> = Dispatcher::new(commands::standard_schema_store());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        dispatcher.on(
            commands::ECHO,
            Box::new(move |_ctx, payload| {
                seen_clone.lock().expect("lock").push(payload.get("data").and_then(|v| v.as_bytes()).map(|b| b.to_vec().len()).unwrap_or(0).to_string());
            }),
        );
        let mut ctx = Vec::new();
        dispatcher.dispatch(commands::ECHO, b"hello", &mut ctx).expect("dispatches");
        assert_eq!(seen.lock().expect("lock").as_slice(), ["5"]);
    }

    #[test]
    fn unknown_command_is_error() {
        let dispatcher: Dispatcher<()> = Dispatcher::new(SchemaStore::new());
        let mut ctx = ();
        let err = dispatcher.dispatch(0x9999, &[], &mut ctx).unwrap_err();
        assert_eq!(err, DispatchError::UnknownCommand(0x9999));
    }

    #[test]
    fn missing_handler_is_error() {
        let dispatcher: Dispatcher<()> = Dispatcher::new(commands::standard_schema_store());
        let mut ctx = ();
        let err = dispatcher.dispatch(commands::PING, &[], &mut ctx).unwrap_err();
        assert_eq!(err, DispatchError::NoHandler(commands::PING, "PING".to_owned()));
    }
}
