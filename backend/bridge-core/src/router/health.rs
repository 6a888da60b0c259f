use crate::error::{HandlerError, RegistryError};
use crate::procedure::{NoInput, ProcedureRegistry};

pub(crate) fn register(registry: &mut ProcedureRegistry) -> Result<(), RegistryError> {
    registry.query("health.ping", |_: NoInput| async {
        Ok::<_, HandlerError>("pong")
    })?;
    Ok(())
}
